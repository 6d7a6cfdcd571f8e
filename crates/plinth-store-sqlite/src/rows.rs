//! Generic row access for tables whose shape is only known at run time.
//!
//! Table and column names are interpolated after [`quote_ident`]; every
//! value is a bound parameter. Rows are addressed by their `id` column.

use plinth_core::{
  row::{Pagination, Row},
  schema::{Column, ColumnType},
  value::Value,
};
use rusqlite::OptionalExtension as _;
use tracing::debug;

use crate::{
  Error, Result, TenantConnection,
  encode::{SqlValue, decode_value},
  sql::{ident_list, quote_ident},
};

/// Column that addresses a row; it must hold integers.
pub const ID_COLUMN: &str = "id";

pub struct RowEngine<'c> {
  conn: &'c TenantConnection,
}

impl<'c> RowEngine<'c> {
  pub(crate) fn new(conn: &'c TenantConnection) -> Self { Self { conn } }

  /// One page of `table`, ordered by `page.sort` descending. The sort column
  /// is quoted but not checked against the table.
  pub async fn list(&self, table: &str, columns: &[Column], page: &Pagination) -> Result<Vec<Row>> {
    let sql = format!(
      "SELECT * FROM {} ORDER BY {} DESC LIMIT ?1 OFFSET ?2",
      quote_ident(table),
      quote_ident(&page.sort)
    );
    debug!(%sql, "list rows");
    let types = column_types(columns);
    let limit = i64::from(page.limit);
    let offset = i64::try_from(page.offset()).unwrap_or(i64::MAX);

    self
      .conn
      .run(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let names = column_names(&stmt);
        let mut rows = stmt.query(rusqlite::params![limit, offset])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
          out.push(read_row(row, &names, &types)?);
        }
        Ok(out)
      })
      .await
  }

  pub async fn get_by_id(&self, table: &str, columns: &[Column], id: i64) -> Result<Row> {
    let sql = format!(
      "SELECT * FROM {} WHERE {} = ?1",
      quote_ident(table),
      quote_ident(ID_COLUMN)
    );
    let types = column_types(columns);
    let table_name = table.to_owned();

    self
      .conn
      .run(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let names = column_names(&stmt);
        let row = stmt
          .query_row([id], |row| read_row(row, &names, &types))
          .optional()?;
        row.ok_or(Error::RowNotFound { table: table_name, id })
      })
      .await
  }

  /// Insert a row and return the value of its `id` column. The insert is
  /// rolled back when that value is not an integer.
  pub async fn create(&self, table: &str, fields: Vec<(String, Value)>) -> Result<i64> {
    if fields.is_empty() {
      return Err(Error::EmptyFields);
    }
    let (names, values): (Vec<String>, Vec<SqlValue>) =
      fields.into_iter().map(|(n, v)| (n, SqlValue(v))).unzip();

    let placeholders = (1..=values.len()).map(|i| format!("?{i}")).collect::<Vec<_>>().join(", ");
    let sql = format!(
      "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
      quote_ident(table),
      ident_list(names.iter().map(String::as_str)),
      placeholders,
      quote_ident(ID_COLUMN)
    );
    debug!(%sql, "insert row");

    self
      .conn
      .run(move |conn| {
        let tx = conn.transaction()?;
        let id = tx.query_row(&sql, rusqlite::params_from_iter(values.iter()), |row| row.get(0))?;
        tx.commit()?;
        Ok(id)
      })
      .await
  }

  pub async fn update(&self, table: &str, id: i64, fields: Vec<(String, Value)>) -> Result<()> {
    if fields.is_empty() {
      return Err(Error::EmptyFields);
    }
    let assignments = fields
      .iter()
      .enumerate()
      .map(|(i, (name, _))| format!("{} = ?{}", quote_ident(name), i + 1))
      .collect::<Vec<_>>()
      .join(", ");
    let sql = format!(
      "UPDATE {} SET {} WHERE {} = ?{}",
      quote_ident(table),
      assignments,
      quote_ident(ID_COLUMN),
      fields.len() + 1
    );
    debug!(%sql, "update row");

    let mut values: Vec<SqlValue> = fields.into_iter().map(|(_, v)| SqlValue(v)).collect();
    values.push(SqlValue(Value::Integer(id)));
    let table_name = table.to_owned();

    self
      .conn
      .run(move |conn| {
        let changed = conn.execute(&sql, rusqlite::params_from_iter(values.iter()))?;
        if changed == 0 {
          return Err(Error::RowNotFound { table: table_name, id });
        }
        Ok(())
      })
      .await
  }

  pub async fn delete(&self, table: &str, id: i64) -> Result<()> {
    let sql = format!("DELETE FROM {} WHERE {} = ?1", quote_ident(table), quote_ident(ID_COLUMN));
    let table_name = table.to_owned();

    self
      .conn
      .run(move |conn| {
        let changed = conn.execute(&sql, [id])?;
        if changed == 0 {
          return Err(Error::RowNotFound { table: table_name, id });
        }
        Ok(())
      })
      .await
  }
}

fn column_types(columns: &[Column]) -> Vec<(String, ColumnType)> {
  columns.iter().map(|c| (c.name.clone(), c.column_type)).collect()
}

fn column_names(stmt: &rusqlite::Statement<'_>) -> Vec<String> {
  stmt.column_names().into_iter().map(str::to_owned).collect()
}

fn read_row(
  row: &rusqlite::Row<'_>,
  names: &[String],
  types: &[(String, ColumnType)],
) -> rusqlite::Result<Row> {
  let mut out = Row::new();
  for (i, name) in names.iter().enumerate() {
    let ty = types
      .iter()
      .find(|(n, _)| n.eq_ignore_ascii_case(name))
      .map(|(_, ty)| *ty);
    out.insert(name.clone(), decode_value(row.get_ref(i)?, ty));
  }
  Ok(out)
}

//! Table-level DDL: create, duplicate, rename, drop, and the physical
//! listing with engine statistics.

use plinth_core::schema::{Column, ForeignKey, PhysicalTable};
use rusqlite::OptionalExtension as _;
use tracing::{debug, info};

use super::{column_names, contains_name, shape::Shape, table_exists};
use crate::{
  Error, Result, TenantConnection,
  sql::{column_definition, ident_list, quote_ident},
};

/// The schema every tenant table lives in.
pub const MAIN_SCHEMA: &str = "main";

pub struct TableDdl<'c> {
  conn: &'c TenantConnection,
}

impl<'c> TableDdl<'c> {
  pub(crate) fn new(conn: &'c TenantConnection) -> Self { Self { conn } }

  /// Create `name` with `columns`, then add each declared foreign key as a
  /// separate step. A reference to a missing table or column fails at that
  /// step, after the table itself exists.
  pub async fn create(&self, name: &str, columns: &[Column]) -> Result<()> {
    let sql = create_table_sql(name, columns)?;
    debug!(%sql, "create table");
    self
      .conn
      .run(move |conn| {
        conn.execute_batch(&sql)?;
        Ok(())
      })
      .await?;
    info!(database = self.conn.database(), table = name, "table created");

    for column in columns {
      if let Some(fk) = &column.foreign_key {
        self.add_foreign_key(name, &column.name, fk).await?;
      }
    }
    Ok(())
  }

  /// Add a reference from `table.column` to `fk`, rebuilding the table.
  pub async fn add_foreign_key(&self, table: &str, column: &str, fk: &ForeignKey) -> Result<()> {
    let table = table.to_owned();
    let column = column.to_owned();
    let fk = fk.clone();

    self
      .conn
      .run(move |conn| {
        let target_columns = column_names(conn, &fk.table)?;
        if !contains_name(&target_columns, &fk.column) {
          return Err(Error::ForeignKeyTarget { table: fk.table, column: fk.column });
        }

        let mut shape = Shape::read(conn, &table)?;
        if shape.column_mut(&column).is_none() {
          return Err(Error::ColumnNotFound { table, column });
        }
        shape.add_foreign_key(&column, &fk.table, &fk.column);
        shape.rebuild(conn, None)
      })
      .await
  }

  /// Create `new` with the column names, storage types and rows of
  /// `existing`. Constraints, indexes and defaults are not copied.
  pub async fn duplicate(&self, existing: &str, new: &str) -> Result<()> {
    let existing = existing.to_owned();
    let sql = format!("CREATE TABLE {} AS SELECT * FROM {}", quote_ident(new), quote_ident(&existing));

    self
      .conn
      .run(move |conn| {
        if !table_exists(conn, &existing)? {
          return Err(Error::TableNotFound(existing));
        }
        conn.execute_batch(&sql)?;
        Ok(())
      })
      .await?;
    info!(database = self.conn.database(), table = new, "table duplicated");
    Ok(())
  }

  pub async fn rename(&self, old: &str, new: &str) -> Result<()> {
    let sql = format!("ALTER TABLE {} RENAME TO {}", quote_ident(old), quote_ident(new));
    self
      .conn
      .run(move |conn| {
        conn.execute_batch(&sql)?;
        Ok(())
      })
      .await?;
    info!(database = self.conn.database(), from = old, to = new, "table renamed");
    Ok(())
  }

  pub async fn drop_if_exists(&self, name: &str) -> Result<()> {
    let sql = format!("DROP TABLE IF EXISTS {}", quote_ident(name));
    self
      .conn
      .run(move |conn| {
        conn.execute_batch(&sql)?;
        Ok(())
      })
      .await?;
    info!(database = self.conn.database(), table = name, "table dropped");
    Ok(())
  }

  pub async fn exists(&self, name: &str) -> Result<bool> {
    let name = name.to_owned();
    self.conn.run(move |conn| Ok(table_exists(conn, &name)?)).await
  }

  /// User tables of the main schema, by name, with approximate figures.
  pub async fn list(&self) -> Result<Vec<PhysicalTable>> {
    self
      .conn
      .run(|conn| {
        let mut stmt = conn.prepare(
          r"SELECT name FROM pragma_table_list
            WHERE schema = ?1 AND type = 'table' AND name NOT LIKE 'sqlite\_%' ESCAPE '\'
            ORDER BY name",
        )?;
        let names = stmt
          .query_map([MAIN_SCHEMA], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;

        Ok(names.into_iter().map(|name| physical_table(conn, MAIN_SCHEMA, name)).collect())
      })
      .await
  }

  pub async fn get_by_name_in_schema(&self, schema: &str, name: &str) -> Result<PhysicalTable> {
    let schema = schema.to_owned();
    let name = name.to_owned();

    self
      .conn
      .run(move |conn| {
        let found: Option<String> = conn
          .query_row(
            "SELECT name FROM pragma_table_list
             WHERE schema = ?1 AND name = ?2 COLLATE NOCASE AND type = 'table'",
            [&schema, &name],
            |row| row.get(0),
          )
          .optional()?;
        match found {
          Some(found) => Ok(physical_table(conn, &schema, found)),
          None => Err(Error::TableNotFound(name)),
        }
      })
      .await
  }
}

fn create_table_sql(name: &str, columns: &[Column]) -> Result<String> {
  let mut parts = columns
    .iter()
    .map(column_definition)
    .collect::<plinth_core::Result<Vec<_>>>()?;

  let primary: Vec<&str> = columns.iter().filter(|c| c.primary).map(|c| c.name.as_str()).collect();
  if !primary.is_empty() {
    parts.push(format!("PRIMARY KEY ({})", ident_list(primary.iter().copied())));
  }
  for column in columns.iter().filter(|c| c.unique) {
    if primary.len() == 1 && column.primary {
      continue;
    }
    parts.push(format!("UNIQUE ({})", quote_ident(&column.name)));
  }

  Ok(format!("CREATE TABLE {} ({})", quote_ident(name), parts.join(", ")))
}

/// Statistics are optional: `sqlite_stat1` exists only after `ANALYZE` and
/// `dbstat` only when compiled in. Any failure yields `None`.
fn physical_table(conn: &rusqlite::Connection, schema: &str, name: String) -> PhysicalTable {
  let estimated_rows = conn
    .query_row(
      "SELECT stat FROM sqlite_stat1 WHERE tbl = ?1 ORDER BY idx IS NOT NULL LIMIT 1",
      [&name],
      |row| row.get::<_, String>(0),
    )
    .ok()
    .and_then(|stat| stat.split_whitespace().next().and_then(|n| n.parse().ok()));

  let total_size = conn
    .query_row(
      "SELECT SUM(pgsize) FROM dbstat(?2) WHERE name = ?1",
      [name.as_str(), schema],
      |row| row.get::<_, Option<i64>>(0),
    )
    .ok()
    .flatten();

  PhysicalTable { name, schema: schema.to_owned(), estimated_rows, total_size }
}

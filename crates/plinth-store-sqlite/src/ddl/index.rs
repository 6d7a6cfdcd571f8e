//! Index DDL. Only explicitly created indexes are visible here; the ones
//! SQLite creates for keys and `UNIQUE` constraints are not.

use plinth_core::{request::CreateIndex, schema::IndexView};
use tracing::info;

use super::{column_names, contains_name, schema_object_exists, table_exists};
use crate::{
  Error, Result, TenantConnection,
  sql::{ident_list, quote_ident},
};

pub struct IndexDdl<'c> {
  conn: &'c TenantConnection,
}

impl<'c> IndexDdl<'c> {
  pub(crate) fn new(conn: &'c TenantConnection) -> Self { Self { conn } }

  pub async fn list(&self, table: &str) -> Result<Vec<IndexView>> {
    let table = table.to_owned();
    self.conn.run(move |conn| indexes_of(conn, &table)).await
  }

  pub async fn get_by_name(&self, table: &str, name: &str) -> Result<IndexView> {
    let found = self
      .list(table)
      .await?
      .into_iter()
      .find(|index| index.name.eq_ignore_ascii_case(name));
    found.ok_or_else(|| Error::IndexNotFound { table: table.to_owned(), index: name.to_owned() })
  }

  /// Create the index described by `request` on `table`.
  ///
  /// The request is validated first; a reserved name, a name already used
  /// by any table or index, or a bad column list is rejected without
  /// touching the database.
  pub async fn create(&self, table: &str, request: &CreateIndex) -> Result<()> {
    request.validate()?;

    let sql = format!(
      "CREATE {}INDEX {} ON {} ({})",
      if request.is_unique { "UNIQUE " } else { "" },
      quote_ident(&request.name),
      quote_ident(table),
      ident_list(request.columns.iter().map(String::as_str))
    );
    let table_name = table.to_owned();
    let columns = request.columns.clone();
    let index_name = request.name.clone();

    self
      .conn
      .run(move |conn| {
        let existing = column_names(conn, &table_name)?;
        if existing.is_empty() {
          return Err(Error::TableNotFound(table_name));
        }
        if !columns.iter().all(|c| contains_name(&existing, c)) {
          return Err(Error::IndexColumnNotFound(table_name));
        }
        if schema_object_exists(conn, &index_name)? {
          return Err(Error::DuplicateIndexName(index_name));
        }
        conn.execute_batch(&sql)?;
        Ok(())
      })
      .await?;
    info!(database = self.conn.database(), table, index = %request.name, "index created");
    Ok(())
  }

  /// Drop index `name`; it must belong to `table`.
  pub async fn delete(&self, table: &str, name: &str) -> Result<()> {
    let index = self.get_by_name(table, name).await?;
    let sql = format!("DROP INDEX {}", quote_ident(&index.name));
    self
      .conn
      .run(move |conn| {
        conn.execute_batch(&sql)?;
        Ok(())
      })
      .await?;
    info!(database = self.conn.database(), table, index = name, "index dropped");
    Ok(())
  }
}

fn indexes_of(conn: &rusqlite::Connection, table: &str) -> Result<Vec<IndexView>> {
  if !table_exists(conn, table)? {
    return Err(Error::TableNotFound(table.to_owned()));
  }

  let mut stmt = conn.prepare(
    r#"SELECT name, "unique" FROM pragma_index_list(?1) WHERE origin = 'c' ORDER BY name"#,
  )?;
  let listed = stmt
    .query_map([table], |row| Ok((row.get::<_, String>(0)?, row.get::<_, bool>(1)?)))?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  let mut index_info = conn.prepare("SELECT name FROM pragma_index_info(?1) ORDER BY seqno")?;
  let mut views = Vec::with_capacity(listed.len());
  for (name, is_unique) in listed {
    let columns = index_info
      .query_map([&name], |row| row.get(0))?
      .collect::<rusqlite::Result<Vec<String>>>()?;
    views.push(IndexView { name, columns, is_unique });
  }
  Ok(views)
}

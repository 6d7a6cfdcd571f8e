//! Translation of catalog definitions into DDL against a tenant database.
//!
//! Each translator borrows a [`TenantConnection`](crate::TenantConnection)
//! for the duration of one operation. Names reach SQL only through
//! [`quote_ident`](crate::sql::quote_ident); introspection goes through the
//! table-valued pragmas with bound parameters.

mod column;
mod index;
mod shape;
mod table;

pub use column::ColumnDdl;
pub use index::IndexDdl;
pub use table::{MAIN_SCHEMA, TableDdl};

/// Case-insensitive membership test, matching how SQLite compares names.
fn contains_name(names: &[String], name: &str) -> bool {
  names.iter().any(|n| n.eq_ignore_ascii_case(name))
}

/// Column names of `table`, in declaration order. Empty when the table does
/// not exist.
fn column_names(conn: &rusqlite::Connection, table: &str) -> rusqlite::Result<Vec<String>> {
  let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1) ORDER BY cid")?;
  let names = stmt
    .query_map([table], |row| row.get(0))?
    .collect::<rusqlite::Result<Vec<String>>>()?;
  Ok(names)
}

fn table_exists(conn: &rusqlite::Connection, table: &str) -> rusqlite::Result<bool> {
  conn.query_row(
    "SELECT EXISTS (
       SELECT 1 FROM sqlite_schema WHERE type = 'table' AND name = ?1 COLLATE NOCASE
     )",
    [table],
    |row| row.get(0),
  )
}

/// True when any schema object (table, index, view or trigger) is called
/// `name`. Tables and indexes share one namespace per database.
fn schema_object_exists(conn: &rusqlite::Connection, name: &str) -> rusqlite::Result<bool> {
  conn.query_row(
    "SELECT EXISTS (SELECT 1 FROM sqlite_schema WHERE name = ?1 COLLATE NOCASE)",
    [name],
    |row| row.get(0),
  )
}

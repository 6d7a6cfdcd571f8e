//! Error type for `plinth-store-sqlite`.

use plinth_core::schema::ColumnType;
use rusqlite::ffi;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] plinth_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  // ── Provisioning ──────────────────────────────────────────────────────────
  #[error("invalid database name: {0:?}")]
  InvalidDatabaseName(String),

  #[error("database already exists: {0}")]
  DatabaseExists(String),

  #[error("database not found: {0}")]
  DatabaseNotFound(String),

  // ── Catalog ───────────────────────────────────────────────────────────────
  #[error("project name already taken: {0}")]
  DuplicateProjectName(String),

  #[error("table name already taken: {0}")]
  DuplicateTableName(String),

  #[error("catalog entry not found: {0}")]
  EntryNotFound(Uuid),

  // ── Physical schema ───────────────────────────────────────────────────────
  #[error("table not found: {0}")]
  TableNotFound(String),

  #[error("column not found: {table}.{column}")]
  ColumnNotFound { table: String, column: String },

  #[error("index not found: {index} on {table}")]
  IndexNotFound { table: String, index: String },

  #[error("index name already taken: {0}")]
  DuplicateIndexName(String),

  #[error("index references unknown column on {0}")]
  IndexColumnNotFound(String),

  #[error("foreign key target does not exist: {table}.{column}")]
  ForeignKeyTarget { table: String, column: String },

  #[error("existing rows violate a foreign key on {0}")]
  ForeignKeyViolation(String),

  #[error("existing values of {column} cannot be converted to {to}")]
  IncompatibleType { column: String, to: ColumnType },

  // ── Rows ──────────────────────────────────────────────────────────────────
  #[error("no fields supplied")]
  EmptyFields,

  #[error("row {id} not found in {table}")]
  RowNotFound { table: String, id: i64 },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
  fn engine_error(&self) -> Option<&rusqlite::Error> {
    match self {
      Self::Sqlite(e) | Self::Database(tokio_rusqlite::Error::Rusqlite(e)) => Some(e),
      _ => None,
    }
  }

  /// True when the engine reported a relation that does not exist.
  pub fn is_missing_table(&self) -> bool {
    matches!(
      self.engine_error(),
      Some(rusqlite::Error::SqliteFailure(_, Some(msg))) if msg.starts_with("no such table")
    )
  }
}

/// True when `err` is a violated `UNIQUE` or `PRIMARY KEY` constraint.
pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
  matches!(
    err,
    rusqlite::Error::SqliteFailure(e, _)
      if e.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
        || e.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY
  )
}

impl From<Error> for plinth_core::Error {
  fn from(err: Error) -> Self {
    use plinth_core::Error as Core;

    if err.is_missing_table() {
      return Core::not_found(format!("table.error.notFound: {err}"));
    }

    match err {
      Error::Core(e) => e,
      Error::InvalidDatabaseName(name) => {
        Core::unprocessable(format!("project.error.databaseName: {name}"))
      }
      Error::DatabaseExists(name) => {
        Core::unprocessable(format!("project.error.databaseExists: {name}"))
      }
      Error::DatabaseNotFound(name) => {
        Core::not_found(format!("project.error.databaseNotFound: {name}"))
      }
      Error::DuplicateProjectName(name) => {
        Core::unprocessable(format!("project.error.duplicateName: {name}"))
      }
      Error::DuplicateTableName(name) => {
        Core::unprocessable(format!("table.error.duplicateName: {name}"))
      }
      Error::EntryNotFound(id) => Core::not_found(format!("catalog.error.notFound: {id}")),
      Error::TableNotFound(name) => Core::not_found(format!("table.error.notFound: {name}")),
      Error::ColumnNotFound { table, column } => {
        Core::not_found(format!("column.error.notFound: {table}.{column}"))
      }
      Error::IndexNotFound { table, index } => {
        Core::not_found(format!("index.error.notFound: {index} on {table}"))
      }
      Error::DuplicateIndexName(name) => {
        Core::unprocessable(format!("index.error.duplicateName: {name}"))
      }
      Error::IndexColumnNotFound(table) => {
        Core::unprocessable(format!("index.error.columnNotFound: {table}"))
      }
      Error::ForeignKeyTarget { table, column } => {
        Core::unprocessable(format!("column.error.foreignKeyTarget: {table}.{column}"))
      }
      Error::ForeignKeyViolation(table) => {
        Core::unprocessable(format!("column.error.foreignKeyViolation: {table}"))
      }
      Error::IncompatibleType { column, to } => {
        Core::unprocessable(format!("column.error.incompatibleType: {column} -> {to}"))
      }
      Error::EmptyFields => Core::unprocessable("row.error.emptyFields"),
      Error::RowNotFound { table, id } => {
        Core::not_found(format!("row.error.notFound: {table}/{id}"))
      }
      Error::Json(e) => Core::Serialization(e),
      other => Core::Internal(Box::new(other)),
    }
  }
}

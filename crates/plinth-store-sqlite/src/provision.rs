//! The database provisioner: one SQLite file per project.
//!
//! Tenant databases live in a single data directory as `<name>.db`. Names
//! are restricted to `[a-z0-9_]{1,64}`, so a name can never point outside
//! that directory.

use std::{
  io::ErrorKind,
  path::{Path, PathBuf},
  time::Duration,
};

use rusqlite::OpenFlags;
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
  Error, Result, call,
  ddl::{ColumnDdl, IndexDdl, TableDdl},
  rows::RowEngine,
};

/// Placeholder replaced in seed scripts by the project's role token.
pub const ROLE_PLACEHOLDER: &str = "{{USER_ROLE}}";

const DB_EXTENSION: &str = "db";
const MAX_NAME_LEN: usize = 64;

/// Deterministic role token for a user: `usr_` followed by the hyphenated
/// UUID with `-` replaced by `_`.
pub fn role_token(user_id: Uuid) -> String {
  format!("usr_{}", user_id.hyphenated().to_string().replace('-', "_"))
}

fn validate_name(name: &str) -> Result<()> {
  let valid = !name.is_empty()
    && name.len() <= MAX_NAME_LEN
    && name.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_');
  if valid { Ok(()) } else { Err(Error::InvalidDatabaseName(name.to_owned())) }
}

// ─── Seed outcome ────────────────────────────────────────────────────────────

/// A seed statement (or file) that could not be applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeedError {
  pub file:      String,
  /// Empty when the file itself could not be read.
  pub statement: String,
  pub message:   String,
}

/// Outcome of running the seed scripts against a new database. Failures are
/// recorded and skipped; they never stop the remaining statements.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeedResult {
  pub applied: usize,
  pub skipped: usize,
  pub errors:  Vec<SeedError>,
}

impl SeedResult {
  fn record_failure(&mut self, file: &str, statement: &str, message: String) {
    warn!(file, statement, %message, "seed statement skipped");
    self.skipped += 1;
    self.errors.push(SeedError {
      file: file.to_owned(),
      statement: statement.to_owned(),
      message,
    });
  }
}

// ─── Provisioner ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Provisioner {
  data_dir:     PathBuf,
  seed_dir:     Option<PathBuf>,
  busy_timeout: Duration,
}

impl Provisioner {
  pub fn new(data_dir: impl Into<PathBuf>) -> Self {
    Self {
      data_dir:     data_dir.into(),
      seed_dir:     None,
      busy_timeout: Duration::from_secs(5),
    }
  }

  pub fn with_seed_dir(mut self, seed_dir: impl Into<PathBuf>) -> Self {
    self.seed_dir = Some(seed_dir.into());
    self
  }

  pub fn with_busy_timeout(mut self, busy_timeout: Duration) -> Self {
    self.busy_timeout = busy_timeout;
    self
  }

  pub fn data_dir(&self) -> &Path { &self.data_dir }

  fn path_for(&self, name: &str) -> Result<PathBuf> {
    validate_name(name)?;
    Ok(self.data_dir.join(format!("{name}.{DB_EXTENSION}")))
  }

  /// Create the database `name`. When a seed directory is configured and
  /// `role_owner` is given, seed scripts are run against it with the owner's
  /// role token substituted.
  ///
  /// Fails with [`Error::DatabaseExists`] if the database is already there.
  pub async fn create(&self, name: &str, role_owner: Option<Uuid>) -> Result<SeedResult> {
    let path = self.path_for(name)?;
    tokio::fs::create_dir_all(&self.data_dir).await?;

    tokio::fs::OpenOptions::new()
      .write(true)
      .create_new(true)
      .open(&path)
      .await
      .map_err(|e| match e.kind() {
        ErrorKind::AlreadyExists => Error::DatabaseExists(name.to_owned()),
        _ => Error::Io(e),
      })?;

    let conn = tokio_rusqlite::Connection::open(&path).await?;
    call(&conn, |conn| {
      let mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
      debug!(%mode, "journal mode set");
      Ok(())
    })
    .await?;
    info!(database = name, "database created");

    let mut outcome = SeedResult::default();
    if let (Some(seed_dir), Some(owner)) = (&self.seed_dir, role_owner) {
      outcome = run_seeds(&conn, seed_dir, &role_token(owner)).await?;
      info!(
        database = name,
        applied = outcome.applied,
        skipped = outcome.skipped,
        "seed scripts applied"
      );
    }
    Ok(outcome)
  }

  /// Remove the database `name` and its journal files. Missing files are
  /// not an error.
  pub async fn drop_if_exists(&self, name: &str) -> Result<()> {
    let path = self.path_for(name)?;
    let mut removed = false;
    for suffix in ["", "-wal", "-shm"] {
      let mut target = path.clone().into_os_string();
      target.push(suffix);
      match tokio::fs::remove_file(&target).await {
        Ok(()) => removed = true,
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
      }
    }
    if removed {
      info!(database = name, "database dropped");
    }
    Ok(())
  }

  pub async fn recreate(&self, name: &str) -> Result<SeedResult> {
    self.drop_if_exists(name).await?;
    self.create(name, None).await
  }

  /// Open a connection to an existing database. Never creates one.
  pub async fn connect(&self, name: &str) -> Result<TenantConnection> {
    let path = self.path_for(name)?;
    if !tokio::fs::try_exists(&path).await? {
      return Err(Error::DatabaseNotFound(name.to_owned()));
    }

    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
      | OpenFlags::SQLITE_OPEN_URI
      | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    let conn = tokio_rusqlite::Connection::open_with_flags(&path, flags).await?;

    let busy_timeout = self.busy_timeout;
    call(&conn, move |conn| {
      conn.pragma_update(None, "foreign_keys", true)?;
      conn.busy_timeout(busy_timeout)?;
      Ok(())
    })
    .await?;

    Ok(TenantConnection { name: name.to_owned(), conn })
  }

  pub async fn exists(&self, name: &str) -> Result<bool> {
    let path = self.path_for(name)?;
    Ok(tokio::fs::try_exists(&path).await?)
  }

  /// Names of all databases in the data directory, sorted.
  pub async fn list(&self) -> Result<Vec<String>> {
    let mut entries = match tokio::fs::read_dir(&self.data_dir).await {
      Ok(entries) => entries,
      Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
      Err(e) => return Err(e.into()),
    };

    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
      let path = entry.path();
      if path.extension().and_then(|e| e.to_str()) != Some(DB_EXTENSION) {
        continue;
      }
      if let Some(stem) = path.file_stem().and_then(|s| s.to_str())
        && validate_name(stem).is_ok()
      {
        names.push(stem.to_owned());
      }
    }
    names.sort();
    Ok(names)
  }
}

/// Run every `*.sql` file in `seed_dir`, in file-name order.
async fn run_seeds(
  conn: &tokio_rusqlite::Connection,
  seed_dir: &Path,
  token: &str,
) -> Result<SeedResult> {
  let mut outcome = SeedResult::default();

  let mut files = Vec::new();
  let mut entries = match tokio::fs::read_dir(seed_dir).await {
    Ok(entries) => entries,
    Err(e) => {
      outcome.record_failure(&seed_dir.display().to_string(), "", e.to_string());
      return Ok(outcome);
    }
  };
  while let Some(entry) = entries.next_entry().await? {
    let path = entry.path();
    if path.extension().and_then(|e| e.to_str()) == Some("sql") {
      files.push(path);
    }
  }
  files.sort();

  for path in files {
    let file = path
      .file_name()
      .map(|n| n.to_string_lossy().into_owned())
      .unwrap_or_default();

    let script = match tokio::fs::read_to_string(&path).await {
      Ok(script) => script,
      Err(e) => {
        outcome.record_failure(&file, "", e.to_string());
        continue;
      }
    };

    let statements: Vec<String> = script
      .split(';')
      .map(str::trim)
      .filter(|s| !s.is_empty())
      .map(|s| s.replace(ROLE_PLACEHOLDER, token))
      .collect();

    let results: Vec<(String, Option<String>)> = call(conn, move |conn| {
      Ok(
        statements
          .into_iter()
          .map(|stmt| {
            let failure = conn.execute_batch(&stmt).err().map(|e| e.to_string());
            (stmt, failure)
          })
          .collect(),
      )
    })
    .await?;

    for (statement, failure) in results {
      match failure {
        None => outcome.applied += 1,
        Some(message) => outcome.record_failure(&file, &statement, message),
      }
    }
  }

  Ok(outcome)
}

// ─── Tenant connection ───────────────────────────────────────────────────────

/// A live connection to one tenant database, owned by a single operation.
/// The connection closes when the handle is dropped.
pub struct TenantConnection {
  name: String,
  conn: tokio_rusqlite::Connection,
}

impl TenantConnection {
  pub fn database(&self) -> &str { &self.name }

  pub fn tables(&self) -> TableDdl<'_> { TableDdl::new(self) }

  pub fn columns(&self) -> ColumnDdl<'_> { ColumnDdl::new(self) }

  pub fn indexes(&self) -> IndexDdl<'_> { IndexDdl::new(self) }

  pub fn rows(&self) -> RowEngine<'_> { RowEngine::new(self) }

  /// Run `f` against the underlying connection on its worker thread.
  pub async fn run<T, F>(&self, f: F) -> Result<T>
  where
    F: FnOnce(&mut rusqlite::Connection) -> Result<T> + Send + 'static,
    T: Send + 'static,
  {
    call(&self.conn, f).await
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn role_token_replaces_hyphens() {
    let id = Uuid::parse_str("6f1c2a9e-0b7d-4e11-9a3c-5d2f8e7b1a00").unwrap();
    assert_eq!(role_token(id), "usr_6f1c2a9e_0b7d_4e11_9a3c_5d2f8e7b1a00");
  }

  #[test]
  fn database_names_cannot_escape_the_data_dir() {
    assert!(validate_name("0b7d4e119a3c").is_ok());
    assert!(validate_name("../etc").is_err());
    assert!(validate_name("Upper").is_err());
    assert!(validate_name("").is_err());
    assert!(validate_name(&"a".repeat(65)).is_err());
  }
}

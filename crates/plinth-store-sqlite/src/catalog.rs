//! [`SqliteCatalog`], the SQLite implementation of [`Catalog`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use plinth_core::{
  catalog::{Catalog, MembershipDirectory},
  project::{NewProject, Project},
  schema::{Column, NewTable, Table},
};

use crate::{
  Error, Result, call,
  encode::{
    PROJECT_COLUMNS, RawProject, RawTable, TABLE_COLUMNS, encode_columns, encode_dt,
    encode_uuid,
  },
  error::is_unique_violation,
  schema::CATALOG_SCHEMA,
};

// ─── Catalog ─────────────────────────────────────────────────────────────────

/// The control-plane catalog backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteCatalog {
  conn: tokio_rusqlite::Connection,
}

impl SqliteCatalog {
  /// Open (or create) a catalog at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let catalog = Self { conn };
    catalog.init_schema().await?;
    Ok(catalog)
  }

  /// Open an in-memory catalog for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let catalog = Self { conn };
    catalog.init_schema().await?;
    Ok(catalog)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(CATALOG_SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn fetch_table(&self, filter: &'static str, params: Vec<String>) -> Result<Option<Table>> {
    let sql = format!("SELECT {TABLE_COLUMNS} FROM catalog_tables WHERE {filter}");

    let raw: Option<RawTable> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(&sql, rusqlite::params_from_iter(params), RawTable::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawTable::into_table).transpose()
  }

  async fn require_table(&self, id: Uuid) -> Result<Table> {
    self.get_table(id).await?.ok_or(Error::EntryNotFound(id))
  }
}

// ─── Catalog impl ────────────────────────────────────────────────────────────

impl Catalog for SqliteCatalog {
  type Error = Error;

  // ── Projects ──────────────────────────────────────────────────────────────

  async fn create_project(&self, input: NewProject) -> Result<Project> {
    let now = Utc::now();
    let project = Project {
      id:              Uuid::new_v4(),
      organization_id: input.organization_id,
      name:            input.name,
      db_name:         input.db_name,
      created_by:      input.created_by,
      updated_by:      input.created_by,
      created_at:      now,
      updated_at:      now,
    };

    let id_str  = encode_uuid(project.id);
    let org_str = encode_uuid(project.organization_id);
    let name    = project.name.clone();
    let db_name = project.db_name.clone();
    let by_str  = encode_uuid(project.created_by);
    let at_str  = encode_dt(now);

    call(&self.conn, move |conn| {
      conn
        .execute(
          "INSERT INTO projects (
             project_id, organization_id, name, db_name,
             created_by, updated_by, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?5, ?6, ?6)",
          rusqlite::params![id_str, org_str, name, db_name, by_str, at_str],
        )
        .map_err(|e| {
          if is_unique_violation(&e) { Error::DuplicateProjectName(name.clone()) } else { e.into() }
        })?;
      Ok(())
    })
    .await?;

    Ok(project)
  }

  async fn get_project(&self, id: Uuid) -> Result<Option<Project>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawProject> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE project_id = ?1"),
              rusqlite::params![id_str],
              RawProject::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawProject::into_project).transpose()
  }

  async fn list_projects(&self, organization_id: Uuid) -> Result<Vec<Project>> {
    let org_str = encode_uuid(organization_id);

    let raws: Vec<RawProject> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {PROJECT_COLUMNS} FROM projects
           WHERE organization_id = ?1
           ORDER BY name"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![org_str], RawProject::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawProject::into_project).collect()
  }

  async fn project_exists_by_name(&self, organization_id: Uuid, name: &str) -> Result<bool> {
    let org_str = encode_uuid(organization_id);
    let name = name.to_owned();

    let exists = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT 1 FROM projects WHERE organization_id = ?1 AND name = ?2",
              rusqlite::params![org_str, name],
              |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false),
        )
      })
      .await?;
    Ok(exists)
  }

  async fn delete_project(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);

    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM projects WHERE project_id = ?1", rusqlite::params![id_str])?)
      })
      .await?;
    Ok(deleted > 0)
  }

  // ── Memberships ───────────────────────────────────────────────────────────

  async fn add_organization_member(&self, organization_id: Uuid, user_id: Uuid) -> Result<()> {
    let org_str  = encode_uuid(organization_id);
    let user_str = encode_uuid(user_id);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR IGNORE INTO organization_members (organization_id, user_id)
           VALUES (?1, ?2)",
          rusqlite::params![org_str, user_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Tables ────────────────────────────────────────────────────────────────

  async fn create_table(&self, input: NewTable) -> Result<Table> {
    let now = Utc::now();
    let table = Table {
      id:         Uuid::new_v4(),
      project_id: input.project_id,
      name:       input.name,
      columns:    input.columns,
      created_by: input.created_by,
      updated_by: input.created_by,
      created_at: now,
      updated_at: now,
    };

    let id_str      = encode_uuid(table.id);
    let project_str = encode_uuid(table.project_id);
    let name        = table.name.clone();
    let columns_str = encode_columns(&table.columns)?;
    let by_str      = encode_uuid(table.created_by);
    let at_str      = encode_dt(now);

    call(&self.conn, move |conn| {
      conn
        .execute(
          "INSERT INTO catalog_tables (
             table_id, project_id, name, columns,
             created_by, updated_by, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?5, ?6, ?6)",
          rusqlite::params![id_str, project_str, name, columns_str, by_str, at_str],
        )
        .map_err(|e| {
          if is_unique_violation(&e) { Error::DuplicateTableName(name.clone()) } else { e.into() }
        })?;
      Ok(())
    })
    .await?;

    Ok(table)
  }

  async fn get_table(&self, id: Uuid) -> Result<Option<Table>> {
    self.fetch_table("table_id = ?1", vec![encode_uuid(id)]).await
  }

  async fn get_table_by_name(&self, project_id: Uuid, name: &str) -> Result<Option<Table>> {
    self
      .fetch_table("project_id = ?1 AND name = ?2", vec![encode_uuid(project_id), name.to_owned()])
      .await
  }

  async fn list_tables(&self, project_id: Uuid) -> Result<Vec<Table>> {
    let project_str = encode_uuid(project_id);

    let raws: Vec<RawTable> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {TABLE_COLUMNS} FROM catalog_tables
           WHERE project_id = ?1
           ORDER BY name"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![project_str], RawTable::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawTable::into_table).collect()
  }

  async fn table_exists_by_name(&self, project_id: Uuid, name: &str) -> Result<bool> {
    let project_str = encode_uuid(project_id);
    let name = name.to_owned();

    let exists = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT 1 FROM catalog_tables WHERE project_id = ?1 AND name = ?2",
              rusqlite::params![project_str, name],
              |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false),
        )
      })
      .await?;
    Ok(exists)
  }

  async fn rename_table(&self, id: Uuid, name: &str, updated_by: Uuid) -> Result<Table> {
    let id_str = encode_uuid(id);
    let name   = name.to_owned();
    let by_str = encode_uuid(updated_by);
    let at_str = encode_dt(Utc::now());

    let changed = call(&self.conn, move |conn| {
      conn
        .execute(
          "UPDATE catalog_tables
           SET name = ?2, updated_by = ?3, updated_at = ?4
           WHERE table_id = ?1",
          rusqlite::params![id_str, name, by_str, at_str],
        )
        .map_err(|e| {
          if is_unique_violation(&e) { Error::DuplicateTableName(name.clone()) } else { e.into() }
        })
    })
    .await?;

    if changed == 0 {
      return Err(Error::EntryNotFound(id));
    }
    self.require_table(id).await
  }

  async fn update_columns(&self, id: Uuid, columns: Vec<Column>, updated_by: Uuid) -> Result<Table> {
    let id_str      = encode_uuid(id);
    let columns_str = encode_columns(&columns)?;
    let by_str      = encode_uuid(updated_by);
    let at_str      = encode_dt(Utc::now());

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE catalog_tables
           SET columns = ?2, updated_by = ?3, updated_at = ?4
           WHERE table_id = ?1",
          rusqlite::params![id_str, columns_str, by_str, at_str],
        )?)
      })
      .await?;

    if changed == 0 {
      return Err(Error::EntryNotFound(id));
    }
    self.require_table(id).await
  }

  async fn delete_table(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);

    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM catalog_tables WHERE table_id = ?1", rusqlite::params![id_str])?)
      })
      .await?;
    Ok(deleted > 0)
  }
}

impl MembershipDirectory for SqliteCatalog {
  type Error = Error;

  async fn is_organization_member(&self, organization_id: Uuid, user_id: Uuid) -> Result<bool> {
    let org_str  = encode_uuid(organization_id);
    let user_str = encode_uuid(user_id);

    let member = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT 1 FROM organization_members WHERE organization_id = ?1 AND user_id = ?2",
              rusqlite::params![org_str, user_str],
              |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false),
        )
      })
      .await?;
    Ok(member)
  }
}

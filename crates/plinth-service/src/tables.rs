//! Table operations: catalog entry first, then the physical table.

use plinth_core::{
  Error, Result,
  catalog::{Catalog, MembershipDirectory},
  name::{self, NameKind},
  policy::Capability,
  project::{Principal, Project},
  request::{CreateTable, RenameTable},
  schema::{Column, ForeignKey, NewTable, PhysicalTable, Table, TableView, renumber},
};
use plinth_store_sqlite::ddl::MAIN_SCHEMA;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{Services, catalog_error};

fn duplicate_name(name: &str) -> Error {
  Error::unprocessable(format!("table.error.duplicateName: {name}"))
}

impl<C> Services<C>
where
  C: Catalog + MembershipDirectory,
{
  /// Create a table in the catalog and in the project database.
  ///
  /// Repeating a request whose catalog entry exists but whose physical table
  /// does not (an earlier attempt failed after the catalog write) re-runs the
  /// physical step instead of failing as a duplicate, provided the columns
  /// are the same.
  pub async fn create_table(
    &self,
    principal: &Principal,
    project_id: Uuid,
    request: CreateTable,
  ) -> Result<TableView> {
    let project = self.authorize(project_id, principal, Capability::Create).await?;
    request.validate()?;

    let mut columns = request.columns;
    renumber(&mut columns);

    if let Some(existing) = self
      .catalog
      .get_table_by_name(project.id, &request.name)
      .await
      .map_err(catalog_error)?
    {
      return self.resume_create(&project, existing, &columns).await;
    }

    let table = self
      .catalog
      .create_table(NewTable {
        project_id: project.id,
        name: request.name,
        columns,
        created_by: principal.id,
      })
      .await
      .map_err(catalog_error)?;

    let conn = self.connect(&project).await?;
    conn.tables().create(&table.name, &table.columns).await?;
    info!(project = %project.id, table = %table.name, "table created");
    Ok(table.into())
  }

  async fn resume_create(
    &self,
    project: &Project,
    existing: Table,
    columns: &[Column],
  ) -> Result<TableView> {
    if existing.columns != columns {
      return Err(duplicate_name(&existing.name));
    }
    let conn = self.connect(project).await?;
    if conn.tables().exists(&existing.name).await? {
      return Err(duplicate_name(&existing.name));
    }

    warn!(project = %project.id, table = %existing.name, "catalog entry has no physical table; retrying");
    conn.tables().create(&existing.name, &existing.columns).await?;
    Ok(existing.into())
  }

  /// Copy `source` (names, types and rows) into a new table `target`.
  /// The copy has no constraints, defaults or indexes.
  pub async fn duplicate_table(
    &self,
    principal: &Principal,
    project_id: Uuid,
    source: &str,
    target: &str,
  ) -> Result<TableView> {
    let project = self.authorize(project_id, principal, Capability::Update).await?;
    name::validate(NameKind::Table, target)?;

    let source = self.require_table(&project, source).await?;
    if self
      .catalog
      .table_exists_by_name(project.id, target)
      .await
      .map_err(catalog_error)?
    {
      return Err(duplicate_name(target));
    }

    let mut columns: Vec<Column> = source
      .columns
      .iter()
      .map(|c| Column::new(c.name.clone(), c.column_type))
      .collect();
    renumber(&mut columns);

    let table = self
      .catalog
      .create_table(NewTable {
        project_id: project.id,
        name: target.to_owned(),
        columns,
        created_by: principal.id,
      })
      .await
      .map_err(catalog_error)?;

    let conn = self.connect(&project).await?;
    conn.tables().duplicate(&source.name, &table.name).await?;
    info!(project = %project.id, from = %source.name, to = %table.name, "table duplicated");
    Ok(table.into())
  }

  pub async fn rename_table(
    &self,
    principal: &Principal,
    project_id: Uuid,
    name: &str,
    request: RenameTable,
  ) -> Result<TableView> {
    let project = self.authorize(project_id, principal, Capability::Update).await?;
    request.validate()?;

    let table = self.require_table(&project, name).await?;
    // Case-insensitive: a new spelling of the current name is also taken.
    if self
      .catalog
      .table_exists_by_name(project.id, &request.name)
      .await
      .map_err(catalog_error)?
    {
      return Err(duplicate_name(&request.name));
    }

    let renamed = self
      .catalog
      .rename_table(table.id, &request.name, principal.id)
      .await
      .map_err(catalog_error)?;
    self
      .retarget_references(&project, principal.id, |fk| {
        let hit = name::same(&fk.table, &table.name);
        if hit {
          fk.table = renamed.name.clone();
        }
        hit
      })
      .await?;

    let conn = self.connect(&project).await?;
    conn.tables().rename(&table.name, &renamed.name).await?;
    info!(project = %project.id, from = %table.name, to = %renamed.name, "table renamed");
    Ok(renamed.into())
  }

  /// Rewrite catalog foreign keys for which `retarget` returns true. The
  /// engine follows renames on its own; this keeps the catalog in step.
  pub(crate) async fn retarget_references(
    &self,
    project: &Project,
    updated_by: Uuid,
    retarget: impl Fn(&mut ForeignKey) -> bool,
  ) -> Result<()> {
    for mut table in self.catalog.list_tables(project.id).await.map_err(catalog_error)? {
      let mut changed = false;
      for fk in table.columns.iter_mut().filter_map(|c| c.foreign_key.as_mut()) {
        changed |= retarget(fk);
      }
      if changed {
        self
          .catalog
          .update_columns(table.id, table.columns, updated_by)
          .await
          .map_err(catalog_error)?;
      }
    }
    Ok(())
  }

  /// Remove the catalog entry, then drop the table. Irreversible, and
  /// refused while another table holds a foreign key to it.
  pub async fn delete_table(&self, principal: &Principal, project_id: Uuid, name: &str) -> Result<()> {
    let project = self.authorize(project_id, principal, Capability::Update).await?;
    let table = self.require_table(&project, name).await?;

    let tables = self.catalog.list_tables(project.id).await.map_err(catalog_error)?;
    let referencing: Vec<&str> = tables
      .iter()
      .filter(|other| other.id != table.id)
      .filter(|other| {
        other
          .columns
          .iter()
          .filter_map(|c| c.foreign_key.as_ref())
          .any(|fk| name::same(&fk.table, &table.name))
      })
      .map(|other| other.name.as_str())
      .collect();
    if !referencing.is_empty() {
      return Err(Error::unprocessable(format!(
        "table.error.referenced: {} by {}",
        table.name,
        referencing.join(", ")
      )));
    }

    self.catalog.delete_table(table.id).await.map_err(catalog_error)?;
    let conn = self.connect(&project).await?;
    conn.tables().drop_if_exists(&table.name).await?;
    info!(project = %project.id, table = %table.name, "table deleted");
    Ok(())
  }

  pub async fn show_table(&self, principal: &Principal, project_id: Uuid, name: &str) -> Result<TableView> {
    let project = self.authorize(project_id, principal, Capability::Access).await?;
    Ok(self.require_table(&project, name).await?.into())
  }

  pub async fn list_tables(&self, principal: &Principal, project_id: Uuid) -> Result<Vec<TableView>> {
    let project = self.authorize(project_id, principal, Capability::Access).await?;
    let tables = self.catalog.list_tables(project.id).await.map_err(catalog_error)?;
    Ok(tables.into_iter().map(TableView::from).collect())
  }

  /// Tables as the engine reports them, with approximate sizes.
  pub async fn physical_tables(
    &self,
    principal: &Principal,
    project_id: Uuid,
  ) -> Result<Vec<PhysicalTable>> {
    let project = self.authorize(project_id, principal, Capability::Access).await?;
    let conn = self.connect(&project).await?;
    Ok(conn.tables().list().await?)
  }

  pub async fn physical_table(
    &self,
    principal: &Principal,
    project_id: Uuid,
    name: &str,
  ) -> Result<PhysicalTable> {
    let project = self.authorize(project_id, principal, Capability::Access).await?;
    let conn = self.connect(&project).await?;
    Ok(conn.tables().get_by_name_in_schema(MAIN_SCHEMA, name).await?)
  }
}

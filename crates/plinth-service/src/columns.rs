//! Column operations. The catalog's column list is rewritten first, then
//! the physical table is changed one column at a time.

use plinth_core::{
  Error, ErrorKind, Result,
  catalog::{Catalog, MembershipDirectory},
  name,
  policy::Capability,
  project::Principal,
  request::{AddColumns, AlterColumn, RenameColumn},
  schema::{Column, TableView, renumber},
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{Services, catalog_error};

impl<C> Services<C>
where
  C: Catalog + MembershipDirectory,
{
  /// Append columns. Sequential and fail-fast: columns added before a
  /// failure stay added.
  pub async fn add_columns(
    &self,
    principal: &Principal,
    project_id: Uuid,
    table: &str,
    request: AddColumns,
  ) -> Result<TableView> {
    let project = self.authorize(project_id, principal, Capability::Update).await?;
    let table = self.require_table(&project, table).await?;
    let existing: Vec<&str> = table.columns.iter().map(|c| c.name.as_str()).collect();
    request.validate(&existing)?;

    let mut columns = table.columns.clone();
    columns.extend(request.columns.iter().cloned());
    renumber(&mut columns);
    let updated = self
      .catalog
      .update_columns(table.id, columns, principal.id)
      .await
      .map_err(catalog_error)?;

    let conn = self.connect(&project).await?;
    conn.columns().create_many(&table.name, &request.columns).await?;
    info!(project = %project.id, table = %table.name, count = request.columns.len(), "columns added");
    Ok(updated.into())
  }

  /// Change column types. A column whose stored values do not fit the new
  /// type is left untouched, as is every column after it, and the catalog
  /// is rolled back to match.
  pub async fn alter_columns(
    &self,
    principal: &Principal,
    project_id: Uuid,
    table: &str,
    changes: Vec<AlterColumn>,
  ) -> Result<TableView> {
    let project = self.authorize(project_id, principal, Capability::Update).await?;
    let table = self.require_table(&project, table).await?;
    if changes.is_empty() {
      return Err(Error::unprocessable("column.error.columnsRequired"));
    }
    let target = with_types(&table.columns, &changes)?;

    let updated = self
      .catalog
      .update_columns(table.id, target, principal.id)
      .await
      .map_err(catalog_error)?;

    let conn = self.connect(&project).await?;
    for (done, change) in changes.iter().enumerate() {
      let Err(err) = conn.columns().alter(&table.name, &change.name, change.column_type).await else {
        continue;
      };
      let err = Error::from(err);
      if err.kind() == ErrorKind::Unprocessable {
        warn!(table = %table.name, column = %change.name, "type change rejected; restoring catalog");
        let applied = with_types(&table.columns, &changes[..done])?;
        self
          .catalog
          .update_columns(table.id, applied, principal.id)
          .await
          .map_err(catalog_error)?;
      }
      return Err(err);
    }

    info!(project = %project.id, table = %table.name, count = changes.len(), "column types changed");
    Ok(updated.into())
  }

  pub async fn rename_column(
    &self,
    principal: &Principal,
    project_id: Uuid,
    table: &str,
    request: RenameColumn,
  ) -> Result<TableView> {
    let project = self.authorize(project_id, principal, Capability::Update).await?;
    request.validate()?;
    let table = self.require_table(&project, table).await?;

    let old = table
      .column(&request.old)
      .map(|c| c.name.clone())
      .ok_or_else(|| column_not_found(&table.name, &request.old))?;
    if table.column(&request.new).is_some() {
      return Err(Error::unprocessable(format!("column.error.duplicateName: {}", request.new)));
    }

    let mut columns = table.columns.clone();
    for column in columns.iter_mut().filter(|c| name::same(&c.name, &old)) {
      column.name = request.new.clone();
    }
    self
      .catalog
      .update_columns(table.id, columns, principal.id)
      .await
      .map_err(catalog_error)?;
    self
      .retarget_references(&project, principal.id, |fk| {
        let hit = name::same(&fk.table, &table.name) && name::same(&fk.column, &old);
        if hit {
          fk.column = request.new.clone();
        }
        hit
      })
      .await?;

    let conn = self.connect(&project).await?;
    conn.columns().rename(&table.name, &old, &request.new).await?;
    info!(project = %project.id, table = %table.name, from = %old, to = %request.new, "column renamed");
    Ok(self.require_table(&project, &table.name).await?.into())
  }

  /// Remove a column and its data. Key, unique and referencing columns
  /// cannot be dropped.
  pub async fn drop_column(
    &self,
    principal: &Principal,
    project_id: Uuid,
    table: &str,
    column: &str,
  ) -> Result<TableView> {
    let project = self.authorize(project_id, principal, Capability::Update).await?;
    let table = self.require_table(&project, table).await?;

    let target = table.column(column).ok_or_else(|| column_not_found(&table.name, column))?;
    if target.primary || target.unique || target.foreign_key.is_some() {
      return Err(Error::unprocessable(format!("column.error.constrained: {}", target.name)));
    }
    if table.columns.len() == 1 {
      return Err(Error::unprocessable(format!("column.error.lastColumn: {}", target.name)));
    }
    let dropped = target.name.clone();

    let mut columns: Vec<Column> =
      table.columns.iter().filter(|c| c.name != dropped).cloned().collect();
    renumber(&mut columns);
    let updated = self
      .catalog
      .update_columns(table.id, columns, principal.id)
      .await
      .map_err(catalog_error)?;

    let conn = self.connect(&project).await?;
    conn.columns().drop(&table.name, &dropped).await?;
    info!(project = %project.id, table = %table.name, column = %dropped, "column dropped");
    Ok(updated.into())
  }
}

fn column_not_found(table: &str, column: &str) -> Error {
  Error::not_found(format!("column.error.notFound: {table}.{column}"))
}

/// `columns` with each change applied. Every named column must exist and
/// its default must still decode under the new type.
fn with_types(columns: &[Column], changes: &[AlterColumn]) -> Result<Vec<Column>> {
  let mut out = columns.to_vec();
  for change in changes {
    let column = out
      .iter_mut()
      .find(|c| name::same(&c.name, &change.name))
      .ok_or_else(|| Error::not_found(format!("column.error.notFound: {}", change.name)))?;
    column.column_type = change.column_type;
    column.default_value()?;
  }
  Ok(out)
}

#[cfg(test)]
mod tests {
  use plinth_core::schema::ColumnType;
  use serde_json::json;

  use super::*;

  fn alter(name: &str, ty: ColumnType) -> AlterColumn {
    AlterColumn { name: name.into(), column_type: ty }
  }

  #[test]
  fn with_types_changes_only_named_columns() {
    let columns = vec![
      Column::new("id", ColumnType::Integer).primary(),
      Column::new("age", ColumnType::Text),
    ];
    let out = with_types(&columns, &[alter("AGE", ColumnType::Integer)]).unwrap();
    assert_eq!(out[0].column_type, ColumnType::Integer);
    assert_eq!(out[1].column_type, ColumnType::Integer);
    assert_eq!(out[1].name, "age");
  }

  #[test]
  fn with_types_rejects_unknown_columns() {
    let columns = vec![Column::new("id", ColumnType::Integer)];
    let err = with_types(&columns, &[alter("missing", ColumnType::Text)]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
  }

  #[test]
  fn with_types_rejects_defaults_that_no_longer_decode() {
    let columns = vec![Column::new("label", ColumnType::Text).with_default(json!("n/a"))];
    let err = with_types(&columns, &[alter("label", ColumnType::Integer)]).unwrap_err();
    assert!(err.to_string().contains("column.error.invalidDefault"));
  }
}

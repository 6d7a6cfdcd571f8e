//! Read-only comparison of a project's catalog with its database.

use plinth_core::{
  Result,
  catalog::{Catalog, MembershipDirectory},
  name,
  policy::Capability,
  project::Principal,
  schema::{ColumnMismatch, SchemaDrift},
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{Services, catalog_error};

impl<C> Services<C>
where
  C: Catalog + MembershipDirectory,
{
  /// Report where the catalog and the physical schema disagree. Nothing is
  /// repaired; every finding is logged.
  pub async fn reconcile(&self, principal: &Principal, project_id: Uuid) -> Result<SchemaDrift> {
    let project = self.authorize(project_id, principal, Capability::Access).await?;
    let tables = self.catalog.list_tables(project.id).await.map_err(catalog_error)?;

    let conn = self.connect(&project).await?;
    let physical: Vec<String> = conn.tables().list().await?.into_iter().map(|t| t.name).collect();

    let mut drift = SchemaDrift::default();
    for table in &tables {
      let Some(found) = physical.iter().find(|p| name::same(p, &table.name)) else {
        warn!(project = %project.id, table = %table.name, "catalog table has no physical table");
        drift.missing_physical.push(table.name.clone());
        continue;
      };

      let actual = conn.columns().list(found).await?;
      let mismatch = ColumnMismatch {
        table:             table.name.clone(),
        missing_columns:   table
          .columns
          .iter()
          .filter(|c| !actual.iter().any(|a| name::same(a, &c.name)))
          .map(|c| c.name.clone())
          .collect(),
        untracked_columns: actual
          .iter()
          .filter(|a| table.column(a).is_none())
          .cloned()
          .collect(),
      };
      if !mismatch.missing_columns.is_empty() || !mismatch.untracked_columns.is_empty() {
        warn!(project = %project.id, table = %table.name, ?mismatch, "column drift");
        drift.column_mismatches.push(mismatch);
      }
    }

    for physical_name in physical {
      if !tables.iter().any(|t| name::same(&t.name, &physical_name)) {
        warn!(project = %project.id, table = %physical_name, "physical table has no catalog entry");
        drift.untracked_physical.push(physical_name);
      }
    }

    if drift.is_clean() {
      info!(project = %project.id, "catalog and database agree");
    }
    Ok(drift)
  }
}

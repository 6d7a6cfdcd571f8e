//! Index operations. Indexes live only in the project database; the
//! catalog is consulted for the table but never written.

use plinth_core::{
  Result,
  catalog::{Catalog, MembershipDirectory},
  policy::Capability,
  project::Principal,
  request::CreateIndex,
  schema::IndexView,
};
use tracing::info;
use uuid::Uuid;

use crate::Services;

impl<C> Services<C>
where
  C: Catalog + MembershipDirectory,
{
  /// Create an index. Reserved names and malformed column lists are
  /// rejected before the project database is opened.
  pub async fn create_index(
    &self,
    principal: &Principal,
    project_id: Uuid,
    table: &str,
    request: CreateIndex,
  ) -> Result<IndexView> {
    let project = self.authorize(project_id, principal, Capability::Update).await?;
    request.validate()?;
    let table = self.require_table(&project, table).await?;

    let conn = self.connect(&project).await?;
    conn.indexes().create(&table.name, &request).await?;
    info!(project = %project.id, table = %table.name, index = %request.name, "index created");
    Ok(conn.indexes().get_by_name(&table.name, &request.name).await?)
  }

  pub async fn list_indexes(
    &self,
    principal: &Principal,
    project_id: Uuid,
    table: &str,
  ) -> Result<Vec<IndexView>> {
    let project = self.authorize(project_id, principal, Capability::Access).await?;
    let table = self.require_table(&project, table).await?;
    let conn = self.connect(&project).await?;
    Ok(conn.indexes().list(&table.name).await?)
  }

  pub async fn show_index(
    &self,
    principal: &Principal,
    project_id: Uuid,
    table: &str,
    name: &str,
  ) -> Result<IndexView> {
    let project = self.authorize(project_id, principal, Capability::Access).await?;
    let table = self.require_table(&project, table).await?;
    let conn = self.connect(&project).await?;
    Ok(conn.indexes().get_by_name(&table.name, name).await?)
  }

  pub async fn delete_index(
    &self,
    principal: &Principal,
    project_id: Uuid,
    table: &str,
    name: &str,
  ) -> Result<()> {
    let project = self.authorize(project_id, principal, Capability::Update).await?;
    let table = self.require_table(&project, table).await?;
    let conn = self.connect(&project).await?;
    conn.indexes().delete(&table.name, name).await?;
    info!(project = %project.id, table = %table.name, index = name, "index deleted");
    Ok(())
  }
}

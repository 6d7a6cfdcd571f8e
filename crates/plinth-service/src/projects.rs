//! Project lifecycle: one catalog entry plus one tenant database each.

use plinth_core::{
  Error, Result,
  catalog::{Catalog, MembershipDirectory},
  policy::Capability,
  project::{NewProject, Principal, Project, generate_db_name},
  request::CreateProject,
};
use plinth_store_sqlite::SeedResult;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{Services, catalog_error};

/// A freshly provisioned project and the outcome of its seed scripts.
#[derive(Debug, Clone, Serialize)]
pub struct ProvisionedProject {
  pub project: Project,
  pub seed:    SeedResult,
}

impl<C> Services<C>
where
  C: Catalog + MembershipDirectory,
{
  /// Record the project, then create its database with the caller as the
  /// seed scripts' role owner.
  ///
  /// When the database cannot be created the catalog entry is removed
  /// again: nothing can refer to a project that never had a database.
  pub async fn create_project(
    &self,
    principal: &Principal,
    request: CreateProject,
  ) -> Result<ProvisionedProject> {
    self.gate(Capability::Create, request.organization_id, principal).await?;
    request.validate()?;

    let name = request.name.trim().to_owned();
    if self
      .catalog
      .project_exists_by_name(request.organization_id, &name)
      .await
      .map_err(catalog_error)?
    {
      return Err(Error::unprocessable(format!("project.error.duplicateName: {name}")));
    }

    let project = self
      .catalog
      .create_project(NewProject {
        organization_id: request.organization_id,
        name,
        db_name: generate_db_name(),
        created_by: principal.id,
      })
      .await
      .map_err(catalog_error)?;

    match self.provisioner.create(&project.db_name, Some(principal.id)).await {
      Ok(seed) => {
        info!(project = %project.id, database = %project.db_name, "project provisioned");
        Ok(ProvisionedProject { project, seed })
      }
      Err(err) => {
        warn!(project = %project.id, error = %err, "provisioning failed; removing catalog entry");
        self.catalog.delete_project(project.id).await.map_err(catalog_error)?;
        Err(err.into())
      }
    }
  }

  pub async fn get_project(&self, principal: &Principal, project_id: Uuid) -> Result<Project> {
    self.authorize(project_id, principal, Capability::Access).await
  }

  pub async fn list_projects(
    &self,
    principal: &Principal,
    organization_id: Uuid,
  ) -> Result<Vec<Project>> {
    self.gate(Capability::Access, organization_id, principal).await?;
    self.catalog.list_projects(organization_id).await.map_err(catalog_error)
  }

  /// Remove the catalog entry (and its tables), then drop the database.
  /// Irreversible.
  pub async fn delete_project(&self, principal: &Principal, project_id: Uuid) -> Result<()> {
    let project = self.authorize(project_id, principal, Capability::Update).await?;

    if !self.catalog.delete_project(project.id).await.map_err(catalog_error)? {
      return Err(Error::not_found(format!("project.error.notFound: {project_id}")));
    }
    self.provisioner.drop_if_exists(&project.db_name).await?;
    info!(project = %project.id, database = %project.db_name, "project deleted");
    Ok(())
  }

  /// Operator bootstrap: make `user_id` a member of `organization_id`.
  pub async fn add_organization_member(&self, organization_id: Uuid, user_id: Uuid) -> Result<()> {
    self
      .catalog
      .add_organization_member(organization_id, user_id)
      .await
      .map_err(catalog_error)?;
    info!(organization = %organization_id, user = %user_id, "member added");
    Ok(())
  }

  /// Names of every tenant database on disk, including ones no project
  /// refers to.
  pub async fn databases(&self) -> Result<Vec<String>> { Ok(self.provisioner.list().await?) }
}

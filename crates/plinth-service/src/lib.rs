//! Orchestration for the Plinth control plane.
//!
//! [`Services`] is assembled once from its parts: a [`Catalog`], the
//! [`Provisioner`] for tenant databases, and the [`ProjectPolicy`] gate.
//! Every operation runs the same sequence: ask the gate, validate the
//! input, consult and write the catalog, then open one tenant connection
//! and apply the physical change. The connection is dropped when the
//! operation returns.
//!
//! The catalog is written before the physical schema. A physical failure
//! after a successful catalog write is not compensated (except where noted
//! on the operation); [`Services::reconcile`] reports the resulting drift.

pub mod columns;
pub mod config;
pub mod indexes;
pub mod projects;
pub mod reconcile;
pub mod rows;
pub mod tables;

use std::sync::Arc;

use plinth_core::{
  Error, Result,
  catalog::{Catalog, MembershipDirectory},
  policy::{Capability, ProjectPolicy},
  project::{Principal, Project},
  schema::Table,
};
use plinth_store_sqlite::{Provisioner, SqliteCatalog, TenantConnection};
use uuid::Uuid;

pub use crate::config::Settings;

pub struct Services<C> {
  catalog:     Arc<C>,
  provisioner: Provisioner,
  policy:      ProjectPolicy<C>,
}

impl<C> Clone for Services<C> {
  fn clone(&self) -> Self {
    Self {
      catalog:     Arc::clone(&self.catalog),
      provisioner: self.provisioner.clone(),
      policy:      self.policy.clone(),
    }
  }
}

impl Services<SqliteCatalog> {
  /// Open the catalog and build the provisioner described by `settings`.
  pub async fn open(settings: &Settings) -> Result<Self> {
    if let Some(parent) = settings.catalog_path.parent()
      && !parent.as_os_str().is_empty()
    {
      tokio::fs::create_dir_all(parent)
        .await
        .map_err(plinth_store_sqlite::Error::from)?;
    }
    let catalog = SqliteCatalog::open(&settings.catalog_path).await?;

    let mut provisioner =
      Provisioner::new(&settings.data_dir).with_busy_timeout(settings.busy_timeout());
    if let Some(seed_dir) = &settings.seed_dir {
      provisioner = provisioner.with_seed_dir(seed_dir);
    }
    Ok(Self::new(Arc::new(catalog), provisioner))
  }
}

impl<C> Services<C>
where
  C: Catalog + MembershipDirectory,
{
  /// The catalog doubles as the membership directory behind the policy.
  pub fn new(catalog: Arc<C>, provisioner: Provisioner) -> Self {
    let policy = ProjectPolicy::new(Arc::clone(&catalog));
    Self { catalog, provisioner, policy }
  }

  pub fn catalog(&self) -> &C { &self.catalog }

  pub fn provisioner(&self) -> &Provisioner { &self.provisioner }

  // ── Shared steps ──────────────────────────────────────────────────────────

  /// Load `project_id` and check that `principal` holds `capability` in its
  /// organization.
  async fn authorize(
    &self,
    project_id: Uuid,
    principal: &Principal,
    capability: Capability,
  ) -> Result<Project> {
    let project = self
      .catalog
      .get_project(project_id)
      .await
      .map_err(catalog_error)?
      .ok_or_else(|| Error::not_found(format!("project.error.notFound: {project_id}")))?;
    self.gate(capability, project.organization_id, principal).await?;
    Ok(project)
  }

  async fn gate(
    &self,
    capability: Capability,
    organization_id: Uuid,
    principal: &Principal,
  ) -> Result<()> {
    if self.policy.allows(capability, organization_id, principal).await {
      Ok(())
    } else {
      Err(Error::forbidden(format!("project.error.forbidden: {capability:?}")))
    }
  }

  /// The catalog entry for `name` in `project`.
  async fn require_table(&self, project: &Project, name: &str) -> Result<Table> {
    self
      .catalog
      .get_table_by_name(project.id, name)
      .await
      .map_err(catalog_error)?
      .ok_or_else(|| Error::not_found(format!("table.error.notFound: {name}")))
  }

  async fn connect(&self, project: &Project) -> Result<TenantConnection> {
    Ok(self.provisioner.connect(&project.db_name).await?)
  }
}

/// Lift a catalog backend error into the shared taxonomy.
fn catalog_error<E: Into<Error>>(err: E) -> Error { err.into() }

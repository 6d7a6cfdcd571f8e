//! The authorization policy gate.
//!
//! Every service operation asks the gate before touching the catalog or a
//! tenant database. Decisions combine organization membership with the
//! principal's role; any lookup failure denies.

use std::sync::Arc;

use uuid::Uuid;

use crate::{catalog::MembershipDirectory, project::{Principal, Role}};

/// Least-privileged role allowed to create or change schema and rows.
pub const MIN_WRITE_ROLE: Role = Role::Developer;

/// Named capabilities the gate decides on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
  Create,
  Access,
  Update,
}

pub struct ProjectPolicy<D> {
  directory: Arc<D>,
}

impl<D> Clone for ProjectPolicy<D> {
  fn clone(&self) -> Self { Self { directory: Arc::clone(&self.directory) } }
}

impl<D: MembershipDirectory> ProjectPolicy<D> {
  pub fn new(directory: Arc<D>) -> Self { Self { directory } }

  pub async fn allows(
    &self,
    capability: Capability,
    organization_id: Uuid,
    principal: &Principal,
  ) -> bool {
    match capability {
      Capability::Create => self.can_create(organization_id, principal).await,
      Capability::Access => self.can_access(organization_id, principal).await,
      Capability::Update => self.can_update(organization_id, principal).await,
    }
  }

  pub async fn can_create(&self, organization_id: Uuid, principal: &Principal) -> bool {
    principal.role.is_at_least(MIN_WRITE_ROLE) && self.is_member(organization_id, principal).await
  }

  pub async fn can_access(&self, organization_id: Uuid, principal: &Principal) -> bool {
    self.is_member(organization_id, principal).await
  }

  pub async fn can_update(&self, organization_id: Uuid, principal: &Principal) -> bool {
    principal.role.is_at_least(MIN_WRITE_ROLE) && self.is_member(organization_id, principal).await
  }

  async fn is_member(&self, organization_id: Uuid, principal: &Principal) -> bool {
    self
      .directory
      .is_organization_member(organization_id, principal.id)
      .await
      .unwrap_or(false)
  }
}

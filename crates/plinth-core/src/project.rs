//! Projects (tenants) and the principals acting on them.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Project ─────────────────────────────────────────────────────────────────

/// A tenant. Owns exactly one physical database named by `db_name`, which is
/// generated once and never changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
  pub id:              Uuid,
  pub organization_id: Uuid,
  pub name:            String,
  pub db_name:         String,
  pub created_by:      Uuid,
  pub updated_by:      Uuid,
  pub created_at:      DateTime<Utc>,
  pub updated_at:      DateTime<Utc>,
}

/// Input to [`crate::catalog::Catalog::create_project`].
#[derive(Debug, Clone)]
pub struct NewProject {
  pub organization_id: Uuid,
  pub name:            String,
  pub db_name:         String,
  pub created_by:      Uuid,
}

/// A fresh physical database name: a lowercase UUID without hyphens.
pub fn generate_db_name() -> String { Uuid::new_v4().simple().to_string() }

// ─── Principals ──────────────────────────────────────────────────────────────

/// Organization role. Lower ordinal means more privilege.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Role {
  Owner = 1,
  Admin = 2,
  Developer = 3,
  Explorer = 4,
}

impl Role {
  pub fn ordinal(self) -> u8 { self as u8 }

  /// True when `self` is `other` or more privileged.
  pub fn is_at_least(self, other: Role) -> bool { self.ordinal() <= other.ordinal() }
}

impl FromStr for Role {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s.to_ascii_lowercase().as_str() {
      "owner" => Ok(Self::Owner),
      "admin" => Ok(Self::Admin),
      "developer" => Ok(Self::Developer),
      "explorer" => Ok(Self::Explorer),
      other => Err(Error::unprocessable(format!("role.error.unknown: {other:?}"))),
    }
  }
}

/// The authenticated caller of an operation. Produced by the authentication
/// layer; this crate only reads it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
  pub id:   Uuid,
  pub role: Role,
}

impl Principal {
  pub fn new(id: Uuid, role: Role) -> Self { Self { id, role } }
}

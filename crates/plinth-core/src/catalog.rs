//! The `Catalog` trait: the control plane's record of projects and their
//! table definitions.
//!
//! The trait is implemented by storage backends (e.g. `plinth-store-sqlite`).
//! Services depend on this abstraction, not on any concrete backend.

use std::future::Future;

use uuid::Uuid;

use crate::{
  project::{NewProject, Project},
  schema::{Column, NewTable, Table},
};

/// Answers whether a user belongs to an organization. Consulted by
/// [`crate::policy::ProjectPolicy`].
pub trait MembershipDirectory: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn is_organization_member(
    &self,
    organization_id: Uuid,
    user_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}

/// Abstraction over the control-plane catalog.
///
/// Table names are unique per project, compared case-insensitively. Callers
/// check [`Catalog::table_exists_by_name`] before any physical mutation; the
/// backend additionally enforces uniqueness so a racing duplicate still
/// fails.
pub trait Catalog: Send + Sync {
  type Error: std::error::Error + Send + Sync + Into<crate::Error> + 'static;

  // ── Projects ──────────────────────────────────────────────────────────

  fn create_project(
    &self,
    input: NewProject,
  ) -> impl Future<Output = Result<Project, Self::Error>> + Send + '_;

  /// Retrieve a project by id. Returns `None` if not found.
  fn get_project(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Project>, Self::Error>> + Send + '_;

  fn list_projects(
    &self,
    organization_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Project>, Self::Error>> + Send + '_;

  fn project_exists_by_name<'a>(
    &'a self,
    organization_id: Uuid,
    name: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Remove a project and, by cascade, its table entries. Returns `false`
  /// when nothing was deleted.
  fn delete_project(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Memberships ───────────────────────────────────────────────────────

  fn add_organization_member(
    &self,
    organization_id: Uuid,
    user_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Tables ────────────────────────────────────────────────────────────

  /// Persist a new table entry. Fails with a duplicate-name error when the
  /// project already has a table of that name.
  fn create_table(
    &self,
    input: NewTable,
  ) -> impl Future<Output = Result<Table, Self::Error>> + Send + '_;

  fn get_table(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Table>, Self::Error>> + Send + '_;

  fn get_table_by_name<'a>(
    &'a self,
    project_id: Uuid,
    name: &'a str,
  ) -> impl Future<Output = Result<Option<Table>, Self::Error>> + Send + 'a;

  /// All tables of a project, ordered by name.
  fn list_tables(
    &self,
    project_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Table>, Self::Error>> + Send + '_;

  fn table_exists_by_name<'a>(
    &'a self,
    project_id: Uuid,
    name: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  fn rename_table<'a>(
    &'a self,
    id: Uuid,
    name: &'a str,
    updated_by: Uuid,
  ) -> impl Future<Output = Result<Table, Self::Error>> + Send + 'a;

  /// Replace the column list of a table entry.
  fn update_columns(
    &self,
    id: Uuid,
    columns: Vec<Column>,
    updated_by: Uuid,
  ) -> impl Future<Output = Result<Table, Self::Error>> + Send + '_;

  /// Returns `false` when nothing was deleted.
  fn delete_table(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}

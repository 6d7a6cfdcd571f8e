//! Operation inputs, as handed over by the (external) request layer.
//!
//! Each input carries a `validate` method for the checks that need nothing
//! but the input itself. Checks against the catalog or the physical schema
//! happen in the services.

use serde::Deserialize;
use uuid::Uuid;

use crate::{
  Error, Result,
  name::{self, NameKind},
  schema::{Column, ColumnType},
};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateProject {
  pub organization_id: Uuid,
  pub name:            String,
}

impl CreateProject {
  pub fn validate(&self) -> Result<()> {
    let len = self.name.trim().chars().count();
    if !(3..=100).contains(&len) {
      return Err(Error::unprocessable("project.error.nameLength"));
    }
    Ok(())
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTable {
  pub name:    String,
  pub columns: Vec<Column>,
}

impl CreateTable {
  pub fn validate(&self) -> Result<()> {
    name::validate(NameKind::Table, &self.name)?;
    if self.columns.is_empty() {
      return Err(Error::unprocessable("table.error.columnsRequired"));
    }
    validate_columns(&self.columns, &[])?;

    // A self-reference must point at a column declared in this request.
    for column in &self.columns {
      if let Some(fk) = &column.foreign_key
        && name::same(&fk.table, &self.name)
        && !self.columns.iter().any(|c| name::same(&c.name, &fk.column))
      {
        return Err(Error::unprocessable(format!(
          "column.error.foreignKeyTarget: {}.{}",
          fk.table, fk.column
        )));
      }
    }
    Ok(())
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RenameTable {
  pub name: String,
}

impl RenameTable {
  pub fn validate(&self) -> Result<()> { name::validate(NameKind::Table, &self.name) }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddColumns {
  pub columns: Vec<Column>,
}

impl AddColumns {
  /// `existing` are the names already on the table.
  pub fn validate(&self, existing: &[&str]) -> Result<()> {
    if self.columns.is_empty() {
      return Err(Error::unprocessable("column.error.columnsRequired"));
    }
    validate_columns(&self.columns, existing)?;
    for column in &self.columns {
      if column.primary {
        return Err(Error::unprocessable(format!(
          "column.error.primaryNotAllowed: {}",
          column.name
        )));
      }
      if !column.nullable && column.default.is_none() {
        return Err(Error::unprocessable(format!(
          "column.error.notNullWithoutDefault: {}",
          column.name
        )));
      }
    }
    Ok(())
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlterColumn {
  pub name:        String,
  #[serde(rename = "type")]
  pub column_type: ColumnType,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RenameColumn {
  pub old: String,
  pub new: String,
}

impl RenameColumn {
  pub fn validate(&self) -> Result<()> { name::validate(NameKind::Column, &self.new) }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateIndex {
  pub name:      String,
  pub columns:   Vec<String>,
  #[serde(default)]
  pub is_unique: bool,
}

impl CreateIndex {
  /// Everything that can be rejected without looking at the database:
  /// name format, reserved names, and an empty, blank or duplicated column
  /// list (duplicates compared case-insensitively).
  pub fn validate(&self) -> Result<()> {
    name::validate(NameKind::Index, &self.name)?;
    if name::is_reserved_index_name(&self.name) {
      return Err(Error::unprocessable(format!("index.error.reservedName: {}", self.name)));
    }
    if self.columns.is_empty() {
      return Err(Error::unprocessable("index.error.columnsRequired"));
    }

    let mut seen: Vec<String> = Vec::with_capacity(self.columns.len());
    for column in &self.columns {
      if column.trim().is_empty() {
        return Err(Error::unprocessable("index.error.blankColumn"));
      }
      let lowered = column.to_ascii_lowercase();
      if seen.contains(&lowered) {
        return Err(Error::unprocessable(format!("index.error.duplicateColumn: {column}")));
      }
      seen.push(lowered);
    }
    Ok(())
  }
}

/// Field values for row creation and update, keyed by column name.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct RowFields(pub serde_json::Map<String, serde_json::Value>);

impl RowFields {
  pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

impl From<serde_json::Value> for RowFields {
  fn from(value: serde_json::Value) -> Self {
    match value {
      serde_json::Value::Object(map) => Self(map),
      _ => Self::default(),
    }
  }
}

// ─── Shared column checks ────────────────────────────────────────────────────

fn validate_columns(columns: &[Column], existing: &[&str]) -> Result<()> {
  let mut seen: Vec<&str> = existing.to_vec();
  for column in columns {
    name::validate(NameKind::Column, &column.name)?;
    if seen.iter().any(|s| name::same(s, &column.name)) {
      return Err(Error::unprocessable(format!(
        "column.error.duplicateName: {}",
        column.name
      )));
    }
    seen.push(&column.name);
    column.default_value()?;
    if let Some(fk) = &column.foreign_key {
      name::validate(NameKind::Table, &fk.table)?;
      name::validate(NameKind::Column, &fk.column)?;
    }
  }
  Ok(())
}

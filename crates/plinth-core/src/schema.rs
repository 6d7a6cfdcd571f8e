//! Catalog schema types: tables, columns, indexes, and the physical views
//! reported back from a tenant database.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, value::Value};

// ─── Column types ────────────────────────────────────────────────────────────

/// The semantic type of a column. The storage backend decides how each type
/// is declared physically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
  Text,
  Integer,
  Float,
  Boolean,
  Timestamp,
  Uuid,
  Json,
}

impl ColumnType {
  pub const ALL: [ColumnType; 7] = [
    Self::Text,
    Self::Integer,
    Self::Float,
    Self::Boolean,
    Self::Timestamp,
    Self::Uuid,
    Self::Json,
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Text => "text",
      Self::Integer => "integer",
      Self::Float => "float",
      Self::Boolean => "boolean",
      Self::Timestamp => "timestamp",
      Self::Uuid => "uuid",
      Self::Json => "json",
    }
  }
}

impl fmt::Display for ColumnType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for ColumnType {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    Self::ALL
      .into_iter()
      .find(|ty| ty.as_str().eq_ignore_ascii_case(s))
      .ok_or_else(|| Error::unprocessable(format!("column.error.unknownType: {s:?}")))
  }
}

// ─── Columns ─────────────────────────────────────────────────────────────────

/// A reference from a column to a column of another (or the same) table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
  pub table:  String,
  pub column: String,
}

/// A column definition as recorded in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
  pub name:        String,
  /// 1-based ordinal; assigned from input order when the table is created.
  #[serde(default)]
  pub position:    u32,
  #[serde(rename = "type")]
  pub column_type: ColumnType,
  #[serde(default = "default_nullable")]
  pub nullable:    bool,
  /// Default as request JSON; decoded through [`Column::default_value`].
  #[serde(default)]
  pub default:     Option<serde_json::Value>,
  #[serde(default)]
  pub primary:     bool,
  #[serde(default)]
  pub unique:      bool,
  #[serde(default)]
  pub foreign_key: Option<ForeignKey>,
}

fn default_nullable() -> bool { true }

impl Column {
  /// A nullable column with no constraints.
  pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
    Self {
      name: name.into(),
      position: 0,
      column_type,
      nullable: true,
      default: None,
      primary: false,
      unique: false,
      foreign_key: None,
    }
  }

  pub fn primary(mut self) -> Self {
    self.primary = true;
    self.nullable = false;
    self
  }

  pub fn not_null(mut self) -> Self {
    self.nullable = false;
    self
  }

  pub fn unique(mut self) -> Self {
    self.unique = true;
    self
  }

  pub fn with_default(mut self, default: serde_json::Value) -> Self {
    self.default = Some(default);
    self
  }

  pub fn references(mut self, table: impl Into<String>, column: impl Into<String>) -> Self {
    self.foreign_key = Some(ForeignKey { table: table.into(), column: column.into() });
    self
  }

  /// Decode the declared default for this column's type.
  pub fn default_value(&self) -> Result<Option<Value>> {
    match &self.default {
      None => Ok(None),
      Some(json) => Value::from_json(self.column_type, json.clone())
        .map(Some)
        .ok_or_else(|| {
          Error::unprocessable(format!("column.error.invalidDefault: {}", self.name))
        }),
    }
  }
}

/// Renumber positions 1..=n in list order.
pub fn renumber(columns: &mut [Column]) {
  for (i, column) in columns.iter_mut().enumerate() {
    column.position = i as u32 + 1;
  }
}

// ─── Tables ──────────────────────────────────────────────────────────────────

/// A catalog entry mirroring one physical table in a project's database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table {
  pub id:         Uuid,
  pub project_id: Uuid,
  pub name:       String,
  pub columns:    Vec<Column>,
  pub created_by: Uuid,
  pub updated_by: Uuid,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Table {
  pub fn column(&self, name: &str) -> Option<&Column> {
    self.columns.iter().find(|c| crate::name::same(&c.name, name))
  }
}

/// Input to [`crate::catalog::Catalog::create_table`]. Timestamps and the id
/// are assigned by the catalog.
#[derive(Debug, Clone)]
pub struct NewTable {
  pub project_id: Uuid,
  pub name:       String,
  pub columns:    Vec<Column>,
  pub created_by: Uuid,
}

/// The read model returned for a table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableView {
  pub id:         Uuid,
  pub name:       String,
  pub columns:    Vec<Column>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl From<Table> for TableView {
  fn from(t: Table) -> Self {
    Self {
      id:         t.id,
      name:       t.name,
      columns:    t.columns,
      created_at: t.created_at,
      updated_at: t.updated_at,
    }
  }
}

// ─── Physical views ──────────────────────────────────────────────────────────

/// An index as it exists in a tenant database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexView {
  pub name:      String,
  pub columns:   Vec<String>,
  pub is_unique: bool,
}

/// A table as the engine sees it. The figures come from engine statistics
/// and are approximate; `None` means the engine has no estimate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhysicalTable {
  pub name:           String,
  pub schema:         String,
  pub estimated_rows: Option<i64>,
  pub total_size:     Option<i64>,
}

/// Column-level disagreement between a catalog entry and its physical table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ColumnMismatch {
  pub table:             String,
  /// In the catalog but not in the physical table.
  pub missing_columns:   Vec<String>,
  /// In the physical table but not in the catalog.
  pub untracked_columns: Vec<String>,
}

/// Everything that differs between a project's catalog and its database.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchemaDrift {
  /// Catalog tables with no physical table.
  pub missing_physical:   Vec<String>,
  /// Physical tables with no catalog entry.
  pub untracked_physical: Vec<String>,
  pub column_mismatches:  Vec<ColumnMismatch>,
}

impl SchemaDrift {
  pub fn is_clean(&self) -> bool {
    self.missing_physical.is_empty()
      && self.untracked_physical.is_empty()
      && self.column_mismatches.is_empty()
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn column_json_uses_type_key_and_defaults() {
    let column: Column = serde_json::from_value(json!({
      "name": "email",
      "type": "text"
    }))
    .unwrap();
    assert_eq!(column.column_type, ColumnType::Text);
    assert!(column.nullable);
    assert!(!column.primary);
    assert!(column.foreign_key.is_none());
  }

  #[test]
  fn default_value_is_decoded_by_type() {
    let ok = Column::new("active", ColumnType::Boolean).with_default(json!(true));
    assert_eq!(ok.default_value().unwrap(), Some(Value::Boolean(true)));

    let bad = Column::new("age", ColumnType::Integer).with_default(json!("old"));
    assert!(bad.default_value().is_err());
  }

  #[test]
  fn renumber_assigns_one_based_positions() {
    let mut cols = vec![
      Column::new("id", ColumnType::Integer),
      Column::new("name", ColumnType::Text),
    ];
    renumber(&mut cols);
    assert_eq!(cols[0].position, 1);
    assert_eq!(cols[1].position, 2);
  }

  #[test]
  fn column_type_parses_case_insensitively() {
    assert_eq!("TEXT".parse::<ColumnType>().unwrap(), ColumnType::Text);
    assert!("varchar".parse::<ColumnType>().is_err());
  }

  #[test]
  fn drift_is_clean_when_empty() {
    assert!(SchemaDrift::default().is_clean());
    let drift = SchemaDrift { missing_physical: vec!["t".into()], ..Default::default() };
    assert!(!drift.is_clean());
  }
}

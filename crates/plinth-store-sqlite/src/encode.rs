//! Encoding and decoding helpers between Rust domain types and what SQLite
//! stores.
//!
//! Catalog timestamps are RFC 3339 strings, UUIDs hyphenated lowercase
//! strings, and the column list of a table a compact JSON array. Tenant row
//! values are bound through [`SqlValue`] and read back with [`decode_value`].

use chrono::{DateTime, Utc};
use plinth_core::{
  project::Project,
  schema::{Column, ColumnType, Table},
  value::Value,
};
use rusqlite::types::{ToSql, ToSqlOutput, Value as SqlOwned, ValueRef};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Columns ─────────────────────────────────────────────────────────────────

pub fn encode_columns(columns: &[Column]) -> Result<String> {
  Ok(serde_json::to_string(columns)?)
}

pub fn decode_columns(s: &str) -> Result<Vec<Column>> { Ok(serde_json::from_str(s)?) }

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `projects` row.
pub struct RawProject {
  pub project_id:      String,
  pub organization_id: String,
  pub name:            String,
  pub db_name:         String,
  pub created_by:      String,
  pub updated_by:      String,
  pub created_at:      String,
  pub updated_at:      String,
}

pub const PROJECT_COLUMNS: &str = "project_id, organization_id, name, db_name, created_by, \
                                   updated_by, created_at, updated_at";

impl RawProject {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      project_id:      row.get(0)?,
      organization_id: row.get(1)?,
      name:            row.get(2)?,
      db_name:         row.get(3)?,
      created_by:      row.get(4)?,
      updated_by:      row.get(5)?,
      created_at:      row.get(6)?,
      updated_at:      row.get(7)?,
    })
  }

  pub fn into_project(self) -> Result<Project> {
    Ok(Project {
      id:              decode_uuid(&self.project_id)?,
      organization_id: decode_uuid(&self.organization_id)?,
      name:            self.name,
      db_name:         self.db_name,
      created_by:      decode_uuid(&self.created_by)?,
      updated_by:      decode_uuid(&self.updated_by)?,
      created_at:      decode_dt(&self.created_at)?,
      updated_at:      decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw strings read directly from a `catalog_tables` row.
pub struct RawTable {
  pub table_id:   String,
  pub project_id: String,
  pub name:       String,
  pub columns:    String,
  pub created_by: String,
  pub updated_by: String,
  pub created_at: String,
  pub updated_at: String,
}

pub const TABLE_COLUMNS: &str = "table_id, project_id, name, columns, created_by, updated_by, \
                                 created_at, updated_at";

impl RawTable {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      table_id:   row.get(0)?,
      project_id: row.get(1)?,
      name:       row.get(2)?,
      columns:    row.get(3)?,
      created_by: row.get(4)?,
      updated_by: row.get(5)?,
      created_at: row.get(6)?,
      updated_at: row.get(7)?,
    })
  }

  pub fn into_table(self) -> Result<Table> {
    Ok(Table {
      id:         decode_uuid(&self.table_id)?,
      project_id: decode_uuid(&self.project_id)?,
      name:       self.name,
      columns:    decode_columns(&self.columns)?,
      created_by: decode_uuid(&self.created_by)?,
      updated_by: decode_uuid(&self.updated_by)?,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

// ─── Tenant values ───────────────────────────────────────────────────────────

/// A [`Value`] bound as a statement parameter.
///
/// Booleans are stored as `0`/`1`, timestamps as RFC 3339 text, UUIDs as
/// hyphenated text and JSON as its compact serialisation.
#[derive(Debug, Clone)]
pub struct SqlValue(pub Value);

impl ToSql for SqlValue {
  fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
    Ok(match &self.0 {
      Value::Null => ToSqlOutput::Owned(SqlOwned::Null),
      Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
      Value::Integer(i) => ToSqlOutput::Owned(SqlOwned::Integer(*i)),
      Value::Float(f) => ToSqlOutput::Owned(SqlOwned::Real(*f)),
      Value::Boolean(b) => ToSqlOutput::Owned(SqlOwned::Integer(i64::from(*b))),
      Value::Timestamp(dt) => ToSqlOutput::Owned(SqlOwned::Text(encode_dt(*dt))),
      Value::Uuid(id) => ToSqlOutput::Owned(SqlOwned::Text(encode_uuid(*id))),
      Value::Json(v) => ToSqlOutput::Owned(SqlOwned::Text(v.to_string())),
    })
  }
}

/// Decode a stored cell, guided by the catalog type of its column when one
/// is known. Cells that do not fit the declared type are returned as stored
/// rather than rejected.
pub fn decode_value(cell: ValueRef<'_>, ty: Option<ColumnType>) -> Value {
  match cell {
    ValueRef::Null => Value::Null,
    ValueRef::Integer(i) => match ty {
      Some(ColumnType::Boolean) => Value::Boolean(i != 0),
      Some(ColumnType::Float) => Value::Float(i as f64),
      Some(ColumnType::Json) => Value::Json(i.into()),
      _ => Value::Integer(i),
    },
    ValueRef::Real(f) => match ty {
      Some(ColumnType::Json) => serde_json::Number::from_f64(f)
        .map(|n| Value::Json(serde_json::Value::Number(n)))
        .unwrap_or(Value::Float(f)),
      _ => Value::Float(f),
    },
    ValueRef::Text(bytes) => {
      let s = String::from_utf8_lossy(bytes).into_owned();
      match ty {
        Some(ColumnType::Timestamp) => decode_dt(&s).map(Value::Timestamp).unwrap_or(Value::Text(s)),
        Some(ColumnType::Uuid) => Uuid::parse_str(&s).map(Value::Uuid).unwrap_or(Value::Text(s)),
        Some(ColumnType::Json) => match serde_json::from_str(&s) {
          Ok(json) => Value::Json(json),
          Err(_) => Value::Text(s),
        },
        _ => Value::Text(s),
      }
    }
    ValueRef::Blob(bytes) => Value::Text(String::from_utf8_lossy(bytes).into_owned()),
  }
}

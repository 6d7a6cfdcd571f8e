//! The tagged cell value used for rows and column defaults.
//!
//! Rows have no compile-time shape, so every cell is a [`Value`]. Decoding
//! from request JSON is driven by the catalog's [`ColumnType`]; the same type
//! list drives decoding of what the engine returns.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::schema::ColumnType;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
  Null,
  Text(String),
  Integer(i64),
  Float(f64),
  Boolean(bool),
  Timestamp(DateTime<Utc>),
  Uuid(Uuid),
  Json(serde_json::Value),
}

impl Value {
  pub fn is_null(&self) -> bool { matches!(self, Self::Null) }

  /// Decode a request JSON value for a column of type `ty`.
  ///
  /// Returns `None` when the JSON shape does not fit the column type. `null`
  /// always decodes to [`Value::Null`]; nullability is the engine's concern.
  pub fn from_json(ty: ColumnType, json: serde_json::Value) -> Option<Self> {
    use serde_json::Value as J;

    if json.is_null() {
      return Some(Self::Null);
    }

    match (ty, json) {
      (ColumnType::Text, J::String(s)) => Some(Self::Text(s)),
      (ColumnType::Integer, J::Number(n)) => n.as_i64().map(Self::Integer),
      (ColumnType::Float, J::Number(n)) => n.as_f64().map(Self::Float),
      (ColumnType::Boolean, J::Bool(b)) => Some(Self::Boolean(b)),
      (ColumnType::Timestamp, J::String(s)) => DateTime::parse_from_rfc3339(&s)
        .ok()
        .map(|dt| Self::Timestamp(dt.with_timezone(&Utc))),
      (ColumnType::Uuid, J::String(s)) => Uuid::parse_str(&s).ok().map(Self::Uuid),
      (ColumnType::Json, other) => Some(Self::Json(other)),
      _ => None,
    }
  }

  /// The JSON form of this value, as it appears in responses.
  pub fn to_json(&self) -> serde_json::Value {
    match self {
      Self::Null => serde_json::Value::Null,
      Self::Text(s) => s.clone().into(),
      Self::Integer(i) => (*i).into(),
      Self::Float(f) => serde_json::Number::from_f64(*f)
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::Null),
      Self::Boolean(b) => (*b).into(),
      Self::Timestamp(dt) => dt.to_rfc3339().into(),
      Self::Uuid(id) => id.hyphenated().to_string().into(),
      Self::Json(v) => v.clone(),
    }
  }
}

impl From<&str> for Value {
  fn from(s: &str) -> Self { Self::Text(s.to_owned()) }
}

impl From<String> for Value {
  fn from(s: String) -> Self { Self::Text(s) }
}

impl From<i64> for Value {
  fn from(i: i64) -> Self { Self::Integer(i) }
}

impl From<bool> for Value {
  fn from(b: bool) -> Self { Self::Boolean(b) }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn decodes_by_column_type() {
    assert_eq!(
      Value::from_json(ColumnType::Text, json!("a@x.com")),
      Some(Value::Text("a@x.com".into()))
    );
    assert_eq!(Value::from_json(ColumnType::Integer, json!(7)), Some(Value::Integer(7)));
    assert_eq!(Value::from_json(ColumnType::Boolean, json!(true)), Some(Value::Boolean(true)));
    assert_eq!(Value::from_json(ColumnType::Float, json!(1.5)), Some(Value::Float(1.5)));
  }

  #[test]
  fn rejects_mismatched_shapes() {
    assert_eq!(Value::from_json(ColumnType::Integer, json!("7")), None);
    assert_eq!(Value::from_json(ColumnType::Integer, json!(7.25)), None);
    assert_eq!(Value::from_json(ColumnType::Uuid, json!("not-a-uuid")), None);
    assert_eq!(Value::from_json(ColumnType::Timestamp, json!("yesterday")), None);
  }

  #[test]
  fn null_decodes_for_every_type() {
    for ty in ColumnType::ALL {
      assert_eq!(Value::from_json(ty, json!(null)), Some(Value::Null));
    }
  }

  #[test]
  fn timestamps_and_uuids_round_trip_through_json() {
    let id = Uuid::new_v4();
    let v = Value::from_json(ColumnType::Uuid, json!(id.to_string())).unwrap();
    assert_eq!(v.to_json(), json!(id.to_string()));

    let ts = Value::from_json(ColumnType::Timestamp, json!("2024-03-01T10:00:00Z")).unwrap();
    assert!(matches!(ts, Value::Timestamp(_)));
  }

  #[test]
  fn json_columns_accept_anything() {
    let v = Value::from_json(ColumnType::Json, json!({"a": [1, 2]})).unwrap();
    assert_eq!(v.to_json(), json!({"a": [1, 2]}));
  }
}

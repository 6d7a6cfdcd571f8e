//! Rows of dynamically-shaped tables, and list pagination.

use serde::{Deserialize, Serialize, Serializer, ser::SerializeMap};

use crate::value::Value;

/// An ordered mapping from column name to value.
///
/// Order follows the engine's column order for rows read back, and insertion
/// order for rows built by callers. It carries no meaning beyond display.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
  fields: Vec<(String, Value)>,
}

impl Row {
  pub fn new() -> Self { Self::default() }

  /// Set `name` to `value`, replacing an existing field of the same name.
  pub fn insert(&mut self, name: impl Into<String>, value: Value) {
    let name = name.into();
    match self.fields.iter_mut().find(|(n, _)| *n == name) {
      Some((_, v)) => *v = value,
      None => self.fields.push((name, value)),
    }
  }

  pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
    self.insert(name, value.into());
    self
  }

  pub fn get(&self, name: &str) -> Option<&Value> {
    self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
  }

  pub fn len(&self) -> usize { self.fields.len() }

  pub fn is_empty(&self) -> bool { self.fields.is_empty() }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
    self.fields.iter().map(|(n, v)| (n.as_str(), v))
  }

  pub fn names(&self) -> impl Iterator<Item = &str> { self.fields.iter().map(|(n, _)| n.as_str()) }
}

impl FromIterator<(String, Value)> for Row {
  fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
    let mut row = Row::new();
    for (name, value) in iter {
      row.insert(name, value);
    }
    row
  }
}

impl Serialize for Row {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(self.fields.len()))?;
    for (name, value) in &self.fields {
      map.serialize_entry(name, value)?;
    }
    map.end()
  }
}

// ─── Pagination ──────────────────────────────────────────────────────────────

/// Page selection for row listings. Rows are ordered by `sort`, descending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
  /// 1-based page number.
  #[serde(default = "default_page")]
  pub page:  u32,
  #[serde(default = "default_limit")]
  pub limit: u32,
  #[serde(default = "default_sort")]
  pub sort:  String,
}

fn default_page() -> u32 { 1 }
fn default_limit() -> u32 { 20 }
fn default_sort() -> String { "id".to_owned() }

impl Default for Pagination {
  fn default() -> Self {
    Self { page: default_page(), limit: default_limit(), sort: default_sort() }
  }
}

impl Pagination {
  pub fn offset(&self) -> u64 { u64::from(self.page.max(1) - 1) * u64::from(self.limit) }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn insert_replaces_existing_field() {
    let mut row = Row::new().with("id", 1).with("name", "A");
    row.insert("name", Value::from("B"));
    assert_eq!(row.len(), 2);
    assert_eq!(row.get("name"), Some(&Value::Text("B".into())));
  }

  #[test]
  fn serializes_as_object_in_order() {
    let row = Row::new().with("id", 1).with("email", "a@x.com").with("active", true);
    let text = serde_json::to_string(&row).unwrap();
    assert_eq!(text, r#"{"id":1,"email":"a@x.com","active":true}"#);
  }

  #[test]
  fn offset_is_zero_based_from_page() {
    let p = Pagination { page: 3, limit: 10, sort: "id".into() };
    assert_eq!(p.offset(), 20);
    let first = Pagination { page: 0, ..Pagination::default() };
    assert_eq!(first.offset(), 0);
  }
}

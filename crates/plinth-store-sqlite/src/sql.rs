//! SQL text building.
//!
//! [`quote_ident`] is the only way a name reaches generated SQL and
//! [`quote_literal`] the only way a constant does (column defaults, which
//! DDL cannot bind). Everything else is a bound parameter.

use plinth_core::{
  Result,
  schema::{Column, ColumnType},
  value::Value,
};

/// Quote an identifier for SQLite: wrap in double quotes and double any
/// embedded double quote.
pub fn quote_ident(ident: &str) -> String {
  let mut out = String::with_capacity(ident.len() + 2);
  out.push('"');
  for c in ident.chars() {
    if c == '"' {
      out.push('"');
    }
    out.push(c);
  }
  out.push('"');
  out
}

/// Quote a string constant: wrap in single quotes and double any embedded
/// single quote.
pub fn quote_literal(s: &str) -> String { format!("'{}'", s.replace('\'', "''")) }

/// Comma-separated quoted identifiers.
pub fn ident_list<'a>(idents: impl IntoIterator<Item = &'a str>) -> String {
  idents.into_iter().map(quote_ident).collect::<Vec<_>>().join(", ")
}

/// The declared type used for a column type.
///
/// The names are chosen for their SQLite type affinity: `INTEGER`, `REAL`
/// and `TEXT` get the matching affinity, the rest get `NUMERIC`.
pub fn type_name(ty: ColumnType) -> &'static str {
  match ty {
    ColumnType::Text => "TEXT",
    ColumnType::Integer => "INTEGER",
    ColumnType::Float => "REAL",
    ColumnType::Boolean => "BOOLEAN",
    ColumnType::Timestamp => "TIMESTAMP",
    ColumnType::Uuid => "UUID",
    ColumnType::Json => "JSON",
  }
}

/// Render a value as a constant expression for a `DEFAULT` clause.
pub fn literal(value: &Value) -> String {
  match value {
    Value::Null => "NULL".to_owned(),
    Value::Text(s) => quote_literal(s),
    Value::Integer(i) => i.to_string(),
    Value::Float(f) if f.is_finite() => format!("{f:?}"),
    Value::Float(_) => "NULL".to_owned(),
    Value::Boolean(b) => i64::from(*b).to_string(),
    Value::Timestamp(dt) => quote_literal(&dt.to_rfc3339()),
    Value::Uuid(id) => quote_literal(&id.hyphenated().to_string()),
    Value::Json(v) => quote_literal(&v.to_string()),
  }
}

/// A column definition: name, declared type, `NOT NULL` and `DEFAULT`.
///
/// Key, uniqueness and reference constraints are not part of it; callers
/// add them where the statement allows.
pub fn column_definition(column: &Column) -> Result<String> {
  let mut def = format!("{} {}", quote_ident(&column.name), type_name(column.column_type));
  if !column.nullable {
    def.push_str(" NOT NULL");
  }
  if let Some(value) = column.default_value()? {
    def.push_str(" DEFAULT ");
    def.push_str(&literal(&value));
  }
  Ok(def)
}

/// A predicate matching rows whose value in `column` cannot be read as
/// `ty`. `None` when every stored value converts.
pub fn conversion_violation(column: &str, ty: ColumnType) -> Option<String> {
  let c = quote_ident(column);
  match ty {
    ColumnType::Text => None,
    ColumnType::Integer => Some(format!("typeof({c}) NOT IN ('integer', 'null')")),
    ColumnType::Float => Some(format!("typeof({c}) NOT IN ('real', 'integer', 'null')")),
    ColumnType::Boolean => Some(format!(
      "{c} IS NOT NULL AND (typeof({c}) != 'integer' OR {c} NOT IN (0, 1))"
    )),
    ColumnType::Timestamp => Some(format!(
      "typeof({c}) NOT IN ('text', 'null') OR ({c} IS NOT NULL AND julianday({c}) IS NULL)"
    )),
    // Hyphenated form only: 8-4-4-4-12 hex digits.
    ColumnType::Uuid => Some(format!(
      "{c} IS NOT NULL AND (typeof({c}) != 'text' OR length({c}) != 36 \
       OR substr({c}, 9, 1) != '-' OR substr({c}, 14, 1) != '-' \
       OR substr({c}, 19, 1) != '-' OR substr({c}, 24, 1) != '-' \
       OR length(replace({c}, '-', '')) != 32 OR {c} GLOB '*[^0-9A-Fa-f-]*')"
    )),
    ColumnType::Json => Some(format!(
      "{c} IS NOT NULL AND typeof({c}) = 'text' AND json_valid({c}) = 0"
    )),
  }
}

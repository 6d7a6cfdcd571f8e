//! Name-format rules for user-supplied identifiers.
//!
//! These checks run before anything touches the catalog or a tenant
//! database. They are not a substitute for identifier quoting: every name
//! that reaches SQL is still quoted by the storage backend.

use crate::{Error, Result};

pub const MIN_NAME_LENGTH: usize = 3;
pub const MAX_NAME_LENGTH: usize = 60;

/// Index names that may never be used, compared case-insensitively.
pub const RESERVED_INDEX_NAMES: &[&str] = &[
  "primary",
  "unique",
  "index",
  "key",
  "constraint",
  "foreign",
  "check",
  "default",
];

/// Prefix the engine reserves for its own objects.
pub const ENGINE_RESERVED_PREFIX: &str = "sqlite_";

/// What kind of object a name belongs to; used to build message keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameKind {
  Table,
  Column,
  Index,
}

impl NameKind {
  /// Shortest name accepted for this kind. Columns may be a single
  /// character so that the conventional `id` key is expressible.
  pub fn min_length(self) -> usize {
    match self {
      Self::Table | Self::Index => MIN_NAME_LENGTH,
      Self::Column => 1,
    }
  }

  fn prefix(self) -> &'static str {
    match self {
      Self::Table => "table",
      Self::Column => "column",
      Self::Index => "index",
    }
  }
}

/// Check that `name` is made of `[A-Za-z0-9_]`, fits the length bounds of
/// its kind (3 to 60 for tables and indexes, 1 to 60 for columns) and does
/// not start with the engine's reserved prefix.
pub fn validate(kind: NameKind, name: &str) -> Result<()> {
  let len = name.chars().count();
  if !(kind.min_length()..=MAX_NAME_LENGTH).contains(&len) {
    return Err(Error::unprocessable(format!(
      "{}.error.nameLength: {name:?}",
      kind.prefix()
    )));
  }
  if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
    return Err(Error::unprocessable(format!(
      "{}.error.nameFormat: {name:?}",
      kind.prefix()
    )));
  }
  if name.to_ascii_lowercase().starts_with(ENGINE_RESERVED_PREFIX) {
    return Err(Error::unprocessable(format!(
      "{}.error.reservedName: {name:?}",
      kind.prefix()
    )));
  }
  Ok(())
}

pub fn is_reserved_index_name(name: &str) -> bool {
  let lowered = name.to_ascii_lowercase();
  RESERVED_INDEX_NAMES.contains(&lowered.as_str())
    || lowered.starts_with(ENGINE_RESERVED_PREFIX)
}

/// Case-insensitive name equality, matching how the engine resolves
/// identifiers.
pub fn same(a: &str, b: &str) -> bool { a.eq_ignore_ascii_case(b) }

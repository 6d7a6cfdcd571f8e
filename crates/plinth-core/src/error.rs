//! Error types for `plinth-core`.
//!
//! Every layer ends up reporting one of four kinds (see [`ErrorKind`]). The
//! string carried by the `NotFound`, `Forbidden` and `Unprocessable` variants
//! is a stable message key such as `table.error.duplicateName`, optionally
//! followed by `: <detail>`.

use thiserror::Error;

/// The coarse classification callers dispatch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  NotFound,
  Forbidden,
  Unprocessable,
  Internal,
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("forbidden: {0}")]
  Forbidden(String),

  #[error("unprocessable: {0}")]
  Unprocessable(String),

  #[error("internal error: {0}")]
  Internal(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Error {
  pub fn not_found(key: impl Into<String>) -> Self { Self::NotFound(key.into()) }

  pub fn forbidden(key: impl Into<String>) -> Self { Self::Forbidden(key.into()) }

  pub fn unprocessable(key: impl Into<String>) -> Self {
    Self::Unprocessable(key.into())
  }

  /// Wrap a plain message as an internal error.
  pub fn internal(message: impl Into<String>) -> Self {
    Self::Internal(message.into().into())
  }

  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::NotFound(_) => ErrorKind::NotFound,
      Self::Forbidden(_) => ErrorKind::Forbidden,
      Self::Unprocessable(_) => ErrorKind::Unprocessable,
      Self::Internal(_) | Self::Serialization(_) => ErrorKind::Internal,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn kinds_follow_variants() {
    assert_eq!(Error::not_found("table.error.notFound").kind(), ErrorKind::NotFound);
    assert_eq!(Error::forbidden("x").kind(), ErrorKind::Forbidden);
    assert_eq!(Error::unprocessable("x").kind(), ErrorKind::Unprocessable);
    assert_eq!(Error::internal("boom").kind(), ErrorKind::Internal);
  }

  #[test]
  fn internal_message_is_displayed() {
    let err = Error::internal("connection refused");
    assert_eq!(err.to_string(), "internal error: connection refused");
  }
}

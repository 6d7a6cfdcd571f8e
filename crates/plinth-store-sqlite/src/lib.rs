//! SQLite backend for the Plinth control plane.
//!
//! Holds both halves of the system's state: the control-plane catalog
//! ([`SqliteCatalog`]) and the per-project tenant databases reached through
//! the [`Provisioner`]. Wraps [`tokio_rusqlite`] so all database access runs
//! on a dedicated thread without blocking the async runtime.

mod encode;
mod schema;

pub mod catalog;
pub mod ddl;
pub mod error;
pub mod provision;
pub mod rows;
pub mod sql;

pub use catalog::SqliteCatalog;
pub use error::{Error, Result};
pub use provision::{Provisioner, SeedError, SeedResult, TenantConnection};

/// Run `f` on the connection's thread, keeping domain errors raised inside
/// the closure intact.
pub(crate) async fn call<T, F>(conn: &tokio_rusqlite::Connection, f: F) -> Result<T>
where
  F: FnOnce(&mut rusqlite::Connection) -> Result<T> + Send + 'static,
  T: Send + 'static,
{
  conn.call(move |conn| Ok(f(conn))).await?
}

#[cfg(test)]
mod tests;

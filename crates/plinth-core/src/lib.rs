//! Core types and trait definitions for the Plinth control plane.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! It describes projects, catalog tables, columns, indexes and rows, the
//! error taxonomy shared by every layer, and the policy gate consulted before
//! any mutation. Storage backends implement [`catalog::Catalog`].

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod catalog;
pub mod error;
pub mod name;
pub mod policy;
pub mod project;
pub mod request;
pub mod row;
pub mod schema;
pub mod value;

pub use error::{Error, ErrorKind, Result};

//! Storage layer
//!
//! SQLite persistence for marks, user marks, labels and tags.
//!
//! ## Architecture
//!
//! - **schema**: table definitions and version tracking
//! - **repository**: CRUD over a borrowed connection or transaction
//! - **error**: typed storage errors, including per-field validation failures

pub mod error;
pub mod repository;
pub mod schema;

pub use error::{FieldErrors, StorageError, StorageResult};
pub use repository::{MarkFilter, Repository, StoreCounts};
pub use schema::{init_schema, needs_init, SCHEMA_VERSION};

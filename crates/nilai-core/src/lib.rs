//! Nilai Core Library
//!
//! This crate provides the core functionality for Nilai, a bookmark ("mark")
//! store with a streaming importer for exports from other installations.
//!
//! # Architecture
//!
//! - **SQLite**: marks, labels, smart label rules and tags live in one
//!   database file; every imported record is its own transaction.
//! - **Import pipeline**: an export is fed line by line to an
//!   [`ImportSession`], which never holds more than one record in memory.
//!
//! # Quick Start
//!
//! ```text
//! let mut store = Store::open()?;
//!
//! let file = BufReader::new(File::open("export.json")?);
//! let report = import_export(file, &mut store, user_id, ImportSettings::default())?;
//! println!("{} added, {} skipped", report.result.added, report.result.skipped);
//! ```
//!
//! # Modules
//!
//! - `store`: database handle (main entry point)
//! - `import`: export reader, session state machine and record importer
//! - `storage`: schema, repository and storage errors
//! - `models`: data structures for marks, labels and tags
//! - `helpers`: slugs, hashtags and smart label keys
//! - `errors`: error code catalog reported by imports
//! - `config`: application configuration

pub mod config;
pub mod errors;
pub mod helpers;
pub mod import;
pub mod models;
pub mod storage;
pub mod store;

pub use config::{Config, DetailMode, ImportSettings};
pub use import::{
    import_export, Classification, ExportReader, ImportCounts, ImportError, ImportReport,
    ImportResult, ImportSession, SessionMeta, Step,
};
pub use models::{Label, Mark, MarkSummary, SmartLabel, Tag, UserMark};
pub use storage::{MarkFilter, StorageError, StoreCounts};
pub use store::Store;

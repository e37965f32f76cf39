//! Mark import pipeline
//!
//! Streams an export into the store one line at a time.
//!
//! ## Architecture
//!
//! - **reader**: walks an export file and feeds its marks array to a session
//! - **session**: line-driven state machine, counters and per-record details
//! - **record**: decodes one line into a typed record
//! - **importer**: stores one record inside its own transaction
//! - **labels**: label lookup with the cached `Unlabeled` fallback
//! - **tags**: hashtag extraction and tag link reconciliation
//! - **result**: per-record results and the final report

pub mod importer;
pub mod labels;
pub mod reader;
pub mod record;
pub mod result;
pub mod session;
pub mod tags;

use thiserror::Error;

use crate::storage::StorageError;

pub use importer::{RecordImporter, SessionMeta, SUPPORTED_EXPORT_VERSION};
pub use labels::{LabelResolution, LabelResolver, UnlabeledCache};
pub use reader::{import_export, ExportMeta, ExportReader};
pub use record::{decode, DecodeError, ImportedRecord};
pub use result::{Classification, ImportCounts, ImportIssue, ImportReport, ImportResult};
pub use session::{ImportSession, SessionState, Step};
pub use tags::TagSynchronizer;

/// Errors that stop an import
///
/// Problems with individual records never surface here; they are reported
/// as failed results instead.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Storage unavailable: {0}")]
    Storage(#[from] StorageError),

    #[error("Import session already finished")]
    SessionFinished,

    #[error("Marks started before the export header (line {line})")]
    MissingMeta { line: u64 },

    #[error("Invalid export header on line {line}: {source}")]
    InvalidMeta {
        line: u64,
        #[source]
        source: serde_json::Error,
    },

    #[error("Export ended before the marks array was closed (line {line})")]
    UnexpectedEof { line: u64 },

    #[error("Failed to read export: {0}")]
    Io(#[from] std::io::Error),
}

//! Export file driver
//!
//! Exports are written one value per line:
//!
//! ```text
//! {
//! "export": {"export_version": 1, "export_date": "2014-02-03 10:11:12", "marks_count": 2},
//! "marks": [
//! {"mark_id": "1", "url": "https://example.com", ...},
//! {"mark_id": "2", "url": "https://example.org", ...}
//! ]
//! }
//! ```
//!
//! The reader picks the header out of the envelope, then hands every line of
//! the marks array to an [`ImportSession`].

use std::io::BufRead;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::config::ImportSettings;
use crate::import::importer::SessionMeta;
use crate::import::record::strip_trailing_comma;
use crate::import::result::ImportReport;
use crate::import::session::{ImportSession, Step};
use crate::import::ImportError;
use crate::store::Store;

/// Export header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportMeta {
    #[serde(deserialize_with = "version_number")]
    pub export_version: i64,
    #[serde(default)]
    pub export_date: Option<String>,
    #[serde(default)]
    pub marks_count: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReaderState {
    /// Envelope lines before the marks array
    Header,
    /// Inside the marks array
    Marks,
    /// Marks array closed
    Done,
}

/// Feeds the lines of an export file to an import session
pub struct ExportReader<'s> {
    store: Option<&'s mut Store>,
    user_id: i64,
    settings: ImportSettings,
    state: ReaderState,
    meta: Option<ExportMeta>,
    session: Option<ImportSession<'s>>,
    report: Option<ImportReport>,
    line: u64,
}

impl<'s> ExportReader<'s> {
    pub fn new(store: &'s mut Store, user_id: i64, settings: ImportSettings) -> Self {
        Self {
            store: Some(store),
            user_id,
            settings,
            state: ReaderState::Header,
            meta: None,
            session: None,
            report: None,
            line: 0,
        }
    }

    /// Header read so far
    pub fn meta(&self) -> Option<&ExportMeta> {
        self.meta.as_ref()
    }

    /// Whether the marks array has been closed
    pub fn is_done(&self) -> bool {
        self.state == ReaderState::Done
    }

    /// Feed the next line of the export
    pub fn feed(&mut self, line: &str) -> Result<(), ImportError> {
        self.line += 1;
        match self.state {
            ReaderState::Header => self.header_line(line),
            ReaderState::Marks => self.marks_line(line),
            // Closing braces of the envelope
            ReaderState::Done => Ok(()),
        }
    }

    /// Report of the completed import
    pub fn finish(self) -> Result<ImportReport, ImportError> {
        self.report
            .ok_or(ImportError::UnexpectedEof { line: self.line })
    }

    fn header_line(&mut self, line: &str) -> Result<(), ImportError> {
        let trimmed = line.trim();
        let trimmed = trimmed.strip_prefix('{').unwrap_or(trimmed).trim_start();

        if let Some(rest) = strip_key(trimmed, "export") {
            let meta: ExportMeta = serde_json::from_str(strip_trailing_comma(rest)).map_err(
                |source| ImportError::InvalidMeta {
                    line: self.line,
                    source,
                },
            )?;
            debug!("Export header: {:?}", meta);
            self.meta = Some(meta);
            return Ok(());
        }

        if let Some(rest) = strip_key(trimmed, "marks") {
            let Some(after) = rest.trim_start().strip_prefix('[') else {
                return Ok(());
            };
            self.start_session()?;
            // `"marks": []` closes the array on the same line
            if after.trim_start().starts_with(']') {
                return self.marks_line("]");
            }
        }

        Ok(())
    }

    fn start_session(&mut self) -> Result<(), ImportError> {
        let meta = self
            .meta
            .as_ref()
            .ok_or(ImportError::MissingMeta { line: self.line })?;
        let store = self
            .store
            .take()
            .ok_or(ImportError::SessionFinished)?;

        info!(
            "Importing export version {} from {} for user {} ({} marks announced)",
            meta.export_version,
            meta.export_date.as_deref().unwrap_or("an unknown date"),
            self.user_id,
            meta.marks_count
                .map(|n| n.to_string())
                .unwrap_or_else(|| "?".to_string())
        );
        self.session = Some(ImportSession::new(
            store,
            SessionMeta::new(meta.export_version, self.user_id),
            self.settings,
        ));
        self.state = ReaderState::Marks;
        Ok(())
    }

    fn marks_line(&mut self, line: &str) -> Result<(), ImportError> {
        let session = self.session.as_mut().ok_or(ImportError::SessionFinished)?;
        if let Step::Completed(report) = session.process_line(line)? {
            self.report = Some(report);
            self.state = ReaderState::Done;
        }
        Ok(())
    }
}

/// Import a whole export from `input`
pub fn import_export<R: BufRead>(
    input: R,
    store: &mut Store,
    user_id: i64,
    settings: ImportSettings,
) -> Result<ImportReport, ImportError> {
    let mut reader = ExportReader::new(store, user_id, settings);
    for line in input.lines() {
        reader.feed(&line?)?;
        if reader.is_done() {
            break;
        }
    }
    reader.finish()
}

/// Rest of `line` after `"key":`, if the line starts with that key
fn strip_key<'l>(line: &'l str, key: &str) -> Option<&'l str> {
    let rest = line.strip_prefix('"')?.strip_prefix(key)?.strip_prefix('"')?;
    rest.trim_start().strip_prefix(':')
}

fn version_number<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let version = match &value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    version.ok_or_else(|| serde::de::Error::custom(format!("invalid export version {}", value)))
}

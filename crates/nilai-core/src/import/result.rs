//! Per-record results and the aggregate import report

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors;
use crate::import::record::DecodeError;
use crate::storage::FieldErrors;

/// How a record ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    /// A new association was created for the user
    Added,
    /// The user already had an active association for the URL
    Skipped,
    Failed,
}

/// One error reported for a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportIssue {
    /// Catalog code; validation messages carry none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<u32>,
    pub error_message: String,
}

impl ImportIssue {
    /// Issue for a catalog code with its standard message
    pub fn from_code(code: u32) -> Self {
        Self {
            error_code: Some(code),
            error_message: errors::error_message(code).to_string(),
        }
    }

    /// Issue for a catalog code with a specific message
    pub fn with_message(code: u32, message: impl Into<String>) -> Self {
        Self {
            error_code: Some(code),
            error_message: message.into(),
        }
    }

    /// Validation issue without a code
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            error_code: None,
            error_message: message.into(),
        }
    }

    /// The generic internal error
    pub fn internal() -> Self {
        Self::from_code(errors::INTERNAL)
    }
}

/// Outcome of importing one record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportResult {
    pub result: Classification,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ImportIssue>,
}

impl ImportResult {
    /// A result that has not been classified yet; counts as failed
    pub fn pending() -> Self {
        Self {
            result: Classification::Failed,
            warnings: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// A failed result carrying one issue
    pub fn failed(issue: ImportIssue) -> Self {
        let mut result = Self::pending();
        result.errors.push(issue);
        result
    }

    /// Failed result for a line that could not be decoded
    ///
    /// Unusable values get a plain message; anything structural is reported
    /// as an internal error.
    pub fn from_decode_error(err: &DecodeError) -> Self {
        if err.is_validation() {
            Self::failed(ImportIssue::message(err.to_string()))
        } else {
            Self::failed(ImportIssue::with_message(errors::INTERNAL, err.to_string()))
        }
    }

    pub fn warn(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    pub fn error(&mut self, issue: ImportIssue) {
        self.errors.push(issue);
    }

    /// Add one issue per rejected storage field
    pub fn field_errors(&mut self, fields: &FieldErrors) {
        for (code, message) in fields {
            self.errors.push(ImportIssue::with_message(*code, message.clone()));
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn is_failed(&self) -> bool {
        self.result == Classification::Failed
    }

    /// Force `Failed` whenever an error was recorded
    pub fn finalize(mut self) -> Self {
        if self.has_errors() {
            self.result = Classification::Failed;
        }
        self
    }
}

/// Aggregate counters for a session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportCounts {
    pub added: u64,
    pub skipped: u64,
    pub failed: u64,
    pub total: u64,
}

impl ImportCounts {
    pub fn record(&mut self, classification: Classification) {
        self.total += 1;
        match classification {
            Classification::Added => self.added += 1,
            Classification::Skipped => self.skipped += 1,
            Classification::Failed => self.failed += 1,
        }
    }

    /// Every record lands in exactly one bucket
    pub fn is_consistent(&self) -> bool {
        self.added + self.skipped + self.failed == self.total
    }
}

/// Final output of an import session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReport {
    pub result: ImportCounts,
    /// Per-record results keyed by external mark id, when capture is enabled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<BTreeMap<String, ImportResult>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finalize_forces_failed() {
        let mut result = ImportResult::pending();
        result.result = Classification::Added;
        assert_eq!(result.clone().finalize().result, Classification::Added);

        result.error(ImportIssue::internal());
        assert_eq!(result.finalize().result, Classification::Failed);
    }

    #[test]
    fn test_field_errors_one_issue_each() {
        let mut fields = FieldErrors::new();
        fields.insert(errors::INVALID_URL, "Invalid URL".to_string());
        fields.insert(errors::TITLE_TOO_LONG, "Title is too long".to_string());

        let mut result = ImportResult::pending();
        result.field_errors(&fields);

        assert_eq!(result.errors.len(), 2);
        assert_eq!(result.errors[0].error_code, Some(errors::INVALID_URL));
        assert_eq!(result.errors[1].error_message, "Title is too long");
    }

    #[test]
    fn test_decode_errors() {
        let malformed = crate::import::record::decode("nope").unwrap_err();
        let result = ImportResult::from_decode_error(&malformed);
        assert!(result.is_failed());
        assert_eq!(result.errors[0].error_code, Some(errors::INTERNAL));

        let missing = crate::import::record::decode(r#"{"mark_id":"1"}"#).unwrap_err();
        let result = ImportResult::from_decode_error(&missing);
        assert!(result.is_failed());
        assert_eq!(result.errors[0].error_code, None);
        assert_eq!(result.errors[0].error_message, "Missing required field 'url'");
    }

    #[test]
    fn test_counts() {
        let mut counts = ImportCounts::default();
        counts.record(Classification::Added);
        counts.record(Classification::Skipped);
        counts.record(Classification::Failed);
        counts.record(Classification::Added);

        assert_eq!(counts.added, 2);
        assert_eq!(counts.total, 4);
        assert!(counts.is_consistent());
    }

    #[test]
    fn test_report_json_shape() {
        let mut details = BTreeMap::new();
        let mut warned = ImportResult::pending();
        warned.result = Classification::Added;
        warned.warn("Label Foo not found. Stripped label info.");
        details.insert("7".to_string(), warned);
        details.insert("8".to_string(), ImportResult::failed(ImportIssue::internal()));

        let report = ImportReport {
            result: ImportCounts {
                added: 1,
                skipped: 0,
                failed: 1,
                total: 2,
            },
            details: Some(details),
        };
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["result"]["total"], 2);
        assert_eq!(json["details"]["7"]["result"], "added");
        assert!(json["details"]["7"].get("errors").is_none());
        assert_eq!(json["details"]["8"]["errors"][0]["error_code"], 500);
        assert_eq!(
            json["details"]["8"]["errors"][0]["error_message"],
            "Internal error, please try again"
        );

        let bare = ImportReport::default();
        assert!(serde_json::to_value(&bare).unwrap().get("details").is_none());
    }
}

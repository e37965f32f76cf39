//! Line decoding for exported mark records
//!
//! Each non-terminal line of an export is one JSON object, usually followed
//! by a `,`. The exporter is loose about types (`"1"`, `1` and `true` all
//! appear for flags, ids arrive as strings or numbers), so values are
//! normalized here before the importer sees them.

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use thiserror::Error;

use crate::models::parse_timestamp;

/// MySQL-style zero date, written by old exporters for "never"
const ZERO_DATE: &str = "0000-00-00 00:00:00";

/// A decoded export record
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedRecord {
    /// Identifier of the record in the exporting system
    pub mark_id: String,
    pub created_on: Option<NaiveDateTime>,
    pub title: Option<String>,
    pub url: String,
    pub embed: Option<String>,
    pub active: bool,
    pub archived_on: Option<NaiveDateTime>,
    pub label_id: Option<String>,
    pub label_name: Option<String>,
    pub notes: Option<String>,
    /// Explicit tags, in addition to hashtags found in `notes`
    pub tags: Vec<String>,
}

impl ImportedRecord {
    /// Whether the record asks for a label
    ///
    /// Only a numeric `label_id` does. The id itself belongs to the
    /// exporting installation, so the label is looked up by `label_name`.
    pub fn requests_label(&self) -> bool {
        self.label_id
            .as_deref()
            .is_some_and(|id| id.trim().parse::<f64>().is_ok_and(f64::is_finite))
    }
}

/// Failure to turn a line into an [`ImportedRecord`]
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Malformed record: {0}")]
    Malformed(#[source] serde_json::Error),

    #[error("Invalid record: {source}")]
    Invalid {
        mark_id: Option<String>,
        #[source]
        source: serde_json::Error,
    },

    #[error("Missing required field '{field}'")]
    MissingField {
        mark_id: Option<String>,
        field: &'static str,
    },

    #[error("Invalid value for '{field}': {value}")]
    InvalidField {
        mark_id: Option<String>,
        field: &'static str,
        value: String,
    },
}

impl DecodeError {
    /// External identifier of the offending record, when it could be read
    pub fn mark_id(&self) -> Option<&str> {
        match self {
            DecodeError::Malformed(_) => None,
            DecodeError::Invalid { mark_id, .. }
            | DecodeError::MissingField { mark_id, .. }
            | DecodeError::InvalidField { mark_id, .. } => mark_id.as_deref(),
        }
    }

    /// Whether the line was well-formed but carried unusable values
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            DecodeError::MissingField { .. } | DecodeError::InvalidField { .. }
        )
    }
}

#[derive(Debug, Deserialize)]
struct RawRecord {
    #[serde(default, deserialize_with = "lenient_string")]
    mark_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    created_on: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    title: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    url: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    embed: Option<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    active: Option<bool>,
    #[serde(default, deserialize_with = "lenient_string")]
    archived_on: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    label_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    label_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    notes: Option<String>,
    #[serde(default)]
    tags: Option<Vec<String>>,
}

/// Whether `line` closes the marks array
pub fn is_terminator(line: &str) -> bool {
    line.trim() == "]"
}

/// Remove one trailing `,` (and the whitespace around it)
pub fn strip_trailing_comma(line: &str) -> &str {
    let trimmed = line.trim_end();
    trimmed.strip_suffix(',').unwrap_or(trimmed).trim_end()
}

/// Decode one export line
pub fn decode(line: &str) -> Result<ImportedRecord, DecodeError> {
    let json = strip_trailing_comma(line);
    let value: Value = serde_json::from_str(json).map_err(DecodeError::Malformed)?;

    let mark_id = value.get("mark_id").and_then(scalar_to_string);
    let raw: RawRecord = serde_json::from_value(value).map_err(|source| DecodeError::Invalid {
        mark_id: mark_id.clone(),
        source,
    })?;

    let mark_id = non_blank(raw.mark_id).ok_or(DecodeError::MissingField {
        mark_id: None,
        field: "mark_id",
    })?;
    let url = non_blank(raw.url).ok_or_else(|| DecodeError::MissingField {
        mark_id: Some(mark_id.clone()),
        field: "url",
    })?;

    let created_on = timestamp_field(&mark_id, "created_on", raw.created_on)?;
    let archived_on = timestamp_field(&mark_id, "archived_on", raw.archived_on)?;

    Ok(ImportedRecord {
        mark_id,
        created_on,
        title: raw.title,
        url,
        embed: raw.embed,
        active: raw.active.unwrap_or(true),
        archived_on,
        label_id: non_blank(raw.label_id),
        label_name: non_blank(raw.label_name),
        notes: raw.notes,
        tags: raw.tags.unwrap_or_default(),
    })
}

fn timestamp_field(
    mark_id: &str,
    field: &'static str,
    raw: Option<String>,
) -> Result<Option<NaiveDateTime>, DecodeError> {
    let Some(raw) = non_blank(raw) else {
        return Ok(None);
    };
    if raw == ZERO_DATE {
        return Ok(None);
    }
    parse_timestamp(&raw)
        .map(Some)
        .ok_or_else(|| DecodeError::InvalidField {
            mark_id: Some(mark_id.to_string()),
            field,
            value: raw,
        })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Strings, numbers and booleans as a string; `null` as `None`
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::Null => Ok(None),
        other => scalar_to_string(&other)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("expected a scalar, got {}", other))),
    }
}

/// Like `lenient_string`, but structured values are kept as JSON text
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    })
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match &value {
        Value::Null => Ok(None),
        Value::Bool(b) => Ok(Some(*b)),
        Value::Number(n) => Ok(Some(n.as_f64().map(|f| f != 0.0).unwrap_or(false))),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => Ok(Some(true)),
            "0" | "false" | "no" | "" => Ok(Some(false)),
            _ => Err(serde::de::Error::custom(format!("expected a flag, got {}", value))),
        },
        _ => Err(serde::de::Error::custom(format!("expected a flag, got {}", value))),
    }
}

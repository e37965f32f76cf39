//! Data models for Nilai
//!
//! Defines the persistent entities: Mark, UserMark, Label, SmartLabel and Tag.
//! A `Mark` is the shared content identity of a URL; a `UserMark` binds it to
//! one user together with label, notes and archival state.

use chrono::{DateTime, NaiveDateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// Storage and export format for timestamps
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Title used when a mark arrives without one
pub const DEFAULT_TITLE: &str = "No title";

/// Name of the fallback label for marks whose label cannot be found
pub const UNLABELED: &str = "Unlabeled";

/// A saved URL, shared by every user that marked it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Mark {
    pub id: i64,
    pub title: String,
    pub url: String,
    pub embed: Option<String>,
    pub created_on: NaiveDateTime,
}

/// Fields needed to find or create a mark
#[derive(Debug, Clone, PartialEq)]
pub struct NewMark {
    pub title: String,
    pub url: String,
    pub embed: Option<String>,
    /// Defaults to now when absent
    pub created_on: Option<NaiveDateTime>,
}

impl NewMark {
    /// Create a new mark for the given URL with the placeholder title
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            url: url.into(),
            embed: None,
            created_on: None,
        }
    }

    /// Set the title, falling back to the placeholder when blank
    pub fn with_title(mut self, title: Option<&str>) -> Self {
        self.title = match title.map(str::trim) {
            Some(t) if !t.is_empty() => t.to_string(),
            _ => DEFAULT_TITLE.to_string(),
        };
        self
    }

    pub fn with_embed(mut self, embed: Option<String>) -> Self {
        self.embed = embed;
        self
    }

    pub fn with_created_on(mut self, created_on: Option<NaiveDateTime>) -> Self {
        self.created_on = created_on;
        self
    }
}

/// Association between a user and a mark
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserMark {
    pub id: i64,
    pub user_id: i64,
    pub mark_id: i64,
    pub label_id: Option<i64>,
    pub notes: Option<String>,
    pub active: bool,
    pub archived_on: Option<NaiveDateTime>,
    pub created_on: NaiveDateTime,
}

/// Fields for creating a user mark
#[derive(Debug, Clone, PartialEq)]
pub struct NewUserMark {
    pub user_id: i64,
    pub mark_id: i64,
    pub label_id: Option<i64>,
    pub notes: Option<String>,
    pub active: bool,
    pub archived_on: Option<NaiveDateTime>,
    pub created_on: Option<NaiveDateTime>,
}

impl NewUserMark {
    /// Active, unlabeled association with no notes
    pub fn new(user_id: i64, mark_id: i64) -> Self {
        Self {
            user_id,
            mark_id,
            label_id: None,
            notes: None,
            active: true,
            archived_on: None,
            created_on: None,
        }
    }
}

/// A label owned by a user, or a system label when `user_id` is `None`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Label {
    pub id: i64,
    pub user_id: Option<i64>,
    pub name: String,
    pub slug: String,
    pub active: bool,
}

impl Label {
    /// Whether this label belongs to the system scope
    pub fn is_system(&self) -> bool {
        self.user_id.is_none()
    }
}

/// Rule that applies a label to marks from a given domain
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SmartLabel {
    pub id: i64,
    pub user_id: Option<i64>,
    pub domain: String,
    pub label_id: i64,
    pub active: bool,
}

/// A tag, shared across users and identified by its slug
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

/// A user's mark joined with its label and tags, for listing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MarkSummary {
    pub user_mark_id: i64,
    pub title: String,
    pub url: String,
    pub label: Option<String>,
    pub tags: Vec<String>,
    pub notes: Option<String>,
    pub archived_on: Option<NaiveDateTime>,
    pub created_on: NaiveDateTime,
}

/// Format a timestamp the way it is stored
pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a stored or exported timestamp
///
/// Accepts `YYYY-MM-DD HH:MM:SS` and RFC 3339.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| dt.with_timezone(&Utc).naive_utc())
        })
        .map(whole_seconds)
}

/// Drop sub-second precision, which storage does not keep
pub fn whole_seconds(ts: NaiveDateTime) -> NaiveDateTime {
    ts.with_nanosecond(0).unwrap_or(ts)
}

/// Current time as stored
pub fn now() -> NaiveDateTime {
    whole_seconds(Utc::now().naive_utc())
}

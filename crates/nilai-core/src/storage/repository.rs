//! SQLite repository
//!
//! Create/read/update operations for marks, user marks, labels, smart labels
//! and tags. A `Repository` borrows a connection, so the same code runs
//! directly on a `Connection` or inside a `Transaction` (which derefs to one).
//!
//! ## Tables
//!
//! - `marks` - One row per URL
//! - `users_to_marks` - A user's copy of a mark (label, notes, archive state)
//! - `labels` / `smart_labels` - User or system scoped labels and domain rules
//! - `tags` / `user_marks_to_tags` - Tags and their per-user links

use chrono::NaiveDateTime;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use url::Url;

use crate::errors;
use crate::helpers::generate_slug;
use crate::models::{
    format_timestamp, now, parse_timestamp, whole_seconds, Label, Mark, MarkSummary, NewMark, NewUserMark,
    SmartLabel, Tag, UserMark,
};
use crate::storage::error::{FieldErrors, StorageError, StorageResult};

/// Filters for listing a user's marks
#[derive(Debug, Clone, Default)]
pub struct MarkFilter {
    /// Label name (case-insensitive)
    pub label: Option<String>,
    /// Tag name or slug
    pub tag: Option<String>,
}

/// Row counts for status output
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct StoreCounts {
    pub marks: i64,
    pub user_marks: i64,
    pub labels: i64,
    pub tags: i64,
}

/// Storage operations over a borrowed connection
pub struct Repository<'c> {
    conn: &'c Connection,
}

impl<'c> Repository<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    // ==================== Marks ====================

    /// Find a mark by its exact URL
    pub fn find_mark_by_url(&self, url: &str) -> StorageResult<Option<Mark>> {
        let mark = self
            .conn
            .query_row(
                "SELECT id, title, url, embed, created_on FROM marks WHERE url = ?",
                params![url],
                mark_from_row,
            )
            .optional()?;
        Ok(mark)
    }

    /// Find the mark for `new.url`, creating it if absent
    ///
    /// Validation runs first and reports every rejected field at once.
    /// An existing mark is returned unchanged.
    pub fn import_mark(&self, new: &NewMark) -> StorageResult<Mark> {
        let url = new.url.trim();
        validate_mark(url, &new.title)?;

        if let Some(existing) = self.find_mark_by_url(url)? {
            return Ok(existing);
        }

        let created_on = new.created_on.map(whole_seconds).unwrap_or_else(now);
        self.conn.execute(
            "INSERT INTO marks (title, url, embed, created_on) VALUES (?, ?, ?, ?)",
            params![new.title, url, new.embed, format_timestamp(&created_on)],
        )?;

        Ok(Mark {
            id: self.conn.last_insert_rowid(),
            title: new.title.clone(),
            url: url.to_string(),
            embed: new.embed.clone(),
            created_on,
        })
    }

    // ==================== User marks ====================

    /// Active association between a user and a mark, if any
    pub fn find_active_user_mark(
        &self,
        user_id: i64,
        mark_id: i64,
    ) -> StorageResult<Option<UserMark>> {
        let user_mark = self
            .conn
            .query_row(
                r#"
                SELECT id, user_id, mark_id, label_id, notes, active, archived_on, created_on
                FROM users_to_marks
                WHERE user_id = ? AND mark_id = ? AND active = 1
                LIMIT 1
                "#,
                params![user_id, mark_id],
                user_mark_from_row,
            )
            .optional()?;
        Ok(user_mark)
    }

    /// Create a user mark
    pub fn create_user_mark(&self, new: &NewUserMark) -> StorageResult<UserMark> {
        let mut fields = FieldErrors::new();
        if !self.exists("SELECT 1 FROM marks WHERE id = ?", new.mark_id)? {
            fields.insert(errors::UNKNOWN_MARK, errors::error_message(errors::UNKNOWN_MARK).to_string());
        }
        if let Some(label_id) = new.label_id {
            if !self.exists("SELECT 1 FROM labels WHERE id = ?", label_id)? {
                fields.insert(
                    errors::UNKNOWN_LABEL,
                    errors::error_message(errors::UNKNOWN_LABEL).to_string(),
                );
            }
        }
        if !fields.is_empty() {
            return Err(StorageError::Validation(fields));
        }

        let created_on = new.created_on.map(whole_seconds).unwrap_or_else(now);
        let archived_on = new.archived_on.map(whole_seconds);
        self.conn.execute(
            r#"
            INSERT INTO users_to_marks
                (user_id, mark_id, label_id, notes, active, archived_on, created_on)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                new.user_id,
                new.mark_id,
                new.label_id,
                new.notes,
                new.active,
                archived_on.as_ref().map(format_timestamp),
                format_timestamp(&created_on),
            ],
        )?;

        Ok(UserMark {
            id: self.conn.last_insert_rowid(),
            user_id: new.user_id,
            mark_id: new.mark_id,
            label_id: new.label_id,
            notes: new.notes.clone(),
            active: new.active,
            archived_on,
            created_on,
        })
    }

    /// List a user's active marks, newest first
    pub fn user_marks(&self, user_id: i64, filter: &MarkFilter) -> StorageResult<Vec<MarkSummary>> {
        let tag_slug = filter.tag.as_deref().map(generate_slug);
        let mut stmt = self.conn.prepare(
            r#"
            SELECT um.id, m.title, m.url, l.name, um.notes, um.archived_on, um.created_on
            FROM users_to_marks um
            JOIN marks m ON m.id = um.mark_id
            LEFT JOIN labels l ON l.id = um.label_id
            WHERE um.user_id = ?1 AND um.active = 1
              AND (?2 IS NULL OR l.name = ?2 COLLATE NOCASE)
              AND (?3 IS NULL OR EXISTS (
                    SELECT 1 FROM user_marks_to_tags ut
                    JOIN tags t ON t.id = ut.tag_id
                    WHERE ut.users_to_mark_id = um.id AND t.slug = ?3))
            ORDER BY um.created_on DESC, um.id DESC
            "#,
        )?;

        let rows = stmt
            .query_map(params![user_id, filter.label, tag_slug], |row| {
                Ok(MarkSummary {
                    user_mark_id: row.get(0)?,
                    title: row.get(1)?,
                    url: row.get(2)?,
                    label: row.get(3)?,
                    tags: Vec::new(),
                    notes: row.get(4)?,
                    archived_on: optional_timestamp_at(row, 5)?,
                    created_on: timestamp_at(row, 6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut marks = Vec::with_capacity(rows.len());
        for mut summary in rows {
            summary.tags = self.tags_for_user_mark(summary.user_mark_id)?;
            marks.push(summary);
        }
        Ok(marks)
    }

    // ==================== Labels ====================

    /// Active label with this name visible to the user
    ///
    /// User labels shadow system labels of the same name. Names compare
    /// case-insensitively, like the collation exports were produced under.
    pub fn find_label_by_name(&self, user_id: i64, name: &str) -> StorageResult<Option<Label>> {
        let label = self
            .conn
            .query_row(
                r#"
                SELECT id, user_id, name, slug, active FROM labels
                WHERE (user_id IS NULL OR user_id = ?1)
                  AND active = 1
                  AND name = ?2 COLLATE NOCASE
                ORDER BY user_id DESC
                LIMIT 1
                "#,
                params![user_id, name.trim()],
                label_from_row,
            )
            .optional()?;
        Ok(label)
    }

    /// Active system label with this name
    pub fn find_system_label(&self, name: &str) -> StorageResult<Option<Label>> {
        let label = self
            .conn
            .query_row(
                r#"
                SELECT id, user_id, name, slug, active FROM labels
                WHERE user_id IS NULL AND active = 1 AND name = ? COLLATE NOCASE
                LIMIT 1
                "#,
                params![name.trim()],
                label_from_row,
            )
            .optional()?;
        Ok(label)
    }

    /// Create a label; `user_id` of `None` creates a system label
    pub fn create_label(&self, user_id: Option<i64>, name: &str) -> StorageResult<Label> {
        let name = name.trim();
        let slug = generate_slug(name);
        if slug.is_empty() {
            return Err(StorageError::invalid(
                errors::MISSING_NAME,
                errors::error_message(errors::MISSING_NAME),
            ));
        }

        self.conn.execute(
            "INSERT INTO labels (user_id, name, slug, active) VALUES (?, ?, ?, 1)",
            params![user_id, name, slug],
        )?;

        Ok(Label {
            id: self.conn.last_insert_rowid(),
            user_id,
            name: name.to_string(),
            slug,
            active: true,
        })
    }

    /// Labels visible to a user (system labels first, then by name)
    pub fn labels_for_user(&self, user_id: i64) -> StorageResult<Vec<Label>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, user_id, name, slug, active FROM labels
            WHERE (user_id IS NULL OR user_id = ?) AND active = 1
            ORDER BY user_id IS NOT NULL, name
            "#,
        )?;
        let labels = stmt
            .query_map(params![user_id], label_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(labels)
    }

    /// Smart label rule for a domain, preferring the user's own rule
    pub fn find_smart_label(&self, user_id: i64, domain: &str) -> StorageResult<Option<SmartLabel>> {
        let rule = self
            .conn
            .query_row(
                r#"
                SELECT s.id, s.user_id, s.domain, s.label_id, s.active
                FROM smart_labels s
                JOIN labels l ON l.id = s.label_id AND l.active = 1
                WHERE (s.user_id IS NULL OR s.user_id = ?1)
                  AND s.domain = ?2
                  AND s.active = 1
                ORDER BY s.user_id DESC
                LIMIT 1
                "#,
                params![user_id, domain],
                |row| {
                    Ok(SmartLabel {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        domain: row.get(2)?,
                        label_id: row.get(3)?,
                        active: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(rule)
    }

    /// Create a smart label rule
    pub fn create_smart_label(
        &self,
        user_id: Option<i64>,
        domain: &str,
        label_id: i64,
    ) -> StorageResult<SmartLabel> {
        let domain = domain.trim().to_lowercase();
        let domain = domain.strip_prefix("www.").unwrap_or(&domain).to_string();
        if domain.is_empty() {
            return Err(StorageError::invalid(
                errors::MISSING_NAME,
                errors::error_message(errors::MISSING_NAME),
            ));
        }
        if !self.exists("SELECT 1 FROM labels WHERE id = ?", label_id)? {
            return Err(StorageError::NotFound {
                entity: "Label",
                id: label_id,
            });
        }

        self.conn.execute(
            "INSERT INTO smart_labels (user_id, domain, label_id, active) VALUES (?, ?, ?, 1)",
            params![user_id, domain, label_id],
        )?;

        Ok(SmartLabel {
            id: self.conn.last_insert_rowid(),
            user_id,
            domain,
            label_id,
            active: true,
        })
    }

    // ==================== Tags ====================

    /// Find a tag by slug
    pub fn find_tag_by_slug(&self, slug: &str) -> StorageResult<Option<Tag>> {
        let tag = self
            .conn
            .query_row(
                "SELECT id, name, slug FROM tags WHERE slug = ?",
                params![slug],
                |row| {
                    Ok(Tag {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        slug: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(tag)
    }

    /// Create a tag
    pub fn create_tag(&self, name: &str, slug: &str) -> StorageResult<Tag> {
        if slug.is_empty() {
            return Err(StorageError::invalid(
                errors::MISSING_NAME,
                errors::error_message(errors::MISSING_NAME),
            ));
        }
        self.conn.execute(
            "INSERT INTO tags (name, slug) VALUES (?, ?)",
            params![name, slug],
        )?;
        Ok(Tag {
            id: self.conn.last_insert_rowid(),
            name: name.to_string(),
            slug: slug.to_string(),
        })
    }

    /// Link a tag to a user mark; linking twice is a no-op
    ///
    /// Returns the linked tag ID.
    pub fn link_tag(&self, user_mark_id: i64, tag_id: i64, user_id: i64) -> StorageResult<i64> {
        self.conn.execute(
            r#"
            INSERT OR IGNORE INTO user_marks_to_tags (users_to_mark_id, tag_id, user_id)
            VALUES (?, ?, ?)
            "#,
            params![user_mark_id, tag_id, user_id],
        )?;
        Ok(tag_id)
    }

    /// Tag IDs linked to a user mark for this user
    pub fn linked_tag_ids(&self, user_mark_id: i64, user_id: i64) -> StorageResult<Vec<i64>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT tag_id FROM user_marks_to_tags
            WHERE users_to_mark_id = ? AND user_id = ?
            ORDER BY tag_id
            "#,
        )?;
        let ids = stmt
            .query_map(params![user_mark_id, user_id], |row| row.get(0))?
            .collect::<Result<Vec<i64>, _>>()?;
        Ok(ids)
    }

    /// Remove every tag link of the user mark not listed in `keep`
    ///
    /// Returns the number of links removed.
    pub fn unlink_tags_except(
        &self,
        user_mark_id: i64,
        user_id: i64,
        keep: &[i64],
    ) -> StorageResult<usize> {
        let mut removed = 0;
        for tag_id in self.linked_tag_ids(user_mark_id, user_id)? {
            if keep.contains(&tag_id) {
                continue;
            }
            removed += self.conn.execute(
                r#"
                DELETE FROM user_marks_to_tags
                WHERE users_to_mark_id = ? AND user_id = ? AND tag_id = ?
                "#,
                params![user_mark_id, user_id, tag_id],
            )?;
        }
        Ok(removed)
    }

    /// Tag names on a user mark, alphabetical
    pub fn tags_for_user_mark(&self, user_mark_id: i64) -> StorageResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT t.name FROM tags t
            JOIN user_marks_to_tags ut ON t.id = ut.tag_id
            WHERE ut.users_to_mark_id = ?
            ORDER BY t.name
            "#,
        )?;
        let tags = stmt
            .query_map(params![user_mark_id], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(tags)
    }

    /// A user's tags with usage counts
    pub fn tags_with_counts(&self, user_id: i64) -> StorageResult<Vec<(String, i64)>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT t.name, COUNT(ut.users_to_mark_id) as count
            FROM tags t
            JOIN user_marks_to_tags ut ON t.id = ut.tag_id
            WHERE ut.user_id = ?
            GROUP BY t.id
            ORDER BY count DESC, t.name
            "#,
        )?;
        let tags = stmt
            .query_map(params![user_id], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<(String, i64)>, _>>()?;
        Ok(tags)
    }

    // ==================== Counts ====================

    /// Row counts; user marks are limited to `user_id` when given
    pub fn counts(&self, user_id: Option<i64>) -> StorageResult<StoreCounts> {
        let count = |sql: &str| -> StorageResult<i64> {
            Ok(self.conn.query_row(sql, [], |row| row.get(0))?)
        };

        let user_marks = match user_id {
            Some(id) => self.conn.query_row(
                "SELECT COUNT(*) FROM users_to_marks WHERE user_id = ? AND active = 1",
                params![id],
                |row| row.get(0),
            )?,
            None => count("SELECT COUNT(*) FROM users_to_marks WHERE active = 1")?,
        };

        Ok(StoreCounts {
            marks: count("SELECT COUNT(*) FROM marks")?,
            user_marks,
            labels: count("SELECT COUNT(*) FROM labels WHERE active = 1")?,
            tags: count("SELECT COUNT(*) FROM tags")?,
        })
    }

    // ==================== Private helpers ====================

    fn exists(&self, sql: &str, id: i64) -> StorageResult<bool> {
        let mut stmt = self.conn.prepare(sql)?;
        Ok(stmt.exists(params![id])?)
    }
}

/// Validate mark fields, collecting every failure
fn validate_mark(url: &str, title: &str) -> StorageResult<()> {
    let mut fields = FieldErrors::new();

    if url.is_empty() {
        fields.insert(errors::MISSING_URL, errors::error_message(errors::MISSING_URL).to_string());
    } else {
        let valid = Url::parse(url)
            .map(|u| matches!(u.scheme(), "http" | "https" | "ftp") && u.host_str().is_some())
            .unwrap_or(false);
        if !valid {
            fields.insert(errors::INVALID_URL, errors::error_message(errors::INVALID_URL).to_string());
        }
    }

    if title.chars().count() > errors::MAX_TITLE_LEN {
        fields.insert(
            errors::TITLE_TOO_LONG,
            errors::error_message(errors::TITLE_TOO_LONG).to_string(),
        );
    }

    if fields.is_empty() {
        Ok(())
    } else {
        Err(StorageError::Validation(fields))
    }
}

// ==================== Row mapping ====================

fn mark_from_row(row: &Row<'_>) -> rusqlite::Result<Mark> {
    Ok(Mark {
        id: row.get(0)?,
        title: row.get(1)?,
        url: row.get(2)?,
        embed: row.get(3)?,
        created_on: timestamp_at(row, 4)?,
    })
}

fn user_mark_from_row(row: &Row<'_>) -> rusqlite::Result<UserMark> {
    Ok(UserMark {
        id: row.get(0)?,
        user_id: row.get(1)?,
        mark_id: row.get(2)?,
        label_id: row.get(3)?,
        notes: row.get(4)?,
        active: row.get(5)?,
        archived_on: optional_timestamp_at(row, 6)?,
        created_on: timestamp_at(row, 7)?,
    })
}

fn label_from_row(row: &Row<'_>) -> rusqlite::Result<Label> {
    Ok(Label {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        slug: row.get(3)?,
        active: row.get(4)?,
    })
}

fn timestamp_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDateTime> {
    let raw: String = row.get(idx)?;
    parse_timestamp(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            format!("invalid timestamp: {}", raw).into(),
        )
    })
}

fn optional_timestamp_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<NaiveDateTime>> {
    let raw: Option<String> = row.get(idx)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(_) => timestamp_at(row, idx).map(Some),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::schema::init_schema;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        init_schema(&conn).unwrap();
        conn
    }

    #[test]
    fn test_import_mark_creates_then_reuses() {
        let conn = test_conn();
        let repo = Repository::new(&conn);

        let first = repo
            .import_mark(&NewMark::new("https://rust-lang.org").with_title(Some("Rust")))
            .unwrap();
        let second = repo
            .import_mark(&NewMark::new("https://rust-lang.org").with_title(Some("Other")))
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.title, "Rust");
        assert_eq!(repo.counts(None).unwrap().marks, 1);
    }

    #[test]
    fn test_import_mark_keeps_created_on() {
        let conn = test_conn();
        let repo = Repository::new(&conn);
        let ts = parse_timestamp("2014-02-03 10:11:12");

        let mark = repo
            .import_mark(&NewMark::new("https://example.com").with_created_on(ts))
            .unwrap();
        let found = repo.find_mark_by_url("https://example.com").unwrap().unwrap();
        assert_eq!(found.created_on, mark.created_on);
        assert_eq!(Some(found.created_on), ts);
    }

    #[test]
    fn test_import_mark_validation_reports_all_fields() {
        let conn = test_conn();
        let repo = Repository::new(&conn);

        let mut new = NewMark::new("not a url");
        new.title = "x".repeat(errors::MAX_TITLE_LEN + 1);

        let err = repo.import_mark(&new).unwrap_err();
        let fields = err.field_errors().unwrap();
        assert!(fields.contains_key(&errors::INVALID_URL));
        assert!(fields.contains_key(&errors::TITLE_TOO_LONG));

        let err = repo.import_mark(&NewMark::new("  ")).unwrap_err();
        assert!(err.field_errors().unwrap().contains_key(&errors::MISSING_URL));
        assert_eq!(repo.counts(None).unwrap().marks, 0);
    }

    #[test]
    fn test_user_mark_lifecycle() {
        let conn = test_conn();
        let repo = Repository::new(&conn);
        let mark = repo.import_mark(&NewMark::new("https://example.com")).unwrap();

        assert!(repo.find_active_user_mark(1, mark.id).unwrap().is_none());

        let mut new = NewUserMark::new(1, mark.id);
        new.notes = Some("hello".to_string());
        let created = repo.create_user_mark(&new).unwrap();

        let found = repo.find_active_user_mark(1, mark.id).unwrap().unwrap();
        assert_eq!(found, created);

        // Another user sees nothing
        assert!(repo.find_active_user_mark(2, mark.id).unwrap().is_none());
    }

    #[test]
    fn test_inactive_user_mark_is_not_found() {
        let conn = test_conn();
        let repo = Repository::new(&conn);
        let mark = repo.import_mark(&NewMark::new("https://example.com")).unwrap();

        let mut new = NewUserMark::new(1, mark.id);
        new.active = false;
        repo.create_user_mark(&new).unwrap();

        assert!(repo.find_active_user_mark(1, mark.id).unwrap().is_none());
    }

    #[test]
    fn test_create_user_mark_unknown_references() {
        let conn = test_conn();
        let repo = Repository::new(&conn);

        let mut new = NewUserMark::new(1, 99);
        new.label_id = Some(42);
        let err = repo.create_user_mark(&new).unwrap_err();
        let fields = err.field_errors().unwrap();
        assert!(fields.contains_key(&errors::UNKNOWN_MARK));
        assert!(fields.contains_key(&errors::UNKNOWN_LABEL));
    }

    #[test]
    fn test_user_label_shadows_system_label() {
        let conn = test_conn();
        let repo = Repository::new(&conn);

        let system = repo.create_label(None, "Read").unwrap();
        let mine = repo.create_label(Some(1), "Read").unwrap();
        repo.create_label(Some(2), "Watch").unwrap();

        assert_eq!(repo.find_label_by_name(1, "read").unwrap().unwrap().id, mine.id);
        assert_eq!(repo.find_label_by_name(3, "Read").unwrap().unwrap().id, system.id);
        // Other users' labels are invisible
        assert!(repo.find_label_by_name(1, "Watch").unwrap().is_none());

        assert_eq!(repo.find_system_label("READ").unwrap().unwrap().id, system.id);
        assert!(repo.find_system_label("Watch").unwrap().is_none());
    }

    #[test]
    fn test_create_label_requires_name() {
        let conn = test_conn();
        let repo = Repository::new(&conn);
        let err = repo.create_label(None, "  ").unwrap_err();
        assert!(err.field_errors().unwrap().contains_key(&errors::MISSING_NAME));
    }

    #[test]
    fn test_smart_label_prefers_user_rule() {
        let conn = test_conn();
        let repo = Repository::new(&conn);

        let watch = repo.create_label(None, "Watch").unwrap();
        let mine = repo.create_label(Some(1), "Videos").unwrap();
        repo.create_smart_label(None, "www.youtube.com", watch.id).unwrap();
        repo.create_smart_label(Some(1), "youtube.com", mine.id).unwrap();

        let rule = repo.find_smart_label(1, "youtube.com").unwrap().unwrap();
        assert_eq!(rule.label_id, mine.id);

        let rule = repo.find_smart_label(2, "youtube.com").unwrap().unwrap();
        assert_eq!(rule.label_id, watch.id);

        assert!(repo.find_smart_label(1, "vimeo.com").unwrap().is_none());
    }

    #[test]
    fn test_create_smart_label_unknown_label() {
        let conn = test_conn();
        let repo = Repository::new(&conn);
        let err = repo.create_smart_label(None, "example.com", 7).unwrap_err();
        assert!(matches!(err, StorageError::NotFound { .. }));
    }

    #[test]
    fn test_tag_links_are_idempotent_and_prunable() {
        let conn = test_conn();
        let repo = Repository::new(&conn);
        let mark = repo.import_mark(&NewMark::new("https://example.com")).unwrap();
        let um = repo.create_user_mark(&NewUserMark::new(1, mark.id)).unwrap();

        let a = repo.create_tag("A", "a").unwrap();
        let b = repo.create_tag("B", "b").unwrap();
        repo.link_tag(um.id, a.id, 1).unwrap();
        repo.link_tag(um.id, a.id, 1).unwrap();
        repo.link_tag(um.id, b.id, 1).unwrap();
        assert_eq!(repo.linked_tag_ids(um.id, 1).unwrap(), vec![a.id, b.id]);

        let removed = repo.unlink_tags_except(um.id, 1, &[b.id]).unwrap();
        assert_eq!(removed, 1);
        assert_eq!(repo.linked_tag_ids(um.id, 1).unwrap(), vec![b.id]);
        assert_eq!(repo.tags_for_user_mark(um.id).unwrap(), vec!["B"]);
    }

    #[test]
    fn test_user_marks_listing_filters() {
        let conn = test_conn();
        let repo = Repository::new(&conn);
        let label = repo.create_label(None, "Read").unwrap();
        let tag = repo.create_tag("Rust", "rust").unwrap();

        let m1 = repo.import_mark(&NewMark::new("https://one.com")).unwrap();
        let m2 = repo.import_mark(&NewMark::new("https://two.com")).unwrap();

        let mut new = NewUserMark::new(1, m1.id);
        new.label_id = Some(label.id);
        let um1 = repo.create_user_mark(&new).unwrap();
        repo.link_tag(um1.id, tag.id, 1).unwrap();
        repo.create_user_mark(&NewUserMark::new(1, m2.id)).unwrap();

        let all = repo.user_marks(1, &MarkFilter::default()).unwrap();
        assert_eq!(all.len(), 2);

        let by_label = repo
            .user_marks(
                1,
                &MarkFilter {
                    label: Some("read".to_string()),
                    tag: None,
                },
            )
            .unwrap();
        assert_eq!(by_label.len(), 1);
        assert_eq!(by_label[0].url, "https://one.com");
        assert_eq!(by_label[0].label.as_deref(), Some("Read"));

        let by_tag = repo
            .user_marks(
                1,
                &MarkFilter {
                    label: None,
                    tag: Some("Rust".to_string()),
                },
            )
            .unwrap();
        assert_eq!(by_tag.len(), 1);
        assert_eq!(by_tag[0].tags, vec!["Rust"]);

        assert!(repo.user_marks(2, &MarkFilter::default()).unwrap().is_empty());
    }

    #[test]
    fn test_tags_with_counts_per_user() {
        let conn = test_conn();
        let repo = Repository::new(&conn);
        let tag = repo.create_tag("Rust", "rust").unwrap();
        let m1 = repo.import_mark(&NewMark::new("https://one.com")).unwrap();
        let m2 = repo.import_mark(&NewMark::new("https://two.com")).unwrap();
        let um1 = repo.create_user_mark(&NewUserMark::new(1, m1.id)).unwrap();
        let um2 = repo.create_user_mark(&NewUserMark::new(1, m2.id)).unwrap();
        let um3 = repo.create_user_mark(&NewUserMark::new(2, m2.id)).unwrap();
        repo.link_tag(um1.id, tag.id, 1).unwrap();
        repo.link_tag(um2.id, tag.id, 1).unwrap();
        repo.link_tag(um3.id, tag.id, 2).unwrap();

        assert_eq!(
            repo.tags_with_counts(1).unwrap(),
            vec![("Rust".to_string(), 2)]
        );
        assert_eq!(
            repo.tags_with_counts(2).unwrap(),
            vec![("Rust".to_string(), 1)]
        );
    }

    #[test]
    fn test_special_characters_round_trip() {
        let conn = test_conn();
        let repo = Repository::new(&conn);

        let new = NewMark::new("https://example.com/path?query=value&other=123")
            .with_title(Some("Test \"quotes\" and 'apostrophes'"))
            .with_embed(Some("<iframe src=\"x\"></iframe>".to_string()));
        repo.import_mark(&new).unwrap();

        let found = repo
            .find_mark_by_url("https://example.com/path?query=value&other=123")
            .unwrap()
            .unwrap();
        assert_eq!(found.title, "Test \"quotes\" and 'apostrophes'");
        assert_eq!(found.embed.as_deref(), Some("<iframe src=\"x\"></iframe>"));
    }
}

//! SQLite schema for marks, labels and tags

use rusqlite::{Connection, Result};

/// Current schema version for migrations
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Schema version tracking
        CREATE TABLE IF NOT EXISTS schema_info (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        -- Marks: one row per URL, shared by all users
        CREATE TABLE IF NOT EXISTS marks (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            url TEXT UNIQUE NOT NULL,
            embed TEXT,
            created_on TEXT NOT NULL
        );

        -- Labels (user_id NULL = system label)
        CREATE TABLE IF NOT EXISTS labels (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER,
            name TEXT NOT NULL,
            slug TEXT NOT NULL,
            active INTEGER NOT NULL DEFAULT 1
        );

        -- Domain rules that apply a label automatically
        CREATE TABLE IF NOT EXISTS smart_labels (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER,
            domain TEXT NOT NULL,
            label_id INTEGER NOT NULL,
            active INTEGER NOT NULL DEFAULT 1,
            FOREIGN KEY (label_id) REFERENCES labels(id) ON DELETE CASCADE
        );

        -- User <-> mark associations
        CREATE TABLE IF NOT EXISTS users_to_marks (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            mark_id INTEGER NOT NULL,
            label_id INTEGER,
            notes TEXT,
            active INTEGER NOT NULL DEFAULT 1,
            archived_on TEXT,
            created_on TEXT NOT NULL,
            FOREIGN KEY (mark_id) REFERENCES marks(id) ON DELETE CASCADE,
            FOREIGN KEY (label_id) REFERENCES labels(id) ON DELETE SET NULL
        );

        -- Tags, identified by slug
        CREATE TABLE IF NOT EXISTS tags (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            slug TEXT UNIQUE NOT NULL
        );

        -- User mark <-> tag junction, scoped per user
        CREATE TABLE IF NOT EXISTS user_marks_to_tags (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            users_to_mark_id INTEGER NOT NULL,
            tag_id INTEGER NOT NULL,
            user_id INTEGER NOT NULL,
            UNIQUE (users_to_mark_id, tag_id, user_id),
            FOREIGN KEY (users_to_mark_id) REFERENCES users_to_marks(id) ON DELETE CASCADE,
            FOREIGN KEY (tag_id) REFERENCES tags(id) ON DELETE CASCADE
        );

        -- At most one active association per (user, mark)
        CREATE UNIQUE INDEX IF NOT EXISTS idx_users_to_marks_active
            ON users_to_marks(user_id, mark_id) WHERE active = 1;

        -- Label lookups by name and owner
        CREATE INDEX IF NOT EXISTS idx_labels_name ON labels(name, user_id);
        CREATE INDEX IF NOT EXISTS idx_smart_labels_domain ON smart_labels(domain, user_id);

        -- Listing a user's marks
        CREATE INDEX IF NOT EXISTS idx_users_to_marks_user ON users_to_marks(user_id, created_on);
        CREATE INDEX IF NOT EXISTS idx_user_marks_to_tags_tag ON user_marks_to_tags(tag_id);
        "#,
    )?;

    // Set schema version
    conn.execute(
        "INSERT OR REPLACE INTO schema_info (key, value) VALUES ('version', ?)",
        [SCHEMA_VERSION.to_string()],
    )?;

    Ok(())
}

/// Get the current schema version from the database
pub fn get_schema_version(conn: &Connection) -> Result<Option<i32>> {
    let mut stmt = conn.prepare("SELECT value FROM schema_info WHERE key = 'version'")?;
    let result: Result<String> = stmt.query_row([], |row| row.get(0));

    match result {
        Ok(version_str) => Ok(version_str.parse().ok()),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Check if schema needs initialization or migration
pub fn needs_init(conn: &Connection) -> bool {
    let table_exists: bool = conn
        .prepare("SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_info'")
        .and_then(|mut stmt| stmt.exists([]))
        .unwrap_or(false);

    if !table_exists {
        return true;
    }

    match get_schema_version(conn) {
        Ok(Some(v)) => v < SCHEMA_VERSION,
        _ => true,
    }
}

//! Unified storage interface
//!
//! The `Store` owns the SQLite connection. Reads go through
//! [`Store::repository`]; the importer opens one transaction per record with
//! [`Store::transaction`] and runs a `Repository` on top of it.
//!
//! ## Usage
//!
//! ```ignore
//! let mut store = Store::open()?;
//!
//! let tx = store.transaction()?;
//! let mark = Repository::new(&tx).import_mark(&NewMark::new("https://example.com"))?;
//! tx.commit()?;
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rusqlite::{Connection, Transaction};
use tracing::debug;

use crate::config::Config;
use crate::storage::schema::{init_schema, needs_init};
use crate::storage::{Repository, StorageError, StorageResult};

/// SQLite-backed store for marks, labels and tags
pub struct Store {
    conn: Connection,
    path: Option<PathBuf>,
}

impl Store {
    /// Open the store using the default configuration
    pub fn open() -> Result<Self> {
        let config = Config::load().context("Failed to load configuration")?;
        Self::open_with_config(&config).context("Failed to open database")
    }

    /// Open the store at the configured data directory
    pub fn open_with_config(config: &Config) -> StorageResult<Self> {
        Self::open_path(&config.sqlite_path())
    }

    /// Open or create the database file at `path`
    pub fn open_path(path: &Path) -> StorageResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StorageError::from_io(e, parent.to_path_buf()))?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        if needs_init(&conn) {
            debug!("Initializing schema at {:?}", path);
            init_schema(&conn)?;
        }

        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        init_schema(&conn)?;
        Ok(Self { conn, path: None })
    }

    /// Database file, `None` for in-memory stores
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Repository over the connection, outside any transaction
    pub fn repository(&self) -> Repository<'_> {
        Repository::new(&self.conn)
    }

    /// Begin a transaction; dropping it without commit rolls back
    pub fn transaction(&mut self) -> StorageResult<Transaction<'_>> {
        Ok(self.conn.transaction()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewMark;

    #[test]
    fn test_open_in_memory() {
        let store = Store::open_in_memory().unwrap();
        assert!(store.path().is_none());
        assert_eq!(store.repository().counts(None).unwrap().marks, 0);
    }

    #[test]
    fn test_open_path_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("nilai.db");

        {
            let store = Store::open_path(&path).unwrap();
            store
                .repository()
                .import_mark(&NewMark::new("https://example.com"))
                .unwrap();
        }
        assert!(path.exists());

        // Data survives reopening
        let store = Store::open_path(&path).unwrap();
        assert_eq!(store.repository().counts(None).unwrap().marks, 1);
    }

    #[test]
    fn test_dropped_transaction_rolls_back() {
        let mut store = Store::open_in_memory().unwrap();
        {
            let tx = store.transaction().unwrap();
            Repository::new(&tx)
                .import_mark(&NewMark::new("https://example.com"))
                .unwrap();
        }
        assert_eq!(store.repository().counts(None).unwrap().marks, 0);

        let tx = store.transaction().unwrap();
        Repository::new(&tx)
            .import_mark(&NewMark::new("https://example.com"))
            .unwrap();
        tx.commit().unwrap();
        assert_eq!(store.repository().counts(None).unwrap().marks, 1);
    }
}

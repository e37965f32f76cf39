//! Importing one decoded record
//!
//! Every record runs in its own transaction. Storage validation failures
//! and unexpected database errors are reported on the record's result and
//! roll the transaction back; only a failure to begin the transaction is
//! returned to the caller, since the connection is then unusable.

use tracing::{debug, warn};

use crate::helpers::smart_label_key;
use crate::import::labels::LabelResolver;
use crate::import::record::ImportedRecord;
use crate::import::result::{Classification, ImportIssue, ImportResult};
use crate::import::tags::{tag_candidates, TagSynchronizer};
use crate::import::ImportError;
use crate::models::{NewMark, NewUserMark};
use crate::storage::{Repository, StorageError, StorageResult};
use crate::store::Store;

/// Only export format understood by the importer
pub const SUPPORTED_EXPORT_VERSION: i64 = 1;

/// What a session knows before the first record arrives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionMeta {
    /// Format version declared by the export
    pub export_version: i64,
    /// Owner of the imported marks
    pub user_id: i64,
}

impl SessionMeta {
    pub fn new(export_version: i64, user_id: i64) -> Self {
        Self {
            export_version,
            user_id,
        }
    }
}

/// Imports records into a store on behalf of a session
pub struct RecordImporter<'a> {
    store: &'a mut Store,
    meta: SessionMeta,
    labels: &'a mut LabelResolver,
}

impl<'a> RecordImporter<'a> {
    pub fn new(store: &'a mut Store, meta: SessionMeta, labels: &'a mut LabelResolver) -> Self {
        Self {
            store,
            meta,
            labels,
        }
    }

    /// Import one record
    pub fn import(&mut self, record: &ImportedRecord) -> Result<ImportResult, ImportError> {
        let mut result = ImportResult::pending();

        if self.meta.export_version != SUPPORTED_EXPORT_VERSION {
            result.error(ImportIssue::message(format!(
                "Invalid data format {}",
                self.meta.export_version
            )));
            return Ok(result.finalize());
        }

        let tx = self.store.transaction()?;
        let outcome = persist(
            &Repository::new(&tx),
            &mut *self.labels,
            self.meta.user_id,
            record,
            &mut result,
        );

        match outcome {
            Ok(()) if !result.has_errors() => {
                if let Err(e) = tx.commit() {
                    warn!("Commit failed for mark {}: {}", record.mark_id, e);
                    result.error(ImportIssue::internal());
                }
            }
            Ok(()) => {
                debug!("Rolling back mark {}: {:?}", record.mark_id, result.errors);
            }
            Err(e) => {
                warn!("Storage error importing mark {}: {}", record.mark_id, e);
                result.error(ImportIssue::internal());
            }
        }

        Ok(result.finalize())
    }
}

/// Storage steps for one record; the caller owns the transaction
fn persist(
    repo: &Repository<'_>,
    labels: &mut LabelResolver,
    user_id: i64,
    record: &ImportedRecord,
    result: &mut ImportResult,
) -> StorageResult<()> {
    let new_mark = NewMark::new(record.url.as_str())
        .with_title(record.title.as_deref())
        .with_embed(record.embed.clone())
        .with_created_on(record.created_on);

    let mark = match repo.import_mark(&new_mark) {
        Ok(mark) => mark,
        Err(StorageError::Validation(fields)) => {
            result.field_errors(&fields);
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    if repo.find_active_user_mark(user_id, mark.id)?.is_some() {
        result.result = Classification::Skipped;
        return Ok(());
    }

    let mut new_user_mark = NewUserMark {
        notes: record.notes.clone(),
        active: record.active,
        archived_on: record.archived_on,
        created_on: record.created_on,
        ..NewUserMark::new(user_id, mark.id)
    };

    if record.requests_label() {
        let name = record.label_name.as_deref().unwrap_or_default();
        let resolution = labels.resolve(repo, user_id, name)?;
        new_user_mark.label_id = resolution.label_id;
        if let Some(warning) = resolution.warning {
            result.warn(warning);
        }
    }

    let tags = tag_candidates(record.notes.as_deref(), &record.tags);

    if new_user_mark.label_id.is_none() {
        if let Some(domain) = smart_label_key(&mark.url) {
            if let Some(rule) = repo.find_smart_label(user_id, &domain)? {
                debug!("Smart label {} applies to {}", rule.label_id, domain);
                new_user_mark.label_id = Some(rule.label_id);
            }
        }
    }

    let user_mark = match repo.create_user_mark(&new_user_mark) {
        Ok(user_mark) => user_mark,
        Err(StorageError::Validation(fields)) => {
            result.field_errors(&fields);
            return Ok(());
        }
        Err(e) => return Err(e),
    };
    result.result = Classification::Added;

    if !tags.is_empty() {
        TagSynchronizer::new(repo).sync(&tags, user_mark.id, user_id)?;
    }

    Ok(())
}

//! Label resolution with an `Unlabeled` fallback
//!
//! A record names its label; the name is looked up among the user's labels
//! and the system labels. When nothing matches, the mark falls back to the
//! `Unlabeled` label if one exists. That lookup happens at most once per
//! session and its outcome, including "there is none", is cached.

use tracing::debug;

use crate::models::UNLABELED;
use crate::storage::{Repository, StorageResult};

/// What is known about the `Unlabeled` fallback label
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnlabeledCache {
    /// Not looked up yet
    #[default]
    Unknown,
    /// Looked up and found
    Found(i64),
    /// Looked up; the user has no such label
    Missing,
}

/// Label to apply and the warning to report, if any
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelResolution {
    pub label_id: Option<i64>,
    pub warning: Option<String>,
}

/// Resolves label names for one import session
#[derive(Debug, Default)]
pub struct LabelResolver {
    unlabeled: UnlabeledCache,
}

impl LabelResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unlabeled_cache(&self) -> UnlabeledCache {
        self.unlabeled
    }

    /// Resolve `name` for `user_id`
    pub fn resolve(
        &mut self,
        repo: &Repository<'_>,
        user_id: i64,
        name: &str,
    ) -> StorageResult<LabelResolution> {
        if let Some(label) = repo.find_label_by_name(user_id, name)? {
            return Ok(LabelResolution {
                label_id: Some(label.id),
                warning: None,
            });
        }

        match self.unlabeled_id(repo, user_id)? {
            Some(id) => Ok(LabelResolution {
                label_id: Some(id),
                warning: Some(format!("Label {} not found. Marked as Unlabeled.", name)),
            }),
            None => Ok(LabelResolution {
                label_id: None,
                warning: Some(format!("Label {} not found. Stripped label info.", name)),
            }),
        }
    }

    fn unlabeled_id(&mut self, repo: &Repository<'_>, user_id: i64) -> StorageResult<Option<i64>> {
        match self.unlabeled {
            UnlabeledCache::Found(id) => Ok(Some(id)),
            UnlabeledCache::Missing => Ok(None),
            UnlabeledCache::Unknown => {
                let found = repo.find_label_by_name(user_id, UNLABELED)?.map(|l| l.id);
                self.unlabeled = match found {
                    Some(id) => UnlabeledCache::Found(id),
                    None => UnlabeledCache::Missing,
                };
                debug!("Unlabeled fallback for user {}: {:?}", user_id, self.unlabeled);
                Ok(found)
            }
        }
    }
}

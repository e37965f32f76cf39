//! Tag reconciliation for imported user marks

use tracing::debug;

use crate::helpers::{generate_slug, tags_from_hash};
use crate::storage::{Repository, StorageResult};

/// Tag names for a record: hashtags from the notes, then explicit tags
pub fn tag_candidates(notes: Option<&str>, explicit: &[String]) -> Vec<String> {
    let mut names = notes.map(tags_from_hash).unwrap_or_default();
    names.extend(explicit.iter().cloned());
    names
}

/// Makes a user mark's tag links match a list of names
pub struct TagSynchronizer<'r, 'c> {
    repo: &'r Repository<'c>,
}

impl<'r, 'c> TagSynchronizer<'r, 'c> {
    pub fn new(repo: &'r Repository<'c>) -> Self {
        Self { repo }
    }

    /// Link every named tag, creating missing ones, then drop other links
    ///
    /// Names that slugify to nothing are ignored. Returns the linked tag IDs.
    pub fn sync(&self, names: &[String], user_mark_id: i64, user_id: i64) -> StorageResult<Vec<i64>> {
        let mut linked = Vec::new();

        for name in names {
            let name = name.trim();
            let slug = generate_slug(name);
            if slug.is_empty() {
                continue;
            }

            let tag = match self.repo.find_tag_by_slug(&slug)? {
                Some(tag) => tag,
                None => self.repo.create_tag(name, &slug)?,
            };
            let tag_id = self.repo.link_tag(user_mark_id, tag.id, user_id)?;
            if !linked.contains(&tag_id) {
                linked.push(tag_id);
            }
        }

        let removed = self.repo.unlink_tags_except(user_mark_id, user_id, &linked)?;
        debug!(
            "Synced tags for user mark {}: {} linked, {} removed",
            user_mark_id,
            linked.len(),
            removed
        );
        Ok(linked)
    }
}

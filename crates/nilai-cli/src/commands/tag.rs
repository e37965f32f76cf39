//! Tag command handlers

use anyhow::Result;

use nilai_core::Store;

use crate::output::Output;

/// List a user's tags with usage counts
pub fn list(store: &Store, user_id: i64, output: &Output) -> Result<()> {
    let tags = store.repository().tags_with_counts(user_id)?;
    output.print_tags(&tags);
    Ok(())
}

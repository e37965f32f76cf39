//! Mark command handlers

use anyhow::Result;

use nilai_core::{MarkFilter, Store};

use crate::output::Output;

/// List a user's marks, optionally filtered by label or tag
pub fn list(
    store: &Store,
    user_id: i64,
    label: Option<String>,
    tag: Option<String>,
    output: &Output,
) -> Result<()> {
    let filter = MarkFilter { label, tag };
    let marks = store.repository().user_marks(user_id, &filter)?;
    output.print_marks(&marks);
    Ok(())
}

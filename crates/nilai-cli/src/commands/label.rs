//! Label command handlers

use anyhow::{bail, Result};

use nilai_core::Store;

use crate::output::Output;

/// List labels visible to a user
pub fn list(store: &Store, user_id: i64, output: &Output) -> Result<()> {
    let labels = store.repository().labels_for_user(user_id)?;
    output.print_labels(&labels);
    Ok(())
}

/// Create a label; `None` owner creates a system label
pub fn add(store: &Store, owner: Option<i64>, name: String, output: &Output) -> Result<()> {
    let label = store.repository().create_label(owner, &name)?;
    let scope = if label.is_system() { "system" } else { "user" };
    output.success(&format!("Created {} label '{}' ({})", scope, label.name, label.id));
    Ok(())
}

/// Add a smart label rule mapping a domain to an existing label
pub fn smart(
    store: &Store,
    owner: Option<i64>,
    domain: String,
    label_name: String,
    output: &Output,
) -> Result<()> {
    let repo = store.repository();
    let label = match owner {
        Some(user_id) => repo.find_label_by_name(user_id, &label_name)?,
        None => repo.find_system_label(&label_name)?,
    };
    let Some(label) = label else {
        bail!("Label '{}' not found", label_name);
    };

    let rule = repo.create_smart_label(owner, &domain, label.id)?;
    output.success(&format!("Marks from {} will be labeled '{}'", rule.domain, label.name));
    Ok(())
}

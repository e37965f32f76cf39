//! Status command handler

use anyhow::Result;

use nilai_core::{Config, Store};

use crate::output::{Output, OutputFormat};

/// Show status information
pub fn show(store: &Store, config: &Config, user_id: Option<i64>, output: &Output) -> Result<()> {
    let counts = store.repository().counts(user_id)?;
    let location = store
        .path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(in memory)".to_string());

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "database": location,
                    "user_id": user_id,
                    "import_details": config.import.details.to_string(),
                    "counts": counts
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", counts.user_marks);
        }
        OutputFormat::Human => {
            println!("Nilai Status");
            println!("============");
            println!();
            println!("Storage:");
            println!("  Location: {}", location);
            println!();
            println!("Import:");
            println!(
                "  User:    {}",
                user_id
                    .map(|id| id.to_string())
                    .unwrap_or_else(|| "(not set)".to_string())
            );
            println!("  Details: {}", config.import.details);
            println!();
            println!("Contents:");
            println!("  Marks:      {}", counts.marks);
            println!("  User marks: {}", counts.user_marks);
            println!("  Labels:     {}", counts.labels);
            println!("  Tags:       {}", counts.tags);
        }
    }

    Ok(())
}

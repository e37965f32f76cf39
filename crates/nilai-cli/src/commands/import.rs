//! Import command handler

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use nilai_core::{import_export, ImportReport, ImportSettings, Store};

use crate::output::Output;

/// Import an export file for a user
pub fn run(
    store: &mut Store,
    path: &Path,
    user_id: i64,
    settings: ImportSettings,
    output: &Output,
) -> Result<()> {
    let report = import_file(store, path, user_id, settings)?;
    output.print_report(&report);
    Ok(())
}

fn import_file(
    store: &mut Store,
    path: &Path,
    user_id: i64,
    settings: ImportSettings,
) -> Result<ImportReport> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    info!("Importing {} for user {}", path.display(), user_id);

    import_export(BufReader::new(file), store, user_id, settings)
        .with_context(|| format!("Import of {} stopped", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.json");
        std::fs::write(
            &path,
            "{\n\"export\": {\"export_version\": 1},\n\"marks\": [\n{\"mark_id\": \"1\", \"url\": \"https://example.com\"}\n]\n}\n",
        )
        .unwrap();

        let mut store = Store::open_in_memory().unwrap();
        let report = import_file(&mut store, &path, 1, ImportSettings::default()).unwrap();
        assert_eq!(report.result.added, 1);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = Store::open_in_memory().unwrap();

        let err = import_file(
            &mut store,
            &dir.path().join("nope.json"),
            1,
            ImportSettings::default(),
        )
        .unwrap_err();
        assert!(err.to_string().starts_with("Failed to open"));
    }
}

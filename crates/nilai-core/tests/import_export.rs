use std::fs::{self, File};
use std::io::BufReader;

use nilai_core::{import_export, Classification, DetailMode, ImportSettings, MarkFilter, Store};

const EXPORT: &str = r##"{
"export": {"export_version": 1, "export_date": "2014-02-03 10:11:12", "marks_count": 3},
"marks": [
{"mark_id": "10", "created_on": "2013-05-01 08:00:00", "title": "Rust", "url": "https://www.rust-lang.org/", "active": "1", "label_id": "4", "label_name": "Read", "notes": "#rust #lang"},
{"mark_id": "11", "title": "", "url": "https://www.youtube.com/watch?v=abc", "active": "1", "label_id": "5", "label_name": "Nope"},
{"mark_id": "12", "title": "Broken", "url": "mailto:someone", "active": "1"}
]
}
"##;

#[test]
fn test_file_export_imported_twice() {
    let dir = tempfile::tempdir().unwrap();
    let export_path = dir.path().join("export.json");
    fs::write(&export_path, EXPORT).unwrap();

    let settings = ImportSettings {
        details: DetailMode::All,
    };
    let user_id = 7;

    let mut store = Store::open_path(&dir.path().join("nilai.db")).unwrap();
    let read = store.repository().create_label(None, "Read").unwrap();
    let watch = store.repository().create_label(None, "Watch").unwrap();
    store
        .repository()
        .create_smart_label(None, "youtube.com", watch.id)
        .unwrap();

    let first = import_export(
        BufReader::new(File::open(&export_path).unwrap()),
        &mut store,
        user_id,
        settings,
    )
    .unwrap();

    assert_eq!(first.result.added, 2);
    assert_eq!(first.result.failed, 1);
    assert_eq!(first.result.total, 3);
    let details = first.details.unwrap();
    assert_eq!(details["10"].result, Classification::Added);
    assert_eq!(
        details["11"].warnings,
        vec!["Label Nope not found. Stripped label info."]
    );
    assert_eq!(details["12"].result, Classification::Failed);

    let marks = store
        .repository()
        .user_marks(user_id, &MarkFilter::default())
        .unwrap();
    assert_eq!(marks.len(), 2);
    let rust = marks.iter().find(|m| m.title == "Rust").unwrap();
    assert_eq!(rust.label.as_deref(), Some(read.name.as_str()));
    assert_eq!(rust.tags, vec!["lang", "rust"]);
    let video = marks.iter().find(|m| m.url.contains("youtube")).unwrap();
    assert_eq!(video.label.as_deref(), Some("Watch"));
    assert_eq!(video.title, "No title");

    // A fresh store handle sees the same data and skips everything already there
    drop(store);
    let mut store = Store::open_path(&dir.path().join("nilai.db")).unwrap();
    let second = import_export(
        BufReader::new(File::open(&export_path).unwrap()),
        &mut store,
        user_id,
        settings,
    )
    .unwrap();

    assert_eq!(second.result.added, 0);
    assert_eq!(second.result.skipped, 2);
    assert_eq!(second.result.failed, 1);
    assert_eq!(store.repository().counts(Some(user_id)).unwrap().user_marks, 2);
}

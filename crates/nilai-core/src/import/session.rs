//! Line-driven import session
//!
//! A session is fed the lines of an export's marks array one at a time.
//! Every record line is decoded and imported immediately; the closing `]`
//! finishes the session and yields the report.
//!
//! ```text
//! AwaitingRecords --record line--> AwaitingRecords
//! AwaitingRecords --"]"----------> Done
//! ```

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::config::{DetailMode, ImportSettings};
use crate::import::importer::{RecordImporter, SessionMeta};
use crate::import::labels::{LabelResolver, UnlabeledCache};
use crate::import::record::{decode, is_terminator};
use crate::import::result::{ImportCounts, ImportReport, ImportResult};
use crate::import::ImportError;
use crate::store::Store;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitingRecords,
    Done,
}

/// What the caller should do after feeding a line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Keep feeding lines
    Continue,
    /// The marks array is closed; the session is finished
    Completed(ImportReport),
}

/// Import state for one export
pub struct ImportSession<'s> {
    store: &'s mut Store,
    meta: SessionMeta,
    details_mode: DetailMode,
    labels: LabelResolver,
    counts: ImportCounts,
    details: BTreeMap<String, ImportResult>,
    state: SessionState,
    lines: u64,
}

impl<'s> ImportSession<'s> {
    pub fn new(store: &'s mut Store, meta: SessionMeta, settings: ImportSettings) -> Self {
        Self {
            store,
            meta,
            details_mode: settings.details,
            labels: LabelResolver::new(),
            counts: ImportCounts::default(),
            details: BTreeMap::new(),
            state: SessionState::AwaitingRecords,
            lines: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn counts(&self) -> ImportCounts {
        self.counts
    }

    pub fn meta(&self) -> SessionMeta {
        self.meta
    }

    pub fn unlabeled_cache(&self) -> UnlabeledCache {
        self.labels.unlabeled_cache()
    }

    /// Feed one line of the marks array
    ///
    /// Blank lines are ignored. A record that cannot be decoded or stored is
    /// counted as failed; only an unusable database is returned as an error.
    pub fn process_line(&mut self, line: &str) -> Result<Step, ImportError> {
        if self.state == SessionState::Done {
            return Err(ImportError::SessionFinished);
        }

        if is_terminator(line) {
            self.state = SessionState::Done;
            info!(
                "Import finished for user {}: {} added, {} skipped, {} failed",
                self.meta.user_id, self.counts.added, self.counts.skipped, self.counts.failed
            );
            return Ok(Step::Completed(self.take_report()));
        }

        if line.trim().is_empty() {
            return Ok(Step::Continue);
        }

        self.lines += 1;
        let (key, result) = match decode(line) {
            Ok(record) => {
                let result = RecordImporter::new(&mut *self.store, self.meta, &mut self.labels)
                    .import(&record)?;
                (record.mark_id, result)
            }
            Err(e) => {
                warn!("Could not decode record {}: {}", self.lines, e);
                let key = e
                    .mark_id()
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("line-{}", self.lines));
                (key, ImportResult::from_decode_error(&e))
            }
        };

        debug!("Record {}: {:?}", key, result.result);
        self.counts.record(result.result);
        if self.keeps(&result) {
            self.details.insert(key, result);
        }

        Ok(Step::Continue)
    }

    fn keeps(&self, result: &ImportResult) -> bool {
        self.details_mode.enabled()
            && (!self.details_mode.errors_only() || result.is_failed() || result.has_warnings())
    }

    fn take_report(&mut self) -> ImportReport {
        let details = std::mem::take(&mut self.details);
        ImportReport {
            result: self.counts,
            details: self.details_mode.enabled().then_some(details),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::result::Classification;
    use crate::models::UNLABELED;

    const USER: i64 = 1;

    fn settings(details: DetailMode) -> ImportSettings {
        ImportSettings { details }
    }

    fn run(store: &mut Store, details: DetailMode, lines: &[&str]) -> ImportReport {
        let mut session = ImportSession::new(store, SessionMeta::new(1, USER), settings(details));
        for line in lines {
            match session.process_line(line).unwrap() {
                Step::Continue => assert!(session.counts().is_consistent()),
                Step::Completed(report) => return report,
            }
        }
        panic!("session did not complete");
    }

    #[test]
    fn test_terminator_first_yields_empty_report() {
        let mut store = Store::open_in_memory().unwrap();
        let report = run(&mut store, DetailMode::All, &["  ]  "]);

        assert_eq!(report.result, ImportCounts::default());
        assert_eq!(report.details, Some(BTreeMap::new()));
    }

    #[test]
    fn test_counts_every_record() {
        let mut store = Store::open_in_memory().unwrap();
        let report = run(
            &mut store,
            DetailMode::All,
            &[
                r#"{"mark_id":"1","url":"https://a.test"},"#,
                r#"{"mark_id":"2","url":"https://a.test"},"#,
                r#"{"mark_id":"3","url":"bogus"},"#,
                "{garbage",
                "]",
            ],
        );

        assert_eq!(
            report.result,
            ImportCounts {
                added: 1,
                skipped: 1,
                failed: 2,
                total: 4
            }
        );
        let details = report.details.unwrap();
        assert_eq!(details.len(), 4);
        assert_eq!(details["1"].result, Classification::Added);
        assert_eq!(details["2"].result, Classification::Skipped);
        assert_eq!(details["3"].errors[0].error_code, Some(crate::errors::INVALID_URL));
        assert_eq!(details["line-4"].errors[0].error_code, Some(crate::errors::INTERNAL));
    }

    #[test]
    fn test_errors_only_details() {
        let mut store = Store::open_in_memory().unwrap();
        let report = run(
            &mut store,
            DetailMode::Errors,
            &[
                r#"{"mark_id":"1","url":"https://a.test"},"#,
                r#"{"mark_id":"2","url":"https://b.test","label_id":"5","label_name":"Gone"},"#,
                r#"{"mark_id":"3"},"#,
                "]",
            ],
        );

        let details = report.details.unwrap();
        let keys: Vec<_> = details.keys().cloned().collect();
        assert_eq!(keys, vec!["2", "3"]);
        assert_eq!(details["2"].result, Classification::Added);
        assert_eq!(details["3"].result, Classification::Failed);
    }

    #[test]
    fn test_no_details() {
        let mut store = Store::open_in_memory().unwrap();
        let report = run(
            &mut store,
            DetailMode::None,
            &[r#"{"mark_id":"1"},"#, "]"],
        );
        assert_eq!(report.result.failed, 1);
        assert!(report.details.is_none());
    }

    #[test]
    fn test_blank_lines_ignored() {
        let mut store = Store::open_in_memory().unwrap();
        let report = run(
            &mut store,
            DetailMode::None,
            &["", r#"{"mark_id":"1","url":"https://a.test"}"#, "   ", "]"],
        );
        assert_eq!(report.result.total, 1);
    }

    #[test]
    fn test_process_after_done_is_an_error() {
        let mut store = Store::open_in_memory().unwrap();
        let mut session =
            ImportSession::new(&mut store, SessionMeta::new(1, USER), ImportSettings::default());

        assert!(matches!(session.process_line("]").unwrap(), Step::Completed(_)));
        assert_eq!(session.state(), SessionState::Done);
        assert!(matches!(
            session.process_line(r#"{"mark_id":"1","url":"https://a.test"}"#),
            Err(ImportError::SessionFinished)
        ));
        assert!(matches!(
            session.process_line("]"),
            Err(ImportError::SessionFinished)
        ));
    }

    #[test]
    fn test_unlabeled_lookup_cached_across_records() {
        let mut store = Store::open_in_memory().unwrap();
        let mut session =
            ImportSession::new(&mut store, SessionMeta::new(1, USER), settings(DetailMode::All));

        session
            .process_line(r#"{"mark_id":"1","url":"https://a.test","label_id":"5","label_name":"Gone"}"#)
            .unwrap();
        assert_eq!(session.unlabeled_cache(), UnlabeledCache::Missing);
        session
            .process_line(r#"{"mark_id":"2","url":"https://b.test","label_id":"5","label_name":"Gone"}"#)
            .unwrap();

        let Step::Completed(report) = session.process_line("]").unwrap() else {
            panic!("expected completion");
        };
        let details = report.details.unwrap();
        assert_eq!(details["1"].warnings, details["2"].warnings);
        assert_eq!(
            details["2"].warnings,
            vec!["Label Gone not found. Stripped label info."]
        );
    }

    #[test]
    fn test_cache_outlives_label_created_mid_session() {
        let mut store = Store::open_in_memory().unwrap();
        let mut session =
            ImportSession::new(&mut store, SessionMeta::new(1, USER), settings(DetailMode::All));

        session
            .process_line(r#"{"mark_id":"1","url":"https://a.test","label_id":"5","label_name":"Gone"}"#)
            .unwrap();
        session
            .store
            .repository()
            .create_label(Some(USER), UNLABELED)
            .unwrap();
        session
            .process_line(r#"{"mark_id":"2","url":"https://b.test","label_id":"5","label_name":"Gone"}"#)
            .unwrap();

        let Step::Completed(report) = session.process_line("]").unwrap() else {
            panic!("expected completion");
        };
        assert_eq!(
            report.details.unwrap()["2"].warnings,
            vec!["Label Gone not found. Stripped label info."]
        );
    }

    #[test]
    fn test_two_sessions_same_record() {
        let mut store = Store::open_in_memory().unwrap();
        let line = r#"{"mark_id":"1","url":"https://a.test"},"#;

        let first = run(&mut store, DetailMode::None, &[line, "]"]);
        let second = run(&mut store, DetailMode::None, &[line, "]"]);

        assert_eq!(first.result.added, 1);
        assert_eq!(second.result.skipped, 1);
        assert_eq!(second.result.total, 1);
    }

    #[test]
    fn test_unsupported_version_fails_every_record() {
        let mut store = Store::open_in_memory().unwrap();
        let mut session =
            ImportSession::new(&mut store, SessionMeta::new(3, USER), settings(DetailMode::All));

        session
            .process_line(r#"{"mark_id":"1","url":"https://a.test"}"#)
            .unwrap();
        let Step::Completed(report) = session.process_line("]").unwrap() else {
            panic!("expected completion");
        };

        assert_eq!(report.result.failed, 1);
        assert_eq!(
            report.details.unwrap()["1"].errors[0].error_message,
            "Invalid data format 3"
        );
        assert_eq!(store.repository().counts(None).unwrap().marks, 0);
    }
}

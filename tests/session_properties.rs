//! Property tests for the session invariants

use mockprep::anticheat::{AntiCheatMonitor, Severity, ViolationKind};
use mockprep::answers::{AnswerStore, NO_RESPONSE};
use mockprep::config::{AntiCheatConfig, Config};
use mockprep::error::StoreError;
use mockprep::finalizer::NoScreen;
use mockprep::loader::{LoadOutcome, SessionLoader};
use mockprep::results;
use mockprep::session::{Notice, Phase, SessionController, SessionEvent};
use mockprep::setup;
use mockprep::store::{
    ANSWERS_KEY, END_TIME_KEY, FileStore, MemoryStore, QUESTIONS_KEY, SESSION_KEYS, STARTED_KEY,
    SUBMISSION_KEY, SessionStore,
};
use proptest::prelude::*;
use std::collections::HashMap;

/// Counts writes of the submission record
#[derive(Default)]
struct CountingStore {
    inner: MemoryStore,
    submissions: usize,
}

impl SessionStore for CountingStore {
    fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        if key == SUBMISSION_KEY {
            self.submissions += 1;
        }
        self.inner.set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.inner.remove(key)
    }
}

fn kind_strategy() -> impl Strategy<Value = ViolationKind> {
    prop::sample::select(ViolationKind::ALL.to_vec())
}

fn event_strategy() -> impl Strategy<Value = SessionEvent> {
    prop_oneof![
        4 => Just(SessionEvent::Tick),
        3 => kind_strategy().prop_map(SessionEvent::Violation),
        1 => Just(SessionEvent::SubmitRequested),
        1 => Just(SessionEvent::AutoSubmitDue),
        1 => Just(SessionEvent::Acknowledge),
        2 => (0usize..8, "[a-z ]{0,6}")
            .prop_map(|(index, value)| SessionEvent::Answer { index, value }),
    ]
}

proptest! {
    #[test]
    fn test_violation_totals_step_by_one(kinds in prop::collection::vec(kind_strategy(), 0..30)) {
        let mut monitor = AntiCheatMonitor::new(AntiCheatConfig::default());
        monitor.enable();
        let mut last = 0;
        for kind in kinds {
            let v = monitor.record(kind).unwrap();
            prop_assert_eq!(v.total, last + 1);
            prop_assert_eq!(v.kind, kind);
            let expected = match v.total {
                1..=3 => Severity::Warning,
                4 => Severity::FinalWarning,
                _ => Severity::AutoSubmit,
            };
            prop_assert_eq!(v.severity, expected);
            last = v.total;
        }
        prop_assert_eq!(monitor.count(), last);
    }

    #[test]
    fn test_submission_happens_at_most_once(
        duration in 1u64..8,
        events in prop::collection::vec(event_strategy(), 0..60),
    ) {
        let mut store = CountingStore::default();
        setup::stage_sample(&mut store).unwrap();
        let mut config = Config::default();
        config.test.duration_secs = duration;
        let mut c = SessionController::new(store, NoScreen, &config);
        prop_assert!(c.load().unwrap().is_none());
        c.handle(SessionEvent::Acknowledge).unwrap();

        let mut submitted = 0;
        for event in events {
            let was_submitted = c.phase() == Phase::Submitted;
            let notice = c.handle(event).unwrap();
            if was_submitted {
                prop_assert_eq!(notice, Notice::Ignored);
                continue;
            }
            if let Notice::Submitted { record, .. } = notice {
                submitted += 1;
                prop_assert_eq!(record.answers.len(), 8);
                prop_assert!(record.attempt_duration <= duration);
            }
        }
        prop_assert!(submitted <= 1);
        prop_assert_eq!(c.store().submissions, submitted);
        prop_assert_eq!(c.is_submitted(), submitted == 1);
        if submitted == 1 {
            for key in SESSION_KEYS {
                prop_assert!(c.store().get(key).is_none());
            }
        }
    }

    #[test]
    fn test_stale_flag_always_clears(payload in ".{0,40}", answers in ".{0,10}") {
        let mut store = MemoryStore::new();
        store.set(QUESTIONS_KEY, &payload).unwrap();
        store.set(ANSWERS_KEY, &answers).unwrap();
        store.set(END_TIME_KEY, "2026-01-01T00:00:00Z").unwrap();
        store.set(STARTED_KEY, "true").unwrap();

        let outcome = SessionLoader::load(&mut store).unwrap();
        prop_assert!(matches!(outcome, LoadOutcome::Redirect(_)));
        prop_assert!(store.is_empty());
    }

    #[test]
    fn test_answer_overwrite_matches_model(
        writes in prop::collection::vec((0usize..6, "[a-z]{0,4}"), 0..40),
    ) {
        let mut answers = AnswerStore::new();
        let mut model = HashMap::new();
        for (index, value) in writes {
            answers.set(index, value.clone());
            model.insert(index, value);
        }
        let aligned = answers.aligned(6);
        for (i, slot) in aligned.iter().enumerate() {
            match model.get(&i) {
                Some(v) if !v.is_empty() => prop_assert_eq!(slot, v),
                _ => prop_assert_eq!(slot.as_str(), NO_RESPONSE),
            }
        }
    }
}

#[test]
fn test_record_round_trips_through_file_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");

    let mut store = FileStore::open(&path).unwrap();
    setup::stage_sample(&mut store).unwrap();
    let mut config = Config::default();
    config.test.difficulty = "advanced".into();
    let mut c = SessionController::new(store, NoScreen, &config);
    assert!(c.load().unwrap().is_none());
    c.handle(SessionEvent::Acknowledge).unwrap();
    c.handle(SessionEvent::Answer {
        index: 4,
        value: "HyperText Markup Language".into(),
    })
    .unwrap();
    for _ in 0..42 {
        c.handle(SessionEvent::Tick).unwrap();
    }
    let Notice::Submitted { record, .. } = c.handle(SessionEvent::SubmitRequested).unwrap() else {
        panic!("expected a submission");
    };

    let reopened = FileStore::open(&path).unwrap();
    let loaded = results::load(&reopened).unwrap().unwrap();
    assert_eq!(loaded, record);
    assert_eq!(loaded.attempt_duration, 42);
    assert_eq!(loaded.difficulty, "advanced");
    assert_eq!(results::answered(&loaded), 1);
    for key in SESSION_KEYS {
        assert!(reopened.get(key).is_none());
    }
}

//! Stages a question payload for the next attempt

use crate::error::SetupError;
use crate::question::{self, SAMPLE_PAYLOAD};
use crate::store::{self, QUESTIONS_KEY, STARTED_KEY, SessionStore};
use tracing::info;

/// Validate `raw` and make it the pending test. Returns the question count.
///
/// Nothing is written when the payload is rejected.
pub fn stage(store: &mut dyn SessionStore, raw: &str) -> Result<usize, SetupError> {
    let questions = question::parse_payload(raw).map_err(SetupError::Payload)?;

    store::clear_session(store)?;
    store.set(QUESTIONS_KEY, raw)?;
    store.set(STARTED_KEY, "false")?;

    info!(questions = questions.len(), "test staged");
    Ok(questions.len())
}

/// Stage the bundled sample test
pub fn stage_sample(store: &mut dyn SessionStore) -> Result<usize, SetupError> {
    stage(store, SAMPLE_PAYLOAD)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PayloadError;
    use crate::loader::{LoadOutcome, SessionLoader};
    use crate::store::{END_TIME_KEY, MemoryStore, SUBMISSION_KEY};

    #[test]
    fn test_stage_clears_previous_attempt() {
        let mut store = MemoryStore::new();
        store.set(STARTED_KEY, "true").unwrap();
        store.set(END_TIME_KEY, "2026-01-01T00:00:00Z").unwrap();
        store.set(SUBMISSION_KEY, "{}").unwrap();

        assert_eq!(stage_sample(&mut store).unwrap(), 8);
        assert_eq!(store.get(STARTED_KEY).as_deref(), Some("false"));
        assert!(!store.contains(END_TIME_KEY));
        // The previous submission belongs to the results flow
        assert!(store.contains(SUBMISSION_KEY));

        assert!(matches!(
            SessionLoader::load(&mut store).unwrap(),
            LoadOutcome::Ready(_)
        ));
    }

    #[test]
    fn test_rejected_payload_writes_nothing() {
        let mut store = MemoryStore::new();
        store.set(STARTED_KEY, "true").unwrap();

        let err = stage(&mut store, r#"{"questions":{"open_questions":[],"mcq":[]}}"#).unwrap_err();
        assert!(matches!(err, SetupError::Payload(PayloadError::Empty)));
        assert!(matches!(
            stage(&mut store, "not json").unwrap_err(),
            SetupError::Payload(PayloadError::Malformed(_))
        ));
        assert_eq!(store.get(STARTED_KEY).as_deref(), Some("true"));
        assert!(!store.contains(QUESTIONS_KEY));
    }
}

//! Submission finalizer - writes the handoff record and ends the session

use crate::answers::AnswerStore;
use crate::error::StoreError;
use crate::question::Question;
use crate::store::{self, SUBMISSION_KEY, SessionStore};
use crate::timer::Countdown;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use tracing::{debug, info};

/// Record consumed by the results/grading flow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRecord {
    pub questions: Vec<Question>,
    /// Index-aligned with `questions`
    pub answers: Vec<String>,
    /// Configured duration in seconds
    pub test_duration: u64,
    /// Seconds actually spent
    pub attempt_duration: u64,
    pub difficulty: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitReason {
    TimeUp,
    Violations,
    Manual,
}

impl fmt::Display for SubmitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitReason::TimeUp => write!(f, "time_up"),
            SubmitReason::Violations => write!(f, "violations"),
            SubmitReason::Manual => write!(f, "manual"),
        }
    }
}

/// Fullscreen control of whatever displays the test
pub trait Screen {
    fn is_fullscreen(&self) -> bool;
    fn enter_fullscreen(&mut self) -> io::Result<()>;
    fn exit_fullscreen(&mut self) -> io::Result<()>;
}

/// Screen that never goes fullscreen, for headless use
#[derive(Debug, Default)]
pub struct NoScreen;

impl Screen for NoScreen {
    fn is_fullscreen(&self) -> bool {
        false
    }

    fn enter_fullscreen(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn exit_fullscreen(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Everything the finalizer reads from the running session
pub struct SubmissionInput<'a> {
    pub questions: &'a [Question],
    pub answers: &'a AnswerStore,
    pub countdown: &'a Countdown,
    pub difficulty: &'a str,
}

/// First caller wins: effects run at most once per session
#[derive(Debug, Default)]
pub struct Finalizer {
    submitted: bool,
}

impl Finalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_submitted(&self) -> bool {
        self.submitted
    }

    /// Returns `Ok(None)` when the session was already submitted.
    pub fn finalize(
        &mut self,
        input: SubmissionInput<'_>,
        reason: SubmitReason,
        store: &mut dyn SessionStore,
        screen: &mut dyn Screen,
    ) -> Result<Option<SubmissionRecord>, StoreError> {
        if self.submitted {
            debug!(%reason, "duplicate submission suppressed");
            return Ok(None);
        }
        self.submitted = true;

        let record = SubmissionRecord {
            questions: input.questions.to_vec(),
            answers: input.answers.aligned(input.questions.len()),
            test_duration: input.countdown.duration(),
            attempt_duration: input.countdown.elapsed(),
            difficulty: input.difficulty.to_string(),
        };

        store.set(SUBMISSION_KEY, &serde_json::to_string(&record)?)?;
        store::clear_session(store)?;

        if screen.is_fullscreen() {
            if let Err(e) = screen.exit_fullscreen() {
                debug!(error = %e, "could not leave fullscreen");
            }
        }

        info!(
            %reason,
            attempt_secs = record.attempt_duration,
            answered = input.answers.answered_count(record.questions.len()),
            "test submitted"
        );
        Ok(Some(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::answers::NO_RESPONSE;
    use crate::store::{MemoryStore, SESSION_KEYS, STARTED_KEY};

    struct FlakyScreen {
        fullscreen: bool,
        exits: usize,
    }

    impl Screen for FlakyScreen {
        fn is_fullscreen(&self) -> bool {
            self.fullscreen
        }
        fn enter_fullscreen(&mut self) -> io::Result<()> {
            self.fullscreen = true;
            Ok(())
        }
        fn exit_fullscreen(&mut self) -> io::Result<()> {
            self.exits += 1;
            Err(io::Error::other("unsupported"))
        }
    }

    fn questions() -> Vec<Question> {
        vec![
            Question::Open { prompt: "o".into() },
            Question::Mcq {
                prompt: "m".into(),
                options: vec!["a".into(), "b".into()],
            },
        ]
    }

    #[test]
    fn test_finalize_once() {
        let questions = questions();
        let mut answers = AnswerStore::new();
        answers.set(1, "b");
        let mut countdown = Countdown::new(60);
        for _ in 0..15 {
            countdown.tick();
        }
        let mut store = MemoryStore::new();
        store.set(STARTED_KEY, "true").unwrap();
        let mut screen = FlakyScreen {
            fullscreen: true,
            exits: 0,
        };
        let mut finalizer = Finalizer::new();

        let input = || SubmissionInput {
            questions: &questions,
            answers: &answers,
            countdown: &countdown,
            difficulty: "easy",
        };

        let record = finalizer
            .finalize(input(), SubmitReason::Manual, &mut store, &mut screen)
            .unwrap()
            .unwrap();
        assert_eq!(record.answers, vec![NO_RESPONSE, "b"]);
        assert_eq!(record.test_duration, 60);
        assert_eq!(record.attempt_duration, 15);
        assert_eq!(record.difficulty, "easy");
        assert!(store.contains(SUBMISSION_KEY));
        for key in SESSION_KEYS {
            assert!(!store.contains(key));
        }
        // Fullscreen exit failure is swallowed
        assert_eq!(screen.exits, 1);

        store.remove(SUBMISSION_KEY).unwrap();
        let again = finalizer
            .finalize(input(), SubmitReason::TimeUp, &mut store, &mut screen)
            .unwrap();
        assert!(again.is_none());
        assert!(!store.contains(SUBMISSION_KEY));
        assert_eq!(screen.exits, 1);
    }

    #[test]
    fn test_record_wire_shape() {
        let record = SubmissionRecord {
            questions: questions(),
            answers: vec!["x".into(), NO_RESPONSE.into()],
            test_duration: 1800,
            attempt_duration: 10,
            difficulty: "intermediate".into(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["testDuration"], 1800);
        assert_eq!(json["attemptDuration"], 10);
        assert_eq!(json["questions"][1]["type"], "mcq");
        assert_eq!(json["answers"][1], NO_RESPONSE);
    }
}

//! Reads back the submission record left by the finalizer

use crate::answers::NO_RESPONSE;
use crate::error::ResultsError;
use crate::finalizer::SubmissionRecord;
use crate::question::Question;
use crate::store::{SUBMISSION_KEY, SessionStore};
use crate::timer::format_clock;
use std::fmt::Write;

/// `Ok(None)` when no attempt has been submitted yet
pub fn load(store: &dyn SessionStore) -> Result<Option<SubmissionRecord>, ResultsError> {
    match store.get(SUBMISSION_KEY) {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

pub fn answered(record: &SubmissionRecord) -> usize {
    record.answers.iter().filter(|a| a.as_str() != NO_RESPONSE).count()
}

/// Plain-text report of a submission
pub fn summary(record: &SubmissionRecord) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Mock test submission ({})", record.difficulty);
    let _ = writeln!(
        out,
        "Time used: {} of {}",
        format_clock(record.attempt_duration),
        format_clock(record.test_duration)
    );
    let _ = writeln!(
        out,
        "Answered: {} of {}",
        answered(record),
        record.questions.len()
    );

    for (i, question) in record.questions.iter().enumerate() {
        let answer = record.answers.get(i).map_or(NO_RESPONSE, String::as_str);
        let _ = writeln!(out);
        let _ = writeln!(out, "{}. {}", i + 1, question.prompt());
        if let Question::Mcq { options, .. } = question {
            let _ = writeln!(out, "   Options: {}", options.join(" | "));
        }
        for line in answer.lines() {
            let _ = writeln!(out, "   > {line}");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn record() -> SubmissionRecord {
        SubmissionRecord {
            questions: vec![
                Question::Open {
                    prompt: "Explain closures.".into(),
                },
                Question::Mcq {
                    prompt: "Pick one".into(),
                    options: vec!["A".into(), "B".into()],
                },
            ],
            answers: vec!["Functions with\ncaptured state".into(), NO_RESPONSE.into()],
            test_duration: 1800,
            attempt_duration: 75,
            difficulty: "advanced".into(),
        }
    }

    #[test]
    fn test_missing_record() {
        assert!(load(&MemoryStore::new()).unwrap().is_none());
    }

    #[test]
    fn test_malformed_record() {
        let mut store = MemoryStore::new();
        store.set(SUBMISSION_KEY, "{\"answers\": 3}").unwrap();
        assert!(matches!(load(&store), Err(ResultsError::Malformed(_))));
    }

    #[test]
    fn test_summary() {
        let text = summary(&record());
        assert!(text.starts_with("Mock test submission (advanced)"));
        assert!(text.contains("Time used: 01:15 of 30:00"));
        assert!(text.contains("Answered: 1 of 2"));
        assert!(text.contains("   > captured state"));
        assert!(text.contains("   Options: A | B"));
        assert!(text.contains("2. Pick one\n   Options: A | B\n   > no response"));
    }
}

//! Answer store - current response per question index

use std::collections::BTreeMap;

/// Placeholder recorded for questions left unanswered at submission
pub const NO_RESPONSE: &str = "no response";

#[derive(Debug, Default, Clone)]
pub struct AnswerStore {
    answers: BTreeMap<usize, String>,
}

impl AnswerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the answer for `index`. No history is kept.
    pub fn set(&mut self, index: usize, value: impl Into<String>) {
        self.answers.insert(index, value.into());
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.answers.get(&index).map(String::as_str)
    }

    /// A blank answer counts as unanswered
    pub fn is_answered(&self, index: usize) -> bool {
        self.get(index).is_some_and(|a| !a.trim().is_empty())
    }

    pub fn answered_count(&self, len: usize) -> usize {
        (0..len).filter(|&i| self.is_answered(i)).count()
    }

    /// Answers aligned to `len` questions, unanswered slots holding [`NO_RESPONSE`]
    pub fn aligned(&self, len: usize) -> Vec<String> {
        (0..len)
            .map(|i| match self.get(i) {
                Some(a) if !a.trim().is_empty() => a.to_string(),
                _ => NO_RESPONSE.to_string(),
            })
            .collect()
    }
}

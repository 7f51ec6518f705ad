//! Questions and the pending-test payload they are loaded from

use crate::error::PayloadError;
use serde::{Deserialize, Serialize};

/// Payload bundled for `setup --sample`
pub const SAMPLE_PAYLOAD: &str = include_str!("../assets/sample_questions.json");

/// A single test question, immutable once loaded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Question {
    Open {
        #[serde(rename = "text")]
        prompt: String,
    },
    Mcq {
        #[serde(rename = "text")]
        prompt: String,
        options: Vec<String>,
    },
}

impl Question {
    pub fn prompt(&self) -> &str {
        match self {
            Question::Open { prompt } | Question::Mcq { prompt, .. } => prompt,
        }
    }

    /// Options of a multiple-choice question, empty for open ones
    pub fn options(&self) -> &[String] {
        match self {
            Question::Open { .. } => &[],
            Question::Mcq { options, .. } => options,
        }
    }

    pub fn is_mcq(&self) -> bool {
        matches!(self, Question::Mcq { .. })
    }
}

// ============================================================================
// Payload
// ============================================================================

#[derive(Debug, Deserialize)]
struct Payload {
    questions: PayloadQuestions,
}

#[derive(Debug, Deserialize)]
struct PayloadQuestions {
    #[serde(default)]
    open_questions: Vec<String>,
    #[serde(default)]
    mcq: Vec<PayloadMcq>,
}

#[derive(Debug, Deserialize)]
struct PayloadMcq {
    question: String,
    options: Vec<String>,
}

/// Parse a payload into the flat question order: open questions first, then
/// multiple-choice, each group in source order.
pub fn parse_payload(raw: &str) -> Result<Vec<Question>, PayloadError> {
    let payload: Payload = serde_json::from_str(raw)?;
    let PayloadQuestions { open_questions, mcq } = payload.questions;

    let questions: Vec<Question> = open_questions
        .into_iter()
        .map(|prompt| Question::Open { prompt })
        .chain(mcq.into_iter().map(|q| Question::Mcq {
            prompt: q.question,
            options: q.options,
        }))
        .collect();

    if questions.is_empty() {
        return Err(PayloadError::Empty);
    }
    Ok(questions)
}

//! Events that can occur in a conversation

use crate::gateway::{AnswerResult, ClassificationResult, RequestError};

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    // User events
    SubmitText {
        text: String,
    },
    SelectCategory {
        category: String,
        subcategory: Option<String>,
    },
    Rate {
        satisfied: bool,
    },
    Clarify,
    AskNew,
    Restart,
    ProfileUpdated,

    // Gateway completions, tagged with the generation they were issued under
    ClassificationReady {
        generation: u64,
        result: ClassificationResult,
    },
    ClassificationFailed {
        generation: u64,
        error: RequestError,
    },
    AnswerReady {
        generation: u64,
        answer: AnswerResult,
    },
    AnswerFailed {
        generation: u64,
        error: RequestError,
    },
}

impl Event {
    /// Generation of a gateway completion; `None` for user events
    pub fn completion_generation(&self) -> Option<u64> {
        match self {
            Event::ClassificationReady { generation, .. }
            | Event::ClassificationFailed { generation, .. }
            | Event::AnswerReady { generation, .. }
            | Event::AnswerFailed { generation, .. } => Some(*generation),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Event::SubmitText { .. } => "submit_text",
            Event::SelectCategory { .. } => "select_category",
            Event::Rate { .. } => "rate",
            Event::Clarify => "clarify",
            Event::AskNew => "ask_new",
            Event::Restart => "restart",
            Event::ProfileUpdated => "profile_updated",
            Event::ClassificationReady { .. } => "classification_ready",
            Event::ClassificationFailed { .. } => "classification_failed",
            Event::AnswerReady { .. } => "answer_ready",
            Event::AnswerFailed { .. } => "answer_failed",
        }
    }
}

//! Effects produced by state transitions

use crate::gateway::AnswerRequest;
use serde_json::{json, Value};

/// Effects to be executed after a state transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Persist the new state
    PersistState,

    /// Classify the current question (spawns as background task)
    RequestClassification { question: String, generation: u64 },

    /// Ask the answer service (spawns as background task)
    RequestAnswer {
        request: AnswerRequest,
        generation: u64,
    },

    /// Notify connected clients
    NotifyClient { event_type: String, data: Value },
}

impl Effect {
    pub fn notify_request_failed(stage: &str, kind: &str, message: &str) -> Self {
        Effect::NotifyClient {
            event_type: "request_failed".to_string(),
            data: json!({ "stage": stage, "kind": kind, "message": message }),
        }
    }

    pub fn notify_reset(generation: u64) -> Self {
        Effect::NotifyClient {
            event_type: "conversation_reset".to_string(),
            data: json!({ "generation": generation }),
        }
    }
}

//! Conversation state types

use super::messages;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Stage
// ============================================================================

/// Where the dialogue currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Waiting for a new question
    #[default]
    AskQuestion,
    /// Classifier call in flight
    Classifying,
    /// Classifier was not confident, user must pick a category
    ChooseCategory,
    /// Answer call in flight
    WaitingModel,
    /// Answer (or error) shown, waiting for a rating
    RateAnswer,
    /// User was not satisfied, offered clarify or new question
    AfterNegative,
    /// Waiting for a clarification of the current question
    ClarifyQuestion,
}

impl Stage {
    /// Free text is only accepted while asking or clarifying
    pub fn accepts_text(self) -> bool {
        matches!(self, Stage::AskQuestion | Stage::ClarifyQuestion)
    }

    /// A gateway call is outstanding
    pub fn is_in_flight(self) -> bool {
        matches!(self, Stage::Classifying | Stage::WaitingModel)
    }
}

// ============================================================================
// Messages
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Bot,
    User,
    System,
}

/// One chat message. Never mutated after it is appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: u64,
    pub role: Role,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    /// Transient "processing" marker, removed when the result arrives
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub placeholder: bool,
}

// ============================================================================
// Conversation State
// ============================================================================

/// Full dialogue state for one session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    #[serde(default)]
    pub stage: Stage,
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub category: Option<String>,
    /// Only meaningful while `category` is set
    #[serde(default)]
    pub subcategory_id: Option<String>,
    #[serde(default)]
    pub history: Vec<ChatMessage>,
    #[serde(default)]
    pub satisfied: Option<bool>,
    /// Classifier object forwarded to the answer service
    #[serde(default)]
    pub classification_filter: Option<Value>,
    /// Bumped on every reset; completions from older generations are dropped
    #[serde(default)]
    pub generation: u64,
    #[serde(default = "first_message_id")]
    pub next_message_id: u64,
}

fn first_message_id() -> u64 {
    1
}

impl ConversationState {
    /// Fresh conversation with the greeting
    pub fn new(now: DateTime<Utc>) -> Self {
        let mut state = Self::blank(0, first_message_id());
        state.push(Role::Bot, messages::GREETING, now);
        state
    }

    fn blank(generation: u64, next_message_id: u64) -> Self {
        Self {
            stage: Stage::AskQuestion,
            question: String::new(),
            category: None,
            subcategory_id: None,
            history: Vec::new(),
            satisfied: None,
            classification_filter: None,
            generation,
            next_message_id,
        }
    }

    /// Start over: everything cleared, new generation, new greeting.
    /// Message ids keep counting so they stay unique for the session.
    pub fn reset(&self, now: DateTime<Utc>) -> Self {
        let mut state = Self::blank(self.generation + 1, self.next_message_id);
        state.push(Role::Bot, messages::GREETING, now);
        state
    }

    pub fn push(&mut self, role: Role, text: impl Into<String>, now: DateTime<Utc>) {
        self.append(role, text.into(), now, false);
    }

    pub fn push_placeholder(&mut self, now: DateTime<Utc>) {
        self.append(Role::Bot, messages::PROCESSING.to_string(), now, true);
    }

    fn append(&mut self, role: Role, text: String, now: DateTime<Utc>, placeholder: bool) {
        let id = self.next_message_id;
        self.next_message_id += 1;
        self.history.push(ChatMessage {
            id,
            role,
            text,
            timestamp: now,
            placeholder,
        });
    }

    /// Delete the processing placeholder, if any
    pub fn remove_placeholder(&mut self) {
        self.history.retain(|m| !m.placeholder);
    }

    /// Set the category; a new category always clears the subcategory
    pub fn set_category(&mut self, category: impl Into<String>, subcategory_id: Option<String>) {
        self.category = Some(category.into());
        self.subcategory_id = subcategory_id;
    }

    pub fn clear_category(&mut self) {
        self.category = None;
        self.subcategory_id = None;
    }

    pub fn input_enabled(&self) -> bool {
        self.stage.accepts_text()
    }

    /// Normalize a state loaded from storage.
    ///
    /// A call that was in flight when the process stopped will never complete,
    /// so the dialogue falls back to asking again under a new generation.
    pub fn restored(mut self, now: DateTime<Utc>) -> Self {
        if !self.stage.is_in_flight() {
            return self;
        }
        self.remove_placeholder();
        self.stage = Stage::AskQuestion;
        self.question.clear();
        self.clear_category();
        self.classification_filter = None;
        self.generation += 1;
        self.push(Role::System, messages::INTERRUPTED, now);
        self
    }
}

// ============================================================================
// Context
// ============================================================================

/// How classifier output decides whether the user picks a category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryMode {
    /// Accept a confident category, ask otherwise
    #[default]
    ConfidenceGated,
    /// Always ask the user to pick
    ManualOnly,
}

/// Immutable per-session configuration
#[derive(Debug, Clone)]
pub struct DialogueContext {
    pub session_key: String,
    pub category_mode: CategoryMode,
}

impl DialogueContext {
    pub fn new(session_key: impl Into<String>, category_mode: CategoryMode) -> Self {
        Self {
            session_key: session_key.into(),
            category_mode,
        }
    }
}

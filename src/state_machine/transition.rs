//! Pure state transition function
//!
//! Given the same state, context, snapshot and event, `transition` always
//! produces the same result. All I/O is expressed as [`Effect`]s.

use super::categories::find_category;
use super::messages;
use super::state::{CategoryMode, ConversationState, DialogueContext, Role, Stage};
use super::{Effect, Event};
use crate::gateway::{
    merge_manual_pick, AnswerRequest, ClassifierVerdict, HistoryTurn, RequestError,
    ValidationError,
};
use crate::profile::UserProfile;
use chrono::{DateTime, Utc};
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

/// Longest question or clarification accepted, in chars
pub const MAX_INPUT_CHARS: usize = 2000;

static CONTROL_CHARS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\x00-\x1F\x7F-\x9F]").expect("valid control char regex")
});
static HTML_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid html tag regex"));

/// Outside world as observed right before the transition
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub profile: UserProfile,
    pub now: DateTime<Utc>,
}

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: ConversationState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: ConversationState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Errors that can occur during transition. None of them change state.
#[derive(Debug, Error, PartialEq)]
pub enum TransitionError {
    #[error("Text input is disabled while {0:?}")]
    InputDisabled(Stage),
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
    #[error("Completion from generation {generation} is stale (current {current}, stage {stage:?})")]
    StaleCompletion {
        generation: u64,
        current: u64,
        stage: Stage,
    },
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Trim, strip control characters and HTML tags, cap the length
pub fn sanitize_input(raw: &str) -> Result<String, ValidationError> {
    let without_controls = CONTROL_CHARS_RE.replace_all(raw, "");
    let without_tags = HTML_TAG_RE.replace_all(&without_controls, "");
    let cleaned: String = without_tags.trim().chars().take(MAX_INPUT_CHARS).collect();
    let cleaned = cleaned.trim_end().to_string();
    if cleaned.is_empty() {
        return Err(ValidationError::EmptyQuestion);
    }
    Ok(cleaned)
}

/// Pure transition function
#[allow(clippy::too_many_lines)] // One arm per dialogue rule
pub fn transition(
    state: &ConversationState,
    context: &DialogueContext,
    snapshot: &Snapshot,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    if let Some(generation) = event.completion_generation() {
        if generation != state.generation {
            return Err(TransitionError::StaleCompletion {
                generation,
                current: state.generation,
                stage: state.stage,
            });
        }
    }

    let now = snapshot.now;
    let mut next = state.clone();

    match (state.stage, event) {
        // ============================================================
        // Available everywhere
        // ============================================================
        (_, Event::Restart) => Ok(reset(state, now)),

        (_, Event::ProfileUpdated) => {
            next.push(Role::Bot, messages::PROFILE_UPDATED, now);
            Ok(TransitionResult::new(next).with_effect(Effect::PersistState))
        }

        // ============================================================
        // Free text
        // ============================================================

        // AskQuestion + text -> Classifying
        (Stage::AskQuestion, Event::SubmitText { text }) => {
            let question = sanitize_input(&text)?;
            next.push(Role::User, question.clone(), now);
            next.question.clone_from(&question);
            next.clear_category();
            next.classification_filter = None;
            next.satisfied = None;
            next.stage = Stage::Classifying;
            let generation = next.generation;
            Ok(TransitionResult::new(next)
                .with_effect(Effect::PersistState)
                .with_effect(Effect::RequestClassification {
                    question,
                    generation,
                }))
        }

        // ClarifyQuestion + text -> WaitingModel, without classifying again
        (Stage::ClarifyQuestion, Event::SubmitText { text }) => {
            let clarification = sanitize_input(&text)?;
            next.push(Role::User, clarification.clone(), now);
            next.question = format!(
                "{}{}{}",
                state.question,
                messages::CLARIFICATION_SEPARATOR,
                clarification
            );
            next.satisfied = None;
            Ok(enter_waiting_model(next, snapshot))
        }

        (stage, Event::SubmitText { .. }) => Err(TransitionError::InputDisabled(stage)),

        // ============================================================
        // Classification
        // ============================================================
        (Stage::Classifying, Event::ClassificationReady { result, .. }) => {
            match (result.verdict(), context.category_mode) {
                (ClassifierVerdict::Inappropriate, _) => {
                    next.push(Role::Bot, messages::INAPPROPRIATE, now);
                    next.question.clear();
                    next.classification_filter = None;
                    next.stage = Stage::AskQuestion;
                    Ok(TransitionResult::new(next).with_effect(Effect::PersistState))
                }
                (ClassifierVerdict::Accepted { category, .. }, CategoryMode::ConfidenceGated) => {
                    next.classification_filter = Some(result.raw);
                    next.push(Role::Bot, messages::category_detected(&category), now);
                    next.set_category(category, None);
                    Ok(enter_waiting_model(next, snapshot))
                }
                (ClassifierVerdict::Accepted { .. } | ClassifierVerdict::NeedsManualPick, _) => {
                    next.classification_filter = Some(result.raw);
                    next.push(Role::Bot, messages::CHOOSE_CATEGORY, now);
                    next.stage = Stage::ChooseCategory;
                    Ok(TransitionResult::new(next).with_effect(Effect::PersistState))
                }
            }
        }

        (Stage::Classifying, Event::ClassificationFailed { error, .. }) => {
            Ok(fail_to_rating(next, Stage::Classifying, &error, now))
        }

        // ============================================================
        // Manual category pick
        // ============================================================
        (
            Stage::ChooseCategory,
            Event::SelectCategory {
                category,
                subcategory,
            },
        ) => {
            let category = category.trim();
            let Some(entry) = find_category(category) else {
                return Err(ValidationError::UnknownCategory(category.to_string()).into());
            };
            let subcategory = match subcategory.as_deref().map(str::trim) {
                None | Some("") => None,
                Some(id) => Some(entry.subcategory(id).ok_or_else(|| {
                    ValidationError::UnknownSubcategory {
                        category: category.to_string(),
                        subcategory: id.to_string(),
                    }
                })?),
            };
            next.classification_filter = Some(merge_manual_pick(
                state.classification_filter.as_ref(),
                category,
                subcategory.map(|s| s.id),
            ));
            let confirmation = match subcategory {
                Some(sub) => messages::subcategory_detected(category, sub.title),
                None => messages::category_detected(category),
            };
            next.push(Role::Bot, confirmation, now);
            next.set_category(category, subcategory.map(|s| s.id.to_string()));
            Ok(enter_waiting_model(next, snapshot))
        }

        // ============================================================
        // Answer
        // ============================================================
        (Stage::WaitingModel, Event::AnswerReady { answer, .. }) => {
            next.remove_placeholder();
            next.push(Role::Bot, answer.render(), now);
            next.push(Role::Bot, messages::SATISFACTION_PROMPT, now);
            next.stage = Stage::RateAnswer;
            Ok(TransitionResult::new(next).with_effect(Effect::PersistState))
        }

        (Stage::WaitingModel, Event::AnswerFailed { error, .. }) => {
            Ok(fail_to_rating(next, Stage::WaitingModel, &error, now))
        }

        // ============================================================
        // Rating and follow-up
        // ============================================================
        (Stage::RateAnswer, Event::Rate { satisfied: true }) => {
            next.push(Role::User, messages::USER_SATISFIED, now);
            next.push(Role::Bot, messages::THANKS, now);
            next.satisfied = Some(true);
            Ok(reset(&next, now))
        }

        (Stage::RateAnswer, Event::Rate { satisfied: false }) => {
            next.push(Role::User, messages::USER_NOT_SATISFIED, now);
            next.satisfied = Some(false);
            next.stage = Stage::AfterNegative;
            Ok(TransitionResult::new(next).with_effect(Effect::PersistState))
        }

        (Stage::AfterNegative, Event::Clarify) => {
            next.push(Role::Bot, messages::CLARIFY_PROMPT, now);
            next.stage = Stage::ClarifyQuestion;
            Ok(TransitionResult::new(next).with_effect(Effect::PersistState))
        }

        (Stage::AfterNegative, Event::AskNew) => {
            next.push(Role::Bot, messages::THANKS, now);
            Ok(reset(&next, now))
        }

        // ============================================================
        // Completions the current stage is not waiting for
        // ============================================================
        (
            stage,
            Event::ClassificationReady { generation, .. }
            | Event::ClassificationFailed { generation, .. }
            | Event::AnswerReady { generation, .. }
            | Event::AnswerFailed { generation, .. },
        ) => Err(TransitionError::StaleCompletion {
            generation,
            current: state.generation,
            stage,
        }),

        (stage, event) => Err(TransitionError::InvalidTransition(format!(
            "{} is not available while {stage:?}",
            event.name()
        ))),
    }
}

fn reset(state: &ConversationState, now: DateTime<Utc>) -> TransitionResult {
    let next = state.reset(now);
    let generation = next.generation;
    TransitionResult::new(next)
        .with_effect(Effect::PersistState)
        .with_effect(Effect::notify_reset(generation))
}

/// Every way into `WaitingModel` goes through here.
///
/// Without campus and level in the profile no request is issued and the
/// dialogue goes back to asking.
fn enter_waiting_model(mut next: ConversationState, snapshot: &Snapshot) -> TransitionResult {
    let now = snapshot.now;
    if snapshot.profile.answer_filters().is_err() {
        next.push(Role::Bot, messages::INCOMPLETE_PROFILE, now);
        next.stage = Stage::AskQuestion;
        return TransitionResult::new(next).with_effect(Effect::PersistState);
    }

    let request = AnswerRequest {
        question: next.question.clone(),
        category_filter: next.classification_filter.clone(),
        profile: snapshot.profile.clone(),
        history: history_turns(&next),
    };
    next.push_placeholder(now);
    next.stage = Stage::WaitingModel;
    let generation = next.generation;
    TransitionResult::new(next)
        .with_effect(Effect::PersistState)
        .with_effect(Effect::RequestAnswer {
            request,
            generation,
        })
}

/// Prior user and bot turns, oldest first
fn history_turns(state: &ConversationState) -> Vec<HistoryTurn> {
    state
        .history
        .iter()
        .filter(|m| !m.placeholder)
        .filter_map(|m| {
            let role = match m.role {
                Role::User => "user",
                Role::Bot => "bot",
                Role::System => return None,
            };
            Some(HistoryTurn {
                role: role.to_string(),
                text: m.text.clone(),
            })
        })
        .collect()
}

fn fail_to_rating(
    mut next: ConversationState,
    stage: Stage,
    error: &RequestError,
    now: DateTime<Utc>,
) -> TransitionResult {
    next.remove_placeholder();
    next.push(Role::Bot, messages::REQUEST_FAILED, now);
    next.push(Role::Bot, messages::SATISFACTION_PROMPT, now);
    next.stage = Stage::RateAnswer;
    let stage = match stage {
        Stage::Classifying => "classifying",
        _ => "waiting_model",
    };
    TransitionResult::new(next)
        .with_effect(Effect::PersistState)
        .with_effect(Effect::notify_request_failed(
            stage,
            error.kind(),
            &error.to_string(),
        ))
}

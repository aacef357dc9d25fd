//! Property-based tests for the dialogue state machine
//!
//! Random action sequences are driven through `transition` from a fresh
//! conversation. After every step the invariants must hold:
//! - free text is accepted only while asking or clarifying
//! - a subcategory never outlives its category
//! - message ids strictly increase
//! - a placeholder exists exactly while waiting for the answer service
//! - an answer request is only emitted for a complete profile
//! - rejected events leave the state untouched
//! - completions from another generation are always dropped

#![allow(clippy::single_match_else)]

use super::categories::MANUAL_CATEGORIES;
use super::state::*;
use super::transition::*;
use super::*;
use crate::gateway::{AnswerResult, ClassificationResult, RequestError};
use crate::profile::{Campus, EducationLevel, UserProfile};
use chrono::Utc;
use proptest::prelude::*;
use serde_json::json;

// ============================================================================
// Test Helpers
// ============================================================================

/// Abstract action, turned into an [`Event`] against the current state
#[derive(Debug, Clone)]
enum Action {
    Submit(String),
    Select(usize),
    Rate(bool),
    Clarify,
    AskNew,
    Restart,
    ProfileUpdated,
    Classified {
        category: Option<usize>,
        confidence: f64,
        inappropriate: bool,
        stale: bool,
    },
    ClassifyFailed {
        stale: bool,
    },
    Answered {
        text: String,
        stale: bool,
    },
    AnswerFailed {
        stale: bool,
    },
}

fn generation_for(state: &ConversationState, stale: bool) -> u64 {
    if stale {
        state.generation + 1
    } else {
        state.generation
    }
}

fn to_event(state: &ConversationState, action: Action) -> Event {
    match action {
        Action::Submit(text) => Event::SubmitText { text },
        Action::Select(i) => {
            let category = &MANUAL_CATEGORIES[i % MANUAL_CATEGORIES.len()];
            let subs = category.subcategories;
            Event::SelectCategory {
                category: category.id.to_string(),
                subcategory: subs.get(i % (subs.len() + 1)).map(|s| s.id.to_string()),
            }
        }
        Action::Rate(satisfied) => Event::Rate { satisfied },
        Action::Clarify => Event::Clarify,
        Action::AskNew => Event::AskNew,
        Action::Restart => Event::Restart,
        Action::ProfileUpdated => Event::ProfileUpdated,
        Action::Classified {
            category,
            confidence,
            inappropriate,
            stale,
        } => {
            let category = category.map(|i| MANUAL_CATEGORIES[i % MANUAL_CATEGORIES.len()].id);
            let body = json!({
                "predicted_category": category,
                "confidence": confidence,
                "is_inappropriate": inappropriate,
            });
            Event::ClassificationReady {
                generation: generation_for(state, stale),
                result: ClassificationResult::from_response(body).unwrap(),
            }
        }
        Action::ClassifyFailed { stale } => Event::ClassificationFailed {
            generation: generation_for(state, stale),
            error: RequestError::Network("down".into()),
        },
        Action::Answered { text, stale } => Event::AnswerReady {
            generation: generation_for(state, stale),
            answer: AnswerResult {
                answer_text: text,
                links: vec![],
            },
        },
        Action::AnswerFailed { stale } => Event::AnswerFailed {
            generation: generation_for(state, stale),
            error: RequestError::UpstreamContent("Network error".into()),
        },
    }
}

fn complete_profile() -> UserProfile {
    UserProfile::new("Ivan", Campus::Perm, EducationLevel::Master)
}

fn check_invariants(state: &ConversationState) -> Result<(), TestCaseError> {
    if state.category.is_none() {
        prop_assert!(state.subcategory_id.is_none());
    }
    for pair in state.history.windows(2) {
        prop_assert!(pair[0].id < pair[1].id, "ids must increase");
    }
    prop_assert!(state.history.iter().all(|m| m.id < state.next_message_id));
    let placeholders = state.history.iter().filter(|m| m.placeholder).count();
    let expected = usize::from(state.stage == Stage::WaitingModel);
    prop_assert_eq!(placeholders, expected, "placeholder in {:?}", state.stage);
    prop_assert_eq!(state.input_enabled(), state.stage.accepts_text());
    Ok(())
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_action() -> impl Strategy<Value = Action> {
    prop_oneof![
        3 => "[a-zA-Z <>]{0,20}".prop_map(Action::Submit),
        1 => (0usize..40).prop_map(Action::Select),
        2 => any::<bool>().prop_map(Action::Rate),
        1 => Just(Action::Clarify),
        1 => Just(Action::AskNew),
        1 => Just(Action::Restart),
        1 => Just(Action::ProfileUpdated),
        3 => (
            proptest::option::of(0usize..20),
            prop_oneof![Just(0.0), 0.0f64..1.0],
            proptest::bool::weighted(0.15),
            proptest::bool::weighted(0.2),
        )
            .prop_map(|(category, confidence, inappropriate, stale)| Action::Classified {
                category,
                confidence,
                inappropriate,
                stale,
            }),
        1 => proptest::bool::weighted(0.2).prop_map(|stale| Action::ClassifyFailed { stale }),
        3 => ("[a-zA-Z ]{1,20}", proptest::bool::weighted(0.2))
            .prop_map(|(text, stale)| Action::Answered { text, stale }),
        1 => proptest::bool::weighted(0.2).prop_map(|stale| Action::AnswerFailed { stale }),
    ]
}

fn arb_mode() -> impl Strategy<Value = CategoryMode> {
    prop_oneof![Just(CategoryMode::ConfidenceGated), Just(CategoryMode::ManualOnly)]
}

fn arb_profile() -> impl Strategy<Value = UserProfile> {
    prop_oneof![
        3 => Just(complete_profile()),
        1 => Just(UserProfile::default()),
        1 => Just(UserProfile {
            name: "Anna".into(),
            campus: Some(Campus::Moscow),
            level: None,
        }),
    ]
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn prop_invariants_hold_over_random_dialogues(
        mode in arb_mode(),
        profile in arb_profile(),
        actions in proptest::collection::vec(arb_action(), 1..40),
    ) {
        let context = DialogueContext::new("prop", mode);
        let snapshot = Snapshot { profile, now: Utc::now() };
        let mut state = ConversationState::new(snapshot.now);
        check_invariants(&state)?;

        for action in actions {
            let event = to_event(&state, action);
            let is_text = matches!(event, Event::SubmitText { .. });
            let stale = event
                .completion_generation()
                .is_some_and(|g| g != state.generation);

            match transition(&state, &context, &snapshot, event) {
                Ok(result) => {
                    prop_assert!(!stale, "stale completion accepted");
                    if is_text {
                        prop_assert!(state.stage.accepts_text());
                    }
                    for effect in &result.effects {
                        if let Effect::RequestAnswer { request, generation } = effect {
                            prop_assert!(snapshot.profile.answer_filters().is_ok());
                            prop_assert_eq!(*generation, result.new_state.generation);
                            prop_assert!(!request.question.is_empty());
                        }
                    }
                    prop_assert!(result.new_state.generation >= state.generation);
                    check_invariants(&result.new_state)?;
                    state = result.new_state;
                }
                Err(TransitionError::InputDisabled(stage)) => {
                    prop_assert_eq!(stage, state.stage);
                    prop_assert!(!stage.accepts_text());
                }
                Err(_) => {}
            }
        }
    }

    #[test]
    fn prop_manual_only_never_auto_accepts(
        confidence in 0.0f64..=1.0,
        category in 0usize..20,
    ) {
        let context = DialogueContext::new("prop", CategoryMode::ManualOnly);
        let snapshot = Snapshot { profile: complete_profile(), now: Utc::now() };
        let s0 = ConversationState::new(snapshot.now);
        let s1 = transition(&s0, &context, &snapshot, Event::SubmitText { text: "q".into() })
            .unwrap()
            .new_state;
        let event = to_event(&s1, Action::Classified {
            category: Some(category),
            confidence,
            inappropriate: false,
            stale: false,
        });
        let result = transition(&s1, &context, &snapshot, event).unwrap();
        prop_assert_eq!(result.new_state.stage, Stage::ChooseCategory);
    }

    #[test]
    fn prop_sanitized_input_is_bounded_and_tag_free(raw in "[a-zA-Z0-9 <>/\\t\\n]{0,3000}") {
        match sanitize_input(&raw) {
            Ok(clean) => {
                prop_assert!(!clean.is_empty());
                prop_assert!(clean.chars().count() <= MAX_INPUT_CHARS);
                prop_assert!(!clean.chars().any(char::is_control));
                prop_assert_eq!(clean.trim(), clean.as_str());
            }
            Err(e) => prop_assert_eq!(e, crate::gateway::ValidationError::EmptyQuestion),
        }
    }
}

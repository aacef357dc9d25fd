//! Property-based tests for the gateway layer
//!
//! - Backoff stays within `[min(cap, 2^k * base), cap]`
//! - Answer parsing never panics and yields trimmed text
//! - Extracted links are unique and well-formed
//! - Classification normalization keeps confidence in [0, 1]

use super::answer::{extract_links, parse_answer_text, FINAL_ANSWER_MARKER};
use super::backoff::{delay_ms, MAX_DELAY_MS};
use super::classifier::ClassificationResult;
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::json;
use std::collections::HashSet;

// ============================================================================
// Strategies
// ============================================================================

fn arb_url() -> impl Strategy<Value = String> {
    (prop_oneof![Just("http"), Just("https")], "[a-z]{1,8}", "[a-z0-9/]{0,10}")
        .prop_map(|(scheme, host, path)| format!("{scheme}://{host}.edu/{path}"))
}

/// Free text sprinkled with urls, quotes and escaped newlines
fn arb_answer_text() -> impl Strategy<Value = String> {
    proptest::collection::vec(
        prop_oneof![
            "[a-zA-Z0-9 .,!?]{0,20}",
            arb_url(),
            Just("\\n".to_string()),
            Just("'".to_string()),
            Just("', [".to_string()),
            Just(FINAL_ANSWER_MARKER.to_string()),
        ],
        0..12,
    )
    .prop_map(|parts| parts.concat())
}

// ============================================================================
// Backoff
// ============================================================================

proptest! {
    #[test]
    fn prop_backoff_within_bounds(attempt in 1u32..40, base in 1u64..5_000, seed in any::<u64>()) {
        let mut rng = StdRng::seed_from_u64(seed);
        let d = delay_ms(attempt, base, &mut rng);
        let floor = (1u64 << attempt.min(31)).saturating_mul(base).min(MAX_DELAY_MS);
        prop_assert!(d >= floor, "delay {} below floor {}", d, floor);
        prop_assert!(d <= MAX_DELAY_MS);
    }

    #[test]
    fn prop_backoff_grows_until_cap(attempt in 1u32..20, base in 1u64..1_000, seed in any::<u64>()) {
        let mut rng = StdRng::seed_from_u64(seed);
        let now = delay_ms(attempt, base, &mut rng);
        let next_floor = (1u64 << (attempt + 1)).saturating_mul(base).min(MAX_DELAY_MS);
        // Jitter is below base, so the next floor is never below this delay
        prop_assert!(next_floor >= now || now == MAX_DELAY_MS);
    }
}

// ============================================================================
// Answer parsing
// ============================================================================

proptest! {
    #[test]
    fn prop_parse_never_panics_and_trims(raw in arb_answer_text()) {
        let parsed = parse_answer_text(&raw);
        prop_assert_eq!(parsed.answer_text.trim(), parsed.answer_text.as_str());
    }

    #[test]
    fn prop_links_unique_and_well_formed(raw in arb_answer_text()) {
        let links = extract_links(&raw.replace("\\n", "\n"));
        let unique: HashSet<&String> = links.iter().collect();
        prop_assert_eq!(unique.len(), links.len());
        for link in &links {
            prop_assert!(link.starts_with("http://") || link.starts_with("https://"));
            prop_assert!(!link.contains(char::is_whitespace));
            prop_assert!(!link.contains('\'') && !link.contains('"'));
        }
    }

    #[test]
    fn prop_marked_answer_round_trips(answer in "[a-zA-Z0-9][a-zA-Z0-9 .,]{0,40}[a-zA-Z0-9.]", noise in "[a-z ]{0,20}") {
        let raw = format!("{noise}{FINAL_ANSWER_MARKER} '{answer}', ['https://src.edu/a']");
        let parsed = parse_answer_text(&raw);
        prop_assert_eq!(parsed.answer_text, answer);
        prop_assert_eq!(parsed.links, vec!["https://src.edu/a".to_string()]);
    }

    #[test]
    fn prop_unmarked_text_is_whole_answer(text in "[a-zA-Z0-9 .,]{0,60}") {
        let parsed = parse_answer_text(&text);
        prop_assert_eq!(parsed.answer_text, text.trim());
    }
}

// ============================================================================
// Classification normalization
// ============================================================================

proptest! {
    #[test]
    fn prop_confidence_always_clamped(confidence in any::<f64>(), category in "[A-Za-z ]{0,12}") {
        let body = match serde_json::Number::from_f64(confidence) {
            Some(n) => json!({"predicted_category": category, "confidence": n}),
            None => json!({"predicted_category": category}),
        };
        let result = ClassificationResult::from_response(body).unwrap();
        prop_assert!((0.0..=1.0).contains(&result.confidence));
    }
}

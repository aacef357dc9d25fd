//! Simulated inference services
//!
//! Stand-ins for the remote classifier and answer service so the whole
//! dialogue can run without any backend. Successful bodies go through the same
//! decoding as real responses.

use super::answer::decode_response;
use super::{AnswerRequest, AnswerResult, AnswerService, ClassificationResult, Classifier};
use super::{RequestError, ValidationError};
use crate::state_machine::categories::MANUAL_CATEGORIES;
use async_trait::async_trait;
use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::{json, Value};
use std::ops::RangeInclusive;
use std::time::Duration;

const FAILURE_RATE: f64 = 0.1;

/// How a simulated service behaves
#[derive(Debug, Clone, PartialEq)]
pub struct Simulation {
    /// Probability in [0, 1] that a call fails
    pub failure_rate: f64,
    pub latency_ms: RangeInclusive<u64>,
}

impl Simulation {
    fn clamped_rate(&self) -> f64 {
        if self.failure_rate.is_finite() {
            self.failure_rate.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// Wait out the simulated latency, then decide whether the call fails
    async fn roll(&self, service: &str) -> Result<(), RequestError> {
        let (delay, fail) = {
            let mut rng = rand::thread_rng();
            (
                rng.gen_range(self.latency_ms.clone()),
                rng.gen_bool(self.clamped_rate()),
            )
        };
        tokio::time::sleep(Duration::from_millis(delay)).await;
        if fail {
            tracing::debug!(service, delay_ms = delay, "Simulated failure");
            return Err(RequestError::Network(format!("simulated {service} failure")));
        }
        Ok(())
    }
}

/// Classifier that picks a random manual category with confidence 0.6..0.98
pub struct SimulatedClassifier {
    simulation: Simulation,
}

impl SimulatedClassifier {
    pub fn new() -> Self {
        Self::with_simulation(Simulation {
            failure_rate: FAILURE_RATE,
            latency_ms: 500..=1200,
        })
    }

    pub fn with_simulation(simulation: Simulation) -> Self {
        Self { simulation }
    }
}

impl Default for SimulatedClassifier {
    fn default() -> Self {
        Self::new()
    }
}

fn classifier_body(question: &str) -> Value {
    let mut rng = rand::thread_rng();
    let category = MANUAL_CATEGORIES
        .choose(&mut rng)
        .map_or("Учебный процесс", |c| c.id);
    let confidence = (rng.gen_range(0.60..0.98_f64) * 100.0).round() / 100.0;
    json!({
        "outputs": {
            "question": question,
            "predicted_category": category,
            "confidence": confidence,
        }
    })
}

#[async_trait]
impl Classifier for SimulatedClassifier {
    async fn classify(&self, question: &str) -> Result<ClassificationResult, RequestError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(ValidationError::EmptyQuestion.into());
        }
        self.simulation.roll("classifier").await?;
        ClassificationResult::from_response(classifier_body(question))
    }
}

/// Answer service that replies with a templated answer for the category
pub struct SimulatedAnswerService {
    simulation: Simulation,
}

impl SimulatedAnswerService {
    pub fn new() -> Self {
        Self::with_simulation(Simulation {
            failure_rate: FAILURE_RATE,
            latency_ms: 800..=1600,
        })
    }

    pub fn with_simulation(simulation: Simulation) -> Self {
        Self { simulation }
    }
}

impl Default for SimulatedAnswerService {
    fn default() -> Self {
        Self::new()
    }
}

fn answer_body(request: &AnswerRequest) -> Value {
    let category = request
        .category_filter
        .as_ref()
        .and_then(|f| f.get("predicted_category"))
        .and_then(Value::as_str)
        .unwrap_or("General");
    let excerpt: String = request.question.chars().take(80).collect();

    let variants = [
        format!(
            "FINAL ANSWER: Here is what I found for the category \"{category}\".\\n\\n\
             1) A short answer with steps.\\n2) Links to the relevant pages of the site.\\n\\n\
             Clarify the question if you need more."
        ),
        format!(
            "FINAL ANSWER: Answer on \"{category}\":\\n- Key conditions and deadlines.\\n\
             - What to prepare in advance.\\n\\n\
             I can go into detail if you add context to the question: \"{excerpt}...\"."
        ),
    ];
    let answer = variants
        .choose(&mut rand::thread_rng())
        .cloned()
        .unwrap_or_default();
    json!({ "outputs": { "answer": answer } })
}

#[async_trait]
impl AnswerService for SimulatedAnswerService {
    async fn predict(&self, request: &AnswerRequest) -> Result<AnswerResult, RequestError> {
        // Same local precondition as the real service
        request.profile.answer_filters()?;
        self.simulation.roll("answer service").await?;
        decode_response(&answer_body(request))
    }
}

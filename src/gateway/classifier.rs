//! Classification gateway
//!
//! Turns a question into a [`ClassificationResult`] and, from there, into a
//! closed [`ClassifierVerdict`] before anything reaches the state machine.

use super::client::{Idempotency, ResilientClient};
use super::transport::HttpTransport;
use super::{Classifier, RequestError, ValidationError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;

/// Normalized classifier output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub category: Option<String>,
    /// Always within [0, 1]
    pub confidence: f64,
    pub inappropriate: bool,
    /// The classifier object as received, forwarded to the answer service
    pub raw: Value,
}

/// What the dialogue should do with a classification
#[derive(Debug, Clone, PartialEq)]
pub enum ClassifierVerdict {
    Accepted { category: String, confidence: f64 },
    NeedsManualPick,
    Inappropriate,
}

impl ClassificationResult {
    /// Normalize a classifier response body.
    ///
    /// Fields may sit at the top level or under `outputs`.
    pub fn from_response(body: Value) -> Result<Self, RequestError> {
        let fields = match body {
            Value::Object(mut map) => match map.remove("outputs") {
                Some(Value::Object(inner)) => inner,
                Some(other) => {
                    map.insert("outputs".into(), other);
                    map
                }
                None => map,
            },
            other => {
                return Err(RequestError::Parse(format!(
                    "Classifier returned a non-object body: {other}"
                )))
            }
        };

        let inappropriate = ["is_inappropriate", "inappropriate"]
            .iter()
            .any(|k| fields.get(*k).and_then(Value::as_bool) == Some(true));

        let category = if inappropriate {
            None
        } else {
            ["predicted_category", "category"]
                .iter()
                .find_map(|k| fields.get(*k).and_then(Value::as_str))
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string)
        };

        let confidence = fields
            .get("confidence")
            .and_then(Value::as_f64)
            .filter(|c| c.is_finite())
            .map_or(0.0, |c| c.clamp(0.0, 1.0));

        Ok(Self {
            category,
            confidence,
            inappropriate,
            raw: Value::Object(fields),
        })
    }

    pub fn verdict(&self) -> ClassifierVerdict {
        if self.inappropriate {
            return ClassifierVerdict::Inappropriate;
        }
        match &self.category {
            Some(category) if self.confidence > 0.0 => ClassifierVerdict::Accepted {
                category: category.clone(),
                confidence: self.confidence,
            },
            _ => ClassifierVerdict::NeedsManualPick,
        }
    }
}

/// Merge a manual category pick into a classifier filter object.
///
/// Sets `predicted_category` and `subcategory`, and defaults `confidence` to 0
/// when absent.
pub fn merge_manual_pick(filter: Option<&Value>, category: &str, subcategory: Option<&str>) -> Value {
    let mut map = match filter {
        Some(Value::Object(map)) => map.clone(),
        _ => Map::new(),
    };
    map.insert("predicted_category".into(), Value::String(category.to_string()));
    if let Some(id) = subcategory {
        map.insert("subcategory".into(), Value::String(id.to_string()));
    } else {
        map.remove("subcategory");
    }
    if !map.get("confidence").is_some_and(Value::is_number) {
        map.insert("confidence".into(), json!(0));
    }
    Value::Object(map)
}

fn build_request(question: &str) -> Value {
    json!({
        "inputs": [
            { "name": "question", "datatype": "str", "data": question, "shape": 0 }
        ],
        "output_fields": [
            { "name": "question", "datatype": "str" },
            { "name": "predicted_category", "datatype": "str" },
            { "name": "confidence", "datatype": "FP64" }
        ]
    })
}

/// Classifier over the shared resilient client
pub struct ClassificationGateway<T> {
    client: Arc<ResilientClient<T>>,
    endpoint: String,
    token: Option<String>,
}

impl<T: HttpTransport> ClassificationGateway<T> {
    pub fn new(
        client: Arc<ResilientClient<T>>,
        endpoint: impl Into<String>,
        token: Option<String>,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            token,
        }
    }
}

#[async_trait]
impl<T: HttpTransport> Classifier for ClassificationGateway<T> {
    async fn classify(&self, question: &str) -> Result<ClassificationResult, RequestError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(ValidationError::EmptyQuestion.into());
        }

        let headers = self
            .token
            .iter()
            .map(|t| ("authorization".to_string(), format!("Bearer {t}")))
            .collect();

        // Classification is a pure read over the model, safe to repeat
        let body = self
            .client
            .send(
                &self.endpoint,
                headers,
                build_request(question),
                Idempotency::Idempotent,
            )
            .await?;

        ClassificationResult::from_response(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::client::RetryPolicy;
    use crate::gateway::testing::MockTransport;
    use std::time::Duration;

    fn gateway(transport: Arc<MockTransport>) -> ClassificationGateway<Arc<MockTransport>> {
        let client = ResilientClient::new(
            transport,
            "http://svc.test",
            RetryPolicy {
                timeout: Duration::from_millis(200),
                max_retries: 2,
                base_retry_delay_ms: 1,
            },
        );
        ClassificationGateway::new(Arc::new(client), "/ml/classify", Some("secret".into()))
    }

    #[test]
    fn test_confident_category_is_accepted() {
        let r = ClassificationResult::from_response(
            json!({"predicted_category": "Finance", "confidence": 0.8}),
        )
        .unwrap();
        assert_eq!(
            r.verdict(),
            ClassifierVerdict::Accepted {
                category: "Finance".into(),
                confidence: 0.8
            }
        );
    }

    #[test]
    fn test_zero_confidence_needs_manual_pick() {
        let r = ClassificationResult::from_response(
            json!({"predicted_category": "Finance", "confidence": 0}),
        )
        .unwrap();
        assert_eq!(r.verdict(), ClassifierVerdict::NeedsManualPick);
    }

    #[test]
    fn test_missing_category_needs_manual_pick() {
        let r = ClassificationResult::from_response(json!({"confidence": 0.9})).unwrap();
        assert_eq!(r.verdict(), ClassifierVerdict::NeedsManualPick);
        let r = ClassificationResult::from_response(json!({"category": "  ", "confidence": 0.9}))
            .unwrap();
        assert_eq!(r.verdict(), ClassifierVerdict::NeedsManualPick);
    }

    #[test]
    fn test_inappropriate_drops_category() {
        let r = ClassificationResult::from_response(
            json!({"is_inappropriate": true, "predicted_category": "Finance", "confidence": 0.9}),
        )
        .unwrap();
        assert_eq!(r.verdict(), ClassifierVerdict::Inappropriate);
        assert_eq!(r.category, None);

        let r = ClassificationResult::from_response(json!({"inappropriate": true})).unwrap();
        assert_eq!(r.verdict(), ClassifierVerdict::Inappropriate);
    }

    #[test]
    fn test_outputs_wrapper_is_unwrapped() {
        let r = ClassificationResult::from_response(json!({
            "outputs": {"question": "q", "predicted_category": "Admissions", "confidence": 0.4}
        }))
        .unwrap();
        assert_eq!(r.category.as_deref(), Some("Admissions"));
        assert_eq!(r.raw["predicted_category"], "Admissions");
        assert!(r.raw.get("outputs").is_none());
    }

    #[test]
    fn test_confidence_is_clamped() {
        let r = ClassificationResult::from_response(json!({"category": "A", "confidence": 7.5}))
            .unwrap();
        assert!((r.confidence - 1.0).abs() < f64::EPSILON);
        let r = ClassificationResult::from_response(json!({"category": "A", "confidence": -2}))
            .unwrap();
        assert_eq!(r.verdict(), ClassifierVerdict::NeedsManualPick);
        let r = ClassificationResult::from_response(json!({"category": "A", "confidence": "high"}))
            .unwrap();
        assert_eq!(r.verdict(), ClassifierVerdict::NeedsManualPick);
    }

    #[test]
    fn test_non_object_is_parse_error() {
        assert!(matches!(
            ClassificationResult::from_response(json!(["Finance"])),
            Err(RequestError::Parse(_))
        ));
    }

    #[test]
    fn test_merge_manual_pick() {
        let merged = merge_manual_pick(
            Some(&json!({"predicted_category": "X", "confidence": 0.0, "extra": 1, "subcategory": "old"})),
            "Money",
            None,
        );
        assert_eq!(merged["predicted_category"], "Money");
        assert_eq!(merged["confidence"], json!(0.0));
        assert_eq!(merged["extra"], 1);
        assert!(merged.get("subcategory").is_none());

        let merged = merge_manual_pick(None, "Money", None);
        assert_eq!(merged, json!({"predicted_category": "Money", "confidence": 0}));

        let merged = merge_manual_pick(Some(&json!({"confidence": "n/a"})), "Money", Some("payments"));
        assert_eq!(merged["confidence"], json!(0));
        assert_eq!(merged["subcategory"], "payments");
    }

    #[tokio::test]
    async fn test_classify_sends_typed_payload() {
        let transport = Arc::new(MockTransport::new());
        transport.queue_ok(json!({"predicted_category": "Finance", "confidence": 0.8}));
        let result = gateway(transport.clone()).classify("  When is tuition due?  ").await.unwrap();
        assert_eq!(result.category.as_deref(), Some("Finance"));

        let sent = transport.recorded_requests();
        assert_eq!(sent.len(), 1);
        let input = &sent[0].body["inputs"][0];
        assert_eq!(input["name"], "question");
        assert_eq!(input["datatype"], "str");
        assert_eq!(input["shape"], 0);
        assert_eq!(input["data"], "When is tuition due?");
        assert!(sent[0]
            .headers
            .contains(&("authorization".to_string(), "Bearer secret".to_string())));
    }

    #[tokio::test]
    async fn test_empty_question_never_hits_network() {
        let transport = Arc::new(MockTransport::new());
        let err = gateway(transport.clone()).classify("   ").await.unwrap_err();
        assert_eq!(err, RequestError::Validation(ValidationError::EmptyQuestion));
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_request_error_is_passed_through() {
        let transport = Arc::new(MockTransport::new());
        transport.queue_status(401, None);
        let err = gateway(transport).classify("q").await.unwrap_err();
        assert!(matches!(err, RequestError::PermanentService { status: 401, .. }));
    }
}

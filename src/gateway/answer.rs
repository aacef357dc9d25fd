//! Answer gateway and the FINAL ANSWER text protocol
//!
//! The answer service replies with one free-text field. Inside it, the
//! authoritative answer follows a `FINAL ANSWER:` marker and may be followed by
//! a Python-repr list of sources. URLs can appear anywhere in the text.

use super::client::{Idempotency, ResilientClient};
use super::transport::HttpTransport;
use super::{AnswerService, RequestError};
use crate::profile::UserProfile;
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::{Arc, LazyLock};

pub const FINAL_ANSWER_MARKER: &str = "FINAL ANSWER:";
/// Start of the embedded source list after a quoted answer
const SOURCE_LIST_MARKER: &str = "', [";

/// A parsed answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerResult {
    pub answer_text: String,
    /// Deduplicated, in order of first appearance
    pub links: Vec<String>,
}

impl AnswerResult {
    /// Answer text followed by a "More info" line when links exist
    pub fn render(&self) -> String {
        if self.links.is_empty() {
            self.answer_text.clone()
        } else {
            format!("{}\n\nMore info: {}", self.answer_text, self.links.join(", "))
        }
    }
}

/// One prior turn forwarded as chat history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryTurn {
    pub role: String,
    pub text: String,
}

/// Everything the answer service needs for one prediction
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerRequest {
    pub question: String,
    /// Raw classifier object; `None` when classification was skipped or failed
    pub category_filter: Option<Value>,
    pub profile: UserProfile,
    pub history: Vec<HistoryTurn>,
}

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s'"]+"#).expect("valid url regex"));

/// Turn literal `\n` escape sequences into real newlines
pub fn unescape(raw: &str) -> String {
    raw.replace("\\n", "\n")
}

/// Parse the free-text payload into answer text and links.
///
/// Never fails: without a marker the whole text is the answer.
pub fn parse_answer_text(raw: &str) -> AnswerResult {
    let text = unescape(raw);
    AnswerResult {
        answer_text: extract_final_answer(&text),
        links: extract_links(&text),
    }
}

fn extract_final_answer(text: &str) -> String {
    let Some((_, rest)) = text.split_once(FINAL_ANSWER_MARKER) else {
        return text.trim().to_string();
    };
    let rest = rest.trim();

    let answer = match rest.split_once(SOURCE_LIST_MARKER) {
        // The marker's leading quote closes a quoted answer
        Some((before, _)) => before.strip_prefix('\'').unwrap_or(before),
        None => rest
            .strip_prefix('\'')
            .and_then(|r| r.strip_suffix('\''))
            .unwrap_or(rest),
    };
    answer.trim().to_string()
}

/// Every `http(s)://` run up to whitespace or a quote, first occurrence order
pub fn extract_links(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    URL_RE
        .find_iter(text)
        .map(|m| m.as_str())
        .filter(|url| seen.insert(*url))
        .map(str::to_string)
        .collect()
}

/// The service encodes failures inside a 200 body
pub fn is_upstream_failure(answer: &str) -> bool {
    let lower = answer.trim().to_lowercase();
    lower.is_empty() || lower.contains("http error") || lower.contains("network error")
}

/// Locate the free-text answer field in a response body
pub fn extract_answer_field(body: &Value) -> Option<String> {
    fn as_text(v: &Value) -> Option<String> {
        match v {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            Value::Array(items) => items.iter().find_map(as_text),
            other => Some(other.to_string()),
        }
    }

    let from_outputs = match body.get("outputs") {
        Some(Value::Array(outputs)) => outputs
            .iter()
            .find(|o| o.get("name").and_then(Value::as_str) == Some("answer"))
            .and_then(|o| o.get("data"))
            .and_then(as_text),
        Some(Value::Object(outputs)) => outputs.get("answer").and_then(as_text),
        _ => None,
    };
    // A top-level `answer` still counts when `outputs` has none
    from_outputs.or_else(|| body.get("answer").and_then(as_text))
}

/// Decode a full response body into a validated [`AnswerResult`]
pub fn decode_response(body: &Value) -> Result<AnswerResult, RequestError> {
    let raw = extract_answer_field(body)
        .ok_or_else(|| RequestError::Parse("Response has no answer field".into()))?;
    let result = parse_answer_text(&raw);
    if is_upstream_failure(&result.answer_text) {
        return Err(RequestError::UpstreamContent(if result.answer_text.is_empty() {
            "empty answer".to_string()
        } else {
            result.answer_text
        }));
    }
    Ok(result)
}

fn input(name: &str, data: String) -> Value {
    json!({ "name": name, "datatype": "str", "data": data, "shape": 0 })
}

fn build_request(request: &AnswerRequest) -> Result<Value, RequestError> {
    let filters = request.profile.answer_filters()?;
    let category_filter = request.category_filter.clone().unwrap_or_else(|| json!({}));
    let history = if request.history.is_empty() {
        json!({})
    } else {
        json!({ "messages": request.history })
    };

    Ok(json!({
        "inputs": [
            input("question", request.question.clone()),
            input("question_filters", json!([category_filter]).to_string()),
            input("user_filters", json!([filters.level.filter_value()]).to_string()),
            input("campus_filters", json!([filters.campus.filter_value()]).to_string()),
            input("chat_history", history.to_string()),
        ],
        "output_fields": [
            { "name": "answer", "datatype": "str" },
            { "name": "sources", "datatype": "str" }
        ]
    }))
}

/// Answer service over the shared resilient client
pub struct AnswerGateway<T> {
    client: Arc<ResilientClient<T>>,
    endpoint: String,
    /// Raw `Authorization` header value
    authorization: Option<String>,
}

impl<T: HttpTransport> AnswerGateway<T> {
    pub fn new(
        client: Arc<ResilientClient<T>>,
        endpoint: impl Into<String>,
        authorization: Option<String>,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            authorization,
        }
    }
}

#[async_trait]
impl<T: HttpTransport> AnswerService for AnswerGateway<T> {
    async fn predict(&self, request: &AnswerRequest) -> Result<AnswerResult, RequestError> {
        let payload = build_request(request)?;
        let headers = self
            .authorization
            .iter()
            .map(|a| ("authorization".to_string(), a.clone()))
            .collect();

        // Generation reads the index and writes nothing, so repeats are harmless
        let body = self
            .client
            .send(&self.endpoint, headers, payload, Idempotency::Idempotent)
            .await?;

        decode_response(&body)
    }
}

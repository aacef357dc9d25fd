//! Inference gateways
//!
//! Typed access to the classifier and the answer service over one shared
//! resilient request client, or simulated stand-ins for both.

mod answer;
mod backoff;
mod classifier;
mod client;
mod error;
mod mock;
mod transport;

#[cfg(test)]
mod proptests;
#[cfg(test)]
pub mod testing;

pub use answer::{AnswerGateway, AnswerRequest, AnswerResult, HistoryTurn};
pub use classifier::{merge_manual_pick, ClassificationGateway, ClassificationResult, ClassifierVerdict};
pub use client::{Idempotency, ResilientClient, RetryPolicy};
pub use error::{RequestError, ValidationError};
pub use mock::{SimulatedAnswerService, SimulatedClassifier};
pub use transport::{HttpTransport, ReqwestTransport};

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;

/// Maps a question to a topic category
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, question: &str) -> Result<ClassificationResult, RequestError>;
}

/// Produces a grounded answer for a classified question
#[async_trait]
pub trait AnswerService: Send + Sync {
    async fn predict(&self, request: &AnswerRequest) -> Result<AnswerResult, RequestError>;
}

#[async_trait]
impl<T: Classifier + ?Sized> Classifier for Arc<T> {
    async fn classify(&self, question: &str) -> Result<ClassificationResult, RequestError> {
        (**self).classify(question).await
    }
}

#[async_trait]
impl<T: AnswerService + ?Sized> AnswerService for Arc<T> {
    async fn predict(&self, request: &AnswerRequest) -> Result<AnswerResult, RequestError> {
        (**self).predict(request).await
    }
}

/// Logging wrapper for a classifier
pub struct LoggingClassifier {
    inner: Arc<dyn Classifier>,
}

impl LoggingClassifier {
    pub fn new(inner: Arc<dyn Classifier>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl Classifier for LoggingClassifier {
    async fn classify(&self, question: &str) -> Result<ClassificationResult, RequestError> {
        let start = Instant::now();
        let result = self.inner.classify(question).await;
        let duration = start.elapsed();

        match &result {
            Ok(classification) => {
                tracing::info!(
                    duration_ms = %duration.as_millis(),
                    category = ?classification.category,
                    confidence = classification.confidence,
                    inappropriate = classification.inappropriate,
                    "Classification completed"
                );
            }
            Err(e) => {
                tracing::error!(
                    duration_ms = %duration.as_millis(),
                    kind = e.kind(),
                    error = %e,
                    "Classification failed"
                );
            }
        }

        result
    }
}

/// Logging wrapper for an answer service
pub struct LoggingAnswerService {
    inner: Arc<dyn AnswerService>,
}

impl LoggingAnswerService {
    pub fn new(inner: Arc<dyn AnswerService>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl AnswerService for LoggingAnswerService {
    async fn predict(&self, request: &AnswerRequest) -> Result<AnswerResult, RequestError> {
        let start = Instant::now();
        let result = self.inner.predict(request).await;
        let duration = start.elapsed();

        match &result {
            Ok(answer) => {
                tracing::info!(
                    duration_ms = %duration.as_millis(),
                    answer_chars = answer.answer_text.chars().count(),
                    links = answer.links.len(),
                    "Answer request completed"
                );
            }
            Err(e) => {
                tracing::error!(
                    duration_ms = %duration.as_millis(),
                    kind = e.kind(),
                    error = %e,
                    "Answer request failed"
                );
            }
        }

        result
    }
}

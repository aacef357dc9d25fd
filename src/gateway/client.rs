//! Resilient request client
//!
//! One logical request = up to `1 + max_retries` attempts, each bounded by the
//! per-attempt timeout. Only transient failures are retried.

use super::backoff;
use super::transport::{HttpResponse, HttpTransport, OutgoingRequest};
use super::RequestError;
use serde_json::Value;
use std::time::Duration;

/// Timeout and retry settings shared by both gateways
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub timeout: Duration,
    pub max_retries: u32,
    pub base_retry_delay_ms: u64,
}

/// Whether repeating a request is free of side effects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Idempotency {
    /// Safe to re-issue; transient failures are retried
    Idempotent,
    /// Exactly one attempt
    NonIdempotent,
}

/// Per-request retry bookkeeping, lives only inside [`ResilientClient::send`]
#[derive(Debug, Clone, Copy)]
struct RetryContext {
    attempt: u32,
    base_delay_ms: u64,
    server_hint_ms: u64,
}

impl RetryContext {
    fn new(base_delay_ms: u64) -> Self {
        Self {
            attempt: 0,
            base_delay_ms,
            server_hint_ms: 0,
        }
    }

    /// Advance to the next retry and compute how long to wait before it
    fn advance(&mut self, error: &RequestError) -> Duration {
        self.attempt += 1;
        self.server_hint_ms = error
            .retry_after()
            .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX));
        let computed = backoff::delay(self.attempt, self.base_delay_ms);
        computed.max(Duration::from_millis(self.server_hint_ms))
    }
}

/// Issues POST/JSON requests against `base_url + endpoint` with the shared policy
pub struct ResilientClient<T> {
    transport: T,
    base_url: String,
    policy: RetryPolicy,
}

impl<T: HttpTransport> ResilientClient<T> {
    pub fn new(transport: T, base_url: impl Into<String>, policy: RetryPolicy) -> Self {
        Self {
            transport,
            base_url: base_url.into(),
            policy,
        }
    }

    fn url_for(&self, endpoint: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        )
    }

    /// Send one logical request and decode the JSON response body
    pub async fn send(
        &self,
        endpoint: &str,
        headers: Vec<(String, String)>,
        body: Value,
        idempotency: Idempotency,
    ) -> Result<Value, RequestError> {
        let request = OutgoingRequest {
            url: self.url_for(endpoint),
            headers,
            body,
        };
        let max_retries = match idempotency {
            Idempotency::Idempotent => self.policy.max_retries,
            Idempotency::NonIdempotent => 0,
        };
        let mut ctx = RetryContext::new(self.policy.base_retry_delay_ms);

        loop {
            tracing::debug!(url = %request.url, attempt = ctx.attempt + 1, "Sending request");
            let error = match self.attempt(&request).await {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };

            if !error.is_retryable() || idempotency == Idempotency::NonIdempotent {
                return Err(error);
            }
            if ctx.attempt >= max_retries {
                tracing::warn!(
                    url = %request.url,
                    attempts = ctx.attempt + 1,
                    error = %error,
                    "Retry ceiling reached"
                );
                return Err(RequestError::RetryExhausted {
                    attempts: ctx.attempt + 1,
                    last: Box::new(error),
                });
            }

            let wait = ctx.advance(&error);
            tracing::warn!(
                url = %request.url,
                retry = ctx.attempt,
                delay_ms = %wait.as_millis(),
                server_hint_ms = ctx.server_hint_ms,
                error = %error,
                "Transient failure, retrying"
            );
            tokio::time::sleep(wait).await;
        }
    }

    async fn attempt(&self, request: &OutgoingRequest) -> Result<Value, RequestError> {
        let timeout = self.policy.timeout;
        let response = tokio::time::timeout(timeout, self.transport.post_json(request))
            .await
            .map_err(|_| RequestError::Timeout {
                timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            })??;

        if !response.is_success() {
            return Err(classify_failure(&response));
        }

        serde_json::from_str(&response.body)
            .map_err(|e| RequestError::Parse(format!("Response is not JSON: {e}")))
    }
}

fn classify_failure(response: &HttpResponse) -> RequestError {
    // Only 429 and 503 carry a meaningful retry hint
    let retry_after = match response.status {
        429 | 503 => response.retry_after.as_deref().and_then(parse_retry_after),
        _ => None,
    };
    RequestError::from_status(response.status, retry_after, &response.body)
}

/// `Retry-After` as whole seconds; anything else is ignored
pub fn parse_retry_after(raw: &str) -> Option<Duration> {
    raw.trim().parse::<u64>().ok().map(Duration::from_secs)
}

//! Gateway error types

use std::time::Duration;
use thiserror::Error;

/// Failure of one logical request against an inference service
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RequestError {
    /// Attempt exceeded the per-attempt timeout - retryable
    #[error("Request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// Connection or transport failure - retryable
    #[error("Network failure: {0}")]
    Network(String),

    /// HTTP status in the retryable set (408, 429, 5xx gateway family)
    #[error("Service temporarily unavailable (HTTP {status})")]
    TransientService {
        status: u16,
        /// Server-provided `Retry-After`, if any
        retry_after: Option<Duration>,
    },

    /// Any other failure status - surfaced immediately
    #[error("Service rejected request (HTTP {status}): {message}")]
    PermanentService { status: u16, message: String },

    /// Retry ceiling reached, wraps the final attempt's error
    #[error("Gave up after {attempts} attempts: {last}")]
    RetryExhausted {
        attempts: u32,
        last: Box<RequestError>,
    },

    /// Transport succeeded but the decoded content signals a backend failure
    #[error("Answer service reported a failure: {0}")]
    UpstreamContent(String),

    /// Response body has no recognizable structure
    #[error("Malformed response: {0}")]
    Parse(String),

    /// Local precondition failed, nothing was sent
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl RequestError {
    /// HTTP statuses that are retried automatically
    pub const RETRYABLE_STATUSES: [u16; 6] = [408, 429, 500, 502, 503, 504];

    /// Classify a non-success HTTP status
    pub fn from_status(status: u16, retry_after: Option<Duration>, body: &str) -> Self {
        if Self::RETRYABLE_STATUSES.contains(&status) {
            RequestError::TransientService {
                status,
                retry_after,
            }
        } else {
            RequestError::PermanentService {
                status,
                message: truncate(body, 200),
            }
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RequestError::Timeout { .. }
                | RequestError::Network(_)
                | RequestError::TransientService { .. }
        )
    }

    /// Server hint for the minimum wait before the next attempt
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            RequestError::TransientService { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Short machine-readable tag for logs and client events
    pub fn kind(&self) -> &'static str {
        match self {
            RequestError::Timeout { .. } => "timeout",
            RequestError::Network(_) => "network",
            RequestError::TransientService { .. } => "transient_service",
            RequestError::PermanentService { .. } => "permanent_service",
            RequestError::RetryExhausted { .. } => "retry_exhausted",
            RequestError::UpstreamContent(_) => "upstream_content",
            RequestError::Parse(_) => "parse",
            RequestError::Validation(_) => "validation",
        }
    }
}

/// Locally detected input problems. Never reaches the network.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Name must be at least {min} characters long")]
    NameTooShort { min: usize },
    #[error("Profile is missing campus and/or education level")]
    IncompleteProfile,
    #[error("Question must not be empty")]
    EmptyQuestion,
    #[error("Unknown category: {0}")]
    UnknownCategory(String),
    #[error("Unknown subcategory {subcategory:?} for category {category:?}")]
    UnknownSubcategory {
        category: String,
        subcategory: String,
    },
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max_chars).collect();
        out.push('…');
        out
    }
}

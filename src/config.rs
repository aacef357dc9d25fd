//! Startup configuration from the environment

use crate::gateway::RetryPolicy;
use crate::state_machine::CategoryMode;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required setting {0}")]
    Missing(&'static str),
    #[error("Invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: &'static str,
    },
}

/// Connection settings for the remote inference services
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteBackend {
    pub base_url: String,
    pub classifier_endpoint: String,
    pub answer_endpoint: String,
    /// Bearer token for the classifier
    pub classifier_token: Option<String>,
    /// Raw `Authorization` value for the answer service
    pub answer_auth: Option<String>,
    pub retry: RetryPolicy,
}

/// Where classifications and answers come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    Remote(RemoteBackend),
    /// Simulated services, no network involved
    Mock,
}

/// Service configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub backend: Backend,
    pub category_mode: CategoryMode,
    pub db_path: String,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Blank values count as absent.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mock = match get("ASSISTANT_MOCK") {
            None => false,
            Some(raw) => parse_flag("ASSISTANT_MOCK", &raw)?,
        };
        let backend = if mock {
            Backend::Mock
        } else {
            Backend::Remote(RemoteBackend::from_lookup(&get)?)
        };

        let category_mode = match get("ASSISTANT_CATEGORY_MODE").as_deref() {
            None | Some("confidence_gated") => CategoryMode::ConfidenceGated,
            Some("manual_only") => CategoryMode::ManualOnly,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "ASSISTANT_CATEGORY_MODE",
                    value: other.to_string(),
                    reason: "expected confidence_gated or manual_only",
                })
            }
        };

        let port = match get("ASSISTANT_PORT") {
            None => 8000,
            Some(raw) => raw.parse::<u16>().map_err(|_| ConfigError::Invalid {
                key: "ASSISTANT_PORT",
                value: raw.clone(),
                reason: "expected a port number",
            })?,
        };

        let db_path = get("ASSISTANT_DB_PATH").unwrap_or_else(|| {
            let home = get("HOME").unwrap_or_else(|| "/tmp".to_string());
            format!("{home}/.campus-assistant/assistant.db")
        });

        Ok(Self {
            backend,
            category_mode,
            db_path,
            port,
        })
    }
}

impl RemoteBackend {
    fn from_lookup(get: &impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let timeout_ms = parse_positive("ASSISTANT_TIMEOUT_MS", &required("ASSISTANT_TIMEOUT_MS")?)?;
        let base_retry_delay_ms = parse_positive(
            "ASSISTANT_BASE_RETRY_DELAY_MS",
            &required("ASSISTANT_BASE_RETRY_DELAY_MS")?,
        )?;
        let max_retries_raw = required("ASSISTANT_MAX_RETRIES")?;
        let max_retries = max_retries_raw
            .parse::<u32>()
            .map_err(|_| ConfigError::Invalid {
                key: "ASSISTANT_MAX_RETRIES",
                value: max_retries_raw.clone(),
                reason: "expected a non-negative integer",
            })?;

        Ok(Self {
            base_url: required("ASSISTANT_BASE_URL")?,
            classifier_endpoint: required("ASSISTANT_CLASSIFIER_ENDPOINT")?,
            answer_endpoint: required("ASSISTANT_ANSWER_ENDPOINT")?,
            classifier_token: get("ASSISTANT_CLASSIFIER_TOKEN"),
            answer_auth: get("ASSISTANT_ANSWER_AUTH"),
            retry: RetryPolicy {
                timeout: Duration::from_millis(timeout_ms),
                max_retries,
                base_retry_delay_ms,
            },
        })
    }
}

fn parse_flag(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            value: raw.to_string(),
            reason: "expected true or false",
        }),
    }
}

fn parse_positive(key: &'static str, raw: &str) -> Result<u64, ConfigError> {
    match raw.parse::<u64>() {
        Ok(0) => Err(ConfigError::Invalid {
            key,
            value: raw.to_string(),
            reason: "must be greater than zero",
        }),
        Ok(v) => Ok(v),
        Err(_) => Err(ConfigError::Invalid {
            key,
            value: raw.to_string(),
            reason: "expected a positive integer",
        }),
    }
}

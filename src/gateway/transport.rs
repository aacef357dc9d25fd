//! HTTP transport seam
//!
//! The resilient client only needs "POST this JSON, give me status, hint and
//! body". Keeping that behind a trait lets the retry loop run against a mock.

use super::RequestError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

/// A single POST with a JSON body
#[derive(Debug, Clone)]
pub struct OutgoingRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Value,
}

/// Raw response, before status classification
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    /// Raw `Retry-After` header value, if the server sent one
    pub retry_after: Option<String>,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Issue one attempt. Timeouts are enforced by the caller.
    async fn post_json(&self, request: &OutgoingRequest) -> Result<HttpResponse, RequestError>;
}

#[async_trait]
impl<T: HttpTransport + ?Sized> HttpTransport for std::sync::Arc<T> {
    async fn post_json(&self, request: &OutgoingRequest) -> Result<HttpResponse, RequestError> {
        (**self).post_json(request).await
    }
}

/// Production transport backed by reqwest
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = Client::builder().build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn post_json(&self, request: &OutgoingRequest) -> Result<HttpResponse, RequestError> {
        let mut builder = self
            .client
            .post(&request.url)
            .header("content-type", "application/json")
            .json(&request.body);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_connect() {
                RequestError::Network(format!("Connection failed: {e}"))
            } else {
                RequestError::Network(format!("Request failed: {e}"))
            }
        })?;

        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response
            .text()
            .await
            .map_err(|e| RequestError::Network(format!("Failed to read response: {e}")))?;

        Ok(HttpResponse {
            status,
            retry_after,
            body,
        })
    }
}

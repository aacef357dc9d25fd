//! Mock transport for gateway tests

use super::transport::{HttpResponse, HttpTransport, OutgoingRequest};
use super::RequestError;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// Scripted reply: optional delay, then a response or a transport error
struct Scripted {
    delay: Option<Duration>,
    reply: Result<HttpResponse, RequestError>,
}

/// Transport that replays queued replies and records every request
#[allow(dead_code)]
pub struct MockTransport {
    replies: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<OutgoingRequest>>,
}

#[allow(dead_code)]
impl MockTransport {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn push(&self, delay: Option<Duration>, reply: Result<HttpResponse, RequestError>) {
        self.replies
            .lock()
            .unwrap()
            .push_back(Scripted { delay, reply });
    }

    pub fn queue_ok(&self, body: Value) {
        self.queue_raw(200, &body.to_string());
    }

    pub fn queue_raw(&self, status: u16, body: &str) {
        self.push(
            None,
            Ok(HttpResponse {
                status,
                retry_after: None,
                body: body.to_string(),
            }),
        );
    }

    pub fn queue_status(&self, status: u16, retry_after: Option<&str>) {
        self.push(
            None,
            Ok(HttpResponse {
                status,
                retry_after: retry_after.map(str::to_string),
                body: format!("status {status}"),
            }),
        );
    }

    pub fn queue_delayed_ok(&self, delay: Duration, body: Value) {
        self.push(
            Some(delay),
            Ok(HttpResponse {
                status: 200,
                retry_after: None,
                body: body.to_string(),
            }),
        );
    }

    pub fn queue_error(&self, error: RequestError) {
        self.push(None, Err(error));
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn recorded_requests(&self) -> Vec<OutgoingRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn recorded_urls(&self) -> Vec<String> {
        self.recorded_requests().into_iter().map(|r| r.url).collect()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn post_json(&self, request: &OutgoingRequest) -> Result<HttpResponse, RequestError> {
        self.requests.lock().unwrap().push(request.clone());
        let scripted = self.replies.lock().unwrap().pop_front();
        match scripted {
            Some(Scripted { delay, reply }) => {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                reply
            }
            None => Err(RequestError::Network("No mock reply queued".into())),
        }
    }
}

//! Mock implementations for testing
//!
//! These mocks enable engine and manager tests without network or disk.

use super::traits::*;
use crate::gateway::{
    AnswerRequest, AnswerResult, AnswerService, ClassificationResult, Classifier, RequestError,
};
use crate::profile::UserProfile;
use crate::state_machine::ConversationState;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

/// A queued reply with an optional delay before it is returned
struct Scripted<T> {
    delay: Option<Duration>,
    reply: Result<T, RequestError>,
}

// ============================================================================
// Mock Classifier
// ============================================================================

/// Classifier that returns queued results
#[allow(dead_code)]
pub struct MockClassifier {
    replies: Mutex<VecDeque<Scripted<ClassificationResult>>>,
    /// Questions received, in order
    pub questions: Mutex<Vec<String>>,
    /// Notified when a request starts
    pub request_started: Arc<Notify>,
}

#[allow(dead_code)]
impl MockClassifier {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            questions: Mutex::new(Vec::new()),
            request_started: Arc::new(Notify::new()),
        }
    }

    /// Queue a classifier response body, normalized like the real gateway does
    pub fn queue_body(&self, body: Value) {
        let result = ClassificationResult::from_response(body);
        self.replies
            .lock()
            .unwrap()
            .push_back(Scripted { delay: None, reply: result });
    }

    pub fn queue_delayed_body(&self, delay: Duration, body: Value) {
        let result = ClassificationResult::from_response(body);
        self.replies.lock().unwrap().push_back(Scripted {
            delay: Some(delay),
            reply: result,
        });
    }

    pub fn queue_error(&self, error: RequestError) {
        self.replies.lock().unwrap().push_back(Scripted {
            delay: None,
            reply: Err(error),
        });
    }

    pub fn call_count(&self) -> usize {
        self.questions.lock().unwrap().len()
    }
}

impl Default for MockClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Classifier for MockClassifier {
    async fn classify(&self, question: &str) -> Result<ClassificationResult, RequestError> {
        self.questions.lock().unwrap().push(question.to_string());
        self.request_started.notify_waiters();
        let scripted = self.replies.lock().unwrap().pop_front();
        match scripted {
            Some(Scripted { delay, reply }) => {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                reply
            }
            None => Err(RequestError::Network("No mock classification queued".into())),
        }
    }
}

// ============================================================================
// Mock Answer Service
// ============================================================================

/// Answer service that returns queued results
#[allow(dead_code)]
pub struct MockAnswerService {
    replies: Mutex<VecDeque<Scripted<AnswerResult>>>,
    /// Requests received, in order
    pub requests: Mutex<Vec<AnswerRequest>>,
}

#[allow(dead_code)]
impl MockAnswerService {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn queue_answer(&self, text: &str, links: &[&str]) {
        self.queue(None, Ok(answer(text, links)));
    }

    pub fn queue_delayed_answer(&self, delay: Duration, text: &str) {
        self.queue(Some(delay), Ok(answer(text, &[])));
    }

    pub fn queue_error(&self, error: RequestError) {
        self.queue(None, Err(error));
    }

    fn queue(&self, delay: Option<Duration>, reply: Result<AnswerResult, RequestError>) {
        self.replies
            .lock()
            .unwrap()
            .push_back(Scripted { delay, reply });
    }

    pub fn recorded_requests(&self) -> Vec<AnswerRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl Default for MockAnswerService {
    fn default() -> Self {
        Self::new()
    }
}

fn answer(text: &str, links: &[&str]) -> AnswerResult {
    AnswerResult {
        answer_text: text.to_string(),
        links: links.iter().map(|l| (*l).to_string()).collect(),
    }
}

#[async_trait]
impl AnswerService for MockAnswerService {
    async fn predict(&self, request: &AnswerRequest) -> Result<AnswerResult, RequestError> {
        self.requests.lock().unwrap().push(request.clone());
        let scripted = self.replies.lock().unwrap().pop_front();
        match scripted {
            Some(Scripted { delay, reply }) => {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                reply
            }
            None => Err(RequestError::Network("No mock answer queued".into())),
        }
    }
}

// ============================================================================
// In-Memory Storage
// ============================================================================

/// In-memory storage for testing
#[allow(dead_code)]
pub struct MemoryStore {
    states: Mutex<HashMap<String, ConversationState>>,
    profiles: Mutex<HashMap<String, UserProfile>>,
    /// Number of state writes, across all sessions
    pub saves: Mutex<usize>,
}

#[allow(dead_code)]
impl MemoryStore {
    pub fn new() -> Self {
        Self {
            states: Mutex::new(HashMap::new()),
            profiles: Mutex::new(HashMap::new()),
            saves: Mutex::new(0),
        }
    }

    pub fn set_profile(&self, profile_key: &str, profile: UserProfile) {
        self.profiles
            .lock()
            .unwrap()
            .insert(profile_key.to_string(), profile);
    }

    pub fn set_state(&self, session_key: &str, state: ConversationState) {
        self.states
            .lock()
            .unwrap()
            .insert(session_key.to_string(), state);
    }

    pub fn get_current_state(&self, session_key: &str) -> Option<ConversationState> {
        self.states.lock().unwrap().get(session_key).cloned()
    }

    pub fn save_count(&self) -> usize {
        *self.saves.lock().unwrap()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConversationStore for MemoryStore {
    async fn save_state(&self, session_key: &str, state: &ConversationState) -> Result<(), String> {
        *self.saves.lock().unwrap() += 1;
        self.set_state(session_key, state.clone());
        Ok(())
    }

    /// Sessions here always read the profile stored under their own key
    async fn load_session(&self, session_key: &str) -> Result<Option<StoredSession>, String> {
        Ok(self
            .get_current_state(session_key)
            .map(|state| StoredSession {
                profile_key: session_key.to_string(),
                state,
            }))
    }
}

#[async_trait]
impl ProfileProvider for MemoryStore {
    async fn profile(&self, profile_key: &str) -> Result<UserProfile, String> {
        Ok(self
            .profiles
            .lock()
            .unwrap()
            .get(profile_key)
            .cloned()
            .unwrap_or_default())
    }
}

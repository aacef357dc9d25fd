//! Runtime for dialogue sessions
//!
//! One engine task per session key. Handles are created lazily from the
//! stored state and shared by every caller touching that session.

mod executor;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::DialogueEngine;
pub use traits::*;

use crate::db::{Database, DbError};
use crate::gateway::{AnswerService, Classifier, ValidationError};
use crate::profile::UserProfile;
use crate::state_machine::{CategoryMode, ConversationState, DialogueContext, Event, TransitionError};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot, watch, RwLock};

/// Type alias for the production engine
pub type ProductionEngine = DialogueEngine<DatabaseStorage, dyn Classifier, dyn AnswerService>;

/// A user action plus the channel its outcome is reported on
#[derive(Debug)]
pub struct Command {
    pub event: Event,
    pub reply: oneshot::Sender<Result<(), TransitionError>>,
}

/// Events sent to SSE clients
#[derive(Debug, Clone)]
pub enum SseEvent {
    Init {
        state: serde_json::Value,
        input_enabled: bool,
    },
    StateChange {
        state: serde_json::Value,
        input_enabled: bool,
    },
    /// Side notifications such as `request_failed` or `conversation_reset`
    Notice {
        event_type: String,
        data: serde_json::Value,
    },
    Error {
        message: String,
    },
}

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Session not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Session engine stopped: {0}")]
    Closed(String),
}

impl From<DbError> for RuntimeError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::SessionNotFound(key) => RuntimeError::NotFound(key),
            other => RuntimeError::Storage(other.to_string()),
        }
    }
}

/// Handle to interact with a running session
#[derive(Clone)]
pub struct ConversationHandle {
    pub command_tx: mpsc::Sender<Command>,
    pub broadcast_tx: broadcast::Sender<SseEvent>,
    pub state_rx: watch::Receiver<ConversationState>,
}

/// Manager for all session engines
pub struct RuntimeManager {
    db: Database,
    storage: DatabaseStorage,
    classifier: Arc<dyn Classifier>,
    answerer: Arc<dyn AnswerService>,
    category_mode: CategoryMode,
    sessions: RwLock<HashMap<String, ConversationHandle>>,
}

impl RuntimeManager {
    pub fn new(
        db: Database,
        classifier: Arc<dyn Classifier>,
        answerer: Arc<dyn AnswerService>,
        category_mode: CategoryMode,
    ) -> Self {
        Self {
            storage: DatabaseStorage::new(db.clone()),
            db,
            classifier,
            answerer,
            category_mode,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Create and store a fresh session. Without a profile key the session
    /// reads a profile of its own.
    pub fn create_session(&self, profile_key: Option<&str>) -> Result<String, RuntimeError> {
        let session_key = uuid::Uuid::new_v4().to_string();
        let profile_key = profile_key.unwrap_or(&session_key);
        self.db
            .create_session(&session_key, profile_key, &ConversationState::new(Utc::now()))?;
        tracing::info!(session = %session_key, profile_key = %profile_key, "Created session");
        Ok(session_key)
    }

    /// Get or start the engine for a session
    pub async fn get_or_create(&self, session_key: &str) -> Result<ConversationHandle, RuntimeError> {
        {
            let sessions = self.sessions.read().await;
            if let Some(handle) = sessions.get(session_key) {
                return Ok(handle.clone());
            }
        }

        let mut sessions = self.sessions.write().await;
        // Another caller may have started it while we waited for the lock
        if let Some(handle) = sessions.get(session_key) {
            return Ok(handle.clone());
        }

        let stored = self
            .storage
            .load_session(session_key)
            .await
            .map_err(RuntimeError::Storage)?
            .ok_or_else(|| RuntimeError::NotFound(session_key.to_string()))?;
        let state = stored.state.clone().restored(Utc::now());
        if state != stored.state {
            tracing::info!(
                session = %session_key,
                stage = ?stored.state.stage,
                "Restored interrupted session"
            );
            self.storage
                .save_state(session_key, &state)
                .await
                .map_err(RuntimeError::Storage)?;
        }

        let (command_tx, command_rx) = mpsc::channel(32);
        let (broadcast_tx, _) = broadcast::channel(128);
        let (state_tx, state_rx) = watch::channel(state.clone());

        let engine: ProductionEngine = DialogueEngine::new(
            DialogueContext::new(session_key, self.category_mode),
            stored.profile_key,
            state,
            self.storage.clone(),
            Arc::clone(&self.classifier),
            Arc::clone(&self.answerer),
            command_rx,
            broadcast_tx.clone(),
            state_tx,
        );

        let key = session_key.to_string();
        tokio::spawn(async move {
            engine.run().await;
            tracing::info!(session = %key, "Session engine finished");
        });

        let handle = ConversationHandle {
            command_tx,
            broadcast_tx,
            state_rx,
        };
        sessions.insert(session_key.to_string(), handle.clone());
        Ok(handle)
    }

    /// Send a user action and wait until the engine accepted or rejected it
    pub async fn dispatch(&self, session_key: &str, event: Event) -> Result<(), RuntimeError> {
        let handle = self.get_or_create(session_key).await?;
        Self::send(&handle, session_key, event).await
    }

    async fn send(
        handle: &ConversationHandle,
        session_key: &str,
        event: Event,
    ) -> Result<(), RuntimeError> {
        let (reply, reply_rx) = oneshot::channel();
        handle
            .command_tx
            .send(Command { event, reply })
            .await
            .map_err(|_| RuntimeError::Closed(session_key.to_string()))?;
        reply_rx
            .await
            .map_err(|_| RuntimeError::Closed(session_key.to_string()))??;
        Ok(())
    }

    /// Subscribe to session updates, together with the state to render first
    pub async fn subscribe(
        &self,
        session_key: &str,
    ) -> Result<(broadcast::Receiver<SseEvent>, ConversationState), RuntimeError> {
        let handle = self.get_or_create(session_key).await?;
        let receiver = handle.broadcast_tx.subscribe();
        let state = handle.state_rx.borrow().clone();
        Ok((receiver, state))
    }

    pub async fn current_state(&self, session_key: &str) -> Result<ConversationState, RuntimeError> {
        let handle = self.get_or_create(session_key).await?;
        let state = handle.state_rx.borrow().clone();
        Ok(state)
    }

    pub fn profile(&self, profile_key: &str) -> Result<UserProfile, RuntimeError> {
        Ok(self.db.get_profile(profile_key)?.unwrap_or_default())
    }

    /// Validate and store a profile, then tell every live session reading it
    pub async fn update_profile(
        &self,
        profile_key: &str,
        profile: UserProfile,
    ) -> Result<UserProfile, RuntimeError> {
        let profile = UserProfile {
            name: profile.name.trim().to_string(),
            ..profile
        };
        profile.validate()?;
        self.db.put_profile(profile_key, &profile)?;

        let readers = self.db.sessions_for_profile(profile_key)?;
        let live: Vec<(String, ConversationHandle)> = {
            let sessions = self.sessions.read().await;
            readers
                .into_iter()
                .filter_map(|key| sessions.get(&key).cloned().map(|handle| (key, handle)))
                .collect()
        };

        for (session_key, handle) in live {
            if let Err(e) = Self::send(&handle, &session_key, Event::ProfileUpdated).await {
                tracing::warn!(session = %session_key, error = %e, "Failed to announce profile update");
            }
        }

        tracing::info!(profile_key = %profile_key, "Profile updated");
        Ok(profile)
    }
}

//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the engine with mock implementations.

use crate::db::Database;
use crate::profile::UserProfile;
use crate::state_machine::ConversationState;
use async_trait::async_trait;
use std::sync::Arc;

/// What a session engine resumes from
#[derive(Debug, Clone, PartialEq)]
pub struct StoredSession {
    /// Whose profile the dialogue reads
    pub profile_key: String,
    pub state: ConversationState,
}

/// Storage for conversation state
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Replace the stored state (whole-value write)
    async fn save_state(&self, session_key: &str, state: &ConversationState) -> Result<(), String>;

    /// Read once when the engine starts; `None` for an unknown session
    async fn load_session(&self, session_key: &str) -> Result<Option<StoredSession>, String>;
}

/// Read access to the user profile. The engine never writes it.
#[async_trait]
pub trait ProfileProvider: Send + Sync {
    /// Current profile; an unknown key yields an empty profile
    async fn profile(&self, profile_key: &str) -> Result<UserProfile, String>;
}

/// Combined storage trait for convenience
pub trait Storage: ConversationStore + ProfileProvider {}
impl<T: ConversationStore + ProfileProvider> Storage for T {}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: ConversationStore + ?Sized> ConversationStore for Arc<T> {
    async fn save_state(&self, session_key: &str, state: &ConversationState) -> Result<(), String> {
        (**self).save_state(session_key, state).await
    }

    async fn load_session(&self, session_key: &str) -> Result<Option<StoredSession>, String> {
        (**self).load_session(session_key).await
    }
}

#[async_trait]
impl<T: ProfileProvider + ?Sized> ProfileProvider for Arc<T> {
    async fn profile(&self, profile_key: &str) -> Result<UserProfile, String> {
        (**self).profile(profile_key).await
    }
}

// ============================================================================
// Production Adapters
// ============================================================================

/// Adapter to use Database as Storage
#[derive(Clone)]
pub struct DatabaseStorage {
    db: Database,
}

impl DatabaseStorage {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ConversationStore for DatabaseStorage {
    async fn save_state(&self, session_key: &str, state: &ConversationState) -> Result<(), String> {
        self.db
            .save_state(session_key, state)
            .map_err(|e| e.to_string())
    }

    async fn load_session(&self, session_key: &str) -> Result<Option<StoredSession>, String> {
        match self.db.get_session(session_key) {
            Ok(session) => Ok(Some(StoredSession {
                profile_key: session.profile_key,
                state: session.state,
            })),
            Err(crate::db::DbError::SessionNotFound(_)) => Ok(None),
            Err(e) => Err(e.to_string()),
        }
    }
}

#[async_trait]
impl ProfileProvider for DatabaseStorage {
    async fn profile(&self, profile_key: &str) -> Result<UserProfile, String> {
        self.db
            .get_profile(profile_key)
            .map(Option::unwrap_or_default)
            .map_err(|e| e.to_string())
    }
}

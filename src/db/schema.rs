//! Database schema and types

pub use crate::profile::UserProfile;
pub use crate::state_machine::ConversationState;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// SQL schema for initialization
pub const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS conversations (
    session_key TEXT PRIMARY KEY,
    profile_key TEXT NOT NULL,
    state TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_conversations_profile ON conversations(profile_key);

CREATE TABLE IF NOT EXISTS profiles (
    profile_key TEXT PRIMARY KEY,
    profile TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
";

/// One dialogue session as stored
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub session_key: String,
    /// Whose profile the dialogue reads
    pub profile_key: String,
    pub state: ConversationState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

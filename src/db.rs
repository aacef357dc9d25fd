//! Database module
//!
//! Persists dialogue state per session and user profiles.

mod schema;

pub use schema::*;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Stored JSON is invalid: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Session not found: {0}")]
    SessionNotFound(String),
    #[error("Session already exists: {0}")]
    SessionExists(String),
}

pub type DbResult<T> = Result<T, DbError>;

/// Thread-safe database handle
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.init_schema()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing)
    #[allow(dead_code)] // Used in tests
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> DbResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    // ==================== Session Operations ====================

    /// Create a new session with its initial state
    pub fn create_session(
        &self,
        session_key: &str,
        profile_key: &str,
        state: &ConversationState,
    ) -> DbResult<Session> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now();
        let state_json = serde_json::to_string(state)?;

        conn.execute(
            "INSERT INTO conversations (session_key, profile_key, state, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            params![session_key, profile_key, state_json, now.to_rfc3339()],
        )
        .map_err(|e| match e {
            rusqlite::Error::SqliteFailure(err, _)
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                DbError::SessionExists(session_key.to_string())
            }
            other => DbError::Sqlite(other),
        })?;

        Ok(Session {
            session_key: session_key.to_string(),
            profile_key: profile_key.to_string(),
            state: state.clone(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Get session by key
    pub fn get_session(&self, session_key: &str) -> DbResult<Session> {
        let conn = self.conn.lock().unwrap();
        let row = conn
            .query_row(
                "SELECT session_key, profile_key, state, created_at, updated_at
                 FROM conversations WHERE session_key = ?1",
                params![session_key],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                },
            )
            .optional()?;

        let Some((session_key, profile_key, state_json, created_at, updated_at)) = row else {
            return Err(DbError::SessionNotFound(session_key.to_string()));
        };

        Ok(Session {
            session_key,
            profile_key,
            state: serde_json::from_str(&state_json)?,
            created_at: parse_datetime(&created_at),
            updated_at: parse_datetime(&updated_at),
        })
    }

    /// Replace the stored state of a session
    pub fn save_state(&self, session_key: &str, state: &ConversationState) -> DbResult<()> {
        let conn = self.conn.lock().unwrap();
        let state_json = serde_json::to_string(state)?;
        let updated = conn.execute(
            "UPDATE conversations SET state = ?1, updated_at = ?2 WHERE session_key = ?3",
            params![state_json, Utc::now().to_rfc3339(), session_key],
        )?;
        if updated == 0 {
            return Err(DbError::SessionNotFound(session_key.to_string()));
        }
        Ok(())
    }

    /// Sessions reading the given profile
    pub fn sessions_for_profile(&self, profile_key: &str) -> DbResult<Vec<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT session_key FROM conversations WHERE profile_key = ?1 ORDER BY created_at",
        )?;
        let keys = stmt
            .query_map(params![profile_key], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(keys)
    }

    // ==================== Profile Operations ====================

    /// Stored profile, or `None` if the user never saved one
    pub fn get_profile(&self, profile_key: &str) -> DbResult<Option<UserProfile>> {
        let conn = self.conn.lock().unwrap();
        let json: Option<String> = conn
            .query_row(
                "SELECT profile FROM profiles WHERE profile_key = ?1",
                params![profile_key],
                |row| row.get(0),
            )
            .optional()?;
        json.map(|j| serde_json::from_str(&j))
            .transpose()
            .map_err(DbError::from)
    }

    /// Insert or replace a profile
    pub fn put_profile(&self, profile_key: &str, profile: &UserProfile) -> DbResult<()> {
        let conn = self.conn.lock().unwrap();
        let json = serde_json::to_string(profile)?;
        conn.execute(
            "INSERT INTO profiles (profile_key, profile, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(profile_key) DO UPDATE SET profile = excluded.profile,
                                                    updated_at = excluded.updated_at",
            params![profile_key, json, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}

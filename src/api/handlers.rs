//! HTTP request handlers

use super::sse::sse_stream;
use super::types::{
    ActionRequest, ActionResponse, CategoriesResponse, CreateSessionRequest,
    CreateSessionResponse, ErrorResponse, ProfileRequest, ProfileResponse, SessionResponse,
};
use super::AppState;
use crate::runtime::{RuntimeError, SseEvent};
use crate::state_machine::categories::MANUAL_CATEGORIES;
use crate::state_machine::TransitionError;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Sessions
        .route("/api/sessions/new", post(create_session))
        .route("/api/sessions/:key", get(get_session))
        .route("/api/sessions/:key/stream", get(stream_session))
        .route("/api/sessions/:key/actions", post(send_action))
        // Profile
        .route("/api/profile/:key", get(get_profile).put(put_profile))
        // Manual category list
        .route("/api/categories", get(list_categories))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Sessions
// ============================================================

async fn create_session(
    State(state): State<AppState>,
    body: Option<Json<CreateSessionRequest>>,
) -> Result<Json<CreateSessionResponse>, AppError> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let session_key = state.runtime.create_session(req.profile_key.as_deref())?;
    Ok(Json(CreateSessionResponse { session_key }))
}

async fn get_session(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<SessionResponse>, AppError> {
    let current = state.runtime.current_state(&key).await?;
    Ok(Json(current.into()))
}

async fn stream_session(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let (broadcast_rx, current) = state.runtime.subscribe(&key).await?;

    let init_event = SseEvent::Init {
        input_enabled: current.input_enabled(),
        state: serde_json::to_value(&current).unwrap_or(Value::Null),
    };

    Ok(sse_stream(init_event, broadcast_rx))
}

// ============================================================
// User Actions
// ============================================================

async fn send_action(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(action): Json<ActionRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    state.runtime.dispatch(&key, action.into()).await?;
    Ok(Json(ActionResponse { accepted: true }))
}

// ============================================================
// Profile
// ============================================================

async fn get_profile(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<ProfileResponse>, AppError> {
    let profile = state.runtime.profile(&key)?;
    Ok(Json(profile.into()))
}

async fn put_profile(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(req): Json<ProfileRequest>,
) -> Result<Json<ProfileResponse>, AppError> {
    let profile = state.runtime.update_profile(&key, req.into()).await?;
    Ok(Json(profile.into()))
}

// ============================================================
// Categories
// ============================================================

async fn list_categories() -> Json<CategoriesResponse> {
    Json(CategoriesResponse {
        categories: MANUAL_CATEGORIES.to_vec(),
    })
}

// ============================================================
// Version
// ============================================================

async fn get_version() -> &'static str {
    concat!("campus-assistant ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    NotFound(String),
    Conflict(String),
    Unprocessable(String),
    Internal(String),
}

impl From<RuntimeError> for AppError {
    fn from(e: RuntimeError) -> Self {
        let message = e.to_string();
        match e {
            RuntimeError::NotFound(_) => AppError::NotFound(message),
            RuntimeError::Validation(_)
            | RuntimeError::Transition(TransitionError::Validation(_)) => {
                AppError::Unprocessable(message)
            }
            RuntimeError::Transition(_) => AppError::Conflict(message),
            RuntimeError::Storage(_) | RuntimeError::Closed(_) => {
                tracing::error!(error = %message, "Request failed");
                AppError::Internal(message)
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::Unprocessable(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}

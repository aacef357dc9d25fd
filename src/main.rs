//! Campus Assistant - question answering for university students
//!
//! A Rust backend implementing the dialogue state machine in front of a
//! topic classifier and an answer service.

mod api;
mod config;
mod db;
mod gateway;
mod profile;
mod runtime;
mod state_machine;

use api::{create_router, AppState};
use config::{Backend, Config};
use db::Database;
use gateway::{
    AnswerGateway, AnswerService, ClassificationGateway, Classifier, LoggingAnswerService,
    LoggingClassifier, ReqwestTransport, ResilientClient, SimulatedAnswerService,
    SimulatedClassifier,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "campus_assistant=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let config = Config::from_env()?;

    // Ensure database directory exists
    if let Some(parent) = PathBuf::from(&config.db_path).parent() {
        std::fs::create_dir_all(parent)?;
    }

    tracing::info!(path = %config.db_path, "Opening database");
    let db = Database::open(&config.db_path)?;

    let (classifier, answerer) = build_gateways(&config.backend)?;
    tracing::info!(category_mode = ?config.category_mode, "Dialogue configured");

    // Create application state
    let state = AppState::new(db, classifier, answerer, config.category_mode);

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let compression = CompressionLayer::new()
        .gzip(true)
        .br(true)
        .deflate(true)
        .zstd(true);

    let app = create_router(state)
        .layer(cors)
        .layer(compression)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Campus assistant listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Remote services over one shared client, or the simulated pair
fn build_gateways(
    backend: &Backend,
) -> Result<(Arc<dyn Classifier>, Arc<dyn AnswerService>), Box<dyn std::error::Error>> {
    let (classifier, answerer): (Arc<dyn Classifier>, Arc<dyn AnswerService>) = match backend {
        Backend::Remote(remote) => {
            let client = Arc::new(ResilientClient::new(
                ReqwestTransport::new()?,
                remote.base_url.clone(),
                remote.retry,
            ));
            tracing::info!(
                base_url = %remote.base_url,
                classifier = %remote.classifier_endpoint,
                answer = %remote.answer_endpoint,
                timeout_ms = %remote.retry.timeout.as_millis(),
                max_retries = remote.retry.max_retries,
                "Inference gateways configured"
            );
            if remote.answer_auth.is_none() {
                tracing::warn!("ASSISTANT_ANSWER_AUTH is not set; answer requests go out unauthenticated");
            }
            let classifier: Arc<dyn Classifier> = Arc::new(ClassificationGateway::new(
                Arc::clone(&client),
                remote.classifier_endpoint.clone(),
                remote.classifier_token.clone(),
            ));
            let answerer: Arc<dyn AnswerService> = Arc::new(AnswerGateway::new(
                client,
                remote.answer_endpoint.clone(),
                remote.answer_auth.clone(),
            ));
            (classifier, answerer)
        }
        Backend::Mock => {
            tracing::warn!("ASSISTANT_MOCK is set; using simulated classifier and answer service");
            let classifier: Arc<dyn Classifier> = Arc::new(SimulatedClassifier::new());
            let answerer: Arc<dyn AnswerService> = Arc::new(SimulatedAnswerService::new());
            (classifier, answerer)
        }
    };

    Ok((
        Arc::new(LoggingClassifier::new(classifier)),
        Arc::new(LoggingAnswerService::new(answerer)),
    ))
}

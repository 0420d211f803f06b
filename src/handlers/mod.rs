//! HTTP handlers module
//!
//! Contains all HTTP endpoint handling logic

pub mod health;

use crate::config::Settings;
use crate::middleware::request_logging_middleware;
use crate::services::{JsonRetry, QueryEngine};
use anyhow::Result;
use axum::{middleware, routing::get, Router};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Application state
#[derive(Debug, Clone)]
pub struct AppState {
    pub engine: QueryEngine,
    pub retry: JsonRetry,
}

impl AppState {
    pub fn new(engine: QueryEngine) -> Self {
        let retry = JsonRetry::from_engine(engine.clone());
        Self { engine, retry }
    }
}

/// Create application router backed by the Gemini provider
pub fn create_router(settings: Settings) -> Result<Router> {
    let engine = QueryEngine::new(settings)?;
    Ok(router_with_engine(engine))
}

/// Create application router around an existing engine
pub fn router_with_engine(engine: QueryEngine) -> Router {
    health::mark_started();
    let app_state = Arc::new(AppState::new(engine));

    // Create middleware stack
    let middleware_stack = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(middleware::from_fn(request_logging_middleware));

    Router::new()
        .route("/api/ai-test", get(ai_test::cmyk_test))
        .route("/api/ai-test/connection", get(ai_test::connection_test))
        .route("/health", get(health::health_check))
        .route("/health/live", get(health::liveness_check))
        .with_state(app_state)
        .layer(middleware_stack)
}

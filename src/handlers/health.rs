//! Health check handlers
//!
//! Provides application health status check endpoints

use crate::handlers::AppState;
use axum::{extract::State, response::Json};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};
use std::time::Instant;
use tracing::debug;

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service name
    pub service: String,
    /// Version information
    pub version: String,
    /// Timestamp
    pub timestamp: String,
    /// Details (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HealthDetails>,
}

/// Check result
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthDetails {
    /// Gemini credential status
    pub gemini_api: String,
    /// Default model id
    pub default_model: String,
    /// Uptime in seconds
    pub uptime_seconds: u64,
}

/// Basic health check
///
/// GET /health
/// Reports whether AI queries can run; does not call the model
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    debug!("Executing health check");

    let gemini_api = if state.engine.is_configured() {
        "configured"
    } else {
        "missing_api_key"
    };

    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "Trade Journal AI".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        details: Some(HealthDetails {
            gemini_api: gemini_api.to_string(),
            default_model: state.engine.settings().models.flash.clone(),
            uptime_seconds: get_uptime_seconds(),
        }),
    })
}

/// Liveness check
///
/// GET /health/live
pub async fn liveness_check() -> Json<HealthResponse> {
    debug!("Executing liveness check");

    Json(HealthResponse {
        status: "alive".to_string(),
        service: "tradejournal-ai".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        details: None,
    })
}

static START_TIME: OnceLock<Instant> = OnceLock::new();

/// Record the process start; later calls keep the first instant
pub(crate) fn mark_started() {
    START_TIME.get_or_init(Instant::now);
}

/// Seconds since the first router was built
fn get_uptime_seconds() -> u64 {
    START_TIME.get_or_init(Instant::now).elapsed().as_secs()
}

//! Error handling module
//!
//! Defines the query error taxonomy and how failures are rendered over HTTP

use crate::models::QueryResponse;
use crate::schema::FieldError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Message returned for quota exhaustion
pub const RATE_LIMIT_MESSAGE: &str =
    "System is currently overloaded (Rate Limit). Please try again in a moment.";

/// Message returned when no credential is configured
pub const MISSING_API_KEY_MESSAGE: &str =
    "API Key is missing. Please check your environment variables.";

/// Canonical Gemini status for quota exhaustion
const RESOURCE_EXHAUSTED_STATUS: &str = "RESOURCE_EXHAUSTED";

/// Phrase Gemini puts in quota error messages
const RESOURCE_EXHAUSTED_PHRASE: &str = "Resource has been exhausted";

/// Failure reported by a provider for a single generation call
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// Non-2xx response
    #[error("Gemini API error: {status} - {message}{}", canonical_suffix(.canonical))]
    Status {
        status: u16,
        /// Provider error message, or the raw body when it is not a Gemini error object
        message: String,
        /// Canonical status, e.g. `RESOURCE_EXHAUSTED`
        canonical: Option<String>,
    },

    /// Request could not be sent or the body could not be read
    #[error("Failed to send request to Gemini: {0}")]
    Network(String),

    /// 2xx response whose envelope could not be decoded
    #[error("Failed to decode Gemini response envelope: {0}")]
    Decode(String),
}

fn canonical_suffix(canonical: &Option<String>) -> String {
    canonical
        .as_deref()
        .map(|status| format!(" [{}]", status))
        .unwrap_or_default()
}

impl ProviderError {
    /// Quota exhaustion, judged from the response status and error fields only
    pub fn is_rate_limit(&self) -> bool {
        match self {
            ProviderError::Status {
                status,
                message,
                canonical,
            } => {
                *status == 429
                    || canonical.as_deref() == Some(RESOURCE_EXHAUSTED_STATUS)
                    || message.contains(RESOURCE_EXHAUSTED_PHRASE)
            }
            ProviderError::Network(_) | ProviderError::Decode(_) => false,
        }
    }
}

/// Query error kinds, for callers that branch on the cause
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Configuration,
    InvalidRequest,
    RateLimited,
    Transport,
    MalformedOutput,
    SchemaViolation,
}

/// Query error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    /// Missing or invalid credential, raised before any network I/O
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Caller contract violation, raised before any network I/O
    #[error("Invalid query request: {0}")]
    InvalidRequest(String),

    /// Provider quota exhausted; holds the raw provider text for logs
    #[error("{}", RATE_LIMIT_MESSAGE)]
    RateLimited(String),

    /// Network, HTTP status or provider error body
    #[error("{0}")]
    Transport(String),

    /// Model text could not be parsed as JSON
    #[error("Model returned malformed JSON: {0}")]
    MalformedOutput(String),

    /// Parsed output does not satisfy the schema
    #[error("Model output failed schema validation: {}", join_field_errors(.0))]
    SchemaViolation(Vec<FieldError>),
}

fn join_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl QueryError {
    /// Classify a provider failure
    pub fn from_provider(error: &ProviderError) -> Self {
        if error.is_rate_limit() {
            QueryError::RateLimited(error.to_string())
        } else {
            QueryError::Transport(error.to_string())
        }
    }

    pub fn missing_api_key() -> Self {
        QueryError::Configuration(MISSING_API_KEY_MESSAGE.to_string())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            QueryError::Configuration(_) => ErrorKind::Configuration,
            QueryError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            QueryError::RateLimited(_) => ErrorKind::RateLimited,
            QueryError::Transport(_) => ErrorKind::Transport,
            QueryError::MalformedOutput(_) => ErrorKind::MalformedOutput,
            QueryError::SchemaViolation(_) => ErrorKind::SchemaViolation,
        }
    }

    pub fn is_rate_limit(&self) -> bool {
        matches!(self, QueryError::RateLimited(_))
    }

    /// Whether the failure is a JSON parse failure, the only kind a
    /// stricter re-prompt is expected to fix
    pub fn is_json_related(&self) -> bool {
        matches!(self, QueryError::MalformedOutput(_))
    }

    /// Violated fields, empty for other kinds
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            QueryError::SchemaViolation(errors) => errors,
            _ => &[],
        }
    }

    /// Get HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            QueryError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            QueryError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            QueryError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            QueryError::Transport(_)
            | QueryError::MalformedOutput(_)
            | QueryError::SchemaViolation(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Get error type string
    pub fn error_type(&self) -> &'static str {
        match self {
            QueryError::Configuration(_) => "configuration_error",
            QueryError::InvalidRequest(_) => "invalid_request_error",
            QueryError::RateLimited(_) => "rate_limit_error",
            QueryError::Transport(_) => "api_error",
            QueryError::MalformedOutput(_) => "malformed_output_error",
            QueryError::SchemaViolation(_) => "schema_violation_error",
        }
    }
}

/// Render the failure as the `QueryResponse` envelope with a matching status
impl IntoResponse for QueryError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!("Query failed: {} - Status code: {}", self, status);
        } else {
            tracing::warn!("Query rejected: {} - Status code: {}", self.error_type(), status);
        }

        let body: QueryResponse<serde_json::Value> = QueryResponse::failure(&self);
        (status, Json(body)).into_response()
    }
}

/// Result type alias
pub type QueryResult<T> = Result<T, QueryError>;

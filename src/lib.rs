//! Trade Journal AI Library
//!
//! Schema-validated, single-attempt query interface to the Gemini text
//! generation API, plus the HTTP smoke-test routes the journal UI calls

pub mod config;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod providers;
pub mod schema;
pub mod services;
pub mod utils;

// Re-export common types
pub use config::Settings;
pub use handlers::{create_router, router_with_engine, AppState};
pub use models::{ModelTier, QueryRequest, QueryResponse};
pub use providers::{GeminiProvider, Provider};
pub use schema::{FieldError, FieldSpec, FieldType, Schema};
pub use services::{JsonRetry, QueryEngine, RetryConfig};
pub use utils::error::{ErrorKind, ProviderError, QueryError, QueryResult};

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Library description
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Get version information
pub fn version_info() -> String {
    format!("{} v{} - {}", NAME, VERSION, DESCRIPTION)
}

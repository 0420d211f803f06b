//! Provider module
//!
//! Defines the Provider trait and the Gemini implementation

pub mod gemini;

use crate::models::gemini::{GeminiRequest, GeminiResponse};
use crate::utils::error::ProviderError;
use async_trait::async_trait;

/// One outbound generation call
#[derive(Debug, Clone, Copy)]
pub struct GenerateCall<'a> {
    /// Resolved model id, e.g. `gemini-1.5-flash`
    pub model: &'a str,
    pub api_key: &'a str,
    pub request: &'a GeminiRequest,
}

/// Provider trait for upstream text-generation APIs
///
/// Implementations perform exactly one request per call. Failures carry the
/// HTTP status and provider error fields; the engine classifies them.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Get the provider name
    fn name(&self) -> &str;

    /// Send a generation request and return the raw response envelope
    async fn generate(&self, call: GenerateCall<'_>) -> Result<GeminiResponse, ProviderError>;
}

pub use gemini::GeminiProvider;

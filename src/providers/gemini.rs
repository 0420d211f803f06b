//! Gemini Provider implementation
//!
//! Calls the Gemini `generateContent` REST endpoint

use super::{GenerateCall, Provider};
use crate::config::GeminiConfig;
use crate::models::gemini::{GeminiErrorResponse, GeminiResponse};
use crate::utils::error::ProviderError;
use crate::utils::logging::{create_request_log_summary, truncate_content};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, error};

/// Gemini Provider
#[derive(Debug, Clone)]
pub struct GeminiProvider {
    client: Client,
    base_url: String,
}

impl GeminiProvider {
    /// Create a provider from the Gemini configuration
    pub fn new(config: &GeminiConfig) -> Result<Self> {
        Self::with_timeout(&config.base_url, config.timeout)
    }

    /// Create a provider for a base URL with a custom timeout
    pub fn with_timeout(base_url: &str, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(concat!("tradejournal-ai/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Build the request URL
    fn build_url(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }
}

#[async_trait]
impl Provider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(&self, call: GenerateCall<'_>) -> Result<GeminiResponse, ProviderError> {
        let url = self.build_url(call.model);

        let log_summary = create_request_log_summary(call.model, call.request);
        if let Ok(summary_json) = serde_json::to_string_pretty(&log_summary) {
            debug!("📤 Gemini Request:\n{}", summary_json);
        }

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", call.api_key)
            .header("Content-Type", "application/json")
            .json(call.request)
            .send()
            .await
            .map_err(network_error)?;

        let status = response.status();
        let body = response.text().await.map_err(network_error)?;

        if status.is_success() {
            debug!("📥 Gemini Raw Response:\n{}", truncate_content(&body, 500));

            return serde_json::from_str::<GeminiResponse>(&body).map_err(|e| {
                ProviderError::Decode(format!("{} in {}", e, truncate_content(&body, 200)))
            });
        }

        let failure = match serde_json::from_str::<GeminiErrorResponse>(&body) {
            Ok(error_response) => ProviderError::Status {
                status: status.as_u16(),
                message: error_response.error.message,
                canonical: error_response.error.status,
            },
            Err(_) => ProviderError::Status {
                status: status.as_u16(),
                message: body,
                canonical: None,
            },
        };

        error!("Gemini API request failed: {}", failure);
        Err(failure)
    }
}

/// Network failure with its full cause chain
fn network_error(e: reqwest::Error) -> ProviderError {
    ProviderError::Network(format!("{:#}", anyhow::Error::new(e)))
}

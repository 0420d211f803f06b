//! Query request and response models

use crate::schema::Schema;
use crate::utils::error::{QueryError, QueryResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Named model tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelTier {
    /// Fast and cheap, good for simple extraction and summaries
    Flash,
    /// Slower and more capable, good for complex strategy analysis
    Pro,
}

impl ModelTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelTier::Flash => "flash",
            ModelTier::Pro => "pro",
        }
    }
}

impl fmt::Display for ModelTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single structured query
///
/// Built once per call and never mutated by the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    /// Tier name or model id; `None` and unknown values use the flash tier
    pub model: Option<String>,
    /// System instruction; `None` uses the configured default persona
    pub system: Option<String>,
    pub prompt: String,
    pub schema: Schema,
    /// Sampling temperature in [0, 1]; `None` uses the configured default
    pub temperature: Option<f32>,
}

impl QueryRequest {
    pub fn new(prompt: impl Into<String>, schema: Schema) -> Self {
        Self {
            model: None,
            system: None,
            prompt: prompt.into(),
            schema,
            temperature: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_tier(self, tier: ModelTier) -> Self {
        self.with_model(tier.as_str())
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Copy of this request with `suffix` appended to the prompt
    pub fn with_prompt_suffix(&self, suffix: &str) -> Self {
        let mut request = self.clone();
        if !suffix.is_empty() {
            request.prompt = format!("{}\n\n{}", self.prompt.trim_end(), suffix);
        }
        request
    }

    /// Check the caller contract before any I/O happens
    pub fn validate(&self) -> QueryResult<()> {
        if self.prompt.trim().is_empty() {
            return Err(QueryError::InvalidRequest("prompt cannot be empty".to_string()));
        }

        if self.schema.is_empty() {
            return Err(QueryError::InvalidRequest(
                "output schema must declare at least one field".to_string(),
            ));
        }

        if let Some(temperature) = self.temperature {
            if !(0.0..=1.0).contains(&temperature) {
                return Err(QueryError::InvalidRequest(format!(
                    "temperature must be between 0 and 1, got {}",
                    temperature
                )));
            }
        }

        Ok(())
    }
}

/// JSON envelope handed to the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_rate_limit: Option<bool>,
}

impl<T> QueryResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            is_rate_limit: None,
        }
    }

    pub fn failure(error: &QueryError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.to_string()),
            is_rate_limit: Some(error.is_rate_limit()),
        }
    }
}

impl<T> From<QueryResult<T>> for QueryResponse<T> {
    fn from(result: QueryResult<T>) -> Self {
        match result {
            Ok(data) => Self::success(data),
            Err(error) => Self::failure(&error),
        }
    }
}

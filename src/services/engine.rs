//! Structured query engine
//!
//! Sends a prompt plus output schema to the model, parses the reply as JSON,
//! validates it against the schema and classifies every failure. One call is
//! one attempt; retries belong to the caller (see `services::retry`).

use crate::config::Settings;
use crate::models::gemini::{GeminiContent, GeminiGenerationConfig, GeminiRequest, GeminiResponse};
use crate::models::QueryRequest;
use crate::providers::{GeminiProvider, GenerateCall, Provider};
use crate::schema::FieldError;
use crate::utils::error::{QueryError, QueryResult};
use crate::utils::logging::truncate_content;
use anyhow::Result;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// MIME type requesting schema-constrained output
const JSON_MIME_TYPE: &str = "application/json";

/// Structured query engine
///
/// Cheap to clone; clones share the provider and settings.
#[derive(Clone)]
pub struct QueryEngine {
    provider: Arc<dyn Provider>,
    settings: Arc<Settings>,
}

impl fmt::Debug for QueryEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryEngine")
            .field("provider", &self.provider.name())
            .field("configured", &self.is_configured())
            .finish()
    }
}

impl QueryEngine {
    /// Create an engine backed by the Gemini REST provider
    pub fn new(settings: Settings) -> Result<Self> {
        let provider = GeminiProvider::new(&settings.gemini)?;
        Ok(Self::with_provider(settings, Arc::new(provider)))
    }

    /// Create an engine with a custom provider
    pub fn with_provider(settings: Settings, provider: Arc<dyn Provider>) -> Self {
        Self {
            provider,
            settings: Arc::new(settings),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Whether a credential is available
    pub fn is_configured(&self) -> bool {
        self.settings.has_api_key()
    }

    /// Run a query and deserialize the validated output into `T`
    pub async fn query<T: DeserializeOwned>(&self, request: &QueryRequest) -> QueryResult<T> {
        let value = self.query_value(request).await?;
        decode(value)
    }

    /// Run a query and return the validated JSON object
    pub async fn query_value(&self, request: &QueryRequest) -> QueryResult<Value> {
        let Some(api_key) = self.settings.gemini.api_key.as_deref() else {
            warn!("Gemini API key is not configured, query rejected");
            return Err(QueryError::missing_api_key());
        };

        request.validate()?;

        let model = self.settings.resolve_model(request.model.as_deref());
        let span = info_span!("query", query_id = %Uuid::new_v4(), model = %model);

        self.execute(api_key, &model, request).instrument(span).await
    }

    async fn execute(&self, api_key: &str, model: &str, request: &QueryRequest) -> QueryResult<Value> {
        let started = Instant::now();
        debug!("Prompt: {}", truncate_content(&request.prompt, 200));

        let gemini_request = self.build_request(request);
        let call = GenerateCall {
            model,
            api_key,
            request: &gemini_request,
        };

        let response = match self.provider.generate(call).await {
            Ok(response) => response,
            Err(e) => {
                if e.is_rate_limit() {
                    warn!("Gemini rate limit hit: {}", e);
                } else {
                    error!("AI Engine Failure: {}", e);
                }
                return Err(QueryError::from_provider(&e));
            }
        };

        let text = extract_text(&response)?;
        let parsed = parse_output(&text).map_err(|e| {
            warn!("Model output is not valid JSON: {}", e);
            e
        })?;

        let data = request.schema.validate(&parsed).map_err(|errors| {
            warn!("Model output violates schema: {} field(s) failed", errors.len());
            QueryError::SchemaViolation(errors)
        })?;

        info!(
            "Query completed - Duration: {:.2}ms",
            started.elapsed().as_secs_f64() * 1000.0
        );
        Ok(data)
    }

    /// Compose the outbound Gemini request, applying configured defaults
    pub fn build_request(&self, request: &QueryRequest) -> GeminiRequest {
        let defaults = &self.settings.query;
        let system = request
            .system
            .clone()
            .unwrap_or_else(|| defaults.default_system.clone());

        GeminiRequest {
            contents: vec![GeminiContent::user(request.prompt.clone())],
            system_instruction: Some(GeminiContent::instruction(system)),
            generation_config: Some(GeminiGenerationConfig {
                temperature: Some(request.temperature.unwrap_or(defaults.default_temperature)),
                max_output_tokens: None,
                response_mime_type: Some(JSON_MIME_TYPE.to_string()),
                response_schema: Some(request.schema.to_provider_schema()),
            }),
        }
    }
}

fn extract_text(response: &GeminiResponse) -> QueryResult<String> {
    response.text().ok_or_else(|| {
        let message = match response.block_reason() {
            Some(reason) => format!("Gemini returned no candidates (blocked: {})", reason),
            None => "Gemini returned no candidates".to_string(),
        };
        error!("{}", message);
        QueryError::Transport(message)
    })
}

/// Parse model text as JSON
///
/// Surrounding whitespace and a single enclosing markdown code fence are tolerated.
pub fn parse_output(text: &str) -> QueryResult<Value> {
    let body = strip_code_fence(text.trim());
    if body.is_empty() {
        return Err(QueryError::MalformedOutput("empty response text".to_string()));
    }

    serde_json::from_str(body).map_err(|e| {
        QueryError::MalformedOutput(format!("{} in {:?}", e, truncate_content(body, 80)))
    })
}

fn strip_code_fence(text: &str) -> &str {
    let Some(inner) = text
        .strip_prefix("```")
        .and_then(|rest| rest.strip_suffix("```"))
    else {
        return text;
    };

    // Opening line may carry a language tag
    match inner.find('\n') {
        Some(newline) => inner[newline + 1..].trim(),
        None => inner.trim(),
    }
}

/// Deserialize a validated object into the caller's type
pub(crate) fn decode<T: DeserializeOwned>(value: Value) -> QueryResult<T> {
    serde_json::from_value(value).map_err(|e| {
        QueryError::SchemaViolation(vec![FieldError {
            path: "$".to_string(),
            message: format!("does not match the requested type: {}", e),
        }])
    })
}

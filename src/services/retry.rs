//! Caller-level JSON retry
//!
//! Re-issues a query with progressively stricter JSON-only wording while the
//! model keeps returning unparseable output. Stops at the first success or the
//! first failure a re-prompt cannot fix (schema violation, rate limit, transport).

use crate::config::Settings;
use crate::models::QueryRequest;
use crate::schema::Schema;
use crate::services::engine::{decode, QueryEngine};
use crate::utils::error::QueryResult;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::{info, warn};

/// Directives appended to the prompt, one per attempt; the last repeats
const JSON_DIRECTIVES: [&str; 3] = [
    "Respond with raw JSON only, matching the fields below. \
     Do not include prose, markdown code fences, or explanations.",
    "IMPORTANT: your entire reply must be a single JSON object that parses as-is. \
     No text before or after it, no ``` fences, no comments.",
    "Your previous reply could not be parsed as JSON. Reply with ONLY the JSON object, \
     starting with '{' and ending with '}', using double-quoted keys and no trailing commas.",
];

/// Retry configuration
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Base delay time (milliseconds)
    pub base_delay_ms: u64,
    /// Maximum delay time (milliseconds)
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 250,
            max_delay_ms: 2000,
        }
    }
}

impl RetryConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            max_attempts: settings.query.json_retry_attempts,
            base_delay_ms: settings.query.json_retry_delay_ms,
            ..Self::default()
        }
    }

    /// Delay before the attempt following `attempt` (0-based), doubling each time
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let delay = self
            .base_delay_ms
            .saturating_mul(1_u64 << attempt.min(16));
        Duration::from_millis(delay.min(self.max_delay_ms))
    }
}

/// JSON-only instruction for the given attempt, followed by the field list
pub fn json_directive(schema: &Schema, attempt: u32) -> String {
    let index = (attempt as usize).min(JSON_DIRECTIVES.len() - 1);
    format!("{}\nFields:\n{}", JSON_DIRECTIVES[index], schema.describe())
}

/// Engine wrapper with JSON retry escalation
#[derive(Debug, Clone)]
pub struct JsonRetry {
    engine: QueryEngine,
    config: RetryConfig,
}

impl JsonRetry {
    pub fn new(engine: QueryEngine, config: RetryConfig) -> Self {
        Self { engine, config }
    }

    /// Use the retry settings the engine was configured with
    pub fn from_engine(engine: QueryEngine) -> Self {
        let config = RetryConfig::from_settings(engine.settings());
        Self::new(engine, config)
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Get inner engine reference
    pub fn inner(&self) -> &QueryEngine {
        &self.engine
    }

    pub async fn query<T: DeserializeOwned>(&self, request: &QueryRequest) -> QueryResult<T> {
        let value = self.query_value(request).await?;
        decode(value)
    }

    pub async fn query_value(&self, request: &QueryRequest) -> QueryResult<Value> {
        // The directive suffix would mask an empty prompt
        request.validate()?;

        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            let directive = json_directive(&request.schema, attempt);
            let stricter = request.with_prompt_suffix(&directive);

            match self.engine.query_value(&stricter).await {
                Ok(data) => {
                    if attempt > 0 {
                        info!("Query succeeded after {} attempts", attempt + 1);
                    }
                    return Ok(data);
                }
                Err(e) if e.is_json_related() && attempt + 1 < max_attempts => {
                    let delay = self.config.delay_for(attempt);
                    warn!(
                        "Model reply was not valid JSON, retrying with stricter wording after {}ms (attempt {}/{})",
                        delay.as_millis(),
                        attempt + 2,
                        max_attempts
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

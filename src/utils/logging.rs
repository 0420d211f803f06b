//! Logging utilities
//!
//! Subscriber setup and helpers that keep prompt text out of logs at full length

use crate::config::LoggingConfig;
use crate::models::gemini::{GeminiContent, GeminiRequest};
use anyhow::Result;

/// Set to true to include full prompts and schemas in debug logs
pub const VERBOSE_REQUEST_LOGGING: bool = false;

/// Initialize the global tracing subscriber
///
/// `RUST_LOG` directives take precedence over the configured level.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.level));

    let subscriber: Box<dyn tracing::Subscriber + Send + Sync> = if config.format == "json" {
        // JSON format logs (production environment)
        Box::new(
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .json()
                .with_current_span(true)
                .with_span_list(false)
                .finish(),
        )
    } else {
        // Human readable format (development environment)
        Box::new(
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .finish(),
        )
    };

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to set tracing subscriber: {}", e))?;

    Ok(())
}

/// Truncate a string with a note about original length
pub fn truncate_content(s: &str, max_len: usize) -> String {
    if s.chars().count() > max_len {
        let kept: String = s.chars().take(max_len).collect();
        format!("{}... ({} chars truncated)", kept, s.chars().count() - max_len)
    } else {
        s.to_string()
    }
}

fn content_preview(content: &GeminiContent, max_len: usize) -> serde_json::Value {
    serde_json::Value::String(truncate_content(&content.joined_text(), max_len))
}

/// Create a filtered summary of a Gemini request for logging
pub fn create_request_log_summary(model: &str, request: &GeminiRequest) -> serde_json::Value {
    if VERBOSE_REQUEST_LOGGING {
        return serde_json::to_value(request).unwrap_or(serde_json::json!({"error": "serialize failed"}));
    }

    let contents: Vec<serde_json::Value> = request
        .contents
        .iter()
        .map(|content| content_preview(content, 200))
        .collect();

    let config = request.generation_config.as_ref();

    serde_json::json!({
        "model": model,
        "system": request.system_instruction.as_ref().map(|s| content_preview(s, 100)),
        "contents": contents,
        "temperature": config.and_then(|c| c.temperature),
        "response_mime_type": config.and_then(|c| c.response_mime_type.clone()),
        "response_schema": config.and_then(|c| c.response_schema.as_ref()).map(|_| "[present]"),
    })
}

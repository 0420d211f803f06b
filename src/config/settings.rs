//! Application configuration settings
//!
//! Defines all configuration structures and loading logic

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Default Gemini REST endpoint
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default system instruction sent with every query
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant.";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Server configuration
    pub server: ServerConfig,
    /// Gemini API configuration
    pub gemini: GeminiConfig,
    /// Model tier configuration
    pub models: ModelTiers,
    /// Query defaults
    pub query: QueryConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen host
    pub host: String,
    /// Listen port
    pub port: u16,
}

/// Gemini API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// API key, `None` when the credential is not configured
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// API base URL
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout: u64,
}

/// Named model tiers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelTiers {
    /// Fast, cheap model used by default (simple extraction, summaries)
    pub flash: String,
    /// Capable, expensive model (complex strategy analysis)
    pub pro: String,
}

/// Defaults applied to queries that leave options unset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Temperature used when a request does not set one
    pub default_temperature: f32,
    /// System instruction used when a request does not set one
    pub default_system: String,
    /// Attempts made by the JSON retry escalation
    pub json_retry_attempts: u32,
    /// Base delay between JSON retry attempts in milliseconds
    pub json_retry_delay_ms: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
    /// Log format (text/json)
    pub format: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3001,
            },
            gemini: GeminiConfig {
                api_key: None,
                base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
                timeout: 30,
            },
            models: ModelTiers {
                flash: "gemini-1.5-flash".to_string(),
                pro: "gemini-1.5-pro".to_string(),
            },
            query: QueryConfig {
                default_temperature: 0.7,
                default_system: DEFAULT_SYSTEM_PROMPT.to_string(),
                json_retry_attempts: 3,
                json_retry_delay_ms: 250,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "text".to_string(),
            },
        }
    }
}

impl Settings {
    /// Create a new configuration instance from the process environment
    pub fn new() -> Result<Self> {
        // Load .env file if it exists
        dotenv::dotenv().ok();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup
    ///
    /// `new()` passes the process environment; tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        // A missing key is reported by the caller once logging is up
        let api_key = lookup("GOOGLE_GENAI_API_KEY")
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());

        let settings = Self {
            server: ServerConfig {
                host: get("SERVER_HOST", "0.0.0.0"),
                port: get("SERVER_PORT", "3001")
                    .parse()
                    .context("Invalid port number")?,
            },
            gemini: GeminiConfig {
                api_key,
                base_url: get("GEMINI_BASE_URL", DEFAULT_GEMINI_BASE_URL),
                timeout: get("REQUEST_TIMEOUT", "30")
                    .parse()
                    .context("Invalid timeout value")?,
            },
            models: ModelTiers {
                flash: get("GEMINI_FLASH_MODEL", "gemini-1.5-flash"),
                pro: get("GEMINI_PRO_MODEL", "gemini-1.5-pro"),
            },
            query: QueryConfig {
                default_temperature: get("AI_DEFAULT_TEMPERATURE", "0.7")
                    .parse()
                    .context("Invalid default temperature")?,
                default_system: get("AI_DEFAULT_SYSTEM", DEFAULT_SYSTEM_PROMPT),
                json_retry_attempts: get("AI_JSON_RETRY_ATTEMPTS", "3")
                    .parse()
                    .context("Invalid JSON retry attempts")?,
                json_retry_delay_ms: get("AI_JSON_RETRY_DELAY_MS", "250")
                    .parse()
                    .context("Invalid JSON retry delay")?,
            },
            logging: LoggingConfig {
                level: get("RUST_LOG", "info"),
                format: get("LOG_FORMAT", "text"),
            },
        };

        settings.validate()?;

        Ok(settings)
    }

    /// Validate configuration validity
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("Port number cannot be 0");
        }

        // A missing key is allowed: the engine reports it per query
        if let Some(api_key) = &self.gemini.api_key {
            if api_key.contains(char::is_whitespace) {
                anyhow::bail!("Gemini API key cannot contain whitespace characters");
            }
        }

        if !self.gemini.base_url.starts_with("http") {
            anyhow::bail!("Invalid Gemini base URL format, should start with 'http'");
        }

        if self.gemini.timeout == 0 {
            anyhow::bail!("Timeout values cannot be 0");
        }

        if self.models.flash.trim().is_empty() || self.models.pro.trim().is_empty() {
            anyhow::bail!("Model identifiers cannot be empty");
        }

        if !(0.0..=1.0).contains(&self.query.default_temperature) {
            anyhow::bail!(
                "Default temperature must be between 0 and 1, got {}",
                self.query.default_temperature
            );
        }

        if self.query.json_retry_attempts == 0 {
            anyhow::bail!("JSON retry attempts cannot be 0");
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            anyhow::bail!("Invalid log level: {}", self.logging.level);
        }

        let valid_formats = ["text", "json"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            anyhow::bail!("Invalid log format: {}", self.logging.format);
        }

        Ok(())
    }

    /// Whether a Gemini credential is configured
    pub fn has_api_key(&self) -> bool {
        self.gemini.api_key.is_some()
    }

    /// Resolve a requested model name to a configured model id
    ///
    /// Configured ids are used as-is. Other names pick a tier by a whole
    /// `flash` or `pro` token (`gemini-pro-latest`), and `None` or anything
    /// else resolves to the flash tier.
    pub fn resolve_model(&self, requested: Option<&str>) -> String {
        let Some(requested) = requested else {
            return self.models.flash.clone();
        };

        if requested == self.models.flash || requested == self.models.pro {
            return requested.to_string();
        }

        let lowered = requested.to_lowercase();
        let has_token = |token: &str| {
            lowered
                .split(|c: char| !c.is_ascii_alphanumeric())
                .any(|part| part == token)
        };

        if has_token("flash") {
            self.models.flash.clone()
        } else if has_token("pro") {
            self.models.pro.clone()
        } else {
            warn!("Unknown model: {}, using default flash model", requested);
            self.models.flash.clone()
        }
    }
}

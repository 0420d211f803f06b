//! Configuration tests
//!
//! Settings are built from a plain map so no test touches the process environment

use std::collections::HashMap;
use tradejournal_ai::config::settings::{DEFAULT_GEMINI_BASE_URL, DEFAULT_SYSTEM_PROMPT};
use tradejournal_ai::Settings;

fn settings_from(pairs: &[(&str, &str)]) -> anyhow::Result<Settings> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Settings::from_lookup(|key| map.get(key).cloned())
}

#[test]
fn test_defaults_without_environment() {
    let settings = settings_from(&[]).unwrap();

    assert_eq!(settings.server.host, "0.0.0.0");
    assert_eq!(settings.server.port, 3001);
    assert_eq!(settings.gemini.api_key, None);
    assert_eq!(settings.gemini.base_url, DEFAULT_GEMINI_BASE_URL);
    assert_eq!(settings.gemini.timeout, 30);
    assert_eq!(settings.models.flash, "gemini-1.5-flash");
    assert_eq!(settings.models.pro, "gemini-1.5-pro");
    assert_eq!(settings.query.default_temperature, 0.7);
    assert_eq!(settings.query.default_system, DEFAULT_SYSTEM_PROMPT);
    assert_eq!(settings.query.json_retry_attempts, 3);
    assert!(!settings.has_api_key());
}

#[test]
fn test_full_environment() {
    let settings = settings_from(&[
        ("GOOGLE_GENAI_API_KEY", "  AIzaTestKey  "),
        ("GEMINI_BASE_URL", "http://localhost:9000/v1beta"),
        ("REQUEST_TIMEOUT", "12"),
        ("GEMINI_FLASH_MODEL", "gemini-2.0-flash"),
        ("GEMINI_PRO_MODEL", "gemini-2.0-pro"),
        ("AI_DEFAULT_TEMPERATURE", "0.2"),
        ("AI_DEFAULT_SYSTEM", "You are a trading assistant."),
        ("AI_JSON_RETRY_ATTEMPTS", "5"),
        ("AI_JSON_RETRY_DELAY_MS", "0"),
        ("SERVER_HOST", "127.0.0.1"),
        ("SERVER_PORT", "8080"),
        ("RUST_LOG", "debug"),
        ("LOG_FORMAT", "json"),
    ])
    .unwrap();

    assert_eq!(settings.gemini.api_key.as_deref(), Some("AIzaTestKey"));
    assert_eq!(settings.gemini.base_url, "http://localhost:9000/v1beta");
    assert_eq!(settings.gemini.timeout, 12);
    assert_eq!(settings.models.flash, "gemini-2.0-flash");
    assert_eq!(settings.query.default_temperature, 0.2);
    assert_eq!(settings.query.default_system, "You are a trading assistant.");
    assert_eq!(settings.query.json_retry_attempts, 5);
    assert_eq!(settings.query.json_retry_delay_ms, 0);
    assert_eq!(settings.server.host, "127.0.0.1");
    assert_eq!(settings.server.port, 8080);
    assert_eq!(settings.logging.level, "debug");
    assert_eq!(settings.logging.format, "json");
}

#[test]
fn test_blank_api_key_counts_as_missing() {
    let settings = settings_from(&[("GOOGLE_GENAI_API_KEY", "   ")]).unwrap();
    assert!(!settings.has_api_key());
}

#[test]
fn test_invalid_values_are_rejected() {
    assert!(settings_from(&[("SERVER_PORT", "not-a-port")]).is_err());
    assert!(settings_from(&[("SERVER_PORT", "0")]).is_err());
    assert!(settings_from(&[("REQUEST_TIMEOUT", "0")]).is_err());
    assert!(settings_from(&[("GEMINI_BASE_URL", "ftp://example.com")]).is_err());
    assert!(settings_from(&[("AI_DEFAULT_TEMPERATURE", "1.5")]).is_err());
    assert!(settings_from(&[("AI_JSON_RETRY_ATTEMPTS", "0")]).is_err());
    assert!(settings_from(&[("RUST_LOG", "verbose")]).is_err());
    assert!(settings_from(&[("LOG_FORMAT", "xml")]).is_err());
    assert!(settings_from(&[("GOOGLE_GENAI_API_KEY", "abc def")]).is_err());
}

#[test]
fn test_model_resolution() {
    let settings = Settings::default();

    assert_eq!(settings.resolve_model(None), "gemini-1.5-flash");
    assert_eq!(settings.resolve_model(Some("gemini-1.5-pro")), "gemini-1.5-pro");
    assert_eq!(settings.resolve_model(Some("Gemini-Pro-Latest")), "gemini-1.5-pro");
    assert_eq!(settings.resolve_model(Some("gemini-flash")), "gemini-1.5-flash");
    assert_eq!(settings.resolve_model(Some("gpt-4o")), "gemini-1.5-flash");
    assert_eq!(settings.resolve_model(Some("gemini-2.0-pro-exp")), "gemini-1.5-pro");
}

#[test]
fn test_model_resolution_matches_whole_tokens() {
    let settings = Settings::default();

    // "pro" inside another word is not a tier name
    assert_eq!(settings.resolve_model(Some("prompt-tuned")), "gemini-1.5-flash");
    assert_eq!(settings.resolve_model(Some("product")), "gemini-1.5-flash");
    assert_eq!(settings.resolve_model(Some("improved-model")), "gemini-1.5-flash");
    assert_eq!(settings.resolve_model(Some("flashcards-pro")), "gemini-1.5-pro");
}

#[test]
fn test_api_key_is_not_serialized() {
    let mut settings = Settings::default();
    settings.gemini.api_key = Some("secret-key".to_string());

    let rendered = serde_json::to_string(&settings).unwrap();
    assert!(!rendered.contains("secret-key"));
}

//! Configuration management module
//!
//! Loads the process-wide settings once at startup: Gemini credential, model tiers, query defaults

pub mod settings;

pub use settings::{GeminiConfig, LoggingConfig, ModelTiers, QueryConfig, ServerConfig, Settings};

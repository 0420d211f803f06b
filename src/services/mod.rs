//! Service layer module
//!
//! Contains the structured query engine and the caller-level JSON retry

pub mod engine;
pub mod retry;

pub use engine::{parse_output, QueryEngine};
pub use retry::{json_directive, JsonRetry, RetryConfig};

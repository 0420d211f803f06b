//! Data models module
//!
//! Defines the query request/response types and the Gemini wire structures

pub mod gemini;
pub mod query;

pub use query::{ModelTier, QueryRequest, QueryResponse};

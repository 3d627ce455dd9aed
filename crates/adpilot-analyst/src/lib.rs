//! # adpilot-analyst
//!
//! Client for the external LLM analyst. Speaks one request/response contract
//! and translates to/from domain types; stateless, so retries are safe.

pub mod anthropic;
pub mod client;
pub mod mock;

pub use anthropic::AnthropicAnalyst;
pub use client::{
    AnalysisRequest, AnalysisResponse, Analyst, GuardrailSummary, OverallHealth,
};
pub use mock::MockAnalyst;

use thiserror::Error;

use crate::types::PlatformId;

/// Errors surfaced by a platform adapter. Every remote failure is folded into
/// one of these kinds; the engine dispatches on the tag, never on a transport
/// exception type.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AdapterError {
    #[error("auth token expired")]
    AuthExpired,

    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("transient platform error: {0}")]
    Transient(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("campaign not found: {0}")]
    NotFound(String),

    #[error("platform unavailable: {0}")]
    Unavailable(String),
}

impl AdapterError {
    /// Whether a bounded in-adapter retry is worth attempting.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// Unified error type for the adpilot core.
#[derive(Error, Debug)]
pub enum PilotError {
    // ── Adapter errors ─────────────────────────────────────────
    #[error("adapter error on {platform}: {source}")]
    Adapter {
        platform: PlatformId,
        #[source]
        source: AdapterError,
    },

    // ── Analyst errors ─────────────────────────────────────────
    #[error("analyst request timed out after {0}s")]
    AnalystTimeout(u64),

    #[error("analyst response malformed: {0}")]
    AnalystMalformed(String),

    #[error("analyst transport error: {0}")]
    AnalystTransport(String),

    // ── Guardrail / engine errors ──────────────────────────────
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("approval conflict: {0}")]
    ApprovalConflict(String),

    #[error("tick deadline exceeded in {phase}")]
    TickDeadline { phase: String },

    #[error("tick lease unavailable: {0}")]
    LeaseUnavailable(String),

    // ── Ledger errors ──────────────────────────────────────────
    #[error("ledger error: {0}")]
    Ledger(String),

    // ── Config errors ──────────────────────────────────────────
    #[error("config error: {0}")]
    Config(String),

    // ── Generic wrappers ───────────────────────────────────────
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl PilotError {
    pub fn adapter(platform: PlatformId, source: AdapterError) -> Self {
        Self::Adapter { platform, source }
    }
}

pub type Result<T> = std::result::Result<T, PilotError>;

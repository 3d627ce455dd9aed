//! # adpilot-config
//!
//! Configuration system for the adpilot core. Reads from `adpilot.toml`,
//! environment variables, and CLI overrides, in that precedence order.
//!
//! Supports hot-reload via filesystem watcher.

pub mod loader;
pub mod schema;

pub use loader::ConfigLoader;
pub use schema::{
    AnalystConfig, ConfigWarning, EngineConfig, GuardrailsConfig, LedgerConfig, LoggingConfig,
    PerCampaignGuardrails, PilotConfig, PlatformConfig, WarningSeverity,
};

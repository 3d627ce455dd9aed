//! # adpilot-cli
//!
//! Command-line interface for the adpilot optimization core.
//!
//! ## Commands
//!
//! - `adpilot start`: run the decision engine loop
//! - `adpilot tick`: run exactly one tick and print the summary
//! - `adpilot approvals`: list, approve, or reject queued proposals
//! - `adpilot actions`: show recent ledger actions
//! - `adpilot check`: validate config and probe adapter health

pub mod commands;

pub use commands::Cli;

//! # adpilot-ledger
//!
//! The append-only, time-indexed history of every consequential event in the
//! system: proposals and their decisions, executions, tick failures, counter
//! rollovers, and config changes, plus the metric sample log and the
//! read-mostly campaign table. The ledger is the source of truth for
//! "what did the system do, and why, at time T?".

pub mod store;

pub use store::{ExecutedAdjustment, Ledger};

//! # adpilot-engine
//!
//! The decision engine: drives the fetch → analyze → decide → gate →
//! execute → audit loop at a fixed wall-clock cadence, owns the tick
//! transaction and the daily counters, and exposes the inbound control
//! surface (approvals, recent actions, guardrail overrides).

pub mod alerts;
pub mod control;
pub mod engine;
pub mod lease;
pub mod scheduler;
pub mod tick;

pub use engine::DecisionEngine;
pub use lease::Lease;
pub use scheduler::{next_boundary, TickScheduler};
pub use tick::{TickOutcome, TickPhase, TickSummary};

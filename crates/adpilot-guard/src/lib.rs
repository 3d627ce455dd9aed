//! # adpilot-guard
//!
//! The guardrail and approval system: automation levels, the deterministic
//! ordered classification rules, daily execution counters, time-boxed
//! overrides, and the human-approval queue.

pub mod approval;
pub mod counters;
pub mod level;
pub mod overrides;
pub mod rules;

pub use approval::{ApprovalQueue, PendingApproval};
pub use counters::DailyCounters;
pub use level::AutomationLevel;
pub use overrides::{GuardrailOverride, OverrideField, OverrideScope, OverrideStore};
pub use rules::{EffectiveGuardrails, GateContext, GateRule, GuardrailGate};

//! # adpilot-core
//!
//! Core types, errors, and primitives for the adpilot autonomous ad-budget
//! optimizer. This crate defines the shared vocabulary used by every other
//! crate in the workspace.

pub mod action;
pub mod campaign;
pub mod error;
pub mod metrics;
pub mod proposal;
pub mod types;

pub use action::{ActionOutcome, ActionRecord, Decision, EventKind, Invariant, Justification, Verdict};
pub use campaign::{Campaign, CampaignStatus, StateSnapshot};
pub use error::{AdapterError, PilotError, Result};
pub use metrics::MetricSample;
pub use proposal::{ExpectedImpact, Proposal, ProposalKind};
pub use types::{CampaignRef, DateRange, Money, PlatformId};

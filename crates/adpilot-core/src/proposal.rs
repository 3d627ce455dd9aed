use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::campaign::StateSnapshot;
use crate::types::CampaignRef;

/// The fixed set of actions the analyst may propose. Analyst output that does
/// not fit this union is rejected at the boundary, never best-effort parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProposalKind {
    Pause,
    Resume,
    IncreaseBudget,
    DecreaseBudget,
    Reallocate,
    CreateCampaign,
    StrategyChange,
}

impl ProposalKind {
    /// Budget-moving kinds, for ordering and counter accounting.
    pub fn moves_budget(&self) -> bool {
        matches!(
            self,
            Self::IncreaseBudget | Self::DecreaseBudget | Self::Reallocate
        )
    }

    /// Kinds executed before increases within a tick, so the platform budget
    /// ceiling holds at every intermediate point.
    pub fn is_reducing(&self) -> bool {
        matches!(self, Self::Pause | Self::DecreaseBudget)
    }
}

impl std::fmt::Display for ProposalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pause => "PAUSE",
            Self::Resume => "RESUME",
            Self::IncreaseBudget => "INCREASE_BUDGET",
            Self::DecreaseBudget => "DECREASE_BUDGET",
            Self::Reallocate => "REALLOCATE",
            Self::CreateCampaign => "CREATE_CAMPAIGN",
            Self::StrategyChange => "STRATEGY_CHANGE",
        };
        f.write_str(s)
    }
}

/// Analyst-estimated effect of applying a proposal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpectedImpact {
    pub metric: String,
    pub change_percent: f64,
}

/// A single suggested change produced by the analyst. Consumed exactly once
/// by the guardrail gate; the id doubles as the idempotency key on adapter
/// writes and the uniqueness key in the action ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: Uuid,
    pub campaign: CampaignRef,
    pub kind: ProposalKind,
    pub from_state: StateSnapshot,
    pub to_state: StateSnapshot,
    /// Analyst confidence in [0, 1].
    pub confidence: f64,
    pub reasoning: String,
    pub expected_impact: ExpectedImpact,
    pub produced_at: DateTime<Utc>,
}

impl Proposal {
    /// Absolute budget delta this proposal would apply.
    pub fn budget_delta(&self) -> crate::types::Money {
        self.to_state.daily_budget.abs_delta(self.from_state.daily_budget)
    }

    /// Signed budget delta (positive for increases).
    pub fn signed_budget_delta(&self) -> crate::types::Money {
        self.to_state.daily_budget - self.from_state.daily_budget
    }

    /// Change as a fraction of the pre-tick budget (0 when that budget is 0).
    pub fn change_fraction(&self) -> f64 {
        self.budget_delta().fraction_of(self.from_state.daily_budget)
    }
}

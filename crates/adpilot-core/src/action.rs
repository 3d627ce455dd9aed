use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::campaign::StateSnapshot;
use crate::types::CampaignRef;

/// The gate's verdict on a proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    AutoExecute,
    ApprovalRequired,
    Rejected,
}

/// The budget invariants the gate re-checks before any execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Invariant {
    /// Sum of enabled daily budgets on a platform must stay under its ceiling.
    PlatformCeiling,
    /// Auto-executed adjustments per day are capped.
    DailyAdjustmentCap,
    /// Cumulative per-campaign budget delta per day is bounded.
    CampaignDailyDelta,
}

impl std::fmt::Display for Invariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::PlatformCeiling => "PLATFORM_CEILING",
            Self::DailyAdjustmentCap => "DAILY_ADJUSTMENT_CAP",
            Self::CampaignDailyDelta => "CAMPAIGN_DAILY_DELTA",
        };
        f.write_str(s)
    }
}

/// Which rule produced the verdict. Every decision names the clause that
/// fired, so the ledger can always answer "why".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Justification {
    LowConfidence,
    InsufficientRuntime,
    InvariantViolation(Invariant),
    MajorChange,
    HighImpactKind,
    WithinLimits,
    /// Advisory automation level escalates everything that would auto-execute.
    AdvisoryMode,
    /// The analyst named a campaign the system has never confirmed.
    UnknownCampaign,
}

impl std::fmt::Display for Justification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LowConfidence => f.write_str("LOW_CONFIDENCE"),
            Self::InsufficientRuntime => f.write_str("INSUFFICIENT_RUNTIME"),
            Self::InvariantViolation(inv) => write!(f, "INVARIANT_VIOLATION({inv})"),
            Self::MajorChange => f.write_str("MAJOR_CHANGE"),
            Self::HighImpactKind => f.write_str("HIGH_IMPACT_KIND"),
            Self::WithinLimits => f.write_str("WITHIN_LIMITS"),
            Self::AdvisoryMode => f.write_str("ADVISORY_MODE"),
            Self::UnknownCampaign => f.write_str("UNKNOWN_CAMPAIGN"),
        }
    }
}

/// A verdict plus the rule that produced it. Immutable once written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub verdict: Verdict,
    pub justification: Justification,
}

impl Decision {
    pub fn new(verdict: Verdict, justification: Justification) -> Self {
        Self {
            verdict,
            justification,
        }
    }

    pub fn rejected(justification: Justification) -> Self {
        Self::new(Verdict::Rejected, justification)
    }

    pub fn approval_required(justification: Justification) -> Self {
        Self::new(Verdict::ApprovalRequired, justification)
    }

    pub fn auto_execute() -> Self {
        Self::new(Verdict::AutoExecute, Justification::WithinLimits)
    }
}

/// Terminal fate of a proposal's execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionOutcome {
    Success,
    Failed,
    Cancelled,
    Expired,
}

impl std::fmt::Display for ActionOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Success => "SUCCESS",
            Self::Failed => "FAILED",
            Self::Cancelled => "CANCELLED",
            Self::Expired => "EXPIRED",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for ActionOutcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SUCCESS" => Ok(Self::Success),
            "FAILED" => Ok(Self::Failed),
            "CANCELLED" => Ok(Self::Cancelled),
            "EXPIRED" => Ok(Self::Expired),
            other => Err(format!("unknown action outcome: {other}")),
        }
    }
}

/// The ledger row summarising a proposal's fate. Exactly one exists per
/// proposal; `after_state` is populated from the post-execution read-back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRecord {
    pub id: Uuid,
    pub proposal_id: Uuid,
    pub campaign: CampaignRef,
    pub kind: crate::proposal::ProposalKind,
    pub decision: Decision,
    pub before_state: StateSnapshot,
    pub after_state: Option<StateSnapshot>,
    pub outcome: Option<ActionOutcome>,
    pub error: Option<String>,
    pub executed_at: Option<DateTime<Utc>>,
    pub recorded_at: DateTime<Utc>,
}

/// Non-action events the ledger records: tick lifecycle, platform exclusions,
/// configuration changes, counter rollovers, derived alerts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    TickFailed,
    TickSkipped,
    PlatformExcluded,
    ConfigChange,
    CounterRollover,
    Alert,
    Critical,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::TickFailed => "TICK_FAILED",
            Self::TickSkipped => "TICK_SKIPPED",
            Self::PlatformExcluded => "PLATFORM_EXCLUDED",
            Self::ConfigChange => "CONFIG_CHANGE",
            Self::CounterRollover => "COUNTER_ROLLOVER",
            Self::Alert => "ALERT",
            Self::Critical => "CRITICAL",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TICK_FAILED" => Ok(Self::TickFailed),
            "TICK_SKIPPED" => Ok(Self::TickSkipped),
            "PLATFORM_EXCLUDED" => Ok(Self::PlatformExcluded),
            "CONFIG_CHANGE" => Ok(Self::ConfigChange),
            "COUNTER_ROLLOVER" => Ok(Self::CounterRollover),
            "ALERT" => Ok(Self::Alert),
            "CRITICAL" => Ok(Self::Critical),
            other => Err(format!("unknown event kind: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn justification_display() {
        assert_eq!(Justification::LowConfidence.to_string(), "LOW_CONFIDENCE");
        assert_eq!(
            Justification::InvariantViolation(Invariant::DailyAdjustmentCap).to_string(),
            "INVARIANT_VIOLATION(DAILY_ADJUSTMENT_CAP)"
        );
    }

    #[test]
    fn outcome_roundtrip() {
        for o in [
            ActionOutcome::Success,
            ActionOutcome::Failed,
            ActionOutcome::Cancelled,
            ActionOutcome::Expired,
        ] {
            assert_eq!(o.to_string().parse::<ActionOutcome>().unwrap(), o);
        }
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use adpilot_analyst::OverallHealth;
use adpilot_core::PlatformId;

/// The tick state machine. A tick advances through these states in order;
/// any state may transition to `Failed` on unrecoverable error, which is
/// ledgered as TICK_FAILED before the engine returns to idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TickPhase {
    Idle,
    Collecting,
    Analyzing,
    Gating,
    Executing,
    Auditing,
    Failed,
}

impl std::fmt::Display for TickPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "IDLE",
            Self::Collecting => "COLLECTING",
            Self::Analyzing => "ANALYZING",
            Self::Gating => "GATING",
            Self::Executing => "EXECUTING",
            Self::Auditing => "AUDITING",
            Self::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

/// How a tick ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TickOutcome {
    Completed,
    /// The lease was held (a tick is already in flight) or a boundary was
    /// overrun; nothing ran.
    Skipped,
    /// The tick aborted; `phase` names where.
    Failed { phase: TickPhase },
}

/// Structured result of one tick, logged and returned by the one-shot
/// `tick` command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcome: TickOutcome,
    pub final_phase: TickPhase,
    pub overall_health: Option<OverallHealth>,
    pub platforms_collected: usize,
    pub platforms_excluded: Vec<PlatformId>,
    pub samples_collected: usize,
    pub proposals_seen: usize,
    pub executed: usize,
    pub failed: usize,
    pub queued_for_approval: usize,
    pub rejected: usize,
    pub cancelled: usize,
    /// Proposals whose action row already existed (tick replay).
    pub replayed: usize,
    pub alerts: usize,
}

impl TickSummary {
    pub fn started(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            finished_at: started_at,
            outcome: TickOutcome::Completed,
            final_phase: TickPhase::Idle,
            overall_health: None,
            platforms_collected: 0,
            platforms_excluded: Vec::new(),
            samples_collected: 0,
            proposals_seen: 0,
            executed: 0,
            failed: 0,
            queued_for_approval: 0,
            rejected: 0,
            cancelled: 0,
            replayed: 0,
            alerts: 0,
        }
    }

    pub fn skipped(started_at: DateTime<Utc>) -> Self {
        let mut summary = Self::started(started_at);
        summary.outcome = TickOutcome::Skipped;
        summary
    }
}

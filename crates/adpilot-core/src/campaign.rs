use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{CampaignRef, Money};

/// Campaign lifecycle status as confirmed by the owning platform.
/// Campaigns are never deleted; a campaign that disappears from a platform
/// transitions to `Removed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CampaignStatus {
    Enabled,
    Paused,
    Removed,
}

impl std::fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Enabled => "ENABLED",
            Self::Paused => "PAUSED",
            Self::Removed => "REMOVED",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for CampaignStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ENABLED" => Ok(Self::Enabled),
            "PAUSED" => Ok(Self::Paused),
            "REMOVED" => Ok(Self::Removed),
            other => Err(format!("unknown campaign status: {other}")),
        }
    }
}

/// Confirmed platform state of a campaign, in canonical units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Campaign {
    pub reference: CampaignRef,
    pub name: String,
    pub status: CampaignStatus,
    /// Daily budget in the canonical currency.
    pub daily_budget: Money,
    pub objective: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Campaign {
    /// Age of the campaign at `now`, in whole hours.
    pub fn age_hours(&self, now: DateTime<Utc>) -> i64 {
        (now - self.created_at).num_hours()
    }

    /// The status+budget pair captured for before/after ledger snapshots.
    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            status: self.status,
            daily_budget: self.daily_budget,
        }
    }
}

/// The minimal state a proposal moves a campaign between, and the shape
/// recorded as `before_state`/`after_state` on every action record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub status: CampaignStatus,
    pub daily_budget: Money,
}

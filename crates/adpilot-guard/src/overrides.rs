//! Time-boxed guardrail overrides.
//!
//! The control surface can tighten or loosen a threshold for a bounded time,
//! globally or for one campaign. Overrides expire on read; writing one is
//! ledgered as a CONFIG_CHANGE by the caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use adpilot_core::CampaignRef;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum OverrideScope {
    Global,
    Campaign { campaign: CampaignRef },
}

impl OverrideScope {
    fn applies_to(&self, campaign: Option<&CampaignRef>) -> bool {
        match self {
            Self::Global => true,
            Self::Campaign { campaign: scoped } => campaign == Some(scoped),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverrideField {
    ConfidenceThreshold,
    MajorChangeFraction,
    MaxDailyAdjustments,
    MaxSingleBudgetIncreaseFraction,
    MinCampaignRuntimeHours,
}

impl std::fmt::Display for OverrideField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::ConfidenceThreshold => "confidence_threshold",
            Self::MajorChangeFraction => "major_change_fraction",
            Self::MaxDailyAdjustments => "max_daily_adjustments",
            Self::MaxSingleBudgetIncreaseFraction => "max_single_budget_increase_fraction",
            Self::MinCampaignRuntimeHours => "min_campaign_runtime_hours",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuardrailOverride {
    pub id: Uuid,
    pub scope: OverrideScope,
    pub field: OverrideField,
    pub value: f64,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// In-memory set of live overrides, newest-wins per field and scope.
#[derive(Debug, Default)]
pub struct OverrideStore {
    entries: Vec<GuardrailOverride>,
}

impl OverrideStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        scope: OverrideScope,
        field: OverrideField,
        value: f64,
        ttl: chrono::Duration,
        now: DateTime<Utc>,
    ) -> GuardrailOverride {
        let entry = GuardrailOverride {
            id: Uuid::new_v4(),
            scope,
            field,
            value,
            expires_at: now + ttl,
            created_at: now,
        };
        self.entries.push(entry.clone());
        entry
    }

    /// Drop expired entries. Returns how many were pruned.
    pub fn prune_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| e.expires_at > now);
        before - self.entries.len()
    }

    pub fn live(&self, now: DateTime<Utc>) -> Vec<&GuardrailOverride> {
        self.entries.iter().filter(|e| e.expires_at > now).collect()
    }

    /// The newest live value for a field visible to `campaign`
    /// (campaign-scoped overrides shadow global ones).
    pub fn value_for(
        &self,
        field: OverrideField,
        campaign: Option<&CampaignRef>,
        now: DateTime<Utc>,
    ) -> Option<f64> {
        let campaign_scoped = self
            .entries
            .iter()
            .filter(|e| e.expires_at > now && e.field == field)
            .filter(|e| matches!(e.scope, OverrideScope::Campaign { .. }) && e.scope.applies_to(campaign))
            .max_by_key(|e| e.created_at);
        if let Some(entry) = campaign_scoped {
            return Some(entry.value);
        }
        self.entries
            .iter()
            .filter(|e| e.expires_at > now && e.field == field)
            .filter(|e| e.scope == OverrideScope::Global)
            .max_by_key(|e| e.created_at)
            .map(|e| e.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adpilot_core::PlatformId;

    fn refer() -> CampaignRef {
        CampaignRef::new(PlatformId::MetaAds, "M1")
    }

    #[test]
    fn campaign_scope_shadows_global() {
        let now = Utc::now();
        let mut store = OverrideStore::new();
        store.insert(
            OverrideScope::Global,
            OverrideField::ConfidenceThreshold,
            0.9,
            chrono::Duration::hours(1),
            now,
        );
        store.insert(
            OverrideScope::Campaign { campaign: refer() },
            OverrideField::ConfidenceThreshold,
            0.95,
            chrono::Duration::hours(1),
            now + chrono::Duration::seconds(1),
        );

        let r = refer();
        assert_eq!(
            store.value_for(OverrideField::ConfidenceThreshold, Some(&r), now),
            Some(0.95)
        );
        // A different campaign only sees the global override
        let other = CampaignRef::new(PlatformId::MetaAds, "M2");
        assert_eq!(
            store.value_for(OverrideField::ConfidenceThreshold, Some(&other), now),
            Some(0.9)
        );
    }

    #[test]
    fn expiry_removes_effect() {
        let now = Utc::now();
        let mut store = OverrideStore::new();
        store.insert(
            OverrideScope::Global,
            OverrideField::MajorChangeFraction,
            0.05,
            chrono::Duration::minutes(30),
            now,
        );
        let later = now + chrono::Duration::hours(1);
        assert_eq!(
            store.value_for(OverrideField::MajorChangeFraction, None, later),
            None
        );
        assert_eq!(store.prune_expired(later), 1);
        assert!(store.live(later).is_empty());
    }
}

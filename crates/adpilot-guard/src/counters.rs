//! Per-day execution counters backing the daily adjustment and budget-delta caps.
//!
//! Owned by the decision engine and mutated only from within a tick or an
//! approval handler serialised with ticks. Rolled over at local midnight of
//! the configured timezone. There is no separate counter store: on cold
//! start the counters are rebuilt by scanning the ledger since midnight.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use std::collections::HashMap;
use tracing::info;

use adpilot_core::{CampaignRef, Money, PlatformId};

#[derive(Debug, Clone)]
pub struct DailyCounters {
    tz: Tz,
    day: NaiveDate,
    adjustments_made: u32,
    /// Total absolute budget moved by auto-executions today.
    budget_moved: Money,
    /// Cumulative absolute delta per campaign today.
    per_campaign_delta: HashMap<CampaignRef, Money>,
    /// Signed net delta per campaign today, in minor units.
    per_campaign_signed: HashMap<CampaignRef, i64>,
    /// Signed budget delta per platform today, in minor units.
    per_platform_delta: HashMap<PlatformId, i64>,
}

impl DailyCounters {
    pub fn new(tz: Tz, now: DateTime<Utc>) -> Self {
        Self {
            tz,
            day: Self::local_day(tz, now),
            adjustments_made: 0,
            budget_moved: Money::ZERO,
            per_campaign_delta: HashMap::new(),
            per_campaign_signed: HashMap::new(),
            per_platform_delta: HashMap::new(),
        }
    }

    fn local_day(tz: Tz, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&tz).date_naive()
    }

    pub fn day(&self) -> NaiveDate {
        self.day
    }

    /// Reset if local midnight has passed. Returns the day that was closed
    /// out, so the caller can ledger the rollover.
    pub fn maybe_rollover(&mut self, now: DateTime<Utc>) -> Option<NaiveDate> {
        let today = Self::local_day(self.tz, now);
        if today != self.day {
            let closed = self.day;
            info!(%closed, %today, "daily counters rolled over");
            self.day = today;
            self.adjustments_made = 0;
            self.budget_moved = Money::ZERO;
            self.per_campaign_delta.clear();
            self.per_campaign_signed.clear();
            self.per_platform_delta.clear();
            Some(closed)
        } else {
            None
        }
    }

    /// Record one committed auto-execution moving `signed_delta` on the
    /// campaign's budget (zero for pause/resume).
    pub fn record_execution(&mut self, campaign: &CampaignRef, signed_delta: Money) {
        self.adjustments_made += 1;
        self.budget_moved = self.budget_moved.saturating_add(signed_delta.abs());
        let entry = self
            .per_campaign_delta
            .entry(campaign.clone())
            .or_insert(Money::ZERO);
        *entry = entry.saturating_add(signed_delta.abs());
        *self
            .per_campaign_signed
            .entry(campaign.clone())
            .or_insert(0) += signed_delta.minor();
        *self.per_platform_delta.entry(campaign.platform).or_insert(0) +=
            signed_delta.minor();
    }

    pub fn adjustments_made(&self) -> u32 {
        self.adjustments_made
    }

    pub fn budget_moved(&self) -> Money {
        self.budget_moved
    }

    /// Cumulative absolute delta applied to one campaign today.
    pub fn campaign_delta(&self, campaign: &CampaignRef) -> Money {
        self.per_campaign_delta
            .get(campaign)
            .copied()
            .unwrap_or(Money::ZERO)
    }

    /// Signed net delta applied to one campaign today. Subtracting it from
    /// the current budget recovers the start-of-day budget.
    pub fn campaign_signed_delta(&self, campaign: &CampaignRef) -> Money {
        Money::from_minor(
            self.per_campaign_signed
                .get(campaign)
                .copied()
                .unwrap_or(0),
        )
    }

    /// Signed net budget movement on one platform today.
    pub fn platform_delta(&self, platform: PlatformId) -> Money {
        Money::from_minor(
            self.per_platform_delta
                .get(&platform)
                .copied()
                .unwrap_or(0),
        )
    }

    /// Signed net budget movement across all platforms today. Subtracting it
    /// from the current global enabled total recovers the start-of-day total.
    pub fn global_delta(&self) -> Money {
        Money::from_minor(self.per_platform_delta.values().sum())
    }
}

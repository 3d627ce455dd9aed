//! Mock adapter for credential-free operation and deterministic testing.
//!
//! When a platform has no API key configured the registry builds one of
//! these instead of a live adapter. Fixtures are deterministic per platform,
//! the full capability set is supported (writes mutate the fixture so
//! read-backs observe them), and every sample carries `mock_data = true`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::VecDeque;
use uuid::Uuid;

use adpilot_core::{
    AdapterError, Campaign, CampaignRef, CampaignStatus, DateRange, Money, PlatformId,
};

use crate::adapter::{AdapterResult, HealthStatus, PlatformAdapter, RawMetrics};

struct MockState {
    campaigns: Vec<Campaign>,
    /// One-shot errors returned before touching the fixture, in FIFO order.
    queued_errors: VecDeque<AdapterError>,
    /// Persistent failure: every call errors with a clone of this.
    outage: Option<AdapterError>,
    /// Every capability invocation, for test assertions.
    calls: Vec<String>,
}

pub struct MockAdapter {
    platform: PlatformId,
    state: Mutex<MockState>,
}

impl MockAdapter {
    /// A mock with the platform's deterministic default fixture.
    pub fn new(platform: PlatformId) -> Self {
        Self {
            platform,
            state: Mutex::new(MockState {
                campaigns: default_fixture(platform),
                queued_errors: VecDeque::new(),
                outage: None,
                calls: Vec::new(),
            }),
        }
    }

    /// A mock with no campaigns, for tests that add their own.
    pub fn empty(platform: PlatformId) -> Self {
        let adapter = Self::new(platform);
        adapter.state.lock().campaigns.clear();
        adapter
    }

    pub fn with_campaign(self, campaign: Campaign) -> Self {
        self.state.lock().campaigns.push(campaign);
        self
    }

    /// Queue a one-shot error for the next call.
    pub fn queue_error(&self, error: AdapterError) {
        self.state.lock().queued_errors.push_back(error);
    }

    /// Make every subsequent call fail (platform outage).
    pub fn set_outage(&self, error: AdapterError) {
        self.state.lock().outage = Some(error);
    }

    pub fn clear_outage(&self) {
        self.state.lock().outage = None;
    }

    /// Names of all capability calls made so far.
    pub fn recorded_calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    pub fn call_count(&self, name: &str) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| c.as_str() == name)
            .count()
    }

    fn enter(&self, call: &str) -> AdapterResult<()> {
        let mut state = self.state.lock();
        state.calls.push(call.to_string());
        if let Some(ref outage) = state.outage {
            return Err(outage.clone());
        }
        if let Some(err) = state.queued_errors.pop_front() {
            return Err(err);
        }
        Ok(())
    }

    fn find_mut<'a>(
        state: &'a mut MockState,
        campaign_id: &str,
    ) -> AdapterResult<&'a mut Campaign> {
        state
            .campaigns
            .iter_mut()
            .find(|c| c.reference.external_id == campaign_id)
            .ok_or_else(|| AdapterError::NotFound(campaign_id.to_string()))
    }
}

/// Deterministic per-platform fixture: three campaigns with fixed budgets and
/// ages, ids prefixed with the platform's initial.
fn default_fixture(platform: PlatformId) -> Vec<Campaign> {
    let prefix = match platform {
        PlatformId::GoogleAds => "G",
        PlatformId::MetaAds => "M",
        PlatformId::TiktokAds => "T",
        PlatformId::LinkedinAds => "L",
    };
    let now = Utc::now();
    let specs: [(&str, f64, i64, CampaignStatus); 3] = [
        ("1", 100.0, 30 * 24, CampaignStatus::Enabled),
        ("2", 80.0, 14 * 24, CampaignStatus::Enabled),
        ("3", 50.0, 40, CampaignStatus::Enabled),
    ];
    specs
        .iter()
        .map(|(suffix, budget, age_hours, status)| Campaign {
            reference: CampaignRef::new(platform, format!("{prefix}{suffix}")),
            name: format!("{} fixture {prefix}{suffix}", platform.as_str()),
            status: *status,
            daily_budget: Money::from_major(*budget),
            objective: Some("CONVERSIONS".into()),
            created_at: now - chrono::Duration::hours(*age_hours),
            updated_at: now - chrono::Duration::hours(1),
        })
        .collect()
}

/// Deterministic metrics as a pure function of the fixture campaign: the
/// first campaign performs well, the second underperforms, the third is new
/// with light traffic.
fn fixture_metrics(campaign: &Campaign, index: usize) -> RawMetrics {
    let budget = campaign.daily_budget.major();
    let (roas, ctr) = match index {
        0 => (4.8, 0.032),
        1 => (1.2, 0.011),
        _ => (0.0, 0.020),
    };
    let spend = budget * 0.9;
    let impressions = (budget * 400.0) as u64;
    let clicks = (impressions as f64 * ctr) as u64;
    RawMetrics {
        campaign_id: campaign.reference.external_id.clone(),
        campaign_name: campaign.name.clone(),
        currency: "USD".into(),
        impressions,
        clicks,
        spend,
        conversions: if roas > 0.0 { (spend / 20.0) as u64 } else { 0 },
        revenue: spend * roas,
        mock_data: true,
    }
}

#[async_trait]
impl PlatformAdapter for MockAdapter {
    fn platform(&self) -> PlatformId {
        self.platform
    }

    fn is_mock(&self) -> bool {
        true
    }

    async fn list_campaigns(&self, since: Option<DateTime<Utc>>) -> AdapterResult<Vec<Campaign>> {
        self.enter("list_campaigns")?;
        let state = self.state.lock();
        Ok(state
            .campaigns
            .iter()
            .filter(|c| since.map_or(true, |w| c.updated_at > w))
            .cloned()
            .collect())
    }

    async fn get_performance(
        &self,
        _range: DateRange,
        ids: Option<&[String]>,
    ) -> AdapterResult<Vec<RawMetrics>> {
        self.enter("get_performance")?;
        let state = self.state.lock();
        Ok(state
            .campaigns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.status != CampaignStatus::Removed)
            .filter(|(_, c)| {
                ids.map_or(true, |wanted| wanted.iter().any(|id| *id == c.reference.external_id))
            })
            .map(|(i, c)| fixture_metrics(c, i))
            .collect())
    }

    async fn update_budget(
        &self,
        campaign_id: &str,
        new_daily_budget: Money,
        _idempotency_key: Option<Uuid>,
    ) -> AdapterResult<Campaign> {
        self.enter("update_budget")?;
        if new_daily_budget <= Money::ZERO {
            return Err(AdapterError::Validation(format!(
                "daily budget must be positive, got {new_daily_budget}"
            )));
        }
        let mut state = self.state.lock();
        let campaign = Self::find_mut(&mut state, campaign_id)?;
        campaign.daily_budget = new_daily_budget;
        campaign.updated_at = Utc::now();
        Ok(campaign.clone())
    }

    async fn set_status(
        &self,
        campaign_id: &str,
        status: CampaignStatus,
    ) -> AdapterResult<Campaign> {
        self.enter("set_status")?;
        if status == CampaignStatus::Removed {
            return Err(AdapterError::Validation(
                "REMOVED is not a settable status".into(),
            ));
        }
        let mut state = self.state.lock();
        let campaign = Self::find_mut(&mut state, campaign_id)?;
        campaign.status = status;
        campaign.updated_at = Utc::now();
        Ok(campaign.clone())
    }

    async fn health(&self) -> HealthStatus {
        let state = self.state.lock();
        match state.outage {
            Some(ref e) => HealthStatus::Failing {
                reason: e.to_string(),
            },
            None => HealthStatus::Ok,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fixture_is_deterministic() {
        let a = MockAdapter::new(PlatformId::GoogleAds);
        let b = MockAdapter::new(PlatformId::GoogleAds);
        let ca = a.list_campaigns(None).await.unwrap();
        let cb = b.list_campaigns(None).await.unwrap();
        assert_eq!(ca.len(), 3);
        let ids: Vec<_> = ca.iter().map(|c| &c.reference.external_id).collect();
        assert_eq!(ids, vec!["G1", "G2", "G3"]);
        assert_eq!(ca[0].daily_budget, cb[0].daily_budget);
    }

    #[tokio::test]
    async fn metrics_are_flagged_as_mock() {
        let adapter = MockAdapter::new(PlatformId::MetaAds);
        let range = DateRange::trailing_days(Utc::now(), 7);
        let rows = adapter.get_performance(range, None).await.unwrap();
        assert!(!rows.is_empty());
        assert!(rows.iter().all(|r| r.mock_data));
    }

    #[tokio::test]
    async fn writes_mutate_fixture() {
        let adapter = MockAdapter::new(PlatformId::GoogleAds);
        let updated = adapter
            .update_budget("G1", Money::from_major(130.0), None)
            .await
            .unwrap();
        assert_eq!(updated.daily_budget, Money::from_major(130.0));

        // Read-back observes the change
        let campaigns = adapter.list_campaigns(None).await.unwrap();
        let g1 = campaigns
            .iter()
            .find(|c| c.reference.external_id == "G1")
            .unwrap();
        assert_eq!(g1.daily_budget, Money::from_major(130.0));
    }

    #[tokio::test]
    async fn pause_then_resume_restores_enabled() {
        let adapter = MockAdapter::new(PlatformId::TiktokAds);
        adapter
            .set_status("T1", CampaignStatus::Paused)
            .await
            .unwrap();
        let resumed = adapter
            .set_status("T1", CampaignStatus::Enabled)
            .await
            .unwrap();
        assert_eq!(resumed.status, CampaignStatus::Enabled);
    }

    #[tokio::test]
    async fn unknown_campaign_is_not_found() {
        let adapter = MockAdapter::new(PlatformId::GoogleAds);
        let err = adapter
            .update_budget("NOPE", Money::from_major(10.0), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::NotFound(_)));
    }

    #[tokio::test]
    async fn outage_fails_everything_and_health_reports_it() {
        let adapter = MockAdapter::new(PlatformId::LinkedinAds);
        adapter.set_outage(AdapterError::Unavailable("maintenance".into()));
        assert!(adapter.list_campaigns(None).await.is_err());
        assert!(!adapter.health().await.is_ok());
        adapter.clear_outage();
        assert!(adapter.list_campaigns(None).await.is_ok());
    }

    #[tokio::test]
    async fn records_calls() {
        let adapter = MockAdapter::new(PlatformId::GoogleAds);
        let _ = adapter.list_campaigns(None).await;
        let _ = adapter
            .update_budget("G1", Money::from_major(90.0), None)
            .await;
        assert_eq!(adapter.call_count("list_campaigns"), 1);
        assert_eq!(adapter.call_count("update_budget"), 1);
        assert_eq!(adapter.call_count("set_status"), 0);
    }
}

//! Meta Ads adapter. Meta reports money in cents of the account currency and
//! uses its own status vocabulary (ACTIVE/PAUSED/DELETED).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use adpilot_core::{
    AdapterError, Campaign, CampaignRef, CampaignStatus, DateRange, Money, PlatformId,
};

use crate::adapter::{AdapterResult, HealthStatus, PlatformAdapter, RawMetrics};
use crate::http::PlatformClient;

pub struct MetaAdsAdapter {
    client: PlatformClient,
}

impl MetaAdsAdapter {
    pub fn new(client: PlatformClient) -> Self {
        Self { client }
    }
}

#[derive(Debug, Deserialize)]
struct MetaCampaignRow {
    id: String,
    name: String,
    effective_status: String,
    daily_budget_cents: i64,
    #[serde(default)]
    objective: Option<String>,
    created_time: DateTime<Utc>,
    updated_time: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct MetaCampaignList {
    data: Vec<MetaCampaignRow>,
}

#[derive(Debug, Deserialize)]
struct MetaInsightsRow {
    campaign_id: String,
    campaign_name: String,
    impressions: u64,
    clicks: u64,
    spend_cents: i64,
    conversions: u64,
    purchase_value_cents: i64,
}

#[derive(Debug, Deserialize)]
struct MetaInsightsList {
    data: Vec<MetaInsightsRow>,
}

fn parse_status(raw: &str) -> AdapterResult<CampaignStatus> {
    match raw {
        "ACTIVE" => Ok(CampaignStatus::Enabled),
        "PAUSED" => Ok(CampaignStatus::Paused),
        "DELETED" | "ARCHIVED" => Ok(CampaignStatus::Removed),
        other => Err(AdapterError::Validation(format!(
            "unknown meta campaign status: {other}"
        ))),
    }
}

fn status_to_wire(status: CampaignStatus) -> AdapterResult<&'static str> {
    match status {
        CampaignStatus::Enabled => Ok("ACTIVE"),
        CampaignStatus::Paused => Ok("PAUSED"),
        CampaignStatus::Removed => Err(AdapterError::Validation(
            "DELETED is not a settable status".into(),
        )),
    }
}

fn row_to_campaign(row: MetaCampaignRow) -> AdapterResult<Campaign> {
    Ok(Campaign {
        reference: CampaignRef::new(PlatformId::MetaAds, row.id),
        name: row.name,
        status: parse_status(&row.effective_status)?,
        daily_budget: Money::from_minor(row.daily_budget_cents),
        objective: row.objective,
        created_at: row.created_time,
        updated_at: row.updated_time,
    })
}

#[async_trait]
impl PlatformAdapter for MetaAdsAdapter {
    fn platform(&self) -> PlatformId {
        PlatformId::MetaAds
    }

    async fn list_campaigns(&self, since: Option<DateTime<Utc>>) -> AdapterResult<Vec<Campaign>> {
        let reply: MetaCampaignList = self
            .client
            .call("list_campaigns", &serde_json::json!({ "updated_since": since }))
            .await?;
        reply.data.into_iter().map(row_to_campaign).collect()
    }

    async fn get_performance(
        &self,
        range: DateRange,
        ids: Option<&[String]>,
    ) -> AdapterResult<Vec<RawMetrics>> {
        let reply: MetaInsightsList = self
            .client
            .call(
                "get_insights",
                &serde_json::json!({
                    "time_range": { "since": range.start, "until": range.end },
                    "campaign_ids": ids,
                }),
            )
            .await?;
        Ok(reply
            .data
            .into_iter()
            .map(|row| RawMetrics {
                campaign_id: row.campaign_id,
                campaign_name: row.campaign_name,
                currency: "USD".into(),
                impressions: row.impressions,
                clicks: row.clicks,
                spend: row.spend_cents as f64 / 100.0,
                conversions: row.conversions,
                revenue: row.purchase_value_cents as f64 / 100.0,
                mock_data: false,
            })
            .collect())
    }

    async fn update_budget(
        &self,
        campaign_id: &str,
        new_daily_budget: Money,
        idempotency_key: Option<Uuid>,
    ) -> AdapterResult<Campaign> {
        let row: MetaCampaignRow = self
            .client
            .call(
                "update_campaign_budget",
                &serde_json::json!({
                    "campaign_id": campaign_id,
                    "daily_budget_cents": new_daily_budget.minor(),
                    "idempotency_key": idempotency_key,
                }),
            )
            .await?;
        row_to_campaign(row)
    }

    async fn set_status(
        &self,
        campaign_id: &str,
        status: CampaignStatus,
    ) -> AdapterResult<Campaign> {
        let row: MetaCampaignRow = self
            .client
            .call(
                "set_campaign_status",
                &serde_json::json!({
                    "campaign_id": campaign_id,
                    "status": status_to_wire(status)?,
                }),
            )
            .await?;
        row_to_campaign(row)
    }

    async fn health(&self) -> HealthStatus {
        match self.client.ping().await {
            Ok(()) => HealthStatus::Ok,
            Err(e) => HealthStatus::Failing {
                reason: e.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meta_status_vocabulary() {
        assert_eq!(parse_status("ACTIVE").unwrap(), CampaignStatus::Enabled);
        assert_eq!(parse_status("ARCHIVED").unwrap(), CampaignStatus::Removed);
        assert!(parse_status("IN_PROCESS").is_err());
    }
}

//! Google Ads adapter. Google expresses all money in micros
//! (1 USD = 1,000,000 micros); the conversion happens here and nowhere else.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use adpilot_core::{
    AdapterError, Campaign, CampaignRef, CampaignStatus, DateRange, Money, PlatformId,
};

use crate::adapter::{AdapterResult, HealthStatus, PlatformAdapter, RawMetrics};
use crate::http::PlatformClient;

const MICROS_PER_UNIT: i64 = 1_000_000;

pub struct GoogleAdsAdapter {
    client: PlatformClient,
}

impl GoogleAdsAdapter {
    pub fn new(client: PlatformClient) -> Self {
        Self { client }
    }
}

#[derive(Debug, Deserialize)]
struct GoogleCampaignRow {
    id: String,
    name: String,
    status: String,
    daily_budget_micros: i64,
    #[serde(default)]
    objective: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct GoogleCampaignList {
    campaigns: Vec<GoogleCampaignRow>,
}

#[derive(Debug, Deserialize)]
struct GoogleMetricsRow {
    campaign_id: String,
    campaign_name: String,
    impressions: u64,
    clicks: u64,
    cost_micros: i64,
    conversions: u64,
    conversion_value_micros: i64,
}

#[derive(Debug, Deserialize)]
struct GoogleMetricsList {
    rows: Vec<GoogleMetricsRow>,
}

fn micros_to_money(micros: i64) -> Money {
    // Micros are an exact multiple representation; round to the cent once.
    Money::from_minor((micros as f64 / (MICROS_PER_UNIT as f64 / 100.0)).round() as i64)
}

fn money_to_micros(amount: Money) -> i64 {
    amount.minor() * (MICROS_PER_UNIT / 100)
}

fn parse_status(raw: &str) -> AdapterResult<CampaignStatus> {
    match raw {
        "ENABLED" => Ok(CampaignStatus::Enabled),
        "PAUSED" => Ok(CampaignStatus::Paused),
        "REMOVED" => Ok(CampaignStatus::Removed),
        other => Err(AdapterError::Validation(format!(
            "unknown google campaign status: {other}"
        ))),
    }
}

fn status_to_wire(status: CampaignStatus) -> AdapterResult<&'static str> {
    match status {
        CampaignStatus::Enabled => Ok("ENABLED"),
        CampaignStatus::Paused => Ok("PAUSED"),
        CampaignStatus::Removed => Err(AdapterError::Validation(
            "REMOVED is not a settable status".into(),
        )),
    }
}

fn row_to_campaign(row: GoogleCampaignRow) -> AdapterResult<Campaign> {
    Ok(Campaign {
        reference: CampaignRef::new(PlatformId::GoogleAds, row.id),
        name: row.name,
        status: parse_status(&row.status)?,
        daily_budget: micros_to_money(row.daily_budget_micros),
        objective: row.objective,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

#[async_trait]
impl PlatformAdapter for GoogleAdsAdapter {
    fn platform(&self) -> PlatformId {
        PlatformId::GoogleAds
    }

    async fn list_campaigns(&self, since: Option<DateTime<Utc>>) -> AdapterResult<Vec<Campaign>> {
        let reply: GoogleCampaignList = self
            .client
            .call("list_campaigns", &serde_json::json!({ "updated_since": since }))
            .await?;
        reply.campaigns.into_iter().map(row_to_campaign).collect()
    }

    async fn get_performance(
        &self,
        range: DateRange,
        ids: Option<&[String]>,
    ) -> AdapterResult<Vec<RawMetrics>> {
        let reply: GoogleMetricsList = self
            .client
            .call(
                "get_campaign_performance",
                &serde_json::json!({
                    "date_range": { "start": range.start, "end": range.end },
                    "campaign_ids": ids,
                }),
            )
            .await?;
        Ok(reply
            .rows
            .into_iter()
            .map(|row| RawMetrics {
                campaign_id: row.campaign_id,
                campaign_name: row.campaign_name,
                currency: "USD".into(),
                impressions: row.impressions,
                clicks: row.clicks,
                spend: row.cost_micros as f64 / MICROS_PER_UNIT as f64,
                conversions: row.conversions,
                revenue: row.conversion_value_micros as f64 / MICROS_PER_UNIT as f64,
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
        let row: GoogleCampaignRow = self
            .client
            .call(
                "update_campaign_budget",
                &serde_json::json!({
                    "campaign_id": campaign_id,
                    "new_budget_micros": money_to_micros(new_daily_budget),
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
        let row: GoogleCampaignRow = self
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

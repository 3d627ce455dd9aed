//! LinkedIn Ads adapter. LinkedIn sends money as decimal strings with an
//! explicit currency code; anything that fails to parse is a validation
//! error at this boundary.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use adpilot_core::{
    AdapterError, Campaign, CampaignRef, CampaignStatus, DateRange, Money, PlatformId,
};

use crate::adapter::{AdapterResult, HealthStatus, PlatformAdapter, RawMetrics};
use crate::http::PlatformClient;

pub struct LinkedinAdsAdapter {
    client: PlatformClient,
}

impl LinkedinAdsAdapter {
    pub fn new(client: PlatformClient) -> Self {
        Self { client }
    }
}

#[derive(Debug, Deserialize)]
struct LinkedinAmount {
    amount: String,
    currency_code: String,
}

#[derive(Debug, Deserialize)]
struct LinkedinCampaignRow {
    id: String,
    name: String,
    status: String,
    daily_budget: LinkedinAmount,
    #[serde(default)]
    objective_type: Option<String>,
    created_at: DateTime<Utc>,
    last_modified_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct LinkedinCampaignList {
    elements: Vec<LinkedinCampaignRow>,
}

#[derive(Debug, Deserialize)]
struct LinkedinAnalyticsRow {
    campaign_id: String,
    campaign_name: String,
    impressions: u64,
    clicks: u64,
    cost: LinkedinAmount,
    conversions: u64,
    conversion_value: LinkedinAmount,
}

#[derive(Debug, Deserialize)]
struct LinkedinAnalyticsList {
    elements: Vec<LinkedinAnalyticsRow>,
}

fn parse_amount(value: &LinkedinAmount) -> AdapterResult<(f64, String)> {
    let amount: f64 = value.amount.parse().map_err(|_| {
        AdapterError::Validation(format!("unparseable linkedin amount: {:?}", value.amount))
    })?;
    Ok((amount, value.currency_code.clone()))
}

fn parse_budget(value: &LinkedinAmount) -> AdapterResult<Money> {
    let (amount, currency) = parse_amount(value)?;
    if currency != "USD" {
        return Err(AdapterError::Validation(format!(
            "linkedin account currency {currency} is not canonical"
        )));
    }
    Ok(Money::from_major(amount))
}

fn parse_status(raw: &str) -> AdapterResult<CampaignStatus> {
    match raw {
        "ACTIVE" => Ok(CampaignStatus::Enabled),
        "PAUSED" => Ok(CampaignStatus::Paused),
        "ARCHIVED" | "CANCELED" => Ok(CampaignStatus::Removed),
        other => Err(AdapterError::Validation(format!(
            "unknown linkedin campaign status: {other}"
        ))),
    }
}

fn status_to_wire(status: CampaignStatus) -> AdapterResult<&'static str> {
    match status {
        CampaignStatus::Enabled => Ok("ACTIVE"),
        CampaignStatus::Paused => Ok("PAUSED"),
        CampaignStatus::Removed => Err(AdapterError::Validation(
            "ARCHIVED is not a settable status".into(),
        )),
    }
}

fn row_to_campaign(row: LinkedinCampaignRow) -> AdapterResult<Campaign> {
    Ok(Campaign {
        reference: CampaignRef::new(PlatformId::LinkedinAds, row.id),
        name: row.name,
        status: parse_status(&row.status)?,
        daily_budget: parse_budget(&row.daily_budget)?,
        objective: row.objective_type,
        created_at: row.created_at,
        updated_at: row.last_modified_at,
    })
}

#[async_trait]
impl PlatformAdapter for LinkedinAdsAdapter {
    fn platform(&self) -> PlatformId {
        PlatformId::LinkedinAds
    }

    async fn list_campaigns(&self, since: Option<DateTime<Utc>>) -> AdapterResult<Vec<Campaign>> {
        let reply: LinkedinCampaignList = self
            .client
            .call("list_campaigns", &serde_json::json!({ "modified_since": since }))
            .await?;
        reply.elements.into_iter().map(row_to_campaign).collect()
    }

    async fn get_performance(
        &self,
        range: DateRange,
        ids: Option<&[String]>,
    ) -> AdapterResult<Vec<RawMetrics>> {
        let reply: LinkedinAnalyticsList = self
            .client
            .call(
                "ad_analytics",
                &serde_json::json!({
                    "date_range": { "start": range.start, "end": range.end },
                    "campaign_ids": ids,
                }),
            )
            .await?;
        reply
            .elements
            .into_iter()
            .map(|row| {
                let (spend, spend_currency) = parse_amount(&row.cost)?;
                let (revenue, revenue_currency) = parse_amount(&row.conversion_value)?;
                if spend_currency != revenue_currency {
                    return Err(AdapterError::Validation(format!(
                        "mixed currencies in one row: {spend_currency} vs {revenue_currency}"
                    )));
                }
                Ok(RawMetrics {
                    campaign_id: row.campaign_id,
                    campaign_name: row.campaign_name,
                    currency: spend_currency,
                    impressions: row.impressions,
                    clicks: row.clicks,
                    spend,
                    conversions: row.conversions,
                    revenue,
                    mock_data: false,
                })
            })
            .collect()
    }

    async fn update_budget(
        &self,
        campaign_id: &str,
        new_daily_budget: Money,
        idempotency_key: Option<Uuid>,
    ) -> AdapterResult<Campaign> {
        let row: LinkedinCampaignRow = self
            .client
            .call(
                "update_campaign_budget",
                &serde_json::json!({
                    "campaign_id": campaign_id,
                    "daily_budget": {
                        "amount": format!("{:.2}", new_daily_budget.major()),
                        "currency_code": "USD",
                    },
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
        let row: LinkedinCampaignRow = self
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

//! TikTok Ads adapter. The account currency is CNY and money is expressed in
//! fen (1/100 yuan); budgets convert between canonical units and yuan-fen on
//! this boundary using the shared FX table.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use adpilot_core::{
    AdapterError, Campaign, CampaignRef, CampaignStatus, DateRange, Money, PlatformId,
};

use crate::adapter::{AdapterResult, HealthStatus, PlatformAdapter, RawMetrics};
use crate::http::PlatformClient;
use crate::normalize::FxTable;

const ACCOUNT_CURRENCY: &str = "CNY";

pub struct TiktokAdsAdapter {
    client: PlatformClient,
    fx: Arc<FxTable>,
}

impl TiktokAdsAdapter {
    pub fn new(client: PlatformClient, fx: Arc<FxTable>) -> Self {
        Self { client, fx }
    }

    fn fen_to_canonical(&self, fen: i64) -> AdapterResult<Money> {
        self.fx.to_canonical(fen as f64 / 100.0, ACCOUNT_CURRENCY)
    }

    fn canonical_to_fen(&self, amount: Money) -> AdapterResult<i64> {
        let yuan = self.fx.from_canonical(amount, ACCOUNT_CURRENCY)?;
        Ok((yuan * 100.0).round() as i64)
    }
}

#[derive(Debug, Deserialize)]
struct TiktokCampaignRow {
    campaign_id: String,
    campaign_name: String,
    operation_status: String,
    budget_fen: i64,
    #[serde(default)]
    objective_type: Option<String>,
    create_time: DateTime<Utc>,
    modify_time: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct TiktokCampaignList {
    list: Vec<TiktokCampaignRow>,
}

#[derive(Debug, Deserialize)]
struct TiktokReportRow {
    campaign_id: String,
    campaign_name: String,
    impressions: u64,
    clicks: u64,
    spend_fen: i64,
    conversions: u64,
    total_purchase_value_fen: i64,
}

#[derive(Debug, Deserialize)]
struct TiktokReportList {
    list: Vec<TiktokReportRow>,
}

fn parse_status(raw: &str) -> AdapterResult<CampaignStatus> {
    match raw {
        "ENABLE" => Ok(CampaignStatus::Enabled),
        "DISABLE" => Ok(CampaignStatus::Paused),
        "DELETE" => Ok(CampaignStatus::Removed),
        other => Err(AdapterError::Validation(format!(
            "unknown tiktok campaign status: {other}"
        ))),
    }
}

fn status_to_wire(status: CampaignStatus) -> AdapterResult<&'static str> {
    match status {
        CampaignStatus::Enabled => Ok("ENABLE"),
        CampaignStatus::Paused => Ok("DISABLE"),
        CampaignStatus::Removed => Err(AdapterError::Validation(
            "DELETE is not a settable status".into(),
        )),
    }
}

impl TiktokAdsAdapter {
    fn row_to_campaign(&self, row: TiktokCampaignRow) -> AdapterResult<Campaign> {
        Ok(Campaign {
            reference: CampaignRef::new(PlatformId::TiktokAds, row.campaign_id),
            name: row.campaign_name,
            status: parse_status(&row.operation_status)?,
            daily_budget: self.fen_to_canonical(row.budget_fen)?,
            objective: row.objective_type,
            created_at: row.create_time,
            updated_at: row.modify_time,
        })
    }
}

#[async_trait]
impl PlatformAdapter for TiktokAdsAdapter {
    fn platform(&self) -> PlatformId {
        PlatformId::TiktokAds
    }

    async fn list_campaigns(&self, since: Option<DateTime<Utc>>) -> AdapterResult<Vec<Campaign>> {
        let reply: TiktokCampaignList = self
            .client
            .call("campaign_get", &serde_json::json!({ "modify_time_since": since }))
            .await?;
        reply
            .list
            .into_iter()
            .map(|row| self.row_to_campaign(row))
            .collect()
    }

    async fn get_performance(
        &self,
        range: DateRange,
        ids: Option<&[String]>,
    ) -> AdapterResult<Vec<RawMetrics>> {
        let reply: TiktokReportList = self
            .client
            .call(
                "report_get",
                &serde_json::json!({
                    "start_time": range.start,
                    "end_time": range.end,
                    "campaign_ids": ids,
                }),
            )
            .await?;
        Ok(reply
            .list
            .into_iter()
            .map(|row| RawMetrics {
                campaign_id: row.campaign_id,
                campaign_name: row.campaign_name,
                currency: ACCOUNT_CURRENCY.into(),
                impressions: row.impressions,
                clicks: row.clicks,
                spend: row.spend_fen as f64 / 100.0,
                conversions: row.conversions,
                revenue: row.total_purchase_value_fen as f64 / 100.0,
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
        let row: TiktokCampaignRow = self
            .client
            .call(
                "campaign_update_budget",
                &serde_json::json!({
                    "campaign_id": campaign_id,
                    "budget_fen": self.canonical_to_fen(new_daily_budget)?,
                    "idempotency_key": idempotency_key,
                }),
            )
            .await?;
        self.row_to_campaign(row)
    }

    async fn set_status(
        &self,
        campaign_id: &str,
        status: CampaignStatus,
    ) -> AdapterResult<Campaign> {
        let row: TiktokCampaignRow = self
            .client
            .call(
                "campaign_update_status",
                &serde_json::json!({
                    "campaign_id": campaign_id,
                    "operation_status": status_to_wire(status)?,
                }),
            )
            .await?;
        self.row_to_campaign(row)
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
    fn tiktok_status_vocabulary() {
        assert_eq!(parse_status("ENABLE").unwrap(), CampaignStatus::Enabled);
        assert_eq!(parse_status("DISABLE").unwrap(), CampaignStatus::Paused);
        assert!(parse_status("FROZEN").is_err());
    }
}

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use adpilot_core::{AdapterError, Campaign, CampaignStatus, DateRange, Money, PlatformId};

pub type AdapterResult<T> = std::result::Result<T, AdapterError>;

/// A raw performance row as an adapter hands it to the normaliser: sub-units
/// already folded into major units of the adapter's account currency, but not
/// yet converted to the canonical currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMetrics {
    pub campaign_id: String,
    pub campaign_name: String,
    /// ISO 4217 code of the amounts below.
    pub currency: String,
    pub impressions: u64,
    pub clicks: u64,
    pub spend: f64,
    pub conversions: u64,
    pub revenue: f64,
    /// True when served from a credential-free fixture.
    #[serde(default)]
    pub mock_data: bool,
}

/// Result of an adapter health probe. `health()` never errors; a failing
/// platform is itself a valid answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum HealthStatus {
    Ok,
    Failing { reason: String },
}

impl HealthStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }
}

/// The uniform capability set every ad platform adapter implements.
///
/// Canonicalisation contract: budgets cross this boundary in the canonical
/// currency and unit (`Money`). Platforms that express budgets in sub-units
/// (micros, cents, fen) convert inside the adapter; a unit mismatch at the
/// boundary is `AdapterError::Validation`, never silent truncation.
#[async_trait]
pub trait PlatformAdapter: Send + Sync {
    /// Which platform this adapter fronts.
    fn platform(&self) -> PlatformId;

    /// True when the adapter is serving deterministic fixtures instead of a
    /// live platform (credentials absent).
    fn is_mock(&self) -> bool {
        false
    }

    /// List campaigns, optionally only those updated since the watermark.
    /// Idempotent and read-only.
    async fn list_campaigns(&self, since: Option<DateTime<Utc>>) -> AdapterResult<Vec<Campaign>>;

    /// Performance aggregated per campaign over the range, optionally
    /// filtered to specific campaign ids. Monotone in the range.
    async fn get_performance(
        &self,
        range: DateRange,
        ids: Option<&[String]>,
    ) -> AdapterResult<Vec<RawMetrics>>;

    /// Set a campaign's daily budget. On `Ok` the platform has confirmed the
    /// change; the returned campaign reflects a read-back of confirmed state.
    /// The idempotency key makes retried writes safe.
    async fn update_budget(
        &self,
        campaign_id: &str,
        new_daily_budget: Money,
        idempotency_key: Option<Uuid>,
    ) -> AdapterResult<Campaign>;

    /// Confirmed status transition. Only `Enabled` and `Paused` are legal
    /// targets; asking for `Removed` is a validation error.
    async fn set_status(
        &self,
        campaign_id: &str,
        status: CampaignStatus,
    ) -> AdapterResult<Campaign>;

    /// Probe the platform. Never errors.
    async fn health(&self) -> HealthStatus;
}

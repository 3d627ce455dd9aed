//! The metric normaliser: folds heterogeneous adapter output into
//! `MetricSample`s with uniform semantics.
//!
//! The normaliser is a pure function of adapter output, the daily FX table,
//! and the set of already-known campaigns. It holds no state of its own.

use chrono::{DateTime, NaiveDate, Utc};
use std::collections::{HashMap, HashSet};

use adpilot_core::{AdapterError, CampaignRef, MetricSample, Money, PlatformId};

use crate::adapter::RawMetrics;

/// Daily exchange rates into the canonical currency (USD per one unit of the
/// source currency).
#[derive(Debug, Clone)]
pub struct FxTable {
    rates: HashMap<String, f64>,
    pub as_of: NaiveDate,
}

impl FxTable {
    pub fn new(as_of: NaiveDate) -> Self {
        Self {
            rates: HashMap::from([("USD".to_string(), 1.0)]),
            as_of,
        }
    }

    pub fn with_rate(mut self, currency: &str, usd_per_unit: f64) -> Self {
        self.rates.insert(currency.to_string(), usd_per_unit);
        self
    }

    pub fn rate(&self, currency: &str) -> Option<f64> {
        self.rates.get(currency).copied()
    }

    /// Convert an amount of `currency` into canonical money, rounding to the
    /// minor unit exactly once.
    pub fn to_canonical(&self, amount: f64, currency: &str) -> Result<Money, AdapterError> {
        let rate = self.rate(currency).ok_or_else(|| {
            AdapterError::Validation(format!("no FX rate for currency {currency}"))
        })?;
        Ok(Money::from_major(amount * rate))
    }

    /// Convert canonical money into major units of `currency`.
    pub fn from_canonical(&self, amount: Money, currency: &str) -> Result<f64, AdapterError> {
        let rate = self.rate(currency).ok_or_else(|| {
            AdapterError::Validation(format!("no FX rate for currency {currency}"))
        })?;
        Ok(amount.major() / rate)
    }
}

impl Default for FxTable {
    fn default() -> Self {
        // Static fallback rates; production feeds a real daily table.
        Self::new(Utc::now().date_naive())
            .with_rate("EUR", 1.08)
            .with_rate("GBP", 1.27)
            .with_rate("CNY", 0.14)
    }
}

/// Output of one normalisation pass.
#[derive(Debug, Clone)]
pub struct NormalizedBatch {
    pub samples: Vec<MetricSample>,
    /// Campaigns that appeared in adapter output but not in the known set.
    pub newly_seen: Vec<CampaignRef>,
    /// Watermark to carry forward as `last_seen_at`.
    pub last_seen_at: DateTime<Utc>,
}

pub struct Normalizer;

impl Normalizer {
    /// Normalise one platform's raw rows taken at `sample_time`.
    ///
    /// A row in an unknown currency fails the whole batch: a gap in the FX
    /// table is a boundary validation error, not something to paper over.
    pub fn normalize_batch(
        platform: PlatformId,
        rows: &[RawMetrics],
        fx: &FxTable,
        known: &HashSet<CampaignRef>,
        sample_time: DateTime<Utc>,
    ) -> Result<NormalizedBatch, AdapterError> {
        let mut samples = Vec::with_capacity(rows.len());
        let mut newly_seen = Vec::new();

        for row in rows {
            let reference = CampaignRef::new(platform, row.campaign_id.clone());
            let spend = fx.to_canonical(row.spend, &row.currency)?;
            let revenue = fx.to_canonical(row.revenue, &row.currency)?;

            if !known.contains(&reference) && !newly_seen.contains(&reference) {
                newly_seen.push(reference.clone());
            }

            samples.push(MetricSample {
                campaign: reference,
                sample_time,
                impressions: row.impressions,
                clicks: row.clicks,
                spend,
                conversions: row.conversions,
                revenue,
                mock_data: row.mock_data,
            });
        }

        Ok(NormalizedBatch {
            samples,
            newly_seen,
            last_seen_at: sample_time,
        })
    }
}

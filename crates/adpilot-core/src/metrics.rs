use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{CampaignRef, Money};

/// One normalised performance sample for a campaign over a window.
///
/// Raw counters are stored; the derived ratios (`roas`, `cpc`, `ctr`, `cpa`)
/// are materialised on read so a sample can never carry an inconsistent
/// derived value. All division is zero-guarded: a zero denominator yields 0,
/// not infinity and not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    pub campaign: CampaignRef,
    pub sample_time: DateTime<Utc>,
    pub impressions: u64,
    pub clicks: u64,
    pub spend: Money,
    pub conversions: u64,
    pub revenue: Money,
    /// True when the sample came from a credential-free mock adapter.
    #[serde(default)]
    pub mock_data: bool,
}

impl MetricSample {
    /// Revenue divided by spend; 0 when spend is 0.
    pub fn roas(&self) -> f64 {
        if self.spend.is_zero() {
            0.0
        } else {
            self.revenue.minor() as f64 / self.spend.minor() as f64
        }
    }

    /// Cost per click; 0 when there are no clicks.
    pub fn cpc(&self) -> f64 {
        if self.clicks == 0 {
            0.0
        } else {
            self.spend.major() / self.clicks as f64
        }
    }

    /// Click-through rate; 0 when there are no impressions.
    pub fn ctr(&self) -> f64 {
        if self.impressions == 0 {
            0.0
        } else {
            self.clicks as f64 / self.impressions as f64
        }
    }

    /// Cost per acquisition; 0 when there are no conversions.
    pub fn cpa(&self) -> f64 {
        if self.conversions == 0 {
            0.0
        } else {
            self.spend.major() / self.conversions as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PlatformId;

    fn sample(spend: f64, revenue: f64, impressions: u64, clicks: u64, conv: u64) -> MetricSample {
        MetricSample {
            campaign: CampaignRef::new(PlatformId::MetaAds, "M1"),
            sample_time: Utc::now(),
            impressions,
            clicks,
            spend: Money::from_major(spend),
            conversions: conv,
            revenue: Money::from_major(revenue),
            mock_data: false,
        }
    }

    #[test]
    fn derived_metrics() {
        let s = sample(80.0, 96.0, 10_000, 200, 8);
        assert!((s.roas() - 1.2).abs() < 1e-9);
        assert!((s.cpc() - 0.4).abs() < 1e-9);
        assert!((s.ctr() - 0.02).abs() < 1e-9);
        assert!((s.cpa() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn zero_denominators_yield_zero() {
        let s = sample(0.0, 0.0, 0, 0, 0);
        assert_eq!(s.roas(), 0.0);
        assert_eq!(s.cpc(), 0.0);
        assert_eq!(s.ctr(), 0.0);
        assert_eq!(s.cpa(), 0.0);
    }
}

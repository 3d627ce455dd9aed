use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The closed set of supported advertising platforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlatformId {
    GoogleAds,
    MetaAds,
    TiktokAds,
    LinkedinAds,
}

impl PlatformId {
    pub const ALL: [PlatformId; 4] = [
        Self::GoogleAds,
        Self::MetaAds,
        Self::TiktokAds,
        Self::LinkedinAds,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GoogleAds => "google_ads",
            Self::MetaAds => "meta_ads",
            Self::TiktokAds => "tiktok_ads",
            Self::LinkedinAds => "linkedin_ads",
        }
    }
}

impl fmt::Display for PlatformId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlatformId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "google_ads" => Ok(Self::GoogleAds),
            "meta_ads" => Ok(Self::MetaAds),
            "tiktok_ads" => Ok(Self::TiktokAds),
            "linkedin_ads" => Ok(Self::LinkedinAds),
            other => Err(format!("unknown platform: {other}")),
        }
    }
}

/// Compound identity of a campaign: the platform plus the platform's own id.
/// Samples and proposals reference campaigns by this key only; there is no
/// back-pointer from a campaign to its samples.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CampaignRef {
    pub platform: PlatformId,
    pub external_id: String,
}

impl CampaignRef {
    pub fn new(platform: PlatformId, external_id: impl Into<String>) -> Self {
        Self {
            platform,
            external_id: external_id.into(),
        }
    }
}

impl fmt::Display for CampaignRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.platform, self.external_id)
    }
}

/// An amount in the canonical currency (USD), held as integral minor units
/// (cents). Adapters convert platform-native sub-units on their boundary;
/// everything inside the core speaks `Money`. Keeping cents integral means
/// rounding happens exactly once per boundary conversion and can never
/// accumulate drift.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    /// From minor units (cents).
    pub const fn from_minor(minor: i64) -> Self {
        Self(minor)
    }

    /// From a major-unit amount (dollars), rounding half away from zero to
    /// the nearest cent.
    pub fn from_major(major: f64) -> Self {
        Self((major * 100.0).round() as i64)
    }

    pub const fn minor(&self) -> i64 {
        self.0
    }

    pub fn major(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub const fn abs(&self) -> Money {
        Money(self.0.abs())
    }

    /// Absolute difference between two amounts.
    pub const fn abs_delta(&self, other: Money) -> Money {
        Money((self.0 - other.0).abs())
    }

    pub const fn saturating_add(&self, other: Money) -> Money {
        Money(self.0.saturating_add(other.0))
    }

    pub const fn saturating_sub(&self, other: Money) -> Money {
        Money(self.0.saturating_sub(other.0))
    }

    /// Scale by a fraction, rounding to the nearest cent.
    pub fn scale(&self, fraction: f64) -> Money {
        Money((self.0 as f64 * fraction).round() as i64)
    }

    /// This amount as a fraction of `base` (0 when base is 0).
    pub fn fraction_of(&self, base: Money) -> f64 {
        if base.0 == 0 {
            0.0
        } else {
            self.0 as f64 / base.0 as f64
        }
    }
}

impl std::ops::Add for Money {
    type Output = Money;
    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl std::ops::Sub for Money {
    type Output = Money;
    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        Money(iter.map(|m| m.0).sum())
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.abs();
        write!(f, "{sign}${}.{:02}", abs / 100, abs % 100)
    }
}

/// A half-open UTC time range `[start, end)` used for performance queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Trailing window of `days` ending at `end`.
    pub fn trailing_days(end: DateTime<Utc>, days: i64) -> Self {
        Self {
            start: end - chrono::Duration::days(days),
            end,
        }
    }

    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        t >= self.start && t < self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_id_roundtrip() {
        for p in PlatformId::ALL {
            assert_eq!(p.as_str().parse::<PlatformId>().unwrap(), p);
        }
        assert!("bing_ads".parse::<PlatformId>().is_err());
    }

    #[test]
    fn money_from_major_rounds_to_cent() {
        assert_eq!(Money::from_major(100.0).minor(), 10_000);
        assert_eq!(Money::from_major(0.015).minor(), 2);
        assert_eq!(Money::from_major(-0.015).minor(), -2);
    }

    #[test]
    fn money_display() {
        assert_eq!(Money::from_minor(13_000).to_string(), "$130.00");
        assert_eq!(Money::from_minor(-5).to_string(), "-$0.05");
    }

    #[test]
    fn money_fraction_of_zero_base() {
        assert_eq!(Money::from_minor(500).fraction_of(Money::ZERO), 0.0);
        let frac = Money::from_minor(3_000).fraction_of(Money::from_minor(10_000));
        assert!((frac - 0.3).abs() < f64::EPSILON);
    }

    #[test]
    fn money_scale_no_cumulative_drift() {
        // Repeated scaling always re-rounds against the integral base, so a
        // full day of 20% cuts stays exact to the cent.
        let mut budget = Money::from_major(100.0);
        for _ in 0..10 {
            budget = budget.scale(0.8);
        }
        assert_eq!(budget.minor(), 1_074); // 100 * 0.8^10 = 10.7374.. → $10.74
    }

    #[test]
    fn campaign_ref_display() {
        let r = CampaignRef::new(PlatformId::GoogleAds, "G1");
        assert_eq!(r.to_string(), "google_ads:G1");
    }
}

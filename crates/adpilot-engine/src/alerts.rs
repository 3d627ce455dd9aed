//! Post-audit alert sweep.
//!
//! After a tick's samples are in, derive alert conditions the dashboard and
//! notification layers consume from the ledger. Notification transports are
//! out of scope here; the alerts are ledgered as ALERT events.

use serde::{Deserialize, Serialize};

use adpilot_core::{CampaignRef, MetricSample};

/// Spend floor below which a zero-conversion day is noise, not an alert.
const ZERO_CONVERSION_SPEND_FLOOR: f64 = 50.0;
/// Breakeven ROAS.
const LOW_ROAS_THRESHOLD: f64 = 1.0;
/// Spend floor for the ROAS alert.
const LOW_ROAS_SPEND_FLOOR: f64 = 100.0;
/// CPC ceiling.
const HIGH_CPC_THRESHOLD: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertKind {
    ZeroConversions,
    LowRoas,
    HighCpc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertSeverity {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub campaign: CampaignRef,
    pub kind: AlertKind,
    pub severity: AlertSeverity,
    pub message: String,
}

/// Derive alerts from one tick's samples.
pub fn derive_alerts(samples: &[MetricSample]) -> Vec<Alert> {
    let mut alerts = Vec::new();

    for sample in samples {
        let spend = sample.spend.major();

        if sample.conversions == 0 && spend > ZERO_CONVERSION_SPEND_FLOOR {
            alerts.push(Alert {
                campaign: sample.campaign.clone(),
                kind: AlertKind::ZeroConversions,
                severity: AlertSeverity::High,
                message: format!(
                    "campaign {} has zero conversions with {} spend",
                    sample.campaign, sample.spend
                ),
            });
        }

        // Zero revenue is the worst ROAS, not an exemption: the comparison
        // is unconditional above the spend floor.
        let roas = sample.roas();
        if roas < LOW_ROAS_THRESHOLD && spend > LOW_ROAS_SPEND_FLOOR {
            alerts.push(Alert {
                campaign: sample.campaign.clone(),
                kind: AlertKind::LowRoas,
                severity: AlertSeverity::Medium,
                message: format!(
                    "campaign {} ROAS {:.2}x is below breakeven",
                    sample.campaign, roas
                ),
            });
        }

        if sample.cpc() > HIGH_CPC_THRESHOLD {
            alerts.push(Alert {
                campaign: sample.campaign.clone(),
                kind: AlertKind::HighCpc,
                severity: AlertSeverity::Low,
                message: format!(
                    "campaign {} CPC ${:.2} is above the ceiling",
                    sample.campaign, sample.cpc()
                ),
            });
        }
    }

    alerts
}

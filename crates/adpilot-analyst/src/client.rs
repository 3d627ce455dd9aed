use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use adpilot_core::{
    CampaignRef, CampaignStatus, ExpectedImpact, MetricSample, PilotError, PlatformId, Proposal,
    ProposalKind, Result, StateSnapshot,
};

/// Aggregate health signal returned with every analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OverallHealth {
    Excellent,
    Good,
    Fair,
    Poor,
    Critical,
}

impl std::fmt::Display for OverallHealth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Excellent => "EXCELLENT",
            Self::Good => "GOOD",
            Self::Fair => "FAIR",
            Self::Poor => "POOR",
            Self::Critical => "CRITICAL",
        };
        f.write_str(s)
    }
}

/// The guardrail settings the analyst is told about, so it can avoid
/// proposing actions that would be rejected anyway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuardrailSummary {
    pub confidence_threshold: f64,
    pub major_change_fraction: f64,
    pub max_single_budget_increase_fraction: f64,
    pub min_campaign_runtime_hours_before_pause: i64,
    pub automation_level: String,
}

/// Everything the analyst needs and nothing it doesn't: redaction is by
/// construction: only these fields ever reach the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    /// Samples from the current tick.
    pub current: Vec<MetricSample>,
    /// Bounded trailing window (typically 7 days).
    pub trailing: Vec<MetricSample>,
    pub guardrails: GuardrailSummary,
    /// Proposals already awaiting approval, so the analyst doesn't repeat them.
    pub pending: Vec<Proposal>,
}

impl AnalysisRequest {
    /// Deterministic fingerprint of the inputs. A retried tick with identical
    /// inputs produces an identical fingerprint, which callers use as an
    /// idempotency key so the analyst is not multiply-billed.
    pub fn fingerprint(&self) -> String {
        use std::hash::{Hash, Hasher};
        let canonical = serde_json::to_string(self).unwrap_or_default();
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        canonical.hash(&mut hasher);
        format!("{:016x}", hasher.finish())
    }
}

/// The analyst's reply, already validated into domain types.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResponse {
    pub proposals: Vec<Proposal>,
    pub overall_health: OverallHealth,
}

/// Trait implemented by analyst backends (live Anthropic, mock).
#[async_trait]
pub trait Analyst: Send + Sync {
    fn name(&self) -> &str;

    /// One analysis round-trip under a hard deadline. Malformed responses
    /// fail the call cleanly; they never leak partial proposals.
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResponse>;
}

// ── Wire schema ────────────────────────────────────────────────
//
// What the model actually returns. Unknown fields are ignored; missing
// required fields fail analysis. Everything validates into the fixed tagged
// union before it leaves this module.

#[derive(Debug, Deserialize)]
struct WireResponse {
    overall_health: String,
    #[serde(default)]
    proposals: Vec<WireProposal>,
}

#[derive(Debug, Deserialize)]
struct WireProposal {
    platform: String,
    campaign_id: String,
    kind: String,
    current_daily_budget: f64,
    #[serde(default)]
    proposed_daily_budget: Option<f64>,
    confidence: f64,
    reasoning: String,
    #[serde(default)]
    expected_impact: Option<WireImpact>,
}

#[derive(Debug, Deserialize)]
struct WireImpact {
    metric: String,
    change_percent: f64,
}

/// Strip a ```json fence if the model wrapped its reply in one.
pub(crate) fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    body.strip_suffix("```").unwrap_or(body).trim()
}

/// Parse and validate raw analyst output into domain types.
pub(crate) fn parse_response(raw: &str) -> Result<AnalysisResponse> {
    let body = strip_code_fence(raw);
    let wire: WireResponse = serde_json::from_str(body)
        .map_err(|e| PilotError::AnalystMalformed(format!("undecodable response: {e}")))?;

    let overall_health = match wire.overall_health.as_str() {
        "EXCELLENT" => OverallHealth::Excellent,
        "GOOD" => OverallHealth::Good,
        "FAIR" => OverallHealth::Fair,
        "POOR" => OverallHealth::Poor,
        "CRITICAL" => OverallHealth::Critical,
        other => {
            return Err(PilotError::AnalystMalformed(format!(
                "unknown overall_health: {other}"
            )))
        }
    };

    let proposals = wire
        .proposals
        .into_iter()
        .map(validate_proposal)
        .collect::<Result<Vec<_>>>()?;

    Ok(AnalysisResponse {
        proposals,
        overall_health,
    })
}

fn validate_proposal(wire: WireProposal) -> Result<Proposal> {
    let platform = PlatformId::from_str(&wire.platform)
        .map_err(PilotError::AnalystMalformed)?;

    let kind = match wire.kind.as_str() {
        "PAUSE" => ProposalKind::Pause,
        "RESUME" => ProposalKind::Resume,
        "INCREASE_BUDGET" => ProposalKind::IncreaseBudget,
        "DECREASE_BUDGET" => ProposalKind::DecreaseBudget,
        "REALLOCATE" => ProposalKind::Reallocate,
        "CREATE_CAMPAIGN" => ProposalKind::CreateCampaign,
        "STRATEGY_CHANGE" => ProposalKind::StrategyChange,
        other => {
            return Err(PilotError::AnalystMalformed(format!(
                "unknown proposal kind: {other}"
            )))
        }
    };

    if !(0.0..=1.0).contains(&wire.confidence) {
        return Err(PilotError::AnalystMalformed(format!(
            "confidence {} out of [0, 1]",
            wire.confidence
        )));
    }
    if wire.current_daily_budget < 0.0 {
        return Err(PilotError::AnalystMalformed(
            "negative current_daily_budget".into(),
        ));
    }

    let current = adpilot_core::Money::from_major(wire.current_daily_budget);
    let (from_state, to_state) = match kind {
        ProposalKind::Pause => (
            StateSnapshot {
                status: CampaignStatus::Enabled,
                daily_budget: current,
            },
            StateSnapshot {
                status: CampaignStatus::Paused,
                daily_budget: current,
            },
        ),
        ProposalKind::Resume => (
            StateSnapshot {
                status: CampaignStatus::Paused,
                daily_budget: current,
            },
            StateSnapshot {
                status: CampaignStatus::Enabled,
                daily_budget: current,
            },
        ),
        ProposalKind::IncreaseBudget
        | ProposalKind::DecreaseBudget
        | ProposalKind::Reallocate => {
            let proposed = wire.proposed_daily_budget.ok_or_else(|| {
                PilotError::AnalystMalformed(format!(
                    "{kind} proposal missing proposed_daily_budget"
                ))
            })?;
            if proposed < 0.0 {
                return Err(PilotError::AnalystMalformed(
                    "negative proposed_daily_budget".into(),
                ));
            }
            (
                StateSnapshot {
                    status: CampaignStatus::Enabled,
                    daily_budget: current,
                },
                StateSnapshot {
                    status: CampaignStatus::Enabled,
                    daily_budget: adpilot_core::Money::from_major(proposed),
                },
            )
        }
        ProposalKind::CreateCampaign | ProposalKind::StrategyChange => {
            let snapshot = StateSnapshot {
                status: CampaignStatus::Enabled,
                daily_budget: current,
            };
            (snapshot, snapshot)
        }
    };

    Ok(Proposal {
        id: Uuid::new_v4(),
        campaign: CampaignRef::new(platform, wire.campaign_id),
        kind,
        from_state,
        to_state,
        confidence: wire.confidence,
        reasoning: wire.reasoning,
        expected_impact: wire
            .expected_impact
            .map(|i| ExpectedImpact {
                metric: i.metric,
                change_percent: i.change_percent,
            })
            .unwrap_or(ExpectedImpact {
                metric: "roas".into(),
                change_percent: 0.0,
            }),
        produced_at: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fence_stripping() {
        assert_eq!(strip_code_fence("{\"a\":1}"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```\n{\"a\":1}\n```"), "{\"a\":1}");
    }

    #[test]
    fn parses_full_response_and_ignores_unknown_fields() {
        let raw = r#"{
            "overall_health": "GOOD",
            "health_score": 78,
            "summary": "ignored",
            "proposals": [{
                "platform": "meta_ads",
                "campaign_id": "M1",
                "kind": "DECREASE_BUDGET",
                "current_daily_budget": 80.0,
                "proposed_daily_budget": 64.0,
                "confidence": 0.93,
                "reasoning": "ROAS below target for 4 days",
                "expected_impact": {"metric": "roas", "change_percent": 12.0},
                "priority": "HIGH"
            }]
        }"#;
        let resp = parse_response(raw).unwrap();
        assert_eq!(resp.overall_health, OverallHealth::Good);
        assert_eq!(resp.proposals.len(), 1);
        let p = &resp.proposals[0];
        assert_eq!(p.kind, ProposalKind::DecreaseBudget);
        assert_eq!(p.to_state.daily_budget, adpilot_core::Money::from_major(64.0));
        assert!((p.change_fraction() - 0.2).abs() < 1e-9);
    }

    #[test]
    fn missing_required_field_fails() {
        let raw = r#"{"proposals": []}"#;
        assert!(matches!(
            parse_response(raw),
            Err(PilotError::AnalystMalformed(_))
        ));
    }

    #[test]
    fn unknown_kind_is_rejected_not_coerced() {
        let raw = r#"{
            "overall_health": "FAIR",
            "proposals": [{
                "platform": "google_ads",
                "campaign_id": "G1",
                "kind": "DOUBLE_EVERYTHING",
                "current_daily_budget": 100.0,
                "confidence": 0.9,
                "reasoning": "x"
            }]
        }"#;
        assert!(matches!(
            parse_response(raw),
            Err(PilotError::AnalystMalformed(_))
        ));
    }

    #[test]
    fn out_of_range_confidence_is_rejected() {
        let raw = r#"{
            "overall_health": "GOOD",
            "proposals": [{
                "platform": "google_ads",
                "campaign_id": "G1",
                "kind": "PAUSE",
                "current_daily_budget": 100.0,
                "confidence": 1.7,
                "reasoning": "x"
            }]
        }"#;
        assert!(parse_response(raw).is_err());
    }

    #[test]
    fn budget_kind_requires_proposed_budget() {
        let raw = r#"{
            "overall_health": "GOOD",
            "proposals": [{
                "platform": "google_ads",
                "campaign_id": "G1",
                "kind": "INCREASE_BUDGET",
                "current_daily_budget": 100.0,
                "confidence": 0.9,
                "reasoning": "x"
            }]
        }"#;
        assert!(parse_response(raw).is_err());
    }

    #[test]
    fn fingerprint_is_deterministic_and_input_sensitive() {
        let request = AnalysisRequest {
            current: vec![],
            trailing: vec![],
            guardrails: GuardrailSummary {
                confidence_threshold: 0.85,
                major_change_fraction: 0.2,
                max_single_budget_increase_fraction: 0.3,
                min_campaign_runtime_hours_before_pause: 72,
                automation_level: "semi".into(),
            },
            pending: vec![],
        };
        assert_eq!(request.fingerprint(), request.fingerprint());

        let mut other = request.clone();
        other.guardrails.confidence_threshold = 0.9;
        assert_ne!(request.fingerprint(), other.fingerprint());
    }
}

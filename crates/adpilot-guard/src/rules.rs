//! The guardrail gate: deterministic classification of proposals.
//!
//! Rules are evaluated in a fixed order and the first match wins. Every rule
//! is pure over `(proposal, context, effective guardrails)`, so the same
//! inputs always yield the same decision, and each rule is an addressable
//! unit so tests can target individual clauses.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::str::FromStr;
use tracing::debug;

use adpilot_config::GuardrailsConfig;
use adpilot_core::{
    Campaign, CampaignRef, Decision, Invariant, Justification, Money, PlatformId, Proposal,
    ProposalKind, Verdict,
};

use crate::counters::DailyCounters;
use crate::level::AutomationLevel;
use crate::overrides::{OverrideField, OverrideStore};

/// The thresholds in force for one gate evaluation, after layering the base
/// config, per-campaign config, and live time-boxed overrides.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveGuardrails {
    pub confidence_threshold: f64,
    pub max_daily_adjustments: u32,
    pub max_budget_reallocation_fraction_per_day: f64,
    pub max_single_budget_increase_fraction: f64,
    pub min_campaign_runtime_hours_before_pause: i64,
    pub major_change_fraction: f64,
    pub level: AutomationLevel,
    pub platform_ceilings: HashMap<PlatformId, Money>,
}

impl EffectiveGuardrails {
    /// Resolve the thresholds that apply to `campaign` at `now`.
    pub fn resolve(
        config: &GuardrailsConfig,
        overrides: &OverrideStore,
        campaign: Option<&CampaignRef>,
        now: DateTime<Utc>,
    ) -> Self {
        let level = AutomationLevel::from_str(&config.automation_level)
            .unwrap_or(AutomationLevel::Semi);

        let per_campaign = campaign
            .and_then(|r| config.per_campaign.get(&r.to_string()));

        let mut effective = Self {
            confidence_threshold: per_campaign
                .and_then(|p| p.confidence_threshold)
                .unwrap_or(config.confidence_threshold),
            max_daily_adjustments: config.max_daily_adjustments,
            max_budget_reallocation_fraction_per_day: config
                .max_budget_reallocation_fraction_per_day,
            max_single_budget_increase_fraction: per_campaign
                .and_then(|p| p.max_single_budget_increase_fraction)
                .unwrap_or(config.max_single_budget_increase_fraction),
            min_campaign_runtime_hours_before_pause: per_campaign
                .and_then(|p| p.min_campaign_runtime_hours_before_pause)
                .unwrap_or(config.min_campaign_runtime_hours_before_pause),
            major_change_fraction: per_campaign
                .and_then(|p| p.major_change_fraction)
                .unwrap_or(config.major_change_fraction),
            level,
            platform_ceilings: config
                .platform_ceilings
                .iter()
                .filter_map(|(key, dollars)| {
                    PlatformId::from_str(key)
                        .ok()
                        .map(|p| (p, Money::from_major(*dollars)))
                })
                .collect(),
        };

        // Time-boxed overrides shadow everything static.
        if let Some(v) = overrides.value_for(OverrideField::ConfidenceThreshold, campaign, now) {
            effective.confidence_threshold = v;
        }
        if let Some(v) = overrides.value_for(OverrideField::MajorChangeFraction, campaign, now) {
            effective.major_change_fraction = v;
        }
        if let Some(v) = overrides.value_for(OverrideField::MaxDailyAdjustments, campaign, now) {
            effective.max_daily_adjustments = v.max(0.0) as u32;
        }
        if let Some(v) =
            overrides.value_for(OverrideField::MaxSingleBudgetIncreaseFraction, campaign, now)
        {
            effective.max_single_budget_increase_fraction = v;
        }
        if let Some(v) = overrides.value_for(OverrideField::MinCampaignRuntimeHours, campaign, now)
        {
            effective.min_campaign_runtime_hours_before_pause = v as i64;
        }

        effective
    }

    pub fn ceiling(&self, platform: PlatformId) -> Option<Money> {
        self.platform_ceilings.get(&platform).copied()
    }
}

/// Everything the gate sees besides the proposal itself.
pub struct GateContext<'a> {
    pub now: DateTime<Utc>,
    pub campaign: &'a Campaign,
    pub counters: &'a DailyCounters,
    /// Sum of enabled daily budgets on the campaign's platform, as of the
    /// current tick's collection.
    pub platform_enabled_total: Money,
    /// The campaign's budget at start of day, the basis for the per-campaign cap.
    pub start_of_day_budget: Money,
    /// Sum of enabled budgets on the campaign's platform at start of day.
    pub start_of_day_platform_total: Money,
    /// Sum of enabled budgets across every platform at start of day, the
    /// basis for the global reallocation cap.
    pub start_of_day_global_total: Money,
}

/// One addressable guardrail clause. Returns `Some` when the rule fires.
pub trait GateRule: Send + Sync {
    fn name(&self) -> &'static str;
    fn evaluate(
        &self,
        proposal: &Proposal,
        ctx: &GateContext<'_>,
        guardrails: &EffectiveGuardrails,
    ) -> Option<Decision>;
}

// ── Confidence ─────────────────────────────────────────────────

/// Rejects proposals below the confidence threshold. Strict `<`: a proposal
/// exactly at the threshold is accepted.
pub struct ConfidenceRule;

impl GateRule for ConfidenceRule {
    fn name(&self) -> &'static str {
        "confidence"
    }

    fn evaluate(
        &self,
        proposal: &Proposal,
        _ctx: &GateContext<'_>,
        guardrails: &EffectiveGuardrails,
    ) -> Option<Decision> {
        (proposal.confidence < guardrails.confidence_threshold)
            .then(|| Decision::rejected(Justification::LowConfidence))
    }
}

// ── Campaign runtime ───────────────────────────────────────────

/// Never pause a campaign that hasn't run long enough to be judged.
pub struct RuntimeRule;

impl GateRule for RuntimeRule {
    fn name(&self) -> &'static str {
        "runtime"
    }

    fn evaluate(
        &self,
        proposal: &Proposal,
        ctx: &GateContext<'_>,
        guardrails: &EffectiveGuardrails,
    ) -> Option<Decision> {
        (proposal.kind == ProposalKind::Pause
            && ctx.campaign.age_hours(ctx.now) < guardrails.min_campaign_runtime_hours_before_pause)
            .then(|| Decision::rejected(Justification::InsufficientRuntime))
    }
}

// ── Budget invariants ──────────────────────────────────────────

/// Rejects anything whose execution would breach a budget invariant. Run a
/// second time at execution for approved proposals, because state may have
/// moved on since they were queued.
pub struct InvariantRule;

impl InvariantRule {
    fn check(
        proposal: &Proposal,
        ctx: &GateContext<'_>,
        guardrails: &EffectiveGuardrails,
    ) -> Option<Invariant> {
        // The platform ceiling must hold after the action.
        if let Some(ceiling) = guardrails.ceiling(proposal.campaign.platform) {
            let added = match proposal.kind {
                ProposalKind::IncreaseBudget | ProposalKind::Reallocate => {
                    let delta = proposal.signed_budget_delta();
                    if delta > Money::ZERO { delta } else { Money::ZERO }
                }
                ProposalKind::Resume => proposal.to_state.daily_budget,
                _ => Money::ZERO,
            };
            if ctx.platform_enabled_total.saturating_add(added) > ceiling {
                return Some(Invariant::PlatformCeiling);
            }
        }

        // Committed auto-executions per day are capped.
        if ctx.counters.adjustments_made() >= guardrails.max_daily_adjustments {
            return Some(Invariant::DailyAdjustmentCap);
        }

        // Per campaign: cumulative absolute delta bounded by a fraction of
        // the start-of-day budget.
        if proposal.kind.moves_budget() {
            let would_move = ctx
                .counters
                .campaign_delta(&proposal.campaign)
                .saturating_add(proposal.budget_delta());
            let cap = ctx
                .start_of_day_budget
                .scale(guardrails.max_single_budget_increase_fraction);
            if would_move > cap {
                return Some(Invariant::CampaignDailyDelta);
            }

            // Globally: total absolute budget moved per day is bounded as a
            // fraction of the start-of-day total across every platform. The
            // moved counter is global, so the base must be too.
            let global_cap = ctx
                .start_of_day_global_total
                .scale(guardrails.max_budget_reallocation_fraction_per_day);
            if ctx
                .counters
                .budget_moved()
                .saturating_add(proposal.budget_delta())
                > global_cap
            {
                return Some(Invariant::CampaignDailyDelta);
            }
        }

        None
    }
}

impl GateRule for InvariantRule {
    fn name(&self) -> &'static str {
        "invariants"
    }

    fn evaluate(
        &self,
        proposal: &Proposal,
        ctx: &GateContext<'_>,
        guardrails: &EffectiveGuardrails,
    ) -> Option<Decision> {
        Self::check(proposal, ctx, guardrails)
            .map(|invariant| Decision::rejected(Justification::InvariantViolation(invariant)))
    }
}

// ── Major change ───────────────────────────────────────────────

/// Escalates budget changes above the major-change fraction. Strict `>`:
/// a change exactly at the fraction does not escalate.
pub struct MajorChangeRule;

impl GateRule for MajorChangeRule {
    fn name(&self) -> &'static str {
        "major_change"
    }

    fn evaluate(
        &self,
        proposal: &Proposal,
        _ctx: &GateContext<'_>,
        guardrails: &EffectiveGuardrails,
    ) -> Option<Decision> {
        if !proposal.kind.moves_budget() {
            return None;
        }
        let threshold = guardrails
            .level
            .effective_major_change_fraction(guardrails.major_change_fraction);
        (proposal.change_fraction() > threshold)
            .then(|| Decision::approval_required(Justification::MajorChange))
    }
}

// ── High-impact kinds ──────────────────────────────────────────

/// Structural changes always go through a human.
pub struct HighImpactKindRule;

impl GateRule for HighImpactKindRule {
    fn name(&self) -> &'static str {
        "high_impact_kind"
    }

    fn evaluate(
        &self,
        proposal: &Proposal,
        _ctx: &GateContext<'_>,
        _guardrails: &EffectiveGuardrails,
    ) -> Option<Decision> {
        matches!(
            proposal.kind,
            ProposalKind::CreateCampaign | ProposalKind::StrategyChange
        )
        .then(|| Decision::approval_required(Justification::HighImpactKind))
    }
}

// ── The gate ───────────────────────────────────────────────────

/// Applies the rules in order; never silently drops or mutates a proposal.
pub struct GuardrailGate {
    rules: Vec<Box<dyn GateRule>>,
}

impl Default for GuardrailGate {
    fn default() -> Self {
        Self::new()
    }
}

impl GuardrailGate {
    pub fn new() -> Self {
        Self {
            rules: vec![
                Box::new(ConfidenceRule),
                Box::new(RuntimeRule),
                Box::new(InvariantRule),
                Box::new(MajorChangeRule),
                Box::new(HighImpactKindRule),
            ],
        }
    }

    /// Classify one proposal. First matching rule wins; the fallthrough
    /// auto-executes unless the automation level is advisory.
    pub fn evaluate(
        &self,
        proposal: &Proposal,
        ctx: &GateContext<'_>,
        guardrails: &EffectiveGuardrails,
    ) -> Decision {
        for rule in &self.rules {
            if let Some(decision) = rule.evaluate(proposal, ctx, guardrails) {
                debug!(
                    rule = rule.name(),
                    proposal = %proposal.id,
                    campaign = %proposal.campaign,
                    verdict = ?decision.verdict,
                    "guardrail fired"
                );
                return decision;
            }
        }

        if guardrails.level.allows_auto_execution() {
            Decision::auto_execute()
        } else {
            Decision::approval_required(Justification::AdvisoryMode)
        }
    }

    /// Re-run only the invariant and runtime checks against current state. Used
    /// at execution time for approved proposals: approval bypasses
    /// re-analysis but never re-guardrailing.
    pub fn recheck_invariants(
        &self,
        proposal: &Proposal,
        ctx: &GateContext<'_>,
        guardrails: &EffectiveGuardrails,
    ) -> Option<Decision> {
        InvariantRule.evaluate(proposal, ctx, guardrails).or_else(|| {
            // Runtime still applies: a pause approved before the campaign was
            // old enough must not slip through on a later execution.
            RuntimeRule.evaluate(proposal, ctx, guardrails)
        })
    }

    /// Whether the gate would auto-execute, for callers that only need the
    /// verdict class.
    pub fn would_auto_execute(
        &self,
        proposal: &Proposal,
        ctx: &GateContext<'_>,
        guardrails: &EffectiveGuardrails,
    ) -> bool {
        self.evaluate(proposal, ctx, guardrails).verdict == Verdict::AutoExecute
    }
}

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use adpilot_adapters::{AdapterRegistry, FxTable, Normalizer, PlatformAdapter, RawMetrics};
use adpilot_analyst::{AnalysisRequest, Analyst, GuardrailSummary};
use adpilot_config::PilotConfig;
use adpilot_core::{
    ActionOutcome, AdapterError, Campaign, CampaignRef, DateRange, Decision, EventKind,
    Justification, MetricSample, Money, PlatformId, Proposal, ProposalKind, Result,
};
use adpilot_guard::{
    ApprovalQueue, DailyCounters, EffectiveGuardrails, GateContext, GuardrailGate, OverrideStore,
};
use adpilot_ledger::Ledger;

use crate::alerts::derive_alerts;
use crate::lease::Lease;
use crate::tick::{TickOutcome, TickPhase, TickSummary};

/// Fate of one execution attempt, used to drive per-platform deferral.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ExecStatus {
    Executed,
    Failed,
    RateLimited,
}

/// The decision engine. Owns the tick transaction, the daily counters, and
/// the approval queue; everything else is passed in at construction.
pub struct DecisionEngine {
    config: Arc<RwLock<PilotConfig>>,
    registry: Arc<AdapterRegistry>,
    analyst: Arc<dyn Analyst>,
    ledger: Arc<Ledger>,
    fx: Arc<FxTable>,
    gate: GuardrailGate,
    counters: Mutex<DailyCounters>,
    approvals: ApprovalQueue,
    pub(crate) overrides: Mutex<OverrideStore>,
    pub(crate) lease: Lease,
    last_tick: Mutex<Option<DateTime<Utc>>>,
}

impl DecisionEngine {
    /// Build the engine, reconstructing today's counters from the ledger.
    pub fn new(
        config: Arc<RwLock<PilotConfig>>,
        registry: Arc<AdapterRegistry>,
        analyst: Arc<dyn Analyst>,
        ledger: Arc<Ledger>,
        fx: Arc<FxTable>,
    ) -> Result<Self> {
        let snapshot = config.read().clone();
        let tz = snapshot.engine.tz();
        let now = Utc::now();

        // Cold-start recovery: replay today's executed actions into fresh
        // counters. The ledger is the only counter store.
        let mut counters = DailyCounters::new(tz, now);
        let midnight = local_midnight_utc(tz, now);
        let recovered = ledger.executed_since(midnight)?;
        for adjustment in &recovered {
            counters.record_execution(&adjustment.campaign, adjustment.signed_delta);
        }
        if !recovered.is_empty() {
            info!(
                replayed = recovered.len(),
                adjustments = counters.adjustments_made(),
                "daily counters reconstructed from ledger"
            );
        }

        let approval_ttl = chrono::Duration::seconds(snapshot.guardrails.approval_ttl_secs as i64);
        let lease_ttl = chrono::Duration::seconds(snapshot.engine.lease_ttl_secs as i64);

        Ok(Self {
            config,
            registry,
            analyst,
            ledger,
            fx,
            gate: GuardrailGate::new(),
            counters: Mutex::new(counters),
            approvals: ApprovalQueue::new(approval_ttl),
            overrides: Mutex::new(OverrideStore::new()),
            lease: Lease::new(lease_ttl),
            last_tick: Mutex::new(None),
        })
    }

    /// Convenience constructor for a plain config value.
    pub fn from_config(
        config: PilotConfig,
        registry: Arc<AdapterRegistry>,
        analyst: Arc<dyn Analyst>,
        ledger: Arc<Ledger>,
    ) -> Result<Self> {
        Self::new(
            Arc::new(RwLock::new(config)),
            registry,
            analyst,
            ledger,
            Arc::new(FxTable::default()),
        )
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    pub(crate) fn approvals(&self) -> &ApprovalQueue {
        &self.approvals
    }

    pub(crate) fn config_snapshot(&self) -> PilotConfig {
        self.config.read().clone()
    }

    pub fn tick_interval_secs(&self) -> u64 {
        self.config.read().engine.tick_interval_secs
    }

    /// Auto-executed adjustments committed so far today.
    pub fn daily_adjustments(&self) -> u32 {
        self.counters.lock().adjustments_made()
    }

    // ── Tick orchestration ─────────────────────────────────────

    /// Run one tick. Serial by construction: if the lease is held, the tick
    /// is skipped (ledgered), never queued.
    pub async fn run_tick(&self, now: DateTime<Utc>) -> Result<TickSummary> {
        let Some(_lease) = self.lease.try_acquire(now) else {
            self.ledger.record_event(
                EventKind::TickSkipped,
                None,
                None,
                "tick lease held, skipping",
            )?;
            return Ok(TickSummary::skipped(now));
        };

        self.rollover_counters(now)?;
        self.sweep_expired_approvals(now)?;

        let snapshot = self.config_snapshot();
        let deadline_secs =
            snapshot.engine.tick_interval_secs as f64 * snapshot.engine.tick_deadline_fraction;
        let deadline = std::time::Duration::from_secs_f64(deadline_secs.max(1.0));

        let phase = Arc::new(Mutex::new(TickPhase::Collecting));
        let result = tokio::time::timeout(
            deadline,
            self.tick_inner(now, &snapshot, Arc::clone(&phase)),
        )
        .await;

        match result {
            Ok(Ok(summary)) => Ok(summary),
            Ok(Err(e)) => {
                // An unrecoverable mid-tick error (ledger write path, broken
                // internal state) is a bug-class failure: leave a CRITICAL
                // entry before surfacing it.
                let at = *phase.lock();
                error!(phase = %at, error = %e, "tick aborted");
                let _ = self.ledger.record_event(
                    EventKind::Critical,
                    None,
                    None,
                    &format!("tick aborted in {at}: {e}"),
                );
                Err(e)
            }
            Err(_) => {
                let at = *phase.lock();
                warn!(phase = %at, "tick deadline exceeded");
                self.ledger.record_event(
                    EventKind::TickFailed,
                    None,
                    None,
                    &format!("tick deadline exceeded in {at}"),
                )?;
                let mut summary = TickSummary::started(now);
                summary.outcome = TickOutcome::Failed { phase: at };
                summary.final_phase = TickPhase::Failed;
                summary.finished_at = Utc::now();
                Ok(summary)
            }
        }
    }

    async fn tick_inner(
        &self,
        now: DateTime<Utc>,
        config: &PilotConfig,
        phase: Arc<Mutex<TickPhase>>,
    ) -> Result<TickSummary> {
        let mut summary = TickSummary::started(now);

        // ── COLLECTING ───
        *phase.lock() = TickPhase::Collecting;
        let known = self.ledger.known_refs()?;
        let (campaign_map, samples) = self.collect_and_normalize(now, config, &known, &mut summary).await?;

        // ── ANALYZING ───
        *phase.lock() = TickPhase::Analyzing;
        let trailing = self.ledger.samples_in_range(DateRange::trailing_days(
            now,
            config.engine.trailing_window_days,
        ))?;
        let pending: Vec<Proposal> = self
            .approvals
            .list_pending(now)
            .into_iter()
            .map(|e| e.proposal)
            .collect();
        let request = AnalysisRequest {
            current: samples.clone(),
            trailing,
            guardrails: guardrail_summary(config),
            pending,
        };

        let response = match self.analyst.analyze(&request).await {
            Ok(response) => response,
            Err(e) => {
                error!(error = %e, "analysis failed, aborting tick");
                self.ledger.record_event(
                    EventKind::TickFailed,
                    None,
                    None,
                    &format!("analysis failed: {e}"),
                )?;
                summary.outcome = TickOutcome::Failed {
                    phase: TickPhase::Analyzing,
                };
                summary.final_phase = TickPhase::Failed;
                summary.finished_at = Utc::now();
                return Ok(summary);
            }
        };
        summary.overall_health = Some(response.overall_health);

        // ── GATING ───
        *phase.lock() = TickPhase::Gating;
        let to_execute =
            self.gate_proposals(now, config, response.proposals, &campaign_map, &mut summary)?;

        // ── EXECUTING ───
        *phase.lock() = TickPhase::Executing;
        self.execute_wave(now, config, &to_execute, &mut summary).await;

        // ── AUDITING ───
        *phase.lock() = TickPhase::Auditing;
        let alerts = derive_alerts(&samples);
        for alert in &alerts {
            self.ledger.record_event(
                EventKind::Alert,
                None,
                Some(&alert.campaign),
                &serde_json::to_string(alert)?,
            )?;
        }
        summary.alerts = alerts.len();

        *self.last_tick.lock() = Some(now);
        summary.final_phase = TickPhase::Idle;
        summary.finished_at = Utc::now();
        info!(
            health = ?summary.overall_health,
            platforms = summary.platforms_collected,
            excluded = summary.platforms_excluded.len(),
            proposals = summary.proposals_seen,
            executed = summary.executed,
            queued = summary.queued_for_approval,
            rejected = summary.rejected,
            alerts = summary.alerts,
            "tick audited"
        );
        Ok(summary)
    }

    /// Fan out collection across every registered platform, then normalise.
    /// Platform failures exclude that platform from this tick only; the loop
    /// is self-healing because the next tick retries.
    async fn collect_and_normalize(
        &self,
        now: DateTime<Utc>,
        config: &PilotConfig,
        known: &HashSet<CampaignRef>,
        summary: &mut TickSummary,
    ) -> Result<(HashMap<CampaignRef, Campaign>, Vec<MetricSample>)> {
        let last = self.last_tick.lock().unwrap_or_else(|| {
            now - chrono::Duration::seconds(config.engine.tick_interval_secs as i64)
        });
        let range = DateRange::new(last, now);
        let per_call = std::time::Duration::from_secs(
            (config.engine.tick_interval_secs / 4).clamp(5, 120),
        );

        let collections = futures::future::join_all(self.registry.iter().map(
            |(platform, adapter)| {
                let adapter = Arc::clone(adapter);
                async move { (platform, collect_platform(adapter, range, per_call).await) }
            },
        ))
        .await;

        let mut campaign_map = HashMap::new();
        let mut samples = Vec::new();

        for (platform, outcome) in collections {
            let (campaigns, raws) = match outcome {
                Ok(data) => data,
                Err(e) => {
                    warn!(%platform, error = %e, "platform excluded from tick");
                    self.ledger.record_event(
                        EventKind::PlatformExcluded,
                        Some(platform),
                        None,
                        &e.to_string(),
                    )?;
                    summary.platforms_excluded.push(platform);
                    continue;
                }
            };

            let batch = match Normalizer::normalize_batch(platform, &raws, &self.fx, known, now) {
                Ok(batch) => batch,
                Err(e) => {
                    warn!(%platform, error = %e, "normalisation failed, platform excluded");
                    self.ledger.record_event(
                        EventKind::PlatformExcluded,
                        Some(platform),
                        None,
                        &e.to_string(),
                    )?;
                    summary.platforms_excluded.push(platform);
                    continue;
                }
            };

            for campaign in campaigns {
                self.ledger.upsert_campaign(&campaign, batch.last_seen_at)?;
                campaign_map.insert(campaign.reference.clone(), campaign);
            }
            if !batch.newly_seen.is_empty() {
                info!(%platform, count = batch.newly_seen.len(), "new campaigns discovered");
            }
            samples.extend(batch.samples);
            summary.platforms_collected += 1;
        }

        self.ledger.insert_samples(&samples)?;
        summary.samples_collected = samples.len();
        Ok((campaign_map, samples))
    }

    /// Classify every proposal and persist its decision. Returns the
    /// auto-execute winners paired with their pre-tick campaign state,
    /// reducing actions first.
    fn gate_proposals(
        &self,
        now: DateTime<Utc>,
        config: &PilotConfig,
        mut proposals: Vec<Proposal>,
        campaign_map: &HashMap<CampaignRef, Campaign>,
        summary: &mut TickSummary,
    ) -> Result<Vec<(Proposal, Campaign)>> {
        summary.proposals_seen = proposals.len();

        // Decreases and pauses come first so the platform ceiling holds at
        // every intermediate point of the tick.
        proposals.sort_by_key(|p| !p.kind.is_reducing());

        // Running enabled-budget totals: every accepted proposal's effect is
        // folded in before the next one is judged, so two increases on the
        // same platform cannot each pass the ceiling check against the same
        // pre-tick snapshot.
        let mut platform_totals = self.platform_enabled_totals()?;
        let mut claimed: HashSet<CampaignRef> = HashSet::new();
        let mut to_execute = Vec::new();

        for proposal in proposals {
            let campaign = match campaign_map
                .get(&proposal.campaign)
                .cloned()
                .or(self.ledger.get_campaign(&proposal.campaign)?)
            {
                Some(campaign) => campaign,
                None => {
                    let decision = Decision::rejected(Justification::UnknownCampaign);
                    if self.ledger.record_decision(&proposal, decision)? {
                        self.ledger.finalize_action(
                            proposal.id,
                            ActionOutcome::Cancelled,
                            None,
                            None,
                            Some("campaign is not known to the system"),
                        )?;
                        summary.rejected += 1;
                    } else {
                        summary.replayed += 1;
                    }
                    continue;
                }
            };

            // Same-campaign conflict: the earlier-ordered proposal wins, the
            // later one is ledgered and discarded, never silently dropped.
            let conflicting = !claimed.insert(proposal.campaign.clone());

            let decision = {
                let overrides = self.overrides.lock();
                let effective = EffectiveGuardrails::resolve(
                    &config.guardrails,
                    &overrides,
                    Some(&proposal.campaign),
                    now,
                );
                drop(overrides);
                let counters = self.counters.lock();
                let ctx = self.gate_context(now, &campaign, &counters, &platform_totals);
                self.gate.evaluate(&proposal, &ctx, &effective)
            };

            let inserted = match self.ledger.record_decision(&proposal, decision) {
                Ok(inserted) => inserted,
                Err(e) => {
                    // Fail-closed: a proposal whose record cannot be
                    // persisted is not executed.
                    error!(proposal = %proposal.id, error = %e, "ledger write failed, proposal dropped");
                    continue;
                }
            };
            if !inserted {
                summary.replayed += 1;
                continue;
            }

            if conflicting {
                self.ledger.finalize_action(
                    proposal.id,
                    ActionOutcome::Cancelled,
                    None,
                    None,
                    Some("superseded by an earlier proposal for the same campaign this tick"),
                )?;
                summary.cancelled += 1;
                continue;
            }

            match decision.verdict {
                adpilot_core::Verdict::AutoExecute => {
                    let effect = enabled_total_effect(&proposal, &campaign);
                    let entry = platform_totals
                        .entry(proposal.campaign.platform)
                        .or_insert(Money::ZERO);
                    *entry = entry.saturating_add(effect);
                    to_execute.push((proposal, campaign));
                }
                adpilot_core::Verdict::ApprovalRequired => {
                    self.approvals
                        .enqueue(proposal, decision.justification, now);
                    summary.queued_for_approval += 1;
                }
                adpilot_core::Verdict::Rejected => {
                    self.ledger.finalize_action(
                        proposal.id,
                        ActionOutcome::Cancelled,
                        None,
                        None,
                        None,
                    )?;
                    summary.rejected += 1;
                }
            }
        }

        Ok(to_execute)
    }

    /// Execute auto-approved proposals: the reducing wave completes before
    /// any increase starts, distinct campaigns run in parallel bounded by a
    /// per-platform concurrency cap, and a rate-limited platform defers its
    /// remaining work to the next tick.
    async fn execute_wave(
        &self,
        now: DateTime<Utc>,
        config: &PilotConfig,
        to_execute: &[(Proposal, Campaign)],
        summary: &mut TickSummary,
    ) {
        let semaphores: HashMap<PlatformId, Arc<Semaphore>> = PlatformId::ALL
            .iter()
            .map(|p| {
                (
                    *p,
                    Arc::new(Semaphore::new(config.engine.per_platform_concurrency.max(1))),
                )
            })
            .collect();
        let deferred: Mutex<HashSet<PlatformId>> = Mutex::new(HashSet::new());

        let (reducing, increasing): (Vec<_>, Vec<_>) = to_execute
            .iter()
            .partition(|(p, _)| p.kind.is_reducing());

        for wave in [reducing, increasing] {
            let results = futures::future::join_all(wave.into_iter().map(|(proposal, before)| {
                let semaphore = Arc::clone(&semaphores[&proposal.campaign.platform]);
                let deferred = &deferred;
                async move {
                    if deferred.lock().contains(&proposal.campaign.platform) {
                        return (proposal, ExecStatus::RateLimited, true);
                    }
                    let _permit = match semaphore.acquire().await {
                        Ok(permit) => permit,
                        Err(_) => return (proposal, ExecStatus::Failed, false),
                    };
                    let status = self
                        .execute_one(proposal, before, now)
                        .await
                        .unwrap_or_else(|e| {
                            error!(proposal = %proposal.id, error = %e, "execution bookkeeping failed");
                            ExecStatus::Failed
                        });
                    if status == ExecStatus::RateLimited {
                        deferred.lock().insert(proposal.campaign.platform);
                    }
                    (proposal, status, false)
                }
            }))
            .await;

            for (proposal, status, was_deferred) in results {
                match status {
                    ExecStatus::Executed => summary.executed += 1,
                    _ => {
                        if was_deferred {
                            // Never reached the adapter; close the row here.
                            if let Err(e) = self.ledger.finalize_action(
                                proposal.id,
                                ActionOutcome::Failed,
                                None,
                                None,
                                Some("platform deferred after rate limit"),
                            ) {
                                error!(proposal = %proposal.id, error = %e, "failed to ledger deferral");
                            }
                        }
                        summary.failed += 1;
                    }
                }
            }
        }
    }

    /// Execute one proposal against its adapter, read back confirmed state,
    /// and settle its ledger row. Shared by the tick path and the approval
    /// path.
    pub(crate) async fn execute_one(
        &self,
        proposal: &Proposal,
        before: &Campaign,
        now: DateTime<Utc>,
    ) -> Result<ExecStatus> {
        let platform = proposal.campaign.platform;
        let Some(adapter) = self.registry.get(platform) else {
            self.ledger.finalize_action(
                proposal.id,
                ActionOutcome::Failed,
                None,
                None,
                Some("no adapter registered for platform"),
            )?;
            return Ok(ExecStatus::Failed);
        };

        let id = proposal.campaign.external_id.as_str();
        let result = match proposal.kind {
            ProposalKind::Pause => {
                adapter
                    .set_status(id, adpilot_core::CampaignStatus::Paused)
                    .await
            }
            ProposalKind::Resume => {
                adapter
                    .set_status(id, adpilot_core::CampaignStatus::Enabled)
                    .await
            }
            ProposalKind::IncreaseBudget
            | ProposalKind::DecreaseBudget
            | ProposalKind::Reallocate => {
                adapter
                    .update_budget(id, proposal.to_state.daily_budget, Some(proposal.id))
                    .await
            }
            ProposalKind::CreateCampaign | ProposalKind::StrategyChange => Err(
                AdapterError::Validation("no automated capability for this kind".into()),
            ),
        };

        match result {
            Ok(confirmed) => {
                // The adapter's reply is the read-back of confirmed state.
                self.ledger.upsert_campaign(&confirmed, now)?;
                self.ledger.finalize_action(
                    proposal.id,
                    ActionOutcome::Success,
                    Some(&confirmed.snapshot()),
                    Some(Utc::now()),
                    None,
                )?;
                let delta = confirmed.daily_budget - before.daily_budget;
                self.counters
                    .lock()
                    .record_execution(&proposal.campaign, delta);
                info!(
                    proposal = %proposal.id,
                    campaign = %proposal.campaign,
                    kind = %proposal.kind,
                    delta = %delta,
                    "action executed"
                );
                Ok(ExecStatus::Executed)
            }
            Err(AdapterError::NotFound(_)) => {
                // The campaign vanished from its platform: mark it removed
                // and cancel everything pending against it.
                self.ledger.mark_campaign_removed(&proposal.campaign)?;
                for entry in self.approvals.cancel_for_campaign(&proposal.campaign) {
                    self.ledger.finalize_action(
                        entry.proposal.id,
                        ActionOutcome::Cancelled,
                        None,
                        None,
                        Some("campaign removed from platform"),
                    )?;
                }
                self.ledger.finalize_action(
                    proposal.id,
                    ActionOutcome::Failed,
                    None,
                    Some(Utc::now()),
                    Some("campaign not found on platform"),
                )?;
                Ok(ExecStatus::Failed)
            }
            Err(e @ AdapterError::RateLimited { .. }) => {
                self.ledger.finalize_action(
                    proposal.id,
                    ActionOutcome::Failed,
                    None,
                    Some(Utc::now()),
                    Some(&e.to_string()),
                )?;
                Ok(ExecStatus::RateLimited)
            }
            Err(e) => {
                self.ledger.finalize_action(
                    proposal.id,
                    ActionOutcome::Failed,
                    None,
                    Some(Utc::now()),
                    Some(&e.to_string()),
                )?;
                Ok(ExecStatus::Failed)
            }
        }
    }

    // ── Shared helpers ─────────────────────────────────────────

    pub(crate) fn gate_context<'a>(
        &self,
        now: DateTime<Utc>,
        campaign: &'a Campaign,
        counters: &'a DailyCounters,
        platform_totals: &HashMap<PlatformId, Money>,
    ) -> GateContext<'a> {
        let platform = campaign.reference.platform;
        let enabled_total = platform_totals
            .get(&platform)
            .copied()
            .unwrap_or(Money::ZERO);
        let global_total: Money = platform_totals.values().copied().sum();
        GateContext {
            now,
            campaign,
            counters,
            platform_enabled_total: enabled_total,
            start_of_day_budget: campaign.daily_budget
                - counters.campaign_signed_delta(&campaign.reference),
            start_of_day_platform_total: enabled_total - counters.platform_delta(platform),
            start_of_day_global_total: global_total - counters.global_delta(),
        }
    }

    /// Sum of enabled daily budgets per platform, from confirmed state.
    pub(crate) fn platform_enabled_totals(&self) -> Result<HashMap<PlatformId, Money>> {
        let mut totals: HashMap<PlatformId, Money> = HashMap::new();
        for campaign in self.ledger.list_campaigns()? {
            if campaign.status == adpilot_core::CampaignStatus::Enabled {
                let entry = totals
                    .entry(campaign.reference.platform)
                    .or_insert(Money::ZERO);
                *entry = entry.saturating_add(campaign.daily_budget);
            }
        }
        Ok(totals)
    }

    pub(crate) fn rollover_counters(&self, now: DateTime<Utc>) -> Result<()> {
        let closed = self.counters.lock().maybe_rollover(now);
        if let Some(day) = closed {
            self.ledger.record_event(
                EventKind::CounterRollover,
                None,
                None,
                &format!("closed {day}"),
            )?;
        }
        Ok(())
    }

    pub(crate) fn sweep_expired_approvals(&self, now: DateTime<Utc>) -> Result<usize> {
        let expired = self.approvals.sweep_expired(now);
        let count = expired.len();
        for entry in expired {
            info!(proposal = %entry.proposal.id, "approval expired");
            self.ledger.finalize_action(
                entry.proposal.id,
                ActionOutcome::Expired,
                None,
                None,
                Some("approval ttl expired"),
            )?;
        }
        Ok(count)
    }

    pub(crate) fn counters_lock(&self) -> parking_lot::MutexGuard<'_, DailyCounters> {
        self.counters.lock()
    }

    /// Re-run the execution-time guardrail re-check (invariants + runtime).
    pub(crate) fn gate_recheck(
        &self,
        proposal: &Proposal,
        ctx: &GateContext<'_>,
        effective: &EffectiveGuardrails,
    ) -> Option<Decision> {
        self.gate.recheck_invariants(proposal, ctx, effective)
    }
}

/// One platform's collection: campaign listing plus performance rows, each
/// under its own deadline so a hung platform cannot stall the tick.
async fn collect_platform(
    adapter: Arc<dyn PlatformAdapter>,
    range: DateRange,
    per_call: std::time::Duration,
) -> std::result::Result<(Vec<Campaign>, Vec<RawMetrics>), AdapterError> {
    let campaigns = tokio::time::timeout(per_call, adapter.list_campaigns(None))
        .await
        .map_err(|_| AdapterError::Unavailable("list_campaigns deadline exceeded".into()))??;
    let raws = tokio::time::timeout(per_call, adapter.get_performance(range, None))
        .await
        .map_err(|_| AdapterError::Unavailable("get_performance deadline exceeded".into()))??;
    Ok((campaigns, raws))
}

/// How executing a proposal would move its platform's enabled-budget sum:
/// pauses take the campaign's budget out, resumes put it back, budget
/// changes move it by the signed delta.
fn enabled_total_effect(proposal: &Proposal, campaign: &Campaign) -> Money {
    match proposal.kind {
        ProposalKind::Pause => Money::ZERO - campaign.daily_budget,
        ProposalKind::Resume => proposal.to_state.daily_budget,
        ProposalKind::IncreaseBudget | ProposalKind::DecreaseBudget | ProposalKind::Reallocate => {
            proposal.signed_budget_delta()
        }
        ProposalKind::CreateCampaign | ProposalKind::StrategyChange => Money::ZERO,
    }
}

fn guardrail_summary(config: &PilotConfig) -> GuardrailSummary {
    GuardrailSummary {
        confidence_threshold: config.guardrails.confidence_threshold,
        major_change_fraction: config.guardrails.major_change_fraction,
        max_single_budget_increase_fraction: config
            .guardrails
            .max_single_budget_increase_fraction,
        min_campaign_runtime_hours_before_pause: config
            .guardrails
            .min_campaign_runtime_hours_before_pause,
        automation_level: config.guardrails.automation_level.clone(),
    }
}

/// Local midnight of `now`'s day in `tz`, expressed in UTC.
pub(crate) fn local_midnight_utc(tz: chrono_tz::Tz, now: DateTime<Utc>) -> DateTime<Utc> {
    use chrono::{LocalResult, NaiveTime, TimeZone};
    let midnight = now.with_timezone(&tz).date_naive().and_time(NaiveTime::MIN);
    match tz.from_local_datetime(&midnight) {
        LocalResult::Single(t) | LocalResult::Ambiguous(t, _) => t.with_timezone(&Utc),
        // DST gap at midnight: fall back to the UTC day boundary.
        LocalResult::None => {
            let day_start = now.timestamp().div_euclid(86_400) * 86_400;
            Utc.timestamp_opt(day_start, 0).single().unwrap_or(now)
        }
    }
}

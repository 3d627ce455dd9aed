//! End-to-end engine scenarios over the mock adapters and the mock analyst:
//! the whole loop with zero external dependencies.

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use adpilot_adapters::{AdapterRegistry, MockAdapter};
use adpilot_analyst::{MockAnalyst, OverallHealth};
use adpilot_config::PilotConfig;
use adpilot_core::{
    ActionOutcome, AdapterError, CampaignRef, CampaignStatus, EventKind, ExpectedImpact,
    Justification, Money, PlatformId, Proposal, ProposalKind, StateSnapshot, Verdict,
};
use adpilot_engine::{DecisionEngine, TickOutcome, TickPhase};
use adpilot_ledger::Ledger;

struct Harness {
    engine: DecisionEngine,
    google: Arc<MockAdapter>,
    meta: Arc<MockAdapter>,
    #[allow(dead_code)]
    tiktok: Arc<MockAdapter>,
    linkedin: Arc<MockAdapter>,
}

fn harness(analyst: MockAnalyst, mutate_config: impl FnOnce(&mut PilotConfig)) -> Harness {
    let mut config = PilotConfig::default();
    config.guardrails.automation_level = "full".into();
    mutate_config(&mut config);

    let google = Arc::new(MockAdapter::new(PlatformId::GoogleAds));
    let meta = Arc::new(MockAdapter::new(PlatformId::MetaAds));
    let tiktok = Arc::new(MockAdapter::new(PlatformId::TiktokAds));
    let linkedin = Arc::new(MockAdapter::new(PlatformId::LinkedinAds));

    let mut registry = AdapterRegistry::new();
    for adapter in [&google, &meta, &tiktok, &linkedin] {
        registry.register(Arc::clone(adapter) as Arc<dyn adpilot_adapters::PlatformAdapter>);
    }

    let engine = DecisionEngine::from_config(
        config,
        Arc::new(registry),
        Arc::new(analyst),
        Arc::new(Ledger::open_in_memory().unwrap()),
    )
    .unwrap();

    Harness {
        engine,
        google,
        meta,
        tiktok,
        linkedin,
    }
}

fn proposal(
    platform: PlatformId,
    id: &str,
    kind: ProposalKind,
    from: f64,
    to: f64,
    confidence: f64,
) -> Proposal {
    let (from_status, to_status) = match kind {
        ProposalKind::Pause => (CampaignStatus::Enabled, CampaignStatus::Paused),
        ProposalKind::Resume => (CampaignStatus::Paused, CampaignStatus::Enabled),
        _ => (CampaignStatus::Enabled, CampaignStatus::Enabled),
    };
    Proposal {
        id: Uuid::new_v4(),
        campaign: CampaignRef::new(platform, id),
        kind,
        from_state: StateSnapshot {
            status: from_status,
            daily_budget: Money::from_major(from),
        },
        to_state: StateSnapshot {
            status: to_status,
            daily_budget: Money::from_major(to),
        },
        confidence,
        reasoning: "scenario".into(),
        expected_impact: ExpectedImpact {
            metric: "roas".into(),
            change_percent: 10.0,
        },
        produced_at: Utc::now(),
    }
}

// ── Scenario: happy increase through approval ──────────────────

#[tokio::test]
async fn major_increase_queues_then_executes_on_approval() {
    let p = proposal(
        PlatformId::GoogleAds,
        "G1",
        ProposalKind::IncreaseBudget,
        100.0,
        130.0,
        0.90,
    );
    let proposal_id = p.id;
    let h = harness(
        MockAnalyst::new().with_proposals(OverallHealth::Good, vec![p]),
        |_| {},
    );

    let now = Utc::now();
    let summary = h.engine.run_tick(now).await.unwrap();
    assert_eq!(summary.outcome, TickOutcome::Completed);
    assert_eq!(summary.queued_for_approval, 1);
    assert_eq!(summary.executed, 0);

    // +30% against a 0.20 major fraction escalates, it does not execute.
    let pending = h.engine.list_pending_approvals(now);
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].justification, Justification::MajorChange);
    assert_eq!(h.google.call_count("update_budget"), 0);

    // Human approval executes with a re-check, and the read-back lands in
    // the ledger row.
    let record = h.engine.approve(proposal_id, now).await.unwrap();
    assert_eq!(record.outcome, Some(ActionOutcome::Success));
    assert_eq!(record.before_state.daily_budget, Money::from_major(100.0));
    assert_eq!(
        record.after_state.unwrap().daily_budget,
        Money::from_major(130.0)
    );

    // The platform itself was updated.
    let campaigns = h.google.recorded_calls();
    assert!(campaigns.contains(&"update_budget".to_string()));
}

// ── Scenario: auto-executed decrease ───────────────────────────

#[tokio::test]
async fn exact_twenty_percent_decrease_auto_executes() {
    let p = proposal(
        PlatformId::MetaAds,
        "M2",
        ProposalKind::DecreaseBudget,
        80.0,
        64.0,
        0.93,
    );
    let proposal_id = p.id;
    let h = harness(
        MockAnalyst::new().with_proposals(OverallHealth::Fair, vec![p]),
        |_| {},
    );

    let summary = h.engine.run_tick(Utc::now()).await.unwrap();
    assert_eq!(summary.executed, 1);
    assert_eq!(summary.queued_for_approval, 0);

    let record = h.engine.ledger().get_action(proposal_id).unwrap().unwrap();
    assert_eq!(record.decision.verdict, Verdict::AutoExecute);
    assert_eq!(record.outcome, Some(ActionOutcome::Success));
    assert_eq!(h.engine.daily_adjustments(), 1);
}

// ── Scenario: pause blocked by runtime ─────────────────────────

#[tokio::test]
async fn pause_on_young_campaign_never_reaches_adapter() {
    // Fixture campaign 3 on every platform is 40 hours old; minimum is 72.
    let p = proposal(
        PlatformId::GoogleAds,
        "G3",
        ProposalKind::Pause,
        50.0,
        50.0,
        0.95,
    );
    let proposal_id = p.id;
    let h = harness(
        MockAnalyst::new().with_proposals(OverallHealth::Fair, vec![p]),
        |_| {},
    );

    let summary = h.engine.run_tick(Utc::now()).await.unwrap();
    assert_eq!(summary.rejected, 1);
    assert_eq!(summary.executed, 0);

    let record = h.engine.ledger().get_action(proposal_id).unwrap().unwrap();
    assert_eq!(record.decision.verdict, Verdict::Rejected);
    assert_eq!(
        record.decision.justification,
        Justification::InsufficientRuntime
    );
    assert_eq!(h.google.call_count("set_status"), 0);
}

// ── Scenario: low confidence ───────────────────────────────────

#[tokio::test]
async fn low_confidence_reallocation_is_seen_and_dismissed() {
    let p = proposal(
        PlatformId::LinkedinAds,
        "L1",
        ProposalKind::Reallocate,
        100.0,
        120.0,
        0.78,
    );
    let proposal_id = p.id;
    let h = harness(
        MockAnalyst::new().with_proposals(OverallHealth::Good, vec![p]),
        |_| {},
    );

    let summary = h.engine.run_tick(Utc::now()).await.unwrap();
    assert_eq!(summary.rejected, 1);

    // The ledger shows the proposal was seen and dismissed.
    let record = h.engine.ledger().get_action(proposal_id).unwrap().unwrap();
    assert_eq!(record.decision.justification, Justification::LowConfidence);
    assert_eq!(record.outcome, Some(ActionOutcome::Cancelled));
    assert_eq!(h.linkedin.call_count("update_budget"), 0);
}

// ── Scenario: platform outage ──────────────────────────────────

#[tokio::test]
async fn platform_outage_excludes_only_that_platform() {
    let h = harness(MockAnalyst::new().with_quiet_response(), |_| {});
    h.linkedin
        .set_outage(AdapterError::Unavailable("maintenance window".into()));

    let now = Utc::now();
    let summary = h.engine.run_tick(now).await.unwrap();
    assert_eq!(summary.outcome, TickOutcome::Completed);
    assert_eq!(summary.platforms_collected, 3);
    assert_eq!(summary.platforms_excluded, vec![PlatformId::LinkedinAds]);
    // Three platforms × three fixture campaigns
    assert_eq!(summary.samples_collected, 9);

    let events = h
        .engine
        .ledger()
        .events_since(EventKind::PlatformExcluded, now - chrono::Duration::minutes(1))
        .unwrap();
    assert_eq!(events.len(), 1);
    assert!(events[0].0.contains("maintenance"));

    // Next tick retries and the platform comes back.
    h.linkedin.clear_outage();
    let summary = h.engine.run_tick(now + chrono::Duration::minutes(15)).await.unwrap();
    assert_eq!(summary.platforms_collected, 4);
}

// ── Scenario: analyst failure aborts the tick ──────────────────

#[tokio::test]
async fn analyst_timeout_fails_tick_cleanly() {
    let h = harness(MockAnalyst::new().with_timeout(), |_| {});
    let now = Utc::now();
    let summary = h.engine.run_tick(now).await.unwrap();
    assert_eq!(
        summary.outcome,
        TickOutcome::Failed {
            phase: TickPhase::Analyzing
        }
    );
    assert_eq!(summary.proposals_seen, 0);

    let events = h
        .engine
        .ledger()
        .events_since(EventKind::TickFailed, now - chrono::Duration::minutes(1))
        .unwrap();
    assert_eq!(events.len(), 1);
}

// ── Scenario: approval expiry ──────────────────────────────────

#[tokio::test]
async fn approval_expires_and_late_approve_conflicts() {
    let p = proposal(
        PlatformId::GoogleAds,
        "G1",
        ProposalKind::IncreaseBudget,
        100.0,
        130.0,
        0.90,
    );
    let proposal_id = p.id;
    let h = harness(
        MockAnalyst::new()
            .with_proposals(OverallHealth::Good, vec![p])
            .with_quiet_response(),
        |_| {},
    );

    let queued_at = Utc::now();
    h.engine.run_tick(queued_at).await.unwrap();
    assert_eq!(h.engine.list_pending_approvals(queued_at).len(), 1);

    // 09:00 + 4h TTL: the next tick's sweeper fires at 13:00...
    let after_ttl = queued_at + chrono::Duration::hours(4);
    h.engine.run_tick(after_ttl).await.unwrap();
    let record = h.engine.ledger().get_action(proposal_id).unwrap().unwrap();
    assert_eq!(record.outcome, Some(ActionOutcome::Expired));

    // ...and the approver clicking at 13:01 gets a conflict, not an action.
    let late = after_ttl + chrono::Duration::minutes(1);
    let err = h.engine.approve(proposal_id, late).await.unwrap_err();
    assert!(matches!(err, adpilot_core::PilotError::ApprovalConflict(_)));
    assert_eq!(h.google.call_count("update_budget"), 0);
}

// ── Scenario: replay is a no-op ────────────────────────────────

#[tokio::test]
async fn replaying_identical_proposals_creates_no_new_records() {
    let p = proposal(
        PlatformId::MetaAds,
        "M2",
        ProposalKind::DecreaseBudget,
        80.0,
        64.0,
        0.93,
    );
    // The analyst returns the same proposal (same id) on two consecutive
    // ticks.
    let h = harness(
        MockAnalyst::new()
            .with_proposals(OverallHealth::Fair, vec![p.clone()])
            .with_proposals(OverallHealth::Fair, vec![p]),
        |_| {},
    );

    let now = Utc::now();
    let first = h.engine.run_tick(now).await.unwrap();
    assert_eq!(first.executed, 1);

    let second = h
        .engine
        .run_tick(now + chrono::Duration::minutes(15))
        .await
        .unwrap();
    assert_eq!(second.executed, 0);
    assert_eq!(second.replayed, 1);

    // One adapter write, one ledger row.
    assert_eq!(h.meta.call_count("update_budget"), 1);
    let actions = h
        .engine
        .ledger()
        .recent_actions(now - chrono::Duration::minutes(1))
        .unwrap();
    assert_eq!(actions.len(), 1);
}

// ── Scenario: conflicting proposals on one campaign ────────────

#[tokio::test]
async fn opposite_directions_same_campaign_earlier_wins() {
    let decrease = proposal(
        PlatformId::MetaAds,
        "M1",
        ProposalKind::DecreaseBudget,
        100.0,
        85.0,
        0.95,
    );
    let increase = proposal(
        PlatformId::MetaAds,
        "M1",
        ProposalKind::IncreaseBudget,
        100.0,
        115.0,
        0.95,
    );
    let increase_id = increase.id;
    let h = harness(
        MockAnalyst::new().with_proposals(OverallHealth::Fair, vec![increase, decrease]),
        |_| {},
    );

    let summary = h.engine.run_tick(Utc::now()).await.unwrap();
    // The decrease sorts first and wins; the increase is logged, not dropped.
    assert_eq!(summary.executed, 1);
    assert_eq!(summary.cancelled, 1);
    assert_eq!(h.meta.call_count("update_budget"), 1);

    let record = h.engine.ledger().get_action(increase_id).unwrap().unwrap();
    assert_eq!(record.outcome, Some(ActionOutcome::Cancelled));
    assert!(record.error.unwrap().contains("superseded"));
}

// ── Scenario: same-tick increases share the platform ceiling ───

#[tokio::test]
async fn same_tick_increases_share_the_platform_ceiling() {
    // Google's enabled budgets sum to $230 ($100 + $80 + $50) with a $250
    // ceiling. Each increase alone fits ($230 + $15 = $245); together they
    // would breach it, so the second must be judged against the first's
    // effect, not the pre-tick snapshot.
    let first = proposal(
        PlatformId::GoogleAds,
        "G1",
        ProposalKind::IncreaseBudget,
        100.0,
        115.0,
        0.95,
    );
    let second = proposal(
        PlatformId::GoogleAds,
        "G2",
        ProposalKind::IncreaseBudget,
        80.0,
        95.0,
        0.95,
    );
    let second_id = second.id;
    let h = harness(
        MockAnalyst::new().with_proposals(OverallHealth::Good, vec![first, second]),
        |config| {
            config
                .guardrails
                .platform_ceilings
                .insert("google_ads".into(), 250.0);
        },
    );

    let summary = h.engine.run_tick(Utc::now()).await.unwrap();
    assert_eq!(summary.executed, 1);
    assert_eq!(summary.rejected, 1);
    assert_eq!(h.google.call_count("update_budget"), 1);

    let record = h.engine.ledger().get_action(second_id).unwrap().unwrap();
    assert_eq!(record.decision.verdict, Verdict::Rejected);
    assert_eq!(
        record.decision.justification,
        Justification::InvariantViolation(adpilot_core::Invariant::PlatformCeiling)
    );
}

// ── Scenario: advisory level ───────────────────────────────────

#[tokio::test]
async fn advisory_level_escalates_instead_of_executing() {
    let p = proposal(
        PlatformId::GoogleAds,
        "G1",
        ProposalKind::Resume,
        100.0,
        100.0,
        0.95,
    );
    let h = harness(
        MockAnalyst::new().with_proposals(OverallHealth::Good, vec![p]),
        |config| config.guardrails.automation_level = "advisory".into(),
    );

    let now = Utc::now();
    let summary = h.engine.run_tick(now).await.unwrap();
    assert_eq!(summary.executed, 0);
    assert_eq!(summary.queued_for_approval, 1);
    assert_eq!(
        h.engine.list_pending_approvals(now)[0].justification,
        Justification::AdvisoryMode
    );
}

// ── Scenario: unknown campaign ─────────────────────────────────

#[tokio::test]
async fn proposal_for_unknown_campaign_is_rejected() {
    let p = proposal(
        PlatformId::GoogleAds,
        "GHOST",
        ProposalKind::DecreaseBudget,
        100.0,
        80.0,
        0.95,
    );
    let proposal_id = p.id;
    let h = harness(
        MockAnalyst::new().with_proposals(OverallHealth::Good, vec![p]),
        |_| {},
    );

    let summary = h.engine.run_tick(Utc::now()).await.unwrap();
    assert_eq!(summary.rejected, 1);
    let record = h.engine.ledger().get_action(proposal_id).unwrap().unwrap();
    assert_eq!(
        record.decision.justification,
        Justification::UnknownCampaign
    );
    assert_eq!(h.google.call_count("update_budget"), 0);
}

// ── Approval re-check against moved state ──────────────────────

#[tokio::test]
async fn approval_recheck_failure_yields_rejection_not_success() {
    let increase = proposal(
        PlatformId::GoogleAds,
        "G1",
        ProposalKind::IncreaseBudget,
        100.0,
        130.0,
        0.90,
    );
    let decrease = proposal(
        PlatformId::MetaAds,
        "M2",
        ProposalKind::DecreaseBudget,
        80.0,
        70.0,
        0.95,
    );
    let proposal_id = increase.id;
    let h = harness(
        MockAnalyst::new()
            .with_proposals(OverallHealth::Good, vec![increase])
            .with_proposals(OverallHealth::Fair, vec![decrease]),
        |config| config.guardrails.max_daily_adjustments = 1,
    );

    // Tick one queues the major increase. The daily cap is untouched at this
    // point, so the gate escalates as a major change, it does not reject.
    let now = Utc::now();
    h.engine.run_tick(now).await.unwrap();
    assert_eq!(h.engine.list_pending_approvals(now).len(), 1);

    // Tick two auto-executes an unrelated decrease, consuming the whole
    // daily adjustment budget before the human gets around to approving.
    let summary = h
        .engine
        .run_tick(now + chrono::Duration::minutes(15))
        .await
        .unwrap();
    assert_eq!(summary.executed, 1);
    assert_eq!(h.engine.daily_adjustments(), 1);

    // The approval's re-check now fails: the row settles as rejected by the
    // re-check, never SUCCESS, and nothing reaches the adapter.
    let record = h
        .engine
        .approve(proposal_id, now + chrono::Duration::minutes(20))
        .await
        .unwrap();
    assert_eq!(record.decision.verdict, Verdict::Rejected);
    assert_ne!(record.outcome, Some(ActionOutcome::Success));
    assert!(record.error.unwrap().contains("re-check"));
    assert_eq!(h.google.call_count("update_budget"), 0);
}

// ── Human rejection ────────────────────────────────────────────

#[tokio::test]
async fn human_rejection_settles_the_row() {
    let p = proposal(
        PlatformId::GoogleAds,
        "G1",
        ProposalKind::IncreaseBudget,
        100.0,
        130.0,
        0.90,
    );
    let proposal_id = p.id;
    let h = harness(
        MockAnalyst::new().with_proposals(OverallHealth::Good, vec![p]),
        |_| {},
    );

    let now = Utc::now();
    h.engine.run_tick(now).await.unwrap();
    let record = h
        .engine
        .reject(proposal_id, "not during the holiday freeze", now)
        .unwrap();
    assert_eq!(record.outcome, Some(ActionOutcome::Cancelled));
    assert_eq!(
        record.error.as_deref(),
        Some("not during the holiday freeze")
    );
    assert!(h.engine.list_pending_approvals(now).is_empty());
}

// ── Guardrail override is ledgered and takes effect ────────────

#[tokio::test]
async fn override_is_ledgered_and_changes_gating() {
    use adpilot_guard::{OverrideField, OverrideScope};

    let p = proposal(
        PlatformId::MetaAds,
        "M2",
        ProposalKind::DecreaseBudget,
        80.0,
        64.0,
        0.88,
    );
    let proposal_id = p.id;
    let h = harness(
        MockAnalyst::new().with_proposals(OverallHealth::Fair, vec![p]),
        |_| {},
    );

    let now = Utc::now();
    // Tighten the confidence threshold above the proposal's 0.88.
    h.engine
        .override_guardrail(
            OverrideScope::Global,
            OverrideField::ConfidenceThreshold,
            0.95,
            chrono::Duration::hours(1),
            now,
        )
        .unwrap();

    let summary = h.engine.run_tick(now).await.unwrap();
    assert_eq!(summary.rejected, 1);
    let record = h.engine.ledger().get_action(proposal_id).unwrap().unwrap();
    assert_eq!(record.decision.justification, Justification::LowConfidence);

    // The override itself left a config-history trail.
    assert_eq!(h.engine.ledger().config_history(10).unwrap().len(), 1);
}

// ── Mock data flows end to end ─────────────────────────────────

#[tokio::test]
async fn credential_free_loop_is_flagged_as_mock() {
    let h = harness(MockAnalyst::new().with_quiet_response(), |_| {});
    let now = Utc::now();
    h.engine.run_tick(now).await.unwrap();

    let samples = h
        .engine
        .ledger()
        .samples_in_range(adpilot_core::DateRange::trailing_days(
            now + chrono::Duration::minutes(1),
            1,
        ))
        .unwrap();
    assert!(!samples.is_empty());
    assert!(samples.iter().all(|s| s.mock_data));
}

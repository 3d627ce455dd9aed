#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use adpilot_core::{
        ActionOutcome, Campaign, CampaignRef, CampaignStatus, DateRange, Decision, EventKind,
        ExpectedImpact, Justification, MetricSample, Money, PlatformId, Proposal, ProposalKind,
        StateSnapshot, Verdict,
    };
    use adpilot_ledger::Ledger;

    fn proposal(id: &str, from: f64, to: f64) -> Proposal {
        Proposal {
            id: Uuid::new_v4(),
            campaign: CampaignRef::new(PlatformId::GoogleAds, id),
            kind: if to >= from {
                ProposalKind::IncreaseBudget
            } else {
                ProposalKind::DecreaseBudget
            },
            from_state: StateSnapshot {
                status: CampaignStatus::Enabled,
                daily_budget: Money::from_major(from),
            },
            to_state: StateSnapshot {
                status: CampaignStatus::Enabled,
                daily_budget: Money::from_major(to),
            },
            confidence: 0.9,
            reasoning: "test".into(),
            expected_impact: ExpectedImpact {
                metric: "roas".into(),
                change_percent: 5.0,
            },
            produced_at: Utc::now(),
        }
    }

    fn sample(id: &str, spend: f64) -> MetricSample {
        MetricSample {
            campaign: CampaignRef::new(PlatformId::MetaAds, id),
            sample_time: Utc::now(),
            impressions: 1_000,
            clicks: 40,
            spend: Money::from_major(spend),
            conversions: 4,
            revenue: Money::from_major(spend * 2.0),
            mock_data: true,
        }
    }

    // ── One row per proposal ───────────────────────────────────

    #[test]
    fn one_action_record_per_proposal() {
        let ledger = Ledger::open_in_memory().unwrap();
        let p = proposal("G1", 100.0, 130.0);
        let decision = Decision::approval_required(Justification::MajorChange);

        assert!(ledger.record_decision(&p, decision).unwrap());
        // Replaying the identical proposal inserts nothing.
        assert!(!ledger.record_decision(&p, decision).unwrap());

        let since = Utc::now() - chrono::Duration::hours(1);
        assert_eq!(ledger.recent_actions(since).unwrap().len(), 1);
    }

    #[test]
    fn finalize_fills_terminal_fields() {
        let ledger = Ledger::open_in_memory().unwrap();
        let p = proposal("G1", 100.0, 130.0);
        ledger
            .record_decision(&p, Decision::auto_execute())
            .unwrap();

        let after = StateSnapshot {
            status: CampaignStatus::Enabled,
            daily_budget: Money::from_major(130.0),
        };
        let executed_at = Utc::now();
        ledger
            .finalize_action(p.id, ActionOutcome::Success, Some(&after), Some(executed_at), None)
            .unwrap();

        let record = ledger.get_action(p.id).unwrap().unwrap();
        assert_eq!(record.outcome, Some(ActionOutcome::Success));
        assert_eq!(record.before_state.daily_budget, Money::from_major(100.0));
        assert_eq!(record.after_state.unwrap().daily_budget, Money::from_major(130.0));
        assert!(record.executed_at.is_some());
    }

    #[test]
    fn finalize_without_row_is_an_error() {
        let ledger = Ledger::open_in_memory().unwrap();
        assert!(ledger
            .finalize_action(Uuid::new_v4(), ActionOutcome::Failed, None, None, Some("x"))
            .is_err());
    }

    #[test]
    fn finalize_is_write_once() {
        let ledger = Ledger::open_in_memory().unwrap();
        let p = proposal("G1", 100.0, 90.0);
        ledger
            .record_decision(&p, Decision::auto_execute())
            .unwrap();
        ledger
            .finalize_action(p.id, ActionOutcome::Failed, None, None, Some("boom"))
            .unwrap();
        // The row is terminal; a second finalize finds no open row.
        assert!(ledger
            .finalize_action(p.id, ActionOutcome::Success, None, None, None)
            .is_err());
    }

    // ── Range scans ────────────────────────────────────────────

    #[test]
    fn actions_for_campaign_scan() {
        let ledger = Ledger::open_in_memory().unwrap();
        let p1 = proposal("G1", 100.0, 110.0);
        let p2 = proposal("G1", 110.0, 120.0);
        let p3 = proposal("G2", 50.0, 60.0);
        for p in [&p1, &p2, &p3] {
            ledger.record_decision(p, Decision::auto_execute()).unwrap();
        }

        let range = DateRange::trailing_days(Utc::now() + chrono::Duration::minutes(1), 1);
        let g1 = ledger
            .actions_for_campaign(&CampaignRef::new(PlatformId::GoogleAds, "G1"), range)
            .unwrap();
        assert_eq!(g1.len(), 2);
        assert!(g1.iter().all(|r| r.campaign.external_id == "G1"));
    }

    #[test]
    fn counter_recovery_scan() {
        let ledger = Ledger::open_in_memory().unwrap();
        let p1 = proposal("G1", 100.0, 130.0); // +30 executed
        let p2 = proposal("G2", 80.0, 64.0); // -16 executed
        let p3 = proposal("G3", 50.0, 60.0); // failed, excluded from recovery
        for p in [&p1, &p2, &p3] {
            ledger.record_decision(p, Decision::auto_execute()).unwrap();
        }
        let now = Utc::now();
        ledger
            .finalize_action(
                p1.id,
                ActionOutcome::Success,
                Some(&p1.to_state),
                Some(now),
                None,
            )
            .unwrap();
        ledger
            .finalize_action(
                p2.id,
                ActionOutcome::Success,
                Some(&p2.to_state),
                Some(now),
                None,
            )
            .unwrap();
        ledger
            .finalize_action(p3.id, ActionOutcome::Failed, None, Some(now), Some("timeout"))
            .unwrap();

        let recovered = ledger
            .executed_since(now - chrono::Duration::hours(1))
            .unwrap();
        assert_eq!(recovered.len(), 2);
        let g1 = recovered
            .iter()
            .find(|r| r.campaign.external_id == "G1")
            .unwrap();
        assert_eq!(g1.signed_delta, Money::from_major(30.0));
        let g2 = recovered
            .iter()
            .find(|r| r.campaign.external_id == "G2")
            .unwrap();
        assert_eq!(g2.signed_delta, Money::from_major(-16.0));
    }

    // ── Events ─────────────────────────────────────────────────

    #[test]
    fn events_are_recorded_and_scannable() {
        let ledger = Ledger::open_in_memory().unwrap();
        ledger
            .record_event(
                EventKind::PlatformExcluded,
                Some(PlatformId::LinkedinAds),
                None,
                "UNAVAILABLE",
            )
            .unwrap();
        ledger
            .record_event(EventKind::TickSkipped, None, None, "previous tick running")
            .unwrap();

        let since = Utc::now() - chrono::Duration::minutes(5);
        let excluded = ledger
            .events_since(EventKind::PlatformExcluded, since)
            .unwrap();
        assert_eq!(excluded.len(), 1);
        assert_eq!(excluded[0].0, "UNAVAILABLE");
        // Event rows never show up in action scans
        assert!(ledger.recent_actions(since).unwrap().is_empty());
    }

    // ── Samples ────────────────────────────────────────────────

    #[test]
    fn samples_roundtrip_through_range_scan() {
        let ledger = Ledger::open_in_memory().unwrap();
        ledger
            .insert_samples(&[sample("M1", 80.0), sample("M2", 20.0)])
            .unwrap();

        let range = DateRange::trailing_days(Utc::now() + chrono::Duration::minutes(1), 1);
        let rows = ledger.samples_in_range(range).unwrap();
        assert_eq!(rows.len(), 2);
        let m1 = rows
            .iter()
            .find(|s| s.campaign.external_id == "M1")
            .unwrap();
        assert_eq!(m1.spend, Money::from_major(80.0));
        assert!(m1.mock_data);
    }

    // ── Campaigns ──────────────────────────────────────────────

    #[test]
    fn campaign_upsert_and_removal() {
        let ledger = Ledger::open_in_memory().unwrap();
        let now = Utc::now();
        let mut campaign = Campaign {
            reference: CampaignRef::new(PlatformId::TiktokAds, "T1"),
            name: "spring launch".into(),
            status: CampaignStatus::Enabled,
            daily_budget: Money::from_major(50.0),
            objective: Some("CONVERSIONS".into()),
            created_at: now - chrono::Duration::days(10),
            updated_at: now,
        };
        ledger.upsert_campaign(&campaign, now).unwrap();

        campaign.daily_budget = Money::from_major(60.0);
        ledger.upsert_campaign(&campaign, now).unwrap();

        let stored = ledger.get_campaign(&campaign.reference).unwrap().unwrap();
        assert_eq!(stored.daily_budget, Money::from_major(60.0));

        ledger.mark_campaign_removed(&campaign.reference).unwrap();
        let stored = ledger.get_campaign(&campaign.reference).unwrap().unwrap();
        assert_eq!(stored.status, CampaignStatus::Removed);

        assert!(ledger.known_refs().unwrap().contains(&campaign.reference));
    }

    // ── Config history ─────────────────────────────────────────

    #[test]
    fn config_history_is_append_only() {
        let ledger = Ledger::open_in_memory().unwrap();
        ledger
            .record_config_change("override confidence_threshold=0.9 ttl=3600s")
            .unwrap();
        ledger
            .record_config_change("override expired: confidence_threshold")
            .unwrap();
        let history = ledger.config_history(10).unwrap();
        assert_eq!(history.len(), 2);
        // Newest first
        assert!(history[0].1.contains("expired"));
    }

    // ── Decision verdict mapping ───────────────────────────────

    #[test]
    fn verdict_and_justification_roundtrip() {
        let ledger = Ledger::open_in_memory().unwrap();
        let p = proposal("G9", 10.0, 12.0);
        ledger
            .record_decision(
                &p,
                Decision::rejected(Justification::LowConfidence),
            )
            .unwrap();
        let record = ledger.get_action(p.id).unwrap().unwrap();
        assert_eq!(record.decision.verdict, Verdict::Rejected);
        assert_eq!(record.decision.justification, Justification::LowConfidence);
    }
}

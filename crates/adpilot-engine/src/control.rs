//! The inbound control surface.
//!
//! Four verbs for external callers (the usual carriers are a UI or REST
//! layer, but the engine is transport-agnostic): list pending approvals,
//! approve/reject a queued proposal, query recent actions, and write a
//! time-boxed guardrail override.

use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use adpilot_core::{
    ActionOutcome, ActionRecord, EventKind, PilotError, Result,
};
use adpilot_guard::{
    EffectiveGuardrails, GuardrailOverride, OverrideField, OverrideScope, PendingApproval,
};

use crate::engine::{DecisionEngine, ExecStatus};

impl DecisionEngine {
    /// Read-only snapshot of the approval queue.
    pub fn list_pending_approvals(&self, now: DateTime<Utc>) -> Vec<PendingApproval> {
        self.approvals().list_pending(now)
    }

    /// Execute a human-approved proposal.
    ///
    /// Approval bypasses re-analysis but not re-guardrailing: the invariant
    /// rules are re-checked against current counters, because state may have
    /// moved on since the proposal was queued. A failing re-check settles the
    /// row as rejected-by-re-check and nothing reaches the adapter.
    ///
    /// Serialised with ticks on the same lease; if a tick is in flight the
    /// caller gets a retryable error rather than a racing execution.
    pub async fn approve(&self, proposal_id: Uuid, now: DateTime<Utc>) -> Result<ActionRecord> {
        let Some(_lease) = self.lease.try_acquire(now) else {
            return Err(PilotError::LeaseUnavailable(
                "a tick is in flight; retry after it completes".into(),
            ));
        };
        self.rollover_counters(now)?;

        let entry = self.approvals().take_approved(proposal_id, now)?;
        let campaign = self
            .ledger()
            .get_campaign(&entry.proposal.campaign)?
            .ok_or_else(|| {
                PilotError::ApprovalConflict(format!(
                    "campaign {} is no longer known",
                    entry.proposal.campaign
                ))
            })?;

        let config = self.config_snapshot();
        let recheck = {
            let overrides = self.overrides.lock();
            let effective = EffectiveGuardrails::resolve(
                &config.guardrails,
                &overrides,
                Some(&entry.proposal.campaign),
                now,
            );
            drop(overrides);
            let totals = self.platform_enabled_totals()?;
            let counters = self.counters_lock();
            let ctx = self.gate_context(now, &campaign, &counters, &totals);
            self.gate_recheck(&entry.proposal, &ctx, &effective)
        };

        if let Some(decision) = recheck {
            info!(
                proposal = %proposal_id,
                justification = %decision.justification,
                "approved proposal failed guardrail re-check"
            );
            self.ledger().update_decision(proposal_id, decision)?;
            self.ledger().finalize_action(
                proposal_id,
                ActionOutcome::Cancelled,
                None,
                None,
                Some(&format!(
                    "guardrail re-check at execution time failed: {}",
                    decision.justification
                )),
            )?;
        } else {
            let status = self.execute_one(&entry.proposal, &campaign, now).await?;
            if status != ExecStatus::Executed {
                info!(proposal = %proposal_id, "approved proposal failed to execute");
            }
        }

        self.ledger()
            .get_action(proposal_id)?
            .ok_or_else(|| PilotError::Ledger(format!("no record for proposal {proposal_id}")))
    }

    /// Terminally reject a queued proposal with a human-supplied reason.
    pub fn reject(
        &self,
        proposal_id: Uuid,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<ActionRecord> {
        let entry = self.approvals().take_rejected(proposal_id, now)?;
        info!(proposal = %proposal_id, reason, "proposal rejected by approver");
        self.ledger().finalize_action(
            entry.proposal.id,
            ActionOutcome::Cancelled,
            None,
            None,
            Some(reason),
        )?;
        self.ledger()
            .get_action(proposal_id)?
            .ok_or_else(|| PilotError::Ledger(format!("no record for proposal {proposal_id}")))
    }

    /// Range query on the ledger.
    pub fn get_recent_actions(&self, since: DateTime<Utc>) -> Result<Vec<ActionRecord>> {
        self.ledger().recent_actions(since)
    }

    /// Write a time-boxed guardrail override, itself ledgered.
    pub fn override_guardrail(
        &self,
        scope: OverrideScope,
        field: OverrideField,
        value: f64,
        ttl: chrono::Duration,
        now: DateTime<Utc>,
    ) -> Result<GuardrailOverride> {
        let entry = {
            let mut overrides = self.overrides.lock();
            overrides.prune_expired(now);
            overrides.insert(scope, field, value, ttl, now)
        };
        let detail = serde_json::to_string(&entry)?;
        self.ledger().record_config_change(&detail)?;
        self.ledger()
            .record_event(EventKind::ConfigChange, None, None, &detail)?;
        info!(field = %entry.field, value = entry.value, expires_at = %entry.expires_at, "guardrail override written");
        Ok(entry)
    }
}

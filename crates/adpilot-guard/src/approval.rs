//! The approval queue: proposals classified `APPROVAL_REQUIRED` wait here
//! for a human, bounded by a TTL.
//!
//! Expiry auto-rejects with outcome `EXPIRED`; a proposal at exactly the TTL
//! boundary is expired, not executable. Approving or rejecting an entry that
//! is gone (or expired) is a conflict, never a silent success.

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;
use uuid::Uuid;

use adpilot_core::{Justification, PilotError, Proposal, Result};

/// One queued proposal awaiting a human verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingApproval {
    pub proposal: Proposal,
    /// Why the gate escalated it.
    pub justification: Justification,
    pub queued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl PendingApproval {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

pub struct ApprovalQueue {
    ttl: Duration,
    entries: Mutex<HashMap<Uuid, PendingApproval>>,
}

impl ApprovalQueue {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn enqueue(
        &self,
        proposal: Proposal,
        justification: Justification,
        now: DateTime<Utc>,
    ) -> PendingApproval {
        let entry = PendingApproval {
            expires_at: now + self.ttl,
            queued_at: now,
            justification,
            proposal,
        };
        info!(
            proposal = %entry.proposal.id,
            campaign = %entry.proposal.campaign,
            expires_at = %entry.expires_at,
            "proposal queued for approval"
        );
        self.entries
            .lock()
            .insert(entry.proposal.id, entry.clone());
        entry
    }

    /// Unexpired entries, oldest first.
    pub fn list_pending(&self, now: DateTime<Utc>) -> Vec<PendingApproval> {
        let mut pending: Vec<_> = self
            .entries
            .lock()
            .values()
            .filter(|e| !e.is_expired(now))
            .cloned()
            .collect();
        pending.sort_by_key(|e| e.queued_at);
        pending
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Take an entry for execution after human approval. Conflicts if the
    /// entry is unknown, already resolved, or expired. An approver clicking
    /// a minute after expiry gets the conflict, not an execution.
    pub fn take_approved(&self, proposal_id: Uuid, now: DateTime<Utc>) -> Result<PendingApproval> {
        let mut entries = self.entries.lock();
        let expired_at = match entries.get(&proposal_id) {
            None => {
                return Err(PilotError::ApprovalConflict(format!(
                    "proposal {proposal_id} is not awaiting approval"
                )))
            }
            Some(entry) if entry.is_expired(now) => Some(entry.expires_at),
            Some(_) => None,
        };
        if let Some(at) = expired_at {
            return Err(PilotError::ApprovalConflict(format!(
                "proposal {proposal_id} expired at {at}"
            )));
        }
        entries.remove(&proposal_id).ok_or_else(|| {
            PilotError::ApprovalConflict(format!("proposal {proposal_id} is not awaiting approval"))
        })
    }

    /// Take an entry for human rejection. Expired entries conflict the same
    /// way as on approval; the sweeper owns them.
    pub fn take_rejected(&self, proposal_id: Uuid, now: DateTime<Utc>) -> Result<PendingApproval> {
        self.take_approved(proposal_id, now)
    }

    /// Remove and return every expired entry so the caller can ledger them
    /// with outcome EXPIRED.
    pub fn sweep_expired(&self, now: DateTime<Utc>) -> Vec<PendingApproval> {
        let mut entries = self.entries.lock();
        let expired_ids: Vec<Uuid> = entries
            .values()
            .filter(|e| e.is_expired(now))
            .map(|e| e.proposal.id)
            .collect();
        expired_ids
            .into_iter()
            .filter_map(|id| entries.remove(&id))
            .collect()
    }

    /// Drop every pending proposal against a campaign (used when the
    /// campaign disappears from its platform).
    pub fn cancel_for_campaign(&self, campaign: &adpilot_core::CampaignRef) -> Vec<PendingApproval> {
        let mut entries = self.entries.lock();
        let ids: Vec<Uuid> = entries
            .values()
            .filter(|e| &e.proposal.campaign == campaign)
            .map(|e| e.proposal.id)
            .collect();
        ids.into_iter().filter_map(|id| entries.remove(&id)).collect()
    }
}

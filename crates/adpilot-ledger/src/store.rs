use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::Connection;
use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;
use tracing::info;
use uuid::Uuid;

use adpilot_core::{
    ActionOutcome, ActionRecord, Campaign, CampaignRef, CampaignStatus, DateRange, Decision,
    EventKind, Justification, MetricSample, Money, PilotError, PlatformId, Proposal, ProposalKind,
    Result, StateSnapshot, Verdict,
};

fn db_err(e: impl std::fmt::Display) -> PilotError {
    PilotError::Ledger(e.to_string())
}

/// One recovered execution row, used to rebuild `DailyCounters` on cold
/// start by scanning since local midnight.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutedAdjustment {
    pub campaign: CampaignRef,
    pub signed_delta: Money,
    pub executed_at: DateTime<Utc>,
}

/// SQLite-backed ledger. Rows are inserted once and never deleted; an action
/// row is finalized (outcome, after_state) exactly once after its execution
/// attempt.
pub struct Ledger {
    db: Mutex<Connection>,
}

impl Ledger {
    /// Open or create the ledger database at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        info!(?path, "opening ledger");

        let conn = Connection::open(path).map_err(db_err)?;

        // WAL for concurrent dashboard reads
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
            .map_err(db_err)?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS campaigns (
                platform TEXT NOT NULL,
                external_id TEXT NOT NULL,
                name TEXT NOT NULL,
                status TEXT NOT NULL,
                daily_budget_minor INTEGER NOT NULL,
                objective TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                last_seen_at TEXT NOT NULL,
                PRIMARY KEY (platform, external_id)
            );

            CREATE TABLE IF NOT EXISTS metric_samples (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                platform TEXT NOT NULL,
                external_id TEXT NOT NULL,
                sample_time TEXT NOT NULL,
                impressions INTEGER NOT NULL,
                clicks INTEGER NOT NULL,
                spend_minor INTEGER NOT NULL,
                conversions INTEGER NOT NULL,
                revenue_minor INTEGER NOT NULL,
                mock_data INTEGER NOT NULL DEFAULT 0
            );
            CREATE INDEX IF NOT EXISTS idx_samples_campaign_time
                ON metric_samples(platform, external_id, sample_time);
            CREATE INDEX IF NOT EXISTS idx_samples_time
                ON metric_samples(sample_time);

            CREATE TABLE IF NOT EXISTS action_ledger (
                id TEXT PRIMARY KEY,
                event_kind TEXT NOT NULL,
                proposal_id TEXT UNIQUE,
                platform TEXT,
                external_id TEXT,
                kind TEXT,
                verdict TEXT,
                justification TEXT,
                before_state TEXT,
                after_state TEXT,
                outcome TEXT,
                error TEXT,
                detail TEXT,
                executed_at TEXT,
                recorded_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_actions_campaign_time
                ON action_ledger(platform, external_id, recorded_at);
            CREATE INDEX IF NOT EXISTS idx_actions_outcome_time
                ON action_ledger(outcome, recorded_at);

            CREATE TABLE IF NOT EXISTS config_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                recorded_at TEXT NOT NULL,
                change TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_config_time ON config_history(recorded_at);
            ",
        )
        .map_err(db_err)?;

        Ok(Self {
            db: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for tests).
    pub fn open_in_memory() -> Result<Self> {
        Self::open(Path::new(":memory:"))
    }

    // ── Action rows ────────────────────────────────────────────

    /// Insert the single action row for a proposal at gate time.
    ///
    /// Returns false when a row for this proposal already exists: the
    /// UNIQUE constraint is what makes tick replay a no-op. The caller must
    /// not execute a proposal whose row could not be persisted (fail-closed).
    pub fn record_decision(&self, proposal: &Proposal, decision: Decision) -> Result<bool> {
        let db = self.db.lock();
        let now = Utc::now().to_rfc3339();
        let inserted = db
            .execute(
                "INSERT INTO action_ledger
                    (id, event_kind, proposal_id, platform, external_id, kind,
                     verdict, justification, before_state, recorded_at)
                 VALUES (?1, 'ACTION', ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 ON CONFLICT(proposal_id) DO NOTHING",
                rusqlite::params![
                    Uuid::new_v4().to_string(),
                    proposal.id.to_string(),
                    proposal.campaign.platform.as_str(),
                    proposal.campaign.external_id,
                    proposal.kind.to_string(),
                    verdict_str(decision.verdict),
                    decision.justification.to_string(),
                    serde_json::to_string(&proposal.from_state)?,
                    now,
                ],
            )
            .map_err(db_err)?;
        Ok(inserted > 0)
    }

    /// Fill in the terminal fields of a proposal's row after its execution
    /// attempt (or expiry/cancellation). Called once per proposal.
    pub fn finalize_action(
        &self,
        proposal_id: Uuid,
        outcome: ActionOutcome,
        after_state: Option<&StateSnapshot>,
        executed_at: Option<DateTime<Utc>>,
        error: Option<&str>,
    ) -> Result<()> {
        let after_json = after_state.map(serde_json::to_string).transpose()?;
        let db = self.db.lock();
        let changed = db
            .execute(
                "UPDATE action_ledger
                 SET outcome = ?2, after_state = ?3, executed_at = ?4, error = ?5
                 WHERE proposal_id = ?1 AND outcome IS NULL",
                rusqlite::params![
                    proposal_id.to_string(),
                    outcome.to_string(),
                    after_json,
                    executed_at.map(|t| t.to_rfc3339()),
                    error,
                ],
            )
            .map_err(db_err)?;
        if changed == 0 {
            return Err(PilotError::Ledger(format!(
                "no open action row for proposal {proposal_id}"
            )));
        }
        Ok(())
    }

    /// Overwrite the decision recorded for a queued proposal when its
    /// execution-time re-check produced a different verdict. The original
    /// verdict is preserved in the error column by the caller's reason.
    pub fn update_decision(
        &self,
        proposal_id: Uuid,
        decision: Decision,
    ) -> Result<()> {
        let db = self.db.lock();
        db.execute(
            "UPDATE action_ledger SET verdict = ?2, justification = ?3
             WHERE proposal_id = ?1 AND outcome IS NULL",
            rusqlite::params![
                proposal_id.to_string(),
                verdict_str(decision.verdict),
                decision.justification.to_string(),
            ],
        )
        .map_err(db_err)?;
        Ok(())
    }

    pub fn get_action(&self, proposal_id: Uuid) -> Result<Option<ActionRecord>> {
        let db = self.db.lock();
        let mut stmt = db
            .prepare(
                "SELECT id, proposal_id, platform, external_id, kind, verdict, justification,
                        before_state, after_state, outcome, error, executed_at, recorded_at
                 FROM action_ledger WHERE proposal_id = ?1",
            )
            .map_err(db_err)?;
        let mut rows = stmt
            .query_map(rusqlite::params![proposal_id.to_string()], row_to_action)
            .map_err(db_err)?;
        match rows.next() {
            Some(row) => Ok(Some(row.map_err(db_err)?)),
            None => Ok(None),
        }
    }

    /// Action rows recorded since `since`, newest first.
    pub fn recent_actions(&self, since: DateTime<Utc>) -> Result<Vec<ActionRecord>> {
        let db = self.db.lock();
        let mut stmt = db
            .prepare(
                "SELECT id, proposal_id, platform, external_id, kind, verdict, justification,
                        before_state, after_state, outcome, error, executed_at, recorded_at
                 FROM action_ledger
                 WHERE event_kind = 'ACTION' AND recorded_at >= ?1
                 ORDER BY recorded_at DESC",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map(rusqlite::params![since.to_rfc3339()], row_to_action)
            .map_err(db_err)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(db_err)?;
        Ok(rows)
    }

    /// Action rows for one campaign over a range, oldest first.
    pub fn actions_for_campaign(
        &self,
        campaign: &CampaignRef,
        range: DateRange,
    ) -> Result<Vec<ActionRecord>> {
        let db = self.db.lock();
        let mut stmt = db
            .prepare(
                "SELECT id, proposal_id, platform, external_id, kind, verdict, justification,
                        before_state, after_state, outcome, error, executed_at, recorded_at
                 FROM action_ledger
                 WHERE event_kind = 'ACTION' AND platform = ?1 AND external_id = ?2
                   AND recorded_at >= ?3 AND recorded_at < ?4
                 ORDER BY recorded_at ASC",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map(
                rusqlite::params![
                    campaign.platform.as_str(),
                    campaign.external_id,
                    range.start.to_rfc3339(),
                    range.end.to_rfc3339(),
                ],
                row_to_action,
            )
            .map_err(db_err)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(db_err)?;
        Ok(rows)
    }

    /// Successful executions since `since`, for counter recovery.
    pub fn executed_since(&self, since: DateTime<Utc>) -> Result<Vec<ExecutedAdjustment>> {
        let db = self.db.lock();
        let mut stmt = db
            .prepare(
                "SELECT platform, external_id, before_state, after_state, executed_at
                 FROM action_ledger
                 WHERE event_kind = 'ACTION' AND outcome = 'SUCCESS' AND executed_at >= ?1",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map(rusqlite::params![since.to_rfc3339()], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })
            .map_err(db_err)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(db_err)?;

        let mut out = Vec::with_capacity(rows.len());
        for (platform, external_id, before_json, after_json, executed_at) in rows {
            let platform = PlatformId::from_str(&platform).map_err(PilotError::Ledger)?;
            let before: StateSnapshot = serde_json::from_str(&before_json)?;
            let after: Option<StateSnapshot> =
                after_json.map(|j| serde_json::from_str(&j)).transpose()?;
            let signed_delta = after
                .map(|a| a.daily_budget - before.daily_budget)
                .unwrap_or(Money::ZERO);
            out.push(ExecutedAdjustment {
                campaign: CampaignRef::new(platform, external_id),
                signed_delta,
                executed_at: parse_time(&executed_at)?,
            });
        }
        Ok(out)
    }

    // ── Event rows ─────────────────────────────────────────────

    /// Record a non-action event (tick failure/skip, platform exclusion,
    /// counter rollover, alert).
    pub fn record_event(
        &self,
        kind: EventKind,
        platform: Option<PlatformId>,
        campaign: Option<&CampaignRef>,
        detail: &str,
    ) -> Result<()> {
        let db = self.db.lock();
        db.execute(
            "INSERT INTO action_ledger (id, event_kind, platform, external_id, detail, recorded_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
                Uuid::new_v4().to_string(),
                kind.to_string(),
                platform
                    .or(campaign.map(|c| c.platform))
                    .map(|p| p.as_str()),
                campaign.map(|c| c.external_id.as_str()),
                detail,
                Utc::now().to_rfc3339(),
            ],
        )
        .map_err(db_err)?;
        Ok(())
    }

    /// Events of one kind since `since`, newest first: `(detail, recorded_at)`.
    pub fn events_since(
        &self,
        kind: EventKind,
        since: DateTime<Utc>,
    ) -> Result<Vec<(String, DateTime<Utc>)>> {
        let db = self.db.lock();
        let mut stmt = db
            .prepare(
                "SELECT detail, recorded_at FROM action_ledger
                 WHERE event_kind = ?1 AND recorded_at >= ?2
                 ORDER BY recorded_at DESC",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map(
                rusqlite::params![kind.to_string(), since.to_rfc3339()],
                |row| {
                    Ok((
                        row.get::<_, Option<String>>(0)?.unwrap_or_default(),
                        row.get::<_, String>(1)?,
                    ))
                },
            )
            .map_err(db_err)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(db_err)?;
        rows.into_iter()
            .map(|(detail, at)| Ok((detail, parse_time(&at)?)))
            .collect()
    }

    // ── Metric samples ─────────────────────────────────────────

    pub fn insert_samples(&self, samples: &[MetricSample]) -> Result<()> {
        let mut db = self.db.lock();
        let tx = db.transaction().map_err(db_err)?;
        for sample in samples {
            tx.execute(
                "INSERT INTO metric_samples
                    (platform, external_id, sample_time, impressions, clicks,
                     spend_minor, conversions, revenue_minor, mock_data)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                rusqlite::params![
                    sample.campaign.platform.as_str(),
                    sample.campaign.external_id,
                    sample.sample_time.to_rfc3339(),
                    sample.impressions as i64,
                    sample.clicks as i64,
                    sample.spend.minor(),
                    sample.conversions as i64,
                    sample.revenue.minor(),
                    sample.mock_data as i32,
                ],
            )
            .map_err(db_err)?;
        }
        tx.commit().map_err(db_err)?;
        Ok(())
    }

    /// All samples in a time range, oldest first.
    pub fn samples_in_range(&self, range: DateRange) -> Result<Vec<MetricSample>> {
        let db = self.db.lock();
        let mut stmt = db
            .prepare(
                "SELECT platform, external_id, sample_time, impressions, clicks,
                        spend_minor, conversions, revenue_minor, mock_data
                 FROM metric_samples
                 WHERE sample_time >= ?1 AND sample_time < ?2
                 ORDER BY sample_time ASC",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map(
                rusqlite::params![range.start.to_rfc3339(), range.end.to_rfc3339()],
                row_to_sample,
            )
            .map_err(db_err)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(db_err)?;
        Ok(rows)
    }

    // ── Campaigns ──────────────────────────────────────────────

    /// Upsert confirmed platform state. Only ever called with state that came
    /// from an adapter response or read-back.
    pub fn upsert_campaign(&self, campaign: &Campaign, last_seen_at: DateTime<Utc>) -> Result<()> {
        let db = self.db.lock();
        db.execute(
            "INSERT INTO campaigns
                (platform, external_id, name, status, daily_budget_minor, objective,
                 created_at, updated_at, last_seen_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             ON CONFLICT(platform, external_id) DO UPDATE SET
                name = excluded.name,
                status = excluded.status,
                daily_budget_minor = excluded.daily_budget_minor,
                objective = excluded.objective,
                updated_at = excluded.updated_at,
                last_seen_at = excluded.last_seen_at",
            rusqlite::params![
                campaign.reference.platform.as_str(),
                campaign.reference.external_id,
                campaign.name,
                campaign.status.to_string(),
                campaign.daily_budget.minor(),
                campaign.objective,
                campaign.created_at.to_rfc3339(),
                campaign.updated_at.to_rfc3339(),
                last_seen_at.to_rfc3339(),
            ],
        )
        .map_err(db_err)?;
        Ok(())
    }

    pub fn get_campaign(&self, reference: &CampaignRef) -> Result<Option<Campaign>> {
        let db = self.db.lock();
        let mut stmt = db
            .prepare(
                "SELECT platform, external_id, name, status, daily_budget_minor, objective,
                        created_at, updated_at
                 FROM campaigns WHERE platform = ?1 AND external_id = ?2",
            )
            .map_err(db_err)?;
        let mut rows = stmt
            .query_map(
                rusqlite::params![reference.platform.as_str(), reference.external_id],
                row_to_campaign,
            )
            .map_err(db_err)?;
        match rows.next() {
            Some(row) => Ok(Some(row.map_err(db_err)?)),
            None => Ok(None),
        }
    }

    pub fn list_campaigns(&self) -> Result<Vec<Campaign>> {
        let db = self.db.lock();
        let mut stmt = db
            .prepare(
                "SELECT platform, external_id, name, status, daily_budget_minor, objective,
                        created_at, updated_at
                 FROM campaigns ORDER BY platform, external_id",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map([], row_to_campaign)
            .map_err(db_err)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(db_err)?;
        Ok(rows)
    }

    /// The set of campaign refs the system has already seen.
    pub fn known_refs(&self) -> Result<HashSet<CampaignRef>> {
        Ok(self
            .list_campaigns()?
            .into_iter()
            .map(|c| c.reference)
            .collect())
    }

    /// Transition a campaign to REMOVED (it disappeared from its platform).
    pub fn mark_campaign_removed(&self, reference: &CampaignRef) -> Result<()> {
        let db = self.db.lock();
        db.execute(
            "UPDATE campaigns SET status = 'REMOVED', updated_at = ?3
             WHERE platform = ?1 AND external_id = ?2",
            rusqlite::params![
                reference.platform.as_str(),
                reference.external_id,
                Utc::now().to_rfc3339(),
            ],
        )
        .map_err(db_err)?;
        Ok(())
    }

    // ── Config history ─────────────────────────────────────────

    pub fn record_config_change(&self, change: &str) -> Result<()> {
        let db = self.db.lock();
        db.execute(
            "INSERT INTO config_history (recorded_at, change) VALUES (?1, ?2)",
            rusqlite::params![Utc::now().to_rfc3339(), change],
        )
        .map_err(db_err)?;
        Ok(())
    }

    pub fn config_history(&self, limit: usize) -> Result<Vec<(DateTime<Utc>, String)>> {
        let db = self.db.lock();
        let mut stmt = db
            .prepare(
                "SELECT recorded_at, change FROM config_history
                 ORDER BY id DESC LIMIT ?1",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map(rusqlite::params![limit as i64], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(db_err)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(db_err)?;
        rows.into_iter()
            .map(|(at, change)| Ok((parse_time(&at)?, change)))
            .collect()
    }
}

// ── Row mapping ────────────────────────────────────────────────

fn verdict_str(verdict: Verdict) -> &'static str {
    match verdict {
        Verdict::AutoExecute => "AUTO_EXECUTE",
        Verdict::ApprovalRequired => "APPROVAL_REQUIRED",
        Verdict::Rejected => "REJECTED",
    }
}

fn parse_verdict(raw: &str) -> rusqlite::Result<Verdict> {
    match raw {
        "AUTO_EXECUTE" => Ok(Verdict::AutoExecute),
        "APPROVAL_REQUIRED" => Ok(Verdict::ApprovalRequired),
        "REJECTED" => Ok(Verdict::Rejected),
        _ => Err(rusqlite::Error::InvalidQuery),
    }
}

fn parse_justification(raw: &str) -> Justification {
    match raw {
        "LOW_CONFIDENCE" => Justification::LowConfidence,
        "INSUFFICIENT_RUNTIME" => Justification::InsufficientRuntime,
        "MAJOR_CHANGE" => Justification::MajorChange,
        "HIGH_IMPACT_KIND" => Justification::HighImpactKind,
        "WITHIN_LIMITS" => Justification::WithinLimits,
        "ADVISORY_MODE" => Justification::AdvisoryMode,
        "UNKNOWN_CAMPAIGN" => Justification::UnknownCampaign,
        "INVARIANT_VIOLATION(PLATFORM_CEILING)" => {
            Justification::InvariantViolation(adpilot_core::Invariant::PlatformCeiling)
        }
        "INVARIANT_VIOLATION(DAILY_ADJUSTMENT_CAP)" => {
            Justification::InvariantViolation(adpilot_core::Invariant::DailyAdjustmentCap)
        }
        _ => Justification::InvariantViolation(adpilot_core::Invariant::CampaignDailyDelta),
    }
}

fn parse_kind(raw: &str) -> rusqlite::Result<ProposalKind> {
    match raw {
        "PAUSE" => Ok(ProposalKind::Pause),
        "RESUME" => Ok(ProposalKind::Resume),
        "INCREASE_BUDGET" => Ok(ProposalKind::IncreaseBudget),
        "DECREASE_BUDGET" => Ok(ProposalKind::DecreaseBudget),
        "REALLOCATE" => Ok(ProposalKind::Reallocate),
        "CREATE_CAMPAIGN" => Ok(ProposalKind::CreateCampaign),
        "STRATEGY_CHANGE" => Ok(ProposalKind::StrategyChange),
        _ => Err(rusqlite::Error::InvalidQuery),
    }
}

fn parse_time(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| PilotError::Ledger(format!("bad timestamp {raw}: {e}")))
}

fn row_to_action(row: &rusqlite::Row<'_>) -> rusqlite::Result<ActionRecord> {
    let invalid = || rusqlite::Error::InvalidQuery;

    let id: String = row.get(0)?;
    let proposal_id: String = row.get(1)?;
    let platform: String = row.get(2)?;
    let external_id: String = row.get(3)?;
    let kind: String = row.get(4)?;
    let verdict: String = row.get(5)?;
    let justification: String = row.get(6)?;
    let before_state: String = row.get(7)?;
    let after_state: Option<String> = row.get(8)?;
    let outcome: Option<String> = row.get(9)?;
    let error: Option<String> = row.get(10)?;
    let executed_at: Option<String> = row.get(11)?;
    let recorded_at: String = row.get(12)?;

    Ok(ActionRecord {
        id: Uuid::parse_str(&id).map_err(|_| invalid())?,
        proposal_id: Uuid::parse_str(&proposal_id).map_err(|_| invalid())?,
        campaign: CampaignRef::new(
            PlatformId::from_str(&platform).map_err(|_| invalid())?,
            external_id,
        ),
        kind: parse_kind(&kind)?,
        decision: Decision::new(parse_verdict(&verdict)?, parse_justification(&justification)),
        before_state: serde_json::from_str(&before_state).map_err(|_| invalid())?,
        after_state: after_state
            .map(|j| serde_json::from_str(&j))
            .transpose()
            .map_err(|_| invalid())?,
        outcome: outcome
            .map(|o| ActionOutcome::from_str(&o))
            .transpose()
            .map_err(|_| invalid())?,
        error,
        executed_at: executed_at
            .map(|t| {
                DateTime::parse_from_rfc3339(&t)
                    .map(|t| t.with_timezone(&Utc))
                    .map_err(|_| invalid())
            })
            .transpose()?,
        recorded_at: DateTime::parse_from_rfc3339(&recorded_at)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|_| invalid())?,
    })
}

fn row_to_sample(row: &rusqlite::Row<'_>) -> rusqlite::Result<MetricSample> {
    let invalid = || rusqlite::Error::InvalidQuery;
    let platform: String = row.get(0)?;
    let external_id: String = row.get(1)?;
    let sample_time: String = row.get(2)?;
    Ok(MetricSample {
        campaign: CampaignRef::new(
            PlatformId::from_str(&platform).map_err(|_| invalid())?,
            external_id,
        ),
        sample_time: DateTime::parse_from_rfc3339(&sample_time)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|_| invalid())?,
        impressions: row.get::<_, i64>(3)? as u64,
        clicks: row.get::<_, i64>(4)? as u64,
        spend: Money::from_minor(row.get::<_, i64>(5)?),
        conversions: row.get::<_, i64>(6)? as u64,
        revenue: Money::from_minor(row.get::<_, i64>(7)?),
        mock_data: row.get::<_, i32>(8)? != 0,
    })
}

fn row_to_campaign(row: &rusqlite::Row<'_>) -> rusqlite::Result<Campaign> {
    let invalid = || rusqlite::Error::InvalidQuery;
    let platform: String = row.get(0)?;
    let external_id: String = row.get(1)?;
    let status: String = row.get(3)?;
    let created_at: String = row.get(6)?;
    let updated_at: String = row.get(7)?;
    Ok(Campaign {
        reference: CampaignRef::new(
            PlatformId::from_str(&platform).map_err(|_| invalid())?,
            external_id,
        ),
        name: row.get(2)?,
        status: CampaignStatus::from_str(&status).map_err(|_| invalid())?,
        daily_budget: Money::from_minor(row.get::<_, i64>(4)?),
        objective: row.get(5)?,
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|_| invalid())?,
        updated_at: DateTime::parse_from_rfc3339(&updated_at)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|_| invalid())?,
    })
}

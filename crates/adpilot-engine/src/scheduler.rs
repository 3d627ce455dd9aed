//! Wall-clock-aligned tick scheduling.
//!
//! The scheduler aims at boundaries of the configured interval (e.g.
//! :00/:15/:30/:45 for 15 minutes) rather than "N minutes after the last
//! tick", so sample windows stay aligned with external reporting and the
//! cadence never drifts. Ticks are strictly serial: one that overruns the
//! next boundary causes a skip, never a queued second tick.

use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use adpilot_core::EventKind;

use crate::engine::DecisionEngine;

/// The next interval boundary strictly after `now`.
pub fn next_boundary(now: DateTime<Utc>, interval_secs: u64) -> DateTime<Utc> {
    let interval = interval_secs.max(1) as i64;
    let ts = now.timestamp();
    let next = (ts.div_euclid(interval) + 1) * interval;
    Utc.timestamp_opt(next, 0).single().unwrap_or(now)
}

pub struct TickScheduler {
    engine: Arc<DecisionEngine>,
    shutdown: broadcast::Sender<()>,
}

impl TickScheduler {
    pub fn new(engine: Arc<DecisionEngine>) -> Self {
        let (shutdown, _) = broadcast::channel(4);
        Self { engine, shutdown }
    }

    pub fn shutdown_handle(&self) -> broadcast::Sender<()> {
        self.shutdown.clone()
    }

    /// Run the loop until shutdown. Should be the long-lived task of the
    /// process.
    pub async fn run(&self) {
        let mut shutdown = self.shutdown.subscribe();
        info!("tick scheduler started");

        loop {
            let interval_secs = self.engine.tick_interval_secs();
            let boundary = next_boundary(Utc::now(), interval_secs);
            let wait = (boundary - Utc::now())
                .to_std()
                .unwrap_or(std::time::Duration::ZERO);

            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = shutdown.recv() => {
                    info!("tick scheduler shutting down");
                    return;
                }
            }

            let started = Utc::now();
            match self.engine.run_tick(started).await {
                Ok(summary) => {
                    info!(
                        phase = %summary.final_phase,
                        proposals = summary.proposals_seen,
                        executed = summary.executed,
                        "tick complete"
                    );
                }
                Err(e) => error!(error = %e, "tick failed"),
            }

            // Overrun detection: if the tick ran past the boundary after the
            // one it started at, that boundary's tick is skipped, not queued.
            let finished = Utc::now();
            let missed_boundary = next_boundary(started, interval_secs);
            if finished > missed_boundary {
                warn!(%missed_boundary, "tick overran the next boundary, skipping");
                if let Err(e) = self.engine.ledger().record_event(
                    EventKind::TickSkipped,
                    None,
                    None,
                    &format!("tick started {started} finished {finished}, skipped boundary {missed_boundary}"),
                ) {
                    error!(error = %e, "failed to ledger tick skip");
                }
            }
        }
    }
}

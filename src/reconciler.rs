//! Reconciliation orchestrator
//!
//! Drives one run per trigger: fetch upstream → validate → transactional
//! replace, with a failed run recorded and the store untouched on any
//! error. Runs are single-flight per series: a trigger that arrives while
//! a run is active coalesces onto the in-flight run's outcome instead of
//! starting a second fetch.

use crate::models::{CanonicalRecord, ReconciliationRun, RunOutcome};
use crate::store::{StandingsStore, StoreError};
use crate::upstream::{Snapshot, StandingsSource, UpstreamError};
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Typed outcome of one reconciliation trigger. The scheduler discards it;
/// the force-refresh endpoint surfaces it to the operator.
#[derive(Debug, Clone)]
pub struct ReconcileOutcome {
    pub series_id: String,
    /// True when this trigger was satisfied by an already-in-flight run.
    pub coalesced: bool,
    pub result: RunResult,
}

#[derive(Debug, Clone)]
pub enum RunResult {
    Success { teams: usize },
    Failed { error: String },
}

impl RunResult {
    pub fn is_success(&self) -> bool {
        matches!(self, RunResult::Success { .. })
    }
}

enum Trigger {
    Leader(broadcast::Sender<ReconcileOutcome>),
    Follower(broadcast::Receiver<ReconcileOutcome>),
}

pub struct Reconciler {
    source: Arc<dyn StandingsSource>,
    store: Arc<StandingsStore>,
    // The only shared mutable state the write path needs: one in-flight
    // entry per series id.
    in_flight: Mutex<HashMap<String, broadcast::Sender<ReconcileOutcome>>>,
}

impl Reconciler {
    pub fn new(source: Arc<dyn StandingsSource>, store: Arc<StandingsStore>) -> Self {
        Self {
            source,
            store,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Reconcile one series. At most one run per series is ever in flight;
    /// concurrent triggers await the leader's outcome.
    pub async fn reconcile(&self, series_id: &str) -> ReconcileOutcome {
        let trigger = {
            let mut in_flight = self.in_flight.lock();
            match in_flight.get(series_id) {
                Some(tx) => Trigger::Follower(tx.subscribe()),
                None => {
                    let (tx, _rx) = broadcast::channel(1);
                    in_flight.insert(series_id.to_string(), tx.clone());
                    Trigger::Leader(tx)
                }
            }
        };

        match trigger {
            Trigger::Follower(mut rx) => {
                debug!(series = series_id, "coalescing onto in-flight run");
                match rx.recv().await {
                    Ok(outcome) => ReconcileOutcome {
                        coalesced: true,
                        ..outcome
                    },
                    Err(_) => ReconcileOutcome {
                        series_id: series_id.to_string(),
                        coalesced: true,
                        result: RunResult::Failed {
                            error: "in-flight reconciliation dropped".to_string(),
                        },
                    },
                }
            }
            Trigger::Leader(tx) => {
                let outcome = self.run(series_id).await;
                self.in_flight.lock().remove(series_id);
                let _ = tx.send(outcome.clone());
                outcome
            }
        }
    }

    /// One full fetch → validate → persist pipeline, audit row included.
    async fn run(&self, series_id: &str) -> ReconcileOutcome {
        let started_at = Utc::now();
        debug!(series = series_id, "reconciliation starting");

        let result = self.execute(series_id).await;

        let (outcome, error) = match &result {
            Ok(teams) => {
                info!(series = series_id, teams, "✅ reconciliation complete");
                (RunOutcome::Success, None)
            }
            Err(e) => {
                warn!(series = series_id, error = %e, "reconciliation failed");
                (RunOutcome::Failure, Some(e.to_string()))
            }
        };

        let audit = ReconciliationRun {
            series_id: series_id.to_string(),
            started_at,
            outcome,
            error: error.clone(),
        };
        if let Err(e) = self.store.record_run(&audit) {
            warn!(series = series_id, error = %e, "failed to record reconciliation run");
        }

        ReconcileOutcome {
            series_id: series_id.to_string(),
            coalesced: false,
            result: match result {
                Ok(teams) => RunResult::Success { teams },
                Err(_) => RunResult::Failed {
                    error: error.unwrap_or_default(),
                },
            },
        }
    }

    async fn execute(&self, series_id: &str) -> Result<usize, SyncError> {
        let snapshot = self.source.fetch(series_id).await?;
        snapshot.validate()?;

        let records = canonicalize(series_id, &snapshot);
        self.store.replace(series_id, &records)?;

        Ok(records.len())
    }
}

/// Map an upstream snapshot onto canonical rows. Points derive from the
/// provider's aggregate win count (two per win); upstream list order is
/// preserved in `pos` as the final tie-breaker.
pub fn canonicalize(series_id: &str, snapshot: &Snapshot) -> Vec<CanonicalRecord> {
    snapshot
        .teams
        .iter()
        .enumerate()
        .map(|(i, team)| CanonicalRecord {
            series_id: series_id.to_string(),
            team_id: team.short_name.clone(),
            team_name: team.team_name.clone(),
            matches: team.matches,
            won: team.wins,
            lost: team.losses,
            draw: team.ties,
            points: team.wins * 2,
            nrr: team.nrr,
            pos: i as u32 + 1,
            last_updated: snapshot.fetched_at,
        })
        .collect()
}

//! Sync scheduler
//!
//! One process-scoped timer driving reconciliation for every tracked
//! series: an immediate pass at startup, then fixed-interval passes. Each
//! tick consults the staleness policy before triggering a run, and tick
//! failures are logged and swallowed; the fallback chain keeps serving
//! reads regardless. This loop is the system's only retry mechanism.

use crate::reconciler::Reconciler;
use crate::staleness;
use crate::store::StandingsStore;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Explicit scheduler handle: constructed once at boot, stopped at
/// shutdown. Dropping it without `stop` leaves the task to be torn down
/// with the runtime; `stop` is the orderly path.
pub struct SyncScheduler {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl SyncScheduler {
    pub fn start(
        reconciler: Arc<Reconciler>,
        store: Arc<StandingsStore>,
        tracked_series: Vec<String>,
        sync_interval: Duration,
        max_age_hours: u32,
    ) -> Self {
        let (shutdown, mut shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            info!(
                series = tracked_series.len(),
                interval_secs = sync_interval.as_secs(),
                "🔄 Sync scheduler started"
            );

            // The first tick fires immediately, giving the startup pass.
            let mut ticker = interval(sync_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        run_pass(&reconciler, &store, &tracked_series, max_age_hours).await;
                    }
                    _ = shutdown_rx.changed() => {
                        info!("Sync scheduler stopping");
                        break;
                    }
                }
            }
        });

        Self { shutdown, handle }
    }

    /// Signal the loop and wait for it to finish.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        let _ = self.handle.await;
    }
}

async fn run_pass(
    reconciler: &Reconciler,
    store: &StandingsStore,
    tracked_series: &[String],
    max_age_hours: u32,
) {
    for series_id in tracked_series {
        let last_success = match store.last_success_at(series_id) {
            Ok(ts) => ts,
            Err(e) => {
                warn!(series = %series_id, error = %e, "staleness check failed, treating as stale");
                None
            }
        };

        if !staleness::is_stale(last_success, max_age_hours, Utc::now()) {
            debug!(series = %series_id, "standings fresh, skipping reconciliation");
            continue;
        }

        // Outcome intentionally discarded beyond logging: scheduled-run
        // failures stay contained here and the next tick retries.
        let outcome = reconciler.reconcile(series_id).await;
        if !outcome.result.is_success() {
            warn!(series = %series_id, "scheduled reconciliation failed, serving fallback tiers");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::{Snapshot, StandingsSource, UpstreamError, UpstreamTeam};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        fetches: AtomicUsize,
    }

    #[async_trait]
    impl StandingsSource for CountingSource {
        async fn fetch(&self, series_id: &str) -> Result<Snapshot, UpstreamError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(Snapshot {
                series_id: series_id.to_string(),
                teams: vec![UpstreamTeam {
                    short_name: "IND".to_string(),
                    team_name: "India".to_string(),
                    matches: 5,
                    wins: 4,
                    losses: 1,
                    ties: 0,
                    logo_url: None,
                    nrr: 1.0,
                }],
                fetched_at: Utc::now(),
            })
        }
    }

    #[tokio::test]
    async fn test_startup_pass_syncs_then_fresh_ticks_skip() {
        let source = Arc::new(CountingSource {
            fetches: AtomicUsize::new(0),
        });
        let store = Arc::new(StandingsStore::open_in_memory().expect("open"));
        let reconciler = Arc::new(Reconciler::new(source.clone(), store.clone()));

        let scheduler = SyncScheduler::start(
            reconciler,
            store.clone(),
            vec!["s1".to_string()],
            Duration::from_millis(30),
            24,
        );

        // Several intervals elapse, but after the startup pass every tick
        // sees a fresh watermark and skips.
        tokio::time::sleep(Duration::from_millis(150)).await;
        scheduler.stop().await;

        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
        assert_eq!(store.read("s1").expect("read").len(), 1);
    }

    #[tokio::test]
    async fn test_stop_terminates_the_loop() {
        let source = Arc::new(CountingSource {
            fetches: AtomicUsize::new(0),
        });
        let store = Arc::new(StandingsStore::open_in_memory().expect("open"));
        let reconciler = Arc::new(Reconciler::new(source.clone(), store.clone()));

        let scheduler = SyncScheduler::start(
            reconciler,
            store,
            vec!["s1".to_string()],
            Duration::from_millis(20),
            0, // always stale, so every tick would reconcile
        );

        tokio::time::sleep(Duration::from_millis(60)).await;
        scheduler.stop().await;
        let after_stop = source.fetches.load(Ordering::SeqCst);

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(source.fetches.load(Ordering::SeqCst), after_stop);
    }
}

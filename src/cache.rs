//! Ephemeral standings cache
//!
//! Process-scoped cache of the last successfully resolved read per series,
//! used by the fallback chain to survive transient store outages. Entries
//! expire after a fixed TTL and are only ever written on a successful
//! durable read, never by the reconciler.

use crate::models::CanonicalRecord;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::{Duration, Instant};

pub const DEFAULT_TTL: Duration = Duration::from_secs(30 * 60);

struct CachedResult {
    records: Vec<CanonicalRecord>,
    cached_at: Instant,
}

pub struct EphemeralCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, CachedResult>>,
}

impl EphemeralCache {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn put(&self, series_id: &str, records: Vec<CanonicalRecord>) {
        self.entries.write().insert(
            series_id.to_string(),
            CachedResult {
                records,
                cached_at: Instant::now(),
            },
        );
    }

    /// Entry for a series if one exists and its age is below the TTL.
    pub fn get_fresh(&self, series_id: &str) -> Option<Vec<CanonicalRecord>> {
        let entries = self.entries.read();
        entries
            .get(series_id)
            .filter(|entry| entry.cached_at.elapsed() < self.ttl)
            .map(|entry| entry.records.clone())
    }
}

impl Default for EphemeralCache {
    fn default() -> Self {
        Self::new()
    }
}

//! Static fallback datasets
//!
//! One registry keyed by series id, consulted only by the fallback chain's
//! last tier. Unknown series resolve to an empty set; a read still
//! succeeds, it just carries no rows.

use crate::models::CanonicalRecord;
use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use std::collections::HashMap;

/// The one series we ship a canned table for: the 2024 IPL final
/// standings, frozen at season end.
pub const IPL_2024_SERIES_ID: &str = "d5a498c8-7596-4b93-8ab0-e0efc3345312";

fn team(
    series_id: &str,
    pos: u32,
    team_id: &str,
    team_name: &str,
    won: u32,
    lost: u32,
    draw: u32,
    nrr: f64,
) -> CanonicalRecord {
    CanonicalRecord {
        series_id: series_id.to_string(),
        team_id: team_id.to_string(),
        team_name: team_name.to_string(),
        matches: won + lost + draw,
        won,
        lost,
        draw,
        points: won * 2,
        nrr,
        pos,
        last_updated: DateTime::<Utc>::UNIX_EPOCH,
    }
}

lazy_static! {
    static ref REGISTRY: HashMap<&'static str, Vec<CanonicalRecord>> = {
        let mut registry = HashMap::new();

        let s = IPL_2024_SERIES_ID;
        registry.insert(
            IPL_2024_SERIES_ID,
            vec![
                team(s, 1, "KKR", "Kolkata Knight Riders", 9, 3, 2, 1.428),
                team(s, 2, "SRH", "Sunrisers Hyderabad", 8, 5, 1, 0.414),
                team(s, 3, "RR", "Rajasthan Royals", 8, 5, 1, 0.273),
                team(s, 4, "RCB", "Royal Challengers Bengaluru", 7, 7, 0, 0.459),
                team(s, 5, "CSK", "Chennai Super Kings", 7, 7, 0, 0.392),
                team(s, 6, "DC", "Delhi Capitals", 7, 7, 0, -0.377),
                team(s, 7, "LSG", "Lucknow Super Giants", 7, 7, 0, -0.667),
                team(s, 8, "PBKS", "Punjab Kings", 5, 9, 0, -0.353),
                team(s, 9, "GT", "Gujarat Titans", 5, 7, 2, -1.063),
                team(s, 10, "MI", "Mumbai Indians", 4, 10, 0, -0.318),
            ],
        );

        registry
    };
}

/// Fixed, always-defined dataset (possibly empty) for a series.
pub fn static_fallback(series_id: &str) -> Vec<CanonicalRecord> {
    REGISTRY.get(series_id).cloned().unwrap_or_default()
}

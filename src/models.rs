use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which data source tier produced a read result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceTier {
    Durable,
    Ephemeral,
    Static,
}

impl SourceTier {
    pub fn as_str(&self) -> &str {
        match self {
            SourceTier::Durable => "durable",
            SourceTier::Ephemeral => "ephemeral",
            SourceTier::Static => "static",
        }
    }
}

/// Authoritative standings row for one team within one series.
///
/// Keyed by (series_id, team_id). Owned by the durable store and only ever
/// rewritten as a complete set by the reconciler's transactional replace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub series_id: String,
    pub team_id: String,
    pub team_name: String,
    pub matches: u32,
    pub won: u32,
    pub lost: u32,
    pub draw: u32,
    pub points: u32,
    pub nrr: f64,
    /// Upstream-provided order, used as the tie-breaker after points and nrr.
    pub pos: u32,
    pub last_updated: DateTime<Utc>,
}

/// Outcome of a single reconciliation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunOutcome {
    Success,
    Failure,
}

impl RunOutcome {
    pub fn as_str(&self) -> &str {
        match self {
            RunOutcome::Success => "success",
            RunOutcome::Failure => "failure",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "success" => RunOutcome::Success,
            _ => RunOutcome::Failure,
        }
    }
}

/// Append-only audit record, one per reconciler invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciliationRun {
    pub series_id: String,
    pub started_at: DateTime<Utc>,
    pub outcome: RunOutcome,
    pub error: Option<String>,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub api_base: String,
    pub database_path: String,
    pub port: u16,
    pub tracked_series: Vec<String>,
    pub sync_interval_hours: u64,
    pub max_age_hours: u32,
    pub fetch_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup. Missing required keys are
    /// fatal here so a misconfigured process never reaches the serve loop.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let api_key = get("CRICKET_API_KEY")
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or_else(|| anyhow::anyhow!("CRICKET_API_KEY must be set"))?;

        let api_base = get("CRICKET_API_BASE")
            .unwrap_or_else(|| "https://api.cricapi.com/v1".to_string());

        let database_path =
            get("DATABASE_PATH").unwrap_or_else(|| "./scoreline.db".to_string());

        let port = get("PORT")
            .unwrap_or_else(|| "8080".to_string())
            .parse()
            .unwrap_or(8080);

        let tracked_series: Vec<String> = get("TRACKED_SERIES")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        if tracked_series.is_empty() {
            anyhow::bail!("TRACKED_SERIES must list at least one series id");
        }

        let sync_interval_hours = get("SYNC_INTERVAL_HOURS")
            .and_then(|v| v.parse().ok())
            .filter(|&v| v > 0)
            .unwrap_or(6);

        let max_age_hours = get("MAX_AGE_HOURS")
            .and_then(|v| v.parse().ok())
            .filter(|&v| v > 0)
            .unwrap_or(24);

        let fetch_timeout_secs = get("FETCH_TIMEOUT_SECS")
            .and_then(|v| v.parse().ok())
            .filter(|&v| v > 0)
            .unwrap_or(15);

        Ok(Self {
            api_key,
            api_base,
            database_path,
            port,
            tracked_series,
            sync_interval_hours,
            max_age_hours,
            fetch_timeout_secs,
        })
    }
}

//! Cricket Data API client
//!
//! One snapshot per call, one bounded timeout, no retries and no caching.
//! Retry policy belongs entirely to the reconciler/scheduler; a failed
//! attempt here is terminal for that trigger.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, info};

/// Upstream failure taxonomy. `Malformed` is handled identically to the
/// network variants downstream: the provider's data shape is not trusted
/// to be stable.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("upstream request timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("rate limited by upstream provider")]
    RateLimited,

    #[error("upstream provider error: {0}")]
    Upstream(String),

    #[error("malformed upstream response: {0}")]
    Malformed(String),
}

/// One team entry as the provider reports it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamTeam {
    #[serde(rename = "shortname")]
    pub short_name: String,
    #[serde(rename = "teamname")]
    pub team_name: String,
    pub matches: u32,
    pub wins: u32,
    #[serde(rename = "loss")]
    pub losses: u32,
    #[serde(default)]
    pub ties: u32,
    // The provider omits these for some competitions.
    #[serde(default, rename = "img")]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub nrr: f64,
}

#[derive(Debug, Deserialize)]
struct SeriesPointsResponse {
    data: Vec<UpstreamTeam>,
}

/// Raw upstream payload plus the time it was fetched. Transient; owned by
/// one reconciler run and discarded after persistence.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub series_id: String,
    pub teams: Vec<UpstreamTeam>,
    pub fetched_at: DateTime<Utc>,
}

impl Snapshot {
    /// Structural checks beyond what serde enforces. Anything that fails
    /// here is `Malformed` and the run fails without touching the store.
    pub fn validate(&self) -> Result<(), UpstreamError> {
        if self.teams.is_empty() {
            return Err(UpstreamError::Malformed("empty team list".to_string()));
        }

        for team in &self.teams {
            if team.short_name.trim().is_empty() {
                return Err(UpstreamError::Malformed(format!(
                    "team '{}' has no short name",
                    team.team_name
                )));
            }
            if team.matches < team.wins + team.losses + team.ties {
                return Err(UpstreamError::Malformed(format!(
                    "{}: {} matches but {} results",
                    team.short_name,
                    team.matches,
                    team.wins + team.losses + team.ties
                )));
            }
        }

        Ok(())
    }
}

/// Seam the reconciler consumes, so tests can script upstream behavior.
#[async_trait]
pub trait StandingsSource: Send + Sync {
    async fn fetch(&self, series_id: &str) -> Result<Snapshot, UpstreamError>;
}

/// HTTP client for the provider's series-points endpoint.
pub struct CricketApiClient {
    client: Client,
    base_url: String,
    api_key: String,
    call_timeout: Duration,
}

impl CricketApiClient {
    pub fn new(
        base_url: String,
        api_key: String,
        call_timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(call_timeout)
            .user_agent("Scoreline/1.0 (Standings Sync)")
            .build()?;

        Ok(Self {
            client,
            base_url,
            api_key,
            call_timeout,
        })
    }

    fn parse_body(series_id: &str, body: &str) -> Result<Snapshot, UpstreamError> {
        let parsed: SeriesPointsResponse = serde_json::from_str(body)
            .map_err(|e| UpstreamError::Malformed(e.to_string()))?;

        Ok(Snapshot {
            series_id: series_id.to_string(),
            teams: parsed.data,
            fetched_at: Utc::now(),
        })
    }
}

#[async_trait]
impl StandingsSource for CricketApiClient {
    async fn fetch(&self, series_id: &str) -> Result<Snapshot, UpstreamError> {
        let url = format!("{}/series_points", self.base_url);
        debug!(series = series_id, "fetching upstream standings");

        let request = self
            .client
            .get(&url)
            .query(&[("apikey", self.api_key.as_str()), ("id", series_id)]);

        let response = match timeout(self.call_timeout, request.send()).await {
            Err(_) => {
                return Err(UpstreamError::Timeout {
                    seconds: self.call_timeout.as_secs(),
                })
            }
            Ok(Err(e)) if e.is_timeout() => {
                return Err(UpstreamError::Timeout {
                    seconds: self.call_timeout.as_secs(),
                })
            }
            Ok(Err(e)) => return Err(UpstreamError::Upstream(e.to_string())),
            Ok(Ok(response)) => response,
        };

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(UpstreamError::RateLimited);
        }
        if !status.is_success() {
            return Err(UpstreamError::Upstream(format!("HTTP {}", status)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| UpstreamError::Upstream(e.to_string()))?;

        let snapshot = Self::parse_body(series_id, &body)?;
        info!(
            series = series_id,
            teams = snapshot.teams.len(),
            "fetched upstream snapshot"
        );
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_PAYLOAD: &str = r#"{
        "data": [
            {"teamname": "India", "shortname": "IND", "img": "https://cdn/ind.png",
             "matches": 5, "wins": 4, "loss": 1, "ties": 0, "nrr": 1.25},
            {"teamname": "Australia", "shortname": "AUS",
             "matches": 5, "wins": 3, "loss": 2}
        ]
    }"#;

    #[test]
    fn test_parse_valid_payload() {
        let snapshot =
            CricketApiClient::parse_body("test-series", VALID_PAYLOAD).expect("parse");
        assert_eq!(snapshot.teams.len(), 2);
        assert_eq!(snapshot.teams[0].short_name, "IND");
        assert_eq!(snapshot.teams[0].nrr, 1.25);

        // Optional fields default when the provider omits them.
        assert_eq!(snapshot.teams[1].ties, 0);
        assert_eq!(snapshot.teams[1].nrr, 0.0);
        assert!(snapshot.teams[1].logo_url.is_none());

        snapshot.validate().expect("valid snapshot");
    }

    #[test]
    fn test_missing_required_field_is_malformed() {
        let body = r#"{"data": [{"teamname": "India", "shortname": "IND", "matches": 5}]}"#;
        let err = CricketApiClient::parse_body("test-series", body).unwrap_err();
        assert!(matches!(err, UpstreamError::Malformed(_)));
    }

    #[test]
    fn test_non_json_body_is_malformed() {
        let err =
            CricketApiClient::parse_body("test-series", "<html>Service Unavailable</html>")
                .unwrap_err();
        assert!(matches!(err, UpstreamError::Malformed(_)));
    }

    #[test]
    fn test_validate_rejects_empty_team_list() {
        let snapshot = CricketApiClient::parse_body("test-series", r#"{"data": []}"#)
            .expect("parse");
        let err = snapshot.validate().unwrap_err();
        assert!(matches!(err, UpstreamError::Malformed(_)));
    }

    #[test]
    fn test_validate_rejects_blank_short_name() {
        let body = r#"{"data": [
            {"teamname": "India", "shortname": "  ", "matches": 5, "wins": 4, "loss": 1}
        ]}"#;
        let snapshot = CricketApiClient::parse_body("test-series", body).expect("parse");
        assert!(matches!(
            snapshot.validate(),
            Err(UpstreamError::Malformed(_))
        ));
    }

    #[test]
    fn test_validate_rejects_inconsistent_counts() {
        let body = r#"{"data": [
            {"teamname": "India", "shortname": "IND", "matches": 3, "wins": 4, "loss": 1}
        ]}"#;
        let snapshot = CricketApiClient::parse_body("test-series", body).expect("parse");
        assert!(matches!(
            snapshot.validate(),
            Err(UpstreamError::Malformed(_))
        ));
    }
}

use crate::fallback::{FallbackChain, Resolved};
use crate::models::SourceTier;
use crate::reconciler::{Reconciler, RunResult};
use crate::store::StandingsStore;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct ApiState {
    pub chain: Arc<FallbackChain>,
    pub reconciler: Arc<Reconciler>,
    pub store: Arc<StandingsStore>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/standings/:series_id", get(get_standings))
        .route("/api/standings/:series_id/refresh", post(post_refresh))
        .route("/api/standings/:series_id/runs", get(get_runs))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamRow {
    pub team: String,
    pub team_name: String,
    pub matches: u32,
    pub won: u32,
    pub lost: u32,
    pub draw: u32,
    pub points: u32,
    pub nrr: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StandingsResponse {
    pub series: String,
    pub source_tier: SourceTier,
    pub teams: Vec<TeamRow>,
    pub timestamp: String,
}

impl StandingsResponse {
    fn from_resolved(series_id: &str, resolved: Resolved) -> Self {
        let teams = resolved
            .records
            .into_iter()
            .map(|r| TeamRow {
                team: r.team_id,
                team_name: r.team_name,
                matches: r.matches,
                won: r.won,
                lost: r.lost,
                draw: r.draw,
                points: r.points,
                nrr: r.nrr,
            })
            .collect();

        Self {
            series: series_id.to_string(),
            source_tier: resolved.tier,
            teams,
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// Read path: always succeeds, annotated with the tier that produced it.
async fn get_standings(
    State(state): State<ApiState>,
    Path(series_id): Path<String>,
) -> Json<StandingsResponse> {
    let resolved = state.chain.resolve(&series_id);
    Json(StandingsResponse::from_resolved(&series_id, resolved))
}

/// Administrative force-refresh: triggers the reconciler immediately and
/// surfaces the run outcome so an operator can react.
async fn post_refresh(
    State(state): State<ApiState>,
    Path(series_id): Path<String>,
) -> (StatusCode, Json<Value>) {
    let outcome = state.reconciler.reconcile(&series_id).await;

    match outcome.result {
        RunResult::Success { teams } => (
            StatusCode::OK,
            Json(json!({
                "refreshed": true,
                "teams": teams,
                "coalesced": outcome.coalesced,
            })),
        ),
        RunResult::Failed { error } => (
            StatusCode::BAD_GATEWAY,
            Json(json!({
                "refreshed": false,
                "error": error,
                "coalesced": outcome.coalesced,
            })),
        ),
    }
}

/// Recent reconciliation audit rows for a series, newest first.
async fn get_runs(
    State(state): State<ApiState>,
    Path(series_id): Path<String>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    match state.store.recent_runs(&series_id, 25) {
        Ok(runs) => Ok(Json(json!({
            "series": series_id,
            "runs": runs,
        }))),
        Err(e) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        )),
    }
}

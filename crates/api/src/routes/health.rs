use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;
use tours_db::observe::observed;
use tours_db::repositories::TourRepo;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    /// `ok` when the tours table answers, `degraded` otherwise.
    pub status: &'static str,
    pub version: &'static str,
    pub db_healthy: bool,
    /// Tours currently listed to clients; absent when the store is down.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visible_tours: Option<i64>,
}

/// GET /health
///
/// Counts visible tours rather than pinging the pool, so a missing table or
/// a failed migration also reports as degraded.
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let visible_tours = observed(
        &*state.query_observer,
        "tours.count_visible",
        TourRepo::count_visible(&state.pool),
    )
    .await
    .ok();
    let db_healthy = visible_tours.is_some();

    Json(HealthResponse {
        status: if db_healthy { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        db_healthy,
        visible_tours,
    })
}

/// Service health, mounted at the root rather than under `/api/v1`.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

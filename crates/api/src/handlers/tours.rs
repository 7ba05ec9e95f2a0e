//! Handlers for the `/tours` resource.
//!
//! Every store call goes through [`observed`] so the configured
//! [`QueryObserver`](tours_db::observe::QueryObserver) sees its timing.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Serialize;
use serde_json::{Map, Value};
use tours_core::error::CoreError;
use tours_core::features::{override_params, Projection, RawParams, TourQuery};
use tours_core::report::year_bounds;
use tours_core::tour::{validate_tour, TourDraft, ENTITY};
use tours_core::types::DbId;
use tours_db::models::report::{DifficultyStats, MonthlyPlanEntry};
use tours_db::observe::observed;
use tours_db::repositories::TourRepo;

use crate::error::{AppError, AppResult};
use crate::extract::{ApiJson, ApiPath};
use crate::middleware::request_time::RequestTime;
use crate::response::Envelope;
use crate::state::AppState;

/// Preset parameters of the "five best cheap tours" alias.
const TOP_FIVE_CHEAP: [(&str, &str); 3] = [
    ("limit", "5"),
    ("sort", "-ratingsAverage,price"),
    ("fields", "name,price,ratingsAverage,summary,difficulty"),
];

type Document = Map<String, Value>;

#[derive(Debug, Serialize)]
pub struct ToursData {
    pub tours: Vec<Document>,
}

#[derive(Debug, Serialize)]
pub struct TourData {
    pub tour: Document,
}

#[derive(Debug, Serialize)]
pub struct StatsData {
    pub stats: Vec<DifficultyStats>,
}

#[derive(Debug, Serialize)]
pub struct PlanData {
    pub plan: Vec<MonthlyPlanEntry>,
}

fn not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound { entity: ENTITY, id })
}

/// GET /tours
///
/// Query parameters other than `page`, `sort`, `limit` and `fields` are
/// filters, e.g. `price[lt]=1500&difficulty=easy`.
pub async fn list(
    State(state): State<AppState>,
    Extension(requested_at): Extension<RequestTime>,
    Query(params): Query<Vec<(String, String)>>,
) -> AppResult<Json<Envelope<ToursData>>> {
    list_tours(&state, requested_at, &params).await
}

/// GET /tours/top-5-cheap
pub async fn top_five_cheap(
    State(state): State<AppState>,
    Extension(requested_at): Extension<RequestTime>,
    Query(params): Query<Vec<(String, String)>>,
) -> AppResult<Json<Envelope<ToursData>>> {
    let params = override_params(params, &TOP_FIVE_CHEAP);
    list_tours(&state, requested_at, &params).await
}

async fn list_tours(
    state: &AppState,
    requested_at: RequestTime,
    params: &RawParams,
) -> AppResult<Json<Envelope<ToursData>>> {
    let query = TourQuery::from_params(params)?;

    let tours = observed(
        &*state.query_observer,
        "tours.find",
        TourRepo::find(&state.pool, &query),
    )
    .await?;

    let docs: Vec<Document> = tours
        .iter()
        .map(|tour| tour.to_document(query.projection()))
        .collect();

    tracing::debug!(
        requested_at = %requested_at.0,
        results = docs.len(),
        "Listed tours"
    );

    Ok(Json(Envelope::with_results(
        docs.len(),
        ToursData { tours: docs },
    )))
}

/// GET /tours/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<DbId>,
) -> AppResult<Json<Envelope<TourData>>> {
    let tour = observed(
        &*state.query_observer,
        "tours.find_by_id",
        TourRepo::find_by_id(&state.pool, id),
    )
    .await?
    .ok_or_else(|| not_found(id))?;

    Ok(Json(Envelope::success(TourData {
        tour: tour.to_document(&Projection::Default),
    })))
}

/// POST /tours
pub async fn create(
    State(state): State<AppState>,
    ApiJson(draft): ApiJson<TourDraft>,
) -> AppResult<(StatusCode, Json<Envelope<TourData>>)> {
    let valid = validate_tour(draft)?;

    let tour = observed(
        &*state.query_observer,
        "tours.create",
        TourRepo::create(&state.pool, &valid),
    )
    .await?;

    tracing::info!(tour_id = tour.id, slug = %tour.slug, "Tour created");

    Ok((
        StatusCode::CREATED,
        Json(Envelope::success(TourData {
            tour: tour.to_document(&Projection::Default),
        })),
    ))
}

/// PATCH /tours/{id}
///
/// The patch is merged onto the stored document and the result is validated
/// as a whole; nothing is written when validation fails.
pub async fn update(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<DbId>,
    ApiJson(patch): ApiJson<TourDraft>,
) -> AppResult<Json<Envelope<TourData>>> {
    let tour = observed(
        &*state.query_observer,
        "tours.update",
        TourRepo::update_with(&state.pool, id, |current| {
            validate_tour(current.to_draft().merged_with(patch)).map_err(AppError::from)
        }),
    )
    .await?
    .ok_or_else(|| not_found(id))?;

    tracing::info!(tour_id = tour.id, slug = %tour.slug, version = tour.version, "Tour updated");

    Ok(Json(Envelope::success(TourData {
        tour: tour.to_document(&Projection::Default),
    })))
}

/// DELETE /tours/{id}
pub async fn delete(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<DbId>,
) -> AppResult<StatusCode> {
    let deleted = observed(
        &*state.query_observer,
        "tours.delete",
        TourRepo::delete(&state.pool, id),
    )
    .await?;

    if !deleted {
        return Err(not_found(id));
    }

    tracing::info!(tour_id = id, "Tour deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /tours/tour-stats
pub async fn stats(State(state): State<AppState>) -> AppResult<Json<Envelope<StatsData>>> {
    let stats = observed(
        &*state.query_observer,
        "tours.stats",
        TourRepo::stats(&state.pool),
    )
    .await?;

    Ok(Json(Envelope::success(StatsData { stats })))
}

/// GET /tours/monthly-plan/{year}
pub async fn monthly_plan(
    State(state): State<AppState>,
    ApiPath(year): ApiPath<i32>,
) -> AppResult<Json<Envelope<PlanData>>> {
    let (start, end) = year_bounds(year)?;

    let plan = observed(
        &*state.query_observer,
        "tours.monthly_plan",
        TourRepo::monthly_plan(&state.pool, start, end),
    )
    .await?;

    Ok(Json(Envelope::success(PlanData { plan })))
}

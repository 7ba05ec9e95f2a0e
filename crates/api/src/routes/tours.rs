use axum::routing::get;
use axum::Router;

use crate::handlers::tours;
use crate::state::AppState;

/// Routes mounted at `/tours`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(tours::list).post(tours::create))
        .route("/top-5-cheap", get(tours::top_five_cheap))
        .route("/tour-stats", get(tours::stats))
        .route("/monthly-plan/{year}", get(tours::monthly_plan))
        .route(
            "/{id}",
            get(tours::get_by_id)
                .patch(tours::update)
                .delete(tours::delete),
        )
}

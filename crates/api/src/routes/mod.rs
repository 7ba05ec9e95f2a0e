pub mod health;
pub mod tours;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /tours                          list, create
/// /tours/top-5-cheap              list alias (five best-rated cheap tours)
/// /tours/tour-stats               per-difficulty statistics
/// /tours/monthly-plan/{year}      tour starts per month of a year
/// /tours/{id}                     get, update, delete
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/tours", tours::router())
}

use axum::extract::OriginalUri;

use crate::error::AppError;

/// Fallback for any path no route matched.
pub async fn route_not_found(OriginalUri(uri): OriginalUri) -> AppError {
    AppError::RouteNotFound(uri.path().to_string())
}

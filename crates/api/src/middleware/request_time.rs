//! Stamps every request with the instant it was received.

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use chrono::Utc;
use tours_core::types::Timestamp;

/// Receive time of the current request, available as `Extension<RequestTime>`.
#[derive(Debug, Clone, Copy)]
pub struct RequestTime(pub Timestamp);

/// Middleware inserting [`RequestTime`] into the request extensions.
pub async fn stamp_request_time(mut request: Request, next: Next) -> Response {
    request.extensions_mut().insert(RequestTime(Utc::now()));
    next.run(request).await
}

use std::sync::Arc;

use tours_db::observe::QueryObserver;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: tours_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Receives timing reports for every store call made by a handler.
    pub query_observer: Arc<dyn QueryObserver>,
}

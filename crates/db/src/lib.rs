//! Persistence layer for tours: pool setup, migrations, row models and the
//! [`repositories::TourRepo`] store entry points.
//!
//! Two concerns wrap every store access:
//! - [`visibility`] keeps secret tours out of reads and aggregations.
//! - [`observe`] times each call and reports it to a [`observe::QueryObserver`].

use sqlx::postgres::PgPoolOptions;

pub mod models;
pub mod observe;
pub mod repositories;
pub mod visibility;

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

/// Round-trip a trivial query to verify the database is reachable.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply the embedded migrations in `crates/db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

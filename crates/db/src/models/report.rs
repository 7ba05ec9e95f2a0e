//! Result rows of the tour aggregation reports.

use serde::Serialize;
use sqlx::FromRow;

/// Per-difficulty statistics over highly rated tours.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DifficultyStats {
    pub difficulty: String,
    /// Number of tours in the group.
    pub count: i64,
    pub num_ratings: i64,
    pub avg_rating: f64,
    pub avg_price: f64,
    pub min_price: f64,
    pub max_price: f64,
}

/// Tour starts within one month of the requested year.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyPlanEntry {
    /// Calendar month, 1-12.
    pub month: i32,
    pub num_tour_starts: i64,
    /// Names of the tours starting that month, one entry per start date.
    pub tours: Vec<String>,
}

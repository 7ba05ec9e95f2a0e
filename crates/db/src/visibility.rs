//! Secret-tour exclusion.
//!
//! Tours with `secret_tour = TRUE` are invisible to every read path: list
//! queries, lookups by id (including the lookups behind update and delete)
//! and aggregations. Repositories build their SQL through these helpers
//! rather than writing the predicate themselves.

/// Predicate matching tours that may be shown to clients.
pub const VISIBLE_PREDICATE: &str = "secret_tour IS NOT TRUE";

/// Build a `WHERE` clause that always starts with [`VISIBLE_PREDICATE`],
/// followed by `conditions` joined with `AND`.
pub fn visible_where(conditions: &[String]) -> String {
    let mut clause = format!("WHERE {VISIBLE_PREDICATE}");
    for condition in conditions {
        clause.push_str(" AND ");
        clause.push_str(condition);
    }
    clause
}

/// Prefix an aggregation with a `visible_tours` CTE so that its first stage
/// drops secret tours. `body` must read from `visible_tours`, not `tours`.
pub fn with_visible_tours(body: &str) -> String {
    format!("WITH visible_tours AS (SELECT * FROM tours WHERE {VISIBLE_PREDICATE}) {body}")
}

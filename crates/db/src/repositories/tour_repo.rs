//! Repository for the `tours` table.
//!
//! Every read goes through [`visible_where`] or [`with_visible_tours`], so
//! secret tours can never be returned, updated or deleted through this repo.

use sqlx::PgPool;
use tours_core::features::{Condition, FilterValue, TourQuery};
use tours_core::report::{MONTHLY_PLAN_MAX_GROUPS, STATS_MIN_RATING};
use tours_core::tour::ValidTour;
use tours_core::types::{DbId, Timestamp};

use crate::models::report::{DifficultyStats, MonthlyPlanEntry};
use crate::models::tour::Tour;
use crate::visibility::{visible_where, with_visible_tours};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "\
    id, name, slug, duration, max_group_size, difficulty, ratings_average, \
    ratings_quantity, price, price_discount, summary, description, image_cover, \
    images, created_at, start_dates, secret_tour, version";

/// Provides CRUD and aggregation operations for tours.
pub struct TourRepo;

impl TourRepo {
    /// Run a list query built by the feature pipeline.
    pub async fn find(pool: &PgPool, query: &TourQuery) -> Result<Vec<Tour>, sqlx::Error> {
        let (where_clause, bind_values, bind_idx) = build_tour_filter(query.conditions());
        let window = query.window();

        let sql = format!(
            "SELECT {COLUMNS} FROM tours {where_clause} \
             ORDER BY {} \
             LIMIT ${bind_idx} OFFSET ${}",
            build_order_by(query),
            bind_idx + 1
        );

        let q = bind_tour_values(sqlx::query_as::<_, Tour>(&sql), &bind_values);
        q.bind(window.limit)
            .bind(window.offset())
            .fetch_all(pool)
            .await
    }

    /// Find a visible tour by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Tour>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM tours {}",
            visible_where(&["id = $1".to_string()])
        );
        sqlx::query_as::<_, Tour>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Number of tours clients can see.
    pub async fn count_visible(pool: &PgPool) -> Result<i64, sqlx::Error> {
        let query = format!("SELECT COUNT(*) FROM tours {}", visible_where(&[]));
        sqlx::query_scalar::<_, i64>(&query).fetch_one(pool).await
    }

    /// Insert a validated tour, returning the created row.
    pub async fn create(pool: &PgPool, tour: &ValidTour) -> Result<Tour, sqlx::Error> {
        let query = format!(
            "INSERT INTO tours (name, slug, duration, max_group_size, difficulty, \
                 ratings_average, ratings_quantity, price, price_discount, summary, \
                 description, image_cover, images, start_dates, secret_tour)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Tour>(&query)
            .bind(&tour.name)
            .bind(&tour.slug)
            .bind(tour.duration)
            .bind(tour.max_group_size)
            .bind(tour.difficulty.as_str())
            .bind(tour.ratings_average)
            .bind(tour.ratings_quantity)
            .bind(tour.price)
            .bind(tour.price_discount)
            .bind(&tour.summary)
            .bind(&tour.description)
            .bind(&tour.image_cover)
            .bind(&tour.images)
            .bind(&tour.start_dates)
            .bind(tour.secret_tour)
            .fetch_one(pool)
            .await
    }

    /// Update a visible tour in a single transaction.
    ///
    /// Locks the current row, hands it to `prepare` (which merges the
    /// caller's patch and validates the result), then writes the prepared
    /// document and bumps `version`. Returns `Ok(None)` without writing if
    /// no visible row has this ID; an error from `prepare` rolls back.
    pub async fn update_with<F, E>(pool: &PgPool, id: DbId, prepare: F) -> Result<Option<Tour>, E>
    where
        F: FnOnce(&Tour) -> Result<ValidTour, E>,
        E: From<sqlx::Error>,
    {
        let mut tx = pool.begin().await?;

        let select = format!(
            "SELECT {COLUMNS} FROM tours {} FOR UPDATE",
            visible_where(&["id = $1".to_string()])
        );
        let Some(current) = sqlx::query_as::<_, Tour>(&select)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(None);
        };

        let next = prepare(&current)?;

        let update = format!(
            "UPDATE tours SET
                name = $2,
                slug = $3,
                duration = $4,
                max_group_size = $5,
                difficulty = $6,
                ratings_average = $7,
                ratings_quantity = $8,
                price = $9,
                price_discount = $10,
                summary = $11,
                description = $12,
                image_cover = $13,
                images = $14,
                start_dates = $15,
                secret_tour = $16,
                version = version + 1
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        let updated = sqlx::query_as::<_, Tour>(&update)
            .bind(id)
            .bind(&next.name)
            .bind(&next.slug)
            .bind(next.duration)
            .bind(next.max_group_size)
            .bind(next.difficulty.as_str())
            .bind(next.ratings_average)
            .bind(next.ratings_quantity)
            .bind(next.price)
            .bind(next.price_discount)
            .bind(&next.summary)
            .bind(&next.description)
            .bind(&next.image_cover)
            .bind(&next.images)
            .bind(&next.start_dates)
            .bind(next.secret_tour)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(updated))
    }

    /// Permanently delete a visible tour. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let query = format!(
            "DELETE FROM tours {}",
            visible_where(&["id = $1".to_string()])
        );
        let result = sqlx::query(&query).bind(id).execute(pool).await?;
        Ok(result.rows_affected() > 0)
    }

    /// Statistics per difficulty over tours rated at least
    /// [`STATS_MIN_RATING`], cheapest average price first.
    pub async fn stats(pool: &PgPool) -> Result<Vec<DifficultyStats>, sqlx::Error> {
        let query = with_visible_tours(
            "SELECT difficulty,
                    COUNT(*)::BIGINT AS count,
                    COALESCE(SUM(ratings_quantity), 0)::BIGINT AS num_ratings,
                    AVG(ratings_average)::DOUBLE PRECISION AS avg_rating,
                    AVG(price)::DOUBLE PRECISION AS avg_price,
                    MIN(price) AS min_price,
                    MAX(price) AS max_price
             FROM visible_tours
             WHERE ratings_average >= $1
             GROUP BY difficulty
             ORDER BY avg_price ASC, difficulty ASC",
        );
        sqlx::query_as::<_, DifficultyStats>(&query)
            .bind(STATS_MIN_RATING)
            .fetch_all(pool)
            .await
    }

    /// Tour starts per month within `[start, end)`, busiest month first, at
    /// most [`MONTHLY_PLAN_MAX_GROUPS`] groups.
    ///
    /// Each start date counts separately; months are UTC months. Callers
    /// get the bounds of a calendar year from
    /// [`tours_core::report::year_bounds`].
    pub async fn monthly_plan(
        pool: &PgPool,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Vec<MonthlyPlanEntry>, sqlx::Error> {
        let query = with_visible_tours(
            "SELECT EXTRACT(MONTH FROM start_date AT TIME ZONE 'UTC')::INTEGER AS month,
                    COUNT(*)::BIGINT AS num_tour_starts,
                    ARRAY_AGG(t.name ORDER BY t.name) AS tours
             FROM visible_tours t
             CROSS JOIN LATERAL UNNEST(t.start_dates) AS start_date
             WHERE start_date >= $1 AND start_date < $2
             GROUP BY 1
             ORDER BY num_tour_starts DESC, month ASC
             LIMIT $3",
        );
        sqlx::query_as::<_, MonthlyPlanEntry>(&query)
            .bind(start)
            .bind(end)
            .bind(MONTHLY_PLAN_MAX_GROUPS)
            .fetch_all(pool)
            .await
    }
}

// ---------------------------------------------------------------------------
// Query translation
// ---------------------------------------------------------------------------

/// A value bound to a positional parameter.
#[derive(Debug, Clone, PartialEq)]
enum BindValue {
    BigInt(i64),
    Float(f64),
    Text(String),
    Boolean(bool),
    Timestamp(Timestamp),
}

impl From<&FilterValue> for BindValue {
    fn from(value: &FilterValue) -> Self {
        match value {
            FilterValue::BigInt(v) => BindValue::BigInt(*v),
            FilterValue::Number(v) => BindValue::Float(*v),
            FilterValue::Text(v) => BindValue::Text(v.clone()),
            FilterValue::Boolean(v) => BindValue::Boolean(*v),
            FilterValue::Timestamp(v) => BindValue::Timestamp(*v),
        }
    }
}

/// Build the visible `WHERE` clause for `conditions`.
///
/// Returns the clause, the values to bind in order, and the next free
/// parameter index.
fn build_tour_filter(conditions: &[Condition]) -> (String, Vec<BindValue>, u32) {
    let mut clauses: Vec<String> = Vec::with_capacity(conditions.len());
    let mut bind_values: Vec<BindValue> = Vec::with_capacity(conditions.len());
    let mut bind_idx = 1u32;

    for condition in conditions {
        clauses.push(condition_sql(condition, bind_idx));
        bind_values.push(BindValue::from(&condition.value));
        bind_idx += 1;
    }

    (visible_where(&clauses), bind_values, bind_idx)
}

/// SQL for one condition using parameter `$idx`.
///
/// List columns match when any element satisfies the comparison.
fn condition_sql(condition: &Condition, idx: u32) -> String {
    let column = condition.field.column();
    let op = condition.comparison.sql_operator();
    if condition.field.kind().is_list() {
        format!("EXISTS (SELECT 1 FROM UNNEST({column}) AS elem WHERE elem {op} ${idx})")
    } else if matches!(condition.value, FilterValue::Number(_)) {
        format!("{column} {op} ${idx}::DOUBLE PRECISION")
    } else {
        format!("{column} {op} ${idx}")
    }
}

fn build_order_by(query: &TourQuery) -> String {
    query
        .sort_keys()
        .iter()
        .map(|key| format!("{} {}", key.field.column(), key.direction.sql()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Bind a slice of `BindValue` to a sqlx `QueryAs`.
fn bind_tour_values<'q, O>(
    mut q: sqlx::query::QueryAs<'q, sqlx::Postgres, O, sqlx::postgres::PgArguments>,
    bind_values: &'q [BindValue],
) -> sqlx::query::QueryAs<'q, sqlx::Postgres, O, sqlx::postgres::PgArguments> {
    for val in bind_values {
        match val {
            BindValue::BigInt(v) => q = q.bind(*v),
            BindValue::Float(v) => q = q.bind(*v),
            BindValue::Text(v) => q = q.bind(v.as_str()),
            BindValue::Boolean(v) => q = q.bind(*v),
            BindValue::Timestamp(v) => q = q.bind(*v),
        }
    }
    q
}

//! Query feature pipeline for list endpoints.
//!
//! Turns the raw query-string pairs of a request into an immutable
//! [`TourQuery`] by applying four steps in a fixed order:
//!
//! ```text
//! filter -> sort -> limit_fields -> paginate
//! ```
//!
//! Each step consumes the query and returns a new one. No step performs
//! I/O; the finished query is translated to SQL in one place by the store
//! layer and executed exactly once.

use chrono::{DateTime, NaiveDate, Utc};

use crate::error::CoreError;
use crate::tour::{Difficulty, FieldKind, TourField};
use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Control keys that are never interpreted as field filters.
pub const RESERVED_PARAMS: [&str; 4] = ["page", "sort", "limit", "fields"];

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_LIMIT: i64 = 100;

/// Upper bound applied to client-supplied `limit` values.
pub const MAX_LIMIT: i64 = 1000;

/// Raw query-string pairs in request order.
pub type RawParams = [(String, String)];

// ---------------------------------------------------------------------------
// Query parts
// ---------------------------------------------------------------------------

/// Comparison applied by a filter condition.
///
/// Clients spell comparisons as `field[gte]=value`; the store receives the
/// native operator from [`Comparison::sql_operator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    Gte,
    Gt,
    Lte,
    Lt,
}

impl Comparison {
    /// Parse a bracketed operator token (`gte`, `gt`, `lte`, `lt`).
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "gte" => Some(Comparison::Gte),
            "gt" => Some(Comparison::Gt),
            "lte" => Some(Comparison::Lte),
            "lt" => Some(Comparison::Lt),
            _ => None,
        }
    }

    pub fn sql_operator(self) -> &'static str {
        match self {
            Comparison::Eq => "=",
            Comparison::Gte => ">=",
            Comparison::Gt => ">",
            Comparison::Lte => "<=",
            Comparison::Lt => "<",
        }
    }
}

/// A typed filter operand, parsed according to the field's [`FieldKind`].
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    BigInt(i64),
    Number(f64),
    Text(String),
    Boolean(bool),
    Timestamp(Timestamp),
}

/// One `field <op> value` predicate. Conditions are ANDed together.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub field: TourField,
    pub comparison: Comparison,
    pub value: FilterValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    pub field: TourField,
    pub direction: SortDirection,
}

impl SortKey {
    pub const fn asc(field: TourField) -> Self {
        Self {
            field,
            direction: SortDirection::Asc,
        }
    }

    pub const fn desc(field: TourField) -> Self {
        Self {
            field,
            direction: SortDirection::Desc,
        }
    }
}

/// Which fields a read returns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Projection {
    /// Everything except `version` and `createdAt`.
    #[default]
    Default,
    /// Exactly these fields, plus `id`.
    Include(Vec<TourField>),
    /// Everything except these fields (and `createdAt`, which is never
    /// returned unless asked for by name).
    Exclude(Vec<TourField>),
}

impl Projection {
    pub fn includes(&self, field: TourField) -> bool {
        match self {
            Projection::Default => !matches!(field, TourField::Version | TourField::CreatedAt),
            Projection::Include(fields) => field == TourField::Id || fields.contains(&field),
            Projection::Exclude(fields) => {
                field != TourField::CreatedAt && !fields.contains(&field)
            }
        }
    }
}

/// Offset/limit window derived from `page` and `limit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page: i64,
    pub limit: i64,
}

impl PageWindow {
    /// Rows skipped before this page: `(page - 1) * limit`.
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

impl Default for PageWindow {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

// ---------------------------------------------------------------------------
// TourQuery
// ---------------------------------------------------------------------------

/// Fully specified list query: conditions, ordering, projection and window.
#[derive(Debug, Clone, PartialEq)]
pub struct TourQuery {
    conditions: Vec<Condition>,
    sort: Vec<SortKey>,
    projection: Projection,
    window: PageWindow,
}

impl Default for TourQuery {
    /// No conditions, newest first, default projection, first page of 100.
    fn default() -> Self {
        Self {
            conditions: Vec::new(),
            sort: default_sort(),
            projection: Projection::Default,
            window: PageWindow::default(),
        }
    }
}

impl TourQuery {
    /// Run the whole pipeline over `params`.
    pub fn from_params(params: &RawParams) -> Result<Self, CoreError> {
        Ok(Self::default()
            .filter(params)?
            .sort(params)?
            .limit_fields(params)?
            .paginate(params))
    }

    /// Add a condition for every non-reserved parameter.
    ///
    /// `field=value` is an equality test; `field[gte]=value` (and `gt`,
    /// `lte`, `lt`) is a comparison. Unknown fields, unknown operators and
    /// unparseable values are rejected.
    pub fn filter(mut self, params: &RawParams) -> Result<Self, CoreError> {
        for (key, raw) in params {
            if RESERVED_PARAMS.contains(&key.as_str()) {
                continue;
            }
            let (field, comparison) = parse_filter_key(key)?;
            let value = parse_filter_value(field, comparison, raw)?;
            self.conditions.push(Condition {
                field,
                comparison,
                value,
            });
        }
        Ok(self)
    }

    /// Order by the comma-separated `sort` parameter (`-` prefix for
    /// descending), or newest first when absent. `id` ascending is always
    /// the final tie-breaker.
    pub fn sort(mut self, params: &RawParams) -> Result<Self, CoreError> {
        self.sort = match last_value(params, "sort") {
            Some(spec) => parse_sort(spec)?,
            None => default_sort(),
        };
        Ok(self)
    }

    /// Restrict the projection to the comma-separated `fields` parameter.
    ///
    /// Either every entry is a plain name (inclusion) or every entry is
    /// `-name` (exclusion); mixing the two is rejected.
    pub fn limit_fields(mut self, params: &RawParams) -> Result<Self, CoreError> {
        self.projection = match last_value(params, "fields") {
            Some(spec) => parse_projection(spec)?,
            None => Projection::Default,
        };
        Ok(self)
    }

    /// Apply `page` and `limit`. Missing, non-numeric or non-positive values
    /// fall back to the defaults; `limit` is capped at [`MAX_LIMIT`].
    pub fn paginate(mut self, params: &RawParams) -> Self {
        self.window = PageWindow {
            page: positive_param(params, "page").unwrap_or(DEFAULT_PAGE),
            limit: positive_param(params, "limit")
                .unwrap_or(DEFAULT_LIMIT)
                .min(MAX_LIMIT),
        };
        self
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn sort_keys(&self) -> &[SortKey] {
        &self.sort
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    pub fn window(&self) -> PageWindow {
        self.window
    }
}

/// Replace `overrides` keys in `params`, keeping every other pair.
///
/// Used by alias routes that preset sorting, projection or page size.
pub fn override_params(
    params: Vec<(String, String)>,
    overrides: &[(&str, &str)],
) -> Vec<(String, String)> {
    let mut merged: Vec<(String, String)> = params
        .into_iter()
        .filter(|(k, _)| !overrides.iter().any(|(o, _)| o == k))
        .collect();
    merged.extend(
        overrides
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string())),
    );
    merged
}

// ---------------------------------------------------------------------------
// Parsing helpers
// ---------------------------------------------------------------------------

fn default_sort() -> Vec<SortKey> {
    vec![SortKey::desc(TourField::CreatedAt), SortKey::asc(TourField::Id)]
}

/// Value of the last occurrence of `key`, ignoring blank values.
fn last_value<'a>(params: &'a RawParams, key: &str) -> Option<&'a str> {
    params
        .iter()
        .rev()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.trim())
        .filter(|v| !v.is_empty())
}

fn positive_param(params: &RawParams, key: &str) -> Option<i64> {
    last_value(params, key)
        .and_then(|v| v.parse::<i64>().ok())
        .filter(|n| *n > 0)
}

fn lookup_field(name: &str) -> Result<TourField, CoreError> {
    TourField::from_api_name(name)
        .ok_or_else(|| CoreError::Validation(format!("Unknown field '{name}'")))
}

/// Split `price[gte]` into `(Price, Gte)`; a bare name is an equality test.
fn parse_filter_key(key: &str) -> Result<(TourField, Comparison), CoreError> {
    let Some((name, rest)) = key.split_once('[') else {
        return Ok((lookup_field(key)?, Comparison::Eq));
    };
    let token = rest
        .strip_suffix(']')
        .ok_or_else(|| CoreError::Validation(format!("Malformed filter key '{key}'")))?;
    let comparison = Comparison::from_token(token).ok_or_else(|| {
        CoreError::Validation(format!(
            "Unsupported filter operator '{token}' (expected gte, gt, lte or lt)"
        ))
    })?;
    Ok((lookup_field(name)?, comparison))
}

fn parse_filter_value(
    field: TourField,
    comparison: Comparison,
    raw: &str,
) -> Result<FilterValue, CoreError> {
    let invalid = || CoreError::Validation(format!("Invalid value '{raw}' for field '{field}'"));
    let raw = raw.trim();

    match field.kind() {
        FieldKind::Id => raw.parse().map(FilterValue::BigInt).map_err(|_| invalid()),
        FieldKind::Integer | FieldKind::Float => raw
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .map(FilterValue::Number)
            .ok_or_else(invalid),
        FieldKind::Text | FieldKind::TextList => Ok(FilterValue::Text(raw.to_string())),
        FieldKind::Difficulty => raw
            .parse::<Difficulty>()
            .map(|d| FilterValue::Text(d.as_str().to_string())),
        FieldKind::Boolean => {
            if comparison != Comparison::Eq {
                return Err(CoreError::Validation(format!(
                    "Field '{field}' only supports equality filters"
                )));
            }
            raw.parse().map(FilterValue::Boolean).map_err(|_| invalid())
        }
        FieldKind::Timestamp | FieldKind::TimestampList => parse_timestamp(raw)
            .map(FilterValue::Timestamp)
            .ok_or_else(invalid),
    }
}

/// Accept RFC 3339 timestamps or bare `YYYY-MM-DD` dates (midnight UTC).
pub fn parse_timestamp(raw: &str) -> Option<Timestamp> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

fn parse_sort(spec: &str) -> Result<Vec<SortKey>, CoreError> {
    let mut keys: Vec<SortKey> = Vec::new();
    for token in spec.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        let key = match token.strip_prefix('-') {
            Some(name) => SortKey::desc(lookup_field(name)?),
            None => SortKey::asc(lookup_field(token)?),
        };
        if !key.field.is_sortable() {
            return Err(CoreError::Validation(format!(
                "Cannot sort by list field '{}'",
                key.field
            )));
        }
        if !keys.iter().any(|k| k.field == key.field) {
            keys.push(key);
        }
    }

    if keys.is_empty() {
        return Ok(default_sort());
    }
    if !keys.iter().any(|k| k.field == TourField::Id) {
        keys.push(SortKey::asc(TourField::Id));
    }
    Ok(keys)
}

fn parse_projection(spec: &str) -> Result<Projection, CoreError> {
    let mut included = Vec::new();
    let mut excluded = Vec::new();
    for token in spec.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        match token.strip_prefix('-') {
            Some(name) => excluded.push(lookup_field(name)?),
            None => included.push(lookup_field(token)?),
        }
    }
    included.dedup();
    excluded.dedup();

    match (included.is_empty(), excluded.is_empty()) {
        (true, true) => Ok(Projection::Default),
        (false, true) => Ok(Projection::Include(included)),
        (true, false) => Ok(Projection::Exclude(excluded)),
        (false, false) => Err(CoreError::Validation(
            "Cannot mix field inclusion and exclusion in 'fields'".into(),
        )),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

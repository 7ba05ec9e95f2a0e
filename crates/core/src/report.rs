//! Parameters for the aggregation reports (difficulty stats, monthly plan).

use chrono::NaiveDate;

use crate::error::CoreError;
use crate::types::Timestamp;

/// Only tours rated at least this highly are included in difficulty stats.
pub const STATS_MIN_RATING: f64 = 4.5;

/// The monthly plan never returns more groups than there are months.
pub const MONTHLY_PLAN_MAX_GROUPS: i64 = 12;

pub const MIN_PLAN_YEAR: i32 = 1;
pub const MAX_PLAN_YEAR: i32 = 9999;

/// Half-open UTC range `[year-01-01, (year+1)-01-01)` covering a calendar year.
pub fn year_bounds(year: i32) -> Result<(Timestamp, Timestamp), CoreError> {
    if !(MIN_PLAN_YEAR..=MAX_PLAN_YEAR).contains(&year) {
        return Err(CoreError::Validation(format!(
            "Year must be between {MIN_PLAN_YEAR} and {MAX_PLAN_YEAR}, got {year}"
        )));
    }
    let start_of = |y: i32| {
        NaiveDate::from_ymd_opt(y, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc())
            .ok_or_else(|| CoreError::Internal(format!("cannot build January 1st of {y}")))
    };
    Ok((start_of(year)?, start_of(year + 1)?))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::Datelike;

    use super::*;

    #[test]
    fn bounds_cover_the_calendar_year() {
        let (start, end) = year_bounds(2021).unwrap();
        assert_eq!((start.year(), start.month(), start.day()), (2021, 1, 1));
        assert_eq!((end.year(), end.month(), end.day()), (2022, 1, 1));
    }

    #[test]
    fn last_supported_year_is_accepted() {
        let (_, end) = year_bounds(MAX_PLAN_YEAR).unwrap();
        assert_eq!(end.year(), 10000);
    }

    #[test]
    fn out_of_range_years_are_rejected() {
        assert_matches!(year_bounds(0), Err(CoreError::Validation(_)));
        assert_matches!(year_bounds(10000), Err(CoreError::Validation(_)));
    }
}

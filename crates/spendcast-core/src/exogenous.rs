//! Month-start calendar feature.

use chrono::{Datelike, Days, NaiveDate};
use spendcast_abstraction::{ExogenousMatrix, Series};

/// Builds the month-start indicator for `series` extended by `horizon` days.
///
/// Every calendar day from the first observation through the last observation
/// plus `horizon` gets a single-element vector: `[1.0]` on the series start or on
/// the first day of a month, `[0.0]` otherwise. An empty series yields an empty
/// matrix.
#[must_use]
pub fn month_start_features(series: &Series, horizon: u32) -> ExogenousMatrix {
    let (Some(start), Some(last)) = (series.first_date(), series.last_date()) else {
        return ExogenousMatrix::default();
    };
    let end = last.checked_add_days(Days::new(u64::from(horizon))).unwrap_or(NaiveDate::MAX);

    start
        .iter_days()
        .take_while(|day| *day <= end)
        .map(|day| (day, vec![month_start_flag(day, start)]))
        .collect()
}

fn month_start_flag(day: NaiveDate, start: NaiveDate) -> f64 {
    if day == start || day.day() == 1 { 1.0 } else { 0.0 }
}

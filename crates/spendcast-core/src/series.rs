//! Series construction from raw cost records.

use chrono::NaiveDate;
use spendcast_abstraction::{CostRecord, GroupedSeries, GroupingDimension, Series, parse_day};
use std::collections::BTreeMap;

use crate::error::{Result, SpendcastError};

/// Parses one record into its calendar day and amount.
///
/// Time-of-day is discarded. Amounts must be finite and non-negative.
pub fn parse_record(record: &CostRecord) -> Result<(NaiveDate, f64)> {
    let date = parse_day(&record.accrued_at).ok_or_else(|| {
        SpendcastError::MalformedRecord(format!("invalid accrued_at '{}'", record.accrued_at))
    })?;

    let amount: f64 = record.amount.trim().parse().map_err(|_| {
        SpendcastError::MalformedRecord(format!("invalid amount '{}' on {date}", record.amount))
    })?;
    if !amount.is_finite() || amount < 0.0 {
        return Err(SpendcastError::MalformedRecord(format!(
            "amount {amount} on {date} is not a finite non-negative number"
        )));
    }

    Ok((date, amount))
}

/// Builds a single series from every record.
///
/// Records sharing a date resolve to the last one in input order.
pub fn build_series(records: &[CostRecord]) -> Result<Series> {
    records.iter().map(parse_record).collect()
}

/// Builds one series per group key under `dimension`.
///
/// Every record must carry the grouping field; records sharing a date within a
/// group resolve to the last one in input order.
pub fn build_grouped(records: &[CostRecord], dimension: GroupingDimension) -> Result<GroupedSeries> {
    let mut points: BTreeMap<String, Vec<(NaiveDate, f64)>> = BTreeMap::new();

    for record in records {
        let key = dimension.key_of(record).ok_or_else(|| {
            SpendcastError::MalformedRecord(format!(
                "record accrued at '{}' has no {dimension} field",
                record.accrued_at
            ))
        })?;
        points.entry(key.to_string()).or_default().push(parse_record(record)?);
    }

    let groups = points
        .into_iter()
        .map(|(key, entries)| (key, entries.into_iter().collect()))
        .collect();
    Ok(GroupedSeries::new(dimension, groups))
}

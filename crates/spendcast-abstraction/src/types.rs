//! Data model shared across Spendcast crates.

use chrono::NaiveDate;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::CollaboratorError;
use crate::grouping::GroupingDimension;

/// Default confidence level requested from the forecaster.
pub const DEFAULT_LEVEL: u8 = 90;

/// Parses a calendar day, discarding any time-of-day suffix.
///
/// Accepts `2023-05-01`, `2023-05-01T00:00:00Z` and `2023-05-01 00:00:00`.
#[must_use]
pub fn parse_day(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    let day = trimmed.get(..10).unwrap_or(trimmed);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

/// Formats a calendar day the way the collaborators expect it (`YYYY-MM-DD`).
#[must_use]
pub fn format_day(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// An ordered, date-unique mapping from calendar day to amount.
///
/// Built once via `FromIterator`; a later entry for the same date replaces the earlier one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Series {
    points: BTreeMap<NaiveDate, f64>,
}

impl Series {
    /// Number of observations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the series has no observations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Amount observed on `date`.
    #[must_use]
    pub fn get(&self, date: NaiveDate) -> Option<f64> {
        self.points.get(&date).copied()
    }

    /// Observations in chronological order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (NaiveDate, f64)> + ExactSizeIterator + '_ {
        self.points.iter().map(|(date, amount)| (*date, *amount))
    }

    /// Dates in chronological order.
    pub fn dates(&self) -> impl DoubleEndedIterator<Item = NaiveDate> + '_ {
        self.points.keys().copied()
    }

    /// Amounts in chronological order.
    pub fn values(&self) -> impl DoubleEndedIterator<Item = f64> + '_ {
        self.points.values().copied()
    }

    /// Earliest observed date.
    #[must_use]
    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.keys().next().copied()
    }

    /// Latest observed date.
    #[must_use]
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.keys().next_back().copied()
    }

    /// Largest observed amount.
    #[must_use]
    pub fn max_value(&self) -> Option<f64> {
        self.values().reduce(f64::max)
    }

    /// The last `n` observations in chronological order (fewer if the series is shorter).
    #[must_use]
    pub fn tail(&self, n: usize) -> Vec<(NaiveDate, f64)> {
        let skip = self.len().saturating_sub(n);
        self.iter().skip(skip).collect()
    }
}

impl FromIterator<(NaiveDate, f64)> for Series {
    fn from_iter<I: IntoIterator<Item = (NaiveDate, f64)>>(iter: I) -> Self {
        Self { points: iter.into_iter().collect() }
    }
}

/// Series keyed by group (account id, service name or provider name).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupedSeries {
    /// The dimension the groups were formed on.
    pub dimension: Option<GroupingDimension>,
    groups: BTreeMap<String, Series>,
}

impl GroupedSeries {
    /// Creates a grouped series from per-group series.
    #[must_use]
    pub fn new(dimension: GroupingDimension, groups: BTreeMap<String, Series>) -> Self {
        Self { dimension: Some(dimension), groups }
    }

    /// Number of groups.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Whether there are no groups.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// The series for one group key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Series> {
        self.groups.get(key)
    }

    /// Whether `key` names a group.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.groups.contains_key(key)
    }

    /// Group keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.groups.keys().map(String::as_str)
    }

    /// Groups in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Series)> + '_ {
        self.groups.iter().map(|(key, series)| (key.as_str(), series))
    }
}

/// Per-date exogenous feature vectors sent alongside a series.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExogenousMatrix {
    rows: BTreeMap<NaiveDate, Vec<f64>>,
}

impl ExogenousMatrix {
    /// Number of dated rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the matrix has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The feature vector for `date`.
    #[must_use]
    pub fn get(&self, date: NaiveDate) -> Option<&[f64]> {
        self.rows.get(&date).map(Vec::as_slice)
    }

    /// Rows in chronological order.
    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, &[f64])> + '_ {
        self.rows.iter().map(|(date, row)| (*date, row.as_slice()))
    }

    /// Earliest row date.
    #[must_use]
    pub fn first_date(&self) -> Option<NaiveDate> {
        self.rows.keys().next().copied()
    }

    /// Latest row date.
    #[must_use]
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.rows.keys().next_back().copied()
    }
}

impl FromIterator<(NaiveDate, Vec<f64>)> for ExogenousMatrix {
    fn from_iter<I: IntoIterator<Item = (NaiveDate, Vec<f64>)>>(iter: I) -> Self {
        Self { rows: iter.into_iter().collect() }
    }
}

/// Which forecaster endpoint a request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForecastMode {
    /// `horizon` future points beyond the last historical date.
    Forward,
    /// Estimates aligned with the historical range, used as an anomaly baseline.
    InSample,
}

impl ForecastMode {
    /// Short name used in logs and cache keys.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Forward => "forward",
            Self::InSample => "insample",
        }
    }
}

/// A request for the forecasting collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastRequest {
    /// The historical series.
    pub series: Series,
    /// Number of future days to forecast.
    pub horizon: u32,
    /// Confidence levels in percent (e.g., `[90]`).
    pub levels: Vec<u8>,
    /// Optional exogenous features; empty means none are sent.
    pub exogenous: ExogenousMatrix,
    /// Number of fine-tuning steps the forecaster should run.
    pub finetune_steps: u32,
}

impl ForecastRequest {
    /// Creates a request at the default 90% level with no exogenous features.
    #[must_use]
    pub fn new(series: Series, horizon: u32) -> Self {
        Self {
            series,
            horizon,
            levels: vec![DEFAULT_LEVEL],
            exogenous: ExogenousMatrix::default(),
            finetune_steps: 0,
        }
    }

    /// Sets the confidence levels.
    #[must_use]
    pub fn with_levels(mut self, levels: Vec<u8>) -> Self {
        self.levels = levels;
        self
    }

    /// Attaches exogenous features.
    #[must_use]
    pub fn with_exogenous(mut self, exogenous: ExogenousMatrix) -> Self {
        self.exogenous = exogenous;
        self
    }

    /// Sets the number of fine-tuning steps.
    #[must_use]
    pub fn with_finetune_steps(mut self, finetune_steps: u32) -> Self {
        self.finetune_steps = finetune_steps;
        self
    }

    /// The level whose bounds are read back from the response.
    #[must_use]
    pub fn primary_level(&self) -> u8 {
        self.levels.first().copied().unwrap_or(DEFAULT_LEVEL)
    }
}

/// Point forecasts with optional confidence bounds, index-aligned by date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    timestamps: Vec<NaiveDate>,
    point: Vec<f64>,
    lower: Option<Vec<f64>>,
    upper: Option<Vec<f64>>,
}

impl ForecastResult {
    /// Creates a result, checking that every present sequence has the same length.
    ///
    /// # Errors
    /// Returns `CollaboratorError::MalformedResponse` on a length mismatch.
    pub fn new(
        timestamps: Vec<NaiveDate>,
        point: Vec<f64>,
        lower: Option<Vec<f64>>,
        upper: Option<Vec<f64>>,
    ) -> Result<Self, CollaboratorError> {
        let expected = timestamps.len();
        let check = |name: &str, len: usize| {
            if len == expected {
                Ok(())
            } else {
                Err(CollaboratorError::MalformedResponse(format!(
                    "{name} has {len} entries but timestamp has {expected}"
                )))
            }
        };

        check("value", point.len())?;
        if let Some(lower) = &lower {
            check("lower bound", lower.len())?;
        }
        if let Some(upper) = &upper {
            check("upper bound", upper.len())?;
        }

        Ok(Self { timestamps, point, lower, upper })
    }

    /// Number of forecast steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// Whether the result has no steps.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Forecast dates.
    #[must_use]
    pub fn timestamps(&self) -> &[NaiveDate] {
        &self.timestamps
    }

    /// Point forecasts.
    #[must_use]
    pub fn point(&self) -> &[f64] {
        &self.point
    }

    /// Lower bound, if the forecaster returned one.
    #[must_use]
    pub fn lower(&self) -> Option<&[f64]> {
        self.lower.as_deref()
    }

    /// Upper bound, if the forecaster returned one.
    #[must_use]
    pub fn upper(&self) -> Option<&[f64]> {
        self.upper.as_deref()
    }

    /// Lower bound, or zeros of matching length when absent.
    #[must_use]
    pub fn lower_or_zeros(&self) -> Vec<f64> {
        self.lower.clone().unwrap_or_else(|| vec![0.0; self.point.len()])
    }

    /// Upper bound, or zeros of matching length when absent.
    #[must_use]
    pub fn upper_or_zeros(&self) -> Vec<f64> {
        self.upper.clone().unwrap_or_else(|| vec![0.0; self.point.len()])
    }

    /// Whether both bounds are present.
    #[must_use]
    pub fn has_bounds(&self) -> bool {
        self.lower.is_some() && self.upper.is_some()
    }
}

/// A cost report as listed by the billing API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    /// Report identifier used in cost URLs.
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    /// Human-readable title.
    #[serde(default)]
    pub title: String,
    /// Owning workspace, when reported.
    #[serde(default, deserialize_with = "optional_string")]
    pub workspace: Option<String>,
}

/// One raw cost record from the billing API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostRecord {
    /// Accrual date, optionally with a time-of-day suffix.
    pub accrued_at: String,
    /// Amount as a numeric string.
    #[serde(deserialize_with = "string_or_number")]
    pub amount: String,
    /// Account identifier (present when grouped by account).
    #[serde(default, deserialize_with = "optional_string")]
    pub account_id: Option<String>,
    /// Service name (present when grouped by service).
    #[serde(default, deserialize_with = "optional_string")]
    pub service: Option<String>,
    /// Provider name (present when grouped by provider).
    #[serde(default, deserialize_with = "optional_string")]
    pub provider: Option<String>,
}

/// Parameters for a cost fetch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CostQuery {
    /// Report to read.
    pub report_id: String,
    /// Grouping requested from the billing API.
    pub grouping: GroupingDimension,
    /// Only return costs accrued on or after this date.
    pub start_date: Option<NaiveDate>,
    /// Result page to fetch.
    pub page: Option<u32>,
}

impl CostQuery {
    /// Creates a query for one report and grouping.
    #[must_use]
    pub fn new(report_id: impl Into<String>, grouping: GroupingDimension) -> Self {
        Self { report_id: report_id.into(), grouping, start_date: None, page: None }
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::custom(format!("expected string or number, got {other}"))),
    }
}

fn optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        other => Ok(Some(other.to_string())),
    }
}

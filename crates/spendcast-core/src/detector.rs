//! Anomaly detection against an in-sample confidence band.
//!
//! The last `N` observations are compared by position with an upper bound of
//! length `N`. When the lengths differ, both sides are cut to their common
//! trailing length.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use spendcast_abstraction::{CollaboratorError, ForecastResult, Series};

/// An observation above the upper bound.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    pub date: NaiveDate,
    pub observed: f64,
    pub upper: f64,
}

/// Result of one detection pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnomalyReport {
    /// Dates that were compared, in chronological order.
    pub dates: Vec<NaiveDate>,
    /// `true` where the observation exceeded the bound, parallel to `dates`.
    pub mask: Vec<bool>,
    /// The flagged observations, in chronological order.
    pub anomalies: Vec<Anomaly>,
}

impl AnomalyReport {
    /// Dates of the flagged observations.
    #[must_use]
    pub fn anomalous_dates(&self) -> Vec<NaiveDate> {
        self.anomalies.iter().map(|a| a.date).collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.anomalies.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.anomalies.len()
    }
}

/// Flags trailing observations that strictly exceed `upper`.
#[must_use]
pub fn detect_anomalies(observed: &Series, upper: &[f64]) -> AnomalyReport {
    let n = upper.len().min(observed.len());
    let bounds = &upper[upper.len() - n..];

    let mut report = AnomalyReport {
        dates: Vec::with_capacity(n),
        mask: Vec::with_capacity(n),
        anomalies: Vec::new(),
    };

    for ((date, value), bound) in observed.iter().skip(observed.len() - n).zip(bounds) {
        let above = value > *bound;
        report.dates.push(date);
        report.mask.push(above);
        if above {
            report.anomalies.push(Anomaly { date, observed: value, upper: *bound });
        }
    }

    report
}

/// Runs detection against an in-sample forecast result.
///
/// # Errors
/// Returns `CollaboratorError::MalformedResponse` when the result has no upper bound.
pub fn detect_from_insample(
    observed: &Series,
    insample: &ForecastResult,
) -> Result<AnomalyReport, CollaboratorError> {
    let upper = insample.upper().ok_or_else(|| {
        CollaboratorError::MalformedResponse(
            "In-sample forecast is missing the upper confidence bound".to_string(),
        )
    })?;
    Ok(detect_anomalies(observed, upper))
}

//! Per-session state shared across user-triggered actions.

use spendcast_abstraction::{ForecastResult, GroupedSeries, GroupingDimension, Series};

use crate::detector::AnomalyReport;
use crate::error::{Result, SpendcastError};

/// Cost data from the last successful fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchedCosts {
    /// All records merged into one series.
    Total(Series),
    /// One series per group key.
    Grouped(GroupedSeries),
}

/// State carried between actions.
///
/// Actions commit here only after they succeed, so a failure leaves the
/// previous results in place.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub costs: Option<FetchedCosts>,
    pub selected_group: Option<String>,
    pub forecast: Option<ForecastResult>,
    pub insample: Option<ForecastResult>,
    pub anomalies: Option<AnomalyReport>,
    pub explanation: Option<String>,
}

impl Session {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The dimension used for the last fetch, if it was grouped.
    #[must_use]
    pub fn grouping(&self) -> Option<GroupingDimension> {
        match &self.costs {
            Some(FetchedCosts::Grouped(grouped)) => grouped.dimension,
            _ => None,
        }
    }

    /// Group keys of the last grouped fetch, sorted.
    #[must_use]
    pub fn group_keys(&self) -> Vec<&str> {
        match &self.costs {
            Some(FetchedCosts::Grouped(grouped)) => grouped.keys().collect(),
            _ => Vec::new(),
        }
    }

    /// Stores freshly fetched costs and drops results derived from the old data.
    ///
    /// For grouped data the current selection is kept if its key still exists,
    /// otherwise the first key is selected.
    pub fn store_costs(&mut self, costs: FetchedCosts) {
        self.selected_group = match &costs {
            FetchedCosts::Total(_) => None,
            FetchedCosts::Grouped(grouped) => self
                .selected_group
                .take()
                .filter(|key| grouped.contains(key))
                .or_else(|| grouped.keys().next().map(str::to_string)),
        };
        self.costs = Some(costs);
        self.clear_results();
    }

    /// Selects a group of the last grouped fetch.
    ///
    /// # Errors
    /// `MissingSeries` before any fetch, `UnknownGroup` for a key that is not present
    /// or when the last fetch was ungrouped.
    pub fn select_group(&mut self, key: &str) -> Result<()> {
        match &self.costs {
            None => Err(SpendcastError::MissingSeries),
            Some(FetchedCosts::Grouped(grouped)) if grouped.contains(key) => {
                if self.selected_group.as_deref() != Some(key) {
                    self.selected_group = Some(key.to_string());
                    self.clear_results();
                }
                Ok(())
            }
            Some(_) => Err(SpendcastError::UnknownGroup(key.to_string())),
        }
    }

    /// The series the next forecast or detection runs on.
    ///
    /// # Errors
    /// `MissingSeries` before any fetch or when a grouped fetch returned no groups.
    pub fn active_series(&self) -> Result<&Series> {
        match &self.costs {
            None => Err(SpendcastError::MissingSeries),
            Some(FetchedCosts::Total(series)) => Ok(series),
            Some(FetchedCosts::Grouped(grouped)) => self
                .selected_group
                .as_deref()
                .and_then(|key| grouped.get(key))
                .ok_or(SpendcastError::MissingSeries),
        }
    }

    /// Label for the active series, used in logs and chart titles.
    #[must_use]
    pub fn active_label(&self) -> String {
        self.selected_group.clone().unwrap_or_else(|| "total".to_string())
    }

    fn clear_results(&mut self) {
        self.forecast = None;
        self.insample = None;
        self.anomalies = None;
        self.explanation = None;
    }
}

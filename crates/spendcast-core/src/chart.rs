//! Chart specifications for the presentation shell.
//!
//! These are plain serializable descriptions of line and marker traces; the
//! caller decides how to render them.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use spendcast_abstraction::{ForecastResult, Series, format_day};

use crate::detector::AnomalyReport;

const X_AXIS_TITLE: &str = "Date";
const Y_AXIS_TITLE: &str = "Spend in USD";
const BAND_COLOR: &str = "rgba(0,176,246,0.2)";
const BAND_LINE_COLOR: &str = "rgba(68, 68, 68, 0.2)";
const ANOMALY_COLOR: &str = "red";
const Y_RANGE_HEADROOM: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceMode {
    Lines,
    Markers,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Fill {
    ToSelf,
    ToNextY,
}

/// One series drawn on a chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    pub name: String,
    pub x: Vec<String>,
    pub y: Vec<f64>,
    pub mode: TraceMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill: Option<Fill>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub show_legend: bool,
}

impl Trace {
    fn line(name: impl Into<String>, points: impl IntoIterator<Item = (NaiveDate, f64)>) -> Self {
        let (x, y) = points.into_iter().map(|(d, v)| (format_day(d), v)).unzip();
        Self {
            name: name.into(),
            x,
            y,
            mode: TraceMode::Lines,
            fill: None,
            color: None,
            show_legend: true,
        }
    }
}

/// A chart with axis titles and its traces, in drawing order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    pub title: String,
    pub x_axis_title: String,
    pub y_axis_title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y_range: Option<[f64; 2]>,
    pub width: u32,
    pub height: u32,
    pub traces: Vec<Trace>,
}

impl ChartSpec {
    fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            x_axis_title: X_AXIS_TITLE.to_string(),
            y_axis_title: Y_AXIS_TITLE.to_string(),
            y_range: None,
            width: 800,
            height: 500,
            traces: Vec::new(),
        }
    }

    /// Looks up a trace by name.
    #[must_use]
    pub fn trace(&self, name: &str) -> Option<&Trace> {
        self.traces.iter().find(|t| t.name == name)
    }
}

/// Y range for a single group's chart: `[0, max + 10]`.
#[must_use]
pub fn group_y_range(series: &Series) -> Option<[f64; 2]> {
    series.max_value().map(|max| [0.0, max + Y_RANGE_HEADROOM])
}

fn chart_title(prefix: &str, group: Option<&str>) -> String {
    match group {
        Some(key) => format!("{prefix} for {key}"),
        None => prefix.to_string(),
    }
}

/// Observed series, forward forecast and its confidence band.
///
/// Missing bounds are drawn as zeros.
#[must_use]
pub fn forecast_chart(observed: &Series, forecast: &ForecastResult, group: Option<&str>) -> ChartSpec {
    let mut chart = ChartSpec::new(chart_title("Costs and Forecast", group));
    if group.is_some() {
        chart.y_range = group_y_range(observed);
    }

    chart.traces.push(Trace::line(group.unwrap_or("Original Data"), observed.iter()));
    chart.traces.push(Trace::line(
        "Forecasted Data",
        forecast.timestamps().iter().copied().zip(forecast.point().iter().copied()),
    ));

    let dates: Vec<String> = forecast.timestamps().iter().copied().map(format_day).collect();
    let lower = forecast.lower_or_zeros();
    let upper = forecast.upper_or_zeros();
    chart.traces.push(Trace {
        name: "Confidence Interval".to_string(),
        x: dates.iter().chain(dates.iter().rev()).cloned().collect(),
        y: upper.iter().chain(lower.iter().rev()).copied().collect(),
        mode: TraceMode::Lines,
        fill: Some(Fill::ToSelf),
        color: Some(BAND_COLOR.to_string()),
        show_legend: false,
    });

    chart
}

/// Observed series against in-sample predictions, with anomalies marked.
#[must_use]
pub fn insample_chart(
    observed: &Series,
    insample: &ForecastResult,
    report: &AnomalyReport,
    level: u8,
    group: Option<&str>,
) -> ChartSpec {
    let mut chart = ChartSpec::new(chart_title("In-sample Predictions", group));
    if group.is_some() {
        chart.y_range = group_y_range(observed);
    }

    let dates = insample.timestamps().iter().copied();
    let band_name = format!("{level}% Confidence Interval");

    chart.traces.push(Trace::line(group.unwrap_or("Original Data"), observed.iter()));
    chart.traces.push(Trace::line(
        "In-sample Predictions",
        dates.clone().zip(insample.point().iter().copied()),
    ));
    chart.traces.push(Trace {
        color: Some(BAND_LINE_COLOR.to_string()),
        ..Trace::line(band_name.clone(), dates.clone().zip(insample.lower_or_zeros()))
    });
    chart.traces.push(Trace {
        fill: Some(Fill::ToNextY),
        color: Some(BAND_LINE_COLOR.to_string()),
        ..Trace::line(band_name, dates.zip(insample.upper_or_zeros()))
    });
    chart.traces.push(Trace {
        mode: TraceMode::Markers,
        color: Some(ANOMALY_COLOR.to_string()),
        ..Trace::line(
            "Above Confidence Interval",
            report.anomalies.iter().map(|a| (a.date, a.observed)),
        )
    });

    chart
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::detect_anomalies;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 3, d).unwrap()
    }

    fn observed() -> Series {
        vec![(day(1), 10.0), (day(2), 40.0), (day(3), 12.0)].into_iter().collect()
    }

    #[test]
    fn test_forecast_chart_band_polygon() {
        let forecast = ForecastResult::new(
            vec![day(4), day(5)],
            vec![11.0, 12.0],
            Some(vec![9.0, 10.0]),
            Some(vec![13.0, 14.0]),
        )
        .unwrap();

        let chart = forecast_chart(&observed(), &forecast, None);

        assert_eq!(chart.title, "Costs and Forecast");
        assert_eq!(chart.y_axis_title, "Spend in USD");
        assert_eq!(chart.y_range, None);
        let band = chart.trace("Confidence Interval").unwrap();
        assert_eq!(band.x, vec!["2023-03-04", "2023-03-05", "2023-03-05", "2023-03-04"]);
        assert_eq!(band.y, vec![13.0, 14.0, 10.0, 9.0]);
        assert_eq!(band.fill, Some(Fill::ToSelf));
        assert!(!band.show_legend);
    }

    #[test]
    fn test_forecast_chart_zero_fills_missing_bounds() {
        let forecast = ForecastResult::new(vec![day(4)], vec![11.0], None, None).unwrap();
        let chart = forecast_chart(&observed(), &forecast, None);
        assert_eq!(chart.trace("Confidence Interval").unwrap().y, vec![0.0, 0.0]);
    }

    #[test]
    fn test_group_chart_has_y_range_and_group_trace() {
        let forecast = ForecastResult::new(vec![day(4)], vec![11.0], None, None).unwrap();
        let chart = forecast_chart(&observed(), &forecast, Some("Amazon EC2"));

        assert_eq!(chart.title, "Costs and Forecast for Amazon EC2");
        assert_eq!(chart.y_range, Some([0.0, 50.0]));
        assert!(chart.trace("Amazon EC2").is_some());
    }

    #[test]
    fn test_insample_chart_marks_anomalies() {
        let insample = ForecastResult::new(
            vec![day(1), day(2), day(3)],
            vec![10.0, 11.0, 12.0],
            Some(vec![5.0, 5.0, 5.0]),
            Some(vec![20.0, 20.0, 20.0]),
        )
        .unwrap();
        let report = detect_anomalies(&observed(), insample.upper().unwrap());

        let chart = insample_chart(&observed(), &insample, &report, 90, None);

        assert_eq!(chart.traces.len(), 5);
        let markers = chart.trace("Above Confidence Interval").unwrap();
        assert_eq!(markers.mode, TraceMode::Markers);
        assert_eq!(markers.x, vec!["2023-03-02"]);
        assert_eq!(markers.y, vec![40.0]);
        assert_eq!(markers.color.as_deref(), Some("red"));
        assert_eq!(chart.traces[3].fill, Some(Fill::ToNextY));
        assert_eq!(chart.traces[2].name, "90% Confidence Interval");
    }

    #[test]
    fn test_chart_serializes_lowercase_modes() {
        let forecast = ForecastResult::new(vec![day(4)], vec![11.0], None, None).unwrap();
        let json = serde_json::to_value(forecast_chart(&observed(), &forecast, None)).unwrap();
        assert_eq!(json["traces"][0]["mode"], "lines");
        assert_eq!(json["traces"][2]["fill"], "toself");
        assert!(json.get("y_range").is_none());
    }
}

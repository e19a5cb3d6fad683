//! Spendcast core.
//!
//! Turns raw cloud cost records into date-indexed series, prepares forecast
//! requests with a month-start calendar feature, flags observations above the
//! forecaster's in-sample confidence band and asks a text generator to explain
//! them. All forecasting and inference is delegated to the collaborators in
//! `spendcast-abstraction`; this crate only reshapes, aligns and orchestrates.
//!
//! # Data flow
//!
//! ```text
//! cost records -> series -> { exogenous features, forecast request } -> anomaly detection -> narration
//! ```

pub mod chart;
pub mod config;
pub mod detector;
pub mod error;
pub mod exogenous;
pub mod forecast;
pub mod narrator;
pub mod pipeline;
pub mod series;
pub mod session;

pub use config::{Settings, SettingsError};
pub use detector::{Anomaly, AnomalyReport, detect_anomalies};
pub use error::{Result, SpendcastError};
pub use exogenous::month_start_features;
pub use narrator::{build_prompt, format_anomaly_date};
pub use pipeline::{Collaborators, Pipeline, PipelineOptions, RunSummary};
pub use series::{build_grouped, build_series};
pub use session::{FetchedCosts, Session};

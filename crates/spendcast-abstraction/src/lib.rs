//! Collaborator abstraction layer for Spendcast.
//!
//! This crate defines the data model shared by every Spendcast crate and the
//! traits for the three external collaborators the dashboard delegates to:
//!
//! - **Billing**: returns cost records for a report ([`BillingSource`])
//! - **Forecasting**: turns a series into point forecasts and quantile bounds ([`Forecaster`])
//! - **Text generation**: explains anomalies in natural language ([`TextGenerator`])

pub mod grouping;
pub mod types;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use grouping::{GroupingDimension, UnsupportedGroupingError};
pub use types::{
    CostQuery, CostRecord, ExogenousMatrix, ForecastMode, ForecastRequest, ForecastResult,
    GroupedSeries, Report, Series, format_day, parse_day,
};

/// Represents an error that can occur when talking to an external collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollaboratorError {
    /// A collaborator answered with a non-success status.
    #[error("{service} returned HTTP {status}: {message}")]
    UpstreamHttp {
        /// Which collaborator failed (e.g., "billing", "narration").
        service: String,
        /// The HTTP status code reported by the service.
        status: u16,
        /// The error body reported by the service.
        message: String,
    },

    /// The forecaster answered with a non-success status.
    ///
    /// Forecasting failures are terminal for the action that triggered them.
    #[error("Forecast unavailable (HTTP {status}): {message}")]
    ForecastUnavailable {
        /// The HTTP status code reported by the forecaster.
        status: u16,
        /// The error body reported by the forecaster.
        message: String,
    },

    /// The request never produced a response (network issues, invalid URL).
    #[error("Request Error: {0}")]
    Request(String),

    /// The collaborator returned a payload missing required fields.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Required configuration for this collaborator is absent.
    #[error("Not configured: {0}")]
    NotConfigured(String),
}

impl CollaboratorError {
    /// Returns the HTTP status carried by this error, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::UpstreamHttp { status, .. } | Self::ForecastUnavailable { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }
}

/// A source of cloud cost records.
#[async_trait]
pub trait BillingSource: Send + Sync {
    /// Lists the cost reports visible to the configured token.
    ///
    /// # Errors
    /// Returns a `CollaboratorError` if the billing API cannot be reached or rejects the call.
    async fn list_reports(&self) -> Result<Vec<Report>, CollaboratorError>;

    /// Fetches the cost records of one report.
    ///
    /// # Errors
    /// Returns a `CollaboratorError` if the billing API cannot be reached or rejects the call.
    async fn fetch_costs(&self, query: &CostQuery) -> Result<Vec<CostRecord>, CollaboratorError>;
}

/// A remote forecasting service.
#[async_trait]
pub trait Forecaster: Send + Sync {
    /// Sends a forecast request in the given mode and parses the result.
    ///
    /// # Arguments
    /// * `request` - The series, horizon, levels and exogenous features to send
    /// * `mode` - Forward forecast or in-sample estimate
    ///
    /// # Errors
    /// Returns `CollaboratorError::ForecastUnavailable` on a non-success status and
    /// `CollaboratorError::MalformedResponse` when the payload cannot be parsed.
    async fn forecast(
        &self,
        request: &ForecastRequest,
        mode: ForecastMode,
    ) -> Result<ForecastResult, CollaboratorError>;
}

/// A natural-language text generation service.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generates a completion for the given prompt and returns it verbatim.
    ///
    /// # Errors
    /// Returns a `CollaboratorError` if generation fails.
    async fn generate_text(&self, prompt: &str) -> Result<String, CollaboratorError>;
}

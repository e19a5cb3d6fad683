//! Error types for Spendcast Core.

use spendcast_abstraction::{CollaboratorError, UnsupportedGroupingError};
use thiserror::Error;

use crate::config::SettingsError;

/// Core error type for Spendcast actions.
///
/// Every variant is local to the action that produced it; nothing here is fatal
/// to the process.
#[derive(Error, Debug)]
pub enum SpendcastError {
    /// The requested grouping dimension is not supported.
    #[error(transparent)]
    UnsupportedGrouping(#[from] UnsupportedGroupingError),

    /// A collaborator call failed.
    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),

    /// A cost record could not be turned into a dated amount.
    #[error("Malformed cost record: {0}")]
    MalformedRecord(String),

    /// The selected group key does not exist in the fetched data.
    #[error("Unknown group '{0}'")]
    UnknownGroup(String),

    /// An action needs cost data that has not been fetched yet.
    #[error("No cost data has been fetched yet")]
    MissingSeries,

    /// The active series has no observations to forecast from.
    #[error("Series '{0}' has no observations")]
    EmptySeries(String),

    /// Explanation was requested before anomaly detection ran.
    #[error("No anomaly detection results to explain")]
    MissingAnomalies,

    /// Invalid configuration outside of settings loading.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Settings could not be loaded or validated.
    #[error(transparent)]
    Settings(#[from] SettingsError),
}

/// Result type alias for Spendcast actions.
pub type Result<T> = std::result::Result<T, SpendcastError>;

//! Grouping dimensions supported by the billing API.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::types::CostRecord;

/// A dimension cost records can be grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupingDimension {
    /// Cloud account identifier.
    AccountId,
    /// Cloud service name (e.g., "Amazon EC2").
    Service,
    /// Cloud provider name (e.g., "aws").
    Provider,
}

/// Returned when a grouping name is not one of the supported dimensions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unsupported grouping '{0}' (expected one of: account_id, service, provider)")]
pub struct UnsupportedGroupingError(pub String);

impl GroupingDimension {
    /// Every supported dimension, in display order.
    pub const ALL: [Self; 3] = [Self::AccountId, Self::Service, Self::Provider];

    /// The query-string value and record field name for this dimension.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AccountId => "account_id",
            Self::Service => "service",
            Self::Provider => "provider",
        }
    }

    /// Reads this dimension's group key from a record.
    #[must_use]
    pub fn key_of(self, record: &CostRecord) -> Option<&str> {
        match self {
            Self::AccountId => record.account_id.as_deref(),
            Self::Service => record.service.as_deref(),
            Self::Provider => record.provider.as_deref(),
        }
    }
}

impl FromStr for GroupingDimension {
    type Err = UnsupportedGroupingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "account_id" | "account" => Ok(Self::AccountId),
            "service" => Ok(Self::Service),
            "provider" => Ok(Self::Provider),
            _ => Err(UnsupportedGroupingError(s.to_string())),
        }
    }
}

impl fmt::Display for GroupingDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

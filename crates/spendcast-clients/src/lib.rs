//! HTTP collaborator implementations for Spendcast.
//!
//! This crate provides concrete implementations of the collaborator traits
//! from `spendcast-abstraction`.
//!
//! # Supported Collaborators
//!
//! - **Vantage**: billing API returning cost reports (token required)
//! - **Forecast**: forward and in-sample forecasting endpoints (URLs required)
//! - **OpenAI**: OpenAI-compatible chat completions for anomaly narration (token required)
//!
//! Every client caches successful responses for a short window; identical
//! requests inside that window do not reach the collaborator again.

pub mod billing;
pub mod cache;
pub mod forecast;
pub mod openai;

use reqwest::Client;
use std::time::Duration;

pub use billing::VantageClient;
pub use cache::{CacheConfig, CacheConfigError, CacheKey, CacheStats, ResponseCache};
pub use forecast::HttpForecaster;
pub use openai::OpenAiTextGenerator;

/// Request timeout applied to every collaborator call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Builds the HTTP client shared by the collaborator implementations.
pub(crate) fn http_client() -> Client {
    Client::builder().timeout(REQUEST_TIMEOUT).build().unwrap_or_else(|_| Client::new())
}

/// Reads a response body for an error message, tolerating unreadable bodies.
pub(crate) async fn error_body(response: reqwest::Response) -> String {
    response.text().await.unwrap_or_else(|_| "Unknown error".to_string())
}

//! Forecasting service client.
//!
//! This module provides an implementation of the `Forecaster` trait for an HTTP
//! forecasting service exposing two endpoints: one for forward forecasts and one
//! for in-sample estimates over the historical range.
//!
//! The wire format is:
//!
//! ```text
//! request:  { "y": {date: amount}, "fh": 30, "level": [90], "finetune_steps": 1, "x": {date: [feature]} }
//! response: { "timestamp": [date], "value": [f64], "lo-90": [f64]?, "hi-90": [f64]? }
//! ```

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use spendcast_abstraction::{
    CollaboratorError, ForecastMode, ForecastRequest, ForecastResult, Forecaster, format_day,
    parse_day,
};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tracing::{debug, error};

use crate::cache::{CacheKey, CacheStats, ResponseCache};

/// Environment variable holding the forward forecast endpoint.
pub const FORWARD_URL_ENV: &str = "FORECAST_URL";

/// Environment variable holding the in-sample forecast endpoint.
pub const INSAMPLE_URL_ENV: &str = "INSAMPLE_FORECAST_URL";

/// How long forecast responses stay cached by default.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(15);

/// HTTP forecaster with one endpoint and one response cache per mode.
#[derive(Debug)]
pub struct HttpForecaster {
    forward: Endpoint,
    insample: Endpoint,
    /// HTTP client for making requests.
    client: Client,
}

#[derive(Debug)]
struct Endpoint {
    url: Option<String>,
    env: &'static str,
    cache: ResponseCache<ForecastResult>,
}

impl Endpoint {
    fn new(url: Option<String>, env: &'static str) -> Self {
        Self {
            url: url.filter(|u| !u.trim().is_empty()),
            env,
            cache: ResponseCache::with_ttl(DEFAULT_CACHE_TTL),
        }
    }
}

impl HttpForecaster {
    /// Creates a forecaster for the given endpoints.
    ///
    /// # Arguments
    /// * `forward_url` - Endpoint for forward forecasts
    /// * `insample_url` - Endpoint for in-sample estimates
    #[must_use]
    pub fn new(forward_url: Option<String>, insample_url: Option<String>) -> Self {
        Self {
            forward: Endpoint::new(forward_url, FORWARD_URL_ENV),
            insample: Endpoint::new(insample_url, INSAMPLE_URL_ENV),
            client: crate::http_client(),
        }
    }

    /// Replaces the response cache of one endpoint.
    #[must_use]
    pub fn with_cache(mut self, mode: ForecastMode, cache: ResponseCache<ForecastResult>) -> Self {
        self.endpoint_mut(mode).cache = cache;
        self
    }

    /// Statistics of one endpoint's response cache.
    #[must_use]
    pub fn cache_stats(&self, mode: ForecastMode) -> CacheStats {
        self.endpoint(mode).cache.get_stats()
    }

    fn endpoint(&self, mode: ForecastMode) -> &Endpoint {
        match mode {
            ForecastMode::Forward => &self.forward,
            ForecastMode::InSample => &self.insample,
        }
    }

    fn endpoint_mut(&mut self, mode: ForecastMode) -> &mut Endpoint {
        match mode {
            ForecastMode::Forward => &mut self.forward,
            ForecastMode::InSample => &mut self.insample,
        }
    }
}

/// Converts a request into the wire payload.
#[must_use]
pub fn build_payload(request: &ForecastRequest) -> ForecastPayload {
    ForecastPayload {
        y: request.series.iter().map(|(date, amount)| (format_day(date), amount)).collect(),
        fh: request.horizon,
        level: request.levels.clone(),
        finetune_steps: request.finetune_steps,
        x: request
            .exogenous
            .iter()
            .map(|(date, row)| (format_day(date), row.to_vec()))
            .collect(),
    }
}

/// Parses a forecaster response body, reading bounds at `level`.
///
/// Missing `lo-{level}` / `hi-{level}` fields are valid and yield no bounds.
///
/// # Errors
/// Returns `CollaboratorError::MalformedResponse` if `timestamp` or `value` is
/// missing, a field has the wrong shape, or the sequences differ in length.
pub fn parse_response(body: Value, level: u8) -> Result<ForecastResult, CollaboratorError> {
    let mut response: ForecastResponse = serde_json::from_value(body).map_err(|e| {
        CollaboratorError::MalformedResponse(format!("Unexpected forecast payload: {e}"))
    })?;

    let timestamps = response
        .timestamp
        .ok_or_else(|| missing_field("timestamp"))?
        .iter()
        .map(|raw| {
            parse_day(raw).ok_or_else(|| {
                CollaboratorError::MalformedResponse(format!("Invalid forecast timestamp '{raw}'"))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    let point = response.value.ok_or_else(|| missing_field("value"))?;

    let lower = take_bound(&mut response.bounds, &format!("lo-{level}"))?;
    let upper = take_bound(&mut response.bounds, &format!("hi-{level}"))?;

    ForecastResult::new(timestamps, point, lower, upper)
}

fn missing_field(name: &str) -> CollaboratorError {
    CollaboratorError::MalformedResponse(format!("Forecast response is missing '{name}'"))
}

fn take_bound(
    bounds: &mut HashMap<String, Value>,
    key: &str,
) -> Result<Option<Vec<f64>>, CollaboratorError> {
    match bounds.remove(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value).map(Some).map_err(|e| {
            CollaboratorError::MalformedResponse(format!("Invalid '{key}' in forecast response: {e}"))
        }),
    }
}

#[async_trait]
impl Forecaster for HttpForecaster {
    async fn forecast(
        &self,
        request: &ForecastRequest,
        mode: ForecastMode,
    ) -> Result<ForecastResult, CollaboratorError> {
        let endpoint = self.endpoint(mode);
        let url = endpoint.url.as_deref().ok_or_else(|| {
            CollaboratorError::NotConfigured(format!("{} is not set", endpoint.env))
        })?;

        let payload = build_payload(request);
        let serialized = serde_json::to_string(&payload).map_err(|e| {
            CollaboratorError::Request(format!("Failed to serialize forecast request: {e}"))
        })?;
        let key = CacheKey::fingerprint(&[mode.as_str(), url, &serialized]);

        if let Some(cached) = endpoint.cache.get(&key) {
            debug!(mode = mode.as_str(), "Serving forecast from cache");
            return Ok(cached);
        }

        debug!(
            mode = mode.as_str(),
            url = %url,
            observations = payload.y.len(),
            horizon = payload.fh,
            exogenous_rows = payload.x.len(),
            "Requesting forecast"
        );

        let response = self
            .client
            .post(url)
            .header("content-type", "application/json")
            .body(serialized)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to send request to forecaster");
                CollaboratorError::Request(format!("Network error: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = crate::error_body(response).await;
            error!(status = %status, error = %message, "Forecaster returned error status");
            return Err(CollaboratorError::ForecastUnavailable { status: status.as_u16(), message });
        }

        let body: Value = response.json().await.map_err(|e| {
            error!(error = %e, "Failed to parse forecaster response");
            CollaboratorError::MalformedResponse(format!("Forecast response is not JSON: {e}"))
        })?;
        let result = parse_response(body, request.primary_level())?;

        debug!(mode = mode.as_str(), steps = result.len(), bounds = result.has_bounds(), "Forecast received");
        endpoint.cache.insert(key, result.clone());
        Ok(result)
    }
}

// Forecast API request/response structures

/// Request body sent to the forecaster.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastPayload {
    /// Historical amounts keyed by `YYYY-MM-DD`.
    pub y: BTreeMap<String, f64>,
    /// Forecast horizon in days.
    pub fh: u32,
    /// Confidence levels in percent.
    pub level: Vec<u8>,
    /// Fine-tuning steps.
    pub finetune_steps: u32,
    /// Exogenous features keyed by `YYYY-MM-DD`; omitted when empty.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub x: BTreeMap<String, Vec<f64>>,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    timestamp: Option<Vec<String>>,
    value: Option<Vec<f64>>,
    #[serde(flatten)]
    bounds: HashMap<String, Value>,
}

//! Vantage billing API client.
//!
//! This module provides an implementation of the `BillingSource` trait for the
//! Vantage cost reporting API.

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use spendcast_abstraction::{BillingSource, CollaboratorError, CostQuery, CostRecord, Report, format_day};
use std::time::Duration;
use tracing::{debug, error};

use crate::cache::{CacheKey, CacheStats, ResponseCache};

/// Default Vantage API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.vantage.sh/v1";

/// Environment variable holding the Vantage access token.
pub const TOKEN_ENV: &str = "VANTAGE_TOKEN";

/// How long billing responses stay cached by default.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(100);

/// Vantage billing client.
#[derive(Debug)]
pub struct VantageClient {
    /// The base URL for the Vantage API.
    base_url: String,
    /// Bearer token; calls fail with `NotConfigured` when absent.
    token: Option<String>,
    /// HTTP client for making requests.
    client: Client,
    /// Cache of raw GET responses.
    cache: ResponseCache<Value>,
}

impl VantageClient {
    /// Creates a client against the public Vantage API.
    ///
    /// # Arguments
    /// * `token` - The access token, if one is configured
    #[must_use]
    pub fn new(token: Option<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token: token.filter(|t| !t.trim().is_empty()),
            client: crate::http_client(),
            cache: ResponseCache::with_ttl(DEFAULT_CACHE_TTL),
        }
    }

    /// Points the client at a different API root.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Replaces the response cache.
    #[must_use]
    pub fn with_cache(mut self, cache: ResponseCache<Value>) -> Self {
        self.cache = cache;
        self
    }

    /// Statistics of the response cache.
    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.get_stats()
    }

    /// Builds the costs URL for a query.
    ///
    /// # Errors
    /// Returns `CollaboratorError::Request` if the base URL is not a valid URL.
    pub fn costs_url(&self, query: &CostQuery) -> Result<Url, CollaboratorError> {
        let mut params = vec![("grouping", query.grouping.as_str().to_string())];
        if let Some(start_date) = query.start_date {
            params.push(("start_date", format_day(start_date)));
        }
        if let Some(page) = query.page {
            params.push(("page", page.to_string()));
        }

        let path = format!("{}/reports/{}/costs", self.base_url, query.report_id);
        Url::parse_with_params(&path, &params)
            .map_err(|e| CollaboratorError::Request(format!("Invalid billing URL {path}: {e}")))
    }

    fn reports_url(&self) -> Result<Url, CollaboratorError> {
        let path = format!("{}/reports", self.base_url);
        Url::parse(&path)
            .map_err(|e| CollaboratorError::Request(format!("Invalid billing URL {path}: {e}")))
    }

    fn token(&self) -> Result<&str, CollaboratorError> {
        self.token.as_deref().ok_or_else(|| {
            CollaboratorError::NotConfigured(format!("{TOKEN_ENV} is not set"))
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, CollaboratorError> {
        let token = self.token()?;
        let key = CacheKey::fingerprint(&[url.as_str(), token]);

        let body = if let Some(cached) = self.cache.get(&key) {
            debug!(url = %url, "Serving billing response from cache");
            cached
        } else {
            debug!(url = %url, "Fetching from billing API");

            let response = self
                .client
                .get(url.clone())
                .header("accept", "application/json")
                .bearer_auth(token)
                .send()
                .await
                .map_err(|e| {
                    error!(error = %e, "Failed to send request to billing API");
                    CollaboratorError::Request(format!("Network error: {e}"))
                })?;

            let status = response.status();
            if !status.is_success() {
                let message = crate::error_body(response).await;
                error!(status = %status, error = %message, "Billing API returned error status");
                return Err(CollaboratorError::UpstreamHttp {
                    service: "billing".to_string(),
                    status: status.as_u16(),
                    message,
                });
            }

            let body: Value = response.json().await.map_err(|e| {
                error!(error = %e, "Failed to parse billing API response");
                CollaboratorError::MalformedResponse(format!("Billing response is not JSON: {e}"))
            })?;
            self.cache.insert(key, body.clone());
            body
        };

        serde_json::from_value(body).map_err(|e| {
            CollaboratorError::MalformedResponse(format!("Unexpected billing payload: {e}"))
        })
    }
}

#[async_trait]
impl BillingSource for VantageClient {
    async fn list_reports(&self) -> Result<Vec<Report>, CollaboratorError> {
        let response: ReportsResponse = self.get_json(self.reports_url()?).await?;
        debug!(count = response.reports.len(), "Listed billing reports");
        Ok(response.reports)
    }

    async fn fetch_costs(&self, query: &CostQuery) -> Result<Vec<CostRecord>, CollaboratorError> {
        let response: CostsResponse = self.get_json(self.costs_url(query)?).await?;
        debug!(
            report_id = %query.report_id,
            grouping = %query.grouping,
            count = response.costs.len(),
            "Fetched cost records"
        );
        Ok(response.costs)
    }
}

// Vantage API response structures

#[derive(Debug, Deserialize)]
struct ReportsResponse {
    reports: Vec<Report>,
}

#[derive(Debug, Deserialize)]
struct CostsResponse {
    costs: Vec<CostRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use spendcast_abstraction::GroupingDimension;

    #[test]
    fn test_costs_url_includes_query_parameters() {
        let client = VantageClient::new(Some("tkn".to_string()));
        let mut query = CostQuery::new("3637", GroupingDimension::Service);
        query.start_date = NaiveDate::from_ymd_opt(2023, 3, 1);
        query.page = Some(3);

        let url = client.costs_url(&query).unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.vantage.sh/v1/reports/3637/costs?grouping=service&start_date=2023-03-01&page=3"
        );
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = VantageClient::new(None).with_base_url("http://localhost:9000/v1/");
        let url = client.costs_url(&CostQuery::new("1", GroupingDimension::AccountId)).unwrap();
        assert_eq!(url.as_str(), "http://localhost:9000/v1/reports/1/costs?grouping=account_id");
    }

    #[test]
    fn test_blank_token_counts_as_missing() {
        let client = VantageClient::new(Some("  ".to_string()));
        assert!(matches!(client.token(), Err(CollaboratorError::NotConfigured(_))));
    }
}

//! The fetch, forecast, detect and explain pipeline.
//!
//! Each action reads what it needs from the [`Session`], talks to at most one
//! collaborator and commits its result only when every step succeeded.

use chrono::NaiveDate;
use serde::Serialize;
use spendcast_abstraction::{
    BillingSource, CostQuery, ForecastMode, ForecastResult, Forecaster, GroupingDimension,
    TextGenerator, parse_day,
};
use spendcast_clients::{
    CacheConfig, HttpForecaster, OpenAiTextGenerator, ResponseCache, VantageClient,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::chart::{ChartSpec, forecast_chart, insample_chart};
use crate::config::Settings;
use crate::detector::{AnomalyReport, detect_from_insample};
use crate::error::{Result, SpendcastError};
use crate::forecast::build_request;
use crate::narrator::narrate;
use crate::series::{build_grouped, build_series};
use crate::session::{FetchedCosts, Session};

/// Parameters shared by every action of a pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOptions {
    pub report_id: String,
    /// Grouping sent to the billing API.
    pub grouping: GroupingDimension,
    /// Keep one series per group instead of merging into a total.
    pub per_group: bool,
    /// Group to select after fetching; implies `per_group`.
    pub group: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub page: Option<u32>,
    pub horizon: u32,
    pub level: u8,
    pub finetune_steps: u32,
    pub exogenous: bool,
    pub insample_exogenous: bool,
    pub explain: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            report_id: "3637".to_string(),
            grouping: GroupingDimension::AccountId,
            per_group: false,
            group: None,
            start_date: None,
            page: None,
            horizon: 30,
            level: 90,
            finetune_steps: 1,
            exogenous: true,
            insample_exogenous: false,
            explain: false,
        }
    }
}

impl PipelineOptions {
    /// Builds options from settings.
    ///
    /// # Errors
    /// `UnsupportedGrouping` for an unknown grouping name and `Config` for an
    /// unparseable start date. Both are raised before any network access.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let pipeline = &settings.pipeline;
        let grouping: GroupingDimension = pipeline.grouping.parse()?;
        let start_date = pipeline
            .start_date
            .as_deref()
            .map(|raw| {
                parse_day(raw)
                    .ok_or_else(|| SpendcastError::Config(format!("invalid start_date '{raw}'")))
            })
            .transpose()?;

        Ok(Self {
            report_id: pipeline.report_id.clone(),
            grouping,
            start_date,
            horizon: pipeline.horizon,
            level: pipeline.level,
            finetune_steps: pipeline.finetune_steps,
            exogenous: pipeline.exogenous,
            insample_exogenous: pipeline.insample_exogenous,
            explain: pipeline.explain,
            ..Self::default()
        })
    }

    /// Checks the forecasting parameters after command-line overrides.
    ///
    /// # Errors
    /// `Config` when the horizon is zero or the level is outside `1..=99`.
    pub fn validate(&self) -> Result<()> {
        if self.horizon == 0 {
            return Err(SpendcastError::Config("horizon must be greater than 0".to_string()));
        }
        if self.level == 0 || self.level >= 100 {
            return Err(SpendcastError::Config(format!(
                "level must be between 1 and 99, got {}",
                self.level
            )));
        }
        Ok(())
    }

    fn cost_query(&self) -> CostQuery {
        let mut query = CostQuery::new(self.report_id.clone(), self.grouping);
        query.start_date = self.start_date;
        query.page = self.page;
        query
    }

    fn grouped(&self) -> bool {
        self.per_group || self.group.is_some()
    }
}

/// The three collaborators a pipeline talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub billing: Arc<dyn BillingSource>,
    pub forecaster: Arc<dyn Forecaster>,
    pub narrator: Arc<dyn TextGenerator>,
}

impl Collaborators {
    /// Builds the HTTP collaborators, each with its own response cache.
    ///
    /// Missing tokens or URLs are not checked here; the dependent action reports them.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let billing = VantageClient::new(settings.billing.token.clone())
            .with_base_url(settings.billing.base_url.clone())
            .with_cache(cache(settings.billing.cache_ttl_secs)?);

        let forecaster = HttpForecaster::new(
            settings.forecast.url.clone(),
            settings.forecast.insample_url.clone(),
        )
        .with_cache(ForecastMode::Forward, cache(settings.forecast.cache_ttl_secs)?)
        .with_cache(ForecastMode::InSample, cache(settings.forecast.cache_ttl_secs)?);

        let narrator = OpenAiTextGenerator::new(
            settings.narration.model.clone(),
            settings.narration.token.clone(),
        )
        .with_base_url(settings.narration.base_url.clone());

        Ok(Self {
            billing: Arc::new(billing),
            forecaster: Arc::new(forecaster),
            narrator: Arc::new(narrator),
        })
    }
}

fn cache<V: Clone>(ttl_secs: u64) -> Result<ResponseCache<V>> {
    ResponseCache::new(&CacheConfig::with_ttl_secs(ttl_secs))
        .map_err(|e| SpendcastError::Config(e.to_string()))
}

/// What a full run produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub group: Option<String>,
    pub observations: usize,
    pub forecast_steps: usize,
    pub anomalies: Vec<NaiveDate>,
    pub explanation: Option<String>,
}

/// Runs user-triggered actions against one session.
pub struct Pipeline {
    options: PipelineOptions,
    collaborators: Collaborators,
    session: Session,
}

impl Pipeline {
    pub fn new(options: PipelineOptions, collaborators: Collaborators) -> Self {
        Self { options, collaborators, session: Session::new() }
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Fetches cost records and rebuilds the session's series.
    pub async fn fetch_costs(&mut self) -> Result<&FetchedCosts> {
        let query = self.options.cost_query();
        info!(report = %query.report_id, grouping = %query.grouping, "Fetching costs");

        let records = self.collaborators.billing.fetch_costs(&query).await?;
        debug!(records = records.len(), "Received cost records");

        let costs = if self.options.grouped() {
            let grouped = build_grouped(&records, self.options.grouping)?;
            if let Some(key) = &self.options.group
                && !grouped.contains(key)
            {
                return Err(SpendcastError::UnknownGroup(key.clone()));
            }
            info!(groups = grouped.len(), "Built grouped series");
            FetchedCosts::Grouped(grouped)
        } else {
            let series = build_series(&records)?;
            info!(observations = series.len(), "Built total series");
            FetchedCosts::Total(series)
        };

        self.session.store_costs(costs);
        if let Some(key) = self.options.group.clone() {
            self.session.select_group(&key)?;
        }

        self.session.costs.as_ref().ok_or(SpendcastError::MissingSeries)
    }

    /// Selects a group of the last grouped fetch.
    pub fn select_group(&mut self, key: &str) -> Result<()> {
        self.session.select_group(key)?;
        info!(group = %key, "Selected group");
        Ok(())
    }

    /// Forward forecast of the active series.
    pub async fn forecast(&mut self) -> Result<&ForecastResult> {
        let series = self.session.active_series()?;
        if series.is_empty() {
            return Err(SpendcastError::EmptySeries(self.session.active_label()));
        }

        let request = build_request(series, ForecastMode::Forward, &self.options);
        info!(
            group = %self.session.active_label(),
            observations = series.len(),
            horizon = request.horizon,
            exogenous = !request.exogenous.is_empty(),
            "Requesting forecast"
        );

        let result = self.collaborators.forecaster.forecast(&request, ForecastMode::Forward).await?;
        if !result.has_bounds() {
            warn!("Forecast has no confidence bounds; drawing them as zeros");
        }
        info!(steps = result.len(), "Forecast received");

        Ok(&*self.session.forecast.insert(result))
    }

    /// Flags observations above the in-sample upper bound.
    pub async fn detect_anomalies(&mut self) -> Result<&AnomalyReport> {
        let series = self.session.active_series()?;
        if series.is_empty() {
            return Err(SpendcastError::EmptySeries(self.session.active_label()));
        }

        let request = build_request(series, ForecastMode::InSample, &self.options);
        info!(
            group = %self.session.active_label(),
            observations = series.len(),
            "Requesting in-sample forecast"
        );

        let insample =
            self.collaborators.forecaster.forecast(&request, ForecastMode::InSample).await?;
        let report = detect_from_insample(series, &insample)?;
        info!(compared = report.dates.len(), anomalies = report.len(), "Anomaly detection finished");

        self.session.insample = Some(insample);
        self.session.explanation = None;
        Ok(&*self.session.anomalies.insert(report))
    }

    /// Asks the narrator to explain the last detection.
    pub async fn explain_anomalies(&mut self) -> Result<&str> {
        let report = self.session.anomalies.as_ref().ok_or(SpendcastError::MissingAnomalies)?;
        let dates = report.anomalous_dates();
        info!(anomalies = dates.len(), "Requesting anomaly explanation");

        let explanation = narrate(self.collaborators.narrator.as_ref(), &dates).await?;
        Ok(self.session.explanation.insert(explanation).as_str())
    }

    /// Fetch, forecast, detect and optionally explain, stopping at the first failure.
    pub async fn run(&mut self) -> Result<RunSummary> {
        self.fetch_costs().await?;
        let forecast_steps = self.forecast().await?.len();
        let anomalies = self.detect_anomalies().await?.anomalous_dates();
        let explanation = if self.options.explain {
            Some(self.explain_anomalies().await?.to_string())
        } else {
            None
        };

        let summary = RunSummary {
            group: self.session.selected_group.clone(),
            observations: self.session.active_series()?.len(),
            forecast_steps,
            anomalies,
            explanation,
        };
        info!(
            group = %self.session.active_label(),
            anomalies = summary.anomalies.len(),
            "Pipeline run finished"
        );
        Ok(summary)
    }

    /// Chart of the active series and the last forward forecast.
    pub fn forecast_chart(&self) -> Option<ChartSpec> {
        let series = self.session.active_series().ok()?;
        let forecast = self.session.forecast.as_ref()?;
        Some(forecast_chart(series, forecast, self.session.selected_group.as_deref()))
    }

    /// Chart of the active series against the last in-sample forecast.
    pub fn insample_chart(&self) -> Option<ChartSpec> {
        let series = self.session.active_series().ok()?;
        let insample = self.session.insample.as_ref()?;
        let report = self.session.anomalies.as_ref()?;
        Some(insample_chart(
            series,
            insample,
            report,
            self.options.level,
            self.session.selected_group.as_deref(),
        ))
    }
}

//! Pipeline tests against in-memory collaborators.

use async_trait::async_trait;
use chrono::NaiveDate;
use spendcast_abstraction::{
    BillingSource, CollaboratorError, CostQuery, CostRecord, ForecastMode, ForecastRequest,
    ForecastResult, Forecaster, GroupingDimension, Report, TextGenerator,
};
use spendcast_core::{
    Collaborators, FetchedCosts, Pipeline, PipelineOptions, Settings, SpendcastError,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 5, d).unwrap()
}

fn record(d: u32, amount: &str, service: &str) -> CostRecord {
    CostRecord {
        accrued_at: format!("2023-05-{d:02}T00:00:00Z"),
        amount: amount.to_string(),
        account_id: Some("acct-1".to_string()),
        service: Some(service.to_string()),
        provider: Some("aws".to_string()),
    }
}

#[derive(Default)]
struct FakeBilling {
    records: Vec<CostRecord>,
    calls: AtomicUsize,
    fail: AtomicBool,
}

#[async_trait]
impl BillingSource for FakeBilling {
    async fn list_reports(&self) -> Result<Vec<Report>, CollaboratorError> {
        Ok(Vec::new())
    }

    async fn fetch_costs(&self, _query: &CostQuery) -> Result<Vec<CostRecord>, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(CollaboratorError::UpstreamHttp {
                service: "billing".to_string(),
                status: 500,
                message: "down".to_string(),
            });
        }
        Ok(self.records.clone())
    }
}

/// Forward mode returns `horizon` flat points; in-sample mode returns a flat
/// band at `upper` over the request's dates.
struct FakeForecaster {
    upper: Option<f64>,
    fail_forward: AtomicBool,
    requests: Mutex<Vec<(ForecastMode, ForecastRequest)>>,
}

impl FakeForecaster {
    fn new(upper: Option<f64>) -> Self {
        Self { upper, fail_forward: AtomicBool::new(false), requests: Mutex::new(Vec::new()) }
    }
}

#[async_trait]
impl Forecaster for FakeForecaster {
    async fn forecast(
        &self,
        request: &ForecastRequest,
        mode: ForecastMode,
    ) -> Result<ForecastResult, CollaboratorError> {
        self.requests.lock().unwrap().push((mode, request.clone()));
        match mode {
            ForecastMode::Forward => {
                if self.fail_forward.load(Ordering::SeqCst) {
                    return Err(CollaboratorError::ForecastUnavailable {
                        status: 503,
                        message: "loading".to_string(),
                    });
                }
                let last = request.series.last_date().unwrap();
                let dates: Vec<_> = last.iter_days().skip(1).take(request.horizon as usize).collect();
                let n = dates.len();
                ForecastResult::new(dates, vec![10.0; n], None, None)
            }
            ForecastMode::InSample => {
                let dates: Vec<_> = request.series.dates().collect();
                let n = dates.len();
                ForecastResult::new(
                    dates,
                    vec![10.0; n],
                    Some(vec![0.0; n]),
                    self.upper.map(|u| vec![u; n]),
                )
            }
        }
    }
}

#[derive(Default)]
struct FakeNarrator {
    prompts: Mutex<Vec<String>>,
}

#[async_trait]
impl TextGenerator for FakeNarrator {
    async fn generate_text(&self, prompt: &str) -> Result<String, CollaboratorError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok("Probably a batch job.".to_string())
    }
}

struct Harness {
    billing: Arc<FakeBilling>,
    forecaster: Arc<FakeForecaster>,
    narrator: Arc<FakeNarrator>,
}

impl Harness {
    fn new(billing: FakeBilling, forecaster: FakeForecaster) -> Self {
        Self {
            billing: Arc::new(billing),
            forecaster: Arc::new(forecaster),
            narrator: Arc::new(FakeNarrator::default()),
        }
    }

    fn pipeline(&self, options: PipelineOptions) -> Pipeline {
        Pipeline::new(
            options,
            Collaborators {
                billing: self.billing.clone(),
                forecaster: self.forecaster.clone(),
                narrator: self.narrator.clone(),
            },
        )
    }
}

fn spiky_records() -> Vec<CostRecord> {
    vec![
        record(1, "10", "EC2"),
        record(2, "10", "EC2"),
        record(3, "50", "EC2"),
        record(4, "10", "EC2"),
        record(1, "1", "S3"),
        record(2, "1", "S3"),
    ]
}

#[tokio::test]
async fn test_full_run_flags_and_explains_spike() {
    let harness = Harness::new(
        FakeBilling { records: spiky_records(), ..FakeBilling::default() },
        FakeForecaster::new(Some(20.0)),
    );
    let options = PipelineOptions {
        grouping: GroupingDimension::Service,
        group: Some("EC2".to_string()),
        horizon: 3,
        explain: true,
        ..PipelineOptions::default()
    };
    let mut pipeline = harness.pipeline(options);

    let summary = pipeline.run().await.unwrap();

    assert_eq!(summary.group.as_deref(), Some("EC2"));
    assert_eq!(summary.observations, 4);
    assert_eq!(summary.forecast_steps, 3);
    assert_eq!(summary.anomalies, vec![day(3)]);
    assert_eq!(summary.explanation.as_deref(), Some("Probably a batch job."));

    let prompts = harness.narrator.prompts.lock().unwrap();
    assert!(prompts[0].contains("Wednesday 3rd of May 2023"));

    let requests = harness.forecaster.requests.lock().unwrap();
    let (mode, forward) = &requests[0];
    assert_eq!(*mode, ForecastMode::Forward);
    assert_eq!(forward.exogenous.len(), 7);
    assert_eq!(forward.finetune_steps, 1);
    let (mode, insample) = &requests[1];
    assert_eq!(*mode, ForecastMode::InSample);
    assert!(insample.exogenous.is_empty());

    assert!(pipeline.forecast_chart().is_some());
    let chart = pipeline.insample_chart().unwrap();
    assert_eq!(chart.trace("Above Confidence Interval").unwrap().x, vec!["2023-05-03"]);
}

#[tokio::test]
async fn test_total_series_uses_last_record_per_date() {
    let harness = Harness::new(
        FakeBilling { records: spiky_records(), ..FakeBilling::default() },
        FakeForecaster::new(Some(20.0)),
    );
    let mut pipeline = harness.pipeline(PipelineOptions::default());

    let costs = pipeline.fetch_costs().await.unwrap();

    match costs {
        FetchedCosts::Total(series) => {
            assert_eq!(series.len(), 4);
            assert_eq!(series.get(day(1)), Some(1.0));
            assert_eq!(series.get(day(3)), Some(50.0));
        }
        FetchedCosts::Grouped(_) => panic!("Expected a total series"),
    }
}

fn by_service() -> PipelineOptions {
    PipelineOptions {
        grouping: GroupingDimension::Service,
        per_group: true,
        ..PipelineOptions::default()
    }
}

#[tokio::test]
async fn test_failed_forecast_keeps_previous_results() {
    let harness = Harness::new(
        FakeBilling { records: spiky_records(), ..FakeBilling::default() },
        FakeForecaster::new(Some(20.0)),
    );
    let mut pipeline = harness.pipeline(by_service());
    pipeline.fetch_costs().await.unwrap();
    let previous = pipeline.forecast().await.unwrap().clone();
    pipeline.detect_anomalies().await.unwrap();

    harness.forecaster.fail_forward.store(true, Ordering::SeqCst);
    let err = pipeline.forecast().await.unwrap_err();

    assert!(matches!(
        err,
        SpendcastError::Collaborator(CollaboratorError::ForecastUnavailable { status: 503, .. })
    ));
    assert_eq!(pipeline.session().forecast.as_ref(), Some(&previous));
    assert!(pipeline.session().anomalies.is_some());
    assert_eq!(pipeline.session().selected_group.as_deref(), Some("EC2"));
}

#[tokio::test]
async fn test_failed_fetch_keeps_session() {
    let harness = Harness::new(
        FakeBilling { records: spiky_records(), ..FakeBilling::default() },
        FakeForecaster::new(Some(20.0)),
    );
    let mut pipeline = harness.pipeline(PipelineOptions::default());
    pipeline.fetch_costs().await.unwrap();
    pipeline.forecast().await.unwrap();

    harness.billing.fail.store(true, Ordering::SeqCst);
    let err = pipeline.fetch_costs().await.unwrap_err();

    assert!(matches!(
        err,
        SpendcastError::Collaborator(CollaboratorError::UpstreamHttp { status: 500, .. })
    ));
    assert!(pipeline.session().costs.is_some());
    assert!(pipeline.session().forecast.is_some());
    assert_eq!(harness.billing.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_unknown_group_fails_without_committing() {
    let harness = Harness::new(
        FakeBilling { records: spiky_records(), ..FakeBilling::default() },
        FakeForecaster::new(Some(20.0)),
    );
    let options = PipelineOptions { group: Some("Lambda".to_string()), ..by_service() };
    let mut pipeline = harness.pipeline(options);

    let err = pipeline.fetch_costs().await.unwrap_err();

    assert!(matches!(err, SpendcastError::UnknownGroup(ref key) if key == "Lambda"));
    assert!(pipeline.session().costs.is_none());
}

#[test]
fn test_unsupported_grouping_fails_before_network() {
    let mut settings = Settings::default();
    settings.pipeline.grouping = "region".to_string();
    let err = PipelineOptions::from_settings(&settings).unwrap_err();

    assert!(matches!(err, SpendcastError::UnsupportedGrouping(_)));
    assert!(err.to_string().contains("region"));
}

#[tokio::test]
async fn test_explain_requires_detection() {
    let harness = Harness::new(
        FakeBilling { records: spiky_records(), ..FakeBilling::default() },
        FakeForecaster::new(Some(20.0)),
    );
    let mut pipeline = harness.pipeline(PipelineOptions::default());
    pipeline.fetch_costs().await.unwrap();

    let err = pipeline.explain_anomalies().await.unwrap_err();

    assert!(matches!(err, SpendcastError::MissingAnomalies));
    assert!(harness.narrator.prompts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_explain_with_no_anomalies_still_asks() {
    let harness = Harness::new(
        FakeBilling { records: spiky_records(), ..FakeBilling::default() },
        FakeForecaster::new(Some(1000.0)),
    );
    let mut pipeline = harness.pipeline(PipelineOptions::default());
    pipeline.fetch_costs().await.unwrap();
    assert!(pipeline.detect_anomalies().await.unwrap().is_empty());

    let text = pipeline.explain_anomalies().await.unwrap();

    assert_eq!(text, "Probably a batch job.");
    assert!(harness.narrator.prompts.lock().unwrap()[0].contains("No anomalies"));
}

#[tokio::test]
async fn test_insample_without_upper_bound_is_malformed() {
    let harness = Harness::new(
        FakeBilling { records: spiky_records(), ..FakeBilling::default() },
        FakeForecaster::new(None),
    );
    let mut pipeline = harness.pipeline(PipelineOptions::default());
    pipeline.fetch_costs().await.unwrap();

    let err = pipeline.detect_anomalies().await.unwrap_err();

    assert!(matches!(
        err,
        SpendcastError::Collaborator(CollaboratorError::MalformedResponse(_))
    ));
    assert!(pipeline.session().anomalies.is_none());
    assert!(pipeline.session().insample.is_none());
}

#[tokio::test]
async fn test_actions_before_fetch_report_missing_series() {
    let harness = Harness::new(FakeBilling::default(), FakeForecaster::new(Some(1.0)));
    let mut pipeline = harness.pipeline(PipelineOptions::default());

    assert!(matches!(pipeline.forecast().await, Err(SpendcastError::MissingSeries)));
    assert!(matches!(pipeline.detect_anomalies().await, Err(SpendcastError::MissingSeries)));
    assert!(harness.forecaster.requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_empty_fetch_cannot_be_forecast() {
    let harness = Harness::new(FakeBilling::default(), FakeForecaster::new(Some(1.0)));
    let mut pipeline = harness.pipeline(PipelineOptions::default());
    pipeline.fetch_costs().await.unwrap();

    assert!(matches!(pipeline.forecast().await, Err(SpendcastError::EmptySeries(_))));
}

#[tokio::test]
async fn test_select_group_switches_active_series() {
    let harness = Harness::new(
        FakeBilling { records: spiky_records(), ..FakeBilling::default() },
        FakeForecaster::new(Some(20.0)),
    );
    let mut pipeline = harness.pipeline(by_service());
    pipeline.fetch_costs().await.unwrap();
    assert_eq!(pipeline.session().group_keys(), vec!["EC2", "S3"]);

    pipeline.select_group("S3").unwrap();
    let report = pipeline.detect_anomalies().await.unwrap();

    assert_eq!(report.dates, vec![day(1), day(2)]);
    assert!(matches!(pipeline.select_group("RDS"), Err(SpendcastError::UnknownGroup(_))));
    assert_eq!(pipeline.session().selected_group.as_deref(), Some("S3"));
}

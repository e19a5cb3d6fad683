//! Integration tests for the HTTP forecaster against a mock server.

use chrono::NaiveDate;
use mockito::Matcher;
use serde_json::json;
use spendcast_abstraction::{
    CollaboratorError, ExogenousMatrix, ForecastMode, ForecastRequest, Forecaster, Series,
};
use spendcast_clients::HttpForecaster;

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 3, d).unwrap()
}

fn request() -> ForecastRequest {
    let series: Series = vec![(day(1), 10.0), (day(2), 11.0), (day(3), 12.0)].into_iter().collect();
    ForecastRequest::new(series, 2).with_finetune_steps(1)
}

fn forecaster(server: &mockito::Server) -> HttpForecaster {
    HttpForecaster::new(
        Some(format!("{}/forecast", server.url())),
        Some(format!("{}/insample", server.url())),
    )
}

#[tokio::test]
async fn test_forward_forecast_sends_wire_payload() {
    let mut server = mockito::Server::new_async().await;
    let exogenous: ExogenousMatrix = (1..=5).map(|d| (day(d), vec![f64::from(u8::from(d == 1))])).collect();

    let mock = server
        .mock("POST", "/forecast")
        .match_body(Matcher::Json(json!({
            "y": {"2023-03-01": 10.0, "2023-03-02": 11.0, "2023-03-03": 12.0},
            "fh": 2,
            "level": [90],
            "finetune_steps": 1,
            "x": {
                "2023-03-01": [1.0],
                "2023-03-02": [0.0],
                "2023-03-03": [0.0],
                "2023-03-04": [0.0],
                "2023-03-05": [0.0]
            }
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{
                "timestamp": ["2023-03-04", "2023-03-05"],
                "value": [12.5, 13.0],
                "lo-90": [11.0, 11.5],
                "hi-90": [14.0, 14.5]
            }"#,
        )
        .create_async()
        .await;

    let result = forecaster(&server)
        .forecast(&request().with_exogenous(exogenous), ForecastMode::Forward)
        .await
        .unwrap();

    assert_eq!(result.timestamps(), &[day(4), day(5)]);
    assert_eq!(result.point(), &[12.5, 13.0]);
    assert_eq!(result.upper(), Some(&[14.0, 14.5][..]));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_insample_mode_uses_insample_endpoint() {
    let mut server = mockito::Server::new_async().await;
    let forward = server.mock("POST", "/forecast").expect(0).create_async().await;
    let insample = server
        .mock("POST", "/insample")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{
                "timestamp": ["2023-03-01", "2023-03-02", "2023-03-03"],
                "value": [10.0, 10.5, 11.0],
                "lo-90": [9.0, 9.5, 10.0],
                "hi-90": [11.0, 11.5, 12.0]
            }"#,
        )
        .create_async()
        .await;

    let result = forecaster(&server).forecast(&request(), ForecastMode::InSample).await.unwrap();

    assert_eq!(result.len(), 3);
    forward.assert_async().await;
    insample.assert_async().await;
}

#[tokio::test]
async fn test_missing_bounds_are_accepted() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/forecast")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"timestamp": ["2023-03-04", "2023-03-05"], "value": [1.0, 2.0]}"#)
        .create_async()
        .await;

    let result = forecaster(&server).forecast(&request(), ForecastMode::Forward).await.unwrap();

    assert!(result.lower().is_none());
    assert_eq!(result.lower_or_zeros(), vec![0.0, 0.0]);
    assert_eq!(result.upper_or_zeros(), vec![0.0, 0.0]);
}

#[tokio::test]
async fn test_error_status_is_forecast_unavailable_and_not_retried() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/forecast")
        .with_status(503)
        .with_body("model is loading")
        .expect(1)
        .create_async()
        .await;

    let err = forecaster(&server).forecast(&request(), ForecastMode::Forward).await.unwrap_err();

    assert_eq!(
        err,
        CollaboratorError::ForecastUnavailable { status: 503, message: "model is loading".to_string() }
    );
    mock.assert_async().await;
}

#[tokio::test]
async fn test_identical_requests_are_cached_per_endpoint() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/forecast")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"timestamp": ["2023-03-04"], "value": [1.0]}"#)
        .expect(2)
        .create_async()
        .await;

    let forecaster = forecaster(&server);
    let first = forecaster.forecast(&request(), ForecastMode::Forward).await.unwrap();
    let again = forecaster.forecast(&request(), ForecastMode::Forward).await.unwrap();
    assert_eq!(first, again);

    // A different payload is a different cache key.
    let longer = request().with_finetune_steps(5);
    forecaster.forecast(&longer, ForecastMode::Forward).await.unwrap();

    let stats = forecaster.cache_stats(ForecastMode::Forward);
    assert_eq!(stats.total_hits, 1);
    assert_eq!(stats.cache_size, 2);
    assert_eq!(forecaster.cache_stats(ForecastMode::InSample).cache_size, 0);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_missing_endpoint_is_not_configured() {
    let forecaster = HttpForecaster::new(Some("http://127.0.0.1:9/forecast".to_string()), None);
    let err = forecaster.forecast(&request(), ForecastMode::InSample).await.unwrap_err();
    assert_eq!(
        err,
        CollaboratorError::NotConfigured("INSAMPLE_FORECAST_URL is not set".to_string())
    );
}

#[tokio::test]
async fn test_mismatched_lengths_are_malformed() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/forecast")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"timestamp": ["2023-03-04", "2023-03-05"], "value": [1.0], "hi-90": [2.0, 3.0]}"#)
        .create_async()
        .await;

    let err = forecaster(&server).forecast(&request(), ForecastMode::Forward).await.unwrap_err();
    assert!(matches!(err, CollaboratorError::MalformedResponse(_)));
}

use std::time::Duration;

use collector_engine::{FetchDescriptor, FetchError, FetchSettings, Fetcher, ReqwestFetcher};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn post_json_round_trips_a_decoded_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/list"))
        .and(body_partial_json(json!({"from": 0, "to": 10})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}])))
        .mount(&server)
        .await;

    let fetcher = ReqwestFetcher::new(&FetchSettings::default()).unwrap();
    let descriptor = FetchDescriptor::post_json(
        format!("{}/list", server.uri()),
        json!({"from": 0, "to": 10}),
    );

    let body = fetcher.fetch(&descriptor).await.expect("fetch ok");
    assert_eq!(body, json!([{"id": 1}]));
}

#[tokio::test]
async fn http_status_failures_are_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let fetcher = ReqwestFetcher::new(&FetchSettings::default()).unwrap();
    let descriptor = FetchDescriptor::get(format!("{}/missing", server.uri()));

    let err = fetcher.fetch(&descriptor).await.unwrap_err();
    assert_eq!(err, FetchError::HttpStatus(404));
}

#[tokio::test]
async fn non_json_bodies_fail_to_decode() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/html"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>nope</html>"))
        .mount(&server)
        .await;

    let fetcher = ReqwestFetcher::new(&FetchSettings::default()).unwrap();
    let descriptor = FetchDescriptor::get(format!("{}/html", server.uri()));

    let err = fetcher.fetch(&descriptor).await.unwrap_err();
    assert!(matches!(err, FetchError::Decode(_)));
}

#[tokio::test]
async fn slow_responses_time_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(250))
                .set_body_json(json!([])),
        )
        .mount(&server)
        .await;

    let settings = FetchSettings {
        request_timeout: Duration::from_millis(50),
        ..FetchSettings::default()
    };
    let fetcher = ReqwestFetcher::new(&settings).unwrap();
    let descriptor = FetchDescriptor::get(format!("{}/slow", server.uri()));

    let err = fetcher.fetch(&descriptor).await.unwrap_err();
    assert!(matches!(err, FetchError::Timeout(_)));
}

mod common;

use std::time::Duration;

use common::{POWER_PATH, date, power_payload, test_config};
use weather_outlook::{
    config::ServiceConfig,
    data::power::{PowerClient, PowerQuery},
    error::UpstreamError,
};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path, query_param},
};

fn query(parameters: &[String]) -> PowerQuery<'_> {
    PowerQuery {
        latitude: 40.7,
        longitude: -74.0,
        start: date(2024, 6, 15),
        end: date(2024, 6, 15),
        parameters,
    }
}

fn t2m() -> Vec<String> {
    vec!["T2M".to_string()]
}

async fn mount(server: &MockServer, response: ResponseTemplate, expected: u64) {
    Mock::given(method("GET"))
        .and(path(POWER_PATH))
        .respond_with(response)
        .expect(expected)
        .mount(server)
        .await;
}

#[tokio::test]
async fn sends_point_query_parameters() {
    let server = MockServer::start().await;
    let day = date(2024, 6, 15);
    Mock::given(method("GET"))
        .and(path(POWER_PATH))
        .and(query_param("parameters", "T2M,RH2M"))
        .and(query_param("community", "RE"))
        .and(query_param("latitude", "40.7"))
        .and(query_param("longitude", "-74"))
        .and(query_param("start", "20240615"))
        .and(query_param("end", "20240615"))
        .and(query_param("format", "JSON"))
        .respond_with(ResponseTemplate::new(200).set_body_json(power_payload(
            day,
            &[("T2M", vec![21.0]), ("RH2M", vec![50.0])],
        )))
        .expect(1)
        .mount(&server)
        .await;

    let client = PowerClient::new(&test_config(&server));
    let parameters = vec!["T2M".to_string(), "RH2M".to_string()];
    let dataset = client.fetch(query(&parameters)).await.unwrap();

    assert_eq!(dataset.series["T2M"].value_at_hour(0), Some(21.0));
    assert_eq!(dataset.units_for("RH2M"), Some("%"));
    assert_eq!(dataset.fill_value, -999.0);
}

#[tokio::test]
async fn server_error_is_retried_until_success() {
    let server = MockServer::start().await;
    let day = date(2024, 6, 15);
    Mock::given(method("GET"))
        .and(path(POWER_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("busy"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    mount(
        &server,
        ResponseTemplate::new(200).set_body_json(power_payload(day, &[("T2M", vec![19.5])])),
        1,
    )
    .await;

    let client = PowerClient::new(&test_config(&server));
    let parameters = t2m();
    let dataset = client.fetch(query(&parameters)).await.unwrap();

    assert_eq!(dataset.series["T2M"].value_at_hour(0), Some(19.5));
}

#[tokio::test]
async fn bad_request_is_not_retried() {
    let server = MockServer::start().await;
    mount(
        &server,
        ResponseTemplate::new(400).set_body_string("unknown parameter FOO"),
        1,
    )
    .await;

    let client = PowerClient::new(&test_config(&server));
    let parameters = t2m();
    let err = client.fetch(query(&parameters)).await.unwrap_err();

    let UpstreamError::BadRequest { status, message } = err else {
        panic!("expected BadRequest, got {err:?}");
    };
    assert_eq!(status, 400);
    assert_eq!(message, "unknown parameter FOO");
}

#[tokio::test]
async fn rate_limit_is_not_retried() {
    let server = MockServer::start().await;
    mount(&server, ResponseTemplate::new(429), 1).await;

    let client = PowerClient::new(&test_config(&server));
    let parameters = t2m();
    let err = client.fetch(query(&parameters)).await.unwrap_err();

    assert_eq!(err, UpstreamError::RateLimited);
}

#[tokio::test]
async fn persistent_unavailability_exhausts_attempts() {
    let server = MockServer::start().await;
    mount(&server, ResponseTemplate::new(503), 3).await;

    let client = PowerClient::new(&test_config(&server));
    let parameters = t2m();
    let err = client.fetch(query(&parameters)).await.unwrap_err();

    assert!(matches!(
        err,
        UpstreamError::Unavailable {
            status: Some(503),
            ..
        }
    ));
}

#[tokio::test]
async fn unparseable_body_is_reported_without_retry() {
    let server = MockServer::start().await;
    mount(
        &server,
        ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"),
        1,
    )
    .await;

    let client = PowerClient::new(&test_config(&server));
    let parameters = t2m();
    let err = client.fetch(query(&parameters)).await.unwrap_err();

    assert!(matches!(
        err,
        UpstreamError::Unavailable {
            status: Some(200),
            ..
        }
    ));
}

#[tokio::test]
async fn slow_upstream_times_out() {
    let server = MockServer::start().await;
    mount(
        &server,
        ResponseTemplate::new(200).set_delay(Duration::from_millis(2500)),
        2,
    )
    .await;

    let config = ServiceConfig {
        upstream_timeout_secs: 1,
        max_attempts: 2,
        ..test_config(&server)
    };
    let client = PowerClient::new(&config);
    let parameters = t2m();
    let err = client.fetch(query(&parameters)).await.unwrap_err();

    assert_eq!(err, UpstreamError::Timeout);
}

#![allow(dead_code)]

use chrono::NaiveDate;
use serde_json::{Map, Value, json};
use weather_outlook::{
    config::ServiceConfig,
    domain::{
        request::{OutputFormat, WeatherRequest},
        weather::default_units,
    },
};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path, query_param},
};

pub const POWER_PATH: &str = "/api/temporal/hourly/point";

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid fixture date")
}

/// Points the service at the mock server with short retry delays.
pub fn test_config(server: &MockServer) -> ServiceConfig {
    ServiceConfig {
        power_base_url: format!("{}{POWER_PATH}", server.uri()),
        retry_base_delay_ms: 10,
        upstream_timeout_secs: 5,
        request_timeout_secs: 30,
        ..ServiceConfig::default()
    }
}

pub fn weather_request(date: NaiveDate, parameters: &[&str], historical_years: u32) -> WeatherRequest {
    WeatherRequest {
        latitude: 40.7,
        longitude: -74.0,
        date,
        parameters: parameters.iter().map(|p| (*p).to_string()).collect(),
        historical_years,
        format: OutputFormat::Json,
    }
}

/// A NASA POWER hourly response for one day. `values[h]` is hour `h`; hours
/// past the end of the slice are absent from the payload.
pub fn power_payload(date: NaiveDate, parameters: &[(&str, Vec<f64>)]) -> Value {
    let mut parameter = Map::new();
    let mut info = Map::new();
    for (name, values) in parameters {
        let hours: Map<String, Value> = values
            .iter()
            .enumerate()
            .map(|(hour, value)| (format!("{}{hour:02}", date.format("%Y%m%d")), json!(value)))
            .collect();
        parameter.insert((*name).to_string(), Value::Object(hours));
        info.insert(
            (*name).to_string(),
            json!({ "units": default_units(name), "longname": name }),
        );
    }

    json!({
        "type": "Feature",
        "geometry": { "type": "Point", "coordinates": [-74.0, 40.7, 12.5] },
        "properties": { "parameter": parameter },
        "header": { "title": "NASA/POWER fixture", "fill_value": -999.0 },
        "parameters": info
    })
}

/// Answers requests whose `start` is `date` with `body`.
pub async fn mount_day(server: &MockServer, date: NaiveDate, body: Value) {
    mount_response(server, date, ResponseTemplate::new(200).set_body_json(body)).await;
}

pub async fn mount_response(server: &MockServer, date: NaiveDate, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(POWER_PATH))
        .and(query_param("start", date.format("%Y%m%d").to_string()))
        .respond_with(response)
        .mount(server)
        .await;
}

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;

use crate::{
    config::ServiceConfig,
    domain::weather::{DEFAULT_FILL_VALUE, HourKey, Location, ParameterSeries, PowerDataset},
    error::UpstreamError,
    resilience::backoff::Backoff,
};

/// Client for the NASA POWER hourly point endpoint.
#[derive(Debug, Clone)]
pub struct PowerClient {
    client: Client,
    base_url: String,
    community: String,
    retry_base_delay: std::time::Duration,
    max_attempts: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct PowerQuery<'a> {
    pub latitude: f64,
    pub longitude: f64,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub parameters: &'a [String],
}

impl PowerClient {
    pub fn new(config: &ServiceConfig) -> Self {
        Self {
            client: Client::builder()
                .timeout(config.upstream_timeout())
                .build()
                .expect("reqwest client"),
            base_url: config.power_base_url.clone(),
            community: config.community.clone(),
            retry_base_delay: config.retry_base_delay(),
            max_attempts: config.max_attempts,
        }
    }

    /// Fetches one date range, retrying transient failures on a linear schedule.
    pub async fn fetch(&self, query: PowerQuery<'_>) -> Result<PowerDataset, UpstreamError> {
        let mut backoff = Backoff::linear(self.retry_base_delay, self.max_attempts);
        loop {
            let attempt = backoff.attempt();
            tracing::debug!(
                start = %query.start,
                end = %query.end,
                attempt,
                "requesting NASA POWER data"
            );

            let err = match self.attempt(&query).await {
                Ok(dataset) => return Ok(dataset),
                Err(err) => err,
            };

            if !err.is_retryable() {
                return Err(err);
            }
            let Some(delay) = backoff.next_delay() else {
                tracing::warn!(
                    start = %query.start,
                    attempts = attempt,
                    error = %err,
                    "NASA POWER retries exhausted"
                );
                return Err(err);
            };
            tracing::debug!(delay_ms = delay.as_millis(), error = %err, "retrying NASA POWER request");
            tokio::time::sleep(delay).await;
        }
    }

    async fn attempt(&self, query: &PowerQuery<'_>) -> Result<PowerDataset, UpstreamError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("parameters", query.parameters.join(",")),
                ("community", self.community.clone()),
                ("longitude", query.longitude.to_string()),
                ("latitude", query.latitude.to_string()),
                ("start", compact_date(query.start)),
                ("end", compact_date(query.end)),
                ("format", "JSON".to_string()),
            ])
            .send()
            .await
            .map_err(|err| UpstreamError::from_transport(&err))?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::from_status(
                status.as_u16(),
                summarize_body(&body, status),
            ));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|err| UpstreamError::from_transport(&err))?;
        let payload: PowerResponse =
            serde_json::from_slice(&bytes).map_err(|err| UpstreamError::Unavailable {
                status: Some(status.as_u16()),
                message: format!("failed to parse NASA POWER payload: {err}"),
            })?;

        Ok(parse_dataset(payload))
    }
}

pub fn compact_date(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

fn summarize_body(body: &str, status: StatusCode) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return format!("NASA POWER returned {status}");
    }
    let mut summary: String = trimmed.chars().take(200).collect();
    if summary.len() < trimmed.len() {
        summary.push_str("...");
    }
    summary
}

fn parse_dataset(payload: PowerResponse) -> PowerDataset {
    let fill_value = payload
        .header
        .and_then(|h| h.fill_value)
        .unwrap_or(DEFAULT_FILL_VALUE);

    let coords = &payload.geometry.coordinates;
    let location = Location {
        longitude: coords.first().copied().unwrap_or_default(),
        latitude: coords.get(1).copied().unwrap_or_default(),
        elevation: coords.get(2).copied(),
    };

    let series = payload
        .properties
        .parameter
        .into_iter()
        .map(|(name, values)| (name, parse_series(&values, fill_value)))
        .collect();

    let units = payload
        .parameters
        .into_iter()
        .filter_map(|(name, info)| info.units.map(|units| (name, units)))
        .collect();

    PowerDataset {
        location,
        fill_value,
        series,
        units,
    }
}

/// Drops keys that are not `YYYYMMDDHH`; fill and non-numeric values become `None`.
fn parse_series(values: &HashMap<String, Value>, fill_value: f64) -> ParameterSeries {
    let mut series = ParameterSeries::new();
    for (raw_key, raw_value) in values {
        let Some(key) = HourKey::parse(raw_key) else {
            continue;
        };
        let value = raw_value
            .as_f64()
            .filter(|v| v.is_finite() && !is_fill(*v, fill_value));
        series.insert(key, value);
    }
    series
}

fn is_fill(value: f64, fill_value: f64) -> bool {
    (value - fill_value).abs() < 1e-9
}

#[derive(Debug, Deserialize)]
struct PowerResponse {
    geometry: Geometry,
    properties: Properties,
    #[serde(default)]
    parameters: BTreeMap<String, ParameterInfo>,
    #[serde(default)]
    header: Option<Header>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    coordinates: Vec<f64>,
}

#[derive(Debug, Deserialize)]
struct Properties {
    parameter: BTreeMap<String, HashMap<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct ParameterInfo {
    units: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Header {
    fill_value: Option<f64>,
}

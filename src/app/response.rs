//! JSON envelopes and CSV rendering for [`WeatherResult`].

use std::{collections::BTreeMap, time::Instant};

use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::{SecondsFormat, Utc};
use serde::{Serialize, Serializer, ser::SerializeMap};

use crate::{
    app::service::BulkOutcome,
    domain::weather::{
        DailyAggregate, DataType, Location, PredictionMetadata, ResultMetadata, WeatherResult,
    },
    error::ServiceError,
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T: Serialize> {
    pub success: bool,
    pub data: T,
    pub request_timestamp: String,
    pub processing_time: u64,
}

impl<T: Serialize> Envelope<T> {
    pub fn new(data: T, started: Instant) -> Self {
        Self {
            success: true,
            data,
            request_timestamp: timestamp(),
            processing_time: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEnvelope {
    pub success: bool,
    pub error: ErrorBody,
    pub request_timestamp: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<&ServiceError> for ErrorBody {
    fn from(err: &ServiceError) -> Self {
        Self {
            code: err.code(),
            message: err.to_string(),
            details: err.details(),
        }
    }
}

impl ErrorEnvelope {
    pub fn new(err: &ServiceError) -> Self {
        Self {
            success: false,
            error: ErrorBody::from(err),
            request_timestamp: timestamp(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!(code = self.code(), error = %self, "request failed");
        }
        (status, Json(ErrorEnvelope::new(&self))).into_response()
    }
}

/// JSON object whose keys keep insertion order, so parameters appear in the
/// order they were requested.
#[derive(Debug)]
pub struct OrderedMap<'a, V>(Vec<(&'a str, V)>);

impl<'a, V> FromIterator<(&'a str, V)> for OrderedMap<'a, V> {
    fn from_iter<I: IntoIterator<Item = (&'a str, V)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<V: Serialize> Serialize for OrderedMap<'_, V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in &self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Wire shape of a [`WeatherResult`]. Missing hours are written as the fill value.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherResultBody<'a> {
    pub location: &'a Location,
    pub date: String,
    pub data_type: DataType,
    pub hourly_data: OrderedMap<'a, BTreeMap<String, f64>>,
    pub daily_aggregates: OrderedMap<'a, &'a DailyAggregate>,
    pub metadata: &'a ResultMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prediction_method: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub historical_years_used: Option<&'a [i32]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prediction_metadata: Option<&'a PredictionMetadata>,
}

impl<'a> WeatherResultBody<'a> {
    pub fn new(result: &'a WeatherResult) -> Self {
        let fill = result.metadata.fill_value;
        let hourly_data = result
            .parameters
            .iter()
            .map(|p| {
                let hours = p
                    .series
                    .iter()
                    .map(|(key, value)| (key.compact(), value.unwrap_or(fill)))
                    .collect();
                (p.name.as_str(), hours)
            })
            .collect();
        let daily_aggregates = result
            .parameters
            .iter()
            .map(|p| (p.name.as_str(), &p.daily))
            .collect();

        Self {
            location: &result.location,
            date: result.date.format("%Y-%m-%d").to_string(),
            data_type: result.data_type,
            hourly_data,
            daily_aggregates,
            metadata: &result.metadata,
            prediction_method: result.prediction_method(),
            historical_years_used: result.historical_years_used.as_deref(),
            prediction_metadata: result.prediction_metadata.as_ref(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BulkResultBody<'a> {
    pub index: usize,
    pub data: WeatherResultBody<'a>,
}

#[derive(Debug, Serialize)]
pub struct BulkErrorBody {
    pub index: usize,
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct BulkSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
}

#[derive(Debug, Serialize)]
pub struct BulkBody<'a> {
    pub results: Vec<BulkResultBody<'a>>,
    pub errors: Vec<BulkErrorBody>,
    pub summary: BulkSummary,
}

impl<'a> BulkBody<'a> {
    pub fn new(outcome: &'a BulkOutcome) -> Self {
        let results: Vec<_> = outcome
            .results
            .iter()
            .map(|(index, result)| BulkResultBody {
                index: *index,
                data: WeatherResultBody::new(result),
            })
            .collect();
        let errors: Vec<_> = outcome
            .errors
            .iter()
            .map(|(index, err)| BulkErrorBody {
                index: *index,
                error: ErrorBody::from(err),
            })
            .collect();
        let summary = BulkSummary {
            total: results.len() + errors.len(),
            successful: results.len(),
            failed: errors.len(),
        };
        Self {
            results,
            errors,
            summary,
        }
    }
}

pub fn json_response(result: &WeatherResult, started: Instant) -> Response {
    Json(Envelope::new(WeatherResultBody::new(result), started)).into_response()
}

pub fn csv_response(result: &WeatherResult) -> Response {
    let disposition = format!("attachment; filename=\"{}\"", csv_filename(result));
    (
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        render_csv(result),
    )
        .into_response()
}

pub fn csv_filename(result: &WeatherResult) -> String {
    format!(
        "weather_{}_{}_{}.csv",
        result.date.format("%Y-%m-%d"),
        result.location.latitude,
        result.location.longitude
    )
}

/// Comment header, a daily summary table and an hourly table. Columns follow
/// the order the parameters were requested in.
pub fn render_csv(result: &WeatherResult) -> String {
    let fill = result.metadata.fill_value;
    let mut lines = vec![
        format!(
            "# Location: {}, {}",
            result.location.latitude, result.location.longitude
        ),
        format!("# Date: {}", result.date.format("%Y-%m-%d")),
        format!("# Data type: {}", result.data_type.as_str()),
        format!("# Source: {}", result.metadata.source),
    ];
    if let Some(elevation) = result.location.elevation {
        lines.push(format!("# Elevation: {elevation}"));
    }
    if let Some(method) = result.prediction_method() {
        lines.push(format!("# Prediction method: {method}"));
    }
    if let Some(prediction) = &result.prediction_metadata {
        lines.push(format!(
            "# Historical years used: {} ({})",
            prediction.years_used, prediction.date_range
        ));
        lines.push(format!("# Reliability: {}", prediction.reliability.as_str()));
    }
    lines.push(format!("# Fill value: {fill}"));
    lines.push(String::new());

    lines.push("Parameter,Min,Max,Mean,Units".to_string());
    for parameter in &result.parameters {
        let daily = &parameter.daily;
        lines.push(format!(
            "{},{},{},{},{}",
            parameter.name,
            format_optional(daily.min),
            format_optional(daily.max),
            format_optional(daily.mean),
            daily.units
        ));
    }
    lines.push(String::new());

    let mut header = vec!["Hour".to_string()];
    header.extend(result.parameter_names().map(str::to_string));
    lines.push(header.join(","));

    let hours: Vec<Vec<Option<f64>>> = result
        .parameters
        .iter()
        .map(|p| p.series.iter().map(|(_, value)| value).collect())
        .collect();
    for hour in 0..24usize {
        let mut row = vec![hour.to_string()];
        row.extend(hours.iter().map(|values| {
            let value = values.get(hour).copied().flatten().unwrap_or(fill);
            value.to_string()
        }));
        lines.push(row.join(","));
    }

    lines.join("\n")
}

fn format_optional(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::{UpstreamError, YearFailure},
        test_support::{historical_result, prediction_result},
    };

    fn body_json(result: &WeatherResult) -> serde_json::Value {
        serde_json::to_value(WeatherResultBody::new(result)).unwrap()
    }

    #[test]
    fn historical_body_writes_fill_for_missing_hours() {
        let json = body_json(&historical_result());

        assert_eq!(json["date"], "2025-06-15");
        assert_eq!(json["dataType"], "historical");
        assert_eq!(json["location"]["elevation"], 12.5);
        assert_eq!(json["hourlyData"]["RH2M"]["2025061500"], -999.0);
        assert_eq!(json["hourlyData"]["RH2M"]["2025061506"], 60.0);
        assert_eq!(json["hourlyData"]["T2M"]["2025061523"], 21.5);
        assert_eq!(json["hourlyData"]["T2M"].as_object().unwrap().len(), 24);
        assert_eq!(json["dailyAggregates"]["T2M"]["mean"], 15.75);
        assert_eq!(json["metadata"]["fillValue"], -999.0);
        assert!(json.get("predictionMethod").is_none());
        assert!(json.get("predictionMetadata").is_none());
        assert!(json["dailyAggregates"]["T2M"].get("confidence").is_none());
    }

    #[test]
    fn parameter_keys_follow_request_order() {
        let result = historical_result();
        let rendered = serde_json::to_string(&WeatherResultBody::new(&result)).unwrap();
        let hourly = rendered.find("\"hourlyData\"").unwrap();
        let daily = rendered.find("\"dailyAggregates\"").unwrap();

        let hourly_t2m = hourly + rendered[hourly..].find("\"T2M\"").unwrap();
        let hourly_rh2m = hourly + rendered[hourly..].find("\"RH2M\"").unwrap();
        assert!(hourly_t2m < hourly_rh2m);

        let daily_t2m = daily + rendered[daily..].find("\"T2M\"").unwrap();
        let daily_rh2m = daily + rendered[daily..].find("\"RH2M\"").unwrap();
        assert!(daily_t2m < daily_rh2m);
    }

    #[test]
    fn prediction_body_carries_prediction_fields() {
        let json = body_json(&prediction_result());

        assert_eq!(json["dataType"], "prediction");
        assert_eq!(json["predictionMethod"], "historical_average");
        assert_eq!(json["historicalYearsUsed"].as_array().unwrap().len(), 20);
        assert_eq!(json["predictionMetadata"]["reliability"], "high");
        assert_eq!(json["predictionMetadata"]["dateRange"], "2005-2024");
        assert_eq!(json["predictionMetadata"]["yearsUsed"], 20);
        assert_eq!(json["dailyAggregates"]["T2M"]["confidence"], "medium");
        assert_eq!(json["dailyAggregates"]["T2M"]["standardDeviation"], 1.5);
    }

    #[test]
    fn envelope_reports_timing_fields() {
        let result = historical_result();
        let json =
            serde_json::to_value(Envelope::new(WeatherResultBody::new(&result), Instant::now()))
                .unwrap();
        assert_eq!(json["success"], true);
        assert!(json["processingTime"].is_u64());
        assert!(json["requestTimestamp"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn error_envelope_includes_year_details() {
        let err = ServiceError::AllYearsFailed(vec![YearFailure {
            year: 2024,
            reason: "upstream request timed out".to_string(),
        }]);
        let json = serde_json::to_value(ErrorEnvelope::new(&err)).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"]["code"], "ALL_HISTORICAL_YEARS_FAILED");
        assert_eq!(json["error"]["details"][0]["year"], 2024);

        let err = ServiceError::from(UpstreamError::Timeout);
        let json = serde_json::to_value(ErrorEnvelope::new(&err)).unwrap();
        assert_eq!(json["error"]["code"], "UPSTREAM_TIMEOUT");
        assert!(json["error"].get("details").is_none());
    }

    #[test]
    fn csv_keeps_requested_column_order() {
        let csv = render_csv(&historical_result());
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines[0], "# Location: 40.7, -74");
        assert!(lines.contains(&"Parameter,Min,Max,Mean,Units"));
        assert!(lines.contains(&"T2M,10,21.5,15.75,C"));
        assert!(lines.contains(&"RH2M,60,60,60,%"));
        assert!(lines.contains(&"Hour,T2M,RH2M"));
        assert!(lines.contains(&"0,10,-999"));
        assert!(lines.contains(&"6,13,60"));
        assert_eq!(*lines.last().unwrap(), "23,21.5,60");
    }

    #[test]
    fn csv_header_describes_predictions() {
        let csv = render_csv(&prediction_result());
        assert!(csv.contains("# Data type: prediction"));
        assert!(csv.contains("# Prediction method: historical_average"));
        assert!(csv.contains("# Historical years used: 20 (2005-2024)"));
        assert!(csv.contains("# Reliability: high"));
    }

    #[test]
    fn csv_filename_uses_date_and_coordinates() {
        assert_eq!(
            csv_filename(&historical_result()),
            "weather_2025-06-15_40.7_-74.csv"
        );
    }

    #[test]
    fn bulk_body_summarizes_outcomes() {
        let outcome = BulkOutcome {
            results: vec![(0, historical_result()), (2, prediction_result())],
            errors: vec![(1, ServiceError::validation("latitude is required"))],
        };
        let json = serde_json::to_value(BulkBody::new(&outcome)).unwrap();
        assert_eq!(json["summary"]["total"], 3);
        assert_eq!(json["summary"]["successful"], 2);
        assert_eq!(json["summary"]["failed"], 1);
        assert_eq!(json["results"][1]["index"], 2);
        assert_eq!(json["errors"][0]["index"], 1);
        assert_eq!(json["errors"][0]["error"]["code"], "VALIDATION_ERROR");
    }
}

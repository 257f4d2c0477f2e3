use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::Deserialize;

use crate::{config::ServiceConfig, error::ServiceError};

static DATE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})-(\d{1,2})-(\d{1,2})$").expect("date pattern"));

static PARAMETER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z0-9_]+$").expect("parameter pattern"));

/// First day of the provider's hourly archive.
pub static EARLIEST_DATE: LazyLock<NaiveDate> =
    LazyLock::new(|| NaiveDate::from_ymd_opt(2001, 1, 1).expect("archive start"));

pub const MAX_PARAMETERS: usize = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Csv,
}

/// A request that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherRequest {
    pub latitude: f64,
    pub longitude: f64,
    pub date: NaiveDate,
    pub parameters: Vec<String>,
    pub historical_years: u32,
    pub format: OutputFormat,
}

/// Raw query string of `GET /api/weather`. Everything arrives as text so that
/// malformed numbers get the same error envelope as any other bad input.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherQuery {
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    pub date: Option<String>,
    pub parameters: Option<String>,
    pub historical_years: Option<String>,
    pub format: Option<String>,
}

impl WeatherQuery {
    pub fn validate(&self, config: &ServiceConfig) -> Result<WeatherRequest, ServiceError> {
        let latitude = parse_number("latitude", self.latitude.as_deref())?;
        let longitude = parse_number("longitude", self.longitude.as_deref())?;
        let years = match self.historical_years.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(raw.parse::<u32>().map_err(|_| {
                ServiceError::validation(format!("historicalYears must be an integer, got '{raw}'"))
            })?),
        };
        let parameters = self
            .parameters
            .as_deref()
            .map(|raw| raw.split(',').map(str::to_string).collect::<Vec<_>>());

        Ok(WeatherRequest {
            latitude: check_latitude(latitude)?,
            longitude: check_longitude(longitude)?,
            date: require_date(self.date.as_deref())?,
            parameters: normalize_parameters(parameters.as_deref(), &config.default_parameters)?,
            historical_years: check_years(years, config)?,
            format: parse_format(self.format.as_deref())?,
        })
    }
}

/// Either `"T2M,RH2M"` or `["T2M", "RH2M"]`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ParameterList {
    Joined(String),
    List(Vec<String>),
}

impl ParameterList {
    fn into_vec(self) -> Vec<String> {
        match self {
            Self::Joined(raw) => raw.split(',').map(str::to_string).collect(),
            Self::List(items) => items,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkItem {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub date: Option<String>,
    pub parameters: Option<ParameterList>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkQuery {
    #[serde(default)]
    pub requests: Vec<BulkItem>,
    pub historical_years: Option<u32>,
}

impl BulkQuery {
    /// Checks the envelope, then each item on its own so one bad entry does
    /// not reject its neighbours.
    pub fn validate(
        self,
        config: &ServiceConfig,
    ) -> Result<Vec<Result<WeatherRequest, ServiceError>>, ServiceError> {
        if self.requests.is_empty() {
            return Err(ServiceError::validation("requests must contain at least one entry"));
        }
        if self.requests.len() > config.bulk_max_requests {
            return Err(ServiceError::validation(format!(
                "at most {} requests are allowed per bulk call, got {}",
                config.bulk_max_requests,
                self.requests.len()
            )));
        }
        let years = check_years(self.historical_years, config)?;

        Ok(self
            .requests
            .into_iter()
            .map(|item| item.validate(years, config))
            .collect())
    }
}

impl BulkItem {
    fn validate(
        self,
        historical_years: u32,
        config: &ServiceConfig,
    ) -> Result<WeatherRequest, ServiceError> {
        let latitude = self
            .latitude
            .ok_or_else(|| ServiceError::validation("latitude is required"))?;
        let longitude = self
            .longitude
            .ok_or_else(|| ServiceError::validation("longitude is required"))?;
        let parameters = self.parameters.map(ParameterList::into_vec);

        Ok(WeatherRequest {
            latitude: check_latitude(latitude)?,
            longitude: check_longitude(longitude)?,
            date: require_date(self.date.as_deref())?,
            parameters: normalize_parameters(parameters.as_deref(), &config.default_parameters)?,
            historical_years,
            format: OutputFormat::Json,
        })
    }
}

/// Accepts `YYYY-M-D` with one- or two-digit month and day.
pub fn normalize_date(raw: &str) -> Result<NaiveDate, ServiceError> {
    let invalid = || ServiceError::validation(format!("date must be YYYY-MM-DD, got '{raw}'"));
    let caps = DATE_PATTERN.captures(raw.trim()).ok_or_else(invalid)?;

    let year: i32 = caps[1].parse().map_err(|_| invalid())?;
    let month: u32 = caps[2].parse().map_err(|_| invalid())?;
    let day: u32 = caps[3].parse().map_err(|_| invalid())?;

    let date = NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| ServiceError::validation(format!("'{raw}' is not a calendar date")))?;
    if date < *EARLIEST_DATE {
        return Err(ServiceError::validation(format!(
            "date must be on or after {}",
            *EARLIEST_DATE
        )));
    }
    Ok(date)
}

/// Trims, upper-cases and de-duplicates, keeping first-seen order.
pub fn normalize_parameters(
    requested: Option<&[String]>,
    defaults: &[String],
) -> Result<Vec<String>, ServiceError> {
    let Some(requested) = requested else {
        return Ok(defaults.to_vec());
    };

    let mut out: Vec<String> = Vec::new();
    for raw in requested {
        let name = raw.trim().to_ascii_uppercase();
        if name.is_empty() {
            continue;
        }
        if !PARAMETER_PATTERN.is_match(&name) {
            return Err(ServiceError::validation(format!(
                "invalid parameter name '{}'",
                raw.trim()
            )));
        }
        if !out.contains(&name) {
            out.push(name);
        }
    }

    if out.is_empty() {
        return Ok(defaults.to_vec());
    }
    if out.len() > MAX_PARAMETERS {
        return Err(ServiceError::validation(format!(
            "at most {MAX_PARAMETERS} parameters are allowed, got {}",
            out.len()
        )));
    }
    Ok(out)
}

fn require_date(raw: Option<&str>) -> Result<NaiveDate, ServiceError> {
    match raw {
        Some(raw) if !raw.trim().is_empty() => normalize_date(raw),
        _ => Err(ServiceError::validation("date is required")),
    }
}

fn parse_number(field: &str, raw: Option<&str>) -> Result<f64, ServiceError> {
    let raw = raw
        .map(str::trim)
        .filter(|raw| !raw.is_empty())
        .ok_or_else(|| ServiceError::validation(format!("{field} is required")))?;
    raw.parse::<f64>()
        .map_err(|_| ServiceError::validation(format!("{field} must be a number, got '{raw}'")))
}

fn check_latitude(value: f64) -> Result<f64, ServiceError> {
    if value.is_finite() && (-90.0..=90.0).contains(&value) {
        Ok(value)
    } else {
        Err(ServiceError::validation(format!(
            "latitude must be between -90 and 90, got {value}"
        )))
    }
}

fn check_longitude(value: f64) -> Result<f64, ServiceError> {
    if value.is_finite() && (-180.0..=180.0).contains(&value) {
        Ok(value)
    } else {
        Err(ServiceError::validation(format!(
            "longitude must be between -180 and 180, got {value}"
        )))
    }
}

fn check_years(years: Option<u32>, config: &ServiceConfig) -> Result<u32, ServiceError> {
    let years = years.unwrap_or(config.default_historical_years);
    let range = config.min_historical_years..=config.max_historical_years;
    if range.contains(&years) {
        Ok(years)
    } else {
        Err(ServiceError::validation(format!(
            "historicalYears must be between {} and {}, got {years}",
            range.start(),
            range.end()
        )))
    }
}

fn parse_format(raw: Option<&str>) -> Result<OutputFormat, ServiceError> {
    match raw.map(|f| f.trim().to_ascii_lowercase()).as_deref() {
        None | Some("" | "json") => Ok(OutputFormat::Json),
        Some("csv") => Ok(OutputFormat::Csv),
        Some(other) => Err(ServiceError::validation(format!(
            "format must be 'json' or 'csv', got '{other}'"
        ))),
    }
}

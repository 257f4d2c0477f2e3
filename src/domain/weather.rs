use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::domain::quality::{Confidence, Reliability};

/// Sentinel NASA POWER uses for "no observation".
pub const DEFAULT_FILL_VALUE: f64 = -999.0;

pub const HOURS_PER_DAY: u8 = 24;

pub const DATA_SOURCE: &str = "NASA POWER";

pub const PREDICTION_METHOD: &str = "historical_average";

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub elevation: Option<f64>,
}

impl Location {
    pub fn from_coords(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            elevation: None,
        }
    }
}

/// One hour of one calendar day, parsed out of the provider's `YYYYMMDDHH` keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HourKey {
    pub date: NaiveDate,
    pub hour: u8,
}

impl HourKey {
    pub fn new(date: NaiveDate, hour: u8) -> Self {
        Self { date, hour }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        if raw.len() != 10 || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let date = NaiveDate::parse_from_str(&raw[..8], "%Y%m%d").ok()?;
        let hour: u8 = raw[8..].parse().ok()?;
        (hour < HOURS_PER_DAY).then_some(Self { date, hour })
    }

    pub fn compact(&self) -> String {
        format!("{}{:02}", self.date.format("%Y%m%d"), self.hour)
    }
}

/// Hourly values of one parameter. `None` marks hours the provider had no data for.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterSeries {
    values: BTreeMap<HourKey, Option<f64>>,
}

impl ParameterSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a full day, asking `value_for` for each hour 0..23.
    pub fn for_day(date: NaiveDate, mut value_for: impl FnMut(u8) -> Option<f64>) -> Self {
        let values = (0..HOURS_PER_DAY)
            .map(|hour| (HourKey::new(date, hour), value_for(hour)))
            .collect();
        Self { values }
    }

    pub fn insert(&mut self, key: HourKey, value: Option<f64>) {
        self.values.insert(key, value);
    }

    pub fn get(&self, key: &HourKey) -> Option<f64> {
        self.values.get(key).copied().flatten()
    }

    /// First value recorded at `hour` on any date.
    pub fn value_at_hour(&self, hour: u8) -> Option<f64> {
        self.values
            .iter()
            .find(|(key, _)| key.hour == hour)
            .and_then(|(_, value)| *value)
    }

    /// Restricts the series to `date`, padding absent hours so the day always has 24 entries.
    pub fn day(&self, date: NaiveDate) -> Self {
        Self::for_day(date, |hour| self.get(&HourKey::new(date, hour)))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&HourKey, Option<f64>)> {
        self.values.iter().map(|(key, value)| (key, *value))
    }

    pub fn valid_values(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.values().filter_map(|value| *value)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyAggregate {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    pub units: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<Confidence>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub standard_deviation: Option<f64>,
}

impl DailyAggregate {
    /// Min, max and mean over the non-missing hours of `series`.
    pub fn from_series(series: &ParameterSeries, units: impl Into<String>) -> Self {
        let values: Vec<f64> = series.valid_values().collect();
        let min = values.iter().copied().reduce(f64::min).map(round2);
        let max = values.iter().copied().reduce(f64::max).map(round2);
        let mean = mean(&values).map(round2);

        Self {
            min,
            max,
            mean,
            units: units.into(),
            confidence: None,
            standard_deviation: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParameterData {
    pub name: String,
    pub series: ParameterSeries,
    pub daily: DailyAggregate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Historical,
    Prediction,
}

impl DataType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Historical => "historical",
            Self::Prediction => "prediction",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionMetadata {
    pub years_used: usize,
    pub total_data_points: usize,
    pub missing_years: Vec<i32>,
    pub date_range: String,
    pub reliability: Reliability,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultMetadata {
    pub source: &'static str,
    pub community: String,
    pub parameters: Vec<String>,
    pub fill_value: f64,
    pub data_delay_days: u32,
}

/// Everything one request produces, historical or predicted.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherResult {
    pub location: Location,
    pub date: NaiveDate,
    pub data_type: DataType,
    pub parameters: Vec<ParameterData>,
    pub metadata: ResultMetadata,
    pub historical_years_used: Option<Vec<i32>>,
    pub prediction_metadata: Option<PredictionMetadata>,
}

impl WeatherResult {
    pub fn parameter(&self, name: &str) -> Option<&ParameterData> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn parameter_names(&self) -> impl Iterator<Item = &str> {
        self.parameters.iter().map(|p| p.name.as_str())
    }

    pub fn prediction_method(&self) -> Option<&'static str> {
        matches!(self.data_type, DataType::Prediction).then_some(PREDICTION_METHOD)
    }
}

/// Parsed upstream payload for one date range.
#[derive(Debug, Clone, PartialEq)]
pub struct PowerDataset {
    pub location: Location,
    pub fill_value: f64,
    pub series: BTreeMap<String, ParameterSeries>,
    pub units: BTreeMap<String, String>,
}

impl PowerDataset {
    pub fn units_for(&self, parameter: &str) -> Option<&str> {
        self.units.get(parameter).map(String::as_str)
    }
}

/// Outcome of fetching one historical year.
#[derive(Debug, Clone)]
pub struct YearDataset {
    pub year: i32,
    pub outcome: Result<PowerDataset, String>,
}

impl YearDataset {
    pub fn data(&self) -> Option<&PowerDataset> {
        self.outcome.as_ref().ok()
    }

    pub fn error(&self) -> Option<&str> {
        self.outcome.as_ref().err().map(String::as_str)
    }
}

pub fn default_units(parameter: &str) -> &'static str {
    match parameter {
        "T2M" | "T2M_MAX" | "T2M_MIN" | "T2MDEW" | "T2MWET" | "TS" => "C",
        "RH2M" => "%",
        "QV2M" => "g/kg",
        "WS2M" | "WS10M" | "WS50M" => "m/s",
        "WD2M" | "WD10M" | "WD50M" => "Degrees",
        "PRECTOTCORR" => "mm/hour",
        "PS" => "kPa",
        "ALLSKY_SFC_SW_DWN" | "CLRSKY_SFC_SW_DWN" => "Wh/m^2",
        _ => "unknown",
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    #[allow(clippy::cast_precision_loss)]
    let count = values.len() as f64;
    Some(values.iter().sum::<f64>() / count)
}

/// Population standard deviation; zero for fewer than two samples.
pub fn std_dev(values: &[f64]) -> f64 {
    let Some(avg) = mean(values) else {
        return 0.0;
    };
    if values.len() <= 1 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let variance =
        values.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

use chrono::NaiveDate;

use crate::domain::{
    quality::{Confidence, Reliability},
    weather::{
        DATA_SOURCE, DEFAULT_FILL_VALUE, DailyAggregate, DataType, Location, ParameterData,
        ParameterSeries, PredictionMetadata, ResultMetadata, WeatherResult,
    },
};

pub(crate) fn fixture_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 15).expect("valid fixture date")
}

fn parameter(name: &str, units: &str, value_for: impl FnMut(u8) -> Option<f64>) -> ParameterData {
    let series = ParameterSeries::for_day(fixture_date(), value_for);
    ParameterData {
        name: name.to_string(),
        daily: DailyAggregate::from_series(&series, units),
        series,
    }
}

/// Two parameters; RH2M is missing before 06:00.
pub(crate) fn historical_result() -> WeatherResult {
    WeatherResult {
        location: Location {
            latitude: 40.7,
            longitude: -74.0,
            elevation: Some(12.5),
        },
        date: fixture_date(),
        data_type: DataType::Historical,
        parameters: vec![
            parameter("T2M", "C", |hour| Some(10.0 + f64::from(hour) * 0.5)),
            parameter("RH2M", "%", |hour| (hour >= 6).then_some(60.0)),
        ],
        metadata: ResultMetadata {
            source: DATA_SOURCE,
            community: "RE".to_string(),
            parameters: vec!["T2M".to_string(), "RH2M".to_string()],
            fill_value: DEFAULT_FILL_VALUE,
            data_delay_days: 4,
        },
        historical_years_used: None,
        prediction_metadata: None,
    }
}

pub(crate) fn prediction_result() -> WeatherResult {
    let mut result = historical_result();
    result.data_type = DataType::Prediction;
    for p in &mut result.parameters {
        p.daily.confidence = Some(Confidence::Medium);
        p.daily.standard_deviation = Some(1.5);
    }
    result.historical_years_used = Some((2005..2025).collect());
    result.prediction_metadata = Some(PredictionMetadata {
        years_used: 20,
        total_data_points: 960,
        missing_years: Vec::new(),
        date_range: "2005-2024".to_string(),
        reliability: Reliability::High,
    });
    result
}

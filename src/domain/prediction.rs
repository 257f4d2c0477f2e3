use chrono::NaiveDate;

use crate::domain::{
    quality::{evaluate_confidence, evaluate_reliability},
    weather::{
        DailyAggregate, HOURS_PER_DAY, ParameterData, ParameterSeries, PowerDataset,
        PredictionMetadata, YearDataset, default_units, mean, round2, std_dev,
    },
};

#[derive(Debug, Clone, PartialEq)]
pub struct PredictedDataset {
    pub parameters: Vec<ParameterData>,
    pub years_used: Vec<i32>,
}

/// Per-hour means across the successful years, shaped like a single observed day.
///
/// Hours are matched by hour-of-day only, since every year carries its own date.
/// An hour with no sample in any year stays `None`; nothing here fails on
/// missing data, it only lowers confidence and reliability.
pub fn aggregate(
    datasets: &[YearDataset],
    target: NaiveDate,
    parameters: &[String],
) -> (PredictedDataset, PredictionMetadata) {
    let successes: Vec<(i32, &PowerDataset)> = datasets
        .iter()
        .filter_map(|d| d.data().map(|data| (d.year, data)))
        .collect();

    let mut years_used: Vec<i32> = successes.iter().map(|(year, _)| *year).collect();
    years_used.sort_unstable();
    let mut missing_years: Vec<i32> = datasets
        .iter()
        .filter(|d| d.data().is_none())
        .map(|d| d.year)
        .collect();
    missing_years.sort_unstable();

    // Coarse dataset-wide denominator, shared by every parameter.
    let total_data_points = years_used.len() * usize::from(HOURS_PER_DAY) * parameters.len();

    let predicted = parameters
        .iter()
        .map(|name| predict_parameter(name, &successes, target, total_data_points))
        .collect();

    let date_range = match (years_used.first(), years_used.last()) {
        (Some(first), Some(last)) => format!("{first}-{last}"),
        _ => String::new(),
    };

    let metadata = PredictionMetadata {
        years_used: years_used.len(),
        total_data_points,
        missing_years,
        date_range,
        reliability: evaluate_reliability(years_used.len()),
    };

    (
        PredictedDataset {
            parameters: predicted,
            years_used,
        },
        metadata,
    )
}

fn predict_parameter(
    name: &str,
    successes: &[(i32, &PowerDataset)],
    target: NaiveDate,
    total_data_points: usize,
) -> ParameterData {
    let mut samples_used = 0;
    let mut hourly = [None; HOURS_PER_DAY as usize];

    for (hour, slot) in (0..HOURS_PER_DAY).zip(hourly.iter_mut()) {
        let values: Vec<f64> = successes
            .iter()
            .filter_map(|(_, data)| data.series.get(name)?.value_at_hour(hour))
            .collect();
        samples_used += values.len();
        *slot = mean(&values).map(round2);
    }

    let series = ParameterSeries::for_day(target, |hour| hourly[usize::from(hour)]);
    let predicted_values: Vec<f64> = series.valid_values().collect();

    let units = successes
        .iter()
        .find_map(|(_, data)| data.units_for(name))
        .unwrap_or_else(|| default_units(name));

    let mut daily = DailyAggregate::from_series(&series, units);
    daily.standard_deviation = Some(round2(std_dev(&predicted_values)));
    daily.confidence = Some(evaluate_confidence(samples_used, total_data_points));

    ParameterData {
        name: name.to_string(),
        series,
        daily,
    }
}

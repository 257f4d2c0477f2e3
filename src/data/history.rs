//! Same-calendar-day samples from previous years.
//!
//! Every year is requested at once and all requests are awaited together; a
//! failed year is recorded on its [`YearDataset`] instead of aborting the rest.

use chrono::{Datelike, NaiveDate};
use futures::future::join_all;

use crate::{
    data::power::{PowerClient, PowerQuery},
    domain::weather::YearDataset,
    error::{ServiceError, YearFailure},
};

#[derive(Debug, Clone)]
pub struct HistoricalFetcher {
    client: PowerClient,
    degradation_ratio: f64,
}

impl HistoricalFetcher {
    pub fn new(client: PowerClient, degradation_ratio: f64) -> Self {
        Self {
            client,
            degradation_ratio,
        }
    }

    /// Fetches `target`'s month/day for `years_count` years before `base_year`.
    ///
    /// Fails only when no year could be fetched.
    pub async fn fetch_years(
        &self,
        latitude: f64,
        longitude: f64,
        target: NaiveDate,
        base_year: i32,
        years_count: u32,
        parameters: &[String],
    ) -> Result<Vec<YearDataset>, ServiceError> {
        let dates = historical_dates(target, base_year, years_count);
        if dates.is_empty() {
            return Err(ServiceError::validation(
                "at least one historical year is required",
            ));
        }

        let requests = dates.iter().map(|&(year, date)| async move {
            let outcome = self
                .client
                .fetch(PowerQuery {
                    latitude,
                    longitude,
                    start: date,
                    end: date,
                    parameters,
                })
                .await
                .map_err(|err| {
                    tracing::warn!(year, error = %err, "historical year fetch failed");
                    err.to_string()
                });
            YearDataset { year, outcome }
        });
        let datasets = join_all(requests).await;

        let successful = datasets.iter().filter(|d| d.data().is_some()).count();
        if successful == 0 {
            let failures = datasets
                .iter()
                .map(|d| YearFailure {
                    year: d.year,
                    reason: d.error().unwrap_or_default().to_string(),
                })
                .collect();
            return Err(ServiceError::AllYearsFailed(failures));
        }

        if is_degraded(successful, years_count, self.degradation_ratio) {
            tracing::warn!(
                successful,
                requested = years_count,
                "historical data degraded, predicting from a partial sample"
            );
        }

        Ok(datasets)
    }
}

/// Fewer than `requested * ratio` successful years.
pub fn is_degraded(successful: usize, requested: u32, ratio: f64) -> bool {
    #[allow(clippy::cast_precision_loss)]
    let successful = successful as f64;
    successful < f64::from(requested) * ratio
}

/// `(year, date)` pairs for the `years_count` years before `base_year`, newest first.
/// Feb 29 falls back to Feb 28 in non-leap years.
pub fn historical_dates(target: NaiveDate, base_year: i32, years_count: u32) -> Vec<(i32, NaiveDate)> {
    (1..=years_count)
        .filter_map(|offset| {
            let year = base_year - i32::try_from(offset).ok()?;
            let date = NaiveDate::from_ymd_opt(year, target.month(), target.day())
                .or_else(|| NaiveDate::from_ymd_opt(year, target.month(), target.day() - 1))?;
            Some((year, date))
        })
        .collect()
}

use std::sync::Arc;

use chrono::{Datelike, Days, NaiveDate, Utc};
use futures::{StreamExt, stream};

use crate::{
    config::ServiceConfig,
    data::{
        history::HistoricalFetcher,
        power::{PowerClient, PowerQuery},
    },
    domain::{
        prediction::aggregate,
        request::WeatherRequest,
        weather::{
            DATA_SOURCE, DailyAggregate, DataType, Location, ParameterData, ParameterSeries,
            ResultMetadata, WeatherResult, default_units,
        },
    },
    error::ServiceError,
};

/// Which pipeline serves a request. Decided once, up front.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataPath {
    Historical,
    Prediction,
}

/// Dates before `today - delay_days` are in the archive; anything later,
/// including the last few days, has to be predicted.
pub fn route_for(date: NaiveDate, today: NaiveDate, delay_days: u32) -> DataPath {
    let cutoff = today
        .checked_sub_days(Days::new(u64::from(delay_days)))
        .unwrap_or(NaiveDate::MIN);
    if date < cutoff {
        DataPath::Historical
    } else {
        DataPath::Prediction
    }
}

#[derive(Debug)]
pub struct BulkOutcome {
    pub results: Vec<(usize, WeatherResult)>,
    pub errors: Vec<(usize, ServiceError)>,
}

#[derive(Debug, Clone)]
pub struct WeatherService {
    config: Arc<ServiceConfig>,
    power: PowerClient,
    history: HistoricalFetcher,
}

impl WeatherService {
    pub fn new(config: ServiceConfig) -> Self {
        let power = PowerClient::new(&config);
        let history = HistoricalFetcher::new(power.clone(), config.degradation_ratio);
        Self {
            config: Arc::new(config),
            power,
            history,
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub async fn weather(&self, request: &WeatherRequest) -> Result<WeatherResult, ServiceError> {
        self.weather_on(request, Utc::now().date_naive()).await
    }

    /// Runs one request as if the current date were `today`.
    pub async fn weather_on(
        &self,
        request: &WeatherRequest,
        today: NaiveDate,
    ) -> Result<WeatherResult, ServiceError> {
        let path = route_for(request.date, today, self.config.data_delay_days);
        tracing::info!(
            date = %request.date,
            latitude = request.latitude,
            longitude = request.longitude,
            ?path,
            "serving weather request"
        );

        match path {
            DataPath::Historical => self.historical(request).await,
            DataPath::Prediction => self.prediction(request, today).await,
        }
    }

    /// Runs every request through its own pipeline, at most
    /// `bulk_concurrency` at a time. Results come back in index order.
    pub async fn bulk_on(
        &self,
        requests: Vec<Result<WeatherRequest, ServiceError>>,
        today: NaiveDate,
    ) -> BulkOutcome {
        let mut outcomes: Vec<(usize, Result<WeatherResult, ServiceError>)> =
            stream::iter(requests.into_iter().enumerate())
                .map(|(index, request)| async move {
                    let outcome = match request {
                        Ok(request) => self.weather_on(&request, today).await,
                        Err(err) => Err(err),
                    };
                    (index, outcome)
                })
                .buffer_unordered(self.config.bulk_concurrency)
                .collect()
                .await;
        outcomes.sort_by_key(|(index, _)| *index);

        let mut bulk = BulkOutcome {
            results: Vec::new(),
            errors: Vec::new(),
        };
        for (index, outcome) in outcomes {
            match outcome {
                Ok(result) => bulk.results.push((index, result)),
                Err(err) => bulk.errors.push((index, err)),
            }
        }
        bulk
    }

    pub async fn bulk(&self, requests: Vec<Result<WeatherRequest, ServiceError>>) -> BulkOutcome {
        self.bulk_on(requests, Utc::now().date_naive()).await
    }

    async fn historical(&self, request: &WeatherRequest) -> Result<WeatherResult, ServiceError> {
        let dataset = self
            .power
            .fetch(PowerQuery {
                latitude: request.latitude,
                longitude: request.longitude,
                start: request.date,
                end: request.date,
                parameters: &request.parameters,
            })
            .await?;

        let parameters = request
            .parameters
            .iter()
            .map(|name| {
                let series = dataset
                    .series
                    .get(name)
                    .map(|s| s.day(request.date))
                    .unwrap_or_else(|| ParameterSeries::for_day(request.date, |_| None));
                let units = dataset
                    .units_for(name)
                    .unwrap_or_else(|| default_units(name));
                ParameterData {
                    name: name.clone(),
                    daily: DailyAggregate::from_series(&series, units),
                    series,
                }
            })
            .collect();

        Ok(WeatherResult {
            location: dataset.location,
            date: request.date,
            data_type: DataType::Historical,
            parameters,
            metadata: self.metadata(request, dataset.fill_value),
            historical_years_used: None,
            prediction_metadata: None,
        })
    }

    async fn prediction(
        &self,
        request: &WeatherRequest,
        today: NaiveDate,
    ) -> Result<WeatherResult, ServiceError> {
        let datasets = self
            .history
            .fetch_years(
                request.latitude,
                request.longitude,
                request.date,
                today.year(),
                request.historical_years,
                &request.parameters,
            )
            .await?;

        let first = datasets.iter().find_map(|d| d.data());
        let location = first.map_or_else(
            || Location::from_coords(request.latitude, request.longitude),
            |data| data.location,
        );
        let fill_value = first.map_or(self.config.fill_value, |data| data.fill_value);

        let (predicted, prediction_metadata) =
            aggregate(&datasets, request.date, &request.parameters);

        Ok(WeatherResult {
            location,
            date: request.date,
            data_type: DataType::Prediction,
            parameters: predicted.parameters,
            metadata: self.metadata(request, fill_value),
            historical_years_used: Some(predicted.years_used),
            prediction_metadata: Some(prediction_metadata),
        })
    }

    fn metadata(&self, request: &WeatherRequest, fill_value: f64) -> ResultMetadata {
        ResultMetadata {
            source: DATA_SOURCE,
            community: self.config.community.clone(),
            parameters: request.parameters.clone(),
            fill_value,
            data_delay_days: self.config.data_delay_days,
        }
    }
}

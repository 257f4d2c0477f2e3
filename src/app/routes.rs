use std::time::Instant;

use axum::{
    Json, Router,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    app::{
        response::{BulkBody, Envelope, csv_response, json_response},
        service::WeatherService,
    },
    domain::request::{BulkQuery, OutputFormat, WeatherQuery},
    error::ServiceError,
};

#[derive(Debug, Clone)]
pub struct AppState {
    pub service: WeatherService,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/weather", get(get_weather))
        .route("/api/weather/bulk", post(post_bulk))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "weather-outlook",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Historical data or a prediction for one location and date, as JSON or CSV.
async fn get_weather(
    State(state): State<AppState>,
    query: Result<Query<WeatherQuery>, QueryRejection>,
) -> Response {
    let started = Instant::now();
    let config = state.service.config();

    let request = match query
        .map_err(|rejection| ServiceError::validation(rejection.body_text()))
        .and_then(|Query(query)| query.validate(config))
    {
        Ok(request) => request,
        Err(err) => return err.into_response(),
    };

    let outcome = tokio::time::timeout(config.request_timeout(), state.service.weather(&request))
        .await
        .unwrap_or(Err(ServiceError::RequestTimeout));

    match outcome {
        Ok(result) => match request.format {
            OutputFormat::Json => json_response(&result, started),
            OutputFormat::Csv => csv_response(&result),
        },
        Err(err) => err.into_response(),
    }
}

/// Up to `bulk_max_requests` independent requests; one failing never affects the rest.
async fn post_bulk(
    State(state): State<AppState>,
    payload: Result<Json<BulkQuery>, JsonRejection>,
) -> Response {
    let started = Instant::now();
    let config = state.service.config();

    let requests = match payload
        .map_err(|rejection| ServiceError::validation(rejection.body_text()))
        .and_then(|Json(body)| body.validate(config))
    {
        Ok(requests) => requests,
        Err(err) => return err.into_response(),
    };

    match tokio::time::timeout(config.request_timeout(), state.service.bulk(requests)).await {
        Ok(outcome) => Json(Envelope::new(BulkBody::new(&outcome), started)).into_response(),
        Err(_) => ServiceError::RequestTimeout.into_response(),
    }
}

pub mod app;
pub mod cli;
pub mod config;
pub mod data;
pub mod domain;
pub mod error;
pub mod resilience;

#[cfg(test)]
pub(crate) mod test_support;

use std::time::Instant;

use anyhow::{Context, Result};
use app::{
    response::{Envelope, ErrorEnvelope, WeatherResultBody, render_csv},
    routes::{AppState, router},
    service::WeatherService,
};
use cli::{Cli, FormatArg};
use config::{ServiceConfig, load_config};
use domain::request::WeatherQuery;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

pub async fn run(cli: Cli) -> Result<()> {
    cli.validate()?;
    let config = load_config(&cli)?;

    if cli.is_one_shot() {
        return run_one_shot(&cli, config).await;
    }
    serve(config).await
}

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("weather_outlook=info,tower_http=info"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

async fn serve(config: ServiceConfig) -> Result<()> {
    let addr = config.bind_addr.clone();
    let state = AppState {
        service: WeatherService::new(config),
    };

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr} failed"))?;
    tracing::info!(%addr, "weather-outlook listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server terminated unexpectedly")
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::info!("shutdown requested");
    }
}

/// Runs one request from the command line and prints it to stdout.
async fn run_one_shot(cli: &Cli, config: ServiceConfig) -> Result<()> {
    let started = Instant::now();
    let query = WeatherQuery {
        latitude: cli.lat.map(|v| v.to_string()),
        longitude: cli.lon.map(|v| v.to_string()),
        date: cli.date.clone(),
        parameters: cli.parameters.clone(),
        historical_years: cli.years.map(|v| v.to_string()),
        format: Some(cli.format.as_str().to_string()),
    };
    let service = WeatherService::new(config);

    let outcome = match query.validate(service.config()) {
        Ok(request) => service.weather(&request).await,
        Err(err) => Err(err),
    };

    match outcome {
        Ok(result) => {
            let rendered = match cli.format {
                FormatArg::Json => serde_json::to_string_pretty(&Envelope::new(
                    WeatherResultBody::new(&result),
                    started,
                ))?,
                FormatArg::Csv => render_csv(&result),
            };
            println!("{rendered}");
            Ok(())
        }
        Err(err) => {
            println!("{}", serde_json::to_string_pretty(&ErrorEnvelope::new(&err))?);
            Err(err).context("weather request failed")
        }
    }
}

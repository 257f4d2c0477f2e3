#![allow(clippy::missing_errors_doc)]

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default)]
pub enum FormatArg {
    #[default]
    Json,
    Csv,
}

impl FormatArg {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
        }
    }
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "weather-outlook",
    version,
    about = "NASA POWER weather aggregator with historical-average predictions"
)]
pub struct Cli {
    /// JSON config file (falls back to $WEATHER_OUTLOOK_CONFIG)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Listen address, e.g. 0.0.0.0:8080
    #[arg(long)]
    pub bind: Option<String>,

    /// NASA POWER hourly point endpoint
    #[arg(long)]
    pub power_url: Option<String>,

    /// NASA POWER user community
    #[arg(long)]
    pub community: Option<String>,

    /// Days the upstream archive lags behind today
    #[arg(long)]
    pub delay_days: Option<u32>,

    /// Upstream attempts per call
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=10))]
    pub max_attempts: Option<u32>,

    /// Base retry delay in milliseconds
    #[arg(long)]
    pub retry_delay_ms: Option<u64>,

    /// Per-call upstream timeout in seconds
    #[arg(long)]
    pub upstream_timeout: Option<u64>,

    /// Latitude for a one-shot query (requires --lon and --date)
    #[arg(long, allow_negative_numbers = true)]
    pub lat: Option<f64>,

    /// Longitude for a one-shot query (requires --lat and --date)
    #[arg(long, allow_negative_numbers = true)]
    pub lon: Option<f64>,

    /// Date for a one-shot query, YYYY-MM-DD
    #[arg(long)]
    pub date: Option<String>,

    /// Comma-separated parameter list for a one-shot query
    #[arg(long)]
    pub parameters: Option<String>,

    /// Historical years for a one-shot prediction
    #[arg(long)]
    pub years: Option<u32>,

    /// One-shot output format
    #[arg(long, value_enum, default_value_t = FormatArg::Json)]
    pub format: FormatArg,
}

impl Cli {
    pub fn validate(&self) -> anyhow::Result<()> {
        match (self.lat, self.lon, self.date.as_ref()) {
            (None, None, None) | (Some(_), Some(_), Some(_)) => Ok(()),
            _ => anyhow::bail!("--lat, --lon and --date must be provided together"),
        }
    }

    #[must_use]
    pub fn is_one_shot(&self) -> bool {
        self.lat.is_some() && self.lon.is_some() && self.date.is_some()
    }
}

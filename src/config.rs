use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};

use crate::{cli::Cli, domain::weather::DEFAULT_FILL_VALUE};

pub const POWER_HOURLY_URL: &str = "https://power.larc.nasa.gov/api/temporal/hourly/point";

const CONFIG_ENV: &str = "WEATHER_OUTLOOK_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub bind_addr: String,
    pub power_base_url: String,
    pub community: String,
    pub upstream_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub max_attempts: u32,
    pub retry_base_delay_ms: u64,
    pub data_delay_days: u32,
    pub fill_value: f64,
    pub default_historical_years: u32,
    pub min_historical_years: u32,
    pub max_historical_years: u32,
    pub degradation_ratio: f64,
    pub default_parameters: Vec<String>,
    pub bulk_max_requests: usize,
    pub bulk_concurrency: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            power_base_url: POWER_HOURLY_URL.to_string(),
            community: "RE".to_string(),
            upstream_timeout_secs: 30,
            request_timeout_secs: 120,
            max_attempts: 3,
            retry_base_delay_ms: 1000,
            data_delay_days: 4,
            fill_value: DEFAULT_FILL_VALUE,
            default_historical_years: 20,
            min_historical_years: 5,
            max_historical_years: 30,
            degradation_ratio: 0.7,
            default_parameters: ["T2M", "RH2M", "WS10M", "PRECTOTCORR"]
                .into_iter()
                .map(str::to_string)
                .collect(),
            bulk_max_requests: 10,
            bulk_concurrency: 10,
        }
    }
}

impl ServiceConfig {
    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.max_attempts == 0 {
            bail!("max_attempts must be at least 1");
        }
        if self.min_historical_years == 0 || self.min_historical_years > self.max_historical_years
        {
            bail!(
                "historical year range {}..={} is invalid",
                self.min_historical_years,
                self.max_historical_years
            );
        }
        if !(self.min_historical_years..=self.max_historical_years)
            .contains(&self.default_historical_years)
        {
            bail!(
                "default_historical_years {} is outside {}..={}",
                self.default_historical_years,
                self.min_historical_years,
                self.max_historical_years
            );
        }
        if self.default_parameters.is_empty() {
            bail!("default_parameters must not be empty");
        }
        if self.bulk_max_requests == 0 || self.bulk_concurrency == 0 {
            bail!("bulk limits must be at least 1");
        }
        if !(0.0..=1.0).contains(&self.degradation_ratio) {
            bail!("degradation_ratio must be within 0..=1");
        }
        Ok(())
    }

    fn apply_cli(&mut self, cli: &Cli) {
        if let Some(bind) = &cli.bind {
            self.bind_addr.clone_from(bind);
        }
        if let Some(url) = &cli.power_url {
            self.power_base_url.clone_from(url);
        }
        if let Some(community) = &cli.community {
            self.community.clone_from(community);
        }
        if let Some(days) = cli.delay_days {
            self.data_delay_days = days;
        }
        if let Some(attempts) = cli.max_attempts {
            self.max_attempts = attempts;
        }
        if let Some(delay) = cli.retry_delay_ms {
            self.retry_base_delay_ms = delay;
        }
        if let Some(timeout) = cli.upstream_timeout {
            self.upstream_timeout_secs = timeout;
        }
    }
}

/// Defaults, then the JSON file (`--config` or `$WEATHER_OUTLOOK_CONFIG`), then CLI flags.
pub fn load_config(cli: &Cli) -> anyhow::Result<ServiceConfig> {
    let mut config = match config_path(cli) {
        Some(path) => read_config_file(&path)?,
        None => ServiceConfig::default(),
    };
    config.apply_cli(cli);
    config.validate()?;
    Ok(config)
}

pub fn read_config_file(path: &Path) -> anyhow::Result<ServiceConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading config file {} failed", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("parsing config file {} failed", path.display()))
}

fn config_path(cli: &Cli) -> Option<PathBuf> {
    cli.config
        .clone()
        .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from))
}

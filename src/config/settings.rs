/// Configuration structures

use std::time::Duration;

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

use crate::analytics::forecast::{FORECAST_WINDOW, MAX_FORECAST_DAYS, MIN_FORECAST_DAYS};
use crate::analytics::smoothing::DEFAULT_WINDOW;

pub const DEFAULT_BASE_URL: &str = "https://disease.sh/v3/covid-19";

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub api: Api,
    pub cache: Cache,
    pub analytics: Analytics,
    pub report: Report,
    pub logging: Logging,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Api {
    pub base_url: String,
    pub timeout_secs: u64,
    /// Total attempts per request, first try included
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

impl Default for Api {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 10,
            max_attempts: 4,
            base_delay_ms: 1000,
        }
    }
}

impl Api {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Cache {
    pub analytics_ttl_secs: u64,
    pub raw_ttl_secs: u64,
}

impl Default for Cache {
    fn default() -> Self {
        Self {
            analytics_ttl_secs: 300,
            raw_ttl_secs: 600,
        }
    }
}

impl Cache {
    pub fn analytics_ttl(&self) -> Duration {
        Duration::from_secs(self.analytics_ttl_secs)
    }

    pub fn raw_ttl(&self) -> Duration {
        Duration::from_secs(self.raw_ttl_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Analytics {
    pub moving_average_window: usize,
    pub forecast_window: usize,
    pub forecast_days: u32,
    pub hotspot_threshold: u64,
    pub history_days: u32,
}

impl Default for Analytics {
    fn default() -> Self {
        Self {
            moving_average_window: DEFAULT_WINDOW,
            forecast_window: FORECAST_WINDOW,
            forecast_days: 7,
            hotspot_threshold: 1000,
            history_days: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Report {
    /// Entities compared and forecast in the dashboard report
    pub countries: Vec<String>,
    pub top_limit: usize,
}

impl Default for Report {
    fn default() -> Self {
        Self {
            countries: vec!["USA".to_string(), "India".to_string(), "Brazil".to_string()],
            top_limit: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Logging {
    pub directory: String,
    pub file_prefix: String,
}

impl Default for Logging {
    fn default() -> Self {
        Self {
            directory: "logs".to_string(),
            file_prefix: "covid-analytics.log".to_string(),
        }
    }
}

impl Config {
    pub fn load_from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path` when given and present, otherwise the built-in defaults.
    pub fn load_or_default(path: Option<&str>) -> anyhow::Result<Self> {
        match path {
            Some(path) if std::path::Path::new(path).exists() => Self::load_from_file(path),
            _ => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api.max_attempts == 0 {
            bail!("api.max_attempts must be at least 1");
        }
        if self.analytics.moving_average_window == 0 {
            bail!("analytics.moving_average_window must be at least 1");
        }
        if self.analytics.forecast_window < 2 {
            bail!("analytics.forecast_window must be at least 2");
        }
        if !(MIN_FORECAST_DAYS..=MAX_FORECAST_DAYS).contains(&self.analytics.forecast_days) {
            bail!(
                "analytics.forecast_days must be between {} and {}",
                MIN_FORECAST_DAYS,
                MAX_FORECAST_DAYS
            );
        }
        if self.analytics.history_days == 0 {
            bail!("analytics.history_days must be at least 1");
        }
        Ok(())
    }
}

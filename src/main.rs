use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info, instrument, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use covid_analytics::analytics::AnalyticsService;
use covid_analytics::client::DiseaseClient;
use covid_analytics::config::{self, Config};
use covid_analytics::core::HistoryRange;
use covid_analytics::util::display;

const CONFIG_ENV: &str = "COVID_ANALYTICS_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Default)]
struct CliOptions {
    config_path: Option<String>,
    /// Extra entity to show in detail
    focus: Option<String>,
    /// Refresh period; a single report when absent
    watch: Option<Duration>,
}

impl CliOptions {
    fn parse(mut args: impl Iterator<Item = String>) -> Result<Self> {
        let mut options = CliOptions::default();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" => options.config_path = Some(args.next().context("--config needs a path")?),
                "--country" => options.focus = Some(args.next().context("--country needs a name")?),
                "--watch" => {
                    let secs: u64 = args
                        .next()
                        .context("--watch needs a number of seconds")?
                        .parse()
                        .context("--watch expects whole seconds")?;
                    if secs == 0 {
                        bail!("--watch must be at least 1 second");
                    }
                    options.watch = Some(Duration::from_secs(secs));
                }
                other => bail!("Unknown argument '{}'", other),
            }
        }
        Ok(options)
    }

    fn config_path(&self) -> String {
        self.config_path
            .clone()
            .or_else(|| std::env::var(CONFIG_ENV).ok())
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string())
    }
}

struct Dashboard {
    service: AnalyticsService,
    report: config::Report,
    focus: Option<String>,
}

impl Dashboard {
    #[instrument(skip(self))]
    async fn refresh(&self) -> Result<()> {
        self.service.purge_expired();
        let settings = self.service.settings().clone();

        let global = self.service.global_overview().await?;
        display::print_global_overview(&global);

        match self.service.region_breakdown().await {
            Ok(groups) => display::print_region_breakdown(&groups),
            Err(e) => warn!("⚠️  Region breakdown unavailable: {}", e),
        }

        match self.service.top(self.report.top_limit).await {
            Ok(rows) => display::print_top_entities(&rows),
            Err(e) => warn!("⚠️  Top entities unavailable: {}", e),
        }

        match self.service.hotspots(settings.hotspot_threshold).await {
            Ok(rows) => display::print_hotspots(&rows, settings.hotspot_threshold),
            Err(e) => warn!("⚠️  Hotspots unavailable: {}", e),
        }

        if self.report.countries.len() >= 2 {
            match self.service.compare(&self.report.countries, "cases").await {
                Ok(rows) => display::print_comparison(&rows),
                Err(e) => warn!("⚠️  Comparison unavailable: {}", e),
            }
        }

        let range = HistoryRange::Days(settings.history_days);
        let mut detailed: Vec<&str> = self.report.countries.iter().map(String::as_str).collect();
        if let Some(focus) = self.focus.as_deref() {
            match self.service.entity_overview(focus).await {
                Ok(overview) => display::print_entity_overview(&overview),
                Err(e) => warn!("⚠️  {} unavailable: {}", focus, e),
            }
            if !detailed.contains(&focus) {
                detailed.push(focus);
            }
        }

        for entity in detailed {
            match self.service.forecast(entity, settings.forecast_days).await {
                Ok(forecast) => display::print_forecast(entity, &forecast),
                Err(e) => warn!("⚠️  Forecast for {} unavailable: {}", entity, e),
            }
            match self.service.history_summary(Some(entity), range).await {
                Ok(summary) => display::print_history_summary(entity, &summary),
                Err(e) => warn!("⚠️  History for {} unavailable: {}", entity, e),
            }
            let vaccination = self.service.vaccination(Some(entity), range, None).await;
            display::print_vaccination(entity, &vaccination);
        }

        info!("✅ Dashboard refreshed");
        Ok(())
    }

    async fn watch(&self, period: Duration, mut shutdown: broadcast::Receiver<()>) -> Result<()> {
        let mut ticker = tokio::time::interval(period);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.refresh().await {
                        error!("Dashboard refresh failed: {}", e);
                    }
                }
                _ = shutdown.recv() => {
                    info!("🛑 Dashboard shutting down gracefully");
                    return Ok(());
                }
            }
        }
    }
}

fn init_tracing(logging: &config::Logging) -> Result<()> {
    // Create logs directory if it doesn't exist
    std::fs::create_dir_all(&logging.directory)?;

    let file_appender = tracing_appender::rolling::daily(&logging.directory, &logging.file_prefix);
    let (non_blocking_file, _guard) = tracing_appender::non_blocking(file_appender);

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_level(true)
        .compact();

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .json()
        .with_current_span(false)
        .with_span_list(true);

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Leak the guard to prevent the file appender from being dropped
    std::mem::forget(_guard);

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let options = CliOptions::parse(std::env::args().skip(1))?;
    let config_path = options.config_path();
    let config = Config::load_or_default(Some(config_path.as_str()))?;

    init_tracing(&config.logging)?;

    info!("🦠 COVID-19 Analytics Dashboard");
    info!("======================================");
    info!(config = %config_path, base_url = %config.api.base_url, "Configuration loaded");

    let client = DiseaseClient::new(&config.api, &config.cache).context("Failed to build upstream client")?;
    let dashboard = Dashboard {
        service: AnalyticsService::new(Arc::new(client), &config),
        report: config.report.clone(),
        focus: options.focus,
    };

    let Some(period) = options.watch else {
        return dashboard.refresh().await;
    };

    info!("📊 Refreshing every {}s, press Ctrl+C to stop", period.as_secs());
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let dashboard = Arc::new(dashboard);
    let watcher = {
        let dashboard = Arc::clone(&dashboard);
        tokio::spawn(async move { dashboard.watch(period, shutdown_rx).await })
    };

    match signal::ctrl_c().await {
        Ok(()) => info!("🛑 Shutdown signal received"),
        Err(e) => error!("Failed to listen for shutdown signal: {}", e),
    }
    let _ = shutdown_tx.send(());

    match watcher.await {
        Ok(result) => result?,
        Err(e) => error!("❌ Dashboard task failed: {}", e),
    }

    info!("👋 Dashboard shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> impl Iterator<Item = String> {
        list.iter().map(|s| s.to_string()).collect::<Vec<_>>().into_iter()
    }

    #[test]
    fn test_parse_options() {
        let options = CliOptions::parse(args(&["--config", "alt.toml", "--country", "Italy", "--watch", "60"])).unwrap();
        assert_eq!(options.config_path.as_deref(), Some("alt.toml"));
        assert_eq!(options.focus.as_deref(), Some("Italy"));
        assert_eq!(options.watch, Some(Duration::from_secs(60)));
        assert_eq!(options.config_path(), "alt.toml");
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(CliOptions::parse(args(&["--watch", "0"])).is_err());
        assert!(CliOptions::parse(args(&["--watch", "soon"])).is_err());
        assert!(CliOptions::parse(args(&["--config"])).is_err());
        assert!(CliOptions::parse(args(&["--verbose"])).is_err());
    }
}

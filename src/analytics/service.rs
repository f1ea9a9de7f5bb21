/// Cached analytics facade over a statistics provider
///
/// Validates caller input before touching the provider, fans comparison
/// fetches out concurrently, and memoizes derived results for the configured
/// TTL. Cache keys carry every parameter that shapes a result.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use futures_util::future::join_all;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use super::aggregator::{
    aggregate_by_region, identify_hotspots, rank_rows, select_entities, top_entities, AggregateGroup,
    ComparisonRow, EntityQuery, HotspotRow, TopEntityRow,
};
use super::forecast::{forecast_daily, validate_horizon, Forecast};
use super::normalizer::daily_deltas;
use super::rates::{calculate_rates, RateMetrics};
use super::trend::{
    analyze_entity, summarize_history_with_window, summarize_vaccination, EntityAnalysis, HistorySummary,
    VaccinationSummary,
};
use super::{Analysis, EmptyReason};
use crate::cache::{cache_key, Clock, SystemClock, TtlCache};
use crate::client::StatsProvider;
use crate::config::{self, Config};
use crate::core::error::AnalyticsError;
use crate::core::types::{HistoryRange, Metric, Snapshot};
use crate::util::time_series::{TimeSeries, Timeline};

/// Smallest number of entities a comparison accepts.
pub const MIN_COMPARED_ENTITIES: usize = 2;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalOverview {
    pub snapshot: Snapshot,
    pub rates: RateMetrics,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityOverview {
    pub snapshot: Snapshot,
    #[serde(flatten)]
    pub analysis: EntityAnalysis,
}

pub struct AnalyticsService {
    provider: Arc<dyn StatsProvider>,
    settings: config::Analytics,
    forecasts: TtlCache<Forecast>,
    comparisons: TtlCache<Vec<ComparisonRow>>,
    hotspots: TtlCache<Vec<HotspotRow>>,
}

impl AnalyticsService {
    pub fn new(provider: Arc<dyn StatsProvider>, config: &Config) -> Self {
        Self::with_clock(provider, config, Arc::new(SystemClock))
    }

    pub fn with_clock(provider: Arc<dyn StatsProvider>, config: &Config, clock: Arc<dyn Clock>) -> Self {
        let ttl = config.cache.analytics_ttl();
        Self {
            provider,
            settings: config.analytics.clone(),
            forecasts: TtlCache::with_clock("forecasts", ttl, Arc::clone(&clock)),
            comparisons: TtlCache::with_clock("comparisons", ttl, Arc::clone(&clock)),
            hotspots: TtlCache::with_clock("hotspots", ttl, clock),
        }
    }

    pub fn settings(&self) -> &config::Analytics {
        &self.settings
    }

    /// Drops expired entries from every result cache.
    pub fn purge_expired(&self) -> usize {
        let purged = self.forecasts.purge_expired()
            + self.comparisons.purge_expired()
            + self.hotspots.purge_expired();
        if purged > 0 {
            debug!(purged, "Expired analytics entries dropped");
        }
        purged
    }

    fn history_range(&self) -> HistoryRange {
        HistoryRange::Days(self.settings.history_days)
    }

    #[instrument(skip(self))]
    pub async fn global_overview(&self) -> Result<GlobalOverview, AnalyticsError> {
        let snapshot = self.provider.global().await?;
        let rates = calculate_rates(&snapshot);
        Ok(GlobalOverview { snapshot, rates })
    }

    /// Snapshot, rates and trend for one entity.
    ///
    /// The snapshot is required; a failed history fetch only leaves the trend
    /// empty.
    #[instrument(skip(self))]
    pub async fn entity_overview(&self, identifier: &str) -> Result<EntityOverview, AnalyticsError> {
        let (snapshot, history) = tokio::join!(
            self.provider.entity(identifier),
            self.provider.history(identifier, self.history_range())
        );
        let snapshot = snapshot?;
        let timeline = match history {
            Ok(timeline) => Some(timeline),
            Err(e) => {
                warn!(entity = identifier, error = %e, "⚠️ History unavailable, trend left empty");
                None
            }
        };
        let analysis = analyze_entity(&snapshot, timeline.as_ref());
        Ok(EntityOverview { snapshot, analysis })
    }

    /// History summary for an entity, or the whole world when `identifier` is `None`.
    #[instrument(skip(self))]
    pub async fn history_summary(
        &self,
        identifier: Option<&str>,
        range: HistoryRange,
    ) -> Result<Analysis<HistorySummary>, AnalyticsError> {
        let timeline = match identifier {
            Some(identifier) => self.provider.history(identifier, range).await?,
            None => self.provider.global_history(range).await?,
        };
        Ok(summarize_history_with_window(&timeline, self.settings.moving_average_window))
    }

    /// Vaccination pace for an entity, or globally when `identifier` is `None`.
    ///
    /// Coverage is optional data: a failed fetch yields an empty analysis.
    #[instrument(skip(self))]
    pub async fn vaccination(
        &self,
        identifier: Option<&str>,
        range: HistoryRange,
        population: Option<u64>,
    ) -> Analysis<VaccinationSummary> {
        let coverage = match identifier {
            Some(identifier) => self.provider.vaccine_coverage(identifier, range).await,
            None => self.provider.global_vaccine_coverage(range).await,
        };
        match coverage {
            Ok(coverage) => summarize_vaccination(&coverage, population),
            Err(e) => {
                warn!(entity = identifier.unwrap_or("global"), error = %e, "⚠️ Vaccination data unavailable");
                Analysis::Empty(EmptyReason::MissingInput)
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn region_breakdown(&self) -> Result<BTreeMap<String, AggregateGroup>, AnalyticsError> {
        let snapshots = self.provider.entities().await?;
        Ok(aggregate_by_region(&snapshots))
    }

    #[instrument(skip(self))]
    pub async fn top(&self, limit: usize) -> Result<Vec<TopEntityRow>, AnalyticsError> {
        let snapshots = self.provider.entities().await?;
        Ok(top_entities(&snapshots, limit))
    }

    #[instrument(skip(self))]
    pub async fn entities(&self, query: &EntityQuery) -> Result<Vec<Snapshot>, AnalyticsError> {
        let snapshots = self.provider.entities().await?;
        Ok(select_entities(&snapshots, query))
    }

    /// Ranks entities by `metric`, highest first.
    ///
    /// Rejects fewer than two identifiers or an unknown metric before any
    /// fetch. An entity whose snapshot cannot be fetched gets a zeroed row
    /// with trend `unknown`; the others are unaffected.
    #[instrument(skip(self, identifiers), fields(count = identifiers.len()))]
    pub async fn compare(&self, identifiers: &[String], metric: &str) -> Result<Vec<ComparisonRow>, AnalyticsError> {
        let identifiers: Vec<&str> = identifiers
            .iter()
            .map(|id| id.trim())
            .filter(|id| !id.is_empty())
            .collect();
        if identifiers.len() < MIN_COMPARED_ENTITIES {
            return Err(AnalyticsError::InsufficientEntities {
                required: MIN_COMPARED_ENTITIES,
                actual: identifiers.len(),
            });
        }
        let metric: Metric = metric.parse()?;

        let key = cache_key("compare", &[&identifiers.join(","), metric.as_str()]);
        if let Some(rows) = self.comparisons.get(&key) {
            debug!(key = %key, "Comparison served from cache");
            return Ok(rows);
        }

        let mut rows = join_all(identifiers.iter().map(|id| self.comparison_row(id, metric))).await;
        rank_rows(&mut rows);

        info!(entities = rows.len(), metric = %metric, "📊 Comparison computed");
        self.comparisons.insert(key, rows.clone());
        Ok(rows)
    }

    async fn comparison_row(&self, identifier: &str, metric: Metric) -> ComparisonRow {
        let (snapshot, history) = tokio::join!(
            self.provider.entity(identifier),
            self.provider.history(identifier, self.history_range())
        );

        let snapshot = match snapshot {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(entity = identifier, error = %e, "⚠️ Entity unavailable, using placeholder row");
                return ComparisonRow::unresolved(identifier, metric);
            }
        };
        let timeline = match history {
            Ok(timeline) => Some(timeline),
            Err(e) => {
                warn!(entity = identifier, error = %e, "⚠️ History unavailable, trend left stable");
                None
            }
        };

        let analysis = analyze_entity(&snapshot, timeline.as_ref());
        ComparisonRow::from_analysis(&snapshot, metric, &analysis)
    }

    /// Entities over `threshold` new cases today, from a fresh entity list.
    #[instrument(skip(self))]
    pub async fn hotspots(&self, threshold: u64) -> Result<Vec<HotspotRow>, AnalyticsError> {
        let key = hotspot_key(threshold);
        if let Some(rows) = self.hotspots.get(&key) {
            debug!(key = %key, "Hotspots served from cache");
            return Ok(rows);
        }

        let snapshots = self.provider.entities().await?;
        let rows = identify_hotspots(&snapshots, &HashMap::new(), threshold);
        info!(threshold, hotspots = rows.len(), "🔥 Hotspots identified");
        self.hotspots.insert(key, rows.clone());
        Ok(rows)
    }

    /// Hotspots over caller-supplied snapshots and timelines.
    ///
    /// Cached by threshold alone: within the TTL, a second call with
    /// different snapshots gets the first call's rows.
    pub fn hotspots_from(
        &self,
        snapshots: &[Snapshot],
        timelines: &HashMap<String, Timeline>,
        threshold: u64,
    ) -> Vec<HotspotRow> {
        self.hotspots.get_or_insert_with(&hotspot_key(threshold), || {
            let rows = identify_hotspots(snapshots, timelines, threshold);
            info!(threshold, hotspots = rows.len(), "🔥 Hotspots identified");
            rows
        })
    }

    /// Forecast for an entity's recent history.
    #[instrument(skip(self))]
    pub async fn forecast(&self, identifier: &str, days: u32) -> Result<Forecast, AnalyticsError> {
        let days = validate_horizon(days)?;
        let timeline = self.provider.history(identifier, self.history_range()).await?;
        self.forecast_series(identifier, &timeline.cases, days)
    }

    /// Forecast over a caller-supplied cumulative series.
    ///
    /// Keyed by entity, series length, last date and horizon, so different
    /// entities or refreshed data never share an entry.
    pub fn forecast_series(&self, entity: &str, cumulative: &TimeSeries, days: u32) -> Result<Forecast, AnalyticsError> {
        let days = validate_horizon(days)?;
        let last_date = cumulative.last().map(|p| p.date.as_str()).unwrap_or("");
        let key = cache_key(
            "predict",
            &[entity, &cumulative.len().to_string(), last_date, &days.to_string()],
        );

        Ok(self.forecasts.get_or_insert_with(&key, || {
            let values = cumulative.values();
            let daily = daily_deltas(&values);
            let forecast = forecast_daily(&daily, cumulative.last_value(), days, self.settings.forecast_window);
            debug!(entity, days, confidence = %forecast.confidence, "Forecast computed");
            forecast
        }))
    }
}

fn hotspot_key(threshold: u64) -> String {
    cache_key("hotspots", &[&threshold.to_string()])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;
    use crate::core::error::FetchError;
    use async_trait::async_trait;
    use std::time::Duration;

    /// Provider whose every fetch fails.
    struct Unreachable;

    #[async_trait]
    impl StatsProvider for Unreachable {
        async fn global(&self) -> Result<Snapshot, FetchError> {
            Err(FetchError::NotFound("all".to_string()))
        }
        async fn entities(&self) -> Result<Vec<Snapshot>, FetchError> {
            Err(FetchError::NotFound("countries".to_string()))
        }
        async fn entity(&self, identifier: &str) -> Result<Snapshot, FetchError> {
            Err(FetchError::NotFound(identifier.to_string()))
        }
        async fn history(&self, identifier: &str, _range: HistoryRange) -> Result<Timeline, FetchError> {
            Err(FetchError::NotFound(identifier.to_string()))
        }
        async fn global_history(&self, _range: HistoryRange) -> Result<Timeline, FetchError> {
            Err(FetchError::NotFound("historical/all".to_string()))
        }
        async fn vaccine_coverage(&self, identifier: &str, _range: HistoryRange) -> Result<TimeSeries, FetchError> {
            Err(FetchError::NotFound(identifier.to_string()))
        }
        async fn global_vaccine_coverage(&self, _range: HistoryRange) -> Result<TimeSeries, FetchError> {
            Err(FetchError::NotFound("vaccine/coverage".to_string()))
        }
    }

    fn service_with(clock: Arc<ManualClock>) -> AnalyticsService {
        AnalyticsService::with_clock(Arc::new(Unreachable), &Config::default(), clock)
    }

    /// Provider that only knows the entity list.
    struct ListOnly(Vec<Snapshot>);

    #[async_trait]
    impl StatsProvider for ListOnly {
        async fn global(&self) -> Result<Snapshot, FetchError> {
            Unreachable.global().await
        }
        async fn entities(&self) -> Result<Vec<Snapshot>, FetchError> {
            Ok(self.0.clone())
        }
        async fn entity(&self, identifier: &str) -> Result<Snapshot, FetchError> {
            Unreachable.entity(identifier).await
        }
        async fn history(&self, identifier: &str, range: HistoryRange) -> Result<Timeline, FetchError> {
            Unreachable.history(identifier, range).await
        }
        async fn global_history(&self, range: HistoryRange) -> Result<Timeline, FetchError> {
            Unreachable.global_history(range).await
        }
        async fn vaccine_coverage(&self, identifier: &str, range: HistoryRange) -> Result<TimeSeries, FetchError> {
            Unreachable.vaccine_coverage(identifier, range).await
        }
        async fn global_vaccine_coverage(&self, range: HistoryRange) -> Result<TimeSeries, FetchError> {
            Unreachable.global_vaccine_coverage(range).await
        }
    }

    fn with_today(identifier: &str, today_cases: u64) -> Snapshot {
        Snapshot {
            today_cases,
            ..Snapshot::named(identifier)
        }
    }

    #[tokio::test]
    async fn test_compare_validates_before_fetching() {
        let service = service_with(Arc::new(ManualClock::new()));

        let one = vec!["Italy".to_string(), "  ".to_string()];
        assert!(matches!(
            service.compare(&one, "cases").await,
            Err(AnalyticsError::InsufficientEntities { required: 2, actual: 1 })
        ));

        let two = vec!["Italy".to_string(), "Spain".to_string()];
        assert!(matches!(
            service.compare(&two, "bogus").await,
            Err(AnalyticsError::InvalidParameter { .. })
        ));
    }

    #[tokio::test]
    async fn test_compare_all_failed_gives_placeholders() {
        let service = service_with(Arc::new(ManualClock::new()));
        let ids = vec!["Atlantis".to_string(), "Lemuria".to_string()];

        let rows = service.compare(&ids, "deaths").await.unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.value == 0));
        assert!(rows.iter().all(|r| r.trend == crate::analytics::Trend::Unknown));
    }

    #[test]
    fn test_forecast_cache_is_per_entity_and_expires() {
        let clock = Arc::new(ManualClock::new());
        let service = service_with(Arc::clone(&clock));

        let rising = TimeSeries::from_values(&[0, 10, 30, 60, 100]);
        let steady = TimeSeries::from_values(&[0, 5, 10, 15, 20]);

        let first = service.forecast_series("Italy", &rising, 2).unwrap();
        let other = service.forecast_series("Spain", &steady, 2).unwrap();
        assert_ne!(first, other);
        assert_eq!(first.predictions[0].cases, 50);
        // daily [0,5,5,5,5] fits y = x + 2
        assert_eq!(other.predictions[0].cases, 7);

        // Same entity, same data: served from cache
        assert_eq!(service.forecast_series("Italy", &rising, 2).unwrap(), first);
        assert_eq!(service.forecasts.stats().hits, 1);

        clock.advance(Duration::from_secs(300));
        service.forecast_series("Italy", &rising, 2).unwrap();
        assert_eq!(service.forecasts.stats().hits, 1);
    }

    #[test]
    fn test_forecast_rejects_bad_horizon() {
        let service = service_with(Arc::new(ManualClock::new()));
        let series = TimeSeries::from_values(&[0, 10, 20]);
        assert!(service.forecast_series("Italy", &series, 0).is_err());
        assert!(service.forecast_series("Italy", &series, 31).is_err());
        assert!(service.forecasts.is_empty());
    }

    #[test]
    fn test_hotspots_cached_by_threshold() {
        let service = service_with(Arc::new(ManualClock::new()));
        let snapshots = vec![with_today("A", 50), with_today("B", 1500), with_today("C", 2000)];

        let rows = service.hotspots_from(&snapshots, &HashMap::new(), 1000);
        let names: Vec<&str> = rows.iter().map(|r| r.entity.as_str()).collect();
        assert_eq!(names, vec!["C", "B"]);

        // Within the TTL the threshold alone selects the cached rows
        let cached = service.hotspots_from(&[], &HashMap::new(), 1000);
        assert_eq!(cached, rows);
        assert!(service.hotspots_from(&[], &HashMap::new(), 999).is_empty());
    }

    #[tokio::test]
    async fn test_hotspots_count_one_miss_then_one_hit() {
        let provider = ListOnly(vec![with_today("A", 50), with_today("B", 1500)]);
        let service = AnalyticsService::with_clock(Arc::new(provider), &Config::default(), Arc::new(ManualClock::new()));

        let rows = service.hotspots(1000).await.unwrap();
        assert_eq!(rows.len(), 1);
        let stats = service.hotspots.stats();
        assert_eq!((stats.hits, stats.misses, stats.entries), (0, 1, 1));

        assert_eq!(service.hotspots(1000).await.unwrap(), rows);
        let stats = service.hotspots.stats();
        assert_eq!((stats.hits, stats.misses), (1, 1));
    }

    #[test]
    fn test_purge_drops_expired_results() {
        let clock = Arc::new(ManualClock::new());
        let service = service_with(Arc::clone(&clock));
        let series = TimeSeries::from_values(&[0, 10, 30, 60, 100]);

        service.forecast_series("Italy", &series, 2).unwrap();
        service.forecast_series("Spain", &series, 2).unwrap();
        service.hotspots_from(&[with_today("A", 2000)], &HashMap::new(), 1000);
        assert_eq!(service.purge_expired(), 0);
        assert_eq!(service.forecasts.len(), 2);

        clock.advance(Duration::from_secs(300));
        assert_eq!(service.purge_expired(), 3);
        assert!(service.forecasts.is_empty());
        assert!(service.hotspots.is_empty());
    }

    #[tokio::test]
    async fn test_vaccination_failure_is_empty() {
        let service = service_with(Arc::new(ManualClock::new()));
        let analysis = service.vaccination(Some("Italy"), HistoryRange::Days(30), None).await;
        assert_eq!(analysis, Analysis::Empty(EmptyReason::MissingInput));
    }
}

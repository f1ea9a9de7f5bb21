use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use covid_analytics::analytics::{AnalyticsService, Trend};
use covid_analytics::cache::ManualClock;
use covid_analytics::client::StatsProvider;
use covid_analytics::config::Config;
use covid_analytics::core::{AnalyticsError, FetchError, HistoryRange, Snapshot};
use covid_analytics::util::time_series::{TimeSeries, Timeline};

#[derive(Default)]
struct FakeProvider {
    snapshots: HashMap<String, Snapshot>,
    timelines: HashMap<String, Timeline>,
    entity_calls: AtomicUsize,
    history_calls: AtomicUsize,
    list_calls: AtomicUsize,
}

impl FakeProvider {
    fn with_entity(mut self, snapshot: Snapshot, timeline: Option<Timeline>) -> Self {
        if let Some(timeline) = timeline {
            self.timelines.insert(snapshot.identifier.clone(), timeline);
        }
        self.snapshots.insert(snapshot.identifier.clone(), snapshot);
        self
    }

    fn fetches(&self) -> usize {
        self.entity_calls.load(Ordering::SeqCst)
            + self.history_calls.load(Ordering::SeqCst)
            + self.list_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StatsProvider for FakeProvider {
    async fn global(&self) -> Result<Snapshot, FetchError> {
        Ok(Snapshot::default())
    }

    async fn entities(&self) -> Result<Vec<Snapshot>, FetchError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let mut all: Vec<Snapshot> = self.snapshots.values().cloned().collect();
        all.sort_by(|a, b| b.cases.cmp(&a.cases));
        Ok(all)
    }

    async fn entity(&self, identifier: &str) -> Result<Snapshot, FetchError> {
        self.entity_calls.fetch_add(1, Ordering::SeqCst);
        self.snapshots
            .get(identifier)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(format!("countries/{}", identifier)))
    }

    async fn history(&self, identifier: &str, _range: HistoryRange) -> Result<Timeline, FetchError> {
        self.history_calls.fetch_add(1, Ordering::SeqCst);
        self.timelines
            .get(identifier)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(format!("historical/{}", identifier)))
    }

    async fn global_history(&self, _range: HistoryRange) -> Result<Timeline, FetchError> {
        Ok(Timeline::default())
    }

    async fn vaccine_coverage(&self, identifier: &str, _range: HistoryRange) -> Result<TimeSeries, FetchError> {
        Err(FetchError::NotFound(identifier.to_string()))
    }

    async fn global_vaccine_coverage(&self, _range: HistoryRange) -> Result<TimeSeries, FetchError> {
        Ok(TimeSeries::new())
    }
}

fn snapshot(identifier: &str, continent: &str, cases: u64, today_cases: u64) -> Snapshot {
    Snapshot {
        cases,
        today_cases,
        deaths: cases / 50,
        recovered: cases / 2,
        active: cases / 4,
        population: cases * 20,
        continent: Some(continent.to_string()),
        ..Snapshot::named(identifier)
    }
}

fn rising_timeline() -> Timeline {
    Timeline {
        cases: TimeSeries::from_values(&[100, 110, 125, 145, 170, 200, 235, 275]),
        deaths: TimeSeries::from_values(&[1, 1, 2, 2, 3, 3, 4, 4]),
        recovered: TimeSeries::new(),
    }
}

fn europe() -> FakeProvider {
    FakeProvider::default()
        .with_entity(snapshot("Italy", "Europe", 1000, 1500), Some(rising_timeline()))
        .with_entity(snapshot("Spain", "Europe", 3000, 2000), None)
        .with_entity(snapshot("Kenya", "Africa", 500, 50), None)
}

fn service_over(provider: Arc<FakeProvider>, clock: Arc<ManualClock>) -> AnalyticsService {
    AnalyticsService::with_clock(provider, &Config::default(), clock)
}

#[tokio::test]
async fn test_comparison_needs_two_entities_before_fetching() {
    let provider = Arc::new(europe());
    let service = service_over(Arc::clone(&provider), Arc::new(ManualClock::new()));

    let result = service.compare(&["Italy".to_string()], "cases").await;
    assert!(matches!(
        result,
        Err(AnalyticsError::InsufficientEntities { required: 2, actual: 1 })
    ));
    assert_eq!(provider.fetches(), 0);
}

#[tokio::test]
async fn test_comparison_survives_one_failed_entity() {
    let provider = Arc::new(europe());
    let service = service_over(Arc::clone(&provider), Arc::new(ManualClock::new()));

    let ids = vec!["Atlantis".to_string(), "Italy".to_string()];
    let rows = service.compare(&ids, "cases").await.unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].entity, "Italy");
    assert_eq!(rows[0].value, 1000);
    assert_eq!(rows[0].trend, Trend::Increasing);

    assert_eq!(rows[1].entity, "Atlantis");
    assert_eq!(rows[1].value, 0);
    assert_eq!(rows[1].trend, Trend::Unknown);
    assert_eq!(rows[1].rates.recovery_rate.value(), 0.0);
}

#[tokio::test]
async fn test_comparison_cached_until_ttl() {
    let provider = Arc::new(europe());
    let clock = Arc::new(ManualClock::new());
    let service = service_over(Arc::clone(&provider), Arc::clone(&clock));
    let ids = vec!["Italy".to_string(), "Spain".to_string()];

    let first = service.compare(&ids, "cases").await.unwrap();
    assert_eq!(provider.entity_calls.load(Ordering::SeqCst), 2);

    clock.advance(Duration::from_secs(299));
    let second = service.compare(&ids, "cases").await.unwrap();
    assert_eq!(first, second);
    assert_eq!(provider.entity_calls.load(Ordering::SeqCst), 2);

    // Different metric is a different key
    let by_today = service.compare(&ids, "todayCases").await.unwrap();
    assert_eq!(by_today[0].entity, "Spain");
    assert_eq!(provider.entity_calls.load(Ordering::SeqCst), 4);

    clock.advance(Duration::from_secs(1));
    service.compare(&ids, "cases").await.unwrap();
    assert_eq!(provider.entity_calls.load(Ordering::SeqCst), 6);
}

#[tokio::test]
async fn test_hotspots_from_entity_list() {
    let provider = Arc::new(europe());
    let service = service_over(Arc::clone(&provider), Arc::new(ManualClock::new()));

    let rows = service.hotspots(1000).await.unwrap();
    let names: Vec<&str> = rows.iter().map(|r| r.entity.as_str()).collect();
    assert_eq!(names, vec!["Spain", "Italy"]);
    assert_eq!(rows[0].region, "Europe");

    service.hotspots(1000).await.unwrap();
    assert_eq!(provider.list_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_forecast_validates_then_projects() {
    let provider = Arc::new(europe());
    let service = service_over(Arc::clone(&provider), Arc::new(ManualClock::new()));

    assert!(matches!(
        service.forecast("Italy", 45).await,
        Err(AnalyticsError::InvalidParameter { .. })
    ));
    assert_eq!(provider.fetches(), 0);

    let forecast = service.forecast("Italy", 3).await.unwrap();
    assert_eq!(forecast.predictions.len(), 3);
    assert_eq!(forecast.current.unwrap().total_cases, 275);
    assert!(forecast.predictions.iter().all(|p| p.total_cases >= 275));
    assert!(forecast.predictions[2].cases >= forecast.predictions[0].cases);

    assert!(service.forecast("Atlantis", 3).await.is_err());
}

#[tokio::test]
async fn test_entity_overview_without_history() {
    let provider = Arc::new(europe());
    let service = service_over(provider, Arc::new(ManualClock::new()));

    let overview = service.entity_overview("Spain").await.unwrap();
    assert!(!overview.analysis.trend.is_ready());
    assert_eq!(overview.analysis.trend_label(), Trend::Stable);
    assert_eq!(overview.analysis.rates.recovery_rate.value(), 50.0);

    assert!(service.entity_overview("Atlantis").await.is_err());
}

#[tokio::test]
async fn test_region_breakdown_and_top() {
    let provider = Arc::new(europe());
    let service = service_over(provider, Arc::new(ManualClock::new()));

    let groups = service.region_breakdown().await.unwrap();
    assert_eq!(groups["Europe"].cases, 4000);
    assert_eq!(groups["Europe"].entities, 2);
    assert_eq!(groups["Africa"].cases, 500);

    let top = service.top(2).await.unwrap();
    let names: Vec<&str> = top.iter().map(|r| r.entity.as_str()).collect();
    assert_eq!(names, vec!["Spain", "Italy"]);
}

#[tokio::test]
async fn test_global_history_without_data_is_empty() {
    let provider = Arc::new(europe());
    let service = service_over(provider, Arc::new(ManualClock::new()));

    let summary = service.history_summary(None, HistoryRange::All).await.unwrap();
    assert!(!summary.is_ready());

    let vaccination = service.vaccination(None, HistoryRange::Days(30), Some(1_000)).await;
    assert!(!vaccination.is_ready());
}

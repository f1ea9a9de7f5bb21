/// Cross-entity aggregation, comparison rows and hotspot detection

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use super::rates::{per_million, percentage, Rate, RateMetrics};
use super::trend::{analyze_entity, EntityAnalysis, Trend};
use crate::core::types::{Metric, Snapshot};
use crate::util::time_series::Timeline;

/// Summed snapshot fields for one region.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateGroup {
    pub entities: usize,
    pub members: Vec<String>,
    pub cases: u64,
    pub deaths: u64,
    pub recovered: u64,
    pub active: u64,
    pub critical: u64,
    pub population: u64,
    pub tests: u64,
    /// Whole numbers, unlike the per-entity rates
    pub cases_per_million: u64,
    pub deaths_per_million: u64,
    pub recovery_rate: Rate,
    pub mortality_rate: Rate,
}

impl AggregateGroup {
    fn add(&mut self, snapshot: &Snapshot) {
        self.entities += 1;
        self.members.push(snapshot.identifier.clone());
        self.cases = self.cases.saturating_add(snapshot.cases);
        self.deaths = self.deaths.saturating_add(snapshot.deaths);
        self.recovered = self.recovered.saturating_add(snapshot.recovered);
        self.active = self.active.saturating_add(snapshot.active);
        self.critical = self.critical.saturating_add(snapshot.critical);
        self.population = self.population.saturating_add(snapshot.population);
        self.tests = self.tests.saturating_add(snapshot.tests);
    }

    fn derive_rates(&mut self) {
        self.cases_per_million = whole_per_million(self.cases, self.population);
        self.deaths_per_million = whole_per_million(self.deaths, self.population);
        self.recovery_rate = percentage(self.recovered, self.cases);
        self.mortality_rate = percentage(self.deaths, self.cases);
    }
}

/// Per-million ratio rounded once to a whole number; 0 without population.
fn whole_per_million(count: u64, population: u64) -> u64 {
    if population == 0 {
        return 0;
    }
    (count as f64 / population as f64 * 1_000_000.0).round() as u64
}

/// Sums snapshots per region tag; untagged snapshots land in `Unknown`.
pub fn aggregate_by_region(snapshots: &[Snapshot]) -> BTreeMap<String, AggregateGroup> {
    let mut groups: BTreeMap<String, AggregateGroup> = BTreeMap::new();
    for snapshot in snapshots {
        groups
            .entry(snapshot.region().to_string())
            .or_default()
            .add(snapshot);
    }
    for group in groups.values_mut() {
        group.derive_rates();
    }
    groups
}

/// One entity's line in a multi-entity comparison.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonRow {
    pub entity: String,
    pub flag: String,
    pub metric: Metric,
    pub value: u64,
    #[serde(flatten)]
    pub rates: RateMetrics,
    pub trend: Trend,
    pub growth_rate: Rate,
}

impl ComparisonRow {
    pub fn from_analysis(snapshot: &Snapshot, metric: Metric, analysis: &EntityAnalysis) -> Self {
        Self {
            entity: snapshot.identifier.clone(),
            flag: snapshot.flag().to_string(),
            metric,
            value: snapshot.metric(metric),
            rates: analysis.rates,
            trend: analysis.trend_label(),
            growth_rate: analysis.growth_rate(),
        }
    }

    /// Placeholder for an entity that could not be fetched.
    pub fn unresolved(identifier: &str, metric: Metric) -> Self {
        Self {
            entity: identifier.to_string(),
            flag: String::new(),
            metric,
            value: 0,
            rates: RateMetrics::default(),
            trend: Trend::Unknown,
            growth_rate: Rate::ZERO,
        }
    }
}

/// Highest metric value first; ties keep their input order.
pub fn rank_rows(rows: &mut [ComparisonRow]) {
    rows.sort_by_key(|row| Reverse(row.value));
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HotspotRow {
    pub entity: String,
    pub region: String,
    pub today_cases: u64,
    pub today_deaths: u64,
    #[serde(flatten)]
    pub rates: RateMetrics,
    pub trend: Trend,
    pub growth_rate: Rate,
}

/// Entities with more than `threshold` new cases today, busiest first.
///
/// Trend and growth come from `timelines` (keyed by entity identifier) when
/// an entry with case data exists, otherwise they fall back to `stable` / 0.
/// The upstream dashboard labels an entity whose timeline is present but
/// empty `decreasing`; here it is `stable`, the same as a missing timeline.
pub fn identify_hotspots(
    snapshots: &[Snapshot],
    timelines: &HashMap<String, Timeline>,
    threshold: u64,
) -> Vec<HotspotRow> {
    let mut rows: Vec<HotspotRow> = snapshots
        .iter()
        .filter(|s| s.today_cases > threshold)
        .map(|s| {
            let analysis = analyze_entity(s, timelines.get(&s.identifier));
            HotspotRow {
                entity: s.identifier.clone(),
                region: s.region().to_string(),
                today_cases: s.today_cases,
                today_deaths: s.today_deaths,
                rates: analysis.rates,
                trend: analysis.trend_label(),
                growth_rate: analysis.growth_rate(),
            }
        })
        .collect();
    rows.sort_by_key(|row| Reverse(row.today_cases));
    rows
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopEntityRow {
    pub entity: String,
    pub flag: String,
    pub cases: u64,
    pub active: u64,
    pub recovered: u64,
    pub deaths: u64,
    pub today_cases: u64,
    pub today_deaths: u64,
    pub today_recovered: u64,
    pub critical: u64,
    pub tests: u64,
    pub population: u64,
    pub cases_per_million: Rate,
    pub deaths_per_million: Rate,
}

impl From<&Snapshot> for TopEntityRow {
    fn from(s: &Snapshot) -> Self {
        Self {
            entity: s.identifier.clone(),
            flag: s.flag().to_string(),
            cases: s.cases,
            active: s.active,
            recovered: s.recovered,
            deaths: s.deaths,
            today_cases: s.today_cases,
            today_deaths: s.today_deaths,
            today_recovered: s.today_recovered,
            critical: s.critical,
            tests: s.tests,
            population: s.population,
            cases_per_million: per_million(s.cases, s.population),
            deaths_per_million: per_million(s.deaths, s.population),
        }
    }
}

/// The `limit` entities with the most cumulative cases.
pub fn top_entities(snapshots: &[Snapshot], limit: usize) -> Vec<TopEntityRow> {
    let query = EntityQuery {
        limit: Some(limit),
        ..EntityQuery::default()
    };
    select_entities(snapshots, &query)
        .iter()
        .map(TopEntityRow::from)
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    #[default]
    Descending,
}

/// Filter/sort/limit over a snapshot list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityQuery {
    /// `None` or `"all"` keeps every region
    pub region: Option<String>,
    pub sort_by: Metric,
    pub order: SortOrder,
    pub limit: Option<usize>,
}

impl Default for EntityQuery {
    fn default() -> Self {
        Self {
            region: None,
            sort_by: Metric::Cases,
            order: SortOrder::Descending,
            limit: None,
        }
    }
}

pub fn select_entities(snapshots: &[Snapshot], query: &EntityQuery) -> Vec<Snapshot> {
    let region = query
        .region
        .as_deref()
        .filter(|r| !r.eq_ignore_ascii_case("all"));

    let mut selected: Vec<Snapshot> = snapshots
        .iter()
        .filter(|s| region.map_or(true, |r| s.continent.as_deref() == Some(r)))
        .cloned()
        .collect();

    match query.order {
        SortOrder::Descending => selected.sort_by_key(|s| Reverse(s.metric(query.sort_by))),
        SortOrder::Ascending => selected.sort_by_key(|s| s.metric(query.sort_by)),
    }
    if let Some(limit) = query.limit {
        selected.truncate(limit);
    }
    selected
}

/// Core data types shared by the fetch layer and the analytics

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::core::error::AnalyticsError;
use crate::util::time_series::{clamp_count, TimeSeries, Timeline};

pub const GLOBAL_IDENTIFIER: &str = "Global";
pub const UNKNOWN_REGION: &str = "Unknown";

/// Point-in-time statistics for one entity (a country or the world).
///
/// Replaced wholesale on every refresh; nothing mutates a snapshot in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(rename = "country", default = "global_identifier")]
    pub identifier: String,

    /// Upstream refresh time, epoch milliseconds
    #[serde(default)]
    pub updated: i64,

    #[serde(default, deserialize_with = "count")]
    pub cases: u64,
    #[serde(default, deserialize_with = "count")]
    pub today_cases: u64,
    #[serde(default, deserialize_with = "count")]
    pub deaths: u64,
    #[serde(default, deserialize_with = "count")]
    pub today_deaths: u64,
    #[serde(default, deserialize_with = "count")]
    pub recovered: u64,
    #[serde(default, deserialize_with = "count")]
    pub today_recovered: u64,
    #[serde(default, deserialize_with = "count")]
    pub active: u64,
    #[serde(default, deserialize_with = "count")]
    pub critical: u64,
    #[serde(default, deserialize_with = "count")]
    pub tests: u64,
    #[serde(default, deserialize_with = "count")]
    pub population: u64,

    #[serde(rename = "testsPerOneMillion", default, deserialize_with = "ratio")]
    pub tests_per_million: f64,

    #[serde(default)]
    pub continent: Option<String>,

    #[serde(rename = "countryInfo", default)]
    pub info: Option<EntityInfo>,
}

/// Flag and ISO codes used by the presentation layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityInfo {
    #[serde(default)]
    pub iso2: Option<String>,
    #[serde(default)]
    pub iso3: Option<String>,
    #[serde(default)]
    pub flag: Option<String>,
}

fn global_identifier() -> String {
    GLOBAL_IDENTIFIER.to_string()
}

fn count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    Ok(clamp_count(Option::<f64>::deserialize(deserializer)?))
}

fn ratio<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(deserializer)?
        .filter(|v| v.is_finite())
        .unwrap_or(0.0))
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::named(GLOBAL_IDENTIFIER)
    }
}

impl Snapshot {
    /// An all-zero snapshot for `identifier`.
    pub fn named(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            updated: 0,
            cases: 0,
            today_cases: 0,
            deaths: 0,
            today_deaths: 0,
            recovered: 0,
            today_recovered: 0,
            active: 0,
            critical: 0,
            tests: 0,
            population: 0,
            tests_per_million: 0.0,
            continent: None,
            info: None,
        }
    }

    pub fn flag(&self) -> &str {
        self.info
            .as_ref()
            .and_then(|info| info.flag.as_deref())
            .unwrap_or("")
    }

    /// Region tag, `Unknown` when upstream left it out.
    pub fn region(&self) -> &str {
        match self.continent.as_deref() {
            Some(c) if !c.trim().is_empty() => c,
            _ => UNKNOWN_REGION,
        }
    }

    pub fn metric(&self, metric: Metric) -> u64 {
        match metric {
            Metric::Cases => self.cases,
            Metric::TodayCases => self.today_cases,
            Metric::Deaths => self.deaths,
            Metric::TodayDeaths => self.today_deaths,
            Metric::Recovered => self.recovered,
            Metric::TodayRecovered => self.today_recovered,
            Metric::Active => self.active,
            Metric::Critical => self.critical,
            Metric::Tests => self.tests,
            Metric::Population => self.population,
        }
    }
}

/// Raw snapshot counters a caller may rank or compare by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Metric {
    Cases,
    TodayCases,
    Deaths,
    TodayDeaths,
    Recovered,
    TodayRecovered,
    Active,
    Critical,
    Tests,
    Population,
}

impl Metric {
    pub const ALL: [Metric; 10] = [
        Metric::Cases,
        Metric::TodayCases,
        Metric::Deaths,
        Metric::TodayDeaths,
        Metric::Recovered,
        Metric::TodayRecovered,
        Metric::Active,
        Metric::Critical,
        Metric::Tests,
        Metric::Population,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Cases => "cases",
            Metric::TodayCases => "todayCases",
            Metric::Deaths => "deaths",
            Metric::TodayDeaths => "todayDeaths",
            Metric::Recovered => "recovered",
            Metric::TodayRecovered => "todayRecovered",
            Metric::Active => "active",
            Metric::Critical => "critical",
            Metric::Tests => "tests",
            Metric::Population => "population",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Metric::ALL
            .iter()
            .copied()
            .find(|m| m.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| AnalyticsError::InvalidParameter {
                name: "metric".to_string(),
                reason: format!("unknown metric '{}'", wanted),
            })
    }
}

/// How much history to request from upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HistoryRange {
    Days(u32),
    All,
}

impl fmt::Display for HistoryRange {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            HistoryRange::Days(days) => write!(f, "{}", days),
            HistoryRange::All => f.write_str("all"),
        }
    }
}

/// Per-entity history response (`/historical/{country}`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoricalRecord {
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub timeline: Timeline,
}

/// Per-entity vaccination response (`/vaccine/coverage/countries/{country}`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VaccineCoverage {
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub timeline: TimeSeries,
}

/// Per-population and per-case ratios

use std::fmt;

use serde::{Serialize, Serializer};

use crate::core::types::Snapshot;

/// A percentage or per-million figure held at two decimal places.
///
/// Numeric for further arithmetic, rendered as a fixed-precision string
/// (`"12.30"`) for display and in serialized output.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd)]
pub struct Rate(f64);

impl Rate {
    pub const ZERO: Rate = Rate(0.0);

    /// Rounds to two decimals; NaN and infinities become 0.
    pub fn new(raw: f64) -> Self {
        if raw.is_finite() {
            Rate((raw * 100.0).round() / 100.0)
        } else {
            Rate::ZERO
        }
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl Serialize for Rate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// `numerator / denominator * scale`, or 0 when the denominator is 0.
pub fn ratio(numerator: u64, denominator: u64, scale: f64) -> Rate {
    if denominator == 0 {
        return Rate::ZERO;
    }
    Rate::new(numerator as f64 / denominator as f64 * scale)
}

pub fn per_million(count: u64, population: u64) -> Rate {
    ratio(count, population, 1_000_000.0)
}

pub fn percentage(part: u64, whole: u64) -> Rate {
    ratio(part, whole, 100.0)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateMetrics {
    pub cases_per_million: Rate,
    pub deaths_per_million: Rate,
    pub recovery_rate: Rate,
    pub mortality_rate: Rate,
    pub active_percentage: Rate,
    /// Passed through from upstream
    pub tests_per_million: f64,
    /// Share of the population not currently an active case
    pub unaffected_percentage: Rate,
}

pub fn calculate_rates(snapshot: &Snapshot) -> RateMetrics {
    let unaffected_percentage = if snapshot.active > 0 {
        percentage(
            snapshot.population.saturating_sub(snapshot.active),
            snapshot.population,
        )
    } else {
        Rate::ZERO
    };

    RateMetrics {
        cases_per_million: per_million(snapshot.cases, snapshot.population),
        deaths_per_million: per_million(snapshot.deaths, snapshot.population),
        recovery_rate: percentage(snapshot.recovered, snapshot.cases),
        mortality_rate: percentage(snapshot.deaths, snapshot.cases),
        active_percentage: percentage(snapshot.active, snapshot.cases),
        tests_per_million: snapshot.tests_per_million,
        unaffected_percentage,
    }
}

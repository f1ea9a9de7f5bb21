/// Trend classification, growth and per-entity analysis

use std::fmt;

use serde::Serialize;

use super::normalizer::daily_deltas;
use super::rates::{calculate_rates, Rate, RateMetrics};
use super::regression::pearson_correlation;
use super::smoothing::{moving_average, weekly_average, DEFAULT_WINDOW};
use super::{Analysis, EmptyReason};
use crate::core::types::Snapshot;
use crate::util::time_series::{TimeSeries, Timeline};

/// Days in the comparison window for trend, growth and doubling time.
pub const WEEK: usize = 7;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Increasing,
    Decreasing,
    /// No timeline to judge from
    #[default]
    Stable,
    /// The entity itself could not be fetched
    Unknown,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Trend::Increasing => write!(f, "increasing"),
            Trend::Decreasing => write!(f, "decreasing"),
            Trend::Stable => write!(f, "stable"),
            Trend::Unknown => write!(f, "unknown"),
        }
    }
}

/// A duration estimate in days that may not exist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DayEstimate {
    Days(u64),
    /// The quantity is not growing (or there is nothing to measure),
    /// so no finite number of days reaches the target
    #[default]
    NoFiniteEstimate,
}

impl DayEstimate {
    pub fn days(&self) -> Option<u64> {
        match self {
            DayEstimate::Days(days) => Some(*days),
            DayEstimate::NoFiniteEstimate => None,
        }
    }
}

impl fmt::Display for DayEstimate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DayEstimate::Days(days) => write!(f, "{} days", days),
            DayEstimate::NoFiniteEstimate => write!(f, "n/a"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Peak {
    pub value: u64,
    pub index: usize,
}

/// Largest value and the position of its first occurrence.
pub fn find_peak(series: &[u64]) -> Option<Peak> {
    let mut peak: Option<Peak> = None;
    for (index, &value) in series.iter().enumerate() {
        match peak {
            Some(p) if value <= p.value => {}
            _ => peak = Some(Peak { value, index }),
        }
    }
    peak
}

/// Last vs first of the most recent week of daily values.
///
/// A two-point comparison, not a statistical test: a single noisy day at
/// either end flips the result. Fewer than a week of daily values is always
/// `Decreasing`, however the values move.
pub fn classify_trend(daily: &[u64]) -> Trend {
    if daily.len() < WEEK {
        return Trend::Decreasing;
    }
    let recent = &daily[daily.len() - WEEK..];
    match (recent.first(), recent.last()) {
        (Some(first), Some(last)) if last > first => Trend::Increasing,
        _ => Trend::Decreasing,
    }
}

/// Week-over-week growth of a cumulative series, in percent.
pub fn growth_rate(cumulative: &[u64]) -> Rate {
    match week_span(cumulative) {
        Some((previous, current)) if previous > 0 => {
            Rate::new((current as f64 - previous as f64) / previous as f64 * 100.0)
        }
        _ => Rate::ZERO,
    }
}

/// `7 / log2(c[-1] / c[-8])` rounded to whole days.
pub fn doubling_time(cumulative: &[u64]) -> DayEstimate {
    let Some((previous, current)) = week_span(cumulative) else {
        return DayEstimate::NoFiniteEstimate;
    };
    if previous == 0 || current <= previous {
        return DayEstimate::NoFiniteEstimate;
    }

    let doublings = (current as f64 / previous as f64).log2();
    let days = WEEK as f64 / doublings;
    if days.is_finite() {
        DayEstimate::Days(days.round() as u64)
    } else {
        DayEstimate::NoFiniteEstimate
    }
}

/// `(c[-8], c[-1])` when the series spans a full week.
fn week_span(cumulative: &[u64]) -> Option<(u64, u64)> {
    if cumulative.len() <= WEEK {
        return None;
    }
    let current = cumulative[cumulative.len() - 1];
    let previous = cumulative[cumulative.len() - 1 - WEEK];
    Some((previous, current))
}

/// Rounded mean of the last week of a daily series, always over 7 days.
fn weekly_mean(daily: &[u64]) -> u64 {
    let recent = &daily[daily.len().saturating_sub(WEEK)..];
    (recent.iter().sum::<u64>() as f64 / WEEK as f64).round() as u64
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendResult {
    pub trend: Trend,
    pub growth_rate: Rate,
    pub average_daily_cases: u64,
    pub average_daily_deaths: u64,
    pub peak_daily_cases: Peak,
    pub peak_daily_deaths: Peak,
    pub doubling_time: DayEstimate,
}

/// Trend and growth of cumulative cases (and deaths, which may be empty).
pub fn analyze_trend(cases: &[u64], deaths: &[u64]) -> Analysis<TrendResult> {
    if cases.is_empty() {
        return Analysis::Empty(EmptyReason::MissingInput);
    }

    let daily_cases = daily_deltas(cases);
    let daily_deaths = daily_deltas(deaths);

    Analysis::Ready(TrendResult {
        trend: classify_trend(&daily_cases),
        growth_rate: growth_rate(cases),
        average_daily_cases: weekly_mean(&daily_cases),
        average_daily_deaths: weekly_mean(&daily_deaths),
        peak_daily_cases: find_peak(&daily_cases).unwrap_or_default(),
        peak_daily_deaths: find_peak(&daily_deaths).unwrap_or_default(),
        doubling_time: doubling_time(cases),
    })
}

pub fn analyze_timeline(timeline: &Timeline) -> Analysis<TrendResult> {
    analyze_trend(&timeline.cases.values(), &timeline.deaths.values())
}

/// Ratios plus trend for one entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityAnalysis {
    pub rates: RateMetrics,
    pub trend: Analysis<TrendResult>,
}

impl EntityAnalysis {
    /// Trend label, `stable` when there was no history.
    pub fn trend_label(&self) -> Trend {
        self.trend.ready().map(|t| t.trend).unwrap_or(Trend::Stable)
    }

    pub fn growth_rate(&self) -> Rate {
        self.trend.ready().map(|t| t.growth_rate).unwrap_or(Rate::ZERO)
    }
}

pub fn analyze_entity(snapshot: &Snapshot, timeline: Option<&Timeline>) -> EntityAnalysis {
    let trend = match timeline {
        Some(timeline) => analyze_timeline(timeline),
        None => Analysis::Empty(EmptyReason::MissingInput),
    };
    EntityAnalysis {
        rates: calculate_rates(snapshot),
        trend,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SeriesTriple {
    pub cases: Vec<u64>,
    pub deaths: Vec<u64>,
    pub recovered: Vec<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistorySummary {
    /// 7-day moving averages of the daily deltas
    pub moving_averages: SeriesTriple,
    pub peak_cases: Peak,
    pub peak_deaths: Peak,
    pub total_cases: u64,
    pub total_deaths: u64,
    pub total_recovered: u64,
    /// Correlation between daily cases and daily deaths
    pub cases_deaths_correlation: f64,
}

/// Chart-ready summary of an entity's history.
pub fn summarize_history(timeline: &Timeline) -> Analysis<HistorySummary> {
    summarize_history_with_window(timeline, DEFAULT_WINDOW)
}

/// [`summarize_history`] smoothing over `window` days (0 is treated as 1).
pub fn summarize_history_with_window(timeline: &Timeline, window: usize) -> Analysis<HistorySummary> {
    if !timeline.has_cases() {
        return Analysis::Empty(EmptyReason::MissingInput);
    }

    let daily_cases = daily_deltas(&timeline.cases.values());
    let daily_deaths = daily_deltas(&timeline.deaths.values());
    let daily_recovered = daily_deltas(&timeline.recovered.values());

    let as_f64 = |series: &[u64]| series.iter().map(|&v| v as f64).collect::<Vec<_>>();
    let cases_deaths_correlation =
        pearson_correlation(&as_f64(&daily_cases), &as_f64(&daily_deaths));

    Analysis::Ready(HistorySummary {
        moving_averages: SeriesTriple {
            cases: smooth(&daily_cases, window),
            deaths: smooth(&daily_deaths, window),
            recovered: smooth(&daily_recovered, window),
        },
        peak_cases: find_peak(&daily_cases).unwrap_or_default(),
        peak_deaths: find_peak(&daily_deaths).unwrap_or_default(),
        total_cases: timeline.cases.last_value(),
        total_deaths: timeline.deaths.last_value(),
        total_recovered: timeline.recovered.last_value(),
        cases_deaths_correlation,
    })
}

fn smooth(series: &[u64], window: usize) -> Vec<u64> {
    moving_average(series, window.max(1)).unwrap_or_default()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VaccinationSummary {
    pub total_vaccinated: u64,
    pub average_daily_vaccinations: u64,
    /// 7-day moving average of daily doses
    pub vaccination_rate: Vec<u64>,
    pub days_to_full_coverage: DayEstimate,
}

/// Pace of a cumulative vaccination series against a population.
pub fn summarize_vaccination(coverage: &TimeSeries, population: Option<u64>) -> Analysis<VaccinationSummary> {
    if coverage.is_empty() {
        return Analysis::Empty(EmptyReason::MissingInput);
    }

    let daily = daily_deltas(&coverage.values());
    let total_vaccinated = coverage.last_value();
    let last_week: u64 = daily[daily.len().saturating_sub(WEEK)..].iter().sum();
    let per_day = last_week as f64 / WEEK as f64;

    let days_to_full_coverage = match population {
        Some(population) if last_week > 0 => {
            let remaining = population.saturating_sub(total_vaccinated) as f64;
            DayEstimate::Days((remaining / per_day).round() as u64)
        }
        _ => DayEstimate::NoFiniteEstimate,
    };

    Analysis::Ready(VaccinationSummary {
        total_vaccinated,
        average_daily_vaccinations: per_day.round() as u64,
        vaccination_rate: weekly_average(&daily),
        days_to_full_coverage,
    })
}

/// Short-term linear projections of daily values
///
/// A single least-squares line over the most recent window, extrapolated
/// forward. Confidence is the fit's pseudo-R² on that window, not a
/// prediction interval over the horizon.

use serde::Serialize;

use super::normalizer::daily_deltas;
use super::rates::Rate;
use super::regression::LinearFit;
use crate::core::error::AnalyticsError;

pub const FORECAST_WINDOW: usize = 14;
pub const MIN_FORECAST_DAYS: u32 = 1;
pub const MAX_FORECAST_DAYS: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    /// Offset from the last known day, starting at 1
    pub day: u32,
    pub cases: u64,
    pub total_cases: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentTotals {
    pub total_cases: u64,
    pub daily_cases: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Forecast {
    pub current: Option<CurrentTotals>,
    pub predictions: Vec<Prediction>,
    pub confidence: Rate,
}

impl Forecast {
    pub fn empty() -> Self {
        Self {
            current: None,
            predictions: Vec::new(),
            confidence: Rate::ZERO,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.predictions.is_empty()
    }
}

/// Rejects horizons outside `1..=30` days.
pub fn validate_horizon(days: u32) -> Result<u32, AnalyticsError> {
    if (MIN_FORECAST_DAYS..=MAX_FORECAST_DAYS).contains(&days) {
        Ok(days)
    } else {
        Err(AnalyticsError::InvalidParameter {
            name: "days".to_string(),
            reason: format!(
                "must be between {} and {}, got {}",
                MIN_FORECAST_DAYS, MAX_FORECAST_DAYS, days
            ),
        })
    }
}

/// Projects `days` daily values past the end of `daily`.
///
/// Each predicted total is `last_cumulative + predicted daily value`:
/// predictions do not compound on one another.
pub fn forecast_daily(daily: &[u64], last_cumulative: u64, days: u32, window: usize) -> Forecast {
    if daily.len() < 2 {
        return Forecast::empty();
    }

    let window = window.max(2);
    let recent: Vec<f64> = daily[daily.len().saturating_sub(window)..]
        .iter()
        .map(|&v| v as f64)
        .collect();

    let Some(fit) = LinearFit::fit(&recent) else {
        return Forecast::empty();
    };

    let predictions = (1..=days)
        .map(|day| {
            let x = (recent.len() as u32 + day - 1) as f64;
            let cases = fit.predict_at(x).round().max(0.0) as u64;
            Prediction {
                day,
                cases,
                total_cases: last_cumulative.saturating_add(cases),
            }
        })
        .collect();

    Forecast {
        current: Some(CurrentTotals {
            total_cases: last_cumulative,
            daily_cases: daily.last().copied().unwrap_or(0),
        }),
        predictions,
        confidence: Rate::new(fit.confidence()),
    }
}

/// [`forecast_daily`] over the deltas of a cumulative series.
pub fn forecast_cumulative(cumulative: &[u64], days: u32) -> Forecast {
    let daily = daily_deltas(cumulative);
    let last = cumulative.last().copied().unwrap_or(0);
    forecast_daily(&daily, last, days, FORECAST_WINDOW)
}

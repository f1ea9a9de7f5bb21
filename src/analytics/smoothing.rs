/// Trailing moving averages

use crate::core::error::AnalyticsError;

pub const DEFAULT_WINDOW: usize = 7;

/// Rounded trailing mean over `window` elements ending at each position.
///
/// The first `window - 1` outputs average only what is available, so the
/// output is never zero-padded and always has the input's length.
pub fn moving_average(series: &[u64], window: usize) -> Result<Vec<u64>, AnalyticsError> {
    if window == 0 {
        return Err(AnalyticsError::InvalidParameter {
            name: "window".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }

    let mut averages = Vec::with_capacity(series.len());
    let mut running: u128 = 0;
    for (i, &value) in series.iter().enumerate() {
        running += value as u128;
        if i >= window {
            running -= series[i - window] as u128;
        }
        let len = (i + 1).min(window);
        averages.push((running as f64 / len as f64).round() as u64);
    }
    Ok(averages)
}

/// [`moving_average`] with the default 7-day window.
pub fn weekly_average(series: &[u64]) -> Vec<u64> {
    moving_average(series, DEFAULT_WINDOW).unwrap_or_default()
}

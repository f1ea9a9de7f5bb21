/// Cumulative series to daily deltas

use crate::util::time_series::TimeSeries;

/// Day-over-day deltas of a cumulative sequence.
///
/// Same length as the input, first element 0. Upstream revisions that make
/// the cumulative count go down are clamped to 0 rather than reported.
pub fn daily_deltas(cumulative: &[u64]) -> Vec<u64> {
    let mut daily = Vec::with_capacity(cumulative.len());
    if cumulative.is_empty() {
        return daily;
    }

    daily.push(0);
    daily.extend(
        cumulative
            .windows(2)
            .map(|pair| pair[1].saturating_sub(pair[0])),
    );
    daily
}

pub fn daily_series(series: &TimeSeries) -> Vec<u64> {
    daily_deltas(&series.values())
}

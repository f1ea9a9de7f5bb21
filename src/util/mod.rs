/// Shared helpers: ordered time series and terminal output

pub mod display;
pub mod time_series;

/// Descriptive analytics over snapshots and cumulative time series
///
/// Everything below `service` is synchronous and pure. Functions that can
/// lack input return [`Analysis`] rather than failing, so a dashboard
/// keeps rendering with "no data" instead of an error.

pub mod aggregator;
pub mod forecast;
pub mod normalizer;
pub mod rates;
pub mod regression;
pub mod service;
pub mod smoothing;
pub mod trend;

use serde::Serialize;

pub use aggregator::*;
pub use forecast::*;
pub use normalizer::*;
pub use rates::*;
pub use regression::*;
pub use service::AnalyticsService;
pub use smoothing::*;
pub use trend::*;

/// Why an analysis produced nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "reason")]
pub enum EmptyReason {
    /// The input (timeline, coverage, ...) was absent or empty
    MissingInput,
    InsufficientData { required: usize, actual: usize },
}

/// Result of an analysis that degrades instead of failing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Analysis<T> {
    Ready(T),
    Empty(EmptyReason),
}

impl<T> Analysis<T> {
    pub fn is_ready(&self) -> bool {
        matches!(self, Analysis::Ready(_))
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            Analysis::Ready(value) => Some(value),
            Analysis::Empty(_) => None,
        }
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Analysis::Ready(value) => Some(value),
            Analysis::Empty(_) => None,
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Analysis<U> {
        match self {
            Analysis::Ready(value) => Analysis::Ready(f(value)),
            Analysis::Empty(reason) => Analysis::Empty(reason),
        }
    }
}

impl<T: Default> Analysis<T> {
    pub fn unwrap_or_default(self) -> T {
        self.into_option().unwrap_or_default()
    }
}

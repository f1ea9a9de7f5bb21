/// Upstream statistics access: the provider seam and its HTTP implementation

pub mod disease;
pub mod retry;

use async_trait::async_trait;

use crate::core::error::FetchError;
use crate::core::types::{HistoryRange, Snapshot};
use crate::util::time_series::{TimeSeries, Timeline};

pub use disease::DiseaseClient;
pub use retry::{with_retry, RetryPolicy};

/// Source of raw statistics consumed by the analytics service.
#[async_trait]
pub trait StatsProvider: Send + Sync {
    async fn global(&self) -> Result<Snapshot, FetchError>;

    /// Every entity, largest case count first.
    async fn entities(&self) -> Result<Vec<Snapshot>, FetchError>;

    async fn entity(&self, identifier: &str) -> Result<Snapshot, FetchError>;

    async fn history(&self, identifier: &str, range: HistoryRange) -> Result<Timeline, FetchError>;

    async fn global_history(&self, range: HistoryRange) -> Result<Timeline, FetchError>;

    /// Cumulative doses administered.
    async fn vaccine_coverage(&self, identifier: &str, range: HistoryRange) -> Result<TimeSeries, FetchError>;

    async fn global_vaccine_coverage(&self, range: HistoryRange) -> Result<TimeSeries, FetchError>;
}

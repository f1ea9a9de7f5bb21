/// disease.sh v3 client with response caching and retry

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument};
use url::Url;

use super::retry::{with_retry, RetryPolicy};
use super::StatsProvider;
use crate::cache::{cache_key, Clock, SystemClock, TtlCache};
use crate::config::{Api, Cache};
use crate::core::error::FetchError;
use crate::core::types::{HistoricalRecord, HistoryRange, Snapshot, VaccineCoverage};
use crate::util::time_series::{TimeSeries, Timeline};

pub struct DiseaseClient {
    client: Client,
    base_url: Url,
    retry: RetryPolicy,
    /// Raw response bodies; timelines rely on key order, so bodies are kept as text
    responses: TtlCache<Arc<str>>,
}

impl DiseaseClient {
    pub fn new(api: &Api, cache: &Cache) -> Result<Self, FetchError> {
        Self::with_clock(api, cache, Arc::new(SystemClock))
    }

    pub fn with_clock(api: &Api, cache: &Cache, clock: Arc<dyn Clock>) -> Result<Self, FetchError> {
        let client = Client::builder().timeout(api.timeout()).build()?;
        let base_url = Url::parse(&api.base_url)
            .map_err(|e| FetchError::InvalidUrl(format!("{}: {}", api.base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(FetchError::InvalidUrl(api.base_url.clone()));
        }

        info!(base_url = %base_url, "🌐 Upstream client ready");

        Ok(Self {
            client,
            base_url,
            retry: RetryPolicy {
                max_attempts: api.max_attempts,
                base_delay: api.base_delay(),
                ..RetryPolicy::default()
            },
            responses: TtlCache::with_clock("responses", cache.raw_ttl(), clock),
        })
    }

    /// Builds `{base}/{segments...}?{query}` with each segment percent-encoded.
    pub fn endpoint(&self, segments: &[&str], query: &[(&str, String)]) -> Result<Url, FetchError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| FetchError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, key: &str, url: Url) -> Result<T, FetchError> {
        let body = match self.responses.get(key) {
            Some(body) => body,
            None => {
                let target = &url;
                let body: Arc<str> = with_retry(&self.retry, key, move || self.fetch_body(target))
                    .await?
                    .into();
                self.responses.insert(key, Arc::clone(&body));
                body
            }
        };

        serde_json::from_str(&body).map_err(|source| FetchError::Decode {
            url: url.to_string(),
            source,
        })
    }

    async fn fetch_body(&self, url: &Url) -> Result<String, FetchError> {
        debug!(url = %url, "Fetching upstream data");

        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound(url.to_string()));
        }
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        Ok(response.text().await?)
    }
}

fn range_query(range: HistoryRange) -> (&'static str, String) {
    ("lastdays", range.to_string())
}

#[async_trait]
impl StatsProvider for DiseaseClient {
    #[instrument(skip(self))]
    async fn global(&self) -> Result<Snapshot, FetchError> {
        let url = self.endpoint(&["all"], &[])?;
        self.get_json("all", url).await
    }

    #[instrument(skip(self))]
    async fn entities(&self) -> Result<Vec<Snapshot>, FetchError> {
        let url = self.endpoint(&["countries"], &[("sort", "cases".to_string())])?;
        self.get_json("countries", url).await
    }

    #[instrument(skip(self))]
    async fn entity(&self, identifier: &str) -> Result<Snapshot, FetchError> {
        let url = self.endpoint(&["countries", identifier], &[])?;
        self.get_json(&cache_key("country", &[identifier]), url).await
    }

    #[instrument(skip(self))]
    async fn history(&self, identifier: &str, range: HistoryRange) -> Result<Timeline, FetchError> {
        let url = self.endpoint(&["historical", identifier], &[range_query(range)])?;
        let key = cache_key("historical", &[identifier, &range.to_string()]);
        let record: HistoricalRecord = self.get_json(&key, url).await?;
        Ok(record.timeline)
    }

    #[instrument(skip(self))]
    async fn global_history(&self, range: HistoryRange) -> Result<Timeline, FetchError> {
        let url = self.endpoint(&["historical", "all"], &[range_query(range)])?;
        let key = cache_key("historical-global", &[&range.to_string()]);
        self.get_json(&key, url).await
    }

    #[instrument(skip(self))]
    async fn vaccine_coverage(&self, identifier: &str, range: HistoryRange) -> Result<TimeSeries, FetchError> {
        let url = self.endpoint(
            &["vaccine", "coverage", "countries", identifier],
            &[range_query(range), ("fullData", "true".to_string())],
        )?;
        let key = cache_key("vaccine", &[identifier, &range.to_string()]);
        let coverage: VaccineCoverage = self.get_json(&key, url).await?;
        Ok(coverage.timeline)
    }

    #[instrument(skip(self))]
    async fn global_vaccine_coverage(&self, range: HistoryRange) -> Result<TimeSeries, FetchError> {
        let url = self.endpoint(
            &["vaccine", "coverage"],
            &[range_query(range), ("fullData", "true".to_string())],
        )?;
        let key = cache_key("vaccine-global", &[&range.to_string()]);
        self.get_json(&key, url).await
    }
}

/// In-memory TTL caching for fetched data and derived analytics

pub mod ttl_cache;

pub use ttl_cache::{cache_key, CacheStats, Clock, ManualClock, SystemClock, TtlCache};

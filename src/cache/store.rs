//! TTL-bounded LRU storage for content lookups.

use std::{future::Future, sync::Arc, sync::RwLock};

use lru::LruCache;
use metrics::counter;
use time::{Duration, OffsetDateTime};
use tracing::debug;

use crate::{
    application::content::{LinkEntry, SearchHit},
    domain::entities::{HeadingRecord, SubHeadingRecord},
    util::clock::Clock,
};

use super::{
    config::CacheConfig,
    keys::ContentKey,
    lock::{rw_read, rw_write},
};

pub const METRIC_CACHE_HIT: &str = "asksniff_cache_hit_total";
pub const METRIC_CACHE_MISS: &str = "asksniff_cache_miss_total";
pub const METRIC_CACHE_EVICT: &str = "asksniff_cache_evict_total";

/// A cached lookup result.
#[derive(Debug, Clone)]
pub enum CachedContent {
    Headings(Vec<HeadingRecord>),
    Description(Option<String>),
    SubHeadings(Vec<SubHeadingRecord>),
    SearchHits(Vec<SearchHit>),
    Links(Vec<LinkEntry>),
}

/// Values that can travel through [`ContentCache`].
pub trait CacheValue: Clone + Sized {
    fn into_cached(self) -> CachedContent;
    fn from_cached(cached: CachedContent) -> Option<Self>;
    fn is_empty_value(&self) -> bool;
}

macro_rules! vec_cache_value {
    ($item:ty, $variant:ident) => {
        impl CacheValue for Vec<$item> {
            fn into_cached(self) -> CachedContent {
                CachedContent::$variant(self)
            }

            fn from_cached(cached: CachedContent) -> Option<Self> {
                match cached {
                    CachedContent::$variant(value) => Some(value),
                    _ => None,
                }
            }

            fn is_empty_value(&self) -> bool {
                self.is_empty()
            }
        }
    };
}

vec_cache_value!(HeadingRecord, Headings);
vec_cache_value!(SubHeadingRecord, SubHeadings);
vec_cache_value!(SearchHit, SearchHits);
vec_cache_value!(LinkEntry, Links);

impl CacheValue for Option<String> {
    fn into_cached(self) -> CachedContent {
        CachedContent::Description(self)
    }

    fn from_cached(cached: CachedContent) -> Option<Self> {
        match cached {
            CachedContent::Description(value) => Some(value),
            _ => None,
        }
    }

    fn is_empty_value(&self) -> bool {
        self.is_none()
    }
}

#[derive(Debug, Clone)]
struct Entry {
    value: CachedContent,
    expires_at: OffsetDateTime,
}

/// Content cache shared by all request handlers.
///
/// Entries live for the configured TTL from the moment they are stored and
/// are never invalidated by writes. Capacity is bounded with LRU eviction.
pub struct ContentCache {
    enabled: bool,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entries: RwLock<LruCache<ContentKey, Entry>>,
}

impl ContentCache {
    pub fn new(config: &CacheConfig, clock: Arc<dyn Clock>) -> Self {
        let ttl_seconds = i64::try_from(config.ttl_seconds).unwrap_or(i64::MAX);
        Self {
            enabled: config.enabled,
            ttl: Duration::seconds(ttl_seconds),
            clock,
            entries: RwLock::new(LruCache::new(config.entry_limit_non_zero())),
        }
    }

    /// Return the cached value for `key`, or run `compute` and store its result.
    ///
    /// Errors from `compute` are passed through and never cached. Empty values
    /// are stored only when [`ContentKey::caches_empty`] allows it.
    pub async fn get_or_compute<T, F, Fut, E>(&self, key: ContentKey, compute: F) -> Result<T, E>
    where
        T: CacheValue,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if !self.enabled {
            return compute().await;
        }

        if let Some(value) = self.get::<T>(&key) {
            counter!(METRIC_CACHE_HIT, "kind" => key.kind()).increment(1);
            return Ok(value);
        }
        counter!(METRIC_CACHE_MISS, "kind" => key.kind()).increment(1);

        let value = compute().await?;
        if !value.is_empty_value() || key.caches_empty() {
            self.insert(key, value.clone());
        }
        Ok(value)
    }

    /// Look up a live entry, dropping it if it has expired.
    pub fn get<T: CacheValue>(&self, key: &ContentKey) -> Option<T> {
        let now = self.clock.now();
        let mut entries = rw_write(&self.entries, "get");
        let entry = entries.get(key)?;
        if entry.expires_at <= now {
            entries.pop(key);
            debug!(
                target = "asksniff::cache",
                kind = key.kind(),
                "Expired cache entry dropped"
            );
            return None;
        }
        T::from_cached(entry.value.clone())
    }

    pub fn insert<T: CacheValue>(&self, key: ContentKey, value: T) {
        let expires_at = self.clock.now().saturating_add(self.ttl);
        let kind = key.kind();
        let evicted = rw_write(&self.entries, "insert").push(
            key.clone(),
            Entry {
                value: value.into_cached(),
                expires_at,
            },
        );
        match evicted {
            Some((evicted_key, _)) if evicted_key != key => {
                counter!(METRIC_CACHE_EVICT, "kind" => evicted_key.kind()).increment(1);
                debug!(
                    target = "asksniff::cache",
                    kind,
                    evicted = evicted_key.kind(),
                    "Cache entry evicted"
                );
            }
            _ => {}
        }
    }

    pub fn len(&self) -> usize {
        rw_read(&self.entries, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        rw_write(&self.entries, "clear").clear();
    }
}

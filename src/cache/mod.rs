//! In-process content cache.
//!
//! Symptom, heading, search and link-index lookups are served from a single
//! LRU store whose entries expire after a fixed TTL (15 minutes by default).
//! Writes never invalidate entries, so readers may see content up to one TTL
//! old.
//!
//! ```toml
//! [cache]
//! enabled = true
//! ttl_seconds = 900
//! entry_limit = 1000
//! ```

mod config;
mod keys;
mod lock;
mod store;

pub use config::CacheConfig;
pub use keys::ContentKey;
pub use store::{
    CacheValue, CachedContent, ContentCache, METRIC_CACHE_EVICT, METRIC_CACHE_HIT,
    METRIC_CACHE_MISS,
};

//! TTL cache module.
//!
//! - [`TtlCache`]: the map itself, expiry and eviction
//! - [`CacheConfig`] / [`CacheOptions`]: defaults and per-write overrides
//! - [`CacheStats`]: counters snapshot
//! - `sweeper`: `start()`/`stop()` lifecycle of the periodic sweep

mod config;
mod stats;
mod sweeper;
mod ttl;

pub use config::{
    CacheConfig, CacheOptions, DEFAULT_MAX_SIZE, DEFAULT_SWEEP_INTERVAL, DEFAULT_TTL,
};
pub use stats::CacheStats;
pub use ttl::TtlCache;

//! ICMS Storage - In-process caching
//!
//! A generic key/value cache with per-entry expiry, capacity eviction by
//! store time, regex invalidation and an explicitly started background
//! sweeper.

pub mod cache;

pub use cache::{CacheConfig, CacheOptions, CacheStats, TtlCache};

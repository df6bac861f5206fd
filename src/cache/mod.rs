//! Cache module for storing API responses locally
//!
//! This module provides a cache manager that persists API responses through
//! a pluggable key/value store with a fixed 24-hour freshness window. Data
//! is cached per category to minimize API costs; expired entries are
//! evicted on read and swept in bulk by a background task, while a bounded
//! stale-read path supports graceful degradation when the API is
//! unavailable.

mod manager;
pub mod store;

pub use manager::{CacheEntryInfo, CacheManager};

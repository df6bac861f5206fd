//! Bestshelf: cached bestseller catalog data layer
//!
//! An embedded library for catalog-browsing clients that display Amazon
//! bestseller lists by category. Product data comes from the Rainforest
//! API and is cached locally for 24 hours per category to minimize API
//! costs; stale data is served as a degraded fallback when the API is
//! unavailable, and background tasks sweep expired entries and refresh
//! aged categories.

pub mod aggregate;
pub mod cache;
pub mod data;
pub mod fetcher;
pub mod refresh;

pub use aggregate::{AggregateFetcher, ALL_CATEGORIES_CACHE_KEY};
pub use cache::{CacheEntryInfo, CacheManager};
pub use fetcher::{CategoryFetcher, FetchOutcome};
pub use refresh::{
    AutoRefreshConfig, AutoRefreshHandle, RefreshMessage, SweeperConfig, SweeperHandle,
};

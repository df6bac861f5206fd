//! Per-category fetch orchestration
//!
//! Combines the cache manager with the remote source under a cache-first,
//! network-fallback, stale-on-error policy:
//!
//! - a fresh cache entry is served without touching the network
//! - on a miss (or a forced refresh) the API is called and a non-empty
//!   result is written back through the cache
//! - on an API failure the raw stored record is served as a degraded
//!   fallback, with a warning attached, if one is still within the
//!   staleness bound

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::cache::CacheManager;
use crate::data::{ApiError, BestsellerSource, CachedBestsellers, Product};

/// Result of a category fetch
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    /// The rank-ordered product list (may be empty)
    pub products: Vec<Product>,
    /// Whether the data came from the cache rather than the network
    pub from_cache: bool,
    /// When the data was originally fetched from the API
    pub last_updated: DateTime<Utc>,
    /// Present when stale cached data is being served after a failure
    pub warning: Option<String>,
}

/// Fetches one category's bestseller list with caching and stale fallback
#[derive(Clone)]
pub struct CategoryFetcher {
    cache: CacheManager,
    source: Arc<dyn BestsellerSource>,
    category_id: String,
}

impl CategoryFetcher {
    /// Creates a fetcher for one category
    pub fn new(
        cache: CacheManager,
        source: Arc<dyn BestsellerSource>,
        category_id: impl Into<String>,
    ) -> Self {
        Self {
            cache,
            source,
            category_id: category_id.into(),
        }
    }

    /// The category this fetcher serves
    pub fn category_id(&self) -> &str {
        &self.category_id
    }

    /// Produces the best available product list for the category
    ///
    /// With `force_refresh` the cache read is skipped entirely and the API
    /// is always called; the cache is still used as a fallback if that
    /// call fails.
    ///
    /// Returns `Err` only on a hard failure with no cached data to fall
    /// back on.
    pub async fn fetch(&self, force_refresh: bool) -> Result<FetchOutcome, ApiError> {
        if !force_refresh {
            if let Some(cached) = self.cache.get::<CachedBestsellers>(&self.category_id).await {
                if cached.has_products() {
                    debug!(category = %self.category_id, "serving bestsellers from cache");
                    return Ok(FetchOutcome {
                        last_updated: millis_to_datetime(cached.fetched_at),
                        products: cached.bestsellers,
                        from_cache: true,
                        warning: None,
                    });
                }
            }
        }

        debug!(category = %self.category_id, "fetching bestsellers from API");
        match self.source.fetch_bestsellers(&self.category_id).await {
            Ok(products) => {
                let now = Utc::now();
                // The cache write happens before the outcome is returned.
                // An empty list is handed to the caller but never cached.
                if !products.is_empty() {
                    let payload = CachedBestsellers {
                        bestsellers: products.clone(),
                        fetched_at: now.timestamp_millis(),
                    };
                    self.cache.set(&self.category_id, &payload).await;
                }
                Ok(FetchOutcome {
                    products,
                    from_cache: false,
                    last_updated: now,
                    warning: None,
                })
            }
            Err(err) => {
                if let Some(stale) = self
                    .cache
                    .get_stale::<CachedBestsellers>(&self.category_id)
                    .await
                {
                    if stale.has_products() {
                        warn!(
                            category = %self.category_id,
                            error = %err,
                            "API fetch failed, serving stale cached data"
                        );
                        return Ok(FetchOutcome {
                            last_updated: millis_to_datetime(stale.fetched_at),
                            products: stale.bestsellers,
                            from_cache: true,
                            warning: Some(format!("{err} (showing cached data)")),
                        });
                    }
                }
                Err(err)
            }
        }
    }

    /// User-triggered refresh: always bypasses the cache read
    pub async fn refetch(&self) -> Result<FetchOutcome, ApiError> {
        self.fetch(true).await
    }
}

/// Converts an epoch-milliseconds stamp into a `DateTime`
fn millis_to_datetime(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or_else(Utc::now)
}

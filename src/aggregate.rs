//! Aggregate fetch across all tracked categories
//!
//! Fans the per-category policy out over the static category table
//! concurrently, caches the combined snapshot under its own reserved key,
//! and derives read-only projections (trending, top-rated, price
//! insights) over the result.
//!
//! A failure in one category degrades that category to an empty product
//! list; it never aborts the sibling fetches or the aggregate as a whole.

use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use tracing::{debug, warn};

use crate::cache::CacheManager;
use crate::data::{
    all_categories, AggregateSnapshot, BestsellerSource, CachedBestsellers, Category,
    CategorySnapshot, PriceStats, TrendingProduct,
};

/// Reserved cache key for the combined snapshot, distinct from every
/// per-category key
pub const ALL_CATEGORIES_CACHE_KEY: &str = "all_categories_data";

/// Maximum number of products returned by the top-rated view
const TOP_RATED_LIMIT: usize = 20;

/// Fetches and aggregates bestseller data for every tracked category
#[derive(Clone)]
pub struct AggregateFetcher {
    cache: CacheManager,
    source: Arc<dyn BestsellerSource>,
}

impl AggregateFetcher {
    /// Creates an aggregate fetcher sharing the given cache namespace
    pub fn new(cache: CacheManager, source: Arc<dyn BestsellerSource>) -> Self {
        Self { cache, source }
    }

    /// Produces the combined snapshot across all tracked categories
    ///
    /// Without `force_refresh`, a fresh cached snapshot is adopted
    /// wholesale; per-category freshness is not re-validated once the
    /// aggregate envelope itself is fresh. Otherwise every category is
    /// fetched concurrently (each consulting its own cache first) and the
    /// assembled snapshot is written back under the reserved key.
    pub async fn fetch_all(&self, force_refresh: bool) -> AggregateSnapshot {
        if !force_refresh {
            if let Some(cached) = self
                .cache
                .get::<AggregateSnapshot>(ALL_CATEGORIES_CACHE_KEY)
                .await
            {
                if cached.has_categories() {
                    debug!("serving aggregate snapshot from cache");
                    return cached;
                }
            }
        }

        debug!("fetching all bestseller categories");
        let tasks = all_categories()
            .iter()
            .map(|category| self.fetch_category(category));
        let categories = join_all(tasks).await;

        let snapshot = AggregateSnapshot {
            categories,
            last_full_fetch: Utc::now().timestamp_millis(),
        };

        // Only this top-level flow ever writes the reserved key
        self.cache.set(ALL_CATEGORIES_CACHE_KEY, &snapshot).await;
        debug!(count = snapshot.categories.len(), "aggregate fetch complete");
        snapshot
    }

    /// Fetches one category inside its own error boundary
    ///
    /// Consults the category's individual cache first, then the API. A
    /// failure degrades to an empty product list so sibling categories
    /// are unaffected.
    async fn fetch_category(&self, category: &Category) -> CategorySnapshot {
        if let Some(cached) = self.cache.get::<CachedBestsellers>(category.id).await {
            if cached.has_products() {
                return CategorySnapshot {
                    category_id: category.id.to_string(),
                    category_name: category.name.to_string(),
                    products: cached.bestsellers,
                    fetched_at: cached.fetched_at,
                };
            }
        }

        match self.source.fetch_bestsellers(category.id).await {
            Ok(products) => {
                let now = Utc::now().timestamp_millis();
                if !products.is_empty() {
                    let payload = CachedBestsellers {
                        bestsellers: products.clone(),
                        fetched_at: now,
                    };
                    self.cache.set(category.id, &payload).await;
                }
                CategorySnapshot {
                    category_id: category.id.to_string(),
                    category_name: category.name.to_string(),
                    products,
                    fetched_at: now,
                }
            }
            Err(err) => {
                warn!(
                    category = category.id,
                    error = %err,
                    "category fetch failed, degrading to empty list"
                );
                CategorySnapshot {
                    category_id: category.id.to_string(),
                    category_name: category.name.to_string(),
                    products: Vec::new(),
                    fetched_at: Utc::now().timestamp_millis(),
                }
            }
        }
    }
}

impl AggregateSnapshot {
    /// Top-ranked product of each non-empty category
    ///
    /// Assumes each category's list is already rank-ordered upstream.
    pub fn trending(&self) -> Vec<TrendingProduct> {
        self.categories
            .iter()
            .filter_map(|category| {
                category.products.first().map(|product| TrendingProduct {
                    product: product.clone(),
                    category_name: category.category_name.clone(),
                })
            })
            .collect()
    }

    /// The 20 highest-rated products across all categories
    ///
    /// Products without a positive rating are excluded. The sort is
    /// stable, so tied ratings keep category-table order.
    pub fn top_rated(&self) -> Vec<TrendingProduct> {
        let mut rated: Vec<TrendingProduct> = self
            .categories
            .iter()
            .flat_map(|category| {
                category
                    .products
                    .iter()
                    .filter(|product| product.rating.is_some_and(|r| r > 0.0))
                    .map(|product| TrendingProduct {
                        product: product.clone(),
                        category_name: category.category_name.clone(),
                    })
            })
            .collect();

        rated.sort_by(|a, b| {
            let rating_a = a.product.rating.unwrap_or(0.0);
            let rating_b = b.product.rating.unwrap_or(0.0);
            rating_b.total_cmp(&rating_a)
        });
        rated.truncate(TOP_RATED_LIMIT);
        rated
    }

    /// Price statistics per non-empty category
    ///
    /// Products without a defined positive price are excluded from the
    /// statistics but still counted in `product_count`; a category with no
    /// priced products reports zero for all three statistics.
    pub fn price_insights(&self) -> Vec<PriceStats> {
        self.categories
            .iter()
            .filter(|category| !category.products.is_empty())
            .map(|category| {
                let prices: Vec<f64> = category
                    .products
                    .iter()
                    .filter_map(|product| product.price.as_ref().and_then(|p| p.value))
                    .filter(|value| *value > 0.0)
                    .collect();

                if prices.is_empty() {
                    return PriceStats {
                        category: category.category_name.clone(),
                        avg_price: 0.0,
                        min_price: 0.0,
                        max_price: 0.0,
                        product_count: category.products.len(),
                    };
                }

                let sum: f64 = prices.iter().sum();
                let min = prices.iter().copied().fold(f64::INFINITY, f64::min);
                let max = prices.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                PriceStats {
                    category: category.category_name.clone(),
                    avg_price: sum / prices.len() as f64,
                    min_price: min,
                    max_price: max,
                    product_count: category.products.len(),
                }
            })
            .collect()
    }
}

//! Core data models for the bestseller catalog
//!
//! This module contains the product and snapshot types used throughout the
//! crate, the static category table, and the remote API client.

pub mod api;
pub mod category;

pub use api::{ApiError, BestsellerSource, RainforestClient};
pub use category::{all_categories, get_category_by_id, Category};

use serde::{Deserialize, Serialize};

/// Price of a product as reported by the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Price {
    /// Numeric amount, if known
    pub value: Option<f64>,
    /// ISO currency code, e.g. "USD"
    pub currency: Option<String>,
    /// Whether the price is a discounted one
    pub discounted: Option<bool>,
}

/// A single bestseller product
///
/// Every field is optional because the upstream API omits fields freely.
/// The cache layer never inspects these fields; only the aggregation views
/// do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Rank within the category list (1 = top seller)
    pub position: Option<u32>,
    /// Amazon product identifier
    pub asin: Option<String>,
    /// Product title
    pub title: Option<String>,
    /// Product page URL
    pub link: Option<String>,
    /// Product image URL
    pub image: Option<String>,
    /// Average star rating
    pub rating: Option<f64>,
    /// Number of ratings
    pub ratings_total: Option<u64>,
    /// Price information
    pub price: Option<Price>,
}

/// Per-category payload persisted under that category's cache key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedBestsellers {
    /// The rank-ordered product list
    pub bestsellers: Vec<Product>,
    /// When the list was fetched from the API, epoch milliseconds
    #[serde(rename = "fetchedAt")]
    pub fetched_at: i64,
}

impl CachedBestsellers {
    /// The shared hit predicate: a cached list is only usable when it
    /// actually contains products. Every consumer goes through this check
    /// so hit/miss semantics never diverge between call sites.
    pub fn has_products(&self) -> bool {
        !self.bestsellers.is_empty()
    }
}

/// One category's slice of the aggregate snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySnapshot {
    /// Category identifier
    pub category_id: String,
    /// Human-readable category name
    pub category_name: String,
    /// Products for the category; empty when its fetch failed
    pub products: Vec<Product>,
    /// When this category's data was fetched, epoch milliseconds
    ///
    /// May predate the snapshot's own `last_full_fetch` when the category
    /// was served from its individual cache.
    pub fetched_at: i64,
}

/// The combined view across all tracked categories
///
/// Cached as one record under a reserved key distinct from the
/// per-category keys it aggregates over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateSnapshot {
    /// One snapshot per tracked category
    pub categories: Vec<CategorySnapshot>,
    /// When the full fan-out completed, epoch milliseconds
    pub last_full_fetch: i64,
}

impl AggregateSnapshot {
    /// Hit predicate for the cached aggregate record
    pub fn has_categories(&self) -> bool {
        !self.categories.is_empty()
    }
}

/// A product paired with the category it came from, used by the derived
/// trending and top-rated views
#[derive(Debug, Clone, PartialEq)]
pub struct TrendingProduct {
    pub product: Product,
    pub category_name: String,
}

/// Price statistics for one category
///
/// All-zero price fields mean "no priced products", not "everything is
/// free"; `product_count` still reports the raw list length.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceStats {
    pub category: String,
    pub avg_price: f64,
    pub min_price: f64,
    pub max_price: f64,
    pub product_count: usize,
}

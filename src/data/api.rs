//! Rainforest product API client
//!
//! Fetches Amazon bestseller lists by category from the Rainforest API and
//! classifies failures into actionable error variants. The `BestsellerSource`
//! trait is the seam the fetchers depend on, so tests can substitute a
//! scripted source.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use super::Product;

/// Base URL for the Rainforest API request endpoint
const RAINFOREST_BASE_URL: &str = "https://api.rainforestapi.com/request";

/// Errors that can occur when fetching bestseller data
#[derive(Debug, Error)]
pub enum ApiError {
    /// Credentials were rejected
    #[error("API key was rejected; check your Rainforest credentials")]
    Unauthorized,

    /// Account is out of credits
    #[error("API credits are exhausted; top up your Rainforest plan")]
    QuotaExhausted,

    /// Too many requests in a short window
    #[error("rate limited by the API; retry later")]
    RateLimited,

    /// The category id is not known upstream
    #[error("unknown bestseller category: {0}")]
    NotFound(String),

    /// Any other non-success HTTP status
    #[error("unexpected HTTP status {0} from the API")]
    Http(StatusCode),

    /// Transport-level failure
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Response body did not match the expected shape
    #[error("failed to parse API response: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Remote collaborator returning the bestseller list for one category
#[async_trait]
pub trait BestsellerSource: Send + Sync {
    /// Fetches the rank-ordered product list for `category_id`
    async fn fetch_bestsellers(&self, category_id: &str) -> Result<Vec<Product>, ApiError>;
}

/// Billing metadata returned alongside every response
#[derive(Debug, Deserialize)]
struct RequestInfo {
    #[allow(dead_code)]
    success: Option<bool>,
    credits_used: Option<u64>,
    credits_remaining: Option<u64>,
}

/// Top-level Rainforest response shape
#[derive(Debug, Deserialize)]
struct BestsellersResponse {
    request_info: Option<RequestInfo>,
    bestsellers: Option<Vec<Product>>,
}

/// Client for the Rainforest bestsellers endpoint
#[derive(Debug, Clone)]
pub struct RainforestClient {
    client: Client,
    api_key: String,
    amazon_domain: String,
    language: String,
    base_url: String,
}

impl RainforestClient {
    /// Creates a client for amazon.com in US English
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            amazon_domain: "amazon.com".to_string(),
            language: "en_US".to_string(),
            base_url: RAINFOREST_BASE_URL.to_string(),
        }
    }

    /// Overrides the Amazon marketplace domain
    pub fn with_domain(mut self, amazon_domain: impl Into<String>) -> Self {
        self.amazon_domain = amazon_domain.into();
        self
    }

    /// Overrides the result language
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Fetches and parses one category's bestseller list
    async fn fetch_from_api(&self, category_id: &str) -> Result<Vec<Product>, ApiError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("type", "bestsellers"),
                ("amazon_domain", self.amazon_domain.as_str()),
                ("category_id", category_id),
                ("language", self.language.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(classify_status(status, category_id));
        }

        let text = response.text().await?;
        let parsed: BestsellersResponse = serde_json::from_str(&text)?;

        if let Some(info) = &parsed.request_info {
            debug!(
                category = category_id,
                credits_used = info.credits_used,
                credits_remaining = info.credits_remaining,
                "rainforest request completed"
            );
        }

        Ok(parsed.bestsellers.unwrap_or_default())
    }
}

#[async_trait]
impl BestsellerSource for RainforestClient {
    async fn fetch_bestsellers(&self, category_id: &str) -> Result<Vec<Product>, ApiError> {
        self.fetch_from_api(category_id).await
    }
}

/// Maps a non-success HTTP status to an error variant
fn classify_status(status: StatusCode, category_id: &str) -> ApiError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ApiError::Unauthorized,
        StatusCode::PAYMENT_REQUIRED => ApiError::QuotaExhausted,
        StatusCode::TOO_MANY_REQUESTS => ApiError::RateLimited,
        StatusCode::NOT_FOUND => ApiError::NotFound(category_id.to_string()),
        other => ApiError::Http(other),
    }
}

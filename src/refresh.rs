//! Background refresh and cache sweep system
//!
//! Provides the two timer-driven behaviors of the cache layer as owned
//! resources with explicit start/stop lifecycles, using tokio channels to
//! communicate updates back to the embedding application:
//!
//! - `SweeperHandle` periodically evicts expired entries across the whole
//!   cache namespace, with an out-of-band trigger for app-foreground
//!   transitions
//! - `AutoRefreshHandle` watches one category served from cache and
//!   silently re-fetches once the cached data outlives the freshness
//!   window

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::cache::CacheManager;
use crate::data::Product;
use crate::fetcher::CategoryFetcher;

/// Messages sent from background tasks to the embedding application
#[derive(Debug, Clone)]
pub enum RefreshMessage {
    /// A category's bestseller list was refreshed after its cache expired
    BestsellersUpdated {
        category_id: String,
        products: Vec<Product>,
    },
    /// A cleanup pass finished, removing `removed` expired entries
    SweepCompleted { removed: usize },
    /// A background refresh attempt failed
    RefreshError(String),
}

/// Configuration for the periodic cache sweep
#[derive(Debug, Clone)]
pub struct SweeperConfig {
    /// Interval between cleanup passes
    pub interval: Duration,
    /// Whether to run a cleanup pass immediately on spawn
    pub run_at_start: bool,
    /// Whether the sweeper is enabled at all
    pub enabled: bool,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3600), // hourly
            run_at_start: true,
            enabled: true,
        }
    }
}

/// Handle for the process-wide cache sweep task
///
/// Spawn exactly once per process and tear down with `shutdown`;
/// re-spawning without shutting down accumulates duplicate timers.
pub struct SweeperHandle {
    /// Channel delivering `SweepCompleted` messages
    pub receiver: mpsc::Receiver<RefreshMessage>,
    /// Requests an immediate out-of-band sweep
    trigger_tx: mpsc::Sender<()>,
    /// Signals the background task to stop
    shutdown_tx: mpsc::Sender<()>,
}

impl SweeperHandle {
    /// Spawns the background sweep task
    pub fn spawn(cache: CacheManager, config: SweeperConfig) -> Self {
        let (msg_tx, msg_rx) = mpsc::channel(32);
        let (trigger_tx, mut trigger_rx) = mpsc::channel::<()>(1);
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        if config.enabled {
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(config.interval);
                if !config.run_at_start {
                    // Consume the immediate first tick
                    interval.tick().await;
                }

                loop {
                    tokio::select! {
                        _ = interval.tick() => {}
                        triggered = trigger_rx.recv() => {
                            if triggered.is_none() {
                                break;
                            }
                        }
                        _ = shutdown_rx.recv() => break,
                    }

                    let removed = cache.cleanup_expired().await;
                    if msg_tx
                        .send(RefreshMessage::SweepCompleted { removed })
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
            });
        }

        Self {
            receiver: msg_rx,
            trigger_tx,
            shutdown_tx,
        }
    }

    /// Requests an immediate sweep, e.g. when the app returns to the
    /// foreground
    ///
    /// Coalesces with an already-pending trigger.
    pub fn notify_foreground(&self) {
        let _ = self.trigger_tx.try_send(());
    }

    /// Checks for a pending message without blocking
    pub fn try_recv(&mut self) -> Option<RefreshMessage> {
        self.receiver.try_recv().ok()
    }

    /// Shuts down the background sweep task
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

/// Configuration for the per-category cache-age watcher
#[derive(Debug, Clone)]
pub struct AutoRefreshConfig {
    /// Interval between cache-age checks
    pub check_interval: Duration,
    /// Whether the watcher is enabled at all
    pub enabled: bool,
}

impl Default for AutoRefreshConfig {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(3600), // hourly
            enabled: true,
        }
    }
}

/// Handle for one category's auto-refresh watcher
///
/// Started when a consumer is serving cached data; once the cached data's
/// age exceeds the freshness window, the watcher silently re-fetches and
/// delivers the result as a `BestsellersUpdated` message. Dropping or
/// shutting down the handle cancels the timer; a fetch that races
/// shutdown is discarded rather than delivered.
pub struct AutoRefreshHandle {
    /// Channel delivering refresh results
    pub receiver: mpsc::Receiver<RefreshMessage>,
    /// Signals the background task to stop
    shutdown_tx: mpsc::Sender<()>,
}

impl AutoRefreshHandle {
    /// Spawns the watcher for a category currently served from cache
    ///
    /// # Arguments
    /// * `fetcher` - The fetcher for the watched category
    /// * `last_updated` - When the cached data being served was fetched
    /// * `config` - Check interval and enablement
    pub fn spawn(
        fetcher: CategoryFetcher,
        last_updated: DateTime<Utc>,
        config: AutoRefreshConfig,
    ) -> Self {
        let (msg_tx, msg_rx) = mpsc::channel(32);
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        if config.enabled {
            tokio::spawn(async move {
                let mut last_updated = last_updated;
                // The first tick fires immediately, covering data that
                // expired before the watcher was spawned
                let mut interval = tokio::time::interval(config.check_interval);

                loop {
                    tokio::select! {
                        _ = interval.tick() => {}
                        _ = shutdown_rx.recv() => break,
                    }

                    let age = Utc::now() - last_updated;
                    if age <= CacheManager::freshness_window() {
                        continue;
                    }

                    debug!(
                        category = fetcher.category_id(),
                        age_hours = age.num_hours(),
                        "cached bestsellers expired, auto-refreshing"
                    );

                    tokio::select! {
                        result = fetcher.fetch(false) => {
                            let message = match result {
                                Ok(outcome) => {
                                    last_updated = outcome.last_updated;
                                    RefreshMessage::BestsellersUpdated {
                                        category_id: fetcher.category_id().to_string(),
                                        products: outcome.products,
                                    }
                                }
                                Err(err) => {
                                    warn!(
                                        category = fetcher.category_id(),
                                        error = %err,
                                        "auto-refresh failed"
                                    );
                                    RefreshMessage::RefreshError(err.to_string())
                                }
                            };
                            if msg_tx.send(message).await.is_err() {
                                break;
                            }
                        }
                        // Shutdown during an in-flight fetch discards its
                        // result instead of delivering it late
                        _ = shutdown_rx.recv() => break,
                    }
                }
            });
        }

        Self {
            receiver: msg_rx,
            shutdown_tx,
        }
    }

    /// Checks for a pending message without blocking
    pub fn try_recv(&mut self) -> Option<RefreshMessage> {
        self.receiver.try_recv().ok()
    }

    /// Shuts down the watcher
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

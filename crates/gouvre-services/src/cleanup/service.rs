use crate::link_store::LinkStore;
use std::time::Duration;
use tokio::time::{interval_at, Instant};
use tokio_util::sync::CancellationToken;

/// Periodically purges expired entries from the [`LinkStore`].
#[derive(Clone)]
pub struct LinkCleanupService {
    links: LinkStore,
    interval: Duration,
}

impl LinkCleanupService {
    /// A zero `interval` turns cleanup off.
    pub fn new(links: LinkStore, interval: Duration) -> Self {
        Self { links, interval }
    }

    pub fn is_enabled(&self) -> bool {
        !self.interval.is_zero()
    }

    /// Start the background sweep. Returns `None` when cleanup is turned off, otherwise a
    /// JoinHandle that finishes once `shutdown` is cancelled.
    pub fn start(self, shutdown: CancellationToken) -> Option<tokio::task::JoinHandle<()>> {
        if !self.is_enabled() {
            tracing::info!("Link cleanup turned off");
            return None;
        }

        tracing::info!(
            interval_secs = self.interval.as_secs_f64(),
            "Starting link cleanup task"
        );

        Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + self.interval, self.interval);

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        tracing::info!("Link cleanup task stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        self.run_once().await;
                    }
                }
            }
        }))
    }

    #[tracing::instrument(skip(self), fields(cleanup.operation = "expired_links"))]
    async fn run_once(&self) -> usize {
        let removed = self.links.cleanup().await;
        let remaining = self.links.len().await;
        if removed > 0 {
            tracing::info!(removed, remaining, "Link cleanup completed");
        } else {
            tracing::debug!(remaining, "Link cleanup found nothing to remove");
        }
        removed
    }
}

//! Single-use upload link registry.
//!
//! Upload tokens are recorded here when issued and flipped to consumed by the first upload
//! that presents them. The store is process-local and starts empty, so the single-use
//! guarantee does not survive a restart; the tokens themselves stay verifiable.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Pending,
    Consumed,
}

#[derive(Debug, Clone, Copy)]
struct LinkEntry {
    state: LinkState,
    expires_at: DateTime<Utc>,
}

/// Shared handle to the registry. Clones point at the same map.
#[derive(Debug, Clone, Default)]
pub struct LinkStore {
    entries: Arc<Mutex<HashMap<String, LinkEntry>>>,
}

impl LinkStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `token` as pending. Recording a token that is already known changes nothing,
    /// in particular a consumed token stays consumed.
    pub async fn record_upload(&self, token: &str, expires_at: DateTime<Utc>) {
        let mut entries = self.entries.lock().await;
        entries.entry(token.to_string()).or_insert(LinkEntry {
            state: LinkState::Pending,
            expires_at,
        });
    }

    /// Flip `token` from pending to consumed. Returns `true` only for the caller that
    /// performed the flip; unknown and already-consumed tokens return `false`.
    pub async fn try_consume(&self, token: &str) -> bool {
        let mut entries = self.entries.lock().await;
        match entries.get_mut(token) {
            Some(entry) if entry.state == LinkState::Pending => {
                entry.state = LinkState::Consumed;
                true
            }
            _ => false,
        }
    }

    /// Drop every entry whose expiry has passed, pending or not.
    pub async fn cleanup(&self) -> usize {
        self.cleanup_at(Utc::now()).await
    }

    pub async fn cleanup_at(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|_, entry| now <= entry.expires_at);
        before - entries.len()
    }

    pub async fn state(&self, token: &str) -> Option<LinkState> {
        self.entries.lock().await.get(token).map(|entry| entry.state)
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

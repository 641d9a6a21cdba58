//! Per-session memo of same-user decisions.
//!
//! A host usually wants to ask identd once per session, not once per request.
//! The cache maps a session key to the boolean outcome of a successful
//! evaluation. Request errors are never stored, so a transient ident failure is
//! retried on the next request of the same session.

use ident_core::AccessDecision;

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use log::{debug, info};
use tokio::sync::RwLock;

#[derive(Debug, Clone, Default)]
pub struct SessionCache {
    /// Session key -> "peer is the service user"
    entries: Arc<RwLock<HashMap<String, bool>>>,
}

impl SessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &str) -> Option<bool> {
        self.entries.read().await.get(key).copied()
    }

    /// Store a decision; the last write for a key wins.
    pub async fn store(&self, key: &str, same_user: bool) {
        let previous = self
            .entries
            .write()
            .await
            .insert(key.to_string(), same_user);

        if let Some(previous) = previous.filter(|p| *p != same_user) {
            info!("Session {key}: same-user changed from {previous} to {same_user}");
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Cached decision for `key`, or run `compute` and remember its outcome.
    ///
    /// The lock is not held while computing, so concurrent first requests for the
    /// same key may both compute; whichever stores last wins.
    pub async fn evaluate_cached<F, Fut>(&self, key: &str, compute: F) -> AccessDecision
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = AccessDecision>,
    {
        if let Some(same_user) = self.get(key).await {
            debug!("Session {key}: cached same-user = {same_user}");
            return if same_user {
                AccessDecision::SameUser
            } else {
                AccessDecision::OtherUser
            };
        }

        let decision = compute().await;

        match decision {
            AccessDecision::SameUser => self.store(key, true).await,
            AccessDecision::OtherUser => self.store(key, false).await,
            AccessDecision::Failed(kind) => {
                debug!("Session {key}: not caching failed ident lookup ({kind})");
            }
        }

        decision
    }
}

//! Cluster Registry - process-wide cache of remote cluster connections
//!
//! The registry maps a cluster name to its [`CachedCluster`]. It is written
//! by the ToolchainCluster controller (put on apply, delete on cleanup) and
//! read on every request path that needs to talk to a remote cluster.
//!
//! Locking rules:
//! - the map lock is held only for the map access itself, never across `.await`
//! - the refresh hook runs with no lock held and commits through [`ClusterRegistry::put`],
//!   so a hook that re-enters the registry cannot deadlock
//! - entries are `Arc`s that are replaced, never mutated, so readers never
//!   observe a half-updated entry

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::cached::CachedCluster;

/// Procedure that repopulates the registry from an authoritative source
///
/// Invoked at most once per lookup miss. Implementations are best-effort:
/// failures are logged by the hook and never surfaced to the registry's caller.
#[async_trait]
pub trait RefreshHook: Send + Sync {
    /// Discover clusters and [`put`](ClusterRegistry::put) them into `registry`
    async fn refresh(&self, registry: &ClusterRegistry);
}

/// Thread-safe registry of cached cluster connections
///
/// Construct one at process start and share it as `Arc<ClusterRegistry>`.
#[derive(Default)]
pub struct ClusterRegistry {
    clusters: RwLock<HashMap<String, Arc<CachedCluster>>>,
    refresh_hook: RwLock<Option<Arc<dyn RefreshHook>>>,
}

impl ClusterRegistry {
    /// Create an empty registry with no refresh hook
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty registry that refreshes through `hook` on a miss
    pub fn with_refresh_hook(hook: Arc<dyn RefreshHook>) -> Self {
        let registry = Self::new();
        registry.set_refresh_hook(hook);
        registry
    }

    /// Replace the refresh hook
    pub fn set_refresh_hook(&self, hook: Arc<dyn RefreshHook>) {
        *self.refresh_hook.write() = Some(hook);
    }

    /// Insert an entry, replacing any existing entry with the same name
    pub fn put(&self, cluster: impl Into<Arc<CachedCluster>>) {
        let cluster = cluster.into();
        let name = cluster.name().to_string();
        let replaced = self.clusters.write().insert(name.clone(), cluster).is_some();
        debug!(cluster = %name, replaced, "Cached cluster stored");
    }

    /// Remove the entry for `name`, returning it if it was present
    pub fn delete(&self, name: &str) -> Option<Arc<CachedCluster>> {
        let removed = self.clusters.write().remove(name);
        if removed.is_some() {
            debug!(cluster = %name, "Cached cluster removed");
        }
        removed
    }

    /// Look up `name` without refreshing
    pub fn lookup(&self, name: &str) -> Option<Arc<CachedCluster>> {
        self.clusters.read().get(name).cloned()
    }

    /// Look up `name`, refreshing once on a miss when `allow_refresh` is set
    ///
    /// A miss after the refresh is final: the hook is not retried.
    pub async fn get(&self, name: &str, allow_refresh: bool) -> Option<Arc<CachedCluster>> {
        if let Some(cluster) = self.lookup(name) {
            return Some(cluster);
        }
        if !allow_refresh {
            return None;
        }

        debug!(cluster = %name, "Cluster not cached, refreshing");
        self.refresh().await;
        self.lookup(name)
    }

    /// Point-in-time copy of all entries, in no particular order
    pub fn list_all(&self) -> Vec<Arc<CachedCluster>> {
        self.clusters.read().values().cloned().collect()
    }

    /// Run the refresh hook once, if one is installed
    pub async fn refresh(&self) {
        // Clone the hook out so no lock is held while it runs
        let hook = self.refresh_hook.read().clone();
        match hook {
            Some(hook) => hook.refresh(self).await,
            None => trace!("No refresh hook installed"),
        }
    }

    /// Number of cached clusters
    pub fn len(&self) -> usize {
        self.clusters.read().len()
    }

    /// Whether no cluster is cached
    pub fn is_empty(&self) -> bool {
        self.clusters.read().is_empty()
    }

    /// Whether `name` is cached
    pub fn contains(&self, name: &str) -> bool {
        self.clusters.read().contains_key(name)
    }
}

impl std::fmt::Debug for ClusterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterRegistry")
            .field("clusters", &self.len())
            .field("refresh_hook", &self.refresh_hook.read().is_some())
            .finish()
    }
}

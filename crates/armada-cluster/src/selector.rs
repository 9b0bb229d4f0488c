//! Role and predicate based cluster selection
//!
//! The selector answers "give me the host cluster" and "give me every ready
//! member cluster with capacity" style queries over a registry snapshot.
//! When no cluster of the requested role is cached it refreshes the registry
//! once and looks again; it never loops.

use std::sync::Arc;

use tracing::debug;

use armada_common::crd::ClusterRole;

use crate::cached::CachedCluster;
use crate::registry::ClusterRegistry;

/// Filter applied to a cached cluster
///
/// Multiple predicates passed to a query are ANDed.
#[derive(Clone)]
pub enum ClusterPredicate {
    /// Cluster reports `Ready=True` (missing condition fails)
    Ready,
    /// Cluster can take another space (unknown capacity passes)
    HasCapacity,
    /// Arbitrary caller-supplied check
    Custom(Arc<dyn Fn(&CachedCluster) -> bool + Send + Sync>),
}

impl ClusterPredicate {
    /// Wrap a closure as a predicate
    pub fn custom(check: impl Fn(&CachedCluster) -> bool + Send + Sync + 'static) -> Self {
        Self::Custom(Arc::new(check))
    }

    /// Whether `cluster` passes this predicate
    pub fn matches(&self, cluster: &CachedCluster) -> bool {
        match self {
            Self::Ready => cluster.is_ready(),
            Self::HasCapacity => cluster.capacity().map_or(true, |c| c.has_capacity()),
            Self::Custom(check) => check(cluster),
        }
    }
}

impl std::fmt::Debug for ClusterPredicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ready => write!(f, "Ready"),
            Self::HasCapacity => write!(f, "HasCapacity"),
            Self::Custom(_) => write!(f, "Custom"),
        }
    }
}

/// Query layer over a [`ClusterRegistry`]
#[derive(Clone, Debug)]
pub struct ClusterSelector {
    registry: Arc<ClusterRegistry>,
}

impl ClusterSelector {
    /// Create a selector over `registry`
    pub fn new(registry: Arc<ClusterRegistry>) -> Self {
        Self { registry }
    }

    /// All clusters of `role` that pass every predicate
    ///
    /// If no cluster of `role` is cached, the registry is refreshed once
    /// before predicates are applied.
    pub async fn get_by_role(
        &self,
        role: ClusterRole,
        predicates: &[ClusterPredicate],
    ) -> Vec<Arc<CachedCluster>> {
        let mut candidates = self.with_role(role);
        if candidates.is_empty() {
            debug!(%role, "No cached cluster with role, refreshing");
            self.registry.refresh().await;
            candidates = self.with_role(role);
        }

        candidates
            .into_iter()
            .filter(|cluster| predicates.iter().all(|p| p.matches(cluster)))
            .collect()
    }

    /// One cluster of `role`, if any
    ///
    /// Meant for roles with at most one cluster (the host). When several
    /// clusters share the role, which one is returned is unspecified.
    pub async fn get_single_by_role(&self, role: ClusterRole) -> Option<Arc<CachedCluster>> {
        self.get_by_role(role, &[]).await.into_iter().next()
    }

    /// The host cluster, if known
    pub async fn host_cluster(&self) -> Option<Arc<CachedCluster>> {
        self.get_single_by_role(ClusterRole::Host).await
    }

    /// Member clusters passing every predicate
    pub async fn member_clusters(&self, predicates: &[ClusterPredicate]) -> Vec<Arc<CachedCluster>> {
        self.get_by_role(ClusterRole::Member, predicates).await
    }

    fn with_role(&self, role: ClusterRole) -> Vec<Arc<CachedCluster>> {
        self.registry
            .list_all()
            .into_iter()
            .filter(|cluster| cluster.role() == role)
            .collect()
    }
}

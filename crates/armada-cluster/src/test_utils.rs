//! Shared fixtures for unit tests

use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use kube::client::Body;
use kube::Client;

use armada_common::crd::{ClusterRole, Condition, ConditionStatus};

use crate::cached::{CachedCluster, ClusterConfig};
use crate::registry::{ClusterRegistry, RefreshHook};

/// Client backed by an in-process service that answers every request with 200
///
/// Must be called from within a tokio runtime.
pub(crate) fn test_client() -> Client {
    let service = tower::service_fn(|_req: http::Request<Body>| async {
        Ok::<_, Infallible>(http::Response::new(Body::empty()))
    });
    Client::new(service, "default")
}

/// Cached cluster with a `Ready` condition set to `ready`
pub(crate) fn cluster(name: &str, role: ClusterRole, ready: bool) -> CachedCluster {
    let status = if ready {
        ConditionStatus::True
    } else {
        ConditionStatus::False
    };
    CachedCluster::new(
        ClusterConfig::new(name, role).with_operator_namespace(format!("{name}-operator")),
        test_client(),
    )
    .with_status(vec![Condition::ready(status)])
}

/// Refresh hook that records its invocations and puts a fixed set of clusters
pub(crate) struct CountingHook {
    pub(crate) calls: AtomicUsize,
    clusters: Vec<Arc<CachedCluster>>,
}

impl CountingHook {
    pub(crate) fn adding(clusters: Vec<Arc<CachedCluster>>) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            clusters,
        }
    }
}

#[async_trait]
impl RefreshHook for CountingHook {
    async fn refresh(&self, registry: &ClusterRegistry) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        for cluster in &self.clusters {
            registry.put(cluster.clone());
        }
    }
}

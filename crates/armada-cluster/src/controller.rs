//! ToolchainCluster controller
//!
//! Keeps the registry in step with the ToolchainCluster resources in the
//! watched namespace: every apply rebuilds the cluster's connection and puts
//! a fresh entry, and a finalizer guarantees that removal of the resource
//! deletes the entry.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use kube::runtime::controller::Action;
use kube::runtime::finalizer::{finalizer, Event};
use kube::runtime::watcher::Config as WatcherConfig;
use kube::runtime::Controller;
use kube::{Api, Client, ResourceExt};
use tracing::{debug, error, info, instrument, warn};

use armada_common::crd::ToolchainCluster;
use armada_common::Error;

use crate::builder::ClusterBuilder;
use crate::registry::ClusterRegistry;

/// Finalizer placed on every ToolchainCluster the controller has cached
pub const CLUSTER_CACHE_FINALIZER: &str = "armada.dev/cluster-cache";

/// Watcher timeout (seconds), kept below the client read timeout
const WATCH_TIMEOUT_SECS: u32 = 25;

/// Periodic requeue so status changes on the resource reach the registry
const REQUEUE_INTERVAL: Duration = Duration::from_secs(60);

/// Retry delay after a transient failure
const RETRY_DELAY: Duration = Duration::from_secs(15);

/// Retry delay after a validation failure that needs a resource change
const INVALID_RETRY_DELAY: Duration = Duration::from_secs(300);

/// Shared controller state
pub struct Context {
    /// Client for the cluster holding the ToolchainCluster resources
    pub client: Client,
    /// Namespace watched for ToolchainCluster resources
    pub namespace: String,
    /// Registry kept in sync with the resources
    pub registry: Arc<ClusterRegistry>,
    /// Connects to the clusters the resources describe
    pub builder: Arc<dyn ClusterBuilder>,
}

impl Context {
    /// Create a controller context
    pub fn new(
        client: Client,
        namespace: impl Into<String>,
        registry: Arc<ClusterRegistry>,
        builder: Arc<dyn ClusterBuilder>,
    ) -> Self {
        Self {
            client,
            namespace: namespace.into(),
            registry,
            builder,
        }
    }
}

/// Reconcile a ToolchainCluster
#[instrument(skip(cluster, ctx), fields(cluster = %cluster.name_any()))]
pub async fn reconcile(cluster: Arc<ToolchainCluster>, ctx: Arc<Context>) -> Result<Action, Error> {
    let api: Api<ToolchainCluster> = Api::namespaced(ctx.client.clone(), &ctx.namespace);

    finalizer(&api, CLUSTER_CACHE_FINALIZER, cluster, |event| async move {
        match event {
            Event::Apply(cluster) => apply(&cluster, &ctx).await,
            Event::Cleanup(cluster) => Ok(cleanup(&cluster, &ctx)),
        }
    })
    .await
    .map_err(|e| match e {
        kube::runtime::finalizer::Error::ApplyFailed(err)
        | kube::runtime::finalizer::Error::CleanupFailed(err) => err,
        other => Error::internal_with_context("finalizer", other.to_string()),
    })
}

/// Connect to the cluster and store a fresh registry entry
pub async fn apply(cluster: &ToolchainCluster, ctx: &Context) -> Result<Action, Error> {
    let name = cluster.name_any();
    debug!(cluster = %name, "Building cluster connection");

    let cached = ctx.builder.build(cluster).await?;
    let ready = cached.is_ready();
    ctx.registry.put(cached);

    info!(cluster = %name, ready, "Cluster cached");
    Ok(Action::requeue(REQUEUE_INTERVAL))
}

/// Drop the cluster's registry entry
pub fn cleanup(cluster: &ToolchainCluster, ctx: &Context) -> Action {
    let name = cluster.name_any();
    if ctx.registry.delete(&name).is_some() {
        info!(cluster = %name, "Cluster removed from cache");
    }
    Action::await_change()
}

/// Error policy for the ToolchainCluster controller
pub fn error_policy(cluster: Arc<ToolchainCluster>, error: &Error, _ctx: Arc<Context>) -> Action {
    warn!(
        cluster = %cluster.name_any(),
        error = %error,
        "ToolchainCluster reconciliation error, will retry"
    );

    if error.is_retryable() {
        Action::requeue(RETRY_DELAY)
    } else {
        Action::requeue(INVALID_RETRY_DELAY)
    }
}

/// Run the controller until a shutdown signal is received
pub async fn run_controller(ctx: Arc<Context>) {
    let clusters: Api<ToolchainCluster> = Api::namespaced(ctx.client.clone(), &ctx.namespace);

    info!(namespace = %ctx.namespace, "Starting ToolchainCluster controller");

    Controller::new(clusters, WatcherConfig::default().timeout(WATCH_TIMEOUT_SECS))
        .shutdown_on_signal()
        .run(reconcile, error_policy, ctx)
        .for_each(|result| async move {
            match result {
                Ok(action) => debug!(?action, "ToolchainCluster reconciliation completed"),
                Err(e) => error!(error = ?e, "ToolchainCluster reconciliation error"),
            }
        })
        .await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{cluster_config, MockClusterBuilder};
    use crate::cached::CachedCluster;
    use crate::test_utils::{cluster as cached, test_client};
    use armada_common::crd::{
        ClusterRole, Condition, ConditionStatus, LocalSecretReference, ToolchainClusterSpec,
    };

    fn toolchain_cluster(name: &str) -> ToolchainCluster {
        ToolchainCluster::new(
            name,
            ToolchainClusterSpec {
                api_endpoint: format!("https://api.{name}.example.com:6443"),
                secret_ref: LocalSecretReference {
                    name: format!("{name}-kubeconfig"),
                },
                disabled_tls_validations: false,
            },
        )
    }

    fn context(builder: MockClusterBuilder) -> Context {
        Context::new(
            test_client(),
            "armada-system",
            Arc::new(ClusterRegistry::new()),
            Arc::new(builder),
        )
    }

    #[tokio::test]
    async fn test_apply_puts_fresh_entry() {
        let mut builder = MockClusterBuilder::new();
        builder.expect_build().times(2).returning(|c| {
            Ok(
                CachedCluster::new(cluster_config(c).unwrap(), test_client())
                    .with_status(vec![Condition::ready(ConditionStatus::True)]),
            )
        });
        let ctx = context(builder);
        let resource = toolchain_cluster("member-1");

        let action = apply(&resource, &ctx).await.unwrap();
        assert_eq!(action, Action::requeue(REQUEUE_INTERVAL));
        let first = ctx.registry.lookup("member-1").unwrap();

        apply(&resource, &ctx).await.unwrap();
        let second = ctx.registry.lookup("member-1").unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(ctx.registry.len(), 1);
        assert!(second.is_ready());
    }

    #[tokio::test]
    async fn test_apply_propagates_build_errors() {
        let mut builder = MockClusterBuilder::new();
        builder
            .expect_build()
            .returning(|_| Err(Error::connection("member-1", "secret missing")));
        let ctx = context(builder);

        let err = apply(&toolchain_cluster("member-1"), &ctx).await.unwrap_err();
        assert!(matches!(err, Error::Connection { .. }));
        assert!(ctx.registry.is_empty());
    }

    #[tokio::test]
    async fn test_cleanup_removes_entry() {
        let ctx = context(MockClusterBuilder::new());
        ctx.registry.put(cached("member-1", ClusterRole::Member, true));
        ctx.registry.put(cached("member-2", ClusterRole::Member, true));

        let action = cleanup(&toolchain_cluster("member-1"), &ctx);

        assert_eq!(action, Action::await_change());
        assert!(!ctx.registry.contains("member-1"));
        assert!(ctx.registry.contains("member-2"));

        // Cleaning up twice is harmless
        cleanup(&toolchain_cluster("member-1"), &ctx);
        assert_eq!(ctx.registry.len(), 1);
    }

    #[tokio::test]
    async fn test_error_policy_delays() {
        let ctx = Arc::new(context(MockClusterBuilder::new()));
        let resource = Arc::new(toolchain_cluster("member-1"));

        let transient = error_policy(
            resource.clone(),
            &Error::connection("member-1", "timeout"),
            ctx.clone(),
        );
        assert_eq!(transient, Action::requeue(RETRY_DELAY));

        let invalid = error_policy(
            resource,
            &Error::validation_for_field("member-1", "metadata.labels", "bad role"),
            ctx,
        );
        assert_eq!(invalid, Action::requeue(INVALID_RETRY_DELAY));
    }
}

//! Turning ToolchainCluster resources into cached cluster connections
//!
//! [`ClusterBuilder`] is the seam between the registry and the Kubernetes
//! API: it enumerates cluster definitions and connects to each one.
//! [`RegistryRefresher`] drives a builder as the registry's refresh hook.

use std::sync::Arc;

use async_trait::async_trait;
use kube::api::ListParams;
use kube::{Api, Client, Config, ResourceExt};
use tracing::{debug, info, warn};

#[cfg(test)]
use mockall::automock;

use armada_common::crd::ToolchainCluster;
use armada_common::kube_utils::{
    client_from_config, config_from_kubeconfig, get_secret_data, ClientTimeouts,
};
use armada_common::{Error, KUBECONFIG_SECRET_KEY};

use crate::cached::{CachedCluster, CapacityInfo, ClusterConfig};
use crate::registry::{ClusterRegistry, RefreshHook};

/// Operator namespace assumed when the status does not report one
pub const DEFAULT_OPERATOR_NAMESPACE: &str = "armada-operator";

/// Discovers cluster definitions and connects to them
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ClusterBuilder: Send + Sync {
    /// List every cluster definition currently known
    async fn list_clusters(&self) -> Result<Vec<ToolchainCluster>, Error>;

    /// Connect to the cluster described by `cluster`
    async fn build(&self, cluster: &ToolchainCluster) -> Result<CachedCluster, Error>;
}

/// Static description derived from a ToolchainCluster resource
///
/// Status fields win over spec fields since they reflect what the health
/// checker last observed.
pub fn cluster_config(cluster: &ToolchainCluster) -> Result<ClusterConfig, Error> {
    cluster.validate()?;

    let status = cluster.status.as_ref();
    let api_endpoint = status
        .and_then(|s| s.api_endpoint.clone())
        .unwrap_or_else(|| cluster.spec.api_endpoint.clone());
    let operator_namespace = status
        .and_then(|s| s.operator_namespace.clone())
        .unwrap_or_else(|| DEFAULT_OPERATOR_NAMESPACE.to_string());

    let mut config = ClusterConfig::new(cluster.name_any(), cluster.role()?)
        .with_api_endpoint(api_endpoint)
        .with_operator_namespace(operator_namespace);
    if let Some(owner) = cluster.owner_cluster_name() {
        config = config.with_owner_cluster(owner);
    }
    Ok(config)
}

/// Connection config for `cluster`, pointed at the endpoint `config` records
pub async fn connection_config(
    config: &ClusterConfig,
    cluster: &ToolchainCluster,
    kubeconfig: &str,
    timeouts: ClientTimeouts,
) -> Result<Config, Error> {
    config_from_kubeconfig(
        &config.name,
        kubeconfig,
        Some(&config.api_endpoint),
        cluster.spec.disabled_tls_validations,
        timeouts,
    )
    .await
}

/// Production builder reading ToolchainClusters and kubeconfig Secrets
pub struct KubeClusterBuilder {
    client: Client,
    namespace: String,
    timeouts: ClientTimeouts,
}

impl KubeClusterBuilder {
    /// Create a builder watching `namespace` through `client`
    pub fn new(client: Client, namespace: impl Into<String>, timeouts: ClientTimeouts) -> Self {
        Self {
            client,
            namespace: namespace.into(),
            timeouts,
        }
    }
}

#[async_trait]
impl ClusterBuilder for KubeClusterBuilder {
    async fn list_clusters(&self) -> Result<Vec<ToolchainCluster>, Error> {
        let api: Api<ToolchainCluster> = Api::namespaced(self.client.clone(), &self.namespace);
        let list = api.list(&ListParams::default()).await?;
        Ok(list.items)
    }

    async fn build(&self, cluster: &ToolchainCluster) -> Result<CachedCluster, Error> {
        let config = cluster_config(cluster)?;
        let namespace = cluster
            .namespace()
            .unwrap_or_else(|| self.namespace.clone());

        let kubeconfig = get_secret_data(
            &self.client,
            &cluster.spec.secret_ref.name,
            &namespace,
            KUBECONFIG_SECRET_KEY,
        )
        .await?;
        let kubeconfig = String::from_utf8(kubeconfig).map_err(|_| {
            Error::connection(&config.name, "kubeconfig secret is not valid UTF-8")
        })?;

        let remote = connection_config(&config, cluster, &kubeconfig, self.timeouts).await?;
        let client = client_from_config(&config.name, remote)?;

        let mut cached = CachedCluster::new(config, client).with_status(
            cluster
                .status
                .as_ref()
                .map(|s| s.conditions.clone())
                .unwrap_or_default(),
        );
        if let Some(capacity) = CapacityInfo::from_annotations(cluster.annotations()) {
            cached = cached.with_capacity(capacity);
        }
        Ok(cached)
    }
}

/// Refresh hook that rebuilds every cluster a [`ClusterBuilder`] can list
///
/// Clusters that fail to build are logged and skipped; the rest are still
/// stored. A failed listing ends the refresh without touching the registry.
pub struct RegistryRefresher<B> {
    builder: Arc<B>,
}

impl<B: ClusterBuilder> RegistryRefresher<B> {
    /// Create a refresher driving `builder`
    pub fn new(builder: Arc<B>) -> Self {
        Self { builder }
    }
}

#[async_trait]
impl<B: ClusterBuilder + 'static> RefreshHook for RegistryRefresher<B> {
    async fn refresh(&self, registry: &ClusterRegistry) {
        let clusters = match self.builder.list_clusters().await {
            Ok(clusters) => clusters,
            Err(e) => {
                warn!(error = %e, "Failed to list ToolchainClusters, registry not refreshed");
                return;
            }
        };

        let total = clusters.len();
        let mut stored = 0usize;
        for cluster in &clusters {
            let name = cluster.name_any();
            match self.builder.build(cluster).await {
                Ok(cached) => {
                    registry.put(cached);
                    stored += 1;
                }
                Err(e) => {
                    warn!(cluster = %name, error = %e, "Failed to connect to cluster, skipping");
                }
            }
        }

        if stored == total {
            debug!(clusters = stored, "Registry refreshed");
        } else {
            info!(stored, total, "Registry partially refreshed");
        }
    }
}

//! Cached cluster entries
//!
//! A [`CachedCluster`] bundles a live connection to a remote cluster with the
//! metadata the selector filters on. Entries are immutable once built: the
//! registry shares them as `Arc<CachedCluster>` and a changed cluster is put
//! back as a brand-new entry, so a handle obtained from a lookup is never
//! modified underneath its holder.

use std::collections::BTreeMap;

use kube::Client;

use armada_common::crd::{find_condition, is_condition_true, ClusterRole, Condition, CONDITION_READY};
use armada_common::{
    MAX_MEMORY_UTILIZATION_ANNOTATION, MAX_SPACES_ANNOTATION, MEMORY_UTILIZATION_ANNOTATION,
    SPACE_COUNT_ANNOTATION,
};

/// Static description of a remote cluster
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClusterConfig {
    /// Logical cluster name, the registry key
    pub name: String,
    /// Host or member
    pub role: ClusterRole,
    /// API server URL
    pub api_endpoint: String,
    /// Namespace the operator runs in on the remote cluster
    pub operator_namespace: String,
    /// Cluster that owns this one, if any
    pub owner_cluster_name: Option<String>,
}

impl ClusterConfig {
    /// Create a config with the given name and role
    pub fn new(name: impl Into<String>, role: ClusterRole) -> Self {
        Self {
            name: name.into(),
            role,
            api_endpoint: String::new(),
            operator_namespace: String::new(),
            owner_cluster_name: None,
        }
    }

    /// Set the API server URL
    pub fn with_api_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.api_endpoint = endpoint.into();
        self
    }

    /// Set the remote operator namespace
    pub fn with_operator_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.operator_namespace = namespace.into();
        self
    }

    /// Set the owning cluster
    pub fn with_owner_cluster(mut self, owner: impl Into<String>) -> Self {
        self.owner_cluster_name = Some(owner.into());
        self
    }
}

/// Capacity attributes consulted by capacity-aware predicates
///
/// Absent limits are treated as unlimited.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CapacityInfo {
    /// Maximum number of spaces the cluster accepts
    pub max_spaces: Option<u32>,
    /// Spaces currently provisioned
    pub space_count: Option<u32>,
    /// Memory utilization (percent) at which the cluster counts as full
    pub max_memory_utilization_percent: Option<u8>,
    /// Last observed memory utilization (percent)
    pub memory_utilization_percent: Option<u8>,
}

impl CapacityInfo {
    /// Parse capacity annotations; `None` when no capacity annotation is set
    ///
    /// Unparseable values are ignored rather than failing the whole entry.
    pub fn from_annotations(annotations: &BTreeMap<String, String>) -> Option<Self> {
        fn parse<T: std::str::FromStr>(
            annotations: &BTreeMap<String, String>,
            key: &str,
        ) -> Option<T> {
            annotations.get(key).and_then(|v| v.trim().parse().ok())
        }

        let info = Self {
            max_spaces: parse(annotations, MAX_SPACES_ANNOTATION),
            space_count: parse(annotations, SPACE_COUNT_ANNOTATION),
            max_memory_utilization_percent: parse(annotations, MAX_MEMORY_UTILIZATION_ANNOTATION),
            memory_utilization_percent: parse(annotations, MEMORY_UTILIZATION_ANNOTATION),
        };

        (info != Self::default()).then_some(info)
    }

    /// Whether the cluster can take another space
    pub fn has_capacity(&self) -> bool {
        let spaces_ok = match (self.max_spaces, self.space_count) {
            (Some(max), Some(count)) => count < max,
            (Some(max), None) => max > 0,
            (None, _) => true,
        };
        let memory_ok = match (
            self.max_memory_utilization_percent,
            self.memory_utilization_percent,
        ) {
            (Some(max), Some(used)) => used < max,
            _ => true,
        };
        spaces_ok && memory_ok
    }
}

/// A remote cluster connection known to this process
#[derive(Clone)]
pub struct CachedCluster {
    config: ClusterConfig,
    client: Client,
    status: Vec<Condition>,
    capacity: Option<CapacityInfo>,
}

impl CachedCluster {
    /// Create an entry with an empty status
    pub fn new(config: ClusterConfig, client: Client) -> Self {
        Self {
            config,
            client,
            status: Vec::new(),
            capacity: None,
        }
    }

    /// Replace the status conditions
    pub fn with_status(mut self, conditions: Vec<Condition>) -> Self {
        self.status = conditions;
        self
    }

    /// Attach capacity attributes
    pub fn with_capacity(mut self, capacity: CapacityInfo) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// Logical cluster name
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Host or member
    pub fn role(&self) -> ClusterRole {
        self.config.role
    }

    /// Static cluster description
    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    /// Connection to the remote cluster
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Ordered status conditions
    pub fn conditions(&self) -> &[Condition] {
        &self.status
    }

    /// First condition of the given type
    pub fn condition(&self, type_: &str) -> Option<&Condition> {
        find_condition(&self.status, type_)
    }

    /// Whether the cluster reports `Ready=True`; a missing condition is not ready
    pub fn is_ready(&self) -> bool {
        is_condition_true(&self.status, CONDITION_READY)
    }

    /// Capacity attributes, if known
    pub fn capacity(&self) -> Option<&CapacityInfo> {
        self.capacity.as_ref()
    }
}

impl std::fmt::Debug for CachedCluster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedCluster")
            .field("config", &self.config)
            .field("status", &self.status)
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}

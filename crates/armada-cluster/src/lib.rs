//! Registry of remote cluster connections for the armada control plane
//!
//! - [`ClusterRegistry`]: concurrency-safe name → connection cache with
//!   refresh-on-miss
//! - [`ClusterSelector`]: role and predicate filtered lookups over the registry
//! - [`KubeClusterBuilder`] / [`RegistryRefresher`]: populate the registry from
//!   ToolchainCluster resources
//! - [`controller`]: keeps the registry in step with resource changes

#![deny(missing_docs)]

pub mod builder;
pub mod cached;
pub mod controller;
pub mod registry;
pub mod selector;

#[cfg(test)]
mod test_utils;

pub use armada_common::crd::ClusterRole;
pub use builder::{ClusterBuilder, KubeClusterBuilder, RegistryRefresher};
pub use cached::{CachedCluster, CapacityInfo, ClusterConfig};
pub use registry::{ClusterRegistry, RefreshHook};
pub use selector::{ClusterPredicate, ClusterSelector};

//! armada - cluster connection registry for a multi-cluster control plane
//!
//! The operator binary wires the pieces from the workspace crates together:
//!
//! - [`armada_cluster::ClusterRegistry`] caches one connection per remote cluster
//! - [`armada_cluster::RegistryRefresher`] refreshes it from ToolchainCluster resources
//! - [`armada_cluster::controller`] keeps it in step with resource changes
//!
//! The binary only maintains the registry; it serves no requests of its own.
//! [`armada_cluster::ClusterSelector`] and the `armada-banneduser` crate are
//! libraries for request-serving components that embed the registry, and are
//! not linked into this binary.

#![deny(missing_docs)]

pub mod config;

use kube::CustomResourceExt;

use armada_common::crd::{BannedUser, ToolchainCluster, UserSignup};

/// YAML for every CRD armada serves, as a multi-document stream
pub fn crd_manifests() -> Result<String, serde_yaml::Error> {
    let docs = [
        serde_yaml::to_string(&ToolchainCluster::crd())?,
        serde_yaml::to_string(&UserSignup::crd())?,
        serde_yaml::to_string(&BannedUser::crd())?,
    ];
    Ok(docs.join("---\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crd_manifests_contain_all_kinds() {
        let yaml = crd_manifests().unwrap();
        assert_eq!(yaml.matches("kind: CustomResourceDefinition").count(), 3);
        assert!(yaml.contains("toolchainclusters.armada.dev"));
        assert!(yaml.contains("usersignups.armada.dev"));
        assert!(yaml.contains("bannedusers.armada.dev"));
    }
}

//! ToolchainCluster Custom Resource Definition
//!
//! A ToolchainCluster describes one remote cluster the control plane talks
//! to: where its API server lives and which Secret holds the credentials.
//! The cluster role (host or member) is carried as a label so that it is
//! fixed for the lifetime of the resource.

use std::str::FromStr;

use kube::{CustomResource, ResourceExt};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::types::{is_condition_true, Condition, CONDITION_READY};
use crate::{CLUSTER_ROLE_LABEL, OWNER_CLUSTER_LABEL};

/// Specification for a ToolchainCluster
#[derive(CustomResource, Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "armada.dev",
    version = "v1alpha1",
    kind = "ToolchainCluster",
    plural = "toolchainclusters",
    shortname = "tc",
    status = "ToolchainClusterStatus",
    namespaced,
    printcolumn = r#"{"name":"Endpoint","type":"string","jsonPath":".spec.apiEndpoint"}"#,
    printcolumn = r#"{"name":"Ready","type":"string","jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ToolchainClusterSpec {
    /// API server URL of the remote cluster
    pub api_endpoint: String,

    /// Secret (in the same namespace) holding the kubeconfig for the cluster
    pub secret_ref: LocalSecretReference,

    /// Skip TLS verification of the remote API server
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub disabled_tls_validations: bool,
}

/// Reference to a Secret in the resource's own namespace
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct LocalSecretReference {
    /// Secret name
    pub name: String,
}

/// Status for a ToolchainCluster
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ToolchainClusterStatus {
    /// Conditions describing the connection to the cluster
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,

    /// API endpoint observed by the health checker
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_endpoint: Option<String>,

    /// Namespace the operator runs in on the remote cluster
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator_namespace: Option<String>,
}

impl ToolchainClusterStatus {
    /// Whether the status reports a `Ready=True` condition
    pub fn is_ready(&self) -> bool {
        is_condition_true(&self.conditions, CONDITION_READY)
    }
}

/// Role of a cluster within the fleet
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ClusterRole {
    /// The single control-plane cluster
    Host,
    /// A workload cluster
    #[default]
    Member,
}

impl std::fmt::Display for ClusterRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Host => write!(f, "host"),
            Self::Member => write!(f, "member"),
        }
    }
}

impl FromStr for ClusterRole {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "host" => Ok(Self::Host),
            "member" => Ok(Self::Member),
            _ => Err(crate::Error::validation(format!(
                "invalid cluster role: {s} (expected host or member)"
            ))),
        }
    }
}

impl ToolchainCluster {
    /// Role declared by the cluster-role label (member when absent)
    pub fn role(&self) -> Result<ClusterRole, crate::Error> {
        match self.labels().get(CLUSTER_ROLE_LABEL) {
            Some(value) => value.parse().map_err(|_| {
                crate::Error::validation_for_field(
                    self.name_any(),
                    format!("metadata.labels[{CLUSTER_ROLE_LABEL}]"),
                    format!("invalid cluster role: {value}"),
                )
            }),
            None => Ok(ClusterRole::default()),
        }
    }

    /// Name of the cluster that owns this one, if labelled
    pub fn owner_cluster_name(&self) -> Option<&str> {
        self.labels().get(OWNER_CLUSTER_LABEL).map(String::as_str)
    }

    /// Validate the fields needed to connect to the cluster
    pub fn validate(&self) -> Result<(), crate::Error> {
        let name = self.name_any();
        if self.spec.api_endpoint.is_empty() {
            return Err(crate::Error::validation_for_field(
                name,
                "spec.apiEndpoint",
                "api endpoint cannot be empty",
            ));
        }
        if self.spec.secret_ref.name.is_empty() {
            return Err(crate::Error::validation_for_field(
                name,
                "spec.secretRef.name",
                "secret name cannot be empty",
            ));
        }
        self.role().map(|_| ())
    }
}

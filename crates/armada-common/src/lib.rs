//! Common types for armada: CRDs, errors, telemetry and Kubernetes helpers

#![deny(missing_docs)]

pub mod crd;
pub mod error;
pub mod kube_utils;
pub mod telemetry;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Default namespace watched for ToolchainCluster resources
pub const ARMADA_SYSTEM_NAMESPACE: &str = "armada-system";

/// Label declaring a ToolchainCluster's role (`host` or `member`)
pub const CLUSTER_ROLE_LABEL: &str = "armada.dev/cluster-role";

/// Label naming the cluster that owns a ToolchainCluster
pub const OWNER_CLUSTER_LABEL: &str = "armada.dev/owner-cluster";

/// Secret key holding a remote cluster's kubeconfig
pub const KUBECONFIG_SECRET_KEY: &str = "kubeconfig";

/// Label carrying the hash of a user's email address
pub const EMAIL_HASH_LABEL: &str = "armada.dev/email-hash";

/// Label carrying the hash of a user's phone number
pub const PHONE_HASH_LABEL: &str = "armada.dev/phone-hash";

/// Label recording who banned a user
pub const BANNED_BY_LABEL: &str = "armada.dev/banned-by";

/// Annotation: maximum number of spaces a member cluster accepts
pub const MAX_SPACES_ANNOTATION: &str = "armada.dev/max-spaces";

/// Annotation: number of spaces currently provisioned on a member cluster
pub const SPACE_COUNT_ANNOTATION: &str = "armada.dev/space-count";

/// Annotation: memory utilization threshold (percent) above which a cluster is full
pub const MAX_MEMORY_UTILIZATION_ANNOTATION: &str = "armada.dev/max-memory-utilization-percent";

/// Annotation: last observed memory utilization (percent)
pub const MEMORY_UTILIZATION_ANNOTATION: &str = "armada.dev/memory-utilization-percent";

//! Custom Resource Definitions for armada

mod toolchain_cluster;
mod types;
mod user_signup;

pub use toolchain_cluster::{
    ClusterRole, LocalSecretReference, ToolchainCluster, ToolchainClusterSpec,
    ToolchainClusterStatus,
};
pub use types::{find_condition, is_condition_true, Condition, ConditionStatus, CONDITION_READY};
pub use user_signup::{
    BannedUser, BannedUserSpec, IdentityClaims, UserSignup, UserSignupSpec,
};

//! UserSignup and BannedUser Custom Resource Definitions

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Specification for a UserSignup
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "armada.dev",
    version = "v1alpha1",
    kind = "UserSignup",
    plural = "usersignups",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct UserSignupSpec {
    /// Claims taken from the identity provider token at signup
    #[serde(default)]
    pub identity_claims: IdentityClaims,
}

/// Identity provider claims recorded for a user
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IdentityClaims {
    /// Email address
    #[serde(default)]
    pub email: String,

    /// Preferred username
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_username: Option<String>,

    /// Subject of the identity token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
}

/// Specification for a BannedUser
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "armada.dev",
    version = "v1alpha1",
    kind = "BannedUser",
    plural = "bannedusers",
    namespaced,
    printcolumn = r#"{"name":"Email","type":"string","jsonPath":".spec.email"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct BannedUserSpec {
    /// Email address of the banned user
    pub email: String,
}

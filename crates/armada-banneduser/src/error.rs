//! Error types for banned-user handling

use thiserror::Error;

/// Errors raised while building or looking up BannedUser resources
#[derive(Debug, Error)]
pub enum BannedUserError {
    /// The UserSignup lacks a label needed to derive the BannedUser
    #[error("the UserSignup {signup} doesn't have the label '{label}' set")]
    MissingLabel {
        /// Name of the UserSignup
        signup: String,
        /// Missing label key
        label: String,
    },

    /// Listing BannedUsers failed
    #[error("kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    /// Error from a non-kube list implementation
    #[error("list error: {0}")]
    List(#[from] armada_common::Error),
}

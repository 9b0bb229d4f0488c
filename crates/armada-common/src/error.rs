//! Error types for armada
//!
//! Errors carry the cluster they relate to where one is known, so that
//! log lines emitted from reconcile loops and refresh passes can be traced
//! back to a specific ToolchainCluster.

use thiserror::Error;

/// Default context value when no specific context is available
pub const UNKNOWN_CONTEXT: &str = "unknown";

/// Main error type for armada operations
#[derive(Debug, Error)]
pub enum Error {
    /// Kubernetes API error
    #[error("kubernetes error: {source}")]
    Kube {
        /// The underlying kube-rs error
        #[from]
        source: kube::Error,
    },

    /// A ToolchainCluster resource is missing or carries invalid fields
    #[error("validation error for {cluster}: {message}")]
    Validation {
        /// Name of the cluster with invalid configuration
        cluster: String,
        /// Description of what's invalid
        message: String,
        /// The invalid field path (e.g., "spec.secretRef.name")
        field: Option<String>,
    },

    /// Connection credentials could not be turned into a client
    #[error("connection error for {cluster}: {message}")]
    Connection {
        /// Name of the cluster being connected to
        cluster: String,
        /// Description of what failed
        message: String,
    },

    /// Internal/operational error
    #[error("internal error [{context}]: {message}")]
    Internal {
        /// Description of what failed
        message: String,
        /// Context where the error occurred (e.g., "reconciler", "builder")
        context: String,
    },
}

impl Error {
    /// Create a validation error without cluster context
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            cluster: UNKNOWN_CONTEXT.to_string(),
            message: msg.into(),
            field: None,
        }
    }

    /// Create a validation error with cluster context and field path
    pub fn validation_for_field(
        cluster: impl Into<String>,
        field: impl Into<String>,
        msg: impl Into<String>,
    ) -> Self {
        Self::Validation {
            cluster: cluster.into(),
            message: msg.into(),
            field: Some(field.into()),
        }
    }

    /// Create a connection error for the given cluster
    pub fn connection(cluster: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Connection {
            cluster: cluster.into(),
            message: msg.into(),
        }
    }

    /// Create an internal error with context
    pub fn internal_with_context(context: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Internal {
            message: msg.into(),
            context: context.into(),
        }
    }

    /// Name of the cluster this error relates to, if any
    pub fn cluster(&self) -> Option<&str> {
        match self {
            Self::Validation { cluster, .. } | Self::Connection { cluster, .. }
                if cluster != UNKNOWN_CONTEXT =>
            {
                Some(cluster.as_str())
            }
            _ => None,
        }
    }

    /// Whether retrying the same operation later may succeed
    ///
    /// Validation errors need the resource to change first; everything else
    /// (API hiccups, unreachable clusters) is worth another attempt.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Validation { .. })
    }
}

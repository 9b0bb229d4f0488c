//! Operator command line and configuration

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};

use armada_common::kube_utils::ClientTimeouts;
use armada_common::ARMADA_SYSTEM_NAMESPACE;

/// armada - cluster connection registry for a multi-cluster control plane
#[derive(Parser, Debug)]
#[command(name = "armada", version, about, long_about = None)]
pub struct Cli {
    /// Print CRD manifests and exit
    #[arg(long)]
    pub crd: bool,

    /// Subcommand to run (defaults to the controller)
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Operator settings
    #[command(flatten)]
    pub operator: OperatorArgs,
}

/// Subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Watch ToolchainClusters and keep the registry in sync (default mode)
    Controller,
}

/// Settings for the controller
#[derive(clap::Args, Debug, Clone)]
pub struct OperatorArgs {
    /// Namespace holding ToolchainCluster resources
    #[arg(long, env = "WATCH_NAMESPACE", default_value = ARMADA_SYSTEM_NAMESPACE)]
    pub namespace: String,

    /// Kubeconfig for the host cluster (in-cluster config when unset)
    #[arg(long, env = "KUBECONFIG")]
    pub kubeconfig: Option<PathBuf>,

    /// Connect timeout for clients to remote clusters, in seconds
    #[arg(long, env = "ARMADA_CONNECT_TIMEOUT_SECS", default_value_t = 5)]
    pub connect_timeout_secs: u64,

    /// Read timeout for clients to remote clusters, in seconds
    #[arg(long, env = "ARMADA_READ_TIMEOUT_SECS", default_value_t = 30)]
    pub read_timeout_secs: u64,

    /// Log level for the armada crates when RUST_LOG is unset
    #[arg(long, env = "ARMADA_LOG_LEVEL", default_value = "debug")]
    pub log_level: String,
}

impl OperatorArgs {
    /// Client timeouts built from the configured seconds
    pub fn timeouts(&self) -> ClientTimeouts {
        ClientTimeouts {
            connect: Duration::from_secs(self.connect_timeout_secs),
            read: Duration::from_secs(self.read_timeout_secs),
        }
    }
}

//! armada operator - keeps the cluster connection registry in sync

use std::sync::Arc;

use clap::Parser;
use tracing::info;

use armada::config::{Cli, Commands, OperatorArgs};
use armada_cluster::controller::{run_controller, Context};
use armada_cluster::{ClusterRegistry, KubeClusterBuilder, RegistryRefresher};
use armada_common::kube_utils::create_client;
use armada_common::telemetry::{init_telemetry, TelemetryConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.crd {
        let yaml = armada::crd_manifests()
            .map_err(|e| anyhow::anyhow!("Failed to serialize CRDs: {}", e))?;
        println!("{yaml}");
        return Ok(());
    }

    init_telemetry(TelemetryConfig {
        service_name: "armada-operator".to_string(),
        log_level: cli.operator.log_level.clone(),
        watch_namespace: Some(cli.operator.namespace.clone()),
        ..Default::default()
    })?;

    match cli.command {
        Some(Commands::Controller) | None => run(cli.operator).await,
    }
}

/// Build the registry, prime it once and run the controller until shutdown
async fn run(args: OperatorArgs) -> anyhow::Result<()> {
    let timeouts = args.timeouts();
    let client = create_client(args.kubeconfig.as_deref(), timeouts).await?;

    let builder = Arc::new(KubeClusterBuilder::new(
        client.clone(),
        &args.namespace,
        timeouts,
    ));
    let registry = Arc::new(ClusterRegistry::with_refresh_hook(Arc::new(
        RegistryRefresher::new(builder.clone()),
    )));

    registry.refresh().await;
    info!(
        namespace = %args.namespace,
        clusters = registry.len(),
        "Cluster registry primed"
    );

    let ctx = Arc::new(Context::new(client, &args.namespace, registry, builder));
    run_controller(ctx).await;

    info!("Controller stopped");
    Ok(())
}

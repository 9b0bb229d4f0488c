//! Kubernetes client helpers shared by the controller and the cluster builder

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use k8s_openapi::api::core::v1::Secret;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Api, Client, Config};
use tracing::debug;

use crate::Error;

/// Default connection timeout for kube clients
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Default read timeout for kube clients
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Connect/read timeouts applied to every client armada builds
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClientTimeouts {
    /// TCP/TLS connect timeout
    pub connect: Duration,
    /// Per-request read timeout
    pub read: Duration,
}

impl Default for ClientTimeouts {
    fn default() -> Self {
        Self {
            connect: DEFAULT_CONNECT_TIMEOUT,
            read: DEFAULT_READ_TIMEOUT,
        }
    }
}

/// Create a kube client from an optional kubeconfig path
///
/// Falls back to in-cluster / `KUBECONFIG` inference when no path is given.
pub async fn create_client(
    kubeconfig: Option<&Path>,
    timeouts: ClientTimeouts,
) -> Result<Client, Error> {
    let mut config = match kubeconfig {
        Some(path) => {
            let kubeconfig = Kubeconfig::read_from(path).map_err(|e| {
                Error::internal_with_context(
                    "create_client",
                    format!("failed to read kubeconfig: {}", e),
                )
            })?;
            Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                .await
                .map_err(|e| {
                    Error::internal_with_context(
                        "create_client",
                        format!("failed to load kubeconfig: {}", e),
                    )
                })?
        }
        None => Config::infer().await.map_err(|e| {
            Error::internal_with_context("create_client", format!("failed to infer config: {}", e))
        })?,
    };
    config.connect_timeout = Some(timeouts.connect);
    config.read_timeout = Some(timeouts.read);
    Client::try_from(config).map_err(|e| {
        Error::internal_with_context("create_client", format!("failed to create client: {}", e))
    })
}

/// Load the connection config for a remote cluster from raw kubeconfig YAML
///
/// `api_endpoint` overrides the server URL in the kubeconfig, so the client
/// talks to the endpoint the caller records for the cluster.
pub async fn config_from_kubeconfig(
    cluster: &str,
    kubeconfig_yaml: &str,
    api_endpoint: Option<&str>,
    accept_invalid_certs: bool,
    timeouts: ClientTimeouts,
) -> Result<Config, Error> {
    let kubeconfig = Kubeconfig::from_yaml(kubeconfig_yaml)
        .map_err(|e| Error::connection(cluster, format!("invalid kubeconfig: {}", e)))?;
    let mut config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
        .await
        .map_err(|e| Error::connection(cluster, format!("failed to load kubeconfig: {}", e)))?;

    if let Some(endpoint) = api_endpoint {
        config.cluster_url = endpoint
            .parse()
            .map_err(|e| Error::connection(cluster, format!("invalid api endpoint {endpoint}: {e}")))?;
    }
    config.accept_invalid_certs = accept_invalid_certs;
    config.connect_timeout = Some(timeouts.connect);
    config.read_timeout = Some(timeouts.read);
    Ok(config)
}

/// Build a client for a remote cluster from a loaded config
pub fn client_from_config(cluster: &str, config: Config) -> Result<Client, Error> {
    debug!(cluster, url = %config.cluster_url, "Building client for remote cluster");
    Client::try_from(config)
        .map_err(|e| Error::connection(cluster, format!("failed to create client: {}", e)))
}

/// Get a single data value from a Secret
pub async fn get_secret_data(
    client: &Client,
    name: &str,
    namespace: &str,
    key: &str,
) -> Result<Vec<u8>, Error> {
    let secrets: Api<Secret> = Api::namespaced(client.clone(), namespace);

    let secret = secrets.get(name).await.map_err(|e| {
        Error::internal_with_context(
            "get_secret_data",
            format!("Failed to get secret {}/{}: {}", namespace, name, e),
        )
    })?;

    secret
        .data
        .as_ref()
        .and_then(|d| d.get(key))
        .map(|v| v.0.clone())
        .ok_or_else(|| {
            Error::internal_with_context(
                "get_secret_data",
                format!("Secret {}/{} missing key {}", namespace, name, key),
            )
        })
}

/// Render exact-match labels as a Kubernetes label selector string
///
/// Keys are emitted in sorted order so the selector is stable.
pub fn label_selector(labels: &BTreeMap<String, String>) -> String {
    labels
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_selector_sorted_and_joined() {
        let labels = BTreeMap::from([
            ("b.armada.dev/key".to_string(), "two".to_string()),
            ("a.armada.dev/key".to_string(), "one".to_string()),
        ]);
        assert_eq!(
            label_selector(&labels),
            "a.armada.dev/key=one,b.armada.dev/key=two"
        );
    }

    #[test]
    fn test_label_selector_empty() {
        assert_eq!(label_selector(&BTreeMap::new()), "");
    }

    #[test]
    fn test_default_timeouts() {
        let timeouts = ClientTimeouts::default();
        assert_eq!(timeouts.connect, DEFAULT_CONNECT_TIMEOUT);
        assert_eq!(timeouts.read, DEFAULT_READ_TIMEOUT);
    }

    const KUBECONFIG: &str = r#"
apiVersion: v1
kind: Config
clusters:
- name: member
  cluster:
    server: https://kubeconfig.example.com:6443
contexts:
- name: member
  context:
    cluster: member
    user: member
current-context: member
users:
- name: member
  user:
    token: test-token
"#;

    #[tokio::test]
    async fn test_invalid_kubeconfig_is_connection_error() {
        let Err(err) = config_from_kubeconfig(
            "member-1",
            "not: [valid",
            None,
            false,
            ClientTimeouts::default(),
        )
        .await
        else {
            panic!("expected a connection error");
        };
        assert!(matches!(err, Error::Connection { ref cluster, .. } if cluster == "member-1"));
    }

    #[tokio::test]
    async fn test_kubeconfig_server_used_without_override() {
        let config = config_from_kubeconfig(
            "member-1",
            KUBECONFIG,
            None,
            false,
            ClientTimeouts::default(),
        )
        .await
        .unwrap();
        assert_eq!(config.cluster_url.host(), Some("kubeconfig.example.com"));
        assert_eq!(config.connect_timeout, Some(DEFAULT_CONNECT_TIMEOUT));
        assert_eq!(config.read_timeout, Some(DEFAULT_READ_TIMEOUT));
    }

    #[tokio::test]
    async fn test_api_endpoint_overrides_kubeconfig_server() {
        let config = config_from_kubeconfig(
            "member-1",
            KUBECONFIG,
            Some("https://api.member-1.example.com:6443"),
            true,
            ClientTimeouts::default(),
        )
        .await
        .unwrap();
        assert_eq!(config.cluster_url.host(), Some("api.member-1.example.com"));
        assert_eq!(config.cluster_url.port_u16(), Some(6443));
        assert!(config.accept_invalid_certs);
    }

    #[tokio::test]
    async fn test_invalid_api_endpoint_is_connection_error() {
        let Err(err) = config_from_kubeconfig(
            "member-1",
            KUBECONFIG,
            Some("not a url"),
            false,
            ClientTimeouts::default(),
        )
        .await
        else {
            panic!("expected a connection error");
        };
        assert!(matches!(err, Error::Connection { .. }));
    }
}

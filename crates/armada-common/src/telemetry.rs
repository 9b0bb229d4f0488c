//! Telemetry initialization for the armada operator
//!
//! - JSON structured logging filtered by `RUST_LOG`, or by a default filter
//!   that raises the armada crates to the configured level
//! - OTLP trace export when `OTEL_EXPORTER_OTLP_ENDPOINT` is set
//! - resource attributes naming the pod and the watched namespace

use opentelemetry::trace::TracerProvider as _;
use opentelemetry::{global, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::TracerProvider;
use opentelemetry_sdk::{runtime, Resource};
use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Log targets of the armada workspace crates
const ARMADA_TARGETS: [&str; 4] = ["armada", "armada_common", "armada_cluster", "armada_banneduser"];

/// Level for dependencies when `RUST_LOG` is unset
const DEPENDENCY_DIRECTIVES: &str = "info,kube=info,tower=warn,hyper=warn,h2=warn";

/// Resource attribute carrying the namespace the controller watches
const WATCH_NAMESPACE_ATTRIBUTE: &str = "armada.watch_namespace";

/// Errors that can occur during telemetry initialization
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Failed to initialize OpenTelemetry tracer
    #[error("failed to initialize tracer: {0}")]
    TracerInit(String),

    /// The configured log level is not a valid filter directive
    #[error("invalid log level {0:?}")]
    InvalidLevel(String),

    /// Failed to initialize tracing subscriber
    #[error("failed to initialize tracing subscriber: {0}")]
    SubscriberInit(String),
}

/// Configuration for telemetry initialization
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name for traces (e.g., "armada-operator")
    pub service_name: String,

    /// OTLP endpoint for trace export (e.g., "http://otel-collector:4317").
    /// If None, spans only reach the local log output.
    pub otlp_endpoint: Option<String>,

    /// Level applied to the armada crates when `RUST_LOG` is unset
    pub log_level: String,

    /// Namespace the controller watches, recorded on exported spans
    pub watch_namespace: Option<String>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "armada".to_string(),
            otlp_endpoint: std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").ok(),
            log_level: "debug".to_string(),
            watch_namespace: None,
        }
    }
}

/// Default filter: dependencies at their usual levels, armada crates at `level`
pub fn default_filter(level: &str) -> String {
    let mut directives = vec![DEPENDENCY_DIRECTIVES.to_string()];
    directives.extend(ARMADA_TARGETS.iter().map(|target| format!("{target}={level}")));
    directives.join(",")
}

/// Initialize telemetry with the given configuration
///
/// Installs the W3C TraceContext propagator, the JSON log layer and, when an
/// endpoint is configured, the OTLP trace exporter.
pub fn init_telemetry(config: TelemetryConfig) -> Result<(), TelemetryError> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_filter(&config.log_level))
            .map_err(|_| TelemetryError::InvalidLevel(config.log_level.clone()))?,
    };

    global::set_text_map_propagator(TraceContextPropagator::new());

    let otel_layer = match &config.otlp_endpoint {
        Some(endpoint) => {
            let resource = build_resource(&config.service_name, config.watch_namespace.as_deref());
            let provider = init_otlp_tracer(endpoint, resource)?;
            let tracer = provider.tracer(config.service_name.clone());
            Some(tracing_opentelemetry::layer().with_tracer(tracer))
        }
        None => None,
    };

    let fmt_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(false)
        .with_target(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .with(otel_layer)
        .try_init()
        .map_err(|e| TelemetryError::SubscriberInit(e.to_string()))
}

/// Build the OpenTelemetry resource describing this operator instance
fn build_resource(service_name: &str, watch_namespace: Option<&str>) -> Resource {
    let mut attributes = vec![KeyValue::new(
        opentelemetry_semantic_conventions::resource::SERVICE_NAME,
        service_name.to_string(),
    )];

    // Set via the Deployment downward API
    for (env, key) in [
        ("POD_NAME", "k8s.pod.name"),
        ("POD_NAMESPACE", "k8s.namespace.name"),
        ("NODE_NAME", "k8s.node.name"),
    ] {
        if let Ok(value) = std::env::var(env) {
            attributes.push(KeyValue::new(key, value));
        }
    }

    if let Some(namespace) = watch_namespace {
        attributes.push(KeyValue::new(WATCH_NAMESPACE_ATTRIBUTE, namespace.to_string()));
    }

    attributes.push(KeyValue::new(
        opentelemetry_semantic_conventions::resource::SERVICE_VERSION,
        env!("CARGO_PKG_VERSION"),
    ));

    Resource::new(attributes)
}

fn init_otlp_tracer(endpoint: &str, resource: Resource) -> Result<TracerProvider, TelemetryError> {
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()
        .map_err(|e| TelemetryError::TracerInit(e.to_string()))?;

    let provider = TracerProvider::builder()
        .with_batch_exporter(exporter, runtime::Tokio)
        .with_resource(resource)
        .build();

    global::set_tracer_provider(provider.clone());

    Ok(provider)
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry::Key;

    #[test]
    fn test_default_filter_covers_every_crate() {
        let filter = default_filter("trace");
        assert!(filter.starts_with("info,"));
        for target in ARMADA_TARGETS {
            assert!(filter.contains(&format!("{target}=trace")), "{target} missing");
        }
        assert!(EnvFilter::try_new(&filter).is_ok());
    }

    #[test]
    fn test_default_config_level() {
        let config = TelemetryConfig::default();
        assert_eq!(config.log_level, "debug");
        assert!(config.watch_namespace.is_none());
    }

    #[test]
    fn test_resource_records_watch_namespace() {
        let resource = build_resource("armada-operator", Some("armada-system"));
        assert_eq!(
            resource.get(Key::new(WATCH_NAMESPACE_ATTRIBUTE)),
            Some("armada-system".into())
        );
        assert_eq!(
            resource.get(Key::new(
                opentelemetry_semantic_conventions::resource::SERVICE_NAME
            )),
            Some("armada-operator".into())
        );
    }

    #[test]
    fn test_resource_without_watch_namespace() {
        let resource = build_resource("armada-operator", None);
        assert!(resource.get(Key::new(WATCH_NAMESPACE_ATTRIBUTE)).is_none());
    }
}

//! Initializes logging and, when configured, OpenTelemetry trace export.
use std::env;

use opentelemetry::{trace::TracerProvider, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::Resource;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

/// Environment variable holding the OTLP endpoint for exporting traces.
pub const OTLP_URL_ENVVAR: &str = "DVT_REGISTRAR_OTLP_URL";

/// Environment variable holding a deployment label that is appended to the whoami string.
pub const SVC_LABEL_ENVVAR: &str = "DVT_REGISTRAR_SVC_LABEL";

/// Configuration for the logger.
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// The whoami string, which is used to identify the service in logs.
    whoami: String,

    /// The OpenTelemetry URL for exporting traces.
    otel_url: Option<String>,
}

impl LoggerConfig {
    /// Creates a new empty instance with whoami set.
    pub const fn new(whoami: String) -> Self {
        Self {
            whoami,
            otel_url: None,
        }
    }

    /// Creates a new instance with the whoami string derived from the given base name and the
    /// deployment label, if one is set.
    pub fn with_base_name(s: &str) -> Self {
        Self::new(get_whoami_string(s))
    }

    /// Sets the opentelemetry URL to the provided string.
    pub fn set_otlp_url(&mut self, url: String) {
        self.otel_url = Some(url);
    }
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self::with_base_name("(dvt-registrar)")
    }
}

/// Initializes the logging subsystem with the provided config.
///
/// Log filtering follows `RUST_LOG`. When an OTLP endpoint is configured, spans are additionally
/// exported over gRPC with the whoami string as the service name.
pub fn init(config: LoggerConfig) {
    let stdout_sub = tracing_subscriber::fmt::layer()
        .compact()
        .with_filter(tracing_subscriber::EnvFilter::from_default_env());

    match &config.otel_url {
        Some(otel_url) => {
            let resource = Resource::builder()
                .with_attribute(KeyValue::new("service.name", config.whoami.clone()))
                .build();

            let exporter = opentelemetry_otlp::SpanExporter::builder()
                .with_tonic()
                .with_endpoint(otel_url)
                .build()
                .expect("must be able to initialize exporter");

            let tracer_provider = opentelemetry_sdk::trace::SdkTracerProvider::builder()
                .with_resource(resource)
                .with_batch_exporter(exporter)
                .build();

            let otel_sub = tracing_opentelemetry::layer()
                .with_tracer(tracer_provider.tracer("dvt-registrar"));

            tracing_subscriber::registry()
                .with(stdout_sub)
                .with(otel_sub)
                .init();
        }
        None => {
            tracing_subscriber::registry().with(stdout_sub).init();
        }
    }

    info!(whoami = %config.whoami, "logging started");
}

/// Gets the OTLP URL from the standard envvar.
pub fn get_otlp_url_from_env() -> Option<String> {
    env::var(OTLP_URL_ENVVAR).ok()
}

/// Gets the service label from the standard envvar, which should be included
/// in the whoami string.
pub fn get_service_label_from_env() -> Option<String> {
    env::var(SVC_LABEL_ENVVAR).ok()
}

/// Computes a standard whoami string.
pub fn get_whoami_string(base: &str) -> String {
    match get_service_label_from_env() {
        Some(label) => format!("{base}%{label}"),
        None => base.to_owned(),
    }
}

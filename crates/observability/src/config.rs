use opentelemetry_sdk::trace::TracerProvider as SdkTracerProvider;

/// Service name reported on every exported span.
pub const SERVICE_NAME: &str = "gunshot-main-worker-service";

#[derive(Clone, Debug)]
pub struct TelemetryConfig {
    pub service_name: String,
    /// OTLP/gRPC collector endpoint, e.g. `http://otel:4317`. `None` disables export.
    pub otel_endpoint: Option<String>,
    /// Default filter when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: SERVICE_NAME.to_string(),
            otel_endpoint: None,
            log_level: "info".to_string(),
        }
    }
}

impl TelemetryConfig {
    /// Build the collector endpoint from a host/port pair.
    pub fn with_collector(mut self, host: &str, port: &str) -> Self {
        self.otel_endpoint = Some(format!("http://{host}:{port}"));
        self
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }
}

/// Providers returned from initialization so they can be flushed on shutdown.
pub struct TelemetryProviders {
    pub tracer_provider: SdkTracerProvider,
}

use config::{Config, ConfigError, Environment};
use serde::Deserialize;

use gunshot_infra::consumer::DEFAULT_MAX_IN_FLIGHT;
use gunshot_observability::TelemetryConfig;

/// Process configuration, read from unprefixed environment variables
/// (`MLSERVICE_HOST`, `CONSUMER_PEERS`, ...).
#[derive(Debug, Deserialize, Clone)]
pub struct WorkerConfig {
    /// Inference gRPC host
    pub mlservice_host: String,
    /// Inference gRPC port
    pub mlservice_port: String,

    /// Comma-separated consumer brokers
    pub consumer_peers: String,
    /// Expected inbound topic; the worker always reads the fixed job topic
    pub consumer_topic: String,
    pub consumer_group_name: String,
    /// Concurrently processed messages
    #[serde(default = "default_max_in_flight")]
    pub consumer_max_in_flight: usize,

    /// Comma-separated producer brokers
    pub producer_peers: String,
    /// Topic notifications are published to
    pub producer_topic: String,

    /// OTLP collector host
    pub otel_host: String,
    /// OTLP collector port
    pub otel_port: String,

    /// Log level when `RUST_LOG` is unset (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_max_in_flight() -> usize {
    DEFAULT_MAX_IN_FLIGHT
}

fn default_log_level() -> String {
    "info".to_string()
}

impl WorkerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(Environment::default())
    }

    fn load(source: Environment) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(source.try_parsing(true))
            .build()?
            .try_deserialize()
    }

    pub fn telemetry(&self) -> TelemetryConfig {
        TelemetryConfig::default()
            .with_collector(&self.otel_host, &self.otel_port)
            .with_log_level(self.log_level.clone())
    }
}

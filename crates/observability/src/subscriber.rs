//! Tracing/logging initialization.
//!
//! JSON logs on stdout, filtered via `RUST_LOG`. When a collector endpoint is
//! configured, spans are additionally exported over OTLP.

use anyhow::Result;
use opentelemetry::{KeyValue, trace::TracerProvider as _};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    Resource, runtime,
    trace::{RandomIdGenerator, Sampler, TracerProvider as SdkTracerProvider},
};
use tracing::Subscriber;
use tracing_subscriber::{
    EnvFilter, Layer, layer::SubscriberExt, registry::LookupSpan, util::SubscriberInitExt,
};

use crate::config::{TelemetryConfig, TelemetryProviders};

/// Initialize tracing/logging for the process.
///
/// Returns the tracer provider when OTLP export is enabled; hand it back to
/// [`shutdown`] before exit so buffered spans are flushed.
pub fn init(config: &TelemetryConfig) -> Result<Option<TelemetryProviders>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let Some(endpoint) = config.otel_endpoint.as_deref() else {
        tracing_subscriber::registry()
            .with(filter)
            .with(json_fmt_layer())
            .try_init()?;
        return Ok(None);
    };

    let resource = Resource::new(vec![
        KeyValue::new(
            opentelemetry_semantic_conventions::resource::SERVICE_NAME,
            config.service_name.clone(),
        ),
        KeyValue::new("library.language", "rust"),
    ]);

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()?;

    let tracer_provider = SdkTracerProvider::builder()
        .with_batch_exporter(exporter, runtime::Tokio)
        .with_sampler(Sampler::AlwaysOn)
        .with_id_generator(RandomIdGenerator::default())
        .with_resource(resource)
        .build();

    let tracer = tracer_provider.tracer("gunshot-worker");
    let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);

    // otel layer before fmt so log lines can see the OTel span context.
    tracing_subscriber::registry()
        .with(filter)
        .with(otel_layer)
        .with(json_fmt_layer())
        .try_init()?;

    Ok(Some(TelemetryProviders { tracer_provider }))
}

/// JSON log layer, generic over the subscriber stack it is attached to.
fn json_fmt_layer<S>() -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    tracing_subscriber::fmt::layer()
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_current_span(true)
        .with_target(false)
}

/// Flush and stop span export.
pub fn shutdown(providers: Option<TelemetryProviders>) -> Result<()> {
    if let Some(providers) = providers {
        providers.tracer_provider.shutdown()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_disables_export() {
        let config = TelemetryConfig::default();
        assert_eq!(config.service_name, crate::config::SERVICE_NAME);
        assert!(config.otel_endpoint.is_none());
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn collector_endpoint_is_built_from_host_and_port() {
        let config = TelemetryConfig::default().with_collector("otel", "4317");
        assert_eq!(config.otel_endpoint.as_deref(), Some("http://otel:4317"));
    }

    #[test]
    fn shutdown_without_providers_is_a_no_op() {
        assert!(shutdown(None).is_ok());
    }
}

//! W3C trace-context propagation across message boundaries.
//!
//! Components receive a [`TracePropagator`] at construction instead of
//! reaching for a process-wide propagator.

use std::sync::Arc;

use opentelemetry::{
    Context,
    propagation::{Extractor, Injector, TextMapPropagator},
};
use opentelemetry_sdk::propagation::TraceContextPropagator;
use tracing_opentelemetry::OpenTelemetrySpanExt;

#[derive(Clone)]
pub struct TracePropagator {
    inner: Arc<dyn TextMapPropagator + Send + Sync>,
}

impl core::fmt::Debug for TracePropagator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TracePropagator").finish_non_exhaustive()
    }
}

impl Default for TracePropagator {
    fn default() -> Self {
        Self::w3c()
    }
}

impl TracePropagator {
    /// `traceparent` / `tracestate` headers.
    pub fn w3c() -> Self {
        Self::new(TraceContextPropagator::new())
    }

    pub fn new(propagator: impl TextMapPropagator + Send + Sync + 'static) -> Self {
        Self {
            inner: Arc::new(propagator),
        }
    }

    pub fn inject_context(&self, cx: &Context, injector: &mut dyn Injector) {
        self.inner.inject_context(cx, injector);
    }

    /// Write the trace context of `span` into outbound headers.
    pub fn inject_span(&self, span: &tracing::Span, injector: &mut dyn Injector) {
        self.inject_context(&span.context(), injector);
    }

    /// Read a remote trace context. Missing or invalid headers give an empty context.
    pub fn extract(&self, extractor: &dyn Extractor) -> Context {
        self.inner.extract(extractor)
    }

    /// Make the trace found in `extractor` the parent of `span`.
    pub fn set_parent(&self, span: &tracing::Span, extractor: &dyn Extractor) {
        span.set_parent(self.extract(extractor));
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use opentelemetry::trace::{
        SpanContext, SpanId, TraceContextExt, TraceFlags, TraceId, TraceState,
    };

    use super::*;

    const TRACE_ID: &str = "0af7651916cd43dd8448eb211c80319c";
    const SPAN_ID: &str = "b7ad6b7169203331";

    fn remote_context() -> Context {
        let sc = SpanContext::new(
            TraceId::from_hex(TRACE_ID).unwrap(),
            SpanId::from_hex(SPAN_ID).unwrap(),
            TraceFlags::SAMPLED,
            true,
            TraceState::default(),
        );
        Context::new().with_remote_span_context(sc)
    }

    #[test]
    fn inject_then_extract_keeps_trace_id() {
        let propagator = TracePropagator::w3c();
        let mut headers: HashMap<String, String> = HashMap::new();

        propagator.inject_context(&remote_context(), &mut headers);
        assert_eq!(
            headers.get("traceparent").map(String::as_str),
            Some("00-0af7651916cd43dd8448eb211c80319c-b7ad6b7169203331-01")
        );

        let cx = propagator.extract(&headers);
        assert_eq!(cx.span().span_context().trace_id().to_string(), TRACE_ID);
    }

    #[test]
    fn missing_headers_yield_an_invalid_span_context() {
        let headers: HashMap<String, String> = HashMap::new();
        let cx = TracePropagator::w3c().extract(&headers);
        assert!(!cx.span().span_context().is_valid());
    }

    #[test]
    fn set_parent_without_subscriber_does_not_panic() {
        let headers: HashMap<String, String> = HashMap::new();
        TracePropagator::w3c().set_parent(&tracing::Span::none(), &headers);
    }
}

//! Kafka header adapters for trace-context propagation.

use std::collections::HashMap;

use opentelemetry::propagation::Injector;
use rdkafka::message::{Header, Headers, OwnedHeaders};
use tracing::Span;

use gunshot_observability::TracePropagator;

/// Builds outbound [`OwnedHeaders`] from propagator writes.
#[derive(Debug)]
pub struct HeaderInjector {
    headers: OwnedHeaders,
}

impl Default for HeaderInjector {
    fn default() -> Self {
        Self::new()
    }
}

impl HeaderInjector {
    pub fn new() -> Self {
        Self {
            headers: OwnedHeaders::new(),
        }
    }

    pub fn into_headers(self) -> OwnedHeaders {
        self.headers
    }
}

impl Injector for HeaderInjector {
    fn set(&mut self, key: &str, value: String) {
        let headers = std::mem::replace(&mut self.headers, OwnedHeaders::new());
        self.headers = headers.insert(Header {
            key,
            value: Some(value.as_str()),
        });
    }
}

/// Outbound headers carrying the trace context of the current span.
pub fn current_trace_headers(propagator: &TracePropagator) -> OwnedHeaders {
    let mut injector = HeaderInjector::new();
    propagator.inject_span(&Span::current(), &mut injector);
    injector.into_headers()
}

/// Copy UTF-8 headers into a map; the map doubles as a propagator extractor.
///
/// Non-UTF-8 and valueless headers are skipped. Later duplicates win.
pub fn header_map<H: Headers>(headers: Option<&H>) -> HashMap<String, String> {
    let Some(headers) = headers else {
        return HashMap::new();
    };

    headers
        .iter()
        .filter_map(|h| {
            let value = std::str::from_utf8(h.value?).ok()?;
            Some((h.key.to_string(), value.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn injected_headers_are_readable_back() {
        let mut injector = HeaderInjector::new();
        injector.set("traceparent", "00-0af7651916cd43dd8448eb211c80319c-b7ad6b7169203331-01".into());
        injector.set("tracestate", "vendor=1".into());

        let headers = injector.into_headers();
        let map = header_map(Some(&headers));

        assert_eq!(map.len(), 2);
        assert_eq!(map["tracestate"], "vendor=1");
        assert!(map["traceparent"].starts_with("00-0af7"));
    }

    #[test]
    fn missing_or_binary_headers_are_skipped() {
        assert!(header_map::<OwnedHeaders>(None).is_empty());

        let headers = OwnedHeaders::new()
            .insert(Header {
                key: "blob",
                value: Some(&[0xff, 0xfe][..]),
            })
            .insert(Header::<&str> {
                key: "empty",
                value: None,
            });
        assert!(header_map(Some(&headers)).is_empty());
    }
}

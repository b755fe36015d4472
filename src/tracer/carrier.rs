//! Header carriers used for context propagation.
//!
//! Both sides plug into the `opentelemetry` propagation traits so the B3 and
//! Jaeger propagators can read and write HTTP headers directly.

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use opentelemetry::propagation::{Extractor, Injector};

/// Read-only view over inbound request headers.
///
/// Header values that are not valid visible ASCII are skipped.
#[derive(Debug, Clone, Copy)]
pub struct HeaderExtractor<'a> {
    headers: &'a HeaderMap,
}

impl<'a> HeaderExtractor<'a> {
    pub fn new(headers: &'a HeaderMap) -> Self {
        Self { headers }
    }
}

impl Extractor for HeaderExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        // HeaderMap lookups are already case-insensitive.
        self.headers.get(key).and_then(|value| value.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.headers
            .iter()
            .filter(|(_, value)| value.to_str().is_ok())
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

/// Writes through an extractor are dropped; inbound headers are never mutated.
impl Injector for HeaderExtractor<'_> {
    fn set(&mut self, _key: &str, _value: String) {}
}

/// Write-only view over outbound request headers.
#[derive(Debug)]
pub struct HeaderInjector<'a> {
    headers: &'a mut HeaderMap,
}

impl<'a> HeaderInjector<'a> {
    pub fn new(headers: &'a mut HeaderMap) -> Self {
        Self { headers }
    }
}

impl Injector for HeaderInjector<'_> {
    fn set(&mut self, key: &str, value: String) {
        let name = match HeaderName::from_bytes(key.as_bytes()) {
            Ok(name) => name,
            Err(_) => {
                tracing::debug!(key = %key, "Skipping invalid propagation header name");
                return;
            }
        };
        match HeaderValue::from_str(&value) {
            Ok(value) => {
                self.headers.insert(name, value);
            }
            Err(_) => {
                tracing::debug!(key = %key, "Skipping invalid propagation header value");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extractor_reads_headers_and_ignores_writes() {
        let mut headers = HeaderMap::new();
        headers.insert("x-b3-spanid", HeaderValue::from_static("def"));
        headers.insert("x-binary", HeaderValue::from_bytes(&[0xff, 0xfe]).unwrap());

        let mut extractor = HeaderExtractor::new(&headers);
        extractor.set("x-b3-spanid", "overwritten".to_string());

        assert_eq!(extractor.get("X-B3-SpanId"), Some("def"));
        assert_eq!(extractor.get("x-binary"), None);
        assert_eq!(extractor.keys(), vec!["x-b3-spanid"]);
        assert_eq!(headers.len(), 2);
    }

    #[test]
    fn test_injector_writes_valid_headers_only() {
        let mut headers = HeaderMap::new();
        let mut injector = HeaderInjector::new(&mut headers);
        injector.set("X-B3-TraceId", "abc".to_string());
        injector.set("bad header", "value".to_string());
        injector.set("baggage", "line\nbreak".to_string());

        assert_eq!(headers.get("x-b3-traceid").unwrap(), "abc");
        assert_eq!(headers.len(), 1);
    }
}

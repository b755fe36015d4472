//! Zipkin span delivery over HTTP (JSON v1).
//!
//! # Responsibilities
//! - Convert finished spans to the Zipkin v1 JSON model
//! - POST batches to `<base>/api/v1/spans`
//!
//! # Mapping
//! - `span.kind=server` becomes `sr`/`ss` annotations, `client` `cs`/`cr`
//! - every other tag becomes a string binary annotation
//! - a log becomes an annotation: the `event` field alone, otherwise the
//!   fields joined as `key=value`

use serde::Serialize;

use crate::reporter::{BufferedReporter, QueueSettings, ReporterError, SpanSender};
use crate::tracer::tags;
use crate::tracer::{FinishedSpan, LogRecord, TagValue};

/// Path appended to the configured Zipkin base URL.
pub const SPANS_PATH: &str = "/api/v1/spans";

/// Build the collector endpoint from the configured base URL.
///
/// The base is not validated; a bad URL shows up as a failed flush.
pub fn spans_endpoint(base_url: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), SPANS_PATH)
}

/// Start a buffered reporter posting to `endpoint`.
pub fn reporter(
    endpoint: String,
    service_name: &str,
    settings: QueueSettings,
) -> Result<BufferedReporter, ReporterError> {
    let sender = ZipkinSender::new(endpoint, service_name, &settings)?;
    BufferedReporter::spawn("zipkin", sender, settings)
}

pub struct ZipkinSender {
    client: reqwest::Client,
    endpoint: String,
    service_name: String,
}

impl ZipkinSender {
    pub fn new(
        endpoint: String,
        service_name: &str,
        settings: &QueueSettings,
    ) -> Result<Self, ReporterError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.send_timeout)
            .build()?;
        Ok(Self {
            client,
            endpoint,
            service_name: service_name.to_string(),
        })
    }
}

impl SpanSender for ZipkinSender {
    async fn send(&mut self, batch: Vec<FinishedSpan>) -> Result<(), ReporterError> {
        let spans = encode_batch(&batch, &self.service_name);
        self.client
            .post(&self.endpoint)
            .json(&spans)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct V1Span {
    pub trace_id: String,
    pub name: String,
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub timestamp: u64,
    pub duration: u64,
    pub annotations: Vec<Annotation>,
    pub binary_annotations: Vec<BinaryAnnotation>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub debug: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Annotation {
    pub timestamp: u64,
    pub value: String,
    pub endpoint: Endpoint,
}

#[derive(Debug, Clone, Serialize)]
pub struct BinaryAnnotation {
    pub key: String,
    pub value: String,
    pub endpoint: Endpoint,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    pub service_name: String,
}

pub fn encode_batch(spans: &[FinishedSpan], service_name: &str) -> Vec<V1Span> {
    spans.iter().map(|span| encode_span(span, service_name)).collect()
}

fn encode_span(span: &FinishedSpan, service_name: &str) -> V1Span {
    let endpoint = Endpoint {
        service_name: service_name.to_string(),
    };
    let start = micros(span.start_time);
    let duration = (span.duration().as_micros() as u64).max(1);
    let finish = start + duration;

    let mut annotations = Vec::new();
    let kind = match span.tag(tags::SPAN_KIND) {
        Some(TagValue::String(kind)) => Some(kind.as_str()),
        _ => None,
    };
    let kind_annotations = match kind {
        Some(tags::SPAN_KIND_SERVER) => Some(("sr", "ss")),
        Some(tags::SPAN_KIND_CLIENT) => Some(("cs", "cr")),
        _ => None,
    };
    if let Some((begin, end)) = kind_annotations {
        annotations.push(annotation(start, begin, &endpoint));
        annotations.push(annotation(finish, end, &endpoint));
    }
    for log in &span.logs {
        annotations.push(annotation(micros(log.timestamp), &log_value(log), &endpoint));
    }
    annotations.sort_by_key(|a| a.timestamp);

    let binary_annotations = span
        .tags
        .iter()
        .filter(|(key, _)| key.as_str() != tags::SPAN_KIND || kind_annotations.is_none())
        .map(|(key, value)| BinaryAnnotation {
            key: key.clone(),
            value: value.to_string(),
            endpoint: endpoint.clone(),
        })
        .collect();

    V1Span {
        trace_id: span.context.trace_id.to_hex(),
        name: span.operation_name.to_lowercase(),
        id: span.context.span_id.to_hex(),
        parent_id: span.context.parent_id.map(|id| id.to_hex()),
        timestamp: start,
        duration,
        annotations,
        binary_annotations,
        debug: span.context.debug,
    }
}

fn annotation(timestamp: u64, value: &str, endpoint: &Endpoint) -> Annotation {
    Annotation {
        timestamp,
        value: value.to_string(),
        endpoint: endpoint.clone(),
    }
}

fn log_value(log: &LogRecord) -> String {
    if let [(key, value)] = log.fields.as_slice() {
        if key == tags::EVENT {
            return value.to_string();
        }
    }
    log.fields
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join(" ")
}

fn micros(time: std::time::SystemTime) -> u64 {
    time.duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_micros() as u64
}

//! Jaeger span delivery over UDP to the agent.
//!
//! # Responsibilities
//! - Encode batches as the agent's oneway `emitBatch` call (Thrift compact)
//! - Keep each datagram under the agent's packet limit
//! - Resolve and connect the agent address lazily
//!
//! # Design Decisions
//! - Address resolution happens on first flush, so a bad address is a
//!   logged flush failure rather than a startup error
//! - Oversized batches are split in half until they fit; a single span that
//!   still does not fit is dropped

use std::net::{IpAddr, SocketAddr};
use std::time::SystemTime;

use thrift::protocol::{
    TCompactOutputProtocol, TFieldIdentifier, TListIdentifier, TMessageIdentifier, TMessageType,
    TOutputProtocol, TStructIdentifier, TType,
};
use tokio::net::UdpSocket;

use crate::reporter::{BufferedReporter, QueueSettings, ReporterError, SpanSender};
use crate::tracer::{FinishedSpan, LogRecord, TagValue};

/// Compact-protocol port of the Jaeger agent.
pub const DEFAULT_AGENT_PORT: u16 = 6831;

/// Largest datagram the agent accepts.
pub const MAX_PACKET_SIZE: usize = 65_000;

const FLAG_SAMPLED: i32 = 0x01;
const FLAG_DEBUG: i32 = 0x02;

/// Identity of the reporting process.
#[derive(Debug, Clone)]
pub struct Process {
    pub service_name: String,
    pub tags: Vec<(String, TagValue)>,
}

impl Process {
    pub fn new(service_name: &str) -> Self {
        let mut tags = vec![(
            "jaeger.version".to_string(),
            TagValue::from(concat!("Rust-", env!("CARGO_PKG_VERSION"))),
        )];
        if let Ok(hostname) = std::env::var("HOSTNAME") {
            tags.push(("hostname".to_string(), TagValue::from(hostname)));
        }
        Self {
            service_name: service_name.to_string(),
            tags,
        }
    }
}

/// Agent address with the default port filled in when missing.
///
/// A bare IPv6 address is bracketed so the result stays resolvable.
pub fn agent_address(server_url: &str) -> String {
    let server_url = server_url.trim();
    if server_url.parse::<SocketAddr>().is_ok() {
        return server_url.to_string();
    }
    if let Ok(ip) = server_url.parse::<IpAddr>() {
        return SocketAddr::new(ip, DEFAULT_AGENT_PORT).to_string();
    }
    if server_url.starts_with('[') && server_url.ends_with(']') {
        return format!("{}:{}", server_url, DEFAULT_AGENT_PORT);
    }

    let has_port = match server_url.rsplit_once(':') {
        Some((host, port)) => {
            !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) && !host.ends_with(':')
        }
        None => false,
    };
    if has_port {
        server_url.to_string()
    } else {
        format!("{}:{}", server_url, DEFAULT_AGENT_PORT)
    }
}

/// Start a buffered reporter sending to the agent at `agent`.
pub fn reporter(
    agent: String,
    service_name: &str,
    settings: QueueSettings,
) -> Result<BufferedReporter, ReporterError> {
    let sender = JaegerSender::new(agent, Process::new(service_name));
    BufferedReporter::spawn("jaeger", sender, settings)
}

pub struct JaegerSender {
    agent: String,
    process: Process,
    socket: Option<UdpSocket>,
    sequence: i32,
}

impl JaegerSender {
    pub fn new(agent: String, process: Process) -> Self {
        Self {
            agent,
            process,
            socket: None,
            sequence: 0,
        }
    }

    async fn socket(&mut self) -> Result<&UdpSocket, ReporterError> {
        if self.socket.is_none() {
            let agent = tokio::net::lookup_host(&self.agent)
                .await?
                .next()
                .ok_or_else(|| {
                    ReporterError::Io(std::io::Error::new(
                        std::io::ErrorKind::AddrNotAvailable,
                        format!("'{}' resolved to no address", self.agent),
                    ))
                })?;
            let local = if agent.is_ipv6() { "[::]:0" } else { "0.0.0.0:0" };
            let socket = UdpSocket::bind(local).await?;
            socket.connect(agent).await?;
            tracing::debug!(agent = %agent, "Connected to Jaeger agent");
            self.socket = Some(socket);
        }
        self.socket.as_ref().ok_or_else(|| {
            ReporterError::Io(std::io::Error::from(std::io::ErrorKind::NotConnected))
        })
    }

    fn next_sequence(&mut self) -> i32 {
        self.sequence = self.sequence.wrapping_add(1);
        self.sequence
    }
}

impl SpanSender for JaegerSender {
    async fn send(&mut self, batch: Vec<FinishedSpan>) -> Result<(), ReporterError> {
        let mut packets = Vec::new();
        let mut work = vec![batch.as_slice()];

        while let Some(spans) = work.pop() {
            let sequence = self.next_sequence();
            let packet = encode_emit_batch(&self.process, spans, sequence)?;
            if packet.len() <= MAX_PACKET_SIZE {
                packets.push(packet);
            } else if spans.len() > 1 {
                let (left, right) = spans.split_at(spans.len() / 2);
                work.push(right);
                work.push(left);
            } else {
                let error = ReporterError::SpanTooLarge {
                    size: packet.len(),
                    max: MAX_PACKET_SIZE,
                };
                tracing::warn!(error = %error, "Dropping span");
            }
        }

        let socket = self.socket().await?;
        for packet in packets {
            socket.send(&packet).await?;
        }
        Ok(())
    }
}

/// Encode the agent's `emitBatch` oneway call carrying `spans`.
pub fn encode_emit_batch(
    process: &Process,
    spans: &[FinishedSpan],
    sequence: i32,
) -> Result<Vec<u8>, ReporterError> {
    let mut buffer = Vec::new();
    {
        let mut protocol = TCompactOutputProtocol::new(&mut buffer);
        write_emit_batch(&mut protocol, process, spans, sequence)
            .map_err(|e| ReporterError::Encode(e.to_string()))?;
    }
    Ok(buffer)
}

fn write_emit_batch(
    o: &mut dyn TOutputProtocol,
    process: &Process,
    spans: &[FinishedSpan],
    sequence: i32,
) -> thrift::Result<()> {
    o.write_message_begin(&TMessageIdentifier::new(
        "emitBatch",
        TMessageType::OneWay,
        sequence,
    ))?;
    o.write_struct_begin(&TStructIdentifier::new("emitBatch_args"))?;
    o.write_field_begin(&TFieldIdentifier::new("batch", TType::Struct, 1))?;

    // Batch
    o.write_struct_begin(&TStructIdentifier::new("Batch"))?;
    o.write_field_begin(&TFieldIdentifier::new("process", TType::Struct, 1))?;
    write_process(o, process)?;
    o.write_field_end()?;
    o.write_field_begin(&TFieldIdentifier::new("spans", TType::List, 2))?;
    o.write_list_begin(&TListIdentifier::new(TType::Struct, spans.len() as i32))?;
    for span in spans {
        write_span(o, span)?;
    }
    o.write_list_end()?;
    o.write_field_end()?;
    o.write_field_stop()?;
    o.write_struct_end()?;

    o.write_field_end()?;
    o.write_field_stop()?;
    o.write_struct_end()?;
    o.write_message_end()?;
    o.flush()
}

fn write_process(o: &mut dyn TOutputProtocol, process: &Process) -> thrift::Result<()> {
    o.write_struct_begin(&TStructIdentifier::new("Process"))?;
    o.write_field_begin(&TFieldIdentifier::new("serviceName", TType::String, 1))?;
    o.write_string(&process.service_name)?;
    o.write_field_end()?;
    if !process.tags.is_empty() {
        o.write_field_begin(&TFieldIdentifier::new("tags", TType::List, 2))?;
        write_tags(o, process.tags.iter().map(|(k, v)| (k.as_str(), v)), process.tags.len())?;
        o.write_field_end()?;
    }
    o.write_field_stop()?;
    o.write_struct_end()
}

fn write_span(o: &mut dyn TOutputProtocol, span: &FinishedSpan) -> thrift::Result<()> {
    let context = &span.context;
    let mut flags = 0;
    if context.sampled {
        flags |= FLAG_SAMPLED;
    }
    if context.debug {
        flags |= FLAG_DEBUG;
    }

    o.write_struct_begin(&TStructIdentifier::new("Span"))?;
    write_i64_field(o, "traceIdLow", 1, context.trace_id.low as i64)?;
    write_i64_field(o, "traceIdHigh", 2, context.trace_id.high as i64)?;
    write_i64_field(o, "spanId", 3, context.span_id.0 as i64)?;
    write_i64_field(
        o,
        "parentSpanId",
        4,
        context.parent_id.map(|id| id.0 as i64).unwrap_or(0),
    )?;
    o.write_field_begin(&TFieldIdentifier::new("operationName", TType::String, 5))?;
    o.write_string(&span.operation_name)?;
    o.write_field_end()?;
    o.write_field_begin(&TFieldIdentifier::new("flags", TType::I32, 7))?;
    o.write_i32(flags)?;
    o.write_field_end()?;
    write_i64_field(o, "startTime", 8, micros(span.start_time))?;
    write_i64_field(o, "duration", 9, span.duration().as_micros() as i64)?;

    if !span.tags.is_empty() {
        o.write_field_begin(&TFieldIdentifier::new("tags", TType::List, 10))?;
        write_tags(o, span.tags.iter().map(|(k, v)| (k.as_str(), v)), span.tags.len())?;
        o.write_field_end()?;
    }
    if !span.logs.is_empty() {
        o.write_field_begin(&TFieldIdentifier::new("logs", TType::List, 11))?;
        o.write_list_begin(&TListIdentifier::new(TType::Struct, span.logs.len() as i32))?;
        for log in &span.logs {
            write_log(o, log)?;
        }
        o.write_list_end()?;
        o.write_field_end()?;
    }

    o.write_field_stop()?;
    o.write_struct_end()
}

fn write_log(o: &mut dyn TOutputProtocol, log: &LogRecord) -> thrift::Result<()> {
    o.write_struct_begin(&TStructIdentifier::new("Log"))?;
    write_i64_field(o, "timestamp", 1, micros(log.timestamp))?;
    o.write_field_begin(&TFieldIdentifier::new("fields", TType::List, 2))?;
    write_tags(o, log.fields.iter().map(|(k, v)| (k.as_str(), v)), log.fields.len())?;
    o.write_field_end()?;
    o.write_field_stop()?;
    o.write_struct_end()
}

fn write_tags<'a>(
    o: &mut dyn TOutputProtocol,
    tags: impl Iterator<Item = (&'a str, &'a TagValue)>,
    len: usize,
) -> thrift::Result<()> {
    o.write_list_begin(&TListIdentifier::new(TType::Struct, len as i32))?;
    for (key, value) in tags {
        write_tag(o, key, value)?;
    }
    o.write_list_end()
}

/// `Tag` struct; `vType` is STRING=0, DOUBLE=1, BOOL=2, LONG=3.
fn write_tag(o: &mut dyn TOutputProtocol, key: &str, value: &TagValue) -> thrift::Result<()> {
    o.write_struct_begin(&TStructIdentifier::new("Tag"))?;
    o.write_field_begin(&TFieldIdentifier::new("key", TType::String, 1))?;
    o.write_string(key)?;
    o.write_field_end()?;

    let v_type = match value {
        TagValue::String(_) => 0,
        TagValue::F64(_) => 1,
        TagValue::Bool(_) => 2,
        TagValue::I64(_) => 3,
    };
    o.write_field_begin(&TFieldIdentifier::new("vType", TType::I32, 2))?;
    o.write_i32(v_type)?;
    o.write_field_end()?;

    match value {
        TagValue::String(v) => {
            o.write_field_begin(&TFieldIdentifier::new("vStr", TType::String, 3))?;
            o.write_string(v)?;
        }
        TagValue::F64(v) => {
            o.write_field_begin(&TFieldIdentifier::new("vDouble", TType::Double, 4))?;
            o.write_double(*v)?;
        }
        TagValue::Bool(v) => {
            o.write_field_begin(&TFieldIdentifier::new("vBool", TType::Bool, 5))?;
            o.write_bool(*v)?;
        }
        TagValue::I64(v) => {
            o.write_field_begin(&TFieldIdentifier::new("vLong", TType::I64, 6))?;
            o.write_i64(*v)?;
        }
    }
    o.write_field_end()?;
    o.write_field_stop()?;
    o.write_struct_end()
}

fn write_i64_field(
    o: &mut dyn TOutputProtocol,
    name: &str,
    id: i16,
    value: i64,
) -> thrift::Result<()> {
    o.write_field_begin(&TFieldIdentifier::new(name, TType::I64, id))?;
    o.write_i64(value)?;
    o.write_field_end()
}

fn micros(time: SystemTime) -> i64 {
    time.duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_micros() as i64
}

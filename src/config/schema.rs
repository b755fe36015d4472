//! Configuration schema definitions.
//!
//! All file-backed types derive Serde traits for deserialization from TOML.
//! The tracing backend is chosen by environment variables instead of the
//! file, see [`TracingConfig::from_env`].

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::reporter::QueueSettings;

pub const TRACING_SYSTEM_ENV: &str = "TRACING_SYSTEM";
pub const ZIPKIN_SERVER_URL_ENV: &str = "ZIPKIN_SERVER_URL";
pub const JAEGER_SERVER_URL_ENV: &str = "JAEGER_SERVER_URL";

/// Root configuration for the service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AlohaConfig {
    /// Listener configuration.
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Log output settings.
    pub logging: LoggingConfig,

    /// Span reporter tuning.
    pub reporter: ReporterConfig,

    /// Backend selection, read from the environment.
    #[serde(skip)]
    pub tracing: TracingConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,

    /// Filter directives used when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Pretty,
            filter: "aloha=debug,tower_http=debug".to_string(),
        }
    }
}

/// Queue sizes and flush intervals of the span reporters.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReporterConfig {
    pub zipkin_queue_size: usize,
    pub zipkin_flush_interval_ms: u64,
    pub jaeger_queue_size: usize,
    pub jaeger_flush_interval_ms: u64,

    /// Spans per batch that trigger an early flush.
    pub max_batch_spans: usize,

    /// Upper bound on one batch delivery, connection included.
    pub send_timeout_ms: u64,
    pub connect_timeout_ms: u64,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            zipkin_queue_size: 10_000,
            zipkin_flush_interval_ms: 1_000,
            jaeger_queue_size: 100,
            jaeger_flush_interval_ms: 50,
            max_batch_spans: 100,
            send_timeout_ms: 5_000,
            connect_timeout_ms: 2_000,
        }
    }
}

impl ReporterConfig {
    pub fn zipkin_settings(&self) -> QueueSettings {
        QueueSettings {
            queue_size: self.zipkin_queue_size,
            flush_interval: Duration::from_millis(self.zipkin_flush_interval_ms),
            max_batch_spans: self.max_batch_spans,
            send_timeout: Duration::from_millis(self.send_timeout_ms),
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
        }
    }

    pub fn jaeger_settings(&self) -> QueueSettings {
        QueueSettings {
            queue_size: self.jaeger_queue_size,
            flush_interval: Duration::from_millis(self.jaeger_flush_interval_ms),
            max_batch_spans: self.max_batch_spans,
            send_timeout: Duration::from_millis(self.send_timeout_ms),
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
        }
    }
}

/// Tracing backend named by `TRACING_SYSTEM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TracingSystem {
    Zipkin,
    Jaeger,
    #[default]
    Noop,
}

impl TracingSystem {
    /// Exact, case-sensitive match; anything unknown is `Noop`.
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("zipkin") => TracingSystem::Zipkin,
            Some("jaeger") => TracingSystem::Jaeger,
            _ => TracingSystem::Noop,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TracingConfig {
    pub system: TracingSystem,
    pub zipkin_server_url: Option<String>,
    pub jaeger_server_url: Option<String>,
}

impl TracingConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            system: TracingSystem::parse(lookup(TRACING_SYSTEM_ENV).as_deref()),
            zipkin_server_url: lookup(ZIPKIN_SERVER_URL_ENV),
            jaeger_server_url: lookup(JAEGER_SERVER_URL_ENV),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> TracingConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        TracingConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_tracing_system_is_case_sensitive() {
        assert_eq!(TracingSystem::parse(Some("zipkin")), TracingSystem::Zipkin);
        assert_eq!(TracingSystem::parse(Some("jaeger")), TracingSystem::Jaeger);
        assert_eq!(TracingSystem::parse(Some("ZIPKIN")), TracingSystem::Noop);
        assert_eq!(TracingSystem::parse(Some("Jaeger")), TracingSystem::Noop);
        assert_eq!(TracingSystem::parse(Some(" zipkin")), TracingSystem::Noop);
        assert_eq!(TracingSystem::parse(Some("")), TracingSystem::Noop);
        assert_eq!(TracingSystem::parse(None), TracingSystem::Noop);
    }

    #[test]
    fn test_tracing_config_from_lookup() {
        let config = lookup(&[
            ("TRACING_SYSTEM", "zipkin"),
            ("ZIPKIN_SERVER_URL", "http://zipkin:9411"),
        ]);
        assert_eq!(config.system, TracingSystem::Zipkin);
        assert_eq!(config.zipkin_server_url.as_deref(), Some("http://zipkin:9411"));
        assert_eq!(config.jaeger_server_url, None);

        assert_eq!(lookup(&[]), TracingConfig::default());
    }

    #[test]
    fn test_defaults() {
        let config = AlohaConfig::default();
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert_eq!(config.reporter.jaeger_settings().queue_size, 100);
        assert_eq!(
            config.reporter.jaeger_settings().flush_interval,
            Duration::from_millis(50)
        );
        assert_eq!(config.reporter.zipkin_settings().queue_size, 10_000);
        assert_eq!(
            config.reporter.zipkin_settings().send_timeout,
            Duration::from_secs(5)
        );
        assert_eq!(
            config.reporter.jaeger_settings().connect_timeout,
            Duration::from_secs(2)
        );
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: AlohaConfig = toml::from_str(
            r#"
            [listener]
            bind_address = "127.0.0.1:9000"

            [logging]
            format = "json"
            "#,
        )
        .unwrap();
        assert_eq!(config.listener.bind_address, "127.0.0.1:9000");
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.timeouts.request_secs, 30);
        assert_eq!(config.tracing.system, TracingSystem::Noop);
    }
}

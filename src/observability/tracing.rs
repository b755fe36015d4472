//! Tracing backend selection.
//!
//! # Responsibilities
//! - Turn the environment-derived [`TracingConfig`] into the one tracer the
//!   process uses
//! - Start the matching span reporter
//!
//! # Design Decisions
//! - Selection runs once at startup; there is no reload
//! - Server URLs are not validated here; a bad URL shows up as a reporter
//!   warning at flush time
//! - If a reporter cannot start the process keeps serving with the Noop tracer

use std::sync::Arc;

use crate::config::{ReporterConfig, TracingConfig, TracingSystem};
use crate::reporter::{self, ReporterError};
use crate::tracer::{
    JaegerTracer, NoopTracer, ProbabilisticSampler, SharedTracer, ZipkinTracer, SERVICE_NAME,
};

/// Build the process-wide tracer.
pub fn select_tracer(tracing: &TracingConfig, reporter: &ReporterConfig) -> SharedTracer {
    let selected = match tracing.system {
        TracingSystem::Zipkin => zipkin_tracer(tracing, reporter).map(|tracer| {
            tracing::info!("Using Zipkin tracer");
            tracer
        }),
        TracingSystem::Jaeger => jaeger_tracer(tracing, reporter).map(|tracer| {
            tracing::info!("Using Jaeger tracer");
            tracer
        }),
        TracingSystem::Noop => {
            tracing::info!("Using Noop tracer");
            return noop_tracer();
        }
    };

    selected.unwrap_or_else(|e| {
        tracing::error!(error = %e, system = ?tracing.system, "Failed to start span reporter");
        tracing::info!("Using Noop tracer");
        noop_tracer()
    })
}

fn noop_tracer() -> SharedTracer {
    Arc::new(NoopTracer)
}

fn zipkin_tracer(
    tracing: &TracingConfig,
    config: &ReporterConfig,
) -> Result<SharedTracer, ReporterError> {
    let base_url = tracing.zipkin_server_url.as_deref().unwrap_or_default();
    let endpoint = reporter::zipkin::spans_endpoint(base_url);
    tracing::debug!(endpoint = %endpoint, "Zipkin collector");

    let reporter = reporter::zipkin::reporter(endpoint, SERVICE_NAME, config.zipkin_settings())?;
    Ok(Arc::new(ZipkinTracer::new(Arc::new(reporter))))
}

fn jaeger_tracer(
    tracing: &TracingConfig,
    config: &ReporterConfig,
) -> Result<SharedTracer, ReporterError> {
    let server_url = tracing.jaeger_server_url.as_deref().unwrap_or_default();
    let agent = reporter::jaeger::agent_address(server_url);
    tracing::debug!(agent = %agent, "Jaeger agent");

    let reporter = reporter::jaeger::reporter(agent, SERVICE_NAME, config.jaeger_settings())?;
    Ok(Arc::new(JaegerTracer::new(
        Arc::new(reporter),
        ProbabilisticSampler::new(1.0),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(system: Option<&str>) -> TracingConfig {
        TracingConfig {
            system: TracingSystem::parse(system),
            zipkin_server_url: Some("http://127.0.0.1:9".into()),
            jaeger_server_url: Some("127.0.0.1:9".into()),
        }
    }

    #[tokio::test]
    async fn test_selects_backend_by_exact_name() {
        let reporter = ReporterConfig::default();
        assert_eq!(select_tracer(&config(Some("zipkin")), &reporter).backend(), "zipkin");
        assert_eq!(select_tracer(&config(Some("jaeger")), &reporter).backend(), "jaeger");
        assert_eq!(select_tracer(&config(Some("ZIPKIN")), &reporter).backend(), "noop");
        assert_eq!(select_tracer(&config(Some("datadog")), &reporter).backend(), "noop");
        assert_eq!(select_tracer(&config(None), &reporter).backend(), "noop");
    }

    #[tokio::test]
    async fn test_missing_url_still_selects_backend() {
        let tracing = TracingConfig {
            system: TracingSystem::Zipkin,
            ..TracingConfig::default()
        };
        let tracer = select_tracer(&tracing, &ReporterConfig::default());
        assert_eq!(tracer.backend(), "zipkin");
    }

    #[test]
    fn test_falls_back_to_noop_without_runtime() {
        let tracer = select_tracer(&config(Some("jaeger")), &ReporterConfig::default());
        assert_eq!(tracer.backend(), "noop");
    }
}

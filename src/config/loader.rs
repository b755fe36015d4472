//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::{AlohaConfig, TracingConfig};
use crate::config::validation::{validate_config, ValidationError};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration from an optional TOML file plus the environment.
///
/// Without a file every section takes its defaults.
pub fn load_config(path: Option<&Path>) -> Result<AlohaConfig, ConfigError> {
    let mut config = match path {
        Some(path) => parse_config(&fs::read_to_string(path)?)?,
        None => AlohaConfig::default(),
    };
    config.tracing = TracingConfig::from_env();

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Parse a TOML document; the tracing section is left at its default.
pub fn parse_config(content: &str) -> Result<AlohaConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_without_file_uses_defaults() {
        let config = load_config(None).unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("aloha-config-{}.toml", std::process::id()));
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "[timeouts]\nrequest_secs = 5").unwrap();
        drop(file);

        let config = load_config(Some(&path)).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(config.timeouts.request_secs, 5);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = load_config(Some(Path::new("/nonexistent/aloha.toml")));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_invalid_values_are_reported() {
        let config = parse_config("[reporter]\nzipkin_queue_size = 0").unwrap();
        let err = validate_config(&config).map_err(ConfigError::Validation).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Validation failed: reporter.zipkin_queue_size: must be greater than 0"
        );
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        assert!(matches!(parse_config("[listener"), Err(ConfigError::Parse(_))));
    }
}

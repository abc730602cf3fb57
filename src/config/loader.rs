//! Configuration loading from disk.
//!
//! # Responsibilities
//! - Parse a TOML file into `ServerConfig`
//! - Semantic validation (serde handles syntactic): value ranges, address
//!   shape; all violations reported at once

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ServerConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation failed: {}", .0.join(", "))]
    Validation(Vec<String>),
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ServerConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: ServerConfig = toml::from_str(&content)?;
    validate(&config)?;
    Ok(config)
}

/// Semantic checks over an already-deserialized config.
pub fn validate(config: &ServerConfig) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    if config.bind_address.parse::<std::net::SocketAddr>().is_err() {
        errors.push(format!("bind_address {:?} is not host:port", config.bind_address));
    }
    if config.max_connections == 0 {
        errors.push("max_connections must be positive".to_string());
    }
    if config.max_packet_size == 0 {
        errors.push("max_packet_size must be positive".to_string());
    }
    if config.io_threads == 0 {
        errors.push("io_threads must be positive".to_string());
    }
    if config.handler_threads == 0 {
        errors.push("handler_threads must be positive".to_string());
    }
    if config.handler_timeout_millis == 0 {
        errors.push("handler_timeout_millis must be positive".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::Validation(errors))
    }
}

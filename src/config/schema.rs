//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files;
//! defaults reproduce the framework's stock tuning.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Options for one server instance.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Max client connections, enforced as the listener's accept backlog.
    pub max_connections: usize,

    /// Max aggregated request size in bytes.
    pub max_packet_size: usize,

    /// Socket I/O thread budget, split 30/70 between accept and
    /// read/write pools. Default: available cores − 1. Do not set it
    /// higher than the core count.
    pub io_threads: usize,

    /// Handler worker pool bound. Raise it for blocking-heavy handlers,
    /// lower it for CPU-bound ones.
    pub handler_threads: usize,

    /// Per-request processing budget; exceeding it answers 504.
    pub handler_timeout_millis: u64,

    /// Master switch for statistics collection.
    pub stats_enabled: bool,

    /// Serve the built-in stats route at `GET /`.
    pub introspection_enabled: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_connections: 10_000,
            max_packet_size: 16 * 1024 * 1024,
            io_threads: default_io_threads(),
            handler_threads: 128,
            handler_timeout_millis: 30_000,
            stats_enabled: true,
            introspection_enabled: true,
        }
    }
}

impl ServerConfig {
    pub fn handler_timeout(&self) -> Duration {
        Duration::from_millis(self.handler_timeout_millis)
    }
}

fn default_io_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get().saturating_sub(1))
        .unwrap_or(1)
        .max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_stock_tuning() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.max_connections, 10_000);
        assert_eq!(cfg.max_packet_size, 16 * 1024 * 1024);
        assert_eq!(cfg.handler_threads, 128);
        assert_eq!(cfg.handler_timeout_millis, 30_000);
        assert!(cfg.io_threads >= 1);
        assert!(cfg.stats_enabled);
        assert!(cfg.introspection_enabled);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let cfg: ServerConfig = toml::from_str("handler_threads = 16").unwrap();
        assert_eq!(cfg.handler_threads, 16);
        assert_eq!(cfg.max_connections, 10_000);
    }
}

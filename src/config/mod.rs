//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize, semantic checks)
//!     → ServerConfig (validated, immutable)
//!     → consumed once at server construction
//! ```
//!
//! # Design Decisions
//! - Every field has a default so a minimal (or absent) config works
//! - Validation separates syntactic (serde) from semantic checks and
//!   reports all violations, not just the first

pub mod loader;
pub mod schema;

pub use loader::{load_config, ConfigError};
pub use schema::ServerConfig;

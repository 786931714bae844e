//! Domain types and pure logic shared by every conflictwatch crate.
//!
//! Holds the conflict event model, the filter predicate set, the
//! aggregation engine (stats and hotspots), application configuration and
//! seed-file loading. Nothing in here performs network I/O or holds shared
//! mutable state.

pub mod aggregate;
pub mod app_config;
pub mod config;
pub mod event;
pub mod filter;
pub mod seed;

use thiserror::Error;

pub use aggregate::{compute_stats, rank_hotspots, Hotspot, SeverityCounts, StatsSnapshot};
pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use event::{ConflictEvent, EventPatch, NaturalKey, NewConflictEvent, Severity};
pub use filter::FilterSpec;
pub use seed::{load_seed_file, parse_seed, SeedFile};

/// Errors raised while validating records or query descriptors at the boundary.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("invalid severity: {0}")]
    InvalidSeverity(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read seed file {path}: {source}")]
    SeedFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse seed file: {0}")]
    SeedFileParse(#[from] serde_yaml::Error),

    #[error("seed file validation failed: {0}")]
    Validation(String),
}

//! Error types for the analyzer

use std::path::PathBuf;
use thiserror::Error;

/// Invalid tunables, rejected at construction time rather than mid-stream
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{name} must be a finite, non-negative number (got {value})")]
    NegativeThreshold { name: &'static str, value: f64 },

    #[error("{name} must be within (0, 100] (got {value})")]
    PercentOutOfRange { name: &'static str, value: f64 },

    #[error("{name} must be greater than zero")]
    ZeroCapacity { name: &'static str },

    #[error("min_hours must be at least 2 to fit a line (got {0})")]
    TooFewHours(usize),

    #[error("invalid route rule pattern `{pattern}`: {reason}")]
    InvalidRouteRule { pattern: String, reason: String },
}

/// Errors surfaced by the analyzer outside of line parsing
#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to read log file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T, E = AnalyzerError> = std::result::Result<T, E>;

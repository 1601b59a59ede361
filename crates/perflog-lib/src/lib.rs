//! Performance log analysis engine
//!
//! This crate provides the core functionality for:
//! - Parsing semi-structured request log lines into records
//! - Normalizing request paths into endpoint templates
//! - Aggregating records by day, hour, endpoint, IP and /24 range
//! - Threshold-based anomaly detection (N+1 queries, latency, volume, traffic concentration)
//! - Linear load prediction from hourly aggregates

pub mod aggregator;
pub mod anomaly;
pub mod config;
pub mod error;
pub mod models;
pub mod normalize;
pub mod observability;
pub mod parser;
pub mod pipeline;
pub mod predictor;
pub mod source;
pub mod stats;

pub use config::AnalyzerConfig;
pub use error::{AnalyzerError, ConfigError};
pub use models::*;
pub use observability::{AnalyzerMetrics, StructuredLogger};
pub use pipeline::{Analysis, Analyzer, SourceSummary};
pub use predictor::{PredictionResult, Response};
pub use source::LogSource;

//! Anomaly detection for request logs
//!
//! Two layers of checks:
//! - Per-request ceilings evaluated while records stream through
//! - Endpoint and IP checks evaluated over a finished snapshot

mod detector;
mod report;
mod request;

pub use detector::{AnomalyDetector, EndpointSummary, RiskLevel};
pub use report::{AnomalyKind, AnomalyReport, Severity, Subject};
pub use request::check_request;

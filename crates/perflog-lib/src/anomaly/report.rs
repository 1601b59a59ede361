//! Anomaly report types

use serde::Serialize;

use crate::models::PathGroup;

/// Report severity, ordered from least to most urgent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// Nothing to report for the subject
    Success,
    Info,
    Warning,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Success => write!(f, "SUCCESS"),
            Severity::Info => write!(f, "INFO"),
            Severity::Warning => write!(f, "WARNING"),
            Severity::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Anomaly classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    /// One request issued too many SQL queries
    RequestQueries,
    /// One request read too many rows
    RequestRows,
    /// One response was too large
    RequestSize,
    /// Endpoint mean query count suggests an N+1 pattern
    NPlusOne,
    /// Endpoint mean query count is elevated
    QueryCount,
    /// Endpoint latency tail is too slow
    Latency,
    /// Endpoint returns too many rows per hit
    DataVolume,
    /// Endpoint memory peak is too high
    Memory,
    /// Endpoint passed every check
    Healthy,
    /// One IP produced a disproportionate share of traffic
    TrafficConcentration,
}

impl std::fmt::Display for AnomalyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AnomalyKind::RequestQueries => "RequestQueries",
            AnomalyKind::RequestRows => "RequestRows",
            AnomalyKind::RequestSize => "RequestSize",
            AnomalyKind::NPlusOne => "NPlusOne",
            AnomalyKind::QueryCount => "QueryCount",
            AnomalyKind::Latency => "Latency",
            AnomalyKind::DataVolume => "DataVolume",
            AnomalyKind::Memory => "Memory",
            AnomalyKind::Healthy => "Healthy",
            AnomalyKind::TrafficConcentration => "TrafficConcentration",
        };
        write!(f, "{}", name)
    }
}

/// What a report is about
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Subject {
    Endpoint { group: PathGroup },
    Ip { ip: String },
    Request { source: String, line: usize, path: String },
}

impl std::fmt::Display for Subject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Subject::Endpoint { group } => write!(f, "{}", group),
            Subject::Ip { ip } => write!(f, "IP {}", ip),
            Subject::Request { source, line, path } => write!(f, "{}:{} {}", source, line, path),
        }
    }
}

/// One finding with its measured value and a suggested remediation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnomalyReport {
    pub severity: Severity,
    pub kind: AnomalyKind,
    pub subject: Subject,
    pub title: String,
    pub detail: String,
    /// Value that triggered the report
    pub measured: f64,
    /// Threshold it was compared against (0 for healthy reports)
    pub threshold: f64,
    pub remediation: String,
}

impl AnomalyReport {
    pub fn is_healthy(&self) -> bool {
        self.severity == Severity::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Critical > Severity::Warning);
        assert!(Severity::Warning > Severity::Info);
        assert!(Severity::Info > Severity::Success);
    }

    #[test]
    fn test_display() {
        assert_eq!(Severity::Critical.to_string(), "CRITICAL");
        assert_eq!(AnomalyKind::NPlusOne.to_string(), "NPlusOne");
        let subject = Subject::Request {
            source: "web.log".to_string(),
            line: 12,
            path: "/x".to_string(),
        };
        assert_eq!(subject.to_string(), "web.log:12 /x");
    }

    #[test]
    fn test_serializes_uppercase_severity() {
        let json = serde_json::to_string(&Severity::Warning).unwrap();
        assert_eq!(json, "\"WARNING\"");
    }
}

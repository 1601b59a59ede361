//! Per-request checks
//!
//! Evaluated while records stream through, before any aggregate exists.

use super::report::{AnomalyKind, AnomalyReport, Severity, Subject};
use crate::config::DetectorConfig;
use crate::models::RequestRecord;

/// Flag a single record against the per-request ceilings
pub fn check_request(
    config: &DetectorConfig,
    record: &RequestRecord,
    source: &str,
    line: usize,
) -> Vec<AnomalyReport> {
    let mut reports = Vec::new();
    let subject = || Subject::Request {
        source: source.to_string(),
        line,
        path: record.raw_path.clone(),
    };

    let queries = record.queries() as f64;
    if queries > config.max_request_queries {
        reports.push(AnomalyReport {
            severity: Severity::Warning,
            kind: AnomalyKind::RequestQueries,
            subject: subject(),
            title: "Excessive SQL in one request".to_string(),
            detail: format!("{} queries on {}", record.queries(), record.raw_path),
            measured: queries,
            threshold: config.max_request_queries,
            remediation: "Batch related lookups with eager loading".to_string(),
        });
    }

    let rows = record.rows() as f64;
    if rows > config.max_request_rows {
        reports.push(AnomalyReport {
            severity: Severity::Warning,
            kind: AnomalyKind::RequestRows,
            subject: subject(),
            title: "High row volume in one request".to_string(),
            detail: format!("{} rows read on {}", record.rows(), record.raw_path),
            measured: rows,
            threshold: config.max_request_rows,
            remediation: "Paginate or narrow the query".to_string(),
        });
    }

    if record.size_kb() > config.max_request_size_kb {
        reports.push(AnomalyReport {
            severity: Severity::Info,
            kind: AnomalyKind::RequestSize,
            subject: subject(),
            title: "Large response".to_string(),
            detail: format!("{:.2} MB sent on {}", record.size_kb() / 1024.0, record.raw_path),
            measured: record.size_kb(),
            threshold: config.max_request_size_kb,
            remediation: "Paginate or compress the payload".to_string(),
        });
    }

    reports
}

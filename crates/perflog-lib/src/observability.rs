//! Observability for analysis runs
//!
//! Provides:
//! - Prometheus metrics (lines read, parse failures, anomalies by severity, pass latency)
//! - Structured logging with tracing

use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, Encoder, Histogram,
    IntCounter, IntCounterVec, TextEncoder,
};
use std::sync::OnceLock;
use tracing::{debug, info, warn};

use crate::anomaly::{AnomalyReport, Severity};
use crate::predictor::PredictionResult;

/// Histogram buckets for a parse pass over one source (seconds)
const PASS_LATENCY_BUCKETS: &[f64] = &[0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

static GLOBAL_METRICS: OnceLock<AnalyzerMetricsInner> = OnceLock::new();

struct AnalyzerMetricsInner {
    lines_read: IntCounter,
    records_parsed: IntCounterVec,
    malformed_lines: IntCounter,
    field_errors: IntCounter,
    estimated_timestamps: IntCounter,
    anomalies: IntCounterVec,
    pass_latency_seconds: Histogram,
}

impl AnalyzerMetricsInner {
    fn new() -> Self {
        Self {
            lines_read: register_int_counter!(
                "perflog_lines_read_total",
                "Log lines read, including blank lines"
            )
            .expect("Failed to register lines_read"),

            records_parsed: register_int_counter_vec!(
                "perflog_records_parsed_total",
                "Request records produced, by parse strategy",
                &["strategy"]
            )
            .expect("Failed to register records_parsed"),

            malformed_lines: register_int_counter!(
                "perflog_malformed_lines_total",
                "Non-blank lines that produced no record"
            )
            .expect("Failed to register malformed_lines"),

            field_errors: register_int_counter!(
                "perflog_field_errors_total",
                "Numeric fields that failed to convert"
            )
            .expect("Failed to register field_errors"),

            estimated_timestamps: register_int_counter!(
                "perflog_estimated_timestamps_total",
                "Records whose timestamp was substituted"
            )
            .expect("Failed to register estimated_timestamps"),

            anomalies: register_int_counter_vec!(
                "perflog_anomalies_total",
                "Anomaly reports emitted, by severity",
                &["severity"]
            )
            .expect("Failed to register anomalies"),

            pass_latency_seconds: register_histogram!(
                "perflog_parse_pass_seconds",
                "Time spent parsing and aggregating one log source",
                PASS_LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register pass_latency_seconds"),
        }
    }
}

/// Handle to the process-wide analyzer metrics
///
/// Clones share the same underlying metrics.
#[derive(Clone)]
pub struct AnalyzerMetrics {
    _private: (),
}

impl Default for AnalyzerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalyzerMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(AnalyzerMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &AnalyzerMetricsInner {
        GLOBAL_METRICS.get_or_init(AnalyzerMetricsInner::new)
    }

    pub fn add_lines(&self, count: u64) {
        self.inner().lines_read.inc_by(count);
    }

    pub fn add_records(&self, strategy: &str, count: u64) {
        self.inner()
            .records_parsed
            .with_label_values(&[strategy])
            .inc_by(count);
    }

    pub fn add_malformed(&self, count: u64) {
        self.inner().malformed_lines.inc_by(count);
    }

    pub fn add_field_errors(&self, count: u64) {
        self.inner().field_errors.inc_by(count);
    }

    pub fn add_estimated_timestamps(&self, count: u64) {
        self.inner().estimated_timestamps.inc_by(count);
    }

    pub fn inc_anomaly(&self, severity: Severity) {
        let label = severity.to_string();
        self.inner()
            .anomalies
            .with_label_values(&[label.as_str()])
            .inc();
    }

    pub fn observe_pass_latency(&self, duration_secs: f64) {
        self.inner().pass_latency_seconds.observe(duration_secs);
    }

    pub fn anomalies_at(&self, severity: Severity) -> u64 {
        let label = severity.to_string();
        self.inner()
            .anomalies
            .with_label_values(&[label.as_str()])
            .get()
    }

    pub fn lines_read(&self) -> u64 {
        self.inner().lines_read.get()
    }

    /// Render every registered metric in the text exposition format
    pub fn gather(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&prometheus::gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

/// Structured logger for analysis run events
#[derive(Clone)]
pub struct StructuredLogger {
    run: String,
}

impl StructuredLogger {
    pub fn new(run: impl Into<String>) -> Self {
        Self { run: run.into() }
    }

    pub fn log_run_started(&self, sources: usize, schema: &str) {
        info!(
            event = "run_started",
            run = %self.run,
            sources = sources,
            schema = %schema,
            "Log analysis started"
        );
    }

    pub fn log_source_ingested(
        &self,
        source: &str,
        lines: u64,
        records: u64,
        malformed: u64,
        elapsed_secs: f64,
    ) {
        if malformed > 0 {
            warn!(
                event = "source_ingested",
                run = %self.run,
                source = %source,
                lines = lines,
                records = records,
                malformed = malformed,
                elapsed_secs = elapsed_secs,
                "Log source ingested with malformed lines"
            );
        } else {
            info!(
                event = "source_ingested",
                run = %self.run,
                source = %source,
                lines = lines,
                records = records,
                elapsed_secs = elapsed_secs,
                "Log source ingested"
            );
        }
    }

    pub fn log_anomaly(&self, report: &AnomalyReport) {
        match report.severity {
            Severity::Critical => {
                warn!(
                    event = "anomaly_detected",
                    run = %self.run,
                    severity = %report.severity,
                    kind = %report.kind,
                    subject = %report.subject,
                    measured = report.measured,
                    threshold = report.threshold,
                    "Critical anomaly detected"
                );
            }
            Severity::Success => {
                debug!(
                    event = "endpoint_healthy",
                    run = %self.run,
                    subject = %report.subject,
                    "Endpoint passed every check"
                );
            }
            _ => {
                info!(
                    event = "anomaly_detected",
                    run = %self.run,
                    severity = %report.severity,
                    kind = %report.kind,
                    subject = %report.subject,
                    measured = report.measured,
                    threshold = report.threshold,
                    "Anomaly detected"
                );
            }
        }
    }

    pub fn log_prediction(&self, result: &PredictionResult) {
        match result {
            PredictionResult::Fitted(forecast) => {
                info!(
                    event = "prediction_generated",
                    run = %self.run,
                    response = %forecast.response,
                    target_load = forecast.target_load,
                    predicted = forecast.predicted,
                    cost_per_request = forecast.cost_per_request,
                    confidence_r2 = forecast.confidence_r2,
                    hours_used = forecast.hours_used,
                    "Generated load prediction"
                );
            }
            PredictionResult::InsufficientData {
                qualifying_hours,
                required,
            } => {
                info!(
                    event = "prediction_insufficient",
                    run = %self.run,
                    qualifying_hours = qualifying_hours,
                    required = required,
                    "Not enough hourly data for a load prediction"
                );
            }
        }
    }

    pub fn log_run_finished(&self, records: u64, reports: usize, critical: usize) {
        info!(
            event = "run_finished",
            run = %self.run,
            records = records,
            reports = reports,
            critical = critical,
            "Log analysis finished"
        );
    }
}

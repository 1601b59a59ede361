//! End-to-end analysis over one or more log sources
//!
//! The [`Analyzer`] owns every stage: lines are parsed, checked and
//! aggregated as they stream through, and endpoint, IP and load results are
//! derived once all sources are in.

use serde::Serialize;
use std::time::Instant;
use tracing::debug;

use crate::aggregator::{Aggregator, Snapshot};
use crate::anomaly::{AnomalyDetector, AnomalyReport, EndpointSummary, Severity};
use crate::config::AnalyzerConfig;
use crate::error::ConfigError;
use crate::normalize::PathNormalizer;
use crate::observability::{AnalyzerMetrics, StructuredLogger};
use crate::parser::{LineParser, ParseOutcome, ParseStats, StrictStrategy};
use crate::predictor::{LoadPredictor, PredictionResult, Response};
use crate::source::LogSource;

/// Per-source counters returned by [`Analyzer::ingest_source`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceSummary {
    pub name: String,
    pub lines: u64,
    pub records: u64,
    pub malformed: u64,
    pub request_alerts: usize,
}

/// Everything derived from one run
#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub snapshot: Snapshot,
    pub parse_stats: ParseStats,
    pub sources: Vec<SourceSummary>,
    /// Per-request findings in input order
    pub request_alerts: Vec<AnomalyReport>,
    /// Endpoint summaries ordered by egress
    pub endpoints: Vec<EndpointSummary>,
    /// IP and endpoint findings, most severe first, healthy endpoints included
    pub reports: Vec<AnomalyReport>,
    pub prediction: PredictionResult,
}

impl Analysis {
    /// Findings, optionally without the healthy-endpoint entries
    pub fn findings(&self, include_healthy: bool) -> Vec<&AnomalyReport> {
        self.reports
            .iter()
            .filter(|r| include_healthy || !r.is_healthy())
            .collect()
    }

    pub fn count_at(&self, severity: Severity) -> usize {
        self.reports.iter().filter(|r| r.severity == severity).count()
    }
}

pub struct Analyzer {
    parser: LineParser,
    aggregator: Aggregator,
    detector: AnomalyDetector,
    predictor: LoadPredictor,
    request_alerts: Vec<AnomalyReport>,
    sources: Vec<SourceSummary>,
    metrics: AnalyzerMetrics,
    logger: StructuredLogger,
}

impl Analyzer {
    /// Validate the configuration and build every stage
    pub fn new(config: AnalyzerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let normalizer = PathNormalizer::new(&config.normalizer)?;
        Ok(Self {
            parser: LineParser::new(&config.parser),
            aggregator: Aggregator::new(&config.aggregator, normalizer),
            detector: AnomalyDetector::new(config.detector)?,
            predictor: LoadPredictor::new(config.predictor)?,
            request_alerts: Vec::new(),
            sources: Vec::new(),
            metrics: AnalyzerMetrics::new(),
            logger: StructuredLogger::new("perflog"),
        })
    }

    pub fn with_logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = logger;
        self
    }

    /// Replace the parser, e.g. to pin the missing-timestamp fallback
    pub fn with_parser(mut self, parser: LineParser) -> Self {
        self.parser = parser;
        self
    }

    pub fn logger(&self) -> &StructuredLogger {
        &self.logger
    }

    pub fn detector(&self) -> &AnomalyDetector {
        &self.detector
    }

    pub fn predictor(&self) -> &LoadPredictor {
        &self.predictor
    }

    /// Parse, check and aggregate every line of `source`
    pub fn ingest_source(&mut self, source: &LogSource) -> SourceSummary {
        let started = Instant::now();
        let before = self.parser.stats().clone();
        let alerts_before = self.request_alerts.len();

        for (index, line) in source.text.lines().enumerate() {
            let ParseOutcome::Record(record) = self.parser.parse_line(line, source.tag) else {
                continue;
            };
            let alerts = self.detector.inspect_request(&record, &source.name, index + 1);
            for alert in &alerts {
                self.metrics.inc_anomaly(alert.severity);
            }
            self.request_alerts.extend(alerts);
            let group = self.aggregator.ingest(&record);
            debug!(source = %source.name, line = index + 1, group = %group, "Record aggregated");
        }

        let after = self.parser.stats();
        let strict = after.parsed_strict - before.parsed_strict;
        let lenient = after.parsed_lenient - before.parsed_lenient;
        let summary = SourceSummary {
            name: source.name.clone(),
            lines: after.lines - before.lines,
            records: strict + lenient,
            malformed: after.malformed_lines - before.malformed_lines,
            request_alerts: self.request_alerts.len() - alerts_before,
        };

        let elapsed = started.elapsed().as_secs_f64();
        self.metrics.add_lines(summary.lines);
        self.metrics.add_records(StrictStrategy::NAME, strict);
        self.metrics.add_records("lenient", lenient);
        self.metrics.add_malformed(summary.malformed);
        self.metrics
            .add_field_errors(after.field_errors - before.field_errors);
        self.metrics
            .add_estimated_timestamps(after.estimated_timestamps - before.estimated_timestamps);
        self.metrics.observe_pass_latency(elapsed);
        self.logger.log_source_ingested(
            &summary.name,
            summary.lines,
            summary.records,
            summary.malformed,
            elapsed,
        );

        self.sources.push(summary.clone());
        summary
    }

    /// Derive reports and the load prediction from everything ingested
    pub fn finish(self, target_load: u64, response: Response) -> Analysis {
        let snapshot = self.aggregator.into_snapshot();
        let endpoints = self.detector.summarize_all(&snapshot);
        let reports = self.detector.detect(&snapshot);
        for report in &reports {
            if !report.is_healthy() {
                self.metrics.inc_anomaly(report.severity);
            }
            self.logger.log_anomaly(report);
        }

        let prediction = self.predictor.predict(&snapshot, target_load, response);
        self.logger.log_prediction(&prediction);

        let critical = reports
            .iter()
            .filter(|r| r.severity == Severity::Critical)
            .count();
        self.logger
            .log_run_finished(snapshot.total_requests(), reports.len(), critical);

        Analysis {
            snapshot,
            parse_stats: self.parser.stats().clone(),
            sources: self.sources,
            request_alerts: self.request_alerts,
            endpoints,
            reports,
            prediction,
        }
    }
}

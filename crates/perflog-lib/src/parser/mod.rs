//! Log line parsing
//!
//! Two strategies share one contract:
//! - a strict pattern for the fixed pipe-delimited traffic format
//! - a lenient label scanner for every other dialect
//!
//! The strict strategy is tried first when it can match the line; the
//! lenient one takes anything carrying the `IP:` marker. A line neither
//! accepts is counted as malformed and skipped. Parsing never fails the run.

mod lenient;
mod schema;
mod strict;

pub use lenient::LenientStrategy;
pub use schema::{Field, LogSchema, SchemaName};
pub use strict::StrictStrategy;

use chrono::{Local, NaiveDateTime};
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;
use tracing::trace;

use crate::config::{ParserConfig, TimestampPolicy};
use crate::models::{RequestRecord, SourceTag, COMMAND_MARKER};

fn timestamp_re() -> &'static Regex {
    static TIMESTAMP_RE: OnceLock<Regex> = OnceLock::new();
    TIMESTAMP_RE.get_or_init(|| {
        Regex::new(r"\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}").expect("valid timestamp regex")
    })
}

fn number_re() -> &'static Regex {
    static NUMBER_RE: OnceLock<Regex> = OnceLock::new();
    NUMBER_RE.get_or_init(|| {
        Regex::new(r"-?\d+(?:[,\s]\d{3})*(?:\.\d+)?").expect("valid number regex")
    })
}

/// Find the first `YYYY-MM-DD HH:MM:SS` timestamp anywhere in the text
pub fn find_timestamp(text: &str) -> Option<NaiveDateTime> {
    let m = timestamp_re().find(text)?;
    NaiveDateTime::parse_from_str(m.as_str(), "%Y-%m-%d %H:%M:%S").ok()
}

/// Extract the first number from a field value
///
/// Thousands separators (`,` or whitespace between digit groups) are
/// tolerated, as is a leading minus sign.
pub fn extract_number(value: &str) -> Option<f64> {
    let m = number_re().find(value)?;
    let digits: String = m
        .as_str()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ',')
        .collect();
    digits.parse().ok()
}

/// Fields pulled out of a line by a strategy, before policy is applied
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extracted {
    pub timestamp: Option<NaiveDateTime>,
    pub ip: Option<String>,
    pub path: Option<String>,
    pub cpu_ms: Option<f64>,
    pub ram_peak_kb: Option<f64>,
    pub ram_delta_kb: Option<f64>,
    pub queries: Option<u64>,
    pub rows: Option<u64>,
    pub size_kb: Option<f64>,
    pub duration_sec: Option<f64>,
    pub mem_mb: Option<f64>,
    /// Labels found whose value could not be converted
    pub field_errors: u32,
}

impl Extracted {
    /// Store a numeric value for `field`, counting a failure if it does not fit
    pub fn set_number(&mut self, field: Field, value: Option<f64>) {
        let Some(value) = value.filter(|v| v.is_finite()) else {
            self.field_errors += 1;
            return;
        };
        if value < 0.0 && !field.signed() {
            self.field_errors += 1;
            return;
        }
        match field {
            Field::CpuMs => self.cpu_ms = Some(value),
            Field::RamPeakKb => self.ram_peak_kb = Some(value),
            Field::RamDeltaKb => self.ram_delta_kb = Some(value),
            Field::Queries => self.queries = Some(value.trunc() as u64),
            Field::Rows => self.rows = Some(value.trunc() as u64),
            Field::SizeKb => self.size_kb = Some(value),
            Field::DurationSec => self.duration_sec = Some(value),
            Field::MemMb => self.mem_mb = Some(value),
            Field::Ip | Field::Path => {}
        }
    }
}

/// A parsing strategy for one log dialect
pub trait LineStrategy: Send + Sync {
    /// Short name used in stats and logs
    fn name(&self) -> &'static str;

    /// Capability check: can this strategy read the line at all
    fn accepts(&self, line: &str) -> bool;

    /// Pull every recognisable field out of an accepted line
    fn extract(&self, line: &str) -> Extracted;
}

/// Why a line produced no record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// No strategy recognised the line
    Unrecognized,
    /// Structure matched but the IP or path was empty
    MissingField,
    /// No timestamp and the policy is to reject
    MissingTimestamp,
}

/// Result of parsing one line
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    Record(Box<RequestRecord>),
    Blank,
    Rejected(RejectReason),
}

/// Counters for one parse pass
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParseStats {
    pub lines: u64,
    pub blank_lines: u64,
    pub parsed_strict: u64,
    pub parsed_lenient: u64,
    /// Non-blank lines that produced no record
    pub malformed_lines: u64,
    pub missing_timestamp_rejections: u64,
    pub field_errors: u64,
    pub estimated_timestamps: u64,
}

impl ParseStats {
    pub fn records(&self) -> u64 {
        self.parsed_strict + self.parsed_lenient
    }
}

/// Turns raw lines into [`RequestRecord`]s
pub struct LineParser {
    strategies: Vec<Box<dyn LineStrategy>>,
    policy: TimestampPolicy,
    fallback_time: NaiveDateTime,
    stats: ParseStats,
}

impl LineParser {
    /// Build a parser for the configured schema and timestamp policy
    ///
    /// The strict strategy only takes part when the schema declares the
    /// traffic fields it matches.
    pub fn new(config: &ParserConfig) -> Self {
        let schema = LogSchema::from_name(config.schema);
        let mut strategies: Vec<Box<dyn LineStrategy>> = Vec::new();
        if StrictStrategy::supported_by(&schema) {
            strategies.push(Box::new(StrictStrategy::new()));
        }
        strategies.push(Box::new(LenientStrategy::new(schema)));

        Self {
            strategies,
            policy: config.timestamp_policy,
            fallback_time: Local::now().naive_local(),
            stats: ParseStats::default(),
        }
    }

    /// Pin the instant used for lines without a timestamp
    pub fn with_fallback_time(mut self, fallback_time: NaiveDateTime) -> Self {
        self.fallback_time = fallback_time;
        self
    }

    pub fn stats(&self) -> &ParseStats {
        &self.stats
    }

    /// Parse one line from a stream tagged `source`
    pub fn parse_line(&mut self, line: &str, source: SourceTag) -> ParseOutcome {
        self.stats.lines += 1;
        let line = line.trim();
        if line.is_empty() {
            self.stats.blank_lines += 1;
            return ParseOutcome::Blank;
        }

        let Some(strategy) = self.strategies.iter().find(|s| s.accepts(line)) else {
            self.stats.malformed_lines += 1;
            trace!(line = %line, "No strategy accepts line");
            return ParseOutcome::Rejected(RejectReason::Unrecognized);
        };
        let strategy_name = strategy.name();
        let extracted = strategy.extract(line);
        self.stats.field_errors += u64::from(extracted.field_errors);

        let (Some(ip), Some(path)) = (
            extracted.ip.clone().filter(|v| !v.is_empty()),
            extracted.path.clone().filter(|v| !v.is_empty()),
        ) else {
            self.stats.malformed_lines += 1;
            return ParseOutcome::Rejected(RejectReason::MissingField);
        };

        let (timestamp, estimated) = match (extracted.timestamp, self.policy) {
            (Some(ts), _) => (ts, false),
            (None, TimestampPolicy::AcceptWithNow) => (self.fallback_time, true),
            (None, TimestampPolicy::Reject) => {
                self.stats.malformed_lines += 1;
                self.stats.missing_timestamp_rejections += 1;
                return ParseOutcome::Rejected(RejectReason::MissingTimestamp);
            }
        };

        let (source, raw_path) = match path.strip_prefix(COMMAND_MARKER) {
            Some(command) => (SourceTag::Cmd, command.trim().to_string()),
            None => (source, path),
        };

        let mut record = RequestRecord::new(timestamp, source, ip, raw_path);
        record.timestamp_estimated = estimated;
        record.cpu_ms = extracted.cpu_ms;
        record.ram_peak_kb = extracted.ram_peak_kb;
        record.ram_delta_kb = extracted.ram_delta_kb;
        record.queries = extracted.queries;
        record.rows = extracted.rows;
        record.size_kb = extracted.size_kb;
        record.duration_sec = extracted.duration_sec;
        record.mem_mb = extracted.mem_mb;

        if estimated {
            self.stats.estimated_timestamps += 1;
        }
        match strategy_name {
            StrictStrategy::NAME => self.stats.parsed_strict += 1,
            _ => self.stats.parsed_lenient += 1,
        }
        ParseOutcome::Record(Box::new(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn fallback() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 1, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn parser() -> LineParser {
        LineParser::new(&ParserConfig::default()).with_fallback_time(fallback())
    }

    fn record(outcome: ParseOutcome) -> RequestRecord {
        match outcome {
            ParseOutcome::Record(r) => *r,
            other => panic!("expected record, got {:?}", other),
        }
    }

    #[test]
    fn test_extract_number_variants() {
        assert_eq!(extract_number(" 12.5ms"), Some(12.5));
        assert_eq!(extract_number("-340KB"), Some(-340.0));
        assert_eq!(extract_number("1,234 rows"), Some(1234.0));
        assert_eq!(extract_number("1 234.5 KB"), Some(1234.5));
        assert_eq!(extract_number("n/a"), None);
    }

    #[test]
    fn test_find_timestamp_anywhere() {
        let ts = find_timestamp("INFO:root:2025-03-04 05:06:07 IP: 1.1.1.1").unwrap();
        assert_eq!(ts.to_string(), "2025-03-04 05:06:07");
        assert!(find_timestamp("2025-13-40 99:00:00").is_none());
    }

    #[test]
    fn test_strict_line() {
        let mut p = parser();
        let r = record(p.parse_line(
            "INFO 2025-12-29 04:15:05,696 middleware IP: 10.0.0.7 | Path: /details/42/slug | Queries: 12 | Rows: 30 | Est. Size: 4.5 KB",
            SourceTag::Web,
        ));
        assert_eq!(r.ip, "10.0.0.7");
        assert_eq!(r.raw_path, "/details/42/slug");
        assert_eq!(r.queries, Some(12));
        assert_eq!(r.rows, Some(30));
        assert_eq!(r.size_kb, Some(4.5));
        assert_eq!(r.duration_sec, None);
        assert!(!r.timestamp_estimated);
        assert_eq!(p.stats().parsed_strict, 1);
    }

    #[test]
    fn test_traffic_line_with_extra_fields_keeps_them() {
        let mut p = parser();
        let r = record(p.parse_line(
            "INFO 2025-12-29 04:15:05,696 middleware IP: 10.0.0.7 | Path: /report | Queries: 3 | Rows: 10 | Est. Size: 1.5 KB | Mem: 200 MB | Duration: 9.5s",
            SourceTag::Web,
        ));
        assert_eq!(r.duration_sec, Some(9.5));
        assert_eq!(r.mem_mb, Some(200.0));
        assert_eq!(r.size_kb, Some(1.5));
        assert!(!r.timestamp_estimated);

        let r = record(p.parse_line(
            "INFO 2025-12-29 04:15:05,696 middleware IP: 10.0.0.7 | Path: /report | Queries: 3 | Rows: 10 | Est. Size: 1.5 KB | CPU: 900ms",
            SourceTag::Web,
        ));
        assert_eq!(r.cpu_ms, Some(900.0));
        assert_eq!(r.queries, Some(3));
        assert_eq!(p.stats().parsed_lenient, 2);
        assert_eq!(p.stats().parsed_strict, 0);
    }

    #[test]
    fn test_lenient_line_with_negative_delta() {
        let mut p = parser();
        let r = record(p.parse_line(
            "INFO:root:IP: 192.168.1.5 | Path: /api/items | CPU: 15.2ms | RAM Δ: -120KB | RAM Peak: 2048KB | DB Q: 7 | Rows: 3",
            SourceTag::Web,
        ));
        assert_eq!(r.cpu_ms, Some(15.2));
        assert_eq!(r.ram_delta_kb, Some(-120.0));
        assert_eq!(r.ram_peak_kb, Some(2048.0));
        assert_eq!(r.queries, Some(7));
        assert_eq!(r.rows, Some(3));
        assert!(r.timestamp_estimated);
        assert_eq!(r.timestamp, fallback());
        assert_eq!(p.stats().parsed_lenient, 1);
        assert_eq!(p.stats().estimated_timestamps, 1);
    }

    #[test]
    fn test_line_without_numbers_still_parses() {
        let mut p = parser();
        let r = record(p.parse_line("IP: 1.2.3.4 | Path: /health", SourceTag::Web));
        assert_eq!(r.queries(), 0);
        assert_eq!(r.size_kb(), 0.0);
    }

    #[test]
    fn test_bad_field_leaves_rest_intact() {
        let mut p = parser();
        let r = record(p.parse_line(
            "2025-01-01 10:00:00 IP: 1.2.3.4 | Path: /x | Queries: many | Rows: 9",
            SourceTag::Web,
        ));
        assert_eq!(r.queries, None);
        assert_eq!(r.rows, Some(9));
        assert_eq!(p.stats().field_errors, 1);
        assert_eq!(p.stats().malformed_lines, 0);
    }

    #[test]
    fn test_malformed_and_blank_lines() {
        let mut p = parser();
        assert_eq!(p.parse_line("   ", SourceTag::Web), ParseOutcome::Blank);
        assert_eq!(
            p.parse_line("Traceback (most recent call last):", SourceTag::Web),
            ParseOutcome::Rejected(RejectReason::Unrecognized)
        );
        assert_eq!(
            p.parse_line("IP: 1.2.3.4 | Queries: 3", SourceTag::Web),
            ParseOutcome::Rejected(RejectReason::MissingField)
        );
        assert_eq!(p.stats().blank_lines, 1);
        assert_eq!(p.stats().malformed_lines, 2);
        assert_eq!(p.stats().lines, 3);
    }

    #[test]
    fn test_reject_policy_drops_undated_lines() {
        let config = ParserConfig {
            timestamp_policy: TimestampPolicy::Reject,
            ..Default::default()
        };
        let mut p = LineParser::new(&config);
        assert_eq!(
            p.parse_line("IP: 1.2.3.4 | Path: /x", SourceTag::Web),
            ParseOutcome::Rejected(RejectReason::MissingTimestamp)
        );
        assert_eq!(p.stats().missing_timestamp_rejections, 1);
    }

    #[test]
    fn test_command_marker_sets_source() {
        let mut p = parser();
        let r = record(p.parse_line(
            "2025-01-01 03:00:00 IP: 127.0.0.1 | Path: CMD::rebuild_index | Queries: 400 | Duration: 12.5s | Mem: 80 MB",
            SourceTag::Web,
        ));
        assert_eq!(r.source, SourceTag::Cmd);
        assert_eq!(r.raw_path, "rebuild_index");
        assert_eq!(r.duration_sec, Some(12.5));
        assert_eq!(r.mem_mb, Some(80.0));
    }

    #[test]
    fn test_round_trip_through_log_line() {
        let mut p = parser();
        let mut original = RequestRecord::new(
            NaiveDate::from_ymd_opt(2025, 6, 7)
                .unwrap()
                .and_hms_opt(8, 9, 10)
                .unwrap(),
            SourceTag::Cmd,
            "10.1.2.3",
            "nightly_report",
        );
        original.cpu_ms = Some(33.25);
        original.ram_delta_kb = Some(-12.5);
        original.ram_peak_kb = Some(4096.0);
        original.queries = Some(18);
        original.rows = Some(250);
        original.size_kb = Some(7.75);
        original.duration_sec = Some(1.5);
        original.mem_mb = Some(64.0);

        let reparsed = record(p.parse_line(&original.to_log_line(), SourceTag::Web));
        assert_eq!(reparsed, original);
    }

    #[test]
    fn test_telemetry_schema_skips_strict_strategy() {
        let config = ParserConfig {
            schema: SchemaName::Telemetry,
            ..Default::default()
        };
        let mut p = LineParser::new(&config).with_fallback_time(fallback());
        let r = record(p.parse_line(
            "INFO 2025-12-29 04:15:05,696 middleware IP: 10.0.0.7 | Path: /a | Queries: 2 | Rows: 3 | Est. Size: 4.5 KB",
            SourceTag::Web,
        ));
        assert_eq!(r.queries, Some(2));
        assert_eq!(r.size_kb, None);
        assert_eq!(p.stats().parsed_lenient, 1);
    }
}

//! Strict parser for the fixed pipe-delimited traffic format
//!
//! Matches lines such as:
//! `INFO 2025-12-29 04:15:05,696 middleware IP: 1.2.3.4 | Path: /x | Queries: 3 | Rows: 10 | Est. Size: 1.5 KB | Duration: 0.2s | Mem: 40 MB`
//! where the trailing duration and memory fields are optional. Lines with
//! any other tail are left to the lenient scanner.

use chrono::{NaiveDate, NaiveTime};
use regex::{Captures, Regex};
use std::sync::OnceLock;

use super::schema::{Field, LogSchema};
use super::{Extracted, LineStrategy};

fn traffic_line_re() -> &'static Regex {
    static TRAFFIC_LINE_RE: OnceLock<Regex> = OnceLock::new();
    TRAFFIC_LINE_RE.get_or_init(|| {
        Regex::new(concat!(
            r"^INFO\s+(?P<date>\d{4}-\d{2}-\d{2})\s+(?P<time>\d{2}:\d{2}:\d{2})(?:,\d+)?.*?",
            r"IP:\s+(?P<ip>[\d\.]+)\s+\|\s+",
            r"Path:\s+(?P<path>.*?)\s+\|\s+",
            r"Queries:\s+(?P<queries>\d+)\s+\|\s+",
            r"Rows:\s+(?P<rows>\d+)\s+\|\s+",
            r"Est\. Size:\s+(?P<size>[\d\.]+)\s+KB",
            r"(?:\s+\|\s+Duration:\s+(?P<duration>[\d\.]+)\s*s)?",
            r"(?:\s+\|\s+Mem:\s+(?P<mem>[\d\.]+)\s*MB)?",
            r"\s*$",
        ))
        .expect("valid traffic line regex")
    })
}

/// Schema-validating strategy for the traffic log dialect
#[derive(Debug, Default)]
pub struct StrictStrategy;

impl StrictStrategy {
    pub const NAME: &'static str = "strict";

    pub fn new() -> Self {
        Self
    }

    /// The strict pattern only makes sense for schemas with the traffic fields
    pub fn supported_by(schema: &LogSchema) -> bool {
        [Field::Queries, Field::Rows, Field::SizeKb]
            .into_iter()
            .all(|f| schema.recognises(f))
    }
}

fn number(caps: &Captures<'_>, name: &str) -> Option<Option<f64>> {
    caps.name(name).map(|m| m.as_str().parse::<f64>().ok())
}

impl LineStrategy for StrictStrategy {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn accepts(&self, line: &str) -> bool {
        traffic_line_re().is_match(line)
    }

    fn extract(&self, line: &str) -> Extracted {
        let mut out = Extracted::default();
        let Some(caps) = traffic_line_re().captures(line) else {
            return out;
        };

        let date = NaiveDate::parse_from_str(&caps["date"], "%Y-%m-%d").ok();
        let time = NaiveTime::parse_from_str(&caps["time"], "%H:%M:%S").ok();
        out.timestamp = date.zip(time).map(|(d, t)| d.and_time(t));
        out.ip = Some(caps["ip"].to_string());
        out.path = Some(caps["path"].trim().to_string());

        for (field, name) in [
            (Field::Queries, "queries"),
            (Field::Rows, "rows"),
            (Field::SizeKb, "size"),
            (Field::DurationSec, "duration"),
            (Field::MemMb, "mem"),
        ] {
            if let Some(value) = number(&caps, name) {
                out.set_number(field, value);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = "INFO 2025-12-29 04:15:05,696 middleware IP: 1.2.3.4 | Path: CMD::sync | Queries: 3 | Rows: 10 | Est. Size: 1.5 KB | Duration: 0.25s | Mem: 40.5 MB";

    #[test]
    fn test_full_line_with_optional_fields() {
        let strategy = StrictStrategy::new();
        assert!(strategy.accepts(FULL));
        let out = strategy.extract(FULL);
        assert_eq!(out.timestamp.unwrap().to_string(), "2025-12-29 04:15:05");
        assert_eq!(out.path.as_deref(), Some("CMD::sync"));
        assert_eq!(out.queries, Some(3));
        assert_eq!(out.duration_sec, Some(0.25));
        assert_eq!(out.mem_mb, Some(40.5));
        assert_eq!(out.field_errors, 0);
    }

    #[test]
    fn test_rejects_other_dialects() {
        let strategy = StrictStrategy::new();
        assert!(!strategy.accepts("IP: 1.2.3.4 | Path: /x | CPU: 3ms"));
        assert!(!strategy.accepts("INFO 2025-12-29 04:15:05 middleware IP: 1.2.3.4 | Path: /x"));
    }

    #[test]
    fn test_nonconforming_tail_not_accepted() {
        let strategy = StrictStrategy::new();
        let reordered = "INFO 2025-12-29 04:15:05,696 middleware IP: 1.2.3.4 | Path: /x | Queries: 3 | Rows: 10 | Est. Size: 1.5 KB | Mem: 200 MB | Duration: 9.5s";
        let extra = "INFO 2025-12-29 04:15:05,696 middleware IP: 1.2.3.4 | Path: /x | Queries: 3 | Rows: 10 | Est. Size: 1.5 KB | CPU: 900ms";
        assert!(!strategy.accepts(reordered));
        assert!(!strategy.accepts(extra));
        assert!(strategy.accepts(&format!("{}  ", FULL)));
    }

    #[test]
    fn test_malformed_size_counts_field_error() {
        let line = "INFO 2025-12-29 04:15:05 middleware IP: 1.2.3.4 | Path: /x | Queries: 3 | Rows: 10 | Est. Size: 1.2.3 KB";
        let out = StrictStrategy::new().extract(line);
        assert_eq!(out.size_kb, None);
        assert_eq!(out.rows, Some(10));
        assert_eq!(out.field_errors, 1);
    }

    #[test]
    fn test_support_depends_on_schema() {
        assert!(StrictStrategy::supported_by(&LogSchema::traffic()));
        assert!(StrictStrategy::supported_by(&LogSchema::unified()));
        assert!(!StrictStrategy::supported_by(&LogSchema::telemetry()));
    }
}

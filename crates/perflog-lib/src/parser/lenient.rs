//! Lenient label scanner
//!
//! Splits the line on `|` and, per segment, looks for a label declared by
//! the schema. Values are pulled out permissively, so partial or slightly
//! reformatted lines still yield whatever fields they carry.

use super::schema::{Field, LogSchema};
use super::{extract_number, find_timestamp, Extracted, LineStrategy};

/// Marker every middleware line carries
const REQUIRED_MARKER: &str = "IP:";

pub struct LenientStrategy {
    schema: LogSchema,
}

impl LenientStrategy {
    pub const NAME: &'static str = "lenient";

    pub fn new(schema: LogSchema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &LogSchema {
        &self.schema
    }
}

impl LineStrategy for LenientStrategy {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn accepts(&self, line: &str) -> bool {
        line.contains(REQUIRED_MARKER)
    }

    fn extract(&self, line: &str) -> Extracted {
        let mut out = Extracted {
            timestamp: find_timestamp(line),
            ..Default::default()
        };

        for segment in line.split('|') {
            let Some((field, value)) = self.schema.match_segment(segment) else {
                continue;
            };
            match field {
                Field::Ip => {
                    out.ip = value.split_whitespace().next().map(str::to_string);
                }
                Field::Path => {
                    let path = value.trim();
                    if !path.is_empty() {
                        out.path = Some(path.to_string());
                    }
                }
                numeric => out.set_number(numeric, extract_number(value)),
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_labelled_fields() {
        let strategy = LenientStrategy::new(LogSchema::unified());
        let out = strategy.extract(
            "2025-02-03 04:05:06 INFO:root:IP: 8.8.8.8 | Path: /search?q=x | CPU: 4ms | Queries: 1,200 | Est. Size: 2 KB",
        );
        assert_eq!(out.ip.as_deref(), Some("8.8.8.8"));
        assert_eq!(out.path.as_deref(), Some("/search?q=x"));
        assert_eq!(out.cpu_ms, Some(4.0));
        assert_eq!(out.queries, Some(1200));
        assert_eq!(out.size_kb, Some(2.0));
        assert!(out.timestamp.is_some());
    }

    #[test]
    fn test_requires_ip_marker() {
        let strategy = LenientStrategy::new(LogSchema::unified());
        assert!(!strategy.accepts("Path: /x | Queries: 3"));
        assert!(strategy.accepts("IP: 1.1.1.1"));
    }

    #[test]
    fn test_negative_count_is_a_field_error() {
        let strategy = LenientStrategy::new(LogSchema::unified());
        let out = strategy.extract("IP: 1.1.1.1 | Path: /x | Rows: -4 | RAM Δ: -4KB");
        assert_eq!(out.rows, None);
        assert_eq!(out.ram_delta_kb, Some(-4.0));
        assert_eq!(out.field_errors, 1);
    }

    #[test]
    fn test_empty_path_left_absent() {
        let strategy = LenientStrategy::new(LogSchema::unified());
        let out = strategy.extract("IP: 1.1.1.1 | Path:   | Rows: 4");
        assert_eq!(out.path, None);
        assert_eq!(out.rows, Some(4));
    }
}

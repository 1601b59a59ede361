//! Log format schemas
//!
//! A schema is the set of field labels a log format version emits. The
//! middleware changed its labels over time, so the lenient scanner is driven
//! by a declared schema instead of one hard-coded label list per format.

use serde::{Deserialize, Serialize};

/// A field the parser knows how to extract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Ip,
    Path,
    CpuMs,
    RamDeltaKb,
    RamPeakKb,
    Queries,
    Rows,
    SizeKb,
    DurationSec,
    MemMb,
}

impl Field {
    /// Whether the value may legitimately be negative
    pub fn signed(self) -> bool {
        matches!(self, Field::RamDeltaKb)
    }
}

/// Named built-in schema, selectable from configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaName {
    /// Database traffic log: queries, rows, egress, optional duration/memory
    Traffic,
    /// Resource telemetry log: CPU time, RAM peak/delta, query and row counts
    Telemetry,
    /// Union of every known label
    #[default]
    Unified,
}

impl std::fmt::Display for SchemaName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchemaName::Traffic => write!(f, "traffic"),
            SchemaName::Telemetry => write!(f, "telemetry"),
            SchemaName::Unified => write!(f, "unified"),
        }
    }
}

const IP_LABELS: &[&str] = &["IP:"];
const PATH_LABELS: &[&str] = &["Path:"];
const CPU_LABELS: &[&str] = &["CPU:"];
const RAM_DELTA_LABELS: &[&str] = &["RAM Δ:", "RAM Delta:"];
const RAM_PEAK_LABELS: &[&str] = &["RAM Peak:"];
const QUERY_LABELS: &[&str] = &["Queries:", "DB Q:"];
const ROW_LABELS: &[&str] = &["Rows:"];
const SIZE_LABELS: &[&str] = &["Est. Size:"];
const DURATION_LABELS: &[&str] = &["Duration:"];
const MEM_LABELS: &[&str] = &["Mem:"];

/// Versioned set of recognised field labels
#[derive(Debug, Clone)]
pub struct LogSchema {
    pub name: SchemaName,
    pub version: u32,
    labels: Vec<(Field, &'static [&'static str])>,
}

impl LogSchema {
    pub fn traffic() -> Self {
        Self {
            name: SchemaName::Traffic,
            version: 15,
            labels: vec![
                (Field::Ip, IP_LABELS),
                (Field::Path, PATH_LABELS),
                (Field::Queries, &QUERY_LABELS[..1]),
                (Field::Rows, ROW_LABELS),
                (Field::SizeKb, SIZE_LABELS),
                (Field::DurationSec, DURATION_LABELS),
                (Field::MemMb, MEM_LABELS),
            ],
        }
    }

    pub fn telemetry() -> Self {
        Self {
            name: SchemaName::Telemetry,
            version: 1,
            labels: vec![
                (Field::Ip, IP_LABELS),
                (Field::Path, PATH_LABELS),
                (Field::CpuMs, CPU_LABELS),
                (Field::RamDeltaKb, RAM_DELTA_LABELS),
                (Field::RamPeakKb, RAM_PEAK_LABELS),
                (Field::Queries, QUERY_LABELS),
                (Field::Rows, ROW_LABELS),
            ],
        }
    }

    pub fn unified() -> Self {
        Self {
            name: SchemaName::Unified,
            version: 16,
            labels: vec![
                (Field::Ip, IP_LABELS),
                (Field::Path, PATH_LABELS),
                (Field::CpuMs, CPU_LABELS),
                (Field::RamDeltaKb, RAM_DELTA_LABELS),
                (Field::RamPeakKb, RAM_PEAK_LABELS),
                (Field::Queries, QUERY_LABELS),
                (Field::Rows, ROW_LABELS),
                (Field::SizeKb, SIZE_LABELS),
                (Field::DurationSec, DURATION_LABELS),
                (Field::MemMb, MEM_LABELS),
            ],
        }
    }

    pub fn from_name(name: SchemaName) -> Self {
        match name {
            SchemaName::Traffic => Self::traffic(),
            SchemaName::Telemetry => Self::telemetry(),
            SchemaName::Unified => Self::unified(),
        }
    }

    /// Whether this schema declares the field at all
    pub fn recognises(&self, field: Field) -> bool {
        self.labels.iter().any(|(f, _)| *f == field)
    }

    /// Find the first declared field whose label occurs in `segment`
    ///
    /// Returns the field and the text following its label.
    pub fn match_segment<'a>(&self, segment: &'a str) -> Option<(Field, &'a str)> {
        for (field, labels) in &self.labels {
            for label in labels.iter() {
                if let Some(pos) = segment.find(label) {
                    return Some((*field, &segment[pos + label.len()..]));
                }
            }
        }
        None
    }
}

impl Default for LogSchema {
    fn default() -> Self {
        Self::unified()
    }
}

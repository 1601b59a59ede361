//! Core data models for the log analyzer

use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

/// Marker a background task runner puts in front of a command name
pub const COMMAND_MARKER: &str = "CMD::";

/// Origin log stream of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SourceTag {
    /// HTTP middleware traffic
    Web,
    /// Background command runner
    Cmd,
}

impl std::fmt::Display for SourceTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceTag::Web => write!(f, "WEB"),
            SourceTag::Cmd => write!(f, "CMD"),
        }
    }
}

/// One parsed log line
///
/// Numeric fields are independently optional. The accessors return the
/// neutral value (0) for absent fields so aggregation never has to care.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestRecord {
    pub timestamp: NaiveDateTime,
    /// True when the line carried no timestamp and the parser substituted one
    pub timestamp_estimated: bool,
    pub source: SourceTag,
    pub ip: String,
    pub raw_path: String,
    pub cpu_ms: Option<f64>,
    pub ram_peak_kb: Option<f64>,
    pub ram_delta_kb: Option<f64>,
    pub queries: Option<u64>,
    pub rows: Option<u64>,
    pub size_kb: Option<f64>,
    pub duration_sec: Option<f64>,
    pub mem_mb: Option<f64>,
}

impl RequestRecord {
    /// Create a record with every numeric field absent
    pub fn new(
        timestamp: NaiveDateTime,
        source: SourceTag,
        ip: impl Into<String>,
        raw_path: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            timestamp_estimated: false,
            source,
            ip: ip.into(),
            raw_path: raw_path.into(),
            cpu_ms: None,
            ram_peak_kb: None,
            ram_delta_kb: None,
            queries: None,
            rows: None,
            size_kb: None,
            duration_sec: None,
            mem_mb: None,
        }
    }

    pub fn queries(&self) -> u64 {
        self.queries.unwrap_or(0)
    }

    pub fn rows(&self) -> u64 {
        self.rows.unwrap_or(0)
    }

    pub fn size_kb(&self) -> f64 {
        self.size_kb.unwrap_or(0.0)
    }

    pub fn cpu_ms(&self) -> f64 {
        self.cpu_ms.unwrap_or(0.0)
    }

    pub fn duration_sec(&self) -> f64 {
        self.duration_sec.unwrap_or(0.0)
    }

    pub fn mem_mb(&self) -> f64 {
        self.mem_mb.unwrap_or(0.0)
    }

    pub fn ram_peak_kb(&self) -> f64 {
        self.ram_peak_kb.unwrap_or(0.0)
    }

    /// Hour of day (0-23) of the declared timestamp
    pub fn hour(&self) -> u32 {
        self.timestamp.hour()
    }

    /// Re-serialize the known fields in the pipe-delimited labelled dialect
    ///
    /// The output is accepted by the lenient parser and yields the same
    /// field values. Absent fields are omitted.
    pub fn to_log_line(&self) -> String {
        let path = match self.source {
            SourceTag::Cmd => format!("{}{}", COMMAND_MARKER, self.raw_path),
            SourceTag::Web => self.raw_path.clone(),
        };
        let mut fields = vec![
            format!("{} middleware IP: {}", self.timestamp.format("%Y-%m-%d %H:%M:%S"), self.ip),
            format!("Path: {}", path),
        ];
        if let Some(v) = self.cpu_ms {
            fields.push(format!("CPU: {}ms", v));
        }
        if let Some(v) = self.ram_delta_kb {
            fields.push(format!("RAM Δ: {}KB", v));
        }
        if let Some(v) = self.ram_peak_kb {
            fields.push(format!("RAM Peak: {}KB", v));
        }
        if let Some(v) = self.queries {
            fields.push(format!("Queries: {}", v));
        }
        if let Some(v) = self.rows {
            fields.push(format!("Rows: {}", v));
        }
        if let Some(v) = self.size_kb {
            fields.push(format!("Est. Size: {} KB", v));
        }
        if let Some(v) = self.duration_sec {
            fields.push(format!("Duration: {}s", v));
        }
        if let Some(v) = self.mem_mb {
            fields.push(format!("Mem: {} MB", v));
        }
        fields.join(" | ")
    }
}

/// Kind of endpoint grouping key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathKind {
    /// HTTP route template with identifiers collapsed
    Route,
    /// Literal background command name
    Command,
    /// Well-known probe mapped to a fixed label
    Sentinel,
}

/// Normalized request path used as the endpoint aggregation key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PathGroup {
    pub kind: PathKind,
    pub template: String,
}

impl PathGroup {
    pub fn route(template: impl Into<String>) -> Self {
        Self {
            kind: PathKind::Route,
            template: template.into(),
        }
    }

    pub fn command(name: impl Into<String>) -> Self {
        Self {
            kind: PathKind::Command,
            template: name.into(),
        }
    }

    pub fn sentinel(label: impl Into<String>) -> Self {
        Self {
            kind: PathKind::Sentinel,
            template: label.into(),
        }
    }
}

impl std::fmt::Display for PathGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            PathKind::Command => write!(f, "{}{}", COMMAND_MARKER, self.template),
            _ => write!(f, "{}", self.template),
        }
    }
}

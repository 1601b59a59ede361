//! Accumulators for one grouping key

use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::models::{PathGroup, RequestRecord, SourceTag};

/// Additive statistics shared by every grouping dimension
///
/// All updates are sums, maxima or set insertions, so the final state does
/// not depend on ingestion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregateBucket {
    pub requests: u64,
    pub queries: u64,
    pub rows: u64,
    pub max_rows: u64,
    pub egress_kb: f64,
    pub cpu_ms: f64,
    pub duration_sec: f64,
    pub peak_mem_mb: f64,
    pub peak_ram_kb: f64,
    pub ips: BTreeSet<String>,
}

impl AggregateBucket {
    pub fn record(&mut self, record: &RequestRecord) {
        // Counts saturate: one absurd value must not abort the pass
        self.requests = self.requests.saturating_add(1);
        self.queries = self.queries.saturating_add(record.queries());
        self.rows = self.rows.saturating_add(record.rows());
        self.max_rows = self.max_rows.max(record.rows());
        self.egress_kb += record.size_kb();
        self.cpu_ms += record.cpu_ms();
        self.duration_sec += record.duration_sec();
        self.peak_mem_mb = self.peak_mem_mb.max(record.mem_mb());
        self.peak_ram_kb = self.peak_ram_kb.max(record.ram_peak_kb());
        if !self.ips.contains(&record.ip) {
            self.ips.insert(record.ip.clone());
        }
    }

    pub fn unique_ips(&self) -> usize {
        self.ips.len()
    }

    pub fn egress_mb(&self) -> f64 {
        self.egress_kb / 1024.0
    }

    pub fn mean_queries(&self) -> f64 {
        per_request(self.queries as f64, self.requests)
    }

    pub fn mean_rows(&self) -> f64 {
        per_request(self.rows as f64, self.requests)
    }
}

fn per_request(total: f64, requests: u64) -> f64 {
    if requests == 0 {
        return 0.0;
    }
    total / requests as f64
}

/// Capped sample lists for one endpoint
///
/// Once a list reaches the cap further samples are dropped; earlier samples
/// are never evicted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleSet {
    #[serde(skip)]
    cap: usize,
    pub queries: Vec<f64>,
    pub rows: Vec<f64>,
    pub size_kb: Vec<f64>,
    pub duration_sec: Vec<f64>,
    pub mem_mb: Vec<f64>,
    pub dropped: u64,
}

impl SampleSet {
    pub fn new(cap: usize) -> Self {
        Self {
            cap,
            queries: Vec::new(),
            rows: Vec::new(),
            size_kb: Vec::new(),
            duration_sec: Vec::new(),
            mem_mb: Vec::new(),
            dropped: 0,
        }
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn record(&mut self, record: &RequestRecord) {
        if self.queries.len() >= self.cap {
            self.dropped += 1;
            return;
        }
        self.queries.push(record.queries() as f64);
        self.rows.push(record.rows() as f64);
        self.size_kb.push(record.size_kb());
        // Duration and memory are only logged by some handlers; absent
        // values would drag the latency tail towards zero.
        if let Some(d) = record.duration_sec.filter(|d| *d > 0.0) {
            self.duration_sec.push(d);
        }
        if let Some(m) = record.mem_mb.filter(|m| *m > 0.0) {
            self.mem_mb.push(m);
        }
    }
}

/// One day of an endpoint's history
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EndpointDay {
    pub hits: u64,
    pub queries: u64,
    pub duration_sec: f64,
    pub peak_mem_mb: f64,
}

impl EndpointDay {
    pub fn mean_queries(&self) -> f64 {
        per_request(self.queries as f64, self.hits)
    }
}

/// Statistics for one normalized endpoint
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EndpointStats {
    pub group: PathGroup,
    /// Stream of the most recent record seen for this endpoint
    pub source: SourceTag,
    pub totals: AggregateBucket,
    pub samples: SampleSet,
    pub history: BTreeMap<NaiveDate, EndpointDay>,
}

impl EndpointStats {
    pub fn new(group: PathGroup, source: SourceTag, sample_cap: usize) -> Self {
        Self {
            group,
            source,
            totals: AggregateBucket::default(),
            samples: SampleSet::new(sample_cap),
            history: BTreeMap::new(),
        }
    }

    pub fn record(&mut self, record: &RequestRecord) {
        self.source = record.source;
        self.totals.record(record);
        self.samples.record(record);

        let day = self.history.entry(record.timestamp.date()).or_default();
        day.hits = day.hits.saturating_add(1);
        day.queries = day.queries.saturating_add(record.queries());
        day.duration_sec += record.duration_sec();
        day.peak_mem_mb = day.peak_mem_mb.max(record.mem_mb());
    }

    pub fn hits(&self) -> u64 {
        self.totals.requests
    }
}

/// Lightweight event row kept for per-hour drill-down
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlyEvent {
    pub time: NaiveTime,
    pub ip: String,
    pub path: String,
    pub queries: u64,
    pub duration_sec: f64,
    pub mem_mb: f64,
    pub source: SourceTag,
}

impl From<&RequestRecord> for HourlyEvent {
    fn from(record: &RequestRecord) -> Self {
        Self {
            time: record.timestamp.time(),
            ip: record.ip.clone(),
            path: record.raw_path.clone(),
            queries: record.queries(),
            duration_sec: record.duration_sec(),
            mem_mb: record.mem_mb(),
            source: record.source,
        }
    }
}

/// Statistics for one (date, hour) slot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlyBucket {
    pub date: NaiveDate,
    pub hour: u32,
    pub totals: AggregateBucket,
    pub events: Vec<HourlyEvent>,
    pub dropped_events: u64,
}

impl HourlyBucket {
    pub fn new(date: NaiveDate, hour: u32) -> Self {
        Self {
            date,
            hour,
            totals: AggregateBucket::default(),
            events: Vec::new(),
            dropped_events: 0,
        }
    }

    pub fn record(&mut self, record: &RequestRecord, event_cap: usize) {
        self.totals.record(record);
        if self.events.len() < event_cap {
            self.events.push(HourlyEvent::from(record));
        } else {
            self.dropped_events += 1;
        }
    }
}

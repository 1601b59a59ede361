//! Multi-dimensional rolling statistics
//!
//! The aggregator keeps one bucket per key in each grouping dimension:
//! global, calendar day, (day, hour), endpoint, source IP and /24 range.
//! Buckets are created explicitly on the first record mapping to a key.

mod bucket;
mod snapshot;

#[cfg(test)]
mod tests;

pub use bucket::{
    AggregateBucket, EndpointDay, EndpointStats, HourlyBucket, HourlyEvent, SampleSet,
};
pub use snapshot::{PeakHour, Snapshot};

use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::net::Ipv4Addr;

use crate::config::AggregatorConfig;
use crate::models::{PathGroup, RequestRecord};
use crate::normalize::PathNormalizer;

/// Coarse network key: `a.b.c.0/24` for IPv4, the literal otherwise
pub fn ip_range(ip: &str) -> String {
    match ip.parse::<Ipv4Addr>() {
        Ok(addr) => {
            let [a, b, c, _] = addr.octets();
            format!("{}.{}.{}.0/24", a, b, c)
        }
        Err(_) => ip.to_string(),
    }
}

/// Stateful accumulator fed one record at a time
pub struct Aggregator {
    normalizer: PathNormalizer,
    sample_cap: usize,
    hourly_event_cap: usize,
    global: AggregateBucket,
    estimated_timestamps: u64,
    daily: BTreeMap<NaiveDate, AggregateBucket>,
    hourly: BTreeMap<(NaiveDate, u32), HourlyBucket>,
    endpoints: BTreeMap<PathGroup, EndpointStats>,
    ips: BTreeMap<String, AggregateBucket>,
    ip_ranges: BTreeMap<String, AggregateBucket>,
}

impl Aggregator {
    pub fn new(config: &AggregatorConfig, normalizer: PathNormalizer) -> Self {
        Self {
            normalizer,
            sample_cap: config.sample_cap,
            hourly_event_cap: config.hourly_event_cap,
            global: AggregateBucket::default(),
            estimated_timestamps: 0,
            daily: BTreeMap::new(),
            hourly: BTreeMap::new(),
            endpoints: BTreeMap::new(),
            ips: BTreeMap::new(),
            ip_ranges: BTreeMap::new(),
        }
    }

    /// Fold one record into every dimension
    ///
    /// Returns the endpoint group the record was counted under.
    pub fn ingest(&mut self, record: &RequestRecord) -> PathGroup {
        self.global.record(record);
        if record.timestamp_estimated {
            self.estimated_timestamps += 1;
        }

        let date = record.timestamp.date();
        self.daily_bucket(date).record(record);
        let event_cap = self.hourly_event_cap;
        self.hourly_bucket(date, record.hour())
            .record(record, event_cap);

        let group = self.normalizer.normalize(&record.raw_path, record.source);
        self.endpoint_bucket(&group, record).record(record);

        self.ip_bucket(&record.ip).record(record);
        self.range_bucket(&ip_range(&record.ip)).record(record);
        group
    }

    fn daily_bucket(&mut self, date: NaiveDate) -> &mut AggregateBucket {
        self.daily.entry(date).or_default()
    }

    fn hourly_bucket(&mut self, date: NaiveDate, hour: u32) -> &mut HourlyBucket {
        self.hourly
            .entry((date, hour))
            .or_insert_with(|| HourlyBucket::new(date, hour))
    }

    fn endpoint_bucket(&mut self, group: &PathGroup, record: &RequestRecord) -> &mut EndpointStats {
        let sample_cap = self.sample_cap;
        self.endpoints
            .entry(group.clone())
            .or_insert_with(|| EndpointStats::new(group.clone(), record.source, sample_cap))
    }

    fn ip_bucket(&mut self, ip: &str) -> &mut AggregateBucket {
        self.ips.entry(ip.to_string()).or_default()
    }

    fn range_bucket(&mut self, range: &str) -> &mut AggregateBucket {
        self.ip_ranges.entry(range.to_string()).or_default()
    }

    pub fn total_requests(&self) -> u64 {
        self.global.requests
    }

    /// Read-only copy of the current aggregates
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            global: self.global.clone(),
            estimated_timestamps: self.estimated_timestamps,
            daily: self.daily.clone(),
            hourly: self.hourly.values().cloned().collect(),
            endpoints: self.endpoints.values().cloned().collect(),
            ips: self.ips.clone(),
            ip_ranges: self.ip_ranges.clone(),
        }
    }

    /// Consume the aggregator, moving the aggregates into a snapshot
    pub fn into_snapshot(self) -> Snapshot {
        Snapshot {
            global: self.global,
            estimated_timestamps: self.estimated_timestamps,
            daily: self.daily,
            hourly: self.hourly.into_values().collect(),
            endpoints: self.endpoints.into_values().collect(),
            ips: self.ips,
            ip_ranges: self.ip_ranges,
        }
    }
}

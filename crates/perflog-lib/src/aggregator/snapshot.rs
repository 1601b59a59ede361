//! Read-only aggregate views handed to detectors and renderers

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

use super::bucket::{AggregateBucket, EndpointStats, HourlyBucket};

/// Aggregates at the end (or any point) of an ingestion pass
///
/// Hourly buckets are ordered by (date, hour) and endpoints by group, so
/// iteration is deterministic.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub global: AggregateBucket,
    /// Records whose timestamp was substituted by the parser
    pub estimated_timestamps: u64,
    pub daily: BTreeMap<NaiveDate, AggregateBucket>,
    pub hourly: Vec<HourlyBucket>,
    pub endpoints: Vec<EndpointStats>,
    pub ips: BTreeMap<String, AggregateBucket>,
    pub ip_ranges: BTreeMap<String, AggregateBucket>,
}

/// One of the busiest hours
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeakHour {
    pub date: NaiveDate,
    pub hour: u32,
    pub requests: u64,
    pub queries: u64,
}

impl Snapshot {
    pub fn total_requests(&self) -> u64 {
        self.global.requests
    }

    pub fn is_empty(&self) -> bool {
        self.global.requests == 0
    }

    /// Busiest hours by request count, earliest first on ties
    pub fn peak_hours(&self, limit: usize) -> Vec<PeakHour> {
        let mut hours: Vec<&HourlyBucket> = self.hourly.iter().collect();
        hours.sort_by(|a, b| {
            b.totals
                .requests
                .cmp(&a.totals.requests)
                .then_with(|| (a.date, a.hour).cmp(&(b.date, b.hour)))
        });
        hours
            .into_iter()
            .take(limit)
            .map(|h| PeakHour {
                date: h.date,
                hour: h.hour,
                requests: h.totals.requests,
                queries: h.totals.queries,
            })
            .collect()
    }

    /// Endpoints by total egress, descending; ties by group
    pub fn endpoints_by_egress(&self) -> Vec<&EndpointStats> {
        let mut endpoints: Vec<&EndpointStats> = self.endpoints.iter().collect();
        endpoints.sort_by(|a, b| {
            b.totals
                .egress_kb
                .total_cmp(&a.totals.egress_kb)
                .then_with(|| a.group.cmp(&b.group))
        });
        endpoints
    }

    /// Endpoints by total rows read, descending; ties by group
    pub fn endpoints_by_rows(&self) -> Vec<&EndpointStats> {
        let mut endpoints: Vec<&EndpointStats> = self.endpoints.iter().collect();
        endpoints.sort_by(|a, b| {
            b.totals
                .rows
                .cmp(&a.totals.rows)
                .then_with(|| a.group.cmp(&b.group))
        });
        endpoints
    }

    /// Endpoints by total SQL queries issued, descending; ties by group
    pub fn endpoints_by_query_volume(&self) -> Vec<&EndpointStats> {
        let mut endpoints: Vec<&EndpointStats> = self.endpoints.iter().collect();
        endpoints.sort_by(|a, b| {
            b.totals
                .queries
                .cmp(&a.totals.queries)
                .then_with(|| a.group.cmp(&b.group))
        });
        endpoints
    }

    /// Source IPs by request count, descending; ties by address
    pub fn ips_by_requests(&self) -> Vec<(&str, &AggregateBucket)> {
        let mut ips: Vec<(&str, &AggregateBucket)> =
            self.ips.iter().map(|(ip, b)| (ip.as_str(), b)).collect();
        ips.sort_by(|a, b| b.1.requests.cmp(&a.1.requests).then_with(|| a.0.cmp(b.0)));
        ips
    }

    /// /24 ranges by request count, descending; ties by range
    pub fn ranges_by_requests(&self) -> Vec<(&str, &AggregateBucket)> {
        let mut ranges: Vec<(&str, &AggregateBucket)> =
            self.ip_ranges.iter().map(|(r, b)| (r.as_str(), b)).collect();
        ranges.sort_by(|a, b| b.1.requests.cmp(&a.1.requests).then_with(|| a.0.cmp(b.0)));
        ranges
    }
}

//! Endpoint and IP anomaly detection over a completed snapshot

use serde::Serialize;

use super::report::{AnomalyKind, AnomalyReport, Severity, Subject};
use super::request::check_request;
use crate::aggregator::{EndpointStats, Snapshot};
use crate::config::DetectorConfig;
use crate::error::ConfigError;
use crate::models::{PathGroup, RequestRecord, SourceTag};
use crate::stats;

/// Coarse N+1 risk bucket shown next to each endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Suspect,
    Critical,
}

impl RiskLevel {
    pub fn score(self) -> u8 {
        match self {
            RiskLevel::Low => 1,
            RiskLevel::Suspect => 2,
            RiskLevel::Critical => 3,
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "LOW"),
            RiskLevel::Suspect => write!(f, "SUSPECT"),
            RiskLevel::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Summary statistics for one endpoint, shared by checks and renderers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EndpointSummary {
    pub group: PathGroup,
    pub source: SourceTag,
    pub hits: u64,
    pub mean_queries: f64,
    pub mean_rows: f64,
    pub mean_latency_sec: f64,
    pub max_latency_sec: f64,
    /// Latency at the configured percentile, seconds
    pub latency_sec: f64,
    pub peak_mem_mb: f64,
    pub egress_mb: f64,
    pub total_queries: u64,
    pub total_rows: u64,
    pub risk: RiskLevel,
}

/// Threshold-based detector
pub struct AnomalyDetector {
    config: DetectorConfig,
}

impl AnomalyDetector {
    pub fn new(config: DetectorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Per-request checks for one record read from `source` at `line`
    pub fn inspect_request(
        &self,
        record: &RequestRecord,
        source: &str,
        line: usize,
    ) -> Vec<AnomalyReport> {
        check_request(&self.config, record, source, line)
    }

    pub fn summarize(&self, endpoint: &EndpointStats) -> EndpointSummary {
        let mean_queries = endpoint.totals.mean_queries();
        let risk = if mean_queries > self.config.critical_mean_queries {
            RiskLevel::Critical
        } else if mean_queries > self.config.warning_mean_queries {
            RiskLevel::Suspect
        } else {
            RiskLevel::Low
        };

        let durations = &endpoint.samples.duration_sec;
        EndpointSummary {
            group: endpoint.group.clone(),
            source: endpoint.source,
            hits: endpoint.hits(),
            mean_queries,
            mean_rows: endpoint.totals.mean_rows(),
            mean_latency_sec: stats::mean(durations),
            max_latency_sec: stats::max(durations),
            latency_sec: stats::percentile(durations, self.config.latency_percentile),
            peak_mem_mb: endpoint.totals.peak_mem_mb,
            egress_mb: endpoint.totals.egress_mb(),
            total_queries: endpoint.totals.queries,
            total_rows: endpoint.totals.rows,
            risk,
        }
    }

    /// Summaries for every endpoint, ordered by egress then group
    pub fn summarize_all(&self, snapshot: &Snapshot) -> Vec<EndpointSummary> {
        snapshot
            .endpoints_by_egress()
            .into_iter()
            .filter(|e| e.hits() > 0)
            .map(|e| self.summarize(e))
            .collect()
    }

    /// Endpoint checks in fixed order; a single healthy report if none fire
    pub fn endpoint_reports(&self, summary: &EndpointSummary) -> Vec<AnomalyReport> {
        let c = &self.config;
        let subject = || Subject::Endpoint {
            group: summary.group.clone(),
        };
        let mut reports = Vec::new();

        if summary.mean_queries > c.critical_mean_queries {
            reports.push(AnomalyReport {
                severity: Severity::Critical,
                kind: AnomalyKind::NPlusOne,
                subject: subject(),
                title: "Critical N+1 suspect".to_string(),
                detail: format!("Mean of {:.1} SQL queries per call", summary.mean_queries),
                measured: summary.mean_queries,
                threshold: c.critical_mean_queries,
                remediation: "Add eager loading for related objects (select_related / prefetch_related)"
                    .to_string(),
            });
        } else if summary.mean_queries > c.warning_mean_queries {
            reports.push(AnomalyReport {
                severity: Severity::Warning,
                kind: AnomalyKind::QueryCount,
                subject: subject(),
                title: "SQL optimisation needed".to_string(),
                detail: format!("{:.1} queries per call", summary.mean_queries),
                measured: summary.mean_queries,
                threshold: c.warning_mean_queries,
                remediation: "Profile the handler's queries and batch repeated lookups".to_string(),
            });
        }

        if summary.latency_sec > c.critical_latency_sec {
            reports.push(AnomalyReport {
                severity: Severity::Critical,
                kind: AnomalyKind::Latency,
                subject: subject(),
                title: "Critical latency".to_string(),
                detail: format!(
                    "p{} latency {:.1}s",
                    c.latency_percentile, summary.latency_sec
                ),
                measured: summary.latency_sec,
                threshold: c.critical_latency_sec,
                remediation: "Move the work to a background queue or add database indexes"
                    .to_string(),
            });
        }

        if summary.mean_rows > c.critical_mean_rows {
            reports.push(AnomalyReport {
                severity: Severity::Critical,
                kind: AnomalyKind::DataVolume,
                subject: subject(),
                title: "High data volume".to_string(),
                detail: format!("{:.0} rows returned per call", summary.mean_rows),
                measured: summary.mean_rows,
                threshold: c.critical_mean_rows,
                remediation: "Paginate the result set".to_string(),
            });
        }

        if summary.peak_mem_mb > c.warning_peak_mem_mb {
            reports.push(AnomalyReport {
                severity: Severity::Warning,
                kind: AnomalyKind::Memory,
                subject: subject(),
                title: "High memory use".to_string(),
                detail: format!("Peak of {:.0} MB", summary.peak_mem_mb),
                measured: summary.peak_mem_mb,
                threshold: c.warning_peak_mem_mb,
                remediation: "Stream rows with iterator-style fetching instead of loading the full set"
                    .to_string(),
            });
        }

        if reports.is_empty() {
            reports.push(AnomalyReport {
                severity: Severity::Success,
                kind: AnomalyKind::Healthy,
                subject: subject(),
                title: "Healthy endpoint".to_string(),
                detail: format!("{} hits, no threshold exceeded", summary.hits),
                measured: 0.0,
                threshold: 0.0,
                remediation: "Keep monitoring".to_string(),
            });
        }
        reports
    }

    /// IPs whose share of total traffic is strictly above the threshold
    pub fn ip_reports(&self, snapshot: &Snapshot) -> Vec<AnomalyReport> {
        let total = snapshot.total_requests();
        if total == 0 {
            return Vec::new();
        }

        snapshot
            .ips_by_requests()
            .into_iter()
            .filter_map(|(ip, bucket)| {
                let share = bucket.requests as f64 / total as f64 * 100.0;
                if share <= self.config.ip_share_percent {
                    return None;
                }
                Some(AnomalyReport {
                    severity: Severity::Warning,
                    kind: AnomalyKind::TrafficConcentration,
                    subject: Subject::Ip { ip: ip.to_string() },
                    title: "Traffic concentration".to_string(),
                    detail: format!(
                        "{} generates {:.1}% of total traffic ({} of {} requests)",
                        ip, share, bucket.requests, total
                    ),
                    measured: share,
                    threshold: self.config.ip_share_percent,
                    remediation: "Check for scraping or a denial-of-service source and rate-limit it"
                        .to_string(),
                })
            })
            .collect()
    }

    /// Full ordered report list for a snapshot
    ///
    /// IP reports come first (by request count), then endpoint reports
    /// (by egress, then group); the list is then stably sorted by severity,
    /// most urgent first.
    pub fn detect(&self, snapshot: &Snapshot) -> Vec<AnomalyReport> {
        let mut reports = self.ip_reports(snapshot);
        for summary in self.summarize_all(snapshot) {
            reports.extend(self.endpoint_reports(&summary));
        }
        reports.sort_by(|a, b| b.severity.cmp(&a.severity));
        reports
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::Aggregator;
    use crate::config::{AggregatorConfig, NormalizerConfig};
    use crate::normalize::PathNormalizer;
    use chrono::NaiveDate;

    fn detector() -> AnomalyDetector {
        AnomalyDetector::new(DetectorConfig::default()).unwrap()
    }

    fn aggregator() -> Aggregator {
        Aggregator::new(
            &AggregatorConfig::default(),
            PathNormalizer::new(&NormalizerConfig::default()).unwrap(),
        )
    }

    fn request(ip: &str, path: &str) -> RequestRecord {
        let ts = NaiveDate::from_ymd_opt(2025, 5, 5)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        RequestRecord::new(ts, SourceTag::Web, ip, path)
    }

    #[test]
    fn test_constant_sixty_queries_is_one_critical() {
        let mut agg = aggregator();
        for i in 0..10 {
            let mut r = request(&format!("10.0.0.{}", i), "/orders");
            r.queries = Some(60);
            agg.ingest(&r);
        }
        let snapshot = agg.into_snapshot();
        let d = detector();
        let summary = d.summarize(&snapshot.endpoints[0]);
        assert_eq!(summary.mean_queries, 60.0);
        assert_eq!(summary.risk, RiskLevel::Critical);

        let reports = d.endpoint_reports(&summary);
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].severity, Severity::Critical);
        assert_eq!(reports[0].kind, AnomalyKind::NPlusOne);
        assert_eq!(reports[0].measured, 60.0);
    }

    #[test]
    fn test_warning_band_and_healthy() {
        let d = detector();
        let mut agg = aggregator();
        let mut r = request("1.1.1.1", "/a");
        r.queries = Some(20);
        agg.ingest(&r);
        agg.ingest(&request("1.1.1.1", "/b"));
        let snapshot = agg.into_snapshot();

        let a = d.summarize(&snapshot.endpoints[0]);
        assert_eq!(a.risk, RiskLevel::Suspect);
        assert_eq!(d.endpoint_reports(&a)[0].kind, AnomalyKind::QueryCount);

        let b = d.summarize(&snapshot.endpoints[1]);
        let reports = d.endpoint_reports(&b);
        assert_eq!(reports.len(), 1);
        assert!(reports[0].is_healthy());
    }

    #[test]
    fn test_latency_memory_and_volume_checks() {
        let d = detector();
        let mut agg = aggregator();
        for i in 1..=20 {
            let mut r = request("1.1.1.1", "/export");
            r.duration_sec = Some(i as f64 * 0.5);
            r.rows = Some(2500);
            r.mem_mb = Some(if i == 20 { 200.0 } else { 50.0 });
            agg.ingest(&r);
        }
        let snapshot = agg.into_snapshot();
        let summary = d.summarize(&snapshot.endpoints[0]);
        assert_eq!(summary.mean_latency_sec, 5.25);
        assert_eq!(summary.max_latency_sec, 10.0);
        let kinds: Vec<AnomalyKind> = d.endpoint_reports(&summary).iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            vec![AnomalyKind::Latency, AnomalyKind::DataVolume, AnomalyKind::Memory]
        );
    }

    #[test]
    fn test_ip_share_boundary_is_strict() {
        let d = detector();

        let mut agg = aggregator();
        for i in 0..100 {
            let ip = if i < 25 { "6.6.6.6".to_string() } else { format!("10.0.{}.1", i) };
            agg.ingest(&request(&ip, "/"));
        }
        let reports = d.ip_reports(&agg.into_snapshot());
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].subject, Subject::Ip { ip: "6.6.6.6".to_string() });
        assert_eq!(reports[0].measured, 25.0);

        let mut agg = aggregator();
        for i in 0..100 {
            let ip = if i < 20 { "6.6.6.6".to_string() } else { format!("10.0.{}.1", i) };
            agg.ingest(&request(&ip, "/"));
        }
        assert!(d.ip_reports(&agg.into_snapshot()).is_empty());
    }

    #[test]
    fn test_empty_snapshot_has_no_findings() {
        let d = detector();
        assert!(d.detect(&aggregator().into_snapshot()).is_empty());
    }

    #[test]
    fn test_detect_orders_by_severity_then_egress() {
        let d = detector();
        let mut agg = aggregator();
        for (path, queries, size) in [("/small", 60, 1.0), ("/big", 60, 50.0), ("/fine", 1, 500.0)] {
            for i in 0..10 {
                let mut r = request(&format!("10.{}.0.1", i), path);
                r.queries = Some(queries);
                r.size_kb = Some(size);
                agg.ingest(&r);
            }
        }
        let snapshot = agg.into_snapshot();
        let reports = d.detect(&snapshot);
        let order: Vec<String> = reports.iter().map(|r| r.subject.to_string()).collect();
        assert_eq!(order, vec!["/big", "/small", "/fine"]);
        assert_eq!(reports[2].severity, Severity::Success);

        assert_eq!(d.detect(&snapshot), reports);
    }

    #[test]
    fn test_invalid_config_fails_fast() {
        let config = DetectorConfig {
            ip_share_percent: -5.0,
            ..Default::default()
        };
        assert!(AnomalyDetector::new(config).is_err());
    }
}

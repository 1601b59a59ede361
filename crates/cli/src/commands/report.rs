//! Full report command

use anyhow::Result;
use colored::Colorize;
use perflog_lib::aggregator::{ip_range, AggregateBucket, EndpointStats, PeakHour};
use perflog_lib::anomaly::{AnomalyReport, EndpointSummary, Severity};
use perflog_lib::parser::ParseStats;
use perflog_lib::{Analysis, PredictionResult};
use serde::Serialize;
use tabled::Tabled;

use super::anomalies::anomaly_rows;
use super::endpoints::endpoint_rows;
use super::predict::print_prediction;
use crate::output::{
    format_count, format_day, format_kb, format_percent, print_heading, print_json, print_success,
    print_table, print_warning, OutputFormat,
};

const TOP_IPS: usize = 10;
const TOP_ENDPOINTS: usize = 10;
const TOP_RANGES: usize = 10;
const TOP_ANOMALIES: usize = 20;
const PEAK_HOURS: usize = 4;

#[derive(Tabled)]
struct DailyRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Requests")]
    requests: String,
    #[tabled(rename = "Unique IPs")]
    unique_ips: usize,
    #[tabled(rename = "Queries")]
    queries: String,
    #[tabled(rename = "Avg Queries")]
    mean_queries: String,
    #[tabled(rename = "Egress")]
    egress: String,
}

#[derive(Tabled)]
struct IpRow {
    #[tabled(rename = "IP")]
    ip: String,
    #[tabled(rename = "Range")]
    range: String,
    #[tabled(rename = "Requests")]
    requests: String,
    #[tabled(rename = "Share")]
    share: String,
    #[tabled(rename = "Queries")]
    queries: String,
}

#[derive(Tabled)]
struct RangeRow {
    #[tabled(rename = "Range")]
    range: String,
    #[tabled(rename = "Requests")]
    requests: String,
    #[tabled(rename = "Share")]
    share: String,
    #[tabled(rename = "Unique IPs")]
    unique_ips: usize,
    #[tabled(rename = "Queries")]
    queries: String,
}

#[derive(Tabled)]
struct VolumeRow {
    #[tabled(rename = "Endpoint")]
    endpoint: String,
    #[tabled(rename = "Hits")]
    hits: String,
    #[tabled(rename = "Queries")]
    queries: String,
    #[tabled(rename = "Rows")]
    rows: String,
}

impl From<&EndpointStats> for VolumeRow {
    fn from(stats: &EndpointStats) -> Self {
        Self {
            endpoint: stats.group.to_string(),
            hits: format_count(stats.totals.requests),
            queries: format_count(stats.totals.queries),
            rows: format_count(stats.totals.rows),
        }
    }
}

#[derive(Serialize)]
struct Overview {
    total_requests: u64,
    unique_ips: usize,
    ip_ranges: usize,
    endpoints: usize,
    days: usize,
    total_queries: u64,
    total_rows: u64,
    egress_mb: f64,
    estimated_timestamps: u64,
}

#[derive(Serialize)]
struct IpShare<'a> {
    ip: &'a str,
    requests: u64,
    share_percent: f64,
}

#[derive(Serialize)]
struct RangeShare<'a> {
    range: &'a str,
    requests: u64,
    unique_ips: usize,
    share_percent: f64,
}

#[derive(Serialize)]
struct EndpointVolume {
    endpoint: String,
    requests: u64,
    queries: u64,
    rows: u64,
}

impl From<&EndpointStats> for EndpointVolume {
    fn from(stats: &EndpointStats) -> Self {
        Self {
            endpoint: stats.group.to_string(),
            requests: stats.totals.requests,
            queries: stats.totals.queries,
            rows: stats.totals.rows,
        }
    }
}

#[derive(Serialize)]
struct ReportJson<'a> {
    overview: Overview,
    parse_stats: &'a ParseStats,
    daily: &'a std::collections::BTreeMap<chrono::NaiveDate, AggregateBucket>,
    top_ips: Vec<IpShare<'a>>,
    top_ranges: Vec<RangeShare<'a>>,
    peak_hours: Vec<PeakHour>,
    endpoints: &'a [EndpointSummary],
    top_endpoints_by_rows: Vec<EndpointVolume>,
    top_endpoints_by_queries: Vec<EndpointVolume>,
    anomalies: Vec<&'a AnomalyReport>,
    request_alerts: usize,
    prediction: &'a PredictionResult,
}

fn share(part: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    part as f64 / total as f64 * 100.0
}

fn overview(analysis: &Analysis) -> Overview {
    let snapshot = &analysis.snapshot;
    Overview {
        total_requests: snapshot.total_requests(),
        unique_ips: snapshot.global.unique_ips(),
        ip_ranges: snapshot.ip_ranges.len(),
        endpoints: snapshot.endpoints.len(),
        days: snapshot.daily.len(),
        total_queries: snapshot.global.queries,
        total_rows: snapshot.global.rows,
        egress_mb: snapshot.global.egress_mb(),
        estimated_timestamps: snapshot.estimated_timestamps,
    }
}

pub fn show_report(analysis: &Analysis, format: OutputFormat) -> Result<()> {
    let snapshot = &analysis.snapshot;
    let total = snapshot.total_requests();

    if let OutputFormat::Json = format {
        let top_ips = snapshot
            .ips_by_requests()
            .into_iter()
            .take(TOP_IPS)
            .map(|(ip, bucket)| IpShare {
                ip,
                requests: bucket.requests,
                share_percent: share(bucket.requests, total),
            })
            .collect();
        let top_ranges = snapshot
            .ranges_by_requests()
            .into_iter()
            .take(TOP_RANGES)
            .map(|(range, bucket)| RangeShare {
                range,
                requests: bucket.requests,
                unique_ips: bucket.unique_ips(),
                share_percent: share(bucket.requests, total),
            })
            .collect();
        return print_json(&ReportJson {
            overview: overview(analysis),
            parse_stats: &analysis.parse_stats,
            daily: &snapshot.daily,
            top_ips,
            top_ranges,
            peak_hours: snapshot.peak_hours(PEAK_HOURS),
            endpoints: &analysis.endpoints,
            top_endpoints_by_rows: snapshot
                .endpoints_by_rows()
                .into_iter()
                .take(TOP_ENDPOINTS)
                .map(EndpointVolume::from)
                .collect(),
            top_endpoints_by_queries: snapshot
                .endpoints_by_query_volume()
                .into_iter()
                .take(TOP_ENDPOINTS)
                .map(EndpointVolume::from)
                .collect(),
            anomalies: analysis.findings(false),
            request_alerts: analysis.request_alerts.len(),
            prediction: &analysis.prediction,
        });
    }

    print_heading("Performance Report");
    let stats = &analysis.parse_stats;
    let o = overview(analysis);
    println!("Requests:               {}", format_count(o.total_requests).cyan());
    println!("Unique IPs:             {} ({} /24 ranges)", o.unique_ips, o.ip_ranges);
    println!("Endpoints:              {}", o.endpoints);
    println!("Days covered:           {}", o.days);
    println!("SQL queries:            {}", format_count(o.total_queries));
    println!("Rows read:              {}", format_count(o.total_rows));
    println!("Egress:                 {}", format_kb(snapshot.global.egress_kb));
    println!(
        "Lines:                  {} read, {} strict, {} lenient, {} malformed",
        format_count(stats.lines),
        format_count(stats.parsed_strict),
        format_count(stats.parsed_lenient),
        format_count(stats.malformed_lines)
    );
    if o.estimated_timestamps > 0 {
        print_warning(&format!(
            "{} records had no timestamp and were assigned the run time",
            o.estimated_timestamps
        ));
    }
    println!();

    print_heading("Daily Traffic");
    let daily: Vec<DailyRow> = snapshot
        .daily
        .iter()
        .map(|(date, bucket)| DailyRow {
            date: format_day(*date),
            requests: format_count(bucket.requests),
            unique_ips: bucket.unique_ips(),
            queries: format_count(bucket.queries),
            mean_queries: format!("{:.1}", bucket.mean_queries()),
            egress: format_kb(bucket.egress_kb),
        })
        .collect();
    print_table(daily, "No traffic recorded");
    println!();

    print_heading("Top IPs");
    let ips: Vec<IpRow> = snapshot
        .ips_by_requests()
        .into_iter()
        .take(TOP_IPS)
        .map(|(ip, bucket)| IpRow {
            ip: ip.to_string(),
            range: ip_range(ip),
            requests: format_count(bucket.requests),
            share: format_percent(share(bucket.requests, total)),
            queries: format_count(bucket.queries),
        })
        .collect();
    print_table(ips, "No IPs recorded");
    println!();

    print_heading("Top /24 Ranges");
    let ranges: Vec<RangeRow> = snapshot
        .ranges_by_requests()
        .into_iter()
        .take(TOP_RANGES)
        .map(|(range, bucket)| RangeRow {
            range: range.to_string(),
            requests: format_count(bucket.requests),
            share: format_percent(share(bucket.requests, total)),
            unique_ips: bucket.unique_ips(),
            queries: format_count(bucket.queries),
        })
        .collect();
    print_table(ranges, "No IPs recorded");
    println!();

    print_heading("Top Endpoints by Egress");
    print_table(
        endpoint_rows(&analysis.endpoints, TOP_ENDPOINTS),
        "No endpoints recorded",
    );
    println!();

    print_heading("Top Endpoints by Rows Read");
    let by_rows: Vec<VolumeRow> = snapshot
        .endpoints_by_rows()
        .into_iter()
        .take(TOP_ENDPOINTS)
        .map(VolumeRow::from)
        .collect();
    print_table(by_rows, "No endpoints recorded");
    println!();

    print_heading("Top Endpoints by SQL Queries");
    let by_queries: Vec<VolumeRow> = snapshot
        .endpoints_by_query_volume()
        .into_iter()
        .take(TOP_ENDPOINTS)
        .map(VolumeRow::from)
        .collect();
    print_table(by_queries, "No endpoints recorded");
    println!();

    print_heading("Anomalies");
    let findings = analysis.findings(false);
    if findings.is_empty() {
        print_success("No anomalies detected");
    } else {
        let critical = analysis.count_at(Severity::Critical);
        if critical > 0 {
            println!("{}", format!("{} critical findings", critical).red().bold());
        }
        print_table(
            anomaly_rows(findings.into_iter().take(TOP_ANOMALIES)),
            "No anomalies detected",
        );
    }
    if !analysis.request_alerts.is_empty() {
        println!("Per-request alerts:     {}", analysis.request_alerts.len());
    }
    println!();

    print_heading("Load Prediction");
    print_prediction(&analysis.prediction);
    Ok(())
}

//! Endpoint statistics command

use anyhow::Result;
use perflog_lib::anomaly::EndpointSummary;
use perflog_lib::Analysis;
use tabled::Tabled;

use crate::output::{color_risk, format_count, print_heading, print_json, print_table, OutputFormat};

#[derive(Tabled)]
pub struct EndpointRow {
    #[tabled(rename = "Endpoint")]
    endpoint: String,
    #[tabled(rename = "Type")]
    source: String,
    #[tabled(rename = "Hits")]
    hits: String,
    #[tabled(rename = "Avg Queries")]
    mean_queries: String,
    #[tabled(rename = "Avg Rows")]
    mean_rows: String,
    #[tabled(rename = "Avg (s)")]
    mean_latency: String,
    #[tabled(rename = "P95 (s)")]
    latency: String,
    #[tabled(rename = "Peak Mem (MB)")]
    peak_mem: String,
    #[tabled(rename = "Egress (MB)")]
    egress: String,
    #[tabled(rename = "N+1 Risk")]
    risk: String,
}

impl From<&EndpointSummary> for EndpointRow {
    fn from(summary: &EndpointSummary) -> Self {
        Self {
            endpoint: summary.group.to_string(),
            source: summary.source.to_string(),
            hits: format_count(summary.hits),
            mean_queries: format!("{:.1}", summary.mean_queries),
            mean_rows: format!("{:.1}", summary.mean_rows),
            mean_latency: format!("{:.2}", summary.mean_latency_sec),
            latency: format!("{:.2}", summary.latency_sec),
            peak_mem: format!("{:.0}", summary.peak_mem_mb),
            egress: format!("{:.2}", summary.egress_mb),
            risk: color_risk(summary.risk),
        }
    }
}

/// Rows for the `limit` heaviest endpoints
pub fn endpoint_rows(summaries: &[EndpointSummary], limit: usize) -> Vec<EndpointRow> {
    summaries.iter().take(limit).map(EndpointRow::from).collect()
}

/// Show endpoints ordered by egress
pub fn show_endpoints(analysis: &Analysis, limit: usize, format: OutputFormat) -> Result<()> {
    let shown = &analysis.endpoints[..limit.min(analysis.endpoints.len())];
    match format {
        OutputFormat::Json => print_json(shown)?,
        OutputFormat::Table => {
            print_heading("Endpoints by Egress");
            print_table(endpoint_rows(shown, limit), "No endpoints found");
            if analysis.endpoints.len() > shown.len() {
                println!(
                    "Showing {} of {} endpoints",
                    shown.len(),
                    analysis.endpoints.len()
                );
            }
        }
    }
    Ok(())
}

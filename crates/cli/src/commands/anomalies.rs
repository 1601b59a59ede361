//! Anomaly listing command

use anyhow::Result;
use perflog_lib::anomaly::AnomalyReport;
use perflog_lib::Analysis;
use serde::Serialize;
use tabled::Tabled;

use crate::output::{
    color_severity, print_heading, print_info, print_json, print_success, print_table, OutputFormat,
};

#[derive(Tabled)]
pub struct AnomalyRow {
    #[tabled(rename = "Severity")]
    severity: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Subject")]
    subject: String,
    #[tabled(rename = "Detail")]
    detail: String,
    #[tabled(rename = "Remediation")]
    remediation: String,
}

impl From<&AnomalyReport> for AnomalyRow {
    fn from(report: &AnomalyReport) -> Self {
        Self {
            severity: color_severity(report.severity),
            kind: report.kind.to_string(),
            subject: report.subject.to_string(),
            detail: report.detail.clone(),
            remediation: report.remediation.clone(),
        }
    }
}

#[derive(Serialize)]
struct AnomalyListing<'a> {
    reports: Vec<&'a AnomalyReport>,
    request_alerts: &'a [AnomalyReport],
}

pub fn anomaly_rows<'a>(reports: impl IntoIterator<Item = &'a AnomalyReport>) -> Vec<AnomalyRow> {
    reports.into_iter().map(AnomalyRow::from).collect()
}

/// Show endpoint and IP findings followed by a per-request alert count
pub fn show_anomalies(
    analysis: &Analysis,
    limit: usize,
    include_healthy: bool,
    format: OutputFormat,
) -> Result<()> {
    let reports: Vec<&AnomalyReport> = analysis
        .findings(include_healthy)
        .into_iter()
        .take(limit)
        .collect();

    match format {
        OutputFormat::Json => print_json(&AnomalyListing {
            reports,
            request_alerts: &analysis.request_alerts,
        })?,
        OutputFormat::Table => {
            print_heading("Anomalies");
            if reports.is_empty() {
                print_success("No anomalies detected");
            } else {
                print_table(anomaly_rows(reports), "No anomalies detected");
            }
            if !analysis.request_alerts.is_empty() {
                println!();
                print_info(&format!(
                    "{} per-request alerts (see --format json for details)",
                    analysis.request_alerts.len()
                ));
            }
        }
    }
    Ok(())
}

//! Peak hours command

use anyhow::Result;
use perflog_lib::aggregator::PeakHour;
use perflog_lib::Analysis;
use tabled::Tabled;

use crate::output::{format_count, format_day, print_heading, print_json, print_table, OutputFormat};

#[derive(Tabled)]
pub struct PeakHourRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Hour")]
    hour: String,
    #[tabled(rename = "Requests")]
    requests: String,
    #[tabled(rename = "Queries")]
    queries: String,
}

impl From<&PeakHour> for PeakHourRow {
    fn from(peak: &PeakHour) -> Self {
        Self {
            date: format_day(peak.date),
            hour: format!("{:02}:00-{:02}:00", peak.hour, (peak.hour + 1) % 24),
            requests: format_count(peak.requests),
            queries: format_count(peak.queries),
        }
    }
}

pub fn show_peak_hours(analysis: &Analysis, limit: usize, format: OutputFormat) -> Result<()> {
    let peaks = analysis.snapshot.peak_hours(limit);
    match format {
        OutputFormat::Json => print_json(&peaks)?,
        OutputFormat::Table => {
            print_heading("Peak Hours");
            print_table(
                peaks.iter().map(PeakHourRow::from).collect(),
                "No hourly traffic recorded",
            );
        }
    }
    Ok(())
}

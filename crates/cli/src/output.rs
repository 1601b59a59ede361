//! Output formatting utilities

use chrono::NaiveDate;
use clap::ValueEnum;
use colored::Colorize;
use perflog_lib::anomaly::{RiskLevel, Severity};
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print rows as a rounded table, or a note when there are none
pub fn print_table<T: Tabled>(rows: Vec<T>, empty_message: &str) {
    if rows.is_empty() {
        println!("{}", empty_message.yellow());
        return;
    }
    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{}", table);
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a section heading
pub fn print_heading(title: &str) {
    println!("{}", title.bold());
    println!("{}", "=".repeat(60));
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format kilobytes as a human-readable size
pub fn format_kb(kb: f64) -> String {
    if kb >= 1024.0 * 1024.0 {
        format!("{:.2} GB", kb / (1024.0 * 1024.0))
    } else if kb >= 1024.0 {
        format!("{:.2} MB", kb / 1024.0)
    } else {
        format!("{:.1} KB", kb)
    }
}

/// Format a count with thousands separators
pub fn format_count(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Format a calendar day with its weekday
pub fn format_day(date: NaiveDate) -> String {
    date.format("%Y-%m-%d %a").to_string()
}

pub fn format_percent(value: f64) -> String {
    format!("{:.1}%", value)
}

pub fn color_severity(severity: Severity) -> String {
    let label = severity.to_string();
    match severity {
        Severity::Critical => label.red().bold().to_string(),
        Severity::Warning => label.yellow().to_string(),
        Severity::Info => label.blue().to_string(),
        Severity::Success => label.green().to_string(),
    }
}

pub fn color_risk(risk: RiskLevel) -> String {
    let label = format!("{} ({})", risk, risk.score());
    match risk {
        RiskLevel::Critical => label.red().bold().to_string(),
        RiskLevel::Suspect => label.yellow().to_string(),
        RiskLevel::Low => label.green().to_string(),
    }
}

/// Color an R² percentage by how much it can be trusted
pub fn color_confidence(percent: f64) -> String {
    let formatted = format!("{:.0}%", percent);
    if percent >= 80.0 {
        formatted.green().to_string()
    } else if percent >= 50.0 {
        formatted.yellow().to_string()
    } else {
        formatted.red().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_kb() {
        assert_eq!(format_kb(512.0), "512.0 KB");
        assert_eq!(format_kb(1536.0), "1.50 MB");
        assert_eq!(format_kb(3.0 * 1024.0 * 1024.0), "3.00 GB");
    }

    #[test]
    fn test_format_day() {
        let date = NaiveDate::from_ymd_opt(2025, 12, 29).unwrap();
        assert_eq!(format_day(date), "2025-12-29 Mon");
    }

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1000), "1,000");
        assert_eq!(format_count(1234567), "1,234,567");
    }
}

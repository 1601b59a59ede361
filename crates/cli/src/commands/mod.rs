//! CLI command implementations

pub mod anomalies;
pub mod endpoints;
pub mod hours;
pub mod predict;
pub mod report;

use anyhow::{Context, Result};
use perflog_lib::{Analysis, Analyzer, AnalyzerConfig, LogSource, Response, SourceTag, StructuredLogger};
use tracing::info;

use crate::Inputs;

/// Run the engine over every input file
pub fn analyze(
    config: AnalyzerConfig,
    inputs: &Inputs,
    target_load: u64,
    response: Response,
) -> Result<Analysis> {
    let schema = config.parser.schema.to_string();
    let mut analyzer = Analyzer::new(config)
        .context("Invalid analyzer configuration")?
        .with_logger(StructuredLogger::new("perflog-cli"));
    analyzer
        .logger()
        .log_run_started(inputs.files.len() + inputs.cmd.len(), &schema);

    for path in &inputs.files {
        let source = LogSource::from_path(path)
            .with_context(|| format!("Failed to load {}", path.display()))?;
        analyzer.ingest_source(&source);
    }
    for path in &inputs.cmd {
        let source = LogSource::from_path(path)
            .with_context(|| format!("Failed to load {}", path.display()))?
            .with_tag(SourceTag::Cmd);
        analyzer.ingest_source(&source);
    }

    let analysis = analyzer.finish(target_load, response);
    info!(
        records = analysis.parse_stats.records(),
        malformed = analysis.parse_stats.malformed_lines,
        "Analysis complete"
    );
    Ok(analysis)
}

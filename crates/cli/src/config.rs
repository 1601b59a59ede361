//! Configuration loading for the CLI

use anyhow::{Context, Result};
use perflog_lib::AnalyzerConfig;
use std::path::Path;

/// Environment variable prefix, e.g. `PERFLOG_DETECTOR__IP_SHARE_PERCENT=30`
pub const ENV_PREFIX: &str = "PERFLOG";

/// Load the analyzer configuration
///
/// Sources, lowest precedence first: built-in defaults, the optional file
/// (format from its extension), then `PERFLOG_*` environment variables.
pub fn load(path: Option<&Path>) -> Result<AnalyzerConfig> {
    let mut builder = config::Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(config::File::from(path));
    }
    builder = builder.add_source(
        config::Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let analyzer: AnalyzerConfig = builder
        .build()
        .context("Failed to read configuration")?
        .try_deserialize()
        .context("Failed to parse configuration")?;
    analyzer.validate().context("Invalid configuration")?;
    Ok(analyzer)
}

//! Performance log analyzer CLI
//!
//! Reads local request logs and reports traffic, endpoint costs,
//! anomalies and a projected query load.

mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use perflog_lib::{AnalyzerMetrics, Response};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::{anomalies, endpoints, hours, predict, report};

/// Performance log analyzer
#[derive(Parser)]
#[command(name = "perflog")]
#[command(author, version, about = "Performance log analyzer for web application request logs", long_about = None)]
pub struct Cli {
    /// Configuration file (TOML, YAML or JSON); PERFLOG_* variables override it
    #[arg(long, env = "PERFLOG_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, short, default_value = "table", global = true)]
    pub format: output::OutputFormat,

    /// Enable verbose logging
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Print Prometheus metrics for the run on stderr
    #[arg(long, global = true)]
    pub metrics: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Log files to analyse
#[derive(Args, Debug, Clone)]
pub struct Inputs {
    /// Web request log files
    #[arg(required_unless_present = "cmd")]
    pub files: Vec<PathBuf>,

    /// Management command log files
    #[arg(long = "cmd", value_name = "FILE")]
    pub cmd: Vec<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ResponseArg {
    /// Summed SQL queries per hour
    Queries,
    /// Summed CPU milliseconds per hour
    Cpu,
}

impl From<ResponseArg> for Response {
    fn from(arg: ResponseArg) -> Self {
        match arg {
            ResponseArg::Queries => Response::Queries,
            ResponseArg::Cpu => Response::CpuMs,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Full report: overview, daily traffic, top IPs and endpoints, anomalies, prediction
    Report {
        #[command(flatten)]
        inputs: Inputs,
    },

    /// List anomalies, most severe first
    Anomalies {
        #[command(flatten)]
        inputs: Inputs,

        /// Maximum number of anomalies to show
        #[arg(long, default_value_t = 50)]
        limit: usize,

        /// Include endpoints that passed every check
        #[arg(long)]
        include_healthy: bool,
    },

    /// Endpoint statistics ordered by egress
    Endpoints {
        #[command(flatten)]
        inputs: Inputs,

        /// Maximum number of endpoints to show
        #[arg(long, default_value_t = 300)]
        limit: usize,
    },

    /// Project hourly load at a hypothetical request rate
    Predict {
        #[command(flatten)]
        inputs: Inputs,

        /// Requests per hour to extrapolate to (defaults to the configured target)
        #[arg(long)]
        target: Option<u64>,

        /// Quantity to predict
        #[arg(long, value_enum, default_value = "queries")]
        response: ResponseArg,
    },

    /// Busiest hours by request count
    Hours {
        #[command(flatten)]
        inputs: Inputs,

        /// Number of hours to show
        #[arg(long, default_value_t = 4)]
        limit: usize,
    },
}

fn init_tracing(verbose: bool, json: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry.with(fmt::layer().with_writer(std::io::stderr)).init();
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    let analyzer_config = config::load(cli.config.as_deref())?;
    let default_target = analyzer_config.predictor.target_load;

    match cli.command {
        Commands::Report { inputs } => {
            let analysis = commands::analyze(analyzer_config, &inputs, default_target, Response::Queries)?;
            report::show_report(&analysis, cli.format)?;
        }
        Commands::Anomalies {
            inputs,
            limit,
            include_healthy,
        } => {
            let analysis = commands::analyze(analyzer_config, &inputs, default_target, Response::Queries)?;
            anomalies::show_anomalies(&analysis, limit, include_healthy, cli.format)?;
        }
        Commands::Endpoints { inputs, limit } => {
            let analysis = commands::analyze(analyzer_config, &inputs, default_target, Response::Queries)?;
            endpoints::show_endpoints(&analysis, limit, cli.format)?;
        }
        Commands::Predict {
            inputs,
            target,
            response,
        } => {
            let target = target.unwrap_or(default_target);
            let analysis = commands::analyze(analyzer_config, &inputs, target, response.into())?;
            predict::show_prediction(&analysis, cli.format)?;
        }
        Commands::Hours { inputs, limit } => {
            let analysis = commands::analyze(analyzer_config, &inputs, default_target, Response::Queries)?;
            hours::show_peak_hours(&analysis, limit, cli.format)?;
        }
    }

    if cli.metrics {
        eprint!("{}", AnalyzerMetrics::new().gather()?);
    }

    Ok(())
}

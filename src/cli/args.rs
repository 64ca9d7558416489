//! Command line argument parsing for the qcache tool using clap.

use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// sarissa-qcache - inspect and exercise the Sarissa query result cache
#[derive(Parser, Debug, Clone)]
#[command(name = "sarissa-qcache")]
#[command(about = "Inspect and exercise the Sarissa query result cache")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = "Sarissa Contributors")]
#[command(long_about = None)]
pub struct QcacheArgs {
    /// Verbosity level (0=quiet, 1=normal, 2=verbose, 3=debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (overrides verbose)
    #[arg(short, long)]
    pub quiet: bool,

    /// Output format
    #[arg(short = 'f', long = "format", default_value = "human")]
    pub output_format: OutputFormat,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

impl QcacheArgs {
    /// Get the effective verbosity level
    pub fn verbosity(&self) -> u8 {
        if self.quiet {
            0
        } else {
            match self.verbose {
                0 => 1, // Default to normal
                n => n,
            }
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Show the effective cache configuration
    Config(ShowConfigArgs),

    /// Drive a synthetic query workload through the cache
    Simulate(SimulateArgs),
}

/// Cache configuration sources shared by all commands
#[derive(Parser, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// JSON config file (max_bytes, threshold_ms, ttl_secs)
    #[arg(short, long, value_name = "CONFIG_FILE", env = "SARISSA_QCACHE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the memory budget in bytes
    #[arg(long)]
    pub max_bytes: Option<i64>,

    /// Override the admission threshold in milliseconds
    #[arg(long)]
    pub threshold_ms: Option<u32>,

    /// Override the entry lifetime in seconds
    #[arg(long)]
    pub ttl_secs: Option<i64>,
}

/// Arguments for the config command
#[derive(Parser, Debug, Clone)]
pub struct ShowConfigArgs {
    #[command(flatten)]
    pub config: ConfigArgs,
}

/// Arguments for the simulate command
#[derive(Parser, Debug, Clone)]
pub struct SimulateArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Number of queries to execute
    #[arg(short = 'n', long, default_value = "10000")]
    pub queries: usize,

    /// Number of distinct queries in the workload
    #[arg(short, long, default_value = "500")]
    pub distinct: u64,

    /// Number of indexes queries are spread over
    #[arg(long, default_value = "4")]
    pub indexes: u64,

    /// Upper bound on matches per query
    #[arg(short, long, default_value = "2000")]
    pub max_matches: usize,

    /// Invalidate one index after every N queries (0 disables)
    #[arg(long, default_value = "0")]
    pub invalidate_every: usize,

    /// Number of worker threads (defaults to the number of CPU cores)
    #[arg(short, long)]
    pub threads: Option<usize>,

    /// Random seed for the workload
    #[arg(long, default_value = "42")]
    pub seed: u64,
}

/// Output format options
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
    /// YAML output
    Yaml,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simulate() {
        let args = QcacheArgs::parse_from([
            "sarissa-qcache",
            "-vv",
            "--format",
            "json",
            "simulate",
            "--queries",
            "100",
            "--max-bytes",
            "65536",
            "--threads",
            "2",
        ]);
        assert_eq!(args.verbosity(), 2);
        assert_eq!(args.output_format, OutputFormat::Json);
        match args.command {
            Command::Simulate(sim) => {
                assert_eq!(sim.queries, 100);
                assert_eq!(sim.distinct, 500);
                assert_eq!(sim.threads, Some(2));
                assert_eq!(sim.config.max_bytes, Some(65536));
            }
            _ => panic!("Expected simulate command"),
        }
    }

    #[test]
    fn test_parse_config_command() {
        let args = QcacheArgs::parse_from([
            "sarissa-qcache",
            "config",
            "--max-bytes",
            "0",
            "--ttl-secs",
            "5",
        ]);
        match args.command {
            Command::Config(show) => {
                assert_eq!(show.config.max_bytes, Some(0));
                assert_eq!(show.config.ttl_secs, Some(5));
            }
            _ => panic!("Expected config command"),
        }
    }

    #[test]
    fn test_quiet_overrides_verbose() {
        let args = QcacheArgs::parse_from(["sarissa-qcache", "-q", "-vvv", "config"]);
        assert_eq!(args.verbosity(), 0);
    }
}

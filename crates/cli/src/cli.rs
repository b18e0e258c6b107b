//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Fleet live view - headless runner
#[derive(Parser, Debug)]
#[command(
    name = "fleetview",
    author,
    version,
    about = "Headless fleet live view runner",
    long_about = "Loads a fleet snapshot, follows a realtime stream of position and status \n\
                  updates (recorded replay or simulation), keeps the live map state \n\
                  reconciled and dispatches rendered view updates to configured sinks."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "FLEETVIEW_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "FLEETVIEW_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the live view
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "fleetview.toml",
        env = "FLEETVIEW_CONFIG"
    )]
    pub config: PathBuf,

    /// Override the snapshot file (JSON array of entity records)
    #[arg(long, env = "FLEETVIEW_SNAPSHOT")]
    pub snapshot: Option<PathBuf>,

    /// Replay a recorded JSON-lines stream instead of the configured source
    #[arg(long, env = "FLEETVIEW_REPLAY", conflicts_with = "simulate_rate")]
    pub replay: Option<PathBuf>,

    /// Replay rate in messages per second (default: as fast as possible)
    #[arg(long, requires = "replay")]
    pub replay_rate: Option<f64>,

    /// Restart the replay when it reaches the end
    #[arg(long, requires = "replay")]
    pub replay_loop: bool,

    /// Simulate the fleet at this many messages per second
    #[arg(long, env = "FLEETVIEW_SIMULATE_RATE")]
    pub simulate_rate: Option<f64>,

    /// Seed for the simulated fleet
    #[arg(long, requires = "simulate_rate")]
    pub seed: Option<u64>,

    /// Stop after this many stream events (0 = unlimited)
    #[arg(long, default_value = "0", env = "FLEETVIEW_MAX_EVENTS")]
    pub max_events: u64,

    /// Run timeout in seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "FLEETVIEW_TIMEOUT")]
    pub timeout: u64,

    /// Validate configuration and exit without running
    #[arg(long)]
    pub dry_run: bool,

    /// Override the ingestion channel capacity
    #[arg(long, env = "FLEETVIEW_BUFFER_SIZE")]
    pub buffer_size: Option<usize>,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "FLEETVIEW_METRICS_PORT")]
    pub metrics_port: u16,

    /// UI action applied after the snapshot loads, as JSON
    /// (e.g. '{"action": "select", "id": 3}'); repeatable
    #[arg(long = "action", value_name = "JSON")]
    pub actions: Vec<String>,

    /// Write the final map scene as JSON to this path
    #[arg(long)]
    pub scene_out: Option<PathBuf>,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "fleetview.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "fleetview.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show the route catalog
    #[arg(long)]
    pub routes: bool,

    /// Show sink configuration
    #[arg(long)]
    pub sinks: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run_overrides() {
        let cli = Cli::try_parse_from([
            "fleetview",
            "-v",
            "run",
            "--config",
            "demo.toml",
            "--replay",
            "stream.jsonl",
            "--replay-rate",
            "20",
            "--action",
            r#"{"action": "zoom_in"}"#,
            "--max-events",
            "50",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 1);
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.config, PathBuf::from("demo.toml"));
        assert_eq!(args.replay_rate, Some(20.0));
        assert_eq!(args.actions.len(), 1);
        assert_eq!(args.max_events, 50);
    }

    #[test]
    fn replay_and_simulation_conflict() {
        let result = Cli::try_parse_from([
            "fleetview",
            "run",
            "--replay",
            "stream.jsonl",
            "--simulate-rate",
            "5",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["fleetview", "-q", "-v", "validate"]).is_err());
    }
}

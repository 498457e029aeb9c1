//! Command-line surface of the `fleet` binary.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};

use crate::logging::Verbosity;

/// fleet - inspect and edit the vehicle fleet from a terminal
#[derive(Debug, Parser)]
#[command(name = "fleet")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to a configuration file (defaults to ./fleet.toml when present)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Base URL of the fleet API, overriding config and environment
    #[arg(long, global = true, value_name = "URL")]
    pub api_base_url: Option<String>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List vehicles with their latest telemetry
    List,

    /// Register a new vehicle
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        code: String,
    },

    /// Rename an existing vehicle
    Update {
        #[arg(long)]
        id: String,
        #[arg(long)]
        name: String,
    },

    /// Show telemetry history for a vehicle (last 12 hours unless a window is given)
    Telemetry {
        #[arg(long)]
        id: String,
        /// Window start, RFC 3339
        #[arg(long, requires = "to")]
        from: Option<DateTime<Utc>>,
        /// Window end, RFC 3339
        #[arg(long, requires = "from")]
        to: Option<DateTime<Utc>>,
    },
}

impl Cli {
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else {
            match self.verbose {
                0 => Verbosity::Normal,
                1 => Verbosity::Verbose,
                _ => Verbosity::Trace,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_telemetry_window_parses() {
        let cli = Cli::try_parse_from([
            "fleet",
            "telemetry",
            "--id",
            "v1",
            "--from",
            "2024-05-01T00:00:00Z",
            "--to",
            "2024-05-01T12:00:00Z",
        ])
        .unwrap();
        match cli.command {
            Command::Telemetry { id, from, to } => {
                assert_eq!(id, "v1");
                assert_eq!(to.unwrap() - from.unwrap(), chrono::Duration::hours(12));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_window_bounds_come_in_pairs() {
        let result =
            Cli::try_parse_from(["fleet", "telemetry", "--id", "v1", "--from", "2024-05-01T00:00:00Z"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_verbosity_flags() {
        let cli = Cli::try_parse_from(["fleet", "-vv", "list"]).unwrap();
        assert_eq!(cli.verbosity(), Verbosity::Trace);
        let cli = Cli::try_parse_from(["fleet", "--quiet", "list"]).unwrap();
        assert_eq!(cli.verbosity(), Verbosity::Quiet);
    }
}

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "gexctl")]
#[command(about = "gexctl - Gamma exposure, walls and options flow from chain snapshots")]
#[command(version = "0.1.0")]
pub struct Cli {
    /// Log output format
    #[arg(long, value_enum, global = true)]
    pub log_format: Option<LogFormatArg>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one analytics cycle per snapshot file and print the reports as JSON
    Analyze {
        /// Path to the configuration file (defaults apply when omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Chain snapshot files
        #[arg(required = true)]
        snapshots: Vec<PathBuf>,

        /// Trading date used for expiration selection (YYYY-MM-DD)
        #[arg(long)]
        as_of: Option<NaiveDate>,

        /// Analyze this expiration instead of the nearest one
        #[arg(long)]
        expiration: Option<NaiveDate>,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Validate configuration without running the engine
    Validate {
        /// Path to the configuration file
        #[arg(short, long, default_value = "gex.yaml")]
        config: PathBuf,
    },

    /// Write a configuration file with all defaults
    Init {
        /// Output path for the new configuration file
        #[arg(short, long, default_value = "gex.yaml")]
        output: PathBuf,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormatArg {
    /// Human-readable with colors
    Pretty,

    /// One JSON object per line
    Json,

    /// Single-line events
    Compact,
}

impl LogFormatArg {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormatArg::Pretty => "pretty",
            LogFormatArg::Json => "json",
            LogFormatArg::Compact => "compact",
        }
    }
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_command_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_analyze() {
        let cli = Cli::try_parse_from([
            "gexctl",
            "--log-format",
            "json",
            "analyze",
            "-c",
            "gex.yaml",
            "aapl.json",
            "spy.json",
            "--as-of",
            "2026-10-19",
            "--pretty",
        ])
        .unwrap();

        assert_eq!(cli.log_format, Some(LogFormatArg::Json));
        match cli.command {
            Commands::Analyze {
                config,
                snapshots,
                as_of,
                expiration,
                pretty,
            } => {
                assert_eq!(config, Some(PathBuf::from("gex.yaml")));
                assert_eq!(snapshots.len(), 2);
                assert_eq!(as_of, NaiveDate::from_ymd_opt(2026, 10, 19));
                assert_eq!(expiration, None);
                assert!(pretty);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_analyze_requires_snapshot() {
        assert!(Cli::try_parse_from(["gexctl", "analyze"]).is_err());
        assert!(Cli::try_parse_from(["gexctl", "analyze", "x.json", "--as-of", "19/10/2026"]).is_err());
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["gexctl", "init"]).unwrap();
        assert_eq!(cli.log_format, None);
        assert!(matches!(cli.command, Commands::Init { output } if output == PathBuf::from("gex.yaml")));
    }
}

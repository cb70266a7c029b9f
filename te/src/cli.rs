//! CLI command definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// taskengine - task lifecycle, dependency and analytics engine
#[derive(Debug, Parser)]
#[command(
    name = "te",
    about = "Task engine with status lifecycle, dependency gating and analytics",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Execute JSON-lines requests, printing one JSON response per line
    Run {
        /// Request file; reads stdin when omitted
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Seed sample tasks and show the lifecycle, listing and analytics
    Demo,

    /// Print the effective configuration as YAML
    Config,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run_with_globals() {
        let cli = Cli::parse_from(["te", "run", "requests.jsonl", "--log-level", "debug", "-c", "te.yml"]);
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert_eq!(cli.config, Some(PathBuf::from("te.yml")));
        match cli.command {
            Command::Run { file } => assert_eq!(file, Some(PathBuf::from("requests.jsonl"))),
            other => panic!("expected Run, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_run_from_stdin() {
        let cli = Cli::parse_from(["te", "run"]);
        assert!(matches!(cli.command, Command::Run { file: None }));
    }
}

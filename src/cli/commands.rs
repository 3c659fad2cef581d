//! CLI command definitions.
//!
//! This module defines all CLI commands and their arguments using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Stackplan - dependency-aware change planning for declared infrastructure.
#[derive(Parser, Debug)]
#[command(name = "stackplan")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the stack document.
    #[arg(short, long, global = true, env = "STACKPLAN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate the stack document.
    Validate,

    /// Compute and display the change set.
    Plan {
        /// Show attribute-level changes.
        #[arg(short, long)]
        detailed: bool,

        /// Exit with status 2 when the plan contains changes.
        #[arg(long)]
        detailed_exitcode: bool,

        /// Maximum number of comparison workers.
        #[arg(long)]
        parallelism: Option<usize>,
    },

    /// Show deployed resources that differ from their declaration.
    Drift,

    /// Print creation and deletion orders.
    Graph,

    /// List registered resource kinds.
    Kinds,

    /// Inspect the state backend.
    State {
        /// State subcommand.
        #[command(subcommand)]
        command: StateCommands,
    },
}

/// State subcommands.
#[derive(Subcommand, Debug)]
pub enum StateCommands {
    /// Summarize the recorded snapshot.
    Show,
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

impl Cli {
    /// Parses CLI arguments from the command line.
    #[must_use]
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plan_flags() {
        let cli = Cli::try_parse_from([
            "stackplan",
            "--output",
            "json",
            "plan",
            "--detailed",
            "--detailed-exitcode",
        ])
        .expect("valid args");

        assert_eq!(cli.output, OutputFormat::Json);
        assert!(matches!(
            cli.command,
            Commands::Plan {
                detailed: true,
                detailed_exitcode: true,
                parallelism: None,
            }
        ));
    }

    #[test]
    fn test_global_options_after_subcommand() {
        let cli = Cli::try_parse_from(["stackplan", "state", "show", "-v", "-c", "stack.yaml"])
            .expect("valid args");

        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("stack.yaml")));
        assert!(matches!(
            cli.command,
            Commands::State {
                command: StateCommands::Show
            }
        ));
    }

    #[test]
    fn test_unknown_subcommand_is_rejected() {
        assert!(Cli::try_parse_from(["stackplan", "apply"]).is_err());
    }
}

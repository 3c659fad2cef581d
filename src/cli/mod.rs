//! CLI module for stackplan.
//!
//! This module provides the command-line interface for validating stack
//! documents and inspecting change plans.

mod commands;
mod output;

pub use commands::{Cli, Commands, OutputFormat, StateCommands};
pub use output::OutputFormatter;

//! CLI interface for Genesis
//!
//! This module provides the command-line interface using clap's derive API.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Genesis autonomous agent
///
/// Sends your request to a language model, runs the tools it asks for and
/// feeds the results back until it has an answer.
#[derive(Parser, Debug)]
#[command(name = "genesis")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log: Option<String>,

    /// Specify alternate configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available commands
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Interactive session (default)
    Chat,

    /// Run one request through the decision loop and exit
    Run {
        /// The task to execute
        task: String,
    },

    /// Show task state, provider availability and recent events
    Status {
        /// Number of recent events to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Return the task state to idle
    Reset,
}

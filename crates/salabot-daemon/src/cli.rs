//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// salabot - meeting room reservations, reminders, and exports
#[derive(Debug, Parser)]
#[command(name = "salabot")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "SALABOT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Path to the reservation store (overrides the config file)
    #[arg(long)]
    pub data_file: Option<PathBuf>,

    /// Seconds between reminder sweeps (overrides the config file)
    #[arg(long)]
    pub sweep_interval_secs: Option<u64>,

    /// Enable debug output
    #[arg(long, short = 'v')]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Render the export artifact once and exit
    Export {
        /// Write to this file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

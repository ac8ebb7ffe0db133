//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::request::OutputResolution;

#[derive(Debug, Parser)]
#[command(name = "pvsim-assembly")]
#[command(about = "Assembles PV design inputs for the production simulation engine", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Validate a configuration file and the credentials it names
    CheckConfig {
        /// Path to the TOML configuration
        #[arg(long)]
        config: PathBuf,
    },
    /// Fetch, resolve and assemble one design
    Assemble {
        /// Path to the TOML configuration
        #[arg(long)]
        config: PathBuf,
        #[arg(long)]
        design_id: String,
        #[arg(long)]
        tenant_id: String,
        /// Analysis period in years
        #[arg(long, default_value_t = 25)]
        years: usize,
        /// Output resolution: year, month or hour
        #[arg(long, default_value = "month")]
        resolution: OutputResolution,
        /// Engine outputs (JSON) to replay; without it only assembly runs
        #[arg(long)]
        outputs: Option<PathBuf>,
        /// Write the assembled parameter set as JSON
        #[arg(long)]
        params_out: Option<PathBuf>,
        /// Write monthly energy for every year as CSV
        #[arg(long)]
        energy_out: Option<PathBuf>,
    },
}

//! Design assembly engine for residential PV and battery production
//! simulation.
#![recursion_limit = "256"]

/// Command-line arguments.
pub mod cli;
pub mod components;
/// TOML configuration and credentials.
pub mod config;
pub mod design;
pub mod error;
pub mod io;
/// Lifetime degradation schedules.
pub mod lifetime;
pub mod report;
pub mod request;
pub mod runner;
/// Parameter groups, engine contract and the assembly orchestrator.
pub mod sim;
pub mod topology;
pub mod weather;

pub use error::{Error, Result};

//! PV design assembly entry point: CLI wiring and collaborator construction.

use std::fs;
use std::io;
use std::path::Path;
use std::process;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use pvsim_assembly::cli::{Cli, Command};
use pvsim_assembly::config::{AppConfig, Credentials};
use pvsim_assembly::io::export::export_energy_csv;
use pvsim_assembly::request::{OutputResolution, SimulationRequest};
use pvsim_assembly::runner::{HttpCollaborators, run_simulation};
use pvsim_assembly::sim::{Orchestrator, ReplayEngine, Settings};

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("error: {message}");
    process::exit(1);
}

/// Loads and validates the configuration, exiting on any error.
fn load_config(path: &Path) -> AppConfig {
    let config = AppConfig::from_toml_file(path).unwrap_or_else(|e| fail(e));
    let errors = config.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{e}");
        }
        process::exit(1);
    }
    config
}

fn load_credentials(config: &AppConfig) -> Credentials {
    config.credentials().unwrap_or_else(|errors| {
        for e in &errors {
            eprintln!("{e}");
        }
        process::exit(1);
    })
}

fn write_json(path: &Path, value: &impl serde::Serialize) {
    let json = serde_json::to_string_pretty(value).unwrap_or_else(|e| fail(e));
    fs::write(path, json).unwrap_or_else(|e| fail(format!("cannot write {}: {e}", path.display())));
    eprintln!("Written {}", path.display());
}

#[expect(clippy::too_many_arguments)]
fn assemble(
    config_path: &Path,
    design_id: &str,
    tenant_id: &str,
    years: usize,
    resolution: OutputResolution,
    outputs: Option<&Path>,
    params_out: Option<&Path>,
    energy_out: Option<&Path>,
) {
    let config = load_config(config_path);
    let credentials = load_credentials(&config);

    let request = SimulationRequest::new(tenant_id, design_id, years, resolution);
    let target = request.to_target().unwrap_or_else(|e| fail(e));

    let collaborators = HttpCollaborators::connect(&config, &credentials).unwrap_or_else(|e| fail(e));
    let sources = collaborators.sources();
    let settings = Settings::from_config(&config);

    let Some(outputs_path) = outputs else {
        // Dry run: assemble against a recording engine and stop.
        let mut orchestrator = Orchestrator::new(ReplayEngine::recording(), settings);
        let plan = orchestrator
            .prepare(&sources, &target)
            .unwrap_or_else(|e| fail(e));
        let params = plan.parameters();
        orchestrator.assemble(plan).unwrap_or_else(|e| fail(e));
        for (category, status) in orchestrator.statuses().iter() {
            println!("{:<18} {:>2}", category.as_str(), status.code());
        }
        if let Some(path) = params_out {
            write_json(path, &params);
        }
        return;
    };

    let engine = ReplayEngine::from_json_file(outputs_path).unwrap_or_else(|e| fail(e));
    let mut orchestrator = Orchestrator::new(engine, settings);
    let report =
        run_simulation(&mut orchestrator, &sources, &request).unwrap_or_else(|e| fail(e));

    let stdout = io::stdout();
    serde_json::to_writer_pretty(stdout.lock(), &report).unwrap_or_else(|e| fail(e));
    println!();

    if let Some(path) = params_out {
        if let Some(plan) = orchestrator.plan() {
            write_json(path, &plan.parameters());
        }
    }
    if let Some(path) = energy_out {
        let energy = orchestrator.energy().unwrap_or_else(|e| fail(e));
        if let Err(e) = export_energy_csv(&energy, path) {
            fail(format!("failed to write CSV: {e}"));
        }
        eprintln!("Energy written to {}", path.display());
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::CheckConfig { config } => {
            let config = load_config(&config);
            load_credentials(&config);
            info!("configuration valid");
            println!("configuration OK");
        }
        Command::Assemble {
            config,
            design_id,
            tenant_id,
            years,
            resolution,
            outputs,
            params_out,
            energy_out,
        } => assemble(
            &config,
            &design_id,
            &tenant_id,
            years,
            resolution,
            outputs.as_deref(),
            params_out.as_deref(),
            energy_out.as_deref(),
        ),
    }
}

//! `landalloc`: run a claim-constrained land-use allocation from a JSON
//! scenario file, or the built-in demo scenario.

mod scenario;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use landalloc_core::{
    allocate, allocate_into, Allocation, AllocationConfig, AllocationReport, Grid, LanduseCode,
    UNASSIGNED,
};

use scenario::Scenario;

#[derive(Parser, Debug)]
#[command(name = "landalloc", about = "Claim-constrained land-use allocation on raster grids")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Allocate a JSON scenario file.
    Run {
        /// Scenario with grids, categories, claims and an optional config.
        #[arg(short, long)]
        scenario: PathBuf,

        /// Config file; replaces the config embedded in the scenario.
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Write the output grid and report here as JSON.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Allocate the built-in 4×6 demo scenario and print the resulting map.
    Demo {
        /// Break suitability ties with seeded noise.
        #[arg(long)]
        noise: bool,
    },
}

#[derive(Serialize)]
struct RunOutput<'a> {
    output: &'a Grid<LanduseCode>,
    report: &'a AllocationReport,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match args.command {
        Command::Run { scenario, config, output } => {
            run(&scenario, config.as_deref(), output.as_deref())
        }
        Command::Demo { noise } => demo(noise),
    }
}

fn run(scenario_path: &Path, config_path: Option<&Path>, output_path: Option<&Path>) -> Result<()> {
    let scenario = Scenario::from_file(scenario_path)?;
    let config = match config_path {
        Some(p) => AllocationConfig::from_file(p)
            .with_context(|| format!("Cannot load config {}", p.display()))?,
        None => scenario.config.clone(),
    };

    eprintln!("[landalloc] Scenario: {}", scenario_path.display());
    let allocation = execute(&scenario, &config)?;
    print_report(&allocation.report);

    if let Some(path) = output_path {
        let json = serde_json::to_string_pretty(&RunOutput {
            output: &allocation.output,
            report: &allocation.report,
        })
        .context("Failed to serialise allocation")?;
        std::fs::write(path, json).with_context(|| format!("Write failed: {}", path.display()))?;
        eprintln!("[landalloc] Wrote {}", path.display());
    }
    Ok(())
}

fn demo(noise: bool) -> Result<()> {
    let mut scenario = scenario::demo()?;
    scenario.config.use_noise = noise;
    let config = scenario.config.clone();
    let allocation = execute(&scenario, &config)?;
    print_map(&allocation.output);
    print_report(&allocation.report);
    Ok(())
}

/// Allocate onto the scenario's pre-seeded output when it has one.
fn execute(scenario: &Scenario, config: &AllocationConfig) -> Result<Allocation> {
    let catalog = scenario.catalog(config)?;
    let priority = scenario.priority();
    let inputs = scenario.inputs();
    let allocation = match &scenario.preassigned {
        Some(seed) => {
            let mut output = seed.clone();
            let report = allocate_into(&mut output, &priority, &catalog, &inputs, config)?;
            Allocation { output, report }
        }
        None => allocate(&priority, &catalog, &inputs, config)?,
    };
    Ok(allocation)
}

fn print_map(output: &Grid<LanduseCode>) {
    eprintln!("\nAllocation map (north up, '.' = unassigned):");
    for row in output.data().chunks(output.nr_cols()) {
        let cells: Vec<String> = row
            .iter()
            .map(|&c| if c == UNASSIGNED { ".".to_string() } else { c.to_string() })
            .collect();
        eprintln!("  {}", cells.join(" "));
    }
}

fn print_report(report: &AllocationReport) {
    eprintln!(
        "\n{:<6} {:<16} {:>12} {:>12} {:>8}",
        "code", "name", "claimed km²", "allocated", "cells"
    );
    eprintln!("{}", "─".repeat(58));
    for c in &report.categories {
        if c.skipped {
            eprintln!("{:<6} {:<16} {:>12} {:>12} {:>8}", c.code, c.name, "-", "skipped", "-");
            continue;
        }
        eprintln!(
            "{:<6} {:<16} {:>12.3} {:>12.3} {:>8}",
            c.code, c.name, c.claimed_km2, c.allocated_km2, c.cells
        );
    }
    eprintln!(
        "\nregions: {}  preassigned cells: {}  unassigned cells: {}",
        report.regions.len(),
        report.preassigned_cells,
        report.unassigned_cells
    );

    if !report.diagnostics.is_empty() {
        eprintln!("\nDiagnostics:");
        for d in &report.diagnostics {
            eprintln!("  - {d}");
        }
    }
}

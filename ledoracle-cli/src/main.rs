//! LedOracle CLI — run, sweep, and validate oracle scenarios.
//!
//! Commands:
//! - `run` — execute one scenario from a TOML file and save its artifacts
//! - `sweep` — Monte Carlo sweep of a volatility scenario over its `[sweep]` grid
//! - `validate` — parse a scenario, build its model, and print the stage table

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

use ledoracle_core::StageEngine;
use ledoracle_runner::{
    export_sweep_csv, load_series, run_from_config, save_artifacts, sweep_scenario, RunResult,
    ScenarioConfig, SweepResults,
};

#[derive(Parser)]
#[command(
    name = "ledoracle",
    about = "LedOracle CLI — BTC energy-cost price oracle simulator"
)]
struct Cli {
    /// Log at debug level (overridden by RUST_LOG).
    #[arg(long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute one scenario and save manifest, summary, and trajectory.
    Run {
        /// Path to a TOML scenario file.
        #[arg(long)]
        config: PathBuf,

        /// Output directory for run artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,

        /// Override `[engine] timesteps`.
        #[arg(long)]
        timesteps: Option<u64>,

        /// Override the scenario seed.
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Monte Carlo sweep of a volatility scenario.
    Sweep {
        /// Path to a TOML scenario file with a VOLATILITY model.
        #[arg(long)]
        config: PathBuf,

        /// Override `[sweep] runs_per_point`.
        #[arg(long)]
        runs: Option<u32>,

        /// Run on a single thread.
        #[arg(long, default_value_t = false)]
        sequential: bool,

        /// Write one CSV row per run to this file.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Parse a scenario, build its model, and print the stage table.
    Validate {
        /// Path to a TOML scenario file.
        #[arg(long)]
        config: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run {
            config,
            output_dir,
            timesteps,
            seed,
        } => run_scenario_cmd(&config, &output_dir, timesteps, seed),
        Commands::Sweep {
            config,
            runs,
            sequential,
            output,
        } => run_sweep_cmd(&config, runs, sequential, output.as_deref()),
        Commands::Validate { config } => run_validate(&config),
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_scenario(path: &Path) -> Result<ScenarioConfig> {
    ScenarioConfig::load(path)
        .with_context(|| format!("failed to load scenario {}", path.display()))
}

fn run_scenario_cmd(
    config_path: &Path,
    output_dir: &Path,
    timesteps: Option<u64>,
    seed: Option<u64>,
) -> Result<()> {
    let mut config = load_scenario(config_path)?;
    if let Some(timesteps) = timesteps {
        config.engine.timesteps = timesteps;
    }
    if let Some(seed) = seed {
        config.seed = seed;
    }

    let result = run_from_config(&config)?;
    print_summary(&result);

    let run_dir = save_artifacts(&result, output_dir)?;
    println!("Artifacts saved to: {}", run_dir.display());

    Ok(())
}

fn run_sweep_cmd(
    config_path: &Path,
    runs: Option<u32>,
    sequential: bool,
    output: Option<&Path>,
) -> Result<()> {
    let mut config = load_scenario(config_path)?;
    let mut sweep = config.sweep.take().unwrap_or_default();
    if let Some(runs) = runs {
        sweep.runs_per_point = runs;
    }
    if sequential {
        sweep.parallel = false;
    }
    config.sweep = Some(sweep);

    let results = sweep_scenario(&config)?;
    print_sweep(&results);

    if let Some(path) = output {
        let csv = export_sweep_csv(&results)?;
        std::fs::write(path, csv)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("Sweep table saved to: {}", path.display());
    }

    Ok(())
}

fn run_validate(config_path: &Path) -> Result<()> {
    let config = load_scenario(config_path)?;
    config.validate()?;

    let series = match (&config.data, config.model.needs_data()) {
        (Some(data), true) => Some(load_series(data)?.series),
        _ => None,
    };
    let model = config.build_model(series)?;
    let initial = model.initial_state();
    let engine = StageEngine::new(model.build_stages(&initial)?, &initial)?;
    info!(model = model.name(), stages = engine.stages().len(), "scenario is valid");

    println!();
    println!("=== Scenario ===");
    println!("Name:           {}", config.name.as_deref().unwrap_or("-"));
    println!("Model:          {}", model.name());
    println!("Run ID:         {}", config.run_id()?);
    println!(
        "Timesteps:      {} ({} substeps each)",
        config.engine.timesteps, config.engine.substeps_per_timestep
    );
    if let Some(max) = model.max_timesteps() {
        println!("Max timesteps:  {max}");
    }
    println!();
    println!("--- Constants ---");
    for (name, value) in model.constants().iter() {
        println!("{name:<24}{value}");
    }
    println!();
    println!("--- Stages ---");
    for (index, stage) in engine.stages().iter().enumerate() {
        let owned: Vec<&str> = stage.owned_variables().collect();
        println!("{index}. {:<12} -> {}", stage.name(), owned.join(", "));
    }

    Ok(())
}

fn print_summary(result: &RunResult) {
    let manifest = &result.manifest;
    println!();
    println!("=== Oracle Run ===");
    println!("Model:          {}", manifest.model);
    println!("Run ID:         {}", manifest.run_id);
    println!("Seed:           {}", manifest.seed);
    println!(
        "Timesteps:      {} ({} substeps each)",
        manifest.timesteps, manifest.substeps_per_timestep
    );
    if let Some(hash) = &manifest.dataset_hash {
        println!("Dataset:        {hash}");
    }
    println!();
    println!("--- LED Price ---");
    match result.summary.led_price() {
        Some(led) => {
            println!("Initial:        {:.6}", led.first);
            println!("Final:          {:.6}", led.last);
            println!("Min / Max:      {:.6} / {:.6}", led.min, led.max);
            println!("Mean:           {:.6}", led.mean);
            println!("Std Dev:        {:.6}", led.std_dev);
            println!("Max Step:       {:.6}", led.max_abs_step);
            println!(
                "Settled at:     t={} (within {:.2}%)",
                led.settle_timestep,
                result.summary.settle_tolerance * 100.0
            );
        }
        None => println!("(led_price not recorded)"),
    }
}

fn print_sweep(results: &SweepResults) {
    println!();
    println!("=== Sweep ===");
    println!("Runs:           {}", results.len());
    println!("Failures:       {}", results.failures().count());
    println!();
    println!(
        "{:>5} {:>10} {:>10} {:>10} {:>10} {:>14} {:>12}",
        "point", "diff_vol", "price_vol", "diff_tr", "price_tr", "mean_final", "std_final"
    );
    for stats in results.point_stats() {
        println!(
            "{:>5} {:>10.4} {:>10.4} {:>10.4} {:>10.4} {:>14.6} {:>12.6}",
            stats.point,
            stats.params.diff_vol_std_dev,
            stats.params.price_vol_std_dev,
            stats.params.diff_trend,
            stats.params.price_trend,
            stats.mean_final_led_price,
            stats.std_final_led_price,
        );
    }
    for run in results.failures() {
        if let Some(error) = &run.error {
            eprintln!("WARNING: point {} run {}: {error}", run.point, run.repetition);
        }
    }
}

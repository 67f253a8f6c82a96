//! LED Oracle Runner — scenario orchestration, data loading, sweeps, export.
//!
//! This crate builds on `ledoracle-core` to provide:
//! - TOML scenario files selecting a model and its parameters
//! - Historical series loading from CSV with dataset fingerprinting
//! - Single-run execution with manifest and trajectory summary
//! - Seeded Monte Carlo sweeps over volatility parameters
//! - JSON and CSV artifact export

pub mod config;
pub mod data_loader;
pub mod export;
pub mod metrics;
pub mod runner;
pub mod sweep;

pub use config::{DataConfig, ModelConfig, RunId, ScenarioConfig, ScenarioError};
pub use data_loader::{compute_dataset_hash, load_column, load_series, LoadError, LoadedSeries};
pub use export::{
    export_json, export_sweep_csv, export_trajectory_csv, import_json, load_artifacts,
    save_artifacts,
};
pub use metrics::{TrajectorySummary, VariableSummary, DEFAULT_SETTLE_TOLERANCE};
pub use runner::{
    run_from_config, run_scenario, RunManifest, RunResult, RunnerError, SCHEMA_VERSION,
};
pub use sweep::{
    run_sweep, sweep_scenario, PointStats, SweepConfig, SweepResults, SweepRun, VolatilityGrid,
};

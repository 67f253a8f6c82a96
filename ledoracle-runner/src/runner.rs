//! Scenario runner — wires together configuration, data, engine, and metrics.
//!
//! Two entry points:
//! - `run_scenario()`: takes a scenario plus pre-loaded series. No I/O.
//! - `run_from_config()`: loads the series named in `[data]`, then runs. Used by the CLI.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use ledoracle_core::{Constants, RunError, Trajectory};

use crate::config::{RunId, ScenarioConfig, ScenarioError};
use crate::data_loader::{load_series, LoadError, LoadedSeries};
use crate::metrics::{TrajectorySummary, DEFAULT_SETTLE_TOLERANCE};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("scenario error: {0}")]
    Scenario(#[from] ScenarioError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("run failed: {0}")]
    Run(#[from] RunError),
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Provenance of one run: everything needed to reproduce it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: RunId,
    pub scenario_name: Option<String>,
    pub model: String,
    pub constants: Constants,
    pub seed: u64,
    pub timesteps: u64,
    pub substeps_per_timestep: u32,
    /// Present only for models driven by recorded data.
    pub dataset_hash: Option<String>,
    pub generated_at: DateTime<Utc>,
}

/// Default schema version for serde deserialization of older JSON without the field.
fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Complete result of a single scenario run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub manifest: RunManifest,
    pub summary: TrajectorySummary,
    pub trajectory: Trajectory,
}

/// Run a scenario with pre-loaded data — no I/O.
///
/// `series` must be present for the historical model and is ignored by the
/// synthetic ones.
pub fn run_scenario(
    config: &ScenarioConfig,
    series: Option<&LoadedSeries>,
) -> Result<RunResult, RunnerError> {
    config.validate()?;

    let model = config.build_model(series.map(|s| s.series.clone()))?;
    let trajectory = ledoracle_core::run(model.as_ref(), &config.engine)?;

    let settle_tolerance = config
        .sweep
        .as_ref()
        .map_or(DEFAULT_SETTLE_TOLERANCE, |s| s.settle_tolerance);
    let summary = TrajectorySummary::from_trajectory(&trajectory, settle_tolerance);

    let manifest = RunManifest {
        schema_version: SCHEMA_VERSION,
        run_id: config.run_id()?,
        scenario_name: config.name.clone(),
        model: model.name().to_string(),
        constants: model.constants(),
        seed: config.seed,
        timesteps: config.engine.timesteps,
        substeps_per_timestep: config.engine.substeps_per_timestep,
        dataset_hash: if config.model.needs_data() {
            series.map(|s| s.dataset_hash.clone())
        } else {
            None
        },
        generated_at: Utc::now(),
    };

    if let Some(led) = summary.led_price() {
        info!(
            model = %manifest.model,
            timesteps = manifest.timesteps,
            final_led_price = led.last,
            "scenario complete"
        );
    }

    Ok(RunResult {
        manifest,
        summary,
        trajectory,
    })
}

/// Run a scenario, loading its `[data]` files first if the model needs them.
pub fn run_from_config(config: &ScenarioConfig) -> Result<RunResult, RunnerError> {
    config.validate()?;
    let loaded = match (&config.data, config.model.needs_data()) {
        (Some(data), true) => Some(load_series(data)?),
        _ => None,
    };
    run_scenario(config, loaded.as_ref())
}

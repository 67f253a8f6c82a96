//! Monte-Carlo parameter sweep for the volatility model.
//!
//! A grid of volatility parameters is expanded into points; every point is
//! run `runs_per_point` times with independently derived seeds. Runs are
//! independent, so they execute in parallel with rayon unless disabled.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use ledoracle_core::rng::RngHierarchy;
use ledoracle_core::{run, EngineConfig, VolatilityModel, VolatilityParams};

use crate::config::{ModelConfig, ScenarioConfig, ScenarioError};
use crate::metrics::{mean_f64, std_dev, TrajectorySummary, DEFAULT_SETTLE_TOLERANCE};

/// Sub-seed stream name for per-run seeds.
const RUN_SEED_STREAM: &str = "run";

/// Parameter grid specification.
///
/// An empty axis keeps the base scenario's value for that parameter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolatilityGrid {
    pub diff_vol_std_dev: Vec<f64>,
    pub price_vol_std_dev: Vec<f64>,
    pub diff_trend: Vec<f64>,
    pub price_trend: Vec<f64>,
}

impl VolatilityGrid {
    /// Returns the total number of points in this grid.
    pub fn size(&self) -> usize {
        [
            &self.diff_vol_std_dev,
            &self.price_vol_std_dev,
            &self.diff_trend,
            &self.price_trend,
        ]
        .iter()
        .map(|axis| axis.len().max(1))
        .product()
    }

    /// Generates all parameter sets in the grid, base values filling empty axes.
    pub fn points(&self, base: &VolatilityParams) -> Vec<VolatilityParams> {
        let mut points = Vec::with_capacity(self.size());

        for &diff_vol_std_dev in &axis(&self.diff_vol_std_dev, base.diff_vol_std_dev) {
            for &price_vol_std_dev in &axis(&self.price_vol_std_dev, base.price_vol_std_dev) {
                for &diff_trend in &axis(&self.diff_trend, base.diff_trend) {
                    for &price_trend in &axis(&self.price_trend, base.price_trend) {
                        points.push(VolatilityParams {
                            diff_vol_std_dev,
                            price_vol_std_dev,
                            diff_trend,
                            price_trend,
                            ..*base
                        });
                    }
                }
            }
        }

        points
    }
}

fn axis(values: &[f64], base: f64) -> Vec<f64> {
    if values.is_empty() {
        vec![base]
    } else {
        values.to_vec()
    }
}

fn default_runs_per_point() -> u32 {
    10
}

fn default_parallel() -> bool {
    true
}

fn default_settle_tolerance() -> f64 {
    DEFAULT_SETTLE_TOLERANCE
}

/// Sweep settings, read from the `[sweep]` table of a scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepConfig {
    #[serde(default = "default_runs_per_point")]
    pub runs_per_point: u32,
    #[serde(default = "default_parallel")]
    pub parallel: bool,
    #[serde(default = "default_settle_tolerance")]
    pub settle_tolerance: f64,
    #[serde(default)]
    pub grid: VolatilityGrid,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            runs_per_point: default_runs_per_point(),
            parallel: default_parallel(),
            settle_tolerance: default_settle_tolerance(),
            grid: VolatilityGrid::default(),
        }
    }
}

impl SweepConfig {
    pub fn validate(&self) -> Result<(), ScenarioError> {
        if self.runs_per_point == 0 {
            return Err(ScenarioError::InvalidSweep("runs_per_point must be at least 1"));
        }
        if !(self.settle_tolerance.is_finite() && self.settle_tolerance >= 0.0) {
            return Err(ScenarioError::InvalidSweep(
                "settle_tolerance must be finite and non-negative",
            ));
        }
        Ok(())
    }
}

/// One Monte-Carlo repetition of one grid point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepRun {
    pub point: usize,
    pub repetition: u32,
    pub seed: u64,
    pub params: VolatilityParams,
    pub summary: Option<TrajectorySummary>,
    /// Set when the run failed; the sweep carries on.
    pub error: Option<String>,
}

impl SweepRun {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn final_led_price(&self) -> Option<f64> {
        self.summary.as_ref()?.led_price().map(|s| s.last)
    }
}

/// Aggregate over the repetitions of one grid point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointStats {
    pub point: usize,
    pub params: VolatilityParams,
    pub runs: usize,
    pub failures: usize,
    pub mean_final_led_price: f64,
    /// Spread of the final led_price across repetitions.
    pub std_final_led_price: f64,
    /// Mean of each run's own led_price standard deviation.
    pub mean_led_price_std_dev: f64,
}

/// Results from a parameter sweep, in (point, repetition) order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepResults {
    runs: Vec<SweepRun>,
}

impl SweepResults {
    /// Returns all runs as a slice.
    pub fn runs(&self) -> &[SweepRun] {
        &self.runs
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    pub fn failures(&self) -> impl Iterator<Item = &SweepRun> {
        self.runs.iter().filter(|r| !r.is_ok())
    }

    /// Per-point statistics over successful repetitions.
    pub fn point_stats(&self) -> Vec<PointStats> {
        let mut stats: Vec<PointStats> = Vec::new();
        let mut start = 0;
        while start < self.runs.len() {
            let point = self.runs[start].point;
            let end = self.runs[start..]
                .iter()
                .position(|r| r.point != point)
                .map_or(self.runs.len(), |offset| start + offset);
            let group = &self.runs[start..end];

            let finals: Vec<f64> = group.iter().filter_map(SweepRun::final_led_price).collect();
            let spreads: Vec<f64> = group
                .iter()
                .filter_map(|r| r.summary.as_ref()?.led_price().map(|s| s.std_dev))
                .collect();

            stats.push(PointStats {
                point,
                params: group[0].params,
                runs: group.len(),
                failures: group.iter().filter(|r| !r.is_ok()).count(),
                mean_final_led_price: mean_f64(&finals),
                std_final_led_price: std_dev(&finals),
                mean_led_price_std_dev: mean_f64(&spreads),
            });
            start = end;
        }
        stats
    }
}

/// Executes a sweep over `sweep.grid` around `base`.
///
/// Run `i` (counting across all points) is seeded with the `"run"` sub-seed
/// `i` of `master_seed`, so results do not depend on thread scheduling.
pub fn run_sweep(
    base: &VolatilityParams,
    engine: &EngineConfig,
    master_seed: u64,
    sweep: &SweepConfig,
) -> Result<SweepResults, ScenarioError> {
    sweep.validate()?;
    engine.validate()?;
    base.validate()?;

    let seeds = RngHierarchy::new(master_seed);
    let jobs: Vec<(usize, u32, VolatilityParams, u64)> = sweep
        .grid
        .points(base)
        .into_iter()
        .enumerate()
        .flat_map(|(point, params)| {
            (0..sweep.runs_per_point).map(move |repetition| (point, repetition, params))
        })
        .enumerate()
        .map(|(index, (point, repetition, params))| {
            (point, repetition, params, seeds.sub_seed(RUN_SEED_STREAM, index as u64))
        })
        .collect();

    info!(
        points = sweep.grid.size(),
        runs = jobs.len(),
        parallel = sweep.parallel,
        "starting sweep"
    );

    let execute = |&(point, repetition, params, seed): &(usize, u32, VolatilityParams, u64)| {
        execute_run(point, repetition, params, seed, engine, sweep.settle_tolerance)
    };
    let runs: Vec<SweepRun> = if sweep.parallel {
        jobs.par_iter().map(execute).collect()
    } else {
        jobs.iter().map(execute).collect()
    };

    let results = SweepResults { runs };
    info!(
        runs = results.len(),
        failures = results.failures().count(),
        "sweep finished"
    );
    Ok(results)
}

/// Sweep the scenario's own volatility model with its `[sweep]` settings
/// (or the defaults if the table is absent).
pub fn sweep_scenario(config: &ScenarioConfig) -> Result<SweepResults, ScenarioError> {
    let ModelConfig::Volatility(base) = &config.model else {
        return Err(ScenarioError::SweepUnsupported(config.model.name()));
    };
    let sweep = config.sweep.clone().unwrap_or_default();
    run_sweep(base, &config.engine, config.seed, &sweep)
}

fn execute_run(
    point: usize,
    repetition: u32,
    params: VolatilityParams,
    seed: u64,
    engine: &EngineConfig,
    settle_tolerance: f64,
) -> SweepRun {
    let outcome = VolatilityModel::new(params, seed)
        .map_err(|e| e.to_string())
        .and_then(|model| run(&model, engine).map_err(|e| e.to_string()))
        .map(|trajectory| TrajectorySummary::from_trajectory(&trajectory, settle_tolerance));

    let (summary, error) = match outcome {
        Ok(summary) => (Some(summary), None),
        Err(error) => {
            warn!(point, repetition, seed, %error, "sweep run failed");
            (None, Some(error))
        }
    };

    SweepRun {
        point,
        repetition,
        seed,
        params,
        summary,
        error,
    }
}

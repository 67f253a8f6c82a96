//! Trajectory summary statistics.
//!
//! All statistics are computed from a finished `Trajectory`; nothing here
//! feeds back into the simulation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use ledoracle_core::domain::{keys, Trajectory, VariableSeries};

/// Relative band around the final value that counts as settled.
pub const DEFAULT_SETTLE_TOLERANCE: f64 = 0.01;

/// Per-variable KPIs over one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableSummary {
    pub first: f64,
    pub last: f64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// Sample standard deviation (n - 1); 0 for fewer than two values.
    pub std_dev: f64,
    /// Largest absolute change between consecutive timesteps.
    pub max_abs_step: f64,
    /// First timestep after which the value stays within
    /// `tolerance * |last|` of the final value.
    pub settle_timestep: u64,
}

impl VariableSummary {
    /// Summarize one projected series. Returns `None` if the variable never
    /// appears in the trajectory.
    pub fn compute(series: VariableSeries<'_>, tolerance: f64) -> Option<Self> {
        let points: Vec<(u64, f64)> = series.iter().collect();
        let values: Vec<f64> = points.iter().map(|&(_, v)| v).collect();
        let (&first, &last) = (values.first()?, values.last()?);

        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let max_abs_step = values
            .windows(2)
            .map(|w| (w[1] - w[0]).abs())
            .fold(0.0, f64::max);

        let band = tolerance * last.abs();
        let settle_timestep = points
            .iter()
            .rev()
            .take_while(|&&(_, v)| (v - last).abs() <= band)
            .last()
            .map(|&(t, _)| t)
            .unwrap_or_default();

        Some(Self {
            first,
            last,
            min,
            max,
            mean: mean_f64(&values),
            std_dev: std_dev(&values),
            max_abs_step,
            settle_timestep,
        })
    }
}

/// KPIs for every variable of a run, keyed by variable name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectorySummary {
    pub timesteps: u64,
    pub settle_tolerance: f64,
    pub variables: BTreeMap<String, VariableSummary>,
}

impl TrajectorySummary {
    pub fn from_trajectory(trajectory: &Trajectory, settle_tolerance: f64) -> Self {
        let variables = trajectory
            .variables()
            .into_iter()
            .filter_map(|name| {
                let summary = VariableSummary::compute(trajectory.series(&name), settle_tolerance)?;
                Some((name, summary))
            })
            .collect();

        Self {
            timesteps: trajectory.len().saturating_sub(1) as u64,
            settle_tolerance,
            variables,
        }
    }

    pub fn get(&self, variable: &str) -> Option<&VariableSummary> {
        self.variables.get(variable)
    }

    /// The oracle output.
    pub fn led_price(&self) -> Option<&VariableSummary> {
        self.get(keys::LED_PRICE)
    }
}

pub(crate) fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(values);
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledoracle_core::{run, EngineConfig, PriceSpikeModel, PriceSpikeParams};

    fn spike_trajectory(timesteps: u64) -> Trajectory {
        let model = PriceSpikeModel::new(PriceSpikeParams {
            btc_price: 100.0,
            ..PriceSpikeParams::default()
        })
        .unwrap();
        run(&model, &EngineConfig::new(timesteps)).unwrap()
    }

    #[test]
    fn test_mean_and_std_dev() {
        assert_eq!(mean_f64(&[]), 0.0);
        assert_eq!(std_dev(&[5.0]), 0.0);
        assert_eq!(mean_f64(&[1.0, 2.0, 3.0]), 2.0);
        assert_eq!(std_dev(&[1.0, 2.0, 3.0]), 1.0);
    }

    #[test]
    fn test_held_price_summary() {
        let traj = spike_trajectory(10);
        let summary = TrajectorySummary::from_trajectory(&traj, DEFAULT_SETTLE_TOLERANCE);
        let price = summary.get(keys::BTC_PRICE).unwrap();
        assert_eq!(summary.timesteps, 10);
        assert_eq!((price.min, price.max), (100.0, 100.0));
        assert_eq!(price.std_dev, 0.0);
        assert_eq!(price.max_abs_step, 0.0);
        assert_eq!(price.settle_timestep, 0);
    }

    #[test]
    fn test_converging_difficulty_settles() {
        let traj = spike_trajectory(20);
        let summary = TrajectorySummary::from_trajectory(&traj, DEFAULT_SETTLE_TOLERANCE);
        let diff = summary.get(keys::BTC_DIFF).unwrap();
        assert_eq!(diff.first, 1.0);
        // Gap shrinks by 0.3 per step; the first jump is the largest.
        assert_eq!(diff.max_abs_step, (100.0 - 1.0) * 0.7);
        assert!(diff.settle_timestep > 0 && diff.settle_timestep < 20);
        assert!(summary.led_price().is_some());
    }

    #[test]
    fn test_every_variable_summarized() {
        let traj = spike_trajectory(3);
        let summary = TrajectorySummary::from_trajectory(&traj, DEFAULT_SETTLE_TOLERANCE);
        for variable in keys::ORACLE_VARIABLES {
            assert!(summary.get(variable).is_some(), "missing {variable}");
        }
        assert!(summary.get(keys::TIMESTEP).is_none());
    }
}

//! Historical model — replays recorded difficulty, price and block reward.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::domain::{keys, HistoricalSeries, State};
use crate::engine::{Policy, Stage};
use crate::error::ConfigError;

use super::stages::{self, input, KdiffDecay};
use super::{
    require_positive, Constants, FilterSeeding, Model, SmoothingParams,
    DEFAULT_KOOMEY_PERIOD_IN_HOURS,
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoricalParams {
    pub koomey_period_in_hours: f64,
    pub smoothing: SmoothingParams,
    pub seeding: FilterSeeding,
}

impl Default for HistoricalParams {
    fn default() -> Self {
        Self {
            koomey_period_in_hours: DEFAULT_KOOMEY_PERIOD_IN_HOURS,
            smoothing: SmoothingParams::default(),
            seeding: FilterSeeding::ColdStart,
        }
    }
}

impl HistoricalParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_positive("koomey_period_in_hours", self.koomey_period_in_hours)?;
        self.smoothing.validate()
    }
}

/// Oracle driven by recorded series. At timestep `t` the source stage reads
/// index `t` of each series, so a run may last at most `len - 1` timesteps.
///
/// `led_price` is normalised so that the first recorded revenue over the
/// first halved difficulty maps to 1.
#[derive(Debug, Clone)]
pub struct HistoricalModel {
    series: Arc<HistoricalSeries>,
    params: HistoricalParams,
    scaling_factor: f64,
}

impl HistoricalModel {
    pub fn new(
        series: impl Into<Arc<HistoricalSeries>>,
        params: HistoricalParams,
    ) -> Result<Self, ConfigError> {
        params.validate()?;
        let series = series.into();

        let half_diff = (series.difficulty()[0] / 2.0).floor();
        let scaling_factor = series.price()[0] * series.blockreward()[0] / half_diff;
        if !scaling_factor.is_finite() || scaling_factor == 0.0 {
            return Err(ConfigError::InvalidScalingFactor(scaling_factor));
        }

        Ok(Self {
            series,
            params,
            scaling_factor,
        })
    }

    pub fn series(&self) -> &HistoricalSeries {
        &self.series
    }

    pub fn params(&self) -> &HistoricalParams {
        &self.params
    }

    pub fn scaling_factor(&self) -> f64 {
        self.scaling_factor
    }
}

impl Model for HistoricalModel {
    fn name(&self) -> &'static str {
        "historical"
    }

    fn constants(&self) -> Constants {
        Constants::new()
            .with("koomey_period_in_hours", self.params.koomey_period_in_hours)
            .with("diff_smoothing_factor", self.params.smoothing.diff_smoothing_factor)
            .with("price_smoothing_factor", self.params.smoothing.price_smoothing_factor)
            .with("scaling_factor", self.scaling_factor)
    }

    fn initial_state(&self) -> State {
        let diff = self.series.difficulty()[0];
        let price = self.series.price()[0];
        let reward = self.series.blockreward()[0];
        let half_diff = (diff / 2.0).floor();
        State::new()
            .with(keys::BTC_DIFF, diff)
            .with(keys::BTC_PRICE, price)
            .with(keys::BTC_BLOCKREWARD, reward)
            .with(keys::KDIFF, half_diff)
            .with(keys::KDIFF_SMOOTHED, half_diff)
            .with(keys::BLOCKREWARD_SMOOTHED, price * reward)
            .with(keys::LED_PRICE, 1.0)
    }

    fn build_stages(&self, initial_state: &State) -> Result<Vec<Stage>, ConfigError> {
        let diff = Arc::clone(&self.series);
        let price = Arc::clone(&self.series);
        let reward = Arc::clone(&self.series);

        let source = stages::source_stage(
            Policy::single(keys::BTC_DIFF, &[keys::TIMESTEP], input::NEW_BTC_DIFF, move |s| {
                diff.difficulty_at(s.timestep())
            }),
            Policy::single(keys::BTC_PRICE, &[keys::TIMESTEP], input::NEW_BTC_PRICE, move |s| {
                price.price_at(s.timestep())
            }),
            Policy::single(
                keys::BTC_BLOCKREWARD,
                &[keys::TIMESTEP],
                input::NEW_BTC_BLOCKREWARD,
                move |s| reward.blockreward_at(s.timestep()),
            ),
        );

        Ok(vec![
            source,
            stages::kdiff_stage(KdiffDecay::Koomey {
                period_in_hours: self.params.koomey_period_in_hours,
            }),
            stages::smoothing_stage(&self.params.smoothing, self.params.seeding, initial_state)?,
            stages::led_price_stage(Some(self.scaling_factor)),
        ])
    }

    fn max_timesteps(&self) -> Option<u64> {
        Some(self.series.len() as u64 - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series() -> HistoricalSeries {
        HistoricalSeries::new(vec![10.0, 10.0, 10.0], vec![100.0, 110.0, 121.0], vec![1.0; 3])
            .unwrap()
    }

    #[test]
    fn initial_state_halves_first_difficulty() {
        let model = HistoricalModel::new(series(), HistoricalParams::default()).unwrap();
        let s = model.initial_state();
        assert_eq!(s.get(keys::KDIFF), Some(5.0));
        assert_eq!(s.get(keys::KDIFF_SMOOTHED), Some(5.0));
        assert_eq!(s.get(keys::BLOCKREWARD_SMOOTHED), Some(100.0));
        assert_eq!(s.get(keys::LED_PRICE), Some(1.0));
        assert_eq!(model.scaling_factor(), 20.0);
    }

    #[test]
    fn odd_difficulty_is_floored() {
        let series =
            HistoricalSeries::new(vec![7.0, 7.0], vec![6.0, 6.0], vec![1.0, 1.0]).unwrap();
        let model = HistoricalModel::new(series, HistoricalParams::default()).unwrap();
        assert_eq!(model.initial_state().get(keys::KDIFF), Some(3.0));
        assert_eq!(model.scaling_factor(), 2.0);
    }

    #[test]
    fn difficulty_below_two_has_no_scaling() {
        let series = HistoricalSeries::new(vec![1.0, 1.0], vec![6.0, 6.0], vec![1.0, 1.0]).unwrap();
        assert!(matches!(
            HistoricalModel::new(series, HistoricalParams::default()),
            Err(ConfigError::InvalidScalingFactor(_))
        ));
    }

    #[test]
    fn max_timesteps_is_len_minus_one() {
        let model = HistoricalModel::new(series(), HistoricalParams::default()).unwrap();
        assert_eq!(model.max_timesteps(), Some(2));
    }

    #[test]
    fn constants_include_scaling() {
        let model = HistoricalModel::new(series(), HistoricalParams::default()).unwrap();
        let c = model.constants();
        assert_eq!(c.get("scaling_factor"), Some(20.0));
        assert_eq!(c.get("koomey_period_in_hours"), Some(11520.0));
    }

    #[test]
    fn invalid_koomey_period_rejected() {
        let params = HistoricalParams {
            koomey_period_in_hours: 0.0,
            ..HistoricalParams::default()
        };
        assert!(matches!(
            HistoricalModel::new(series(), params),
            Err(ConfigError::InvalidParameter {
                name: "koomey_period_in_hours",
                ..
            })
        ));
    }
}

//! Volatility model — difficulty and price as independent random walks.
//!
//! Each hour a series is multiplied by a normal draw with mean 1 and by a
//! constant drift factor, both derived from yearly figures:
//!
//! hourly_std = yearly_std / sqrt(hours_in_year)
//! new = old * N(1, hourly_std) * (1 + yearly_trend / hours_in_year)

use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::domain::{keys, State};
use crate::engine::{Policy, Stage};
use crate::error::ConfigError;
use crate::rng::RngHierarchy;

use super::stages::{self, input, KdiffDecay};
use super::{
    require_finite, require_positive, Constants, FilterSeeding, Model, SmoothingParams,
    DEFAULT_KOOMEY_PERIOD_IN_HOURS, HOURS_IN_YEAR,
};

pub const DEFAULT_VOLATILITY_SCALING: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolatilityParams {
    /// Yearly standard deviation of difficulty moves.
    pub diff_vol_std_dev: f64,
    /// Yearly standard deviation of price moves.
    pub price_vol_std_dev: f64,
    /// Yearly drift of difficulty, e.g. 0.5 for +50%/year.
    pub diff_trend: f64,
    pub price_trend: f64,
    pub koomey_period_in_hours: f64,
    pub hours_in_year: f64,
    pub scaling_factor: f64,
    pub smoothing: SmoothingParams,
    pub seeding: FilterSeeding,
}

impl Default for VolatilityParams {
    fn default() -> Self {
        Self {
            diff_vol_std_dev: 0.0,
            price_vol_std_dev: 0.0,
            diff_trend: 0.0,
            price_trend: 0.0,
            koomey_period_in_hours: DEFAULT_KOOMEY_PERIOD_IN_HOURS,
            hours_in_year: HOURS_IN_YEAR,
            scaling_factor: DEFAULT_VOLATILITY_SCALING,
            smoothing: SmoothingParams::default(),
            seeding: FilterSeeding::InitialState,
        }
    }
}

impl VolatilityParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_non_negative("diff_vol_std_dev", self.diff_vol_std_dev)?;
        require_non_negative("price_vol_std_dev", self.price_vol_std_dev)?;
        require_finite("diff_trend", self.diff_trend)?;
        require_finite("price_trend", self.price_trend)?;
        require_positive("koomey_period_in_hours", self.koomey_period_in_hours)?;
        require_positive("hours_in_year", self.hours_in_year)?;
        if !self.scaling_factor.is_finite() || self.scaling_factor == 0.0 {
            return Err(ConfigError::InvalidScalingFactor(self.scaling_factor));
        }
        self.smoothing.validate()
    }
}

fn require_non_negative(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidParameter {
            name,
            value,
            reason: "must be finite and non-negative",
        })
    }
}

/// One hourly move of a random walk.
#[derive(Debug, Clone, Copy)]
struct HourlyMove {
    shock: Normal<f64>,
    drift: f64,
}

impl HourlyMove {
    fn new(
        name: &'static str,
        yearly_std_dev: f64,
        yearly_trend: f64,
        hours_in_year: f64,
    ) -> Result<Self, ConfigError> {
        let hourly_std_dev = yearly_std_dev / hours_in_year.sqrt();
        let shock = Normal::new(1.0, hourly_std_dev).map_err(|_| ConfigError::InvalidParameter {
            name,
            value: yearly_std_dev,
            reason: "must be finite and non-negative",
        })?;
        Ok(Self {
            shock,
            drift: 1.0 + yearly_trend / hours_in_year,
        })
    }

    fn apply(&self, old: f64, rng: &mut StdRng) -> f64 {
        old * self.shock.sample(rng) * self.drift
    }
}

/// Oracle over synthetic series. Deterministic for a given seed: every
/// pipeline build re-creates both random streams from that seed.
#[derive(Debug, Clone)]
pub struct VolatilityModel {
    params: VolatilityParams,
    seed: u64,
    diff_move: HourlyMove,
    price_move: HourlyMove,
}

impl VolatilityModel {
    pub fn new(params: VolatilityParams, seed: u64) -> Result<Self, ConfigError> {
        params.validate()?;
        let diff_move = HourlyMove::new(
            "diff_vol_std_dev",
            params.diff_vol_std_dev,
            params.diff_trend,
            params.hours_in_year,
        )?;
        let price_move = HourlyMove::new(
            "price_vol_std_dev",
            params.price_vol_std_dev,
            params.price_trend,
            params.hours_in_year,
        )?;
        Ok(Self {
            params,
            seed,
            diff_move,
            price_move,
        })
    }

    pub fn params(&self) -> &VolatilityParams {
        &self.params
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl Model for VolatilityModel {
    fn name(&self) -> &'static str {
        "volatility"
    }

    fn constants(&self) -> Constants {
        let p = &self.params;
        Constants::new()
            .with("diff_vol_std_dev", p.diff_vol_std_dev)
            .with("price_vol_std_dev", p.price_vol_std_dev)
            .with("diff_trend", p.diff_trend)
            .with("price_trend", p.price_trend)
            .with("koomey_period_in_hours", p.koomey_period_in_hours)
            .with("hours_in_year", p.hours_in_year)
            .with("scaling_factor", p.scaling_factor)
            .with("diff_smoothing_factor", p.smoothing.diff_smoothing_factor)
            .with("price_smoothing_factor", p.smoothing.price_smoothing_factor)
    }

    fn initial_state(&self) -> State {
        State::new()
            .with(keys::BTC_DIFF, 1.0)
            .with(keys::BTC_PRICE, 1.0)
            .with(keys::BTC_BLOCKREWARD, 1.0)
            .with(keys::KDIFF, 0.5)
            .with(keys::KDIFF_SMOOTHED, 0.5)
            .with(keys::BLOCKREWARD_SMOOTHED, 1.0)
            .with(keys::LED_PRICE, 1.0)
    }

    fn build_stages(&self, initial_state: &State) -> Result<Vec<Stage>, ConfigError> {
        let rngs = RngHierarchy::new(self.seed);
        let mut diff_rng = rngs.rng_for(keys::BTC_DIFF, 0);
        let mut price_rng = rngs.rng_for(keys::BTC_PRICE, 0);
        let diff_move = self.diff_move;
        let price_move = self.price_move;

        let source = stages::source_stage(
            Policy::single(keys::BTC_DIFF, &[keys::BTC_DIFF], input::NEW_BTC_DIFF, move |s| {
                Ok(diff_move.apply(s.require(keys::BTC_DIFF)?, &mut diff_rng))
            }),
            Policy::single(keys::BTC_PRICE, &[keys::BTC_PRICE], input::NEW_BTC_PRICE, move |s| {
                Ok(price_move.apply(s.require(keys::BTC_PRICE)?, &mut price_rng))
            }),
            Policy::single(
                keys::BTC_BLOCKREWARD,
                &[keys::BTC_BLOCKREWARD],
                input::NEW_BTC_BLOCKREWARD,
                |s| s.require(keys::BTC_BLOCKREWARD),
            ),
        );

        Ok(vec![
            source,
            stages::kdiff_stage(KdiffDecay::Koomey {
                period_in_hours: self.params.koomey_period_in_hours,
            }),
            stages::smoothing_stage(&self.params.smoothing, self.params.seeding, initial_state)?,
            stages::led_price_stage(Some(self.params.scaling_factor)),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn zero_volatility_move_is_pure_drift() {
        let mv = HourlyMove::new("x", 0.0, 8760.0, 8760.0).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        // N(1, 0) is exactly 1; drift is 1 + 8760/8760 = 2.
        assert_eq!(mv.apply(3.0, &mut rng), 6.0);
    }

    #[test]
    fn negative_std_dev_rejected() {
        let params = VolatilityParams {
            price_vol_std_dev: -0.1,
            ..VolatilityParams::default()
        };
        assert!(matches!(
            VolatilityModel::new(params, 0),
            Err(ConfigError::InvalidParameter {
                name: "price_vol_std_dev",
                ..
            })
        ));
    }

    #[test]
    fn zero_scaling_rejected() {
        let params = VolatilityParams {
            scaling_factor: 0.0,
            ..VolatilityParams::default()
        };
        assert_eq!(
            VolatilityModel::new(params, 0).unwrap_err(),
            ConfigError::InvalidScalingFactor(0.0)
        );
    }

    #[test]
    fn constants_record_all_parameters() {
        let model = VolatilityModel::new(VolatilityParams::default(), 7).unwrap();
        let c = model.constants();
        assert_eq!(c.get("hours_in_year"), Some(8760.0));
        assert_eq!(c.get("scaling_factor"), Some(2.0));
        assert_eq!(c.len(), 9);
        assert_eq!(model.seed(), 7);
    }
}

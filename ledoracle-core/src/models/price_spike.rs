//! Price-spike model — a step change in price, with difficulty chasing it.
//!
//! Block reward and price are held constant. Each timestep difficulty closes
//! a fixed fraction of its gap to the price, so the run shows how the
//! smoothed oracle responds to a sudden revenue jump that miners follow.

use serde::{Deserialize, Serialize};

use crate::domain::{keys, State};
use crate::engine::{Policy, Stage};
use crate::error::ConfigError;

use super::stages::{self, input, KdiffDecay};
use super::{require_positive, Constants, FilterSeeding, Model, SmoothingParams};

pub const DEFAULT_SPIKE_PRICE: f64 = 1_000_000.0;
pub const DEFAULT_DIFF_CONVERGENCE: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriceSpikeParams {
    /// Price held from timestep 0 on.
    pub btc_price: f64,
    /// Fraction of the price/difficulty gap closed per timestep, in (0, 1].
    pub diff_convergence: f64,
    pub smoothing: SmoothingParams,
    pub seeding: FilterSeeding,
}

impl Default for PriceSpikeParams {
    fn default() -> Self {
        Self {
            btc_price: DEFAULT_SPIKE_PRICE,
            diff_convergence: DEFAULT_DIFF_CONVERGENCE,
            smoothing: SmoothingParams::default(),
            seeding: FilterSeeding::InitialState,
        }
    }
}

impl PriceSpikeParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_positive("btc_price", self.btc_price)?;
        if !(self.diff_convergence > 0.0 && self.diff_convergence <= 1.0) {
            return Err(ConfigError::InvalidParameter {
                name: "diff_convergence",
                value: self.diff_convergence,
                reason: "must be in (0, 1]",
            });
        }
        self.smoothing.validate()
    }
}

#[derive(Debug, Clone)]
pub struct PriceSpikeModel {
    params: PriceSpikeParams,
}

impl PriceSpikeModel {
    pub fn new(params: PriceSpikeParams) -> Result<Self, ConfigError> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &PriceSpikeParams {
        &self.params
    }
}

impl Model for PriceSpikeModel {
    fn name(&self) -> &'static str {
        "price_spike"
    }

    fn constants(&self) -> Constants {
        Constants::new()
            .with("btc_price", self.params.btc_price)
            .with("diff_convergence", self.params.diff_convergence)
            .with("diff_smoothing_factor", self.params.smoothing.diff_smoothing_factor)
            .with("price_smoothing_factor", self.params.smoothing.price_smoothing_factor)
    }

    fn initial_state(&self) -> State {
        State::new()
            .with(keys::BTC_DIFF, 1.0)
            .with(keys::BTC_PRICE, self.params.btc_price)
            .with(keys::BTC_BLOCKREWARD, 1.0)
            .with(keys::KDIFF, 0.5)
            .with(keys::KDIFF_SMOOTHED, 0.5)
            .with(keys::BLOCKREWARD_SMOOTHED, 1.0)
            .with(keys::LED_PRICE, 2.0)
    }

    fn build_stages(&self, initial_state: &State) -> Result<Vec<Stage>, ConfigError> {
        let convergence = self.params.diff_convergence;

        let source = stages::source_stage(
            Policy::single(
                keys::BTC_DIFF,
                &[keys::BTC_DIFF, keys::BTC_PRICE],
                input::NEW_BTC_DIFF,
                move |s| {
                    let diff = s.require(keys::BTC_DIFF)?;
                    let price = s.require(keys::BTC_PRICE)?;
                    Ok(diff + (price - diff) * convergence)
                },
            ),
            Policy::single(keys::BTC_PRICE, &[keys::BTC_PRICE], input::NEW_BTC_PRICE, |s| {
                s.require(keys::BTC_PRICE)
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
            stages::kdiff_stage(KdiffDecay::Disabled),
            stages::smoothing_stage(&self.params.smoothing, self.params.seeding, initial_state)?,
            stages::led_price_stage(None),
        ])
    }
}

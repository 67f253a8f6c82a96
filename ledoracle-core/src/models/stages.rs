//! The four canonical stages shared by every oracle model.
//!
//! source      → btc_diff, btc_price, btc_blockreward (variant-specific policies)
//! kdiff       → kdiff from btc_diff
//! smoothing   → kdiff_smoothed, blockreward_smoothed
//! led_price   → blockreward_smoothed / kdiff_smoothed, optionally rescaled

use crate::domain::{keys, State};
use crate::engine::{Policy, Stage, StateUpdate};
use crate::error::{ConfigError, StepError};

use super::{FilterSeeding, SmoothingParams};

pub const SOURCE_STAGE: &str = "source";
pub const KDIFF_STAGE: &str = "kdiff";
pub const SMOOTHING_STAGE: &str = "smoothing";
pub const LED_PRICE_STAGE: &str = "led_price";

/// Policy-input keys.
pub mod input {
    pub const NEW_BTC_DIFF: &str = "new_btc_diff";
    pub const NEW_BTC_PRICE: &str = "new_btc_price";
    pub const NEW_BTC_BLOCKREWARD: &str = "new_btc_blockreward";
    pub const NEW_KDIFF: &str = "new_kdiff";
    pub const NEW_KDIFF_SMOOTHED: &str = "new_kdiff_smoothed";
    pub const NEW_BLOCKREWARD_SMOOTHED: &str = "new_blockreward_smoothed";
    pub const NEW_LED_PRICE: &str = "new_led_price";
}

/// How `kdiff` is derived from `btc_diff`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KdiffDecay {
    /// kdiff = btc_diff / 2^(1 + timestep / period)
    Koomey { period_in_hours: f64 },
    /// kdiff = btc_diff
    Disabled,
}

impl KdiffDecay {
    pub fn apply(self, btc_diff: f64, timestep: u64) -> f64 {
        match self {
            KdiffDecay::Koomey { period_in_hours } => {
                let exponent = 1.0 + timestep as f64 / period_in_hours;
                btc_diff / 2f64.powf(exponent)
            }
            KdiffDecay::Disabled => btc_diff,
        }
    }
}

/// Source stage from three variant-specific policies, which must produce
/// `new_btc_diff`, `new_btc_price` and `new_btc_blockreward`.
pub fn source_stage(diff: Policy, price: Policy, blockreward: Policy) -> Stage {
    Stage::new(SOURCE_STAGE)
        .policy(diff)
        .policy(price)
        .policy(blockreward)
        .update(StateUpdate::from_input(keys::BTC_DIFF, input::NEW_BTC_DIFF))
        .update(StateUpdate::from_input(keys::BTC_PRICE, input::NEW_BTC_PRICE))
        .update(StateUpdate::from_input(
            keys::BTC_BLOCKREWARD,
            input::NEW_BTC_BLOCKREWARD,
        ))
}

pub fn kdiff_stage(decay: KdiffDecay) -> Stage {
    let policy = Policy::single(
        keys::KDIFF,
        &[keys::TIMESTEP, keys::BTC_DIFF],
        input::NEW_KDIFF,
        move |state| Ok(decay.apply(state.require(keys::BTC_DIFF)?, state.timestep())),
    );
    Stage::new(KDIFF_STAGE)
        .policy(policy)
        .update(StateUpdate::from_input(keys::KDIFF, input::NEW_KDIFF))
}

/// Smoothing stage owning one filter per smoothed signal.
///
/// Filters are created here, so every call yields an independent pair.
pub fn smoothing_stage(
    params: &SmoothingParams,
    seeding: FilterSeeding,
    initial_state: &State,
) -> Result<Stage, ConfigError> {
    params.validate()?;
    let mut kdiff_filter = params
        .kind
        .build("diff_smoothing_factor", params.diff_smoothing_factor)?;
    let mut revenue_filter = params
        .kind
        .build("price_smoothing_factor", params.price_smoothing_factor)?;

    if seeding == FilterSeeding::InitialState {
        kdiff_filter.prime(seed_value(initial_state, keys::KDIFF_SMOOTHED)?);
        revenue_filter.prime(seed_value(initial_state, keys::BLOCKREWARD_SMOOTHED)?);
    }

    Ok(Stage::new(SMOOTHING_STAGE)
        .policy(Policy::single(
            keys::KDIFF_SMOOTHED,
            &[keys::KDIFF],
            input::NEW_KDIFF_SMOOTHED,
            move |state| Ok(kdiff_filter.apply_smoothing(state.require(keys::KDIFF)?)),
        ))
        .policy(Policy::single(
            keys::BLOCKREWARD_SMOOTHED,
            &[keys::BTC_BLOCKREWARD, keys::BTC_PRICE],
            input::NEW_BLOCKREWARD_SMOOTHED,
            move |state| {
                let revenue =
                    state.require(keys::BTC_BLOCKREWARD)? * state.require(keys::BTC_PRICE)?;
                Ok(revenue_filter.apply_smoothing(revenue))
            },
        ))
        .update(StateUpdate::from_input(
            keys::KDIFF_SMOOTHED,
            input::NEW_KDIFF_SMOOTHED,
        ))
        .update(StateUpdate::from_input(
            keys::BLOCKREWARD_SMOOTHED,
            input::NEW_BLOCKREWARD_SMOOTHED,
        )))
}

/// led_price = blockreward_smoothed / kdiff_smoothed [/ scaling_factor]
pub fn led_price_stage(scaling_factor: Option<f64>) -> Stage {
    let policy = Policy::single(
        keys::LED_PRICE,
        &[keys::BLOCKREWARD_SMOOTHED, keys::KDIFF_SMOOTHED],
        input::NEW_LED_PRICE,
        move |state| {
            let revenue = state.require(keys::BLOCKREWARD_SMOOTHED)?;
            let kdiff = state.require(keys::KDIFF_SMOOTHED)?;
            if kdiff == 0.0 {
                return Err(StepError::DivisionByZero(keys::LED_PRICE));
            }
            let led_price = revenue / kdiff;
            Ok(match scaling_factor {
                Some(factor) => led_price / factor,
                None => led_price,
            })
        },
    );
    Stage::new(LED_PRICE_STAGE)
        .policy(policy)
        .update(StateUpdate::from_input(keys::LED_PRICE, input::NEW_LED_PRICE))
}

fn seed_value(initial_state: &State, key: &'static str) -> Result<f64, ConfigError> {
    initial_state
        .get(key)
        .ok_or_else(|| ConfigError::UnknownStateKey {
            stage: SMOOTHING_STAGE.to_string(),
            consumer: format!("{key} filter seed"),
            key: key.to_string(),
        })
}

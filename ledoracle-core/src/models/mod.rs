//! Oracle models.
//!
//! A model is anything that can supply constants, an initial state, and an
//! ordered stage table. The three variants share the canonical four-stage
//! pipeline (source → kdiff → smoothing → led_price) and differ only in the
//! source rule, the kdiff decay, and the led_price scaling.

pub mod historical;
pub mod price_spike;
pub mod stages;
pub mod volatility;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::State;
use crate::engine::Stage;
use crate::error::ConfigError;
use crate::smoothing::{validate_factor, SmoothingKind};

pub use historical::{HistoricalModel, HistoricalParams};
pub use price_spike::{PriceSpikeModel, PriceSpikeParams};
pub use stages::KdiffDecay;
pub use volatility::{VolatilityModel, VolatilityParams};

/// Hours over which Koomey's-law efficiency gains halve `kdiff`.
pub const DEFAULT_KOOMEY_PERIOD_IN_HOURS: f64 = 11520.0;
pub const DEFAULT_DIFF_SMOOTHING_FACTOR: f64 = 5760.0;
pub const DEFAULT_PRICE_SMOOTHING_FACTOR: f64 = 12960.0;
/// One timestep is one hour.
pub const HOURS_IN_YEAR: f64 = 8760.0;

/// Capability set of an oracle model.
///
/// `build_stages` is called once per run and must return fresh filter and
/// RNG instances, so a model can be shared across parallel runs.
pub trait Model: Send + Sync {
    fn name(&self) -> &'static str;

    /// Fixed parameters, for manifests and reports.
    fn constants(&self) -> Constants;

    fn initial_state(&self) -> State;

    /// Assemble the ordered stage table for one run starting at `initial_state`.
    fn build_stages(&self, initial_state: &State) -> Result<Vec<Stage>, ConfigError>;

    /// Longest run the model can serve, if bounded by recorded data.
    fn max_timesteps(&self) -> Option<u64> {
        None
    }
}

/// Named model constants. Set once at construction, never mutated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Constants(BTreeMap<String, f64>);

impl Constants {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: f64) -> Self {
        self.0.insert(name.into(), value);
        self
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// How the smoothing filters start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FilterSeeding {
    /// First sample passes through unsmoothed.
    ColdStart,
    /// Filters are primed with the initial `kdiff_smoothed` and
    /// `blockreward_smoothed`, so the first sample is already smoothed.
    InitialState,
}

/// Filter type and factors for the smoothing stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingParams {
    pub kind: SmoothingKind,
    pub diff_smoothing_factor: f64,
    pub price_smoothing_factor: f64,
}

impl Default for SmoothingParams {
    fn default() -> Self {
        Self {
            kind: SmoothingKind::Ema,
            diff_smoothing_factor: DEFAULT_DIFF_SMOOTHING_FACTOR,
            price_smoothing_factor: DEFAULT_PRICE_SMOOTHING_FACTOR,
        }
    }
}

impl SmoothingParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_factor("diff_smoothing_factor", self.diff_smoothing_factor)?;
        validate_factor("price_smoothing_factor", self.price_smoothing_factor)
    }
}

pub(crate) fn require_positive(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidParameter {
            name,
            value,
            reason: "must be positive and finite",
        })
    }
}

pub(crate) fn require_finite(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::InvalidParameter {
            name,
            value,
            reason: "must be finite",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smoothing_params_defaults() {
        let p = SmoothingParams::default();
        assert_eq!(p.kind, SmoothingKind::Ema);
        assert_eq!(p.diff_smoothing_factor, 5760.0);
        assert_eq!(p.price_smoothing_factor, 12960.0);
        assert!(p.validate().is_ok());
    }

    #[test]
    fn smoothing_params_reject_non_positive() {
        let p = SmoothingParams {
            price_smoothing_factor: -1.0,
            ..SmoothingParams::default()
        };
        assert!(matches!(
            p.validate(),
            Err(ConfigError::InvalidSmoothingFactor { ref name, .. }) if name == "price_smoothing_factor"
        ));
    }

    #[test]
    fn constants_serialize_as_flat_map() {
        let c = Constants::new().with("scaling_factor", 2.0);
        assert_eq!(serde_json::to_string(&c).unwrap(), r#"{"scaling_factor":2.0}"#);
    }
}

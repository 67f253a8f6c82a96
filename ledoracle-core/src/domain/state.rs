//! State — the mapping from variable name to value advanced by the engine.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::StepError;

/// Well-known state variable names shared by every oracle model.
pub mod keys {
    /// Reserved: owned by the engine, never written by a model.
    pub const TIMESTEP: &str = "timestep";
    pub const BTC_DIFF: &str = "btc_diff";
    pub const BTC_PRICE: &str = "btc_price";
    pub const BTC_BLOCKREWARD: &str = "btc_blockreward";
    pub const KDIFF: &str = "kdiff";
    pub const KDIFF_SMOOTHED: &str = "kdiff_smoothed";
    pub const BLOCKREWARD_SMOOTHED: &str = "blockreward_smoothed";
    pub const LED_PRICE: &str = "led_price";

    /// Variables present in every model's initial state, in pipeline order.
    pub const ORACLE_VARIABLES: [&str; 7] = [
        BTC_DIFF,
        BTC_PRICE,
        BTC_BLOCKREWARD,
        KDIFF,
        KDIFF_SMOOTHED,
        BLOCKREWARD_SMOOTHED,
        LED_PRICE,
    ];
}

/// One snapshot of the simulation.
///
/// `timestep` is stored apart from the variables so that no model can write
/// it; [`State::get`] still answers for `"timestep"` so policies can read it
/// like any other key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct State {
    timestep: u64,
    values: BTreeMap<String, f64>,
}

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, used to assemble initial states.
    pub fn with(mut self, key: impl Into<String>, value: f64) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert or overwrite a variable.
    ///
    /// Inserting `"timestep"` is accepted here but rejected by the engine
    /// when the pipeline is validated.
    pub fn insert(&mut self, key: impl Into<String>, value: f64) {
        self.values.insert(key.into(), value);
    }

    pub fn timestep(&self) -> u64 {
        self.timestep
    }

    pub(crate) fn set_timestep(&mut self, timestep: u64) {
        self.timestep = timestep;
    }

    /// Look up a variable. `"timestep"` resolves to the engine-owned counter.
    pub fn get(&self, key: &str) -> Option<f64> {
        if key == keys::TIMESTEP {
            return Some(self.timestep as f64);
        }
        self.values.get(key).copied()
    }

    /// Like [`State::get`], but a missing key is a step failure.
    pub fn require(&self, key: &str) -> Result<f64, StepError> {
        self.get(key)
            .ok_or_else(|| StepError::MissingKey(key.to_string()))
    }

    pub fn contains(&self, key: &str) -> bool {
        key == keys::TIMESTEP || self.values.contains_key(key)
    }

    /// True if a model tried to place `"timestep"` among the variables.
    pub(crate) fn has_reserved_variable(&self) -> bool {
        self.values.contains_key(keys::TIMESTEP)
    }

    /// Variable names in sorted order, excluding `timestep`.
    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// `(name, value)` pairs in sorted order, excluding `timestep`.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

//! Exponential Moving Average, fed one sample at a time.
//!
//! Recursive: old += (new - old) / F
//! Cold start: the first sample is stored and returned unchanged.

use super::{validate_factor, FilterState, SmoothingFunction};
use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq)]
pub struct ExponentialMovingAverage {
    smoothing_factor: f64,
    state: FilterState,
}

impl ExponentialMovingAverage {
    pub fn new(smoothing_factor: f64) -> Result<Self, ConfigError> {
        validate_factor("smoothing_factor", smoothing_factor)?;
        Ok(Self {
            smoothing_factor,
            state: FilterState::Uninitialized,
        })
    }

    pub fn state(&self) -> FilterState {
        self.state
    }
}

impl SmoothingFunction for ExponentialMovingAverage {
    fn name(&self) -> &str {
        "ema"
    }

    fn smoothing_factor(&self) -> f64 {
        self.smoothing_factor
    }

    fn apply_smoothing(&mut self, new_value: f64) -> f64 {
        match self.state {
            FilterState::Uninitialized => {
                self.state = FilterState::Running {
                    old_value: new_value,
                };
                new_value
            }
            FilterState::Running { old_value } => {
                let delta = new_value - old_value;
                let change = delta / self.smoothing_factor;
                let updated = old_value + change;
                self.state = FilterState::Running { old_value: updated };
                updated
            }
        }
    }

    fn prime(&mut self, value: f64) {
        self.state = FilterState::Running { old_value: value };
    }

    fn is_initialized(&self) -> bool {
        matches!(self.state, FilterState::Running { .. })
    }
}

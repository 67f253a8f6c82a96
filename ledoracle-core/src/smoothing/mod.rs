//! Recursive smoothing filters.
//!
//! Unlike batch indicators, these are fed one sample at a time and carry
//! their recursive state between calls. One instance per filtered signal,
//! created when a run's pipeline is built and never reset mid-run.

pub mod ema;
pub mod hma;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub use ema::ExponentialMovingAverage;
pub use hma::HullMovingAverage;

/// A stateful one-sample-at-a-time filter.
pub trait SmoothingFunction: Send + Sync + std::fmt::Debug {
    /// Short name, e.g. "ema" or "hma".
    fn name(&self) -> &str;

    fn smoothing_factor(&self) -> f64;

    /// Feed one sample, return the smoothed value.
    fn apply_smoothing(&mut self, new_value: f64) -> f64;

    /// Move straight to the running state with `value` as the filter memory,
    /// skipping the cold-start pass-through.
    fn prime(&mut self, value: f64);

    fn is_initialized(&self) -> bool;
}

/// The two states of a single recursive filter.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum FilterState {
    #[default]
    Uninitialized,
    Running { old_value: f64 },
}

/// Which filter the smoothing stage uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SmoothingKind {
    #[default]
    Ema,
    Hma,
}

impl SmoothingKind {
    /// Build a fresh filter. `name` only labels the error on a bad factor.
    pub fn build(self, name: &str, factor: f64) -> Result<Box<dyn SmoothingFunction>, ConfigError> {
        validate_factor(name, factor)?;
        Ok(match self {
            SmoothingKind::Ema => Box::new(ExponentialMovingAverage::new(factor)?),
            SmoothingKind::Hma => Box::new(HullMovingAverage::new(factor)?),
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SmoothingKind::Ema => "ema",
            SmoothingKind::Hma => "hma",
        }
    }
}

/// Smoothing factors must be positive and finite; the filters divide by them.
pub fn validate_factor(name: &str, factor: f64) -> Result<(), ConfigError> {
    if factor.is_finite() && factor > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidSmoothingFactor {
            name: name.to_string(),
            value: factor,
        })
    }
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_rejects_bad_factors() {
        for bad in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let err = SmoothingKind::Ema.build("diff_smoothing_factor", bad).unwrap_err();
            assert!(matches!(
                err,
                ConfigError::InvalidSmoothingFactor { ref name, .. } if name == "diff_smoothing_factor"
            ));
            assert!(SmoothingKind::Hma.build("x", bad).is_err());
        }
    }

    #[test]
    fn build_returns_requested_kind() {
        let ema = SmoothingKind::Ema.build("f", 10.0).unwrap();
        let hma = SmoothingKind::Hma.build("f", 10.0).unwrap();
        assert_eq!(ema.name(), "ema");
        assert_eq!(hma.name(), "hma");
        assert_eq!(hma.smoothing_factor(), 10.0);
    }

    #[test]
    fn kind_serializes_screaming_case() {
        let json = serde_json::to_string(&SmoothingKind::Hma).unwrap();
        assert_eq!(json, "\"HMA\"");
    }
}

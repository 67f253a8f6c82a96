//! Hull Moving Average built from three recursive EMAs.
//!
//! ema      = EMA_F(x)
//! half_ema = EMA_{F/2}(x)
//! hma      = EMA_{sqrt F}(2 * half_ema - ema)
//!
//! All three sub-filters advance on every call, so each has its own cold start.

use super::ema::ExponentialMovingAverage;
use super::{validate_factor, SmoothingFunction};
use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq)]
pub struct HullMovingAverage {
    smoothing_factor: f64,
    ema: ExponentialMovingAverage,
    half_ema: ExponentialMovingAverage,
    hma: ExponentialMovingAverage,
}

impl HullMovingAverage {
    pub fn new(smoothing_factor: f64) -> Result<Self, ConfigError> {
        validate_factor("smoothing_factor", smoothing_factor)?;
        Ok(Self {
            smoothing_factor,
            ema: ExponentialMovingAverage::new(smoothing_factor)?,
            half_ema: ExponentialMovingAverage::new(smoothing_factor / 2.0)?,
            hma: ExponentialMovingAverage::new(smoothing_factor.sqrt())?,
        })
    }

    /// Sub-filters in (full, half, sqrt) order.
    pub fn sub_filters(
        &self,
    ) -> (
        &ExponentialMovingAverage,
        &ExponentialMovingAverage,
        &ExponentialMovingAverage,
    ) {
        (&self.ema, &self.half_ema, &self.hma)
    }
}

impl SmoothingFunction for HullMovingAverage {
    fn name(&self) -> &str {
        "hma"
    }

    fn smoothing_factor(&self) -> f64 {
        self.smoothing_factor
    }

    fn apply_smoothing(&mut self, new_value: f64) -> f64 {
        let ema = self.ema.apply_smoothing(new_value);
        let half_ema = self.half_ema.apply_smoothing(new_value);
        let raw_hma = 2.0 * half_ema - ema;
        self.hma.apply_smoothing(raw_hma)
    }

    fn prime(&mut self, value: f64) {
        // 2 * value - value == value, so every stage starts at the same level.
        self.ema.prime(value);
        self.half_ema.prime(value);
        self.hma.prime(value);
    }

    fn is_initialized(&self) -> bool {
        self.hma.is_initialized()
    }
}

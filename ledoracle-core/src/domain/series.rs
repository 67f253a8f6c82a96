//! Recorded BTC network series replayed by the historical model.

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, StepError};

/// Three parallel series indexed by timestep: difficulty, price, block reward.
///
/// Immutable once constructed; lengths are checked to be equal and non-zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalSeries {
    difficulty: Vec<f64>,
    price: Vec<f64>,
    blockreward: Vec<f64>,
}

impl HistoricalSeries {
    pub fn new(
        difficulty: Vec<f64>,
        price: Vec<f64>,
        blockreward: Vec<f64>,
    ) -> Result<Self, ConfigError> {
        if difficulty.is_empty() {
            return Err(ConfigError::EmptySeries("difficulty"));
        }
        if price.is_empty() {
            return Err(ConfigError::EmptySeries("price"));
        }
        if blockreward.is_empty() {
            return Err(ConfigError::EmptySeries("blockreward"));
        }
        if difficulty.len() != price.len() || price.len() != blockreward.len() {
            return Err(ConfigError::MisalignedSeries {
                difficulty: difficulty.len(),
                price: price.len(),
                blockreward: blockreward.len(),
            });
        }
        Ok(Self {
            difficulty,
            price,
            blockreward,
        })
    }

    pub fn len(&self) -> usize {
        self.difficulty.len()
    }

    /// Always false: construction rejects empty series.
    pub fn is_empty(&self) -> bool {
        self.difficulty.is_empty()
    }

    pub fn difficulty(&self) -> &[f64] {
        &self.difficulty
    }

    pub fn price(&self) -> &[f64] {
        &self.price
    }

    pub fn blockreward(&self) -> &[f64] {
        &self.blockreward
    }

    pub fn difficulty_at(&self, timestep: u64) -> Result<f64, StepError> {
        lookup("difficulty", &self.difficulty, timestep)
    }

    pub fn price_at(&self, timestep: u64) -> Result<f64, StepError> {
        lookup("price", &self.price, timestep)
    }

    pub fn blockreward_at(&self, timestep: u64) -> Result<f64, StepError> {
        lookup("blockreward", &self.blockreward, timestep)
    }
}

fn lookup(series: &'static str, values: &[f64], timestep: u64) -> Result<f64, StepError> {
    usize::try_from(timestep)
        .ok()
        .and_then(|i| values.get(i).copied())
        .ok_or(StepError::IndexOutOfRange {
            series,
            index: timestep,
            len: values.len(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_series() {
        let err = HistoricalSeries::new(vec![], vec![1.0], vec![1.0]).unwrap_err();
        assert_eq!(err, ConfigError::EmptySeries("difficulty"));
    }

    #[test]
    fn rejects_misaligned_series() {
        let err = HistoricalSeries::new(vec![1.0, 2.0], vec![1.0], vec![1.0]).unwrap_err();
        assert!(matches!(err, ConfigError::MisalignedSeries { difficulty: 2, .. }));
    }

    #[test]
    fn lookup_within_and_beyond_range() {
        let s = HistoricalSeries::new(vec![10.0, 11.0], vec![1.0, 2.0], vec![6.25, 6.25]).unwrap();
        assert_eq!(s.price_at(1), Ok(2.0));
        assert_eq!(
            s.difficulty_at(2),
            Err(StepError::IndexOutOfRange {
                series: "difficulty",
                index: 2,
                len: 2
            })
        );
    }
}

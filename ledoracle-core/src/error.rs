//! Error types for model construction and pipeline execution.
//!
//! Three layers:
//! - [`ConfigError`]: detected eagerly, before any timestep runs.
//! - [`StepError`]: raised by a single policy or state-update evaluation.
//! - [`RunError`]: what a run returns, a `StepError` tagged with the
//!   timestep and stage at which it happened, or a `ConfigError`.

use thiserror::Error;

/// Invalid model constants, series, or pipeline topology.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("smoothing factor '{name}' must be positive and finite, got {value}")]
    InvalidSmoothingFactor { name: String, value: f64 },

    #[error("historical {0} series is empty")]
    EmptySeries(&'static str),

    #[error(
        "historical series are misaligned: difficulty={difficulty}, price={price}, blockreward={blockreward}"
    )]
    MisalignedSeries {
        difficulty: usize,
        price: usize,
        blockreward: usize,
    },

    #[error("invalid parameter '{name}' = {value}: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },

    #[error("scaling factor must be non-zero and finite, got {0}")]
    InvalidScalingFactor(f64),

    #[error("timesteps must be at least 1")]
    ZeroTimesteps,

    #[error("substeps_per_timestep must be at least 1")]
    ZeroSubsteps,

    #[error("{requested} timesteps requested but the historical series only covers {available}")]
    TimestepsExceedSeries { requested: u64, available: u64 },

    #[error("stage '{stage}': policies '{first}' and '{second}' both produce policy input '{key}'")]
    OverlappingPolicyOutput {
        stage: String,
        key: String,
        first: String,
        second: String,
    },

    #[error("state variable '{variable}' is updated by both stage '{first}' and stage '{second}'")]
    DuplicateOwner {
        variable: String,
        first: String,
        second: String,
    },

    #[error("stage '{stage}': '{consumer}' uses state key '{key}', which is not in the initial state")]
    UnknownStateKey {
        stage: String,
        consumer: String,
        key: String,
    },

    #[error(
        "stage '{stage}': update '{variable}' reads policy input '{key}', which no policy in the stage produces"
    )]
    UnknownPolicyInput {
        stage: String,
        variable: String,
        key: String,
    },

    #[error("'timestep' is owned by the engine and cannot be written by '{0}'")]
    ReservedKey(String),
}

/// Failure of one policy or state-update evaluation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StepError {
    #[error("state key '{0}' is not present")]
    MissingKey(String),

    #[error("policy input '{0}' is not present")]
    MissingInput(String),

    #[error("policy '{policy}' produced undeclared output '{key}'")]
    UndeclaredOutput { policy: String, key: String },

    #[error("{series} series has {len} samples, index {index} is out of range")]
    IndexOutOfRange {
        series: &'static str,
        index: u64,
        len: usize,
    },

    #[error("division by zero computing '{0}'")]
    DivisionByZero(&'static str),

    #[error("'{variable}' evaluated to non-finite value {value}")]
    NonFinite { variable: String, value: f64 },
}

/// Coarse classification of a failed run, for the sweep/analysis layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Configuration,
    Index,
    Numeric,
}

/// A run that did not produce a trajectory.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RunError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("timestep {timestep}, stage '{stage}': {source}")]
    Step {
        timestep: u64,
        stage: String,
        source: StepError,
    },
}

impl RunError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            // Caught before the first step; the lookup itself would be out of range.
            RunError::Config(ConfigError::TimestepsExceedSeries { .. }) => ErrorKind::Index,
            RunError::Config(_) => ErrorKind::Configuration,
            RunError::Step { source, .. } => match source {
                StepError::IndexOutOfRange { .. } => ErrorKind::Index,
                StepError::DivisionByZero(_) | StepError::NonFinite { .. } => ErrorKind::Numeric,
                // A missing key at runtime means stage ordering was violated.
                StepError::MissingKey(_)
                | StepError::MissingInput(_)
                | StepError::UndeclaredOutput { .. } => ErrorKind::Configuration,
            },
        }
    }

    /// Timestep at which the run aborted, if it got past setup.
    pub fn timestep(&self) -> Option<u64> {
        match self {
            RunError::Config(_) => None,
            RunError::Step { timestep, .. } => Some(*timestep),
        }
    }

    /// Stage in which the run aborted, if it got past setup.
    pub fn stage(&self) -> Option<&str> {
        match self {
            RunError::Config(_) => None,
            RunError::Step { stage, .. } => Some(stage),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_error_kind_classification() {
        let index = RunError::Step {
            timestep: 3,
            stage: "source".into(),
            source: StepError::IndexOutOfRange {
                series: "price",
                index: 3,
                len: 3,
            },
        };
        assert_eq!(index.kind(), ErrorKind::Index);
        assert_eq!(index.timestep(), Some(3));
        assert_eq!(index.stage(), Some("source"));

        let numeric = RunError::Step {
            timestep: 1,
            stage: "led_price".into(),
            source: StepError::DivisionByZero("led_price"),
        };
        assert_eq!(numeric.kind(), ErrorKind::Numeric);

        let config: RunError = ConfigError::ZeroTimesteps.into();
        assert_eq!(config.kind(), ErrorKind::Configuration);
        assert_eq!(config.timestep(), None);

        let too_long: RunError = ConfigError::TimestepsExceedSeries {
            requested: 3,
            available: 2,
        }
        .into();
        assert_eq!(too_long.kind(), ErrorKind::Index);
        assert_eq!(too_long.timestep(), None);
    }

    #[test]
    fn step_error_message_names_timestep_and_stage() {
        let err = RunError::Step {
            timestep: 7,
            stage: "kdiff".into(),
            source: StepError::MissingKey("btc_diff".into()),
        };
        let msg = err.to_string();
        assert!(msg.contains("timestep 7"));
        assert!(msg.contains("'kdiff'"));
        assert!(msg.contains("btc_diff"));
    }
}

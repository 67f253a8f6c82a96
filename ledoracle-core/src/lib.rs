//! LedOracle Core — staged simulation engine for the LED price oracle.
//!
//! This crate contains the heart of the simulator:
//! - Domain types (state, trajectory, recorded BTC series)
//! - Recursive smoothing filters (EMA, HMA)
//! - Stage engine: policies, state updates, per-timestep fold
//! - Oracle models: historical replay, price spike, volatility
//! - Deterministic RNG hierarchy for stochastic models

pub mod domain;
pub mod engine;
pub mod error;
pub mod models;
pub mod rng;
pub mod smoothing;

pub use domain::{keys, HistoricalSeries, State, Trajectory};
pub use engine::{run, run_with_state, EngineConfig, StageEngine};
pub use error::{ConfigError, ErrorKind, RunError, StepError};
pub use models::{
    Constants, FilterSeeding, HistoricalModel, HistoricalParams, Model, PriceSpikeModel,
    PriceSpikeParams, SmoothingParams, VolatilityModel, VolatilityParams,
};
pub use smoothing::{SmoothingFunction, SmoothingKind};

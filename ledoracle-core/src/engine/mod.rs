//! Staged state-update engine.
//!
//! A model supplies an ordered stage table; the engine validates it once and
//! then folds it over the timesteps:
//!
//! 1. Policies: independent, all see the same pre-stage snapshot
//! 2. Merge: policy outputs become one `PolicyInput`
//! 3. Updates: applied in order, each visible to the next
//! 4. Record: one snapshot per timestep into the `Trajectory`

pub mod config;
pub mod pipeline;
pub mod stage;

pub use config::EngineConfig;
pub use pipeline::{run, run_with_state, StageEngine};
pub use stage::{Policy, PolicyFn, PolicyInput, Stage, StateUpdate, UpdateFn};

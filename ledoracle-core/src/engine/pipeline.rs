//! Stage engine — the per-timestep fold over the stage list.
//!
//! Per timestep:
//! 1. Advance `timestep` (engine-owned)
//! 2. For each stage, in declaration order:
//!    a. every policy runs against the same pre-stage snapshot
//!    b. their outputs are merged into one `PolicyInput`
//!    c. every update runs in order and is applied immediately
//! 3. Record the resulting snapshot
//!
//! Later stages therefore read values already updated earlier in the same
//! timestep; stage order encodes the data-dependency graph.

use std::collections::HashMap;

use tracing::{debug, info, trace, warn};

use crate::domain::{keys, State, Trajectory};
use crate::error::{ConfigError, RunError};
use crate::models::Model;

use super::config::EngineConfig;
use super::stage::Stage;

/// Upper bound on trajectory pre-allocation; longer runs grow on demand.
const MAX_PREALLOCATED_STATES: u64 = 1 << 16;

/// Validated stage list, ready to run.
#[derive(Debug)]
pub struct StageEngine {
    stages: Vec<Stage>,
}

impl StageEngine {
    /// Validate the stage table against the state it will start from.
    ///
    /// Rejects: overlapping policy outputs within a stage, a variable owned
    /// by two updates, writes to `timestep`, reads of keys absent from the
    /// initial state, and update inputs no policy of the stage produces.
    pub fn new(stages: Vec<Stage>, initial_state: &State) -> Result<Self, ConfigError> {
        validate_topology(&stages, initial_state)?;
        Ok(Self { stages })
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Run `config.timesteps` timesteps starting from `initial_state`.
    ///
    /// The returned trajectory holds `timesteps + 1` snapshots. Any step
    /// failure aborts the run and reports its timestep and stage.
    ///
    /// Re-validates `config` and the topology: a `StageEngine` can be run
    /// directly with an initial state other than the one it was built from.
    pub fn run(
        &mut self,
        initial_state: State,
        config: &EngineConfig,
    ) -> Result<Trajectory, RunError> {
        config.validate()?;
        validate_topology(&self.stages, &initial_state)?;

        let capacity = config.timesteps.saturating_add(1).min(MAX_PREALLOCATED_STATES) as usize;
        let mut trajectory = Trajectory::with_capacity(capacity);

        let mut state = initial_state;
        state.set_timestep(0);
        trajectory.push(state.clone());

        debug!(
            stages = self.stages.len(),
            timesteps = config.timesteps,
            substeps = config.substeps_per_timestep,
            "starting pipeline run"
        );

        for _ in 0..config.timesteps {
            let timestep = state.timestep() + 1;
            state.set_timestep(timestep);

            for _ in 0..config.substeps_per_timestep {
                for stage in &mut self.stages {
                    if let Err(source) = stage.execute(&mut state) {
                        warn!(
                            timestep,
                            stage = stage.name(),
                            error = %source,
                            "pipeline run aborted"
                        );
                        return Err(RunError::Step {
                            timestep,
                            stage: stage.name().to_string(),
                            source,
                        });
                    }
                }
            }

            trace!(timestep, "timestep complete");
            trajectory.push(state.clone());
        }

        debug!(states = trajectory.len(), "pipeline run finished");
        Ok(trajectory)
    }
}

/// Run a model from its own initial state.
pub fn run<M: Model + ?Sized>(model: &M, config: &EngineConfig) -> Result<Trajectory, RunError> {
    run_with_state(model, model.initial_state(), config)
}

/// Run a model from a caller-supplied initial state.
///
/// The model's stage list is built fresh for this run, so filters and random
/// streams never carry over between runs.
pub fn run_with_state<M: Model + ?Sized>(
    model: &M,
    initial_state: State,
    config: &EngineConfig,
) -> Result<Trajectory, RunError> {
    config.validate()?;
    if let Some(available) = model.max_timesteps() {
        if config.timesteps > available {
            return Err(ConfigError::TimestepsExceedSeries {
                requested: config.timesteps,
                available,
            }
            .into());
        }
    }

    let stages = model.build_stages(&initial_state)?;
    let mut engine = StageEngine::new(stages, &initial_state)?;

    info!(
        model = model.name(),
        timesteps = config.timesteps,
        stages = engine.stages().len(),
        "running oracle model"
    );
    engine.run(initial_state, config)
}

fn validate_topology(stages: &[Stage], initial_state: &State) -> Result<(), ConfigError> {
    if initial_state.has_reserved_variable() {
        return Err(ConfigError::ReservedKey("initial state".into()));
    }

    let mut owners: HashMap<&str, &str> = HashMap::new();

    for stage in stages {
        let mut producers: HashMap<&str, &str> = HashMap::new();

        for policy in stage.policies() {
            for key in policy.reads() {
                if !initial_state.contains(key) {
                    return Err(ConfigError::UnknownStateKey {
                        stage: stage.name().to_string(),
                        consumer: policy.name().to_string(),
                        key: key.clone(),
                    });
                }
            }
            for output in policy.outputs() {
                if let Some(first) = producers.insert(output.as_str(), policy.name()) {
                    return Err(ConfigError::OverlappingPolicyOutput {
                        stage: stage.name().to_string(),
                        key: output.clone(),
                        first: first.to_string(),
                        second: policy.name().to_string(),
                    });
                }
            }
        }

        for update in stage.updates() {
            let variable = update.variable();
            if variable == keys::TIMESTEP {
                return Err(ConfigError::ReservedKey(format!("stage '{}'", stage.name())));
            }
            for key in update.reads().iter().map(String::as_str).chain([variable]) {
                if !initial_state.contains(key) {
                    return Err(ConfigError::UnknownStateKey {
                        stage: stage.name().to_string(),
                        consumer: variable.to_string(),
                        key: key.to_string(),
                    });
                }
            }
            for key in update.inputs() {
                if !producers.contains_key(key.as_str()) {
                    return Err(ConfigError::UnknownPolicyInput {
                        stage: stage.name().to_string(),
                        variable: variable.to_string(),
                        key: key.clone(),
                    });
                }
            }
            if let Some(first) = owners.insert(variable, stage.name()) {
                return Err(ConfigError::DuplicateOwner {
                    variable: variable.to_string(),
                    first: first.to_string(),
                    second: stage.name().to_string(),
                });
            }
        }
    }

    Ok(())
}

//! Stage table: policies, state updates, and the policy input between them.
//!
//! A stage is assembled once when a model builds its pipeline. Every policy
//! and update declares the keys it touches, so the engine can reject
//! overlapping outputs and unknown dependencies before the first timestep.

use std::collections::BTreeMap;
use std::fmt;

use crate::domain::State;
use crate::error::StepError;

/// Policy body: reads the pre-stage state, proposes values.
pub type PolicyFn = Box<dyn FnMut(&State) -> Result<PolicyInput, StepError> + Send>;

/// Update body: reads the (partially updated) state and the merged policy
/// input, returns the new value of its variable.
pub type UpdateFn = Box<dyn Fn(&State, &PolicyInput) -> Result<f64, StepError> + Send>;

/// Merged output of all policies of one stage. Discarded after the stage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolicyInput {
    values: BTreeMap<String, f64>,
}

impl PolicyInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-entry input, the common case for one-signal policies.
    pub fn single(key: impl Into<String>, value: f64) -> Self {
        let mut input = Self::new();
        input.insert(key, value);
        input
    }

    pub fn insert(&mut self, key: impl Into<String>, value: f64) {
        self.values.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.values.get(key).copied()
    }

    pub fn require(&self, key: &str) -> Result<f64, StepError> {
        self.get(key)
            .ok_or_else(|| StepError::MissingInput(key.to_string()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl IntoIterator for PolicyInput {
    type Item = (String, f64);
    type IntoIter = std::collections::btree_map::IntoIter<String, f64>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}

/// A named policy with its declared reads and outputs.
pub struct Policy {
    name: String,
    reads: Vec<String>,
    outputs: Vec<String>,
    func: PolicyFn,
}

impl Policy {
    pub fn new<F>(name: impl Into<String>, reads: &[&str], outputs: &[&str], func: F) -> Self
    where
        F: FnMut(&State) -> Result<PolicyInput, StepError> + Send + 'static,
    {
        Self {
            name: name.into(),
            reads: reads.iter().map(|s| s.to_string()).collect(),
            outputs: outputs.iter().map(|s| s.to_string()).collect(),
            func: Box::new(func),
        }
    }

    /// Policy producing exactly one policy-input value.
    pub fn single<F>(name: impl Into<String>, reads: &[&str], output: &str, mut func: F) -> Self
    where
        F: FnMut(&State) -> Result<f64, StepError> + Send + 'static,
    {
        let key = output.to_string();
        Self::new(name, reads, &[output], move |state| {
            Ok(PolicyInput::single(key.clone(), func(state)?))
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn reads(&self) -> &[String] {
        &self.reads
    }

    pub fn outputs(&self) -> &[String] {
        &self.outputs
    }

    pub(crate) fn evaluate(&mut self, state: &State) -> Result<PolicyInput, StepError> {
        let input = (self.func)(state)?;
        for (key, _) in input.values.iter() {
            if !self.outputs.iter().any(|o| o == key) {
                return Err(StepError::UndeclaredOutput {
                    policy: self.name.clone(),
                    key: key.clone(),
                });
            }
        }
        Ok(input)
    }
}

impl fmt::Debug for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Policy")
            .field("name", &self.name)
            .field("reads", &self.reads)
            .field("outputs", &self.outputs)
            .finish_non_exhaustive()
    }
}

/// A state update owning exactly one variable.
pub struct StateUpdate {
    variable: String,
    reads: Vec<String>,
    inputs: Vec<String>,
    func: UpdateFn,
}

impl StateUpdate {
    /// General update. `reads` are state keys, `inputs` are policy-input keys.
    pub fn new<F>(variable: impl Into<String>, reads: &[&str], inputs: &[&str], func: F) -> Self
    where
        F: Fn(&State, &PolicyInput) -> Result<f64, StepError> + Send + 'static,
    {
        Self {
            variable: variable.into(),
            reads: reads.iter().map(|s| s.to_string()).collect(),
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
            func: Box::new(func),
        }
    }

    /// Copy one policy-input value into `variable`.
    pub fn from_input(variable: impl Into<String>, input: &str) -> Self {
        let key = input.to_string();
        Self::new(variable, &[], &[input], move |_, policy_input| {
            policy_input.require(&key)
        })
    }

    pub fn variable(&self) -> &str {
        &self.variable
    }

    pub fn reads(&self) -> &[String] {
        &self.reads
    }

    pub fn inputs(&self) -> &[String] {
        &self.inputs
    }

    pub(crate) fn evaluate(&self, state: &State, input: &PolicyInput) -> Result<f64, StepError> {
        (self.func)(state, input)
    }
}

impl fmt::Debug for StateUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateUpdate")
            .field("variable", &self.variable)
            .field("reads", &self.reads)
            .field("inputs", &self.inputs)
            .finish_non_exhaustive()
    }
}

/// One ordered phase of a timestep: policies, then updates.
#[derive(Debug)]
pub struct Stage {
    name: String,
    policies: Vec<Policy>,
    updates: Vec<StateUpdate>,
}

impl Stage {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            policies: Vec::new(),
            updates: Vec::new(),
        }
    }

    pub fn policy(mut self, policy: Policy) -> Self {
        self.policies.push(policy);
        self
    }

    pub fn update(mut self, update: StateUpdate) -> Self {
        self.updates.push(update);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn policies(&self) -> &[Policy] {
        &self.policies
    }

    pub fn updates(&self) -> &[StateUpdate] {
        &self.updates
    }

    /// Variables this stage writes, in update order.
    pub fn owned_variables(&self) -> impl Iterator<Item = &str> {
        self.updates.iter().map(StateUpdate::variable)
    }

    /// Run every policy against the same snapshot, then apply every update
    /// in declared order. Later updates see earlier updates of this stage.
    pub(crate) fn execute(&mut self, state: &mut State) -> Result<(), StepError> {
        let mut merged = PolicyInput::new();
        for policy in &mut self.policies {
            for (key, value) in policy.evaluate(state)? {
                merged.insert(key, value);
            }
        }
        for update in &self.updates {
            let value = update.evaluate(state, &merged)?;
            if !value.is_finite() {
                return Err(StepError::NonFinite {
                    variable: update.variable.clone(),
                    value,
                });
            }
            state.insert(update.variable.clone(), value);
        }
        Ok(())
    }
}

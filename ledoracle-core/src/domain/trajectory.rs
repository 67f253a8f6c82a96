//! Trajectory — the append-only record of one run.
//!
//! Index 0 is the initial state; index `t` is the state after `t` timesteps.

use serde::{Deserialize, Serialize};

use super::state::{keys, State};

/// Ordered per-timestep state snapshots produced by the engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    states: Vec<State>,
}

impl Trajectory {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            states: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn push(&mut self, state: State) {
        self.states.push(state);
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// State after `timestep` timesteps.
    pub fn get(&self, timestep: usize) -> Option<&State> {
        self.states.get(timestep)
    }

    pub fn initial(&self) -> Option<&State> {
        self.states.first()
    }

    pub fn last(&self) -> Option<&State> {
        self.states.last()
    }

    pub fn states(&self) -> &[State] {
        &self.states
    }

    pub fn iter(&self) -> std::slice::Iter<'_, State> {
        self.states.iter()
    }

    /// Variable names recorded in the initial state (sorted, without `timestep`).
    pub fn variables(&self) -> Vec<String> {
        self.initial()
            .map(|s| s.variables().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Lazy `(timestep, value)` projection of one variable.
    ///
    /// The returned view is `Copy`; each call to [`VariableSeries::iter`]
    /// starts over from the initial state.
    pub fn series<'a>(&'a self, variable: &'a str) -> VariableSeries<'a> {
        VariableSeries {
            states: &self.states,
            variable,
        }
    }

    /// Column-major view: `timestep` first, then every variable in sorted order.
    pub fn to_columns(&self) -> Vec<(String, Vec<f64>)> {
        let mut columns = Vec::with_capacity(self.variables().len() + 1);
        columns.push((keys::TIMESTEP.to_string(), self.series(keys::TIMESTEP).values()));
        for name in self.variables() {
            let values = self.series(&name).values();
            columns.push((name, values));
        }
        columns
    }
}

impl<'a> IntoIterator for &'a Trajectory {
    type Item = &'a State;
    type IntoIter = std::slice::Iter<'a, State>;

    fn into_iter(self) -> Self::IntoIter {
        self.states.iter()
    }
}

/// Read-only view of one variable across a trajectory.
#[derive(Debug, Clone, Copy)]
pub struct VariableSeries<'a> {
    states: &'a [State],
    variable: &'a str,
}

impl<'a> VariableSeries<'a> {
    pub fn variable(&self) -> &'a str {
        self.variable
    }

    pub fn iter(&self) -> SeriesIter<'a> {
        SeriesIter {
            inner: self.states.iter(),
            variable: self.variable,
        }
    }

    /// Values only, in timestep order.
    pub fn values(&self) -> Vec<f64> {
        self.iter().map(|(_, v)| v).collect()
    }

    /// Value at a specific timestep, if recorded.
    pub fn at(&self, timestep: usize) -> Option<f64> {
        self.states.get(timestep).and_then(|s| s.get(self.variable))
    }
}

impl<'a> IntoIterator for VariableSeries<'a> {
    type Item = (u64, f64);
    type IntoIter = SeriesIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator behind [`VariableSeries`]. Skips snapshots lacking the variable.
#[derive(Debug, Clone)]
pub struct SeriesIter<'a> {
    inner: std::slice::Iter<'a, State>,
    variable: &'a str,
}

impl Iterator for SeriesIter<'_> {
    type Item = (u64, f64);

    fn next(&mut self) -> Option<Self::Item> {
        for state in self.inner.by_ref() {
            if let Some(value) = state.get(self.variable) {
                return Some((state.timestep(), value));
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.inner.len()))
    }
}

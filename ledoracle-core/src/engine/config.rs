//! Engine invocation settings.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

fn default_substeps() -> u32 {
    1
}

/// How long to run and how many passes over the stage list per timestep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub timesteps: u64,
    /// Full passes over the stage list per timestep. The timestep counter
    /// advances once; only the end-of-timestep state is recorded.
    #[serde(default = "default_substeps")]
    pub substeps_per_timestep: u32,
}

impl EngineConfig {
    pub fn new(timesteps: u64) -> Self {
        Self {
            timesteps,
            substeps_per_timestep: default_substeps(),
        }
    }

    pub fn with_substeps(mut self, substeps_per_timestep: u32) -> Self {
        self.substeps_per_timestep = substeps_per_timestep;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timesteps == 0 {
            return Err(ConfigError::ZeroTimesteps);
        }
        if self.substeps_per_timestep == 0 {
            return Err(ConfigError::ZeroSubsteps);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_timesteps_rejected() {
        assert_eq!(EngineConfig::new(0).validate(), Err(ConfigError::ZeroTimesteps));
        assert_eq!(
            EngineConfig::new(5).with_substeps(0).validate(),
            Err(ConfigError::ZeroSubsteps)
        );
        assert!(EngineConfig::new(5).validate().is_ok());
    }

    #[test]
    fn substeps_default_when_absent() {
        let config: EngineConfig = serde_json::from_str(r#"{"timesteps": 24}"#).unwrap();
        assert_eq!(config, EngineConfig::new(24));
    }
}

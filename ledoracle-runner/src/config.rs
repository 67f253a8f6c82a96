//! Serializable scenario configuration.
//!
//! One TOML file describes one oracle scenario:
//!
//! ```toml
//! name = "halving-2020"
//! seed = 42
//!
//! [engine]
//! timesteps = 8760
//!
//! [model]
//! type = "HISTORICAL"
//! koomey_period_in_hours = 11520.0
//!
//! [model.smoothing]
//! kind = "EMA"
//!
//! [data]
//! difficulty = "data/difficulty.csv"
//! price = "data/price.csv"
//! blockreward = "data/blockreward.csv"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use ledoracle_core::{
    ConfigError, EngineConfig, HistoricalModel, HistoricalParams, HistoricalSeries, Model,
    PriceSpikeModel, PriceSpikeParams, VolatilityModel, VolatilityParams,
};

use crate::sweep::SweepConfig;

/// Unique identifier for a scenario (content-addressable hash).
pub type RunId = String;

/// Errors from reading or interpreting a scenario.
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("failed to read scenario file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse scenario: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize scenario: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("the {0} model needs a [data] section with difficulty, price and blockreward files")]
    MissingData(&'static str),

    #[error("sweeps are only defined for the volatility model, not {0}")]
    SweepUnsupported(&'static str),

    #[error("invalid sweep: {0}")]
    InvalidSweep(&'static str),

    #[error(transparent)]
    Invalid(#[from] ConfigError),
}

/// Top-level scenario file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScenarioConfig {
    #[serde(default)]
    pub name: Option<String>,

    /// Master seed. Only stochastic models consume it.
    #[serde(default)]
    pub seed: u64,

    pub engine: EngineConfig,

    pub model: ModelConfig,

    #[serde(default)]
    pub data: Option<DataConfig>,

    #[serde(default)]
    pub sweep: Option<SweepConfig>,
}

/// Model selection (serializable enum).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModelConfig {
    /// Replay of recorded difficulty, price and block reward.
    Historical(HistoricalParams),

    /// Step change in price with difficulty converging toward it.
    PriceSpike(PriceSpikeParams),

    /// Random walks for difficulty and price.
    Volatility(VolatilityParams),
}

impl ModelConfig {
    pub fn name(&self) -> &'static str {
        match self {
            ModelConfig::Historical(_) => "historical",
            ModelConfig::PriceSpike(_) => "price_spike",
            ModelConfig::Volatility(_) => "volatility",
        }
    }

    pub fn needs_data(&self) -> bool {
        matches!(self, ModelConfig::Historical(_))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            ModelConfig::Historical(p) => p.validate(),
            ModelConfig::PriceSpike(p) => p.validate(),
            ModelConfig::Volatility(p) => p.validate(),
        }
    }
}

/// Paths to the three single-column CSV files of the historical series.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DataConfig {
    pub difficulty: PathBuf,
    pub price: PathBuf,
    pub blockreward: PathBuf,
}

impl DataConfig {
    /// Resolve relative paths against `base` (the scenario file's directory).
    pub fn resolve_against(&mut self, base: &Path) {
        for path in [&mut self.difficulty, &mut self.price, &mut self.blockreward] {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }
}

impl ScenarioConfig {
    /// Parse a scenario from a TOML string. Relative data paths are kept as-is.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, ScenarioError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Read a scenario file; relative data paths resolve against its directory.
    pub fn load(path: &Path) -> Result<Self, ScenarioError> {
        let text = std::fs::read_to_string(path).map_err(|source| ScenarioError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&text)?;
        if let (Some(data), Some(base)) = (config.data.as_mut(), path.parent()) {
            data.resolve_against(base);
        }
        Ok(config)
    }

    /// Check everything that can be checked without loading data.
    pub fn validate(&self) -> Result<(), ScenarioError> {
        self.engine.validate()?;
        self.model.validate()?;
        if self.model.needs_data() && self.data.is_none() {
            return Err(ScenarioError::MissingData(self.model.name()));
        }
        if let Some(sweep) = &self.sweep {
            sweep.validate()?;
        }
        Ok(())
    }

    /// Computes a deterministic hash ID for this scenario.
    ///
    /// Two scenarios with identical settings share a RunId; the dataset is
    /// fingerprinted separately.
    pub fn run_id(&self) -> Result<RunId, ScenarioError> {
        let json = serde_json::to_vec(self)?;
        Ok(blake3::hash(&json).to_hex().to_string())
    }

    /// Instantiate the configured model. `series` is required for the
    /// historical model and ignored otherwise.
    pub fn build_model(
        &self,
        series: Option<Arc<HistoricalSeries>>,
    ) -> Result<Box<dyn Model>, ScenarioError> {
        Ok(match &self.model {
            ModelConfig::Historical(params) => {
                let series = series.ok_or(ScenarioError::MissingData("historical"))?;
                Box::new(HistoricalModel::new(series, *params)?)
            }
            ModelConfig::PriceSpike(params) => Box::new(PriceSpikeModel::new(*params)?),
            ModelConfig::Volatility(params) => Box::new(VolatilityModel::new(*params, self.seed)?),
        })
    }
}

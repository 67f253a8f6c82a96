//! Historical series loading for the runner.
//!
//! Each series lives in its own CSV file: a header row, then one value per
//! row in the first column, one row per hour. The three files must have the
//! same number of rows; row `t` of each is the network state at timestep `t`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use ledoracle_core::{ConfigError, HistoricalSeries};

use crate::config::DataConfig;

/// Errors from the data loading layer. Rows are 1-based, header excluded.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{path}, row {row}: {source}")]
    Read {
        path: PathBuf,
        row: usize,
        #[source]
        source: csv::Error,
    },

    #[error("{path}, row {row}: missing value")]
    MissingValue { path: PathBuf, row: usize },

    #[error("{path}, row {row}: cannot parse '{value}' as a number")]
    Parse {
        path: PathBuf,
        row: usize,
        value: String,
    },

    #[error("series rejected: {0}")]
    Series(#[from] ConfigError),
}

/// Loaded series plus its provenance hash.
#[derive(Debug, Clone)]
pub struct LoadedSeries {
    pub series: Arc<HistoricalSeries>,
    /// Dataset hash for fingerprinting (BLAKE3 over all values).
    pub dataset_hash: String,
}

/// Read the first column of a single-column CSV file as `f64` values.
pub fn load_column(path: &Path) -> Result<Vec<f64>, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|source| LoadError::Open {
            path: path.to_path_buf(),
            source,
        })?;

    let mut values = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let row = index + 1;
        let record = record.map_err(|source| LoadError::Read {
            path: path.to_path_buf(),
            row,
            source,
        })?;
        let field = match record.get(0) {
            Some(field) if !field.is_empty() => field,
            _ => {
                return Err(LoadError::MissingValue {
                    path: path.to_path_buf(),
                    row,
                })
            }
        };
        let value = field.parse::<f64>().map_err(|_| LoadError::Parse {
            path: path.to_path_buf(),
            row,
            value: field.to_string(),
        })?;
        values.push(value);
    }

    debug!(path = %path.display(), rows = values.len(), "loaded series column");
    Ok(values)
}

/// Load all three series and fingerprint them.
pub fn load_series(data: &DataConfig) -> Result<LoadedSeries, LoadError> {
    let difficulty = load_column(&data.difficulty)?;
    let price = load_column(&data.price)?;
    let blockreward = load_column(&data.blockreward)?;

    let series = HistoricalSeries::new(difficulty, price, blockreward)?;
    let dataset_hash = compute_dataset_hash(&series);
    info!(rows = series.len(), hash = %&dataset_hash[..12], "loaded historical series");

    Ok(LoadedSeries {
        series: Arc::new(series),
        dataset_hash,
    })
}

/// Compute a deterministic BLAKE3 hash over all series values.
///
/// Each series is prefixed with its name so that swapping two files
/// changes the hash.
pub fn compute_dataset_hash(series: &HistoricalSeries) -> String {
    let mut hasher = blake3::Hasher::new();
    for (name, values) in [
        ("difficulty", series.difficulty()),
        ("price", series.price()),
        ("blockreward", series.blockreward()),
    ] {
        hasher.update(name.as_bytes());
        hasher.update(&(values.len() as u64).to_le_bytes());
        for value in values {
            hasher.update(&value.to_le_bytes());
        }
    }
    hasher.finalize().to_hex().to_string()
}

//! Reporting and export — JSON and CSV artifact generation.
//!
//! Provides two export formats for run results:
//! - **JSON**: full round-trip serialization with schema versioning
//! - **CSV**: trajectory table and sweep table for external analysis tools
//!
//! All persisted artifacts include a `schema_version` field. Unknown versions
//! are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use ledoracle_core::domain::keys;
use ledoracle_core::Trajectory;

use crate::metrics::VariableSummary;
use crate::runner::{RunManifest, RunResult, SCHEMA_VERSION};
use crate::sweep::SweepResults;

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `RunResult` to pretty JSON.
pub fn export_json(result: &RunResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize RunResult to JSON")
}

/// Deserialize a `RunResult` from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<RunResult> {
    let result: RunResult =
        serde_json::from_str(json).context("failed to deserialize RunResult from JSON")?;
    check_schema(&result.manifest)?;
    Ok(result)
}

fn check_schema(manifest: &RunManifest) -> Result<()> {
    if manifest.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            manifest.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(())
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Export a trajectory as CSV: one row per timestep, `timestep` first, then
/// every variable in sorted order. Values use shortest round-trip formatting.
pub fn export_trajectory_csv(trajectory: &Trajectory) -> Result<String> {
    let columns = trajectory.to_columns();
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record(columns.iter().map(|(name, _)| name.as_str()))?;

    for row in 0..trajectory.len() {
        let record: Vec<String> = columns
            .iter()
            .map(|(name, values)| match values.get(row) {
                Some(v) if name == keys::TIMESTEP => format!("{}", *v as u64),
                Some(v) => v.to_string(),
                None => String::new(),
            })
            .collect();
        wtr.write_record(&record)?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Export sweep runs as CSV, one row per run.
///
/// Columns: point, repetition, seed, the four swept parameters, final /
/// mean / std_dev / max_abs_step / settle_timestep of led_price, error.
pub fn export_sweep_csv(results: &SweepResults) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "point",
        "repetition",
        "seed",
        "diff_vol_std_dev",
        "price_vol_std_dev",
        "diff_trend",
        "price_trend",
        "led_price_final",
        "led_price_mean",
        "led_price_std_dev",
        "led_price_max_abs_step",
        "led_price_settle_timestep",
        "error",
    ])?;

    for run in results.runs() {
        let led = run.summary.as_ref().and_then(|s| s.led_price());
        let stat = |f: fn(&VariableSummary) -> String| led.map(f).unwrap_or_default();
        wtr.write_record([
            run.point.to_string(),
            run.repetition.to_string(),
            run.seed.to_string(),
            run.params.diff_vol_std_dev.to_string(),
            run.params.price_vol_std_dev.to_string(),
            run.params.diff_trend.to_string(),
            run.params.price_trend.to_string(),
            stat(|s| s.last.to_string()),
            stat(|s| s.mean.to_string()),
            stat(|s| s.std_dev.to_string()),
            stat(|s| s.max_abs_step.to_string()),
            stat(|s| s.settle_timestep.to_string()),
            run.error.clone().unwrap_or_default(),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the full artifact set for a single run.
///
/// Creates a directory named `{model}_{run_id prefix}_{timestamp}/` under
/// `output_dir` containing:
/// - `manifest.json` — provenance of the run
/// - `summary.json` — per-variable KPIs
/// - `result.json` — the full `RunResult`, trajectory included
/// - `trajectory.csv` — one row per timestep
///
/// Returns the path to the created directory.
pub fn save_artifacts(result: &RunResult, output_dir: &Path) -> Result<PathBuf> {
    let manifest = &result.manifest;
    let id_prefix: String = manifest.run_id.chars().take(12).collect();
    let dirname = format!(
        "{}_{}_{}",
        manifest.model,
        id_prefix,
        manifest.generated_at.format("%Y%m%d_%H%M%S")
    );
    let run_dir = output_dir.join(dirname);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    let manifest_json =
        serde_json::to_string_pretty(manifest).context("failed to serialize manifest")?;
    write_file(&run_dir.join("manifest.json"), &manifest_json)?;

    let summary_json =
        serde_json::to_string_pretty(&result.summary).context("failed to serialize summary")?;
    write_file(&run_dir.join("summary.json"), &summary_json)?;

    write_file(&run_dir.join("result.json"), &export_json(result)?)?;
    write_file(
        &run_dir.join("trajectory.csv"),
        &export_trajectory_csv(&result.trajectory)?,
    )?;

    Ok(run_dir)
}

/// Load a `RunResult` from an artifact directory's result.json.
///
/// Rejects unknown schema versions.
pub fn load_artifacts(dir: &Path) -> Result<RunResult> {
    let path = dir.join("result.json");
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    std::fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScenarioConfig;
    use crate::runner::run_scenario;

    fn spike_result(timesteps: u64) -> RunResult {
        let config = ScenarioConfig::from_toml_str(&format!(
            "[engine]\ntimesteps = {timesteps}\n[model]\ntype = \"PRICE_SPIKE\"\nbtc_price = 100.0\n"
        ))
        .unwrap();
        run_scenario(&config, None).unwrap()
    }

    #[test]
    fn test_trajectory_csv_layout() {
        let result = spike_result(2);
        let csv = export_trajectory_csv(&result.trajectory).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(
            lines[0],
            "timestep,blockreward_smoothed,btc_blockreward,btc_diff,btc_price,kdiff,kdiff_smoothed,led_price"
        );
        assert!(lines[1].starts_with("0,1,1,1,100,0.5,0.5,2"));
        assert!(lines[2].starts_with("1,"));
    }

    #[test]
    fn test_future_schema_rejected() {
        let mut result = spike_result(1);
        result.manifest.schema_version = SCHEMA_VERSION + 1;
        let json = export_json(&result).unwrap();
        assert!(import_json(&json).is_err());
    }
}

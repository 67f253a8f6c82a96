//! End-to-end scenario tests: TOML file on disk -> data load -> run -> artifacts.
//!
//! 1. Historical scenario with relative data paths
//! 2. Artifact bundle contents and reload
//! 3. Data errors name the file and row
//! 4. Volatility sweeps from a scenario file
//! 5. Grid properties

use std::path::{Path, PathBuf};

use ledoracle_core::{keys, VolatilityParams};
use ledoracle_runner::{
    export_sweep_csv, load_artifacts, run_from_config, save_artifacts, sweep_scenario, LoadError,
    RunnerError, ScenarioConfig, ScenarioError, VolatilityGrid,
};
use proptest::prelude::*;

fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, contents).unwrap();
    path
}

const HISTORICAL_TOML: &str = r#"
name = "replay"

[engine]
timesteps = 2

[model]
type = "HISTORICAL"

[data]
difficulty = "data/difficulty.csv"
price = "data/price.csv"
blockreward = "data/blockreward.csv"
"#;

fn historical_fixture(dir: &Path, price_csv: &str) -> PathBuf {
    write(dir, "data/difficulty.csv", "difficulty\n10\n10\n10\n");
    write(dir, "data/price.csv", price_csv);
    write(dir, "data/blockreward.csv", "blockreward\n1\n1\n1\n");
    write(dir, "scenario.toml", HISTORICAL_TOML)
}

// ── 1. Historical scenario ───────────────────────────────────────────

#[test]
fn historical_scenario_resolves_relative_paths() {
    let dir = tempfile::tempdir().unwrap();
    let scenario = historical_fixture(dir.path(), "price\n100\n110\n121\n");

    let config = ScenarioConfig::load(&scenario).unwrap();
    let data = config.data.as_ref().unwrap();
    assert_eq!(data.price, dir.path().join("data/price.csv"));

    let result = run_from_config(&config).unwrap();
    assert_eq!(result.manifest.model, "historical");
    assert_eq!(result.manifest.scenario_name.as_deref(), Some("replay"));
    assert_eq!(result.trajectory.len(), 3);
    assert!(result.manifest.dataset_hash.is_some());

    let prices = result.trajectory.series(keys::BTC_PRICE).values();
    assert_eq!(prices, vec![100.0, 110.0, 121.0]);
}

#[test]
fn same_data_same_hash() {
    let dir = tempfile::tempdir().unwrap();
    let scenario = historical_fixture(dir.path(), "price\n100\n110\n121\n");
    let config = ScenarioConfig::load(&scenario).unwrap();

    let a = run_from_config(&config).unwrap();
    let b = run_from_config(&config).unwrap();
    assert_eq!(a.manifest.run_id, b.manifest.run_id);
    assert_eq!(a.manifest.dataset_hash, b.manifest.dataset_hash);
    assert_eq!(a.trajectory, b.trajectory);
}

// ── 2. Artifacts ─────────────────────────────────────────────────────

#[test]
fn artifacts_are_written_and_reload() {
    let dir = tempfile::tempdir().unwrap();
    let scenario = historical_fixture(dir.path(), "price\n100\n110\n121\n");
    let result = run_from_config(&ScenarioConfig::load(&scenario).unwrap()).unwrap();

    let out = dir.path().join("results");
    let run_dir = save_artifacts(&result, &out).unwrap();
    assert!(run_dir.starts_with(&out));
    let dirname = run_dir.file_name().unwrap().to_string_lossy().to_string();
    assert!(dirname.starts_with("historical_"));

    for file in ["manifest.json", "summary.json", "result.json", "trajectory.csv"] {
        assert!(run_dir.join(file).exists(), "missing {file}");
    }

    let csv = std::fs::read_to_string(run_dir.join("trajectory.csv")).unwrap();
    let mut lines = csv.lines();
    assert!(lines.next().unwrap().starts_with("timestep,"));
    assert_eq!(lines.count(), 3);

    let reloaded = load_artifacts(&run_dir).unwrap();
    assert_eq!(reloaded.manifest, result.manifest);
    assert_eq!(reloaded.trajectory.len(), result.trajectory.len());
}

// ── 3. Data errors ───────────────────────────────────────────────────

#[test]
fn unparseable_value_reports_file_and_row() {
    let dir = tempfile::tempdir().unwrap();
    let scenario = historical_fixture(dir.path(), "price\n100\nabc\n121\n");
    let config = ScenarioConfig::load(&scenario).unwrap();

    let err = run_from_config(&config).unwrap_err();
    let message = err.to_string();
    match err {
        RunnerError::Data(LoadError::Parse { path, row, value }) => {
            assert!(path.ends_with("price.csv"));
            assert_eq!(row, 2);
            assert_eq!(value, "abc");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(message.contains("price.csv"));
    assert!(message.contains("row 2"));
}

#[test]
fn mismatched_series_lengths_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let scenario = historical_fixture(dir.path(), "price\n100\n110\n");
    let config = ScenarioConfig::load(&scenario).unwrap();
    assert!(matches!(
        run_from_config(&config),
        Err(RunnerError::Data(LoadError::Series(_)))
    ));
}

#[test]
fn missing_scenario_file() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        ScenarioConfig::load(&dir.path().join("absent.toml")),
        Err(ScenarioError::Io { .. })
    ));
}

// ── 4. Sweeps ────────────────────────────────────────────────────────

const SWEEP_TOML: &str = r#"
seed = 11

[engine]
timesteps = 48

[model]
type = "VOLATILITY"
price_vol_std_dev = 0.5

[sweep]
runs_per_point = 3
parallel = true

[sweep.grid]
price_vol_std_dev = [0.0, 0.5]
diff_trend = [0.0, 0.1]
"#;

#[test]
fn sweep_from_scenario_file() {
    let dir = tempfile::tempdir().unwrap();
    let scenario = write(dir.path(), "sweep.toml", SWEEP_TOML);
    let config = ScenarioConfig::load(&scenario).unwrap();

    let results = sweep_scenario(&config).unwrap();
    assert_eq!(results.len(), 4 * 3);
    assert_eq!(results.failures().count(), 0);

    let stats = results.point_stats();
    assert_eq!(stats.len(), 4);
    // No shocks and no drift: every repetition stays at the initial price.
    assert_eq!(stats[0].params.price_vol_std_dev, 0.0);
    assert_eq!(stats[0].params.diff_trend, 0.0);
    assert_eq!(stats[0].std_final_led_price, 0.0);

    let csv = export_sweep_csv(&results).unwrap();
    assert_eq!(csv.lines().count(), 12 + 1);
    assert!(csv.lines().next().unwrap().starts_with("point,repetition,seed,"));
}

#[test]
fn sweep_is_independent_of_threading() {
    let parallel = ScenarioConfig::from_toml_str(SWEEP_TOML).unwrap();
    let mut sequential = parallel.clone();
    if let Some(sweep) = sequential.sweep.as_mut() {
        sweep.parallel = false;
    }
    assert_eq!(
        sweep_scenario(&parallel).unwrap(),
        sweep_scenario(&sequential).unwrap()
    );
}

#[test]
fn sweep_rejects_non_volatility_models() {
    let config = ScenarioConfig::from_toml_str(
        "[engine]\ntimesteps = 10\n[model]\ntype = \"PRICE_SPIKE\"\n",
    )
    .unwrap();
    assert!(matches!(
        sweep_scenario(&config),
        Err(ScenarioError::SweepUnsupported("price_spike"))
    ));
}

// ── 5. Grid properties ───────────────────────────────────────────────

proptest! {
    #[test]
    fn grid_size_matches_point_count(
        diff_vol in prop::collection::vec(0.0f64..2.0, 0..4),
        price_vol in prop::collection::vec(0.0f64..2.0, 0..4),
        price_trend in prop::collection::vec(-1.0f64..1.0, 0..3),
    ) {
        let grid = VolatilityGrid {
            diff_vol_std_dev: diff_vol,
            price_vol_std_dev: price_vol,
            diff_trend: vec![],
            price_trend,
        };
        let base = VolatilityParams::default();
        let points = grid.points(&base);
        prop_assert_eq!(points.len(), grid.size());
        for p in &points {
            prop_assert_eq!(p.diff_trend, base.diff_trend);
            prop_assert_eq!(p.koomey_period_in_hours, base.koomey_period_in_hours);
        }
    }
}

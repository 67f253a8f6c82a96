//! Property tests for filter and engine invariants.
//!
//! Uses proptest to verify:
//! 1. EMA cold start — the first sample is returned unchanged
//! 2. EMA convergence — a constant input is approached monotonically
//! 3. HMA cold start — all three sub-filters start on the first sample
//! 4. Determinism — same model and seed give bit-identical trajectories
//! 5. Trajectory shape — `timesteps + 1` snapshots, timestep column 0..=n

use ledoracle_core::domain::keys;
use ledoracle_core::smoothing::{
    ExponentialMovingAverage, FilterState, HullMovingAverage, SmoothingFunction,
};
use ledoracle_core::{
    run, EngineConfig, PriceSpikeModel, PriceSpikeParams, VolatilityModel, VolatilityParams,
};
use proptest::prelude::*;

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_factor() -> impl Strategy<Value = f64> {
    1.0..20_000.0_f64
}

fn arb_sample() -> impl Strategy<Value = f64> {
    -1.0e6..1.0e6_f64
}

fn arb_volatility() -> impl Strategy<Value = VolatilityParams> {
    (0.0..2.0_f64, 0.0..2.0_f64, -1.0..1.0_f64, -1.0..1.0_f64).prop_map(
        |(diff_vol_std_dev, price_vol_std_dev, diff_trend, price_trend)| VolatilityParams {
            diff_vol_std_dev,
            price_vol_std_dev,
            diff_trend,
            price_trend,
            ..VolatilityParams::default()
        },
    )
}

// ── 1. EMA cold start ────────────────────────────────────────────────

proptest! {
    #[test]
    fn ema_first_sample_passes_through(factor in arb_factor(), x in arb_sample()) {
        let mut ema = ExponentialMovingAverage::new(factor).unwrap();
        prop_assert_eq!(ema.apply_smoothing(x), x);
        prop_assert_eq!(ema.state(), FilterState::Running { old_value: x });
    }
}

// ── 2. EMA convergence ───────────────────────────────────────────────

proptest! {
    /// Fed a constant after any start, the EMA moves toward it every call,
    /// shrinking the gap by `1 - 1/F`, and never overshoots when F >= 1.
    #[test]
    fn ema_converges_monotonically(
        factor in arb_factor(),
        start in arb_sample(),
        target in arb_sample(),
    ) {
        let mut ema = ExponentialMovingAverage::new(factor).unwrap();
        ema.apply_smoothing(start);
        let mut previous_gap = (target - start).abs();
        for _ in 0..50 {
            let out = ema.apply_smoothing(target);
            let gap = (target - out).abs();
            prop_assert!(gap <= previous_gap + 1e-9);
            // Each step closes exactly 1/F of the remaining gap.
            let expected = previous_gap * (1.0 - 1.0 / factor);
            let scale = previous_gap.max(target.abs()).max(1.0);
            prop_assert!((gap - expected).abs() <= 1e-9 * scale);
            previous_gap = gap;
        }
    }
}

// ── 3. HMA cold start ────────────────────────────────────────────────

proptest! {
    #[test]
    fn hma_sub_filters_start_on_first_sample(factor in arb_factor(), x in arb_sample()) {
        let mut hma = HullMovingAverage::new(factor).unwrap();
        prop_assert_eq!(hma.apply_smoothing(x), x);
        let (full, half, sqrt) = hma.sub_filters();
        prop_assert_eq!(full.state(), FilterState::Running { old_value: x });
        prop_assert_eq!(half.state(), FilterState::Running { old_value: x });
        prop_assert_eq!(sqrt.state(), FilterState::Running { old_value: x });
    }
}

// ── 4. Determinism ───────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn volatility_runs_are_reproducible(params in arb_volatility(), seed in any::<u64>()) {
        let model = VolatilityModel::new(params, seed).unwrap();
        let config = EngineConfig::new(100);
        let first = run(&model, &config).unwrap();
        let second = run(&model, &config).unwrap();
        prop_assert_eq!(first, second);
    }
}

// ── 5. Trajectory shape ──────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn trajectory_has_one_snapshot_per_timestep(
        timesteps in 1u64..200,
        convergence in 0.01..=1.0_f64,
    ) {
        let model = PriceSpikeModel::new(PriceSpikeParams {
            diff_convergence: convergence,
            ..PriceSpikeParams::default()
        })
        .unwrap();
        let traj = run(&model, &EngineConfig::new(timesteps)).unwrap();

        prop_assert_eq!(traj.len() as u64, timesteps + 1);
        for (index, (timestep, _)) in traj.series(keys::LED_PRICE).iter().enumerate() {
            prop_assert_eq!(timestep, index as u64);
        }
        // Price is held for the whole run.
        prop_assert!(traj.series(keys::BTC_PRICE).iter().all(|(_, v)| v == 1_000_000.0));
    }
}

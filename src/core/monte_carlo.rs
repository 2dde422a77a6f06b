use std::f64::consts::PI;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use rayon::prelude::*;

use super::types::{MonteCarloResult, PercentileBand};

const PERCENTILES: [f64; 5] = [0.05, 0.25, 0.50, 0.75, 0.95];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonteCarloParams {
    pub initial_assets: f64,
    pub start_age: u32,
    /// Last simulated age, inclusive.
    pub end_age: u32,
    pub mean_return: f64,
    pub volatility: f64,
    pub trials: u32,
    pub seed: u64,
}

impl MonteCarloParams {
    fn years(&self) -> usize {
        (self.start_age..=self.end_age).count()
    }
}

#[derive(Debug)]
struct TrialPath {
    balances: Vec<f64>,
    breached: bool,
}

/// Re-runs the exogenous cash-flow series under log-normal annual returns.
///
/// `cash_flows[i]` is the net flow of the `i`-th simulated year (income
/// minus expenses and taxes, excluding investment return). Missing entries
/// count as zero.
pub fn run_monte_carlo(params: &MonteCarloParams, cash_flows: &[f64]) -> MonteCarloResult {
    let years = params.years();
    let paths: Vec<TrialPath> = (0..params.trials)
        .into_par_iter()
        .map(|trial| run_trial(params, cash_flows, trial))
        .collect();

    let failed_trials = paths.iter().filter(|p| p.breached).count() as u32;
    let success_rate = if params.trials == 0 {
        0.0
    } else {
        100.0 * (params.trials - failed_trials) as f64 / params.trials as f64
    };

    let mut bands = Vec::new();
    if !paths.is_empty() {
        bands.reserve(years);
        let mut column = Vec::with_capacity(paths.len());
        for (idx, age) in (params.start_age..=params.end_age).enumerate() {
            column.clear();
            column.extend(paths.iter().map(|p| p.balances[idx]));
            column.sort_by(|a, b| a.total_cmp(b));
            let [p5, p25, p50, p75, p95] =
                PERCENTILES.map(|p| column[percentile_index(column.len(), p)]);
            bands.push(PercentileBand {
                age,
                p5,
                p25,
                p50,
                p75,
                p95,
            });
        }
    }

    MonteCarloResult {
        trials: params.trials,
        mean_return: params.mean_return,
        volatility: params.volatility,
        bands,
        success_rate,
        failed_trials,
    }
}

/// Zero-volatility path with the same arithmetic as a single trial.
pub fn deterministic_path(
    initial_assets: f64,
    cash_flows: &[f64],
    mean_return: f64,
) -> Vec<f64> {
    let mut balance = initial_assets;
    cash_flows
        .iter()
        .map(|flow| {
            balance = balance * growth_factor(mean_return, 0.0, 0.0) + flow;
            if balance < 0.0 {
                balance = 0.0;
            }
            balance
        })
        .collect()
}

fn run_trial(params: &MonteCarloParams, cash_flows: &[f64], trial: u32) -> TrialPath {
    let mut sampler = NormalSampler::new(derive_seed(params.seed, trial));
    let years = params.years();
    let mut balances = Vec::with_capacity(years);
    let mut balance = params.initial_assets;
    let mut breached = false;

    for idx in 0..years {
        let z = sampler.standard_normal();
        let flow = cash_flows.get(idx).copied().unwrap_or(0.0);
        balance = balance * growth_factor(params.mean_return, params.volatility, z) + flow;
        if balance < 0.0 {
            balance = 0.0;
            breached = true;
        }
        balances.push(balance);
    }

    TrialPath { balances, breached }
}

/// Log-normal gross return with the drift corrected so the expected factor
/// is `1 + mean`. Without volatility the factor is exactly `1 + mean`.
fn growth_factor(mean: f64, volatility: f64, z: f64) -> f64 {
    let gross = (1.0 + mean).max(1e-9);
    if volatility <= 0.0 {
        return gross;
    }
    let drift = gross.ln() - volatility * volatility / 2.0;
    (drift + volatility * z).exp()
}

/// Sorted-sample index for percentile `p`, clamped to the last element.
fn percentile_index(len: usize, p: f64) -> usize {
    if len == 0 {
        return 0;
    }
    ((len as f64 * p).floor() as usize).min(len - 1)
}

fn derive_seed(base_seed: u64, trial: u32) -> u64 {
    splitmix64(base_seed ^ ((trial as u64) << 32) ^ trial as u64)
}

fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

/// Box–Muller standard normals over a ChaCha uniform stream; the second
/// value of each pair is cached for the next call.
struct NormalSampler {
    rng: ChaCha20Rng,
    cached_normal: Option<f64>,
}

impl NormalSampler {
    fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
            cached_normal: None,
        }
    }

    fn standard_normal(&mut self) -> f64 {
        if let Some(z) = self.cached_normal.take() {
            return z;
        }

        let u1 = self.rng.random::<f64>().max(1e-12);
        let u2 = self.rng.random::<f64>();
        let r = (-2.0 * u1.ln()).sqrt();
        let theta = 2.0 * PI * u2;

        self.cached_normal = Some(r * theta.sin());
        r * theta.cos()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{any, prop_assert, proptest};

    const EPS: f64 = 1e-9;

    fn assert_approx_tol(actual: f64, expected: f64, tol: f64) {
        assert!(
            (actual - expected).abs() <= tol,
            "expected {expected}, got {actual}, tolerance {tol}"
        );
    }

    fn params(trials: u32, volatility: f64) -> MonteCarloParams {
        MonteCarloParams {
            initial_assets: 1_000.0,
            start_age: 30,
            end_age: 89,
            mean_return: 0.04,
            volatility,
            trials,
            seed: 42,
        }
    }

    fn series(result: &MonteCarloResult, pick: fn(&PercentileBand) -> f64) -> Vec<f64> {
        result.bands.iter().map(pick).collect()
    }

    #[test]
    fn zero_volatility_collapses_every_band_onto_the_deterministic_path() {
        let flows = vec![-20.0; 60];
        let p = params(100, 0.0);
        let result = run_monte_carlo(&p, &flows);
        let expected = deterministic_path(p.initial_assets, &flows, p.mean_return);

        assert_eq!(result.bands.len(), 60);
        let p50 = series(&result, |b| b.p50);
        assert_eq!(p50, expected);
        for pick in [
            (|b: &PercentileBand| b.p5) as fn(&PercentileBand) -> f64,
            |b| b.p25,
            |b| b.p75,
            |b| b.p95,
        ] {
            assert_eq!(series(&result, pick), p50);
        }
        assert_eq!(result.success_rate, 100.0);
    }

    #[test]
    fn bands_are_ordered_and_ages_ascend() {
        let flows = vec![10.0; 60];
        let result = run_monte_carlo(&params(500, 0.15), &flows);
        for (idx, band) in result.bands.iter().enumerate() {
            assert_eq!(band.age, 30 + idx as u32);
            assert!(band.p5 <= band.p25);
            assert!(band.p25 <= band.p50);
            assert!(band.p50 <= band.p75);
            assert!(band.p75 <= band.p95);
        }
    }

    #[test]
    fn same_seed_gives_identical_results() {
        let flows = vec![-30.0; 60];
        let a = run_monte_carlo(&params(200, 0.2), &flows);
        let b = run_monte_carlo(&params(200, 0.2), &flows);
        assert_eq!(a, b);

        let mut other = params(200, 0.2);
        other.seed = 7;
        assert_ne!(run_monte_carlo(&other, &flows).bands, a.bands);
    }

    #[test]
    fn heavy_outflows_fail_every_trial() {
        let flows = vec![-500.0; 60];
        let result = run_monte_carlo(&params(50, 0.1), &flows);
        assert_eq!(result.failed_trials, 50);
        assert_eq!(result.success_rate, 0.0);
        assert!(result.bands.last().is_some_and(|b| b.p95 == 0.0));
    }

    #[test]
    fn breached_trials_keep_accumulating_from_zero() {
        let mut flows = vec![-2_000.0];
        flows.extend(std::iter::repeat_n(100.0, 59));
        let p = params(1, 0.0);
        let result = run_monte_carlo(&p, &flows);

        assert_eq!(result.failed_trials, 1);
        assert_approx_tol(result.bands[0].p50, 0.0, EPS);
        assert_approx_tol(result.bands[1].p50, 100.0, EPS);
        assert_approx_tol(result.bands[2].p50, 100.0 * 1.04 + 100.0, EPS);
    }

    #[test]
    fn zero_trials_yield_no_bands() {
        let result = run_monte_carlo(&params(0, 0.1), &[0.0; 60]);
        assert!(result.bands.is_empty());
        assert_eq!(result.success_rate, 0.0);
    }

    #[test]
    fn percentile_index_is_clamped_to_the_last_sample() {
        assert_eq!(percentile_index(1, 0.95), 0);
        assert_eq!(percentile_index(20, 0.95), 19);
        assert_eq!(percentile_index(100, 0.95), 95);
        assert_eq!(percentile_index(100, 0.05), 5);
        assert_eq!(percentile_index(0, 0.5), 0);
    }

    #[test]
    fn growth_factor_mean_matches_the_arithmetic_return() {
        let mut sampler = NormalSampler::new(11);
        let n = 200_000;
        let mean = (0..n)
            .map(|_| growth_factor(0.05, 0.2, sampler.standard_normal()))
            .sum::<f64>()
            / n as f64;
        assert_approx_tol(mean, 1.05, 0.005);
    }

    #[test]
    fn standard_normal_has_unit_moments() {
        let mut sampler = NormalSampler::new(3);
        let n = 100_000;
        let draws: Vec<f64> = (0..n).map(|_| sampler.standard_normal()).collect();
        let mean = draws.iter().sum::<f64>() / n as f64;
        let var = draws.iter().map(|z| (z - mean).powi(2)).sum::<f64>() / n as f64;
        assert_approx_tol(mean, 0.0, 0.02);
        assert_approx_tol(var, 1.0, 0.02);
    }

    #[test]
    fn median_approaches_the_deterministic_path_as_volatility_shrinks() {
        let flows = vec![5.0; 60];
        let p = params(400, 0.001);
        let result = run_monte_carlo(&p, &flows);
        let expected = deterministic_path(p.initial_assets, &flows, p.mean_return);
        for (band, target) in result.bands.iter().zip(expected) {
            assert_approx_tol(band.p50, target, target * 0.01);
        }
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(24))]

        #[test]
        fn prop_success_rate_is_a_percentage(
            seed in any::<u64>(),
            trials in 1u32..80,
            vol_bp in 0u32..4_000,
            flow in -300i32..300,
            initial in 0u32..5_000
        ) {
            let mut p = params(trials, vol_bp as f64 / 10_000.0);
            p.seed = seed;
            p.initial_assets = initial as f64;
            let result = run_monte_carlo(&p, &vec![flow as f64; 60]);
            prop_assert!((0.0..=100.0).contains(&result.success_rate));
            prop_assert!(result.failed_trials <= trials);
            for band in &result.bands {
                prop_assert!(band.p5 >= 0.0 && band.p5.is_finite());
                prop_assert!(band.p95.is_finite());
            }
        }
    }
}

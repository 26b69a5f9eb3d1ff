//! Intervals for a Poisson signal with unknown background.

use rand::rngs::StdRng;
use rand::SeedableRng;
use unified_ci::interval::{self, cached_delta};
use unified_ci::models::hybrid::{self, critical_value, global_fit_theta, likelihood_ratio};
use unified_ci::{DeltaCache, DeltaFunction, HybridPoisson};

use crate::test_helpers::approx_eq;

#[test]
fn test_seeded_intervals_are_bit_identical() {
    let first = hybrid::confidence_interval(8, 6, 2.0, 0.9, 300, &mut StdRng::seed_from_u64(42)).unwrap();
    let second = hybrid::confidence_interval(8, 6, 2.0, 0.9, 300, &mut StdRng::seed_from_u64(42)).unwrap();
    assert_eq!(first.lower.to_bits(), second.lower.to_bits());
    assert_eq!(first.upper.to_bits(), second.upper.to_bits());
}

#[test]
fn test_signal_excess() {
    let mut rng = StdRng::seed_from_u64(1);
    let ci = hybrid::confidence_interval(8, 6, 2.0, 0.9, 500, &mut rng).unwrap();
    assert!(ci.lower > 0.9 && ci.lower < 1.5, "{:?}", ci);
    assert!(ci.upper > 10.2 && ci.upper < 11.5, "{:?}", ci);
    assert!(ci.contains(global_fit_theta(8, 6, 2.0)));
}

#[test]
fn test_no_signal_counts() {
    let mut rng = StdRng::seed_from_u64(2);
    let ci = hybrid::confidence_interval(0, 23, 4.0, 0.9, 500, &mut rng).unwrap();
    assert_eq!(ci.lower, 0.0);
    assert!(ci.upper > 0.5 && ci.upper < 1.1, "{:?}", ci);
}

#[test]
fn test_critical_value_bounds_observed_ratio() {
    let mut rng = StdRng::seed_from_u64(3);
    // At the best fit the observed ratio is 1, the largest possible value.
    let theta = global_fit_theta(10, 12, 4.0);
    assert!(approx_eq(likelihood_ratio(10, 12, theta, 4.0), 1.0, 1e-9));
    let cv = critical_value(10, 12, theta, 4.0, 0.9, 1000, &mut rng).unwrap();
    assert!(cv > 0.0 && cv <= 1.0);
}

#[test]
fn test_limits_agree_with_interval() {
    let model = HybridPoisson::new(2.0, 300).unwrap();
    let ci = model
        .confidence_interval(8, 6, 0.6827, &mut StdRng::seed_from_u64(9))
        .unwrap();
    // The lower limit is searched first, so it sees the same toy experiments.
    let lower = model
        .lower_limit(8, 6, 0.6827, &mut StdRng::seed_from_u64(9))
        .unwrap();
    assert_eq!(ci.lower, lower);
    assert!(ci.upper > ci.lower);
}

#[test]
fn test_cache_keys_on_precision() {
    let coarse = HybridPoisson::new(2.0, 100).unwrap();
    let fine = HybridPoisson::new(2.0, 400).unwrap();
    let mut rng = StdRng::seed_from_u64(5);
    let mut cache = DeltaCache::new();

    let first = {
        let mut delta = coarse.delta_function(8, 6, 0.9, &mut rng).unwrap();
        assert_eq!(delta.precision(), 100);
        let first = cached_delta(&mut delta, &mut cache, 3.0).unwrap();
        // A repeated trial value is answered from the cache.
        assert_eq!(cached_delta(&mut delta, &mut cache, 3.0).unwrap(), first);
        first
    };
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.hits(), 1);
    assert_eq!(cache.get(3.0, 100), Some(first));

    let mut delta = fine.delta_function(8, 6, 0.9, &mut rng).unwrap();
    cached_delta(&mut delta, &mut cache, 3.0).unwrap();
    assert_eq!(cache.len(), 2);
    assert_eq!(cache.hits(), 1);
}

#[test]
fn test_limits_lie_in_acceptance_region() {
    let model = HybridPoisson::new(2.0, 300).unwrap();
    let mut rng = StdRng::seed_from_u64(13);
    let mut delta = model.delta_function(8, 6, 0.9, &mut rng).unwrap();
    let mut cache = DeltaCache::new();

    let lower = interval::lower_limit(&mut delta, &mut cache, &model.config).unwrap();
    let upper = interval::upper_limit(&mut delta, &mut cache, &model.config).unwrap();
    assert!(lower < upper);
    // Limits are evaluated trial values, so their deltas are in the cache.
    assert!(cache.get(lower, 300).unwrap() >= 0.0, "lower {}", lower);
    assert!(cache.get(upper, 300).unwrap() >= 0.0, "upper {}", upper);
}

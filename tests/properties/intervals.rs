//! Structural properties of the assembled intervals.

use proptest::prelude::*;
use unified_ci::models::{gaussian, poisson};
use unified_ci::{DeltaFunction, SimpleGaussian, SimplePoisson};

use crate::test_helpers::{nested, TABLE_CLS};

#[test]
fn test_poisson_intervals_grow_with_cl() {
    for &b in &[0.5, 1.5, 3.0, 6.0] {
        let model = SimplePoisson::new(b).unwrap();
        for n in 0..=10 {
            let cis: Vec<_> = TABLE_CLS
                .iter()
                .map(|&cl| model.confidence_interval(n, cl).unwrap())
                .collect();
            for pair in cis.windows(2) {
                assert!(nested(&pair[0], &pair[1], 1e-9), "n={} b={}: {:?}", n, b, cis);
            }
        }
    }
}

#[test]
fn test_poisson_intervals_contain_best_fit() {
    for &b in &[0.5, 1.5, 3.0, 6.0] {
        for n in 0..=10 {
            for &cl in &TABLE_CLS {
                let ci = poisson::confidence_interval(n, b, cl).unwrap();
                let best = poisson::fit_theta(n, b);
                assert!(ci.contains(best), "n={} b={} cl={}: {:?}", n, b, cl, ci);
            }
        }
    }
}

#[test]
fn test_limits_lie_in_acceptance_region() {
    for &b in &[0.0, 0.5, 3.0] {
        let model = SimplePoisson::new(b).unwrap();
        for n in 0..=8 {
            let ci = model.confidence_interval(n, 0.9).unwrap();
            let mut delta = model.delta_function(n, 0.9).unwrap();
            let (at_lower, at_upper) = (delta.delta(ci.lower).unwrap(), delta.delta(ci.upper).unwrap());
            assert!(at_lower >= 0.0, "n={} b={}: delta({}) = {}", n, b, ci.lower, at_lower);
            assert!(at_upper >= 0.0, "n={} b={}: delta({}) = {}", n, b, ci.upper, at_upper);
        }
    }

    let model = SimpleGaussian::new(1.0).unwrap();
    for &x in &[-2.3, -0.4, 0.0, 0.5, 1.7, 4.0] {
        let ci = model.confidence_interval(x, 0.9).unwrap();
        let mut delta = model.delta_function(x, 0.9).unwrap();
        assert!(delta.delta(ci.lower).unwrap() >= 0.0, "x={}: {:?}", x, ci);
        assert!(delta.delta(ci.upper).unwrap() >= 0.0, "x={}: {:?}", x, ci);
    }
}

#[test]
fn test_known_background_scenarios() {
    let ci = poisson::confidence_interval(0, 0.5, 0.9).unwrap();
    assert_eq!(ci.lower, 0.0);
    assert!(ci.upper > 2.2 && ci.upper < 2.3);

    // A large excess excludes zero.
    let ci = poisson::confidence_interval(10, 1.5, 0.9).unwrap();
    assert!(ci.lower > 3.9 && ci.lower < 4.1, "{:?}", ci);

    // Without background, zero counts still allow a few signal events.
    let ci = poisson::confidence_interval(0, 0.0, 0.9).unwrap();
    assert_eq!(ci.lower, 0.0);
    assert!(ci.upper > 2.42 && ci.upper < 2.45, "{:?}", ci);

    // Hundreds of counts stay finite.
    let ci = poisson::confidence_interval(500, 0.5, 0.9).unwrap();
    assert!(ci.contains(499.5) && ci.upper.is_finite(), "{:?}", ci);
    assert!(ci.width() > 60.0 && ci.width() < 85.0, "{:?}", ci);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn gaussian_intervals_grow_with_cl(x in -3.0f64..4.0, sigma in 0.2f64..3.0) {
        let model = SimpleGaussian::new(sigma).unwrap();
        let cis: Vec<_> = TABLE_CLS
            .iter()
            .map(|&cl| model.confidence_interval(x, cl).unwrap())
            .collect();
        for pair in cis.windows(2) {
            prop_assert!(nested(&pair[0], &pair[1], 1e-8 * sigma), "{:?}", cis);
        }
    }

    #[test]
    fn gaussian_intervals_scale_with_sigma(x in -2.0f64..3.0, sigma in 0.2f64..3.0) {
        let unit = gaussian::confidence_interval(x, 1.0, 0.9).unwrap();
        let scaled = gaussian::confidence_interval(x * sigma, sigma, 0.9).unwrap();
        prop_assert!((scaled.lower - sigma * unit.lower).abs() < 1e-6);
        prop_assert!((scaled.upper - sigma * unit.upper).abs() < 1e-6);
    }

    #[test]
    fn gaussian_interval_is_non_negative(x in -6.0f64..6.0) {
        let ci = gaussian::confidence_interval(x, 1.0, 0.6827).unwrap();
        prop_assert!(ci.lower >= 0.0);
        prop_assert!(ci.upper > ci.lower);
    }
}

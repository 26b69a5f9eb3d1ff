//! Gaussian limits against the Feldman-Cousins table for unit sigma.

use unified_ci::models::gaussian::{confidence_interval, lower_limit, upper_limit};

const CLS: [f64; 4] = [0.6827, 0.90, 0.95, 0.99];

/// (x, lower limits per CL, upper limits per CL)
const TABLE: &[(f64, [f64; 4], [f64; 4])] = &[
    (-2.3, [0.00, 0.00, 0.00, 0.00], [0.05, 0.34, 0.54, 0.99]),
    (0.5, [0.02, 0.00, 0.00, 0.00], [1.50, 2.14, 2.46, 3.08]),
    (1.3, [0.42, 0.02, 0.00, 0.00], [2.30, 2.94, 3.26, 3.88]),
    (1.7, [0.72, 0.38, 0.06, 0.00], [2.70, 3.34, 3.66, 4.28]),
    (2.4, [1.40, 0.87, 0.69, 0.07], [3.40, 4.04, 4.36, 4.98]),
];

#[test]
fn test_lower_limits() {
    for &(x, lower, _) in TABLE {
        for (&cl, &expected) in CLS.iter().zip(lower.iter()) {
            let value = lower_limit(x, 1.0, cl).unwrap();
            assert!(
                (value - expected).abs() < 0.005,
                "x={} cl={}: expected {} got {}",
                x,
                cl,
                expected,
                value
            );
        }
    }
}

#[test]
fn test_upper_limits() {
    for &(x, _, upper) in TABLE {
        for (&cl, &expected) in CLS.iter().zip(upper.iter()) {
            let value = upper_limit(x, 1.0, cl).unwrap();
            assert!(
                (value - expected).abs() < 0.005,
                "x={} cl={}: expected {} got {}",
                x,
                cl,
                expected,
                value
            );
        }
    }
}

#[test]
fn test_interval_matches_limits() {
    let ci = confidence_interval(1.7, 1.0, 0.9).unwrap();
    assert_eq!(ci.lower, lower_limit(1.7, 1.0, 0.9).unwrap());
    assert_eq!(ci.upper, upper_limit(1.7, 1.0, 0.9).unwrap());
}

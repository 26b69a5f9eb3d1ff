//! Print Feldman-Cousins style tables of unified confidence intervals.
//!
//! Reproduces the layout of the published tables: one line per measurement
//! with the interval at each confidence level.

use unified_ci::models::{gaussian, poisson};

fn main() -> unified_ci::Result<()> {
    let cls = [0.6827, 0.90, 0.95, 0.99];

    println!("Poisson signal with known background b = 3.0");
    println!("============================================\n");
    print_header(&cls);
    for n in 0..=10 {
        let mut line = format!("{:>6}", n);
        for &cl in &cls {
            let ci = poisson::confidence_interval(n, 3.0, cl)?;
            line.push_str(&format!("  {:>5.2}, {:>5.2}", ci.lower, ci.upper));
        }
        println!("{}", line);
    }

    println!("\nGaussian mean with unit sigma");
    println!("=============================\n");
    print_header(&cls);
    for i in 0..=12 {
        let x = -3.0 + 0.5 * i as f64;
        let mut line = format!("{:>6.1}", x);
        for &cl in &cls {
            let ci = gaussian::confidence_interval(x, 1.0, cl)?;
            line.push_str(&format!("  {:>5.2}, {:>5.2}", ci.lower, ci.upper));
        }
        println!("{}", line);
    }

    Ok(())
}

fn print_header(cls: &[f64]) {
    let mut header = format!("{:>6}", "x");
    for cl in cls {
        header.push_str(&format!("  {:>12}", format!("{:.2}%", 100.0 * cl)));
    }
    println!("{}", header);
}

//! Estimate the coverage of unified confidence intervals over a parameter grid.
//!
//! Parameter lists are comma separated values (`1.0,1.1,1.3`) or colon
//! separated `start:stop:count` triples (`1.0:5.0:10`). The table is written
//! to stdout; `RUST_LOG` controls the log output on stderr.
//!
//! ```text
//! cargo run --example coverage_sweep -- --seed 7 poisson 0.5:3:6 0.5,3 0.9 1000
//! cargo run --example coverage_sweep -- summary sweep.txt
//! ```

use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;
use std::str::FromStr;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;
use unified_ci::coverage::{
    gaussian_sweep, hybrid_sweep, parse_values, poisson_sweep, sensitivity_curve, CoverageTable,
};
use unified_ci::{RandomSource, UnifiedCiError};

/// Coverage sweeps for unified confidence intervals.
#[derive(Debug, Parser)]
#[command(name = "coverage_sweep")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Seed for a reproducible sweep; entropy seeded when absent
    #[arg(long, env = "UNIFIED_CI_SEED", global = true)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Poisson signal with known background
    Poisson {
        /// True signal rates
        thetas: Values,
        /// Background rates
        bs: Values,
        /// Confidence levels
        cls: Values,
        /// Simulated measurements per grid point
        ntest: usize,
    },

    /// Gaussian mean with known variance
    Gaussian {
        /// True means
        mus: Values,
        /// Standard deviations
        sigmas: Values,
        /// Confidence levels
        cls: Values,
        /// Simulated measurements per grid point
        ntest: usize,
    },

    /// Poisson signal with background measured in a companion region
    Hybrid {
        /// True signal rates
        thetas: Values,
        /// Background rates
        bs: Values,
        /// Ratios of the background region to the signal region
        gammas: Values,
        /// Confidence levels
        cls: Values,
        /// Simulated measurements per grid point
        ntest: usize,
        /// Toy experiments per critical value
        #[arg(default_value_t = 10000)]
        n_mc: usize,
    },

    /// Summarize a coverage table written by one of the sweeps
    Summary {
        /// Path of the table
        path: PathBuf,
    },

    /// Average upper limit of background-only experiments
    Sensitivity {
        /// Background rates
        bs: Values,
        /// Confidence level
        cl: f64,
    },
}

/// A parameter list given on the command line.
#[derive(Debug, Clone)]
struct Values(Vec<f64>);

impl FromStr for Values {
    type Err = UnifiedCiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_values(s).map(Values)
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let source = cli.seed.map_or(RandomSource::Entropy, RandomSource::Seeded);

    let table = match cli.command {
        Command::Poisson {
            thetas,
            bs,
            cls,
            ntest,
        } => poisson_sweep(&thetas.0, &bs.0, &cls.0, ntest, source)?,
        Command::Gaussian {
            mus,
            sigmas,
            cls,
            ntest,
        } => gaussian_sweep(&mus.0, &sigmas.0, &cls.0, ntest, source)?,
        Command::Hybrid {
            thetas,
            bs,
            gammas,
            cls,
            ntest,
            n_mc,
        } => hybrid_sweep(&thetas.0, &bs.0, &gammas.0, &cls.0, ntest, n_mc, source)?,
        Command::Summary { path } => {
            let table = CoverageTable::read_from(BufReader::new(File::open(path)?))?;
            summarize(&table);
            return Ok(());
        }
        Command::Sensitivity { bs, cl } => {
            println!("# b  cl  average_upper_limit  failed");
            for s in sensitivity_curve(&bs.0, cl)? {
                println!("{:.5e}  {:.5e}  {:.5e}  {}", s.b, s.cl, s.average_upper_limit, s.failed);
            }
            return Ok(());
        }
    };

    info!(rows = table.rows.len(), "sweep finished");
    table.write_to(io::stdout().lock())?;
    Ok(())
}

/// Print the mean coverage per confidence level with its binomial expectation.
fn summarize(table: &CoverageTable) {
    let fractions = table.fractions();
    println!("{} grid points, {} measurements each", table.rows.len(), table.ntest);
    for &cl in &table.cls {
        let selected: Vec<f64> = table
            .rows
            .iter()
            .zip(fractions.iter())
            .filter(|(row, _)| row.cl == cl)
            .map(|(_, &f)| f)
            .collect();
        if selected.is_empty() {
            continue;
        }
        let mean = selected.iter().sum::<f64>() / selected.len() as f64;
        let min = selected.iter().cloned().fold(f64::INFINITY, f64::min);
        let failed: usize = table.rows.iter().filter(|r| r.cl == cl).map(|r| r.failed).sum();
        let sd = (cl * (1.0 - cl) / table.ntest.max(1) as f64).sqrt();
        println!(
            "cl {:.5}: mean coverage {:.5}, min {:.5}, binomial sd {:.5}, failed searches {}",
            cl, mean, min, sd, failed
        );
    }
}

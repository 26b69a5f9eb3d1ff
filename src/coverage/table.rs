//! Tabular text format of coverage sweeps.
//!
//! A table starts with `#`-prefixed header lines recording the parameter grid
//! and the number of simulated measurements per point, followed by one
//! space-separated row per grid point:
//!
//! ```text
//! # theta: [0.5, 1.5]
//! # b: [1.0]
//! # cl: [0.6827, 0.9]
//! # ntest: 1000
//! # theta  b  cl  N_success  N_failed
//! 5.00000e-1  1.00000e0  6.82700e-1  712  0
//! ```
//!
//! Lines starting with `!` are comments and are skipped when reading.

use std::io::{BufRead, Write};

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use super::CoverageResult;
use crate::error::{Result, UnifiedCiError};

/// One named axis of a parameter grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridAxis {
    /// Column name
    pub name: String,

    /// Grid values
    pub values: Vec<f64>,
}

impl GridAxis {
    /// Create a new axis.
    pub fn new(name: &str, values: &[f64]) -> Self {
        Self {
            name: name.to_string(),
            values: values.to_vec(),
        }
    }
}

/// Coverage counts of one grid point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageRow {
    /// Parameter values, one per grid axis
    pub parameters: Vec<f64>,

    /// Target confidence level
    pub cl: f64,

    /// Number of covering intervals
    pub successes: usize,

    /// Number of failed interval searches
    pub failed: usize,
}

/// Result table of a coverage sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageTable {
    /// Parameter grid axes, in column order
    pub axes: Vec<GridAxis>,

    /// Confidence levels of the sweep
    pub cls: Vec<f64>,

    /// Number of simulated measurements per grid point
    pub ntest: usize,

    /// Rows in sweep order
    pub rows: Vec<CoverageRow>,
}

impl CoverageTable {
    /// Create an empty table for the given grid.
    pub fn new(axes: Vec<GridAxis>, cls: &[f64], ntest: usize) -> Self {
        Self {
            axes,
            cls: cls.to_vec(),
            ntest,
            rows: Vec::new(),
        }
    }

    /// Append the result of one grid point.
    pub fn push(&mut self, parameters: Vec<f64>, result: &CoverageResult) {
        self.rows.push(CoverageRow {
            parameters,
            cl: result.target,
            successes: result.covered,
            failed: result.failed,
        });
    }

    /// Column names of the data rows.
    pub fn column_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.axes.iter().map(|a| a.name.clone()).collect();
        names.extend(["cl", "N_success", "N_failed"].iter().map(|s| s.to_string()));
        names
    }

    /// Observed coverage fraction of every row.
    pub fn fractions(&self) -> Array1<f64> {
        self.rows
            .iter()
            .map(|row| {
                if self.ntest == 0 {
                    0.0
                } else {
                    row.successes as f64 / self.ntest as f64
                }
            })
            .collect()
    }

    /// Write the table in its text format.
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        for axis in &self.axes {
            writeln!(writer, "# {}: {:?}", axis.name, axis.values)?;
        }
        writeln!(writer, "# cl: {:?}", self.cls)?;
        writeln!(writer, "# ntest: {}", self.ntest)?;
        writeln!(writer, "# {}", self.column_names().join("  "))?;

        for row in &self.rows {
            let mut fields: Vec<String> = row.parameters.iter().map(|v| format!("{:.5e}", v)).collect();
            fields.push(format!("{:.5e}", row.cl));
            fields.push(row.successes.to_string());
            fields.push(row.failed.to_string());
            writeln!(writer, "{}", fields.join("  "))?;
        }
        Ok(())
    }

    /// Read a table written by [`CoverageTable::write_to`].
    ///
    /// Tables without the `N_failed` column are accepted; their rows have no
    /// failed searches.
    pub fn read_from<R: BufRead>(reader: R) -> Result<Self> {
        let mut axes = Vec::new();
        let mut cls = Vec::new();
        let mut ntest = None;
        let mut columns: Option<Vec<String>> = None;
        let mut rows = Vec::new();

        for line in reader.lines() {
            let line = line?;
            if line.starts_with('!') || line.trim().is_empty() {
                continue;
            }

            if let Some(header) = line.strip_prefix('#') {
                if columns.is_some() {
                    return Err(parse_error("header line after column names", &line));
                }
                match header.split_once(':') {
                    Some((name, value)) => {
                        let name = name.trim();
                        match name {
                            "ntest" => {
                                ntest = Some(
                                    value
                                        .trim()
                                        .parse::<usize>()
                                        .map_err(|_| parse_error("invalid ntest", &line))?,
                                );
                            }
                            "cl" => cls = parse_list(value, &line)?,
                            _ => axes.push(GridAxis {
                                name: name.to_string(),
                                values: parse_list(value, &line)?,
                            }),
                        }
                    }
                    None => columns = Some(header.split_whitespace().map(str::to_string).collect()),
                }
                continue;
            }

            let columns = columns
                .as_ref()
                .ok_or_else(|| parse_error("data before column names", &line))?;
            let has_failed = columns.last().map(String::as_str) == Some("N_failed");
            let n_params = if has_failed {
                columns.len().saturating_sub(3)
            } else {
                columns.len().saturating_sub(2)
            };

            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() != columns.len() || n_params != axes.len() {
                return Err(parse_error("row does not match the columns", &line));
            }

            let parameters = fields[..n_params]
                .iter()
                .map(|f| f.parse::<f64>().map_err(|_| parse_error("invalid value", &line)))
                .collect::<Result<Vec<f64>>>()?;
            let cl = fields[n_params]
                .parse::<f64>()
                .map_err(|_| parse_error("invalid cl", &line))?;
            let successes = parse_count(fields[n_params + 1], &line)?;
            let failed = if has_failed {
                parse_count(fields[n_params + 2], &line)?
            } else {
                0
            };

            rows.push(CoverageRow {
                parameters,
                cl,
                successes,
                failed,
            });
        }

        let ntest = ntest.ok_or_else(|| parse_error("missing ntest header", ""))?;
        Ok(Self {
            axes,
            cls,
            ntest,
            rows,
        })
    }

    /// Serialize the table to JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn parse_error(reason: &str, line: &str) -> UnifiedCiError {
    UnifiedCiError::InvalidParameter(format!("coverage table: {}: '{}'", reason, line))
}

fn parse_count(field: &str, line: &str) -> Result<usize> {
    field
        .parse::<usize>()
        .map_err(|_| parse_error("invalid count", line))
}

fn parse_list(value: &str, line: &str) -> Result<Vec<f64>> {
    let inner = value
        .trim()
        .strip_prefix('[')
        .and_then(|v| v.strip_suffix(']'))
        .ok_or_else(|| parse_error("expected a bracketed list", line))?;
    if inner.trim().is_empty() {
        return Ok(Vec::new());
    }
    inner
        .split(',')
        .map(|v| v.trim().parse::<f64>().map_err(|_| parse_error("invalid list value", line)))
        .collect()
}

/// Parse a parameter grid argument.
///
/// Accepts either a comma separated list of values (`1.0,1.1,1.3`) or a colon
/// separated `start:stop:count` triple of evenly spaced values including both
/// ends (`1.0:5.0:10`).
pub fn parse_values(arg: &str) -> Result<Vec<f64>> {
    let invalid = || UnifiedCiError::InvalidParameter(format!("cannot parse parameter values '{}'", arg));

    if arg.contains(':') {
        let parts: Vec<&str> = arg.split(':').collect();
        if parts.len() != 3 {
            return Err(invalid());
        }
        let start = parts[0].trim().parse::<f64>().map_err(|_| invalid())?;
        let stop = parts[1].trim().parse::<f64>().map_err(|_| invalid())?;
        let count = parts[2].trim().parse::<usize>().map_err(|_| invalid())?;
        return Ok(Array1::linspace(start, stop, count).to_vec());
    }

    arg.split(',')
        .map(|v| v.trim().parse::<f64>().map_err(|_| invalid()))
        .collect()
}

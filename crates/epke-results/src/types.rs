//! Result data types.

use epke_core::{Real, STATE_DIGITS, TIME_DIGITS, round_significant};
use serde::{Deserialize, Serialize};

use crate::{ResultsError, ResultsResult};

pub type RunId = String;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunManifest {
    pub run_id: RunId,
    pub project_name: String,
    pub timestamp: String,
    pub solver_version: String,
    pub points: usize,
    pub precursor_groups: usize,
    #[serde(default)]
    pub stats: RunStats,
    /// Fine solvers spawned below the coarse solve.
    #[serde(default)]
    pub fine_solvers: usize,
    /// Fine solvers that failed under the isolate-child policy.
    #[serde(default)]
    pub failed_fine_solvers: usize,
    /// Whether fine corrections were folded into the stored series.
    #[serde(default)]
    pub corrected: bool,
}

/// Step counters of the coarse solve.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunStats {
    pub quadratic_steps: usize,
    pub linear_steps: usize,
    pub rejected_transformations: usize,
    pub alpha_fallbacks: usize,
}

/// One output row: time to 6 significant digits, state to 12.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimeseriesRecord {
    pub time_s: Real,
    /// Normalized power `f(n)·P(n)`.
    pub power: Real,
    pub rho: Real,
    /// Scaled precursor concentration per group.
    pub concentrations: Vec<Real>,
}

/// Zip column series into rounded rows. `concentrations` holds one column per
/// group; every column must match the length of `time`.
pub fn build_records(
    time: &[Real],
    power: &[Real],
    rho: &[Real],
    concentrations: &[&[Real]],
) -> ResultsResult<Vec<TimeseriesRecord>> {
    let n = time.len();
    if power.len() != n || rho.len() != n {
        return Err(ResultsError::InconsistentSeries {
            what: format!(
                "time has {n} points, power {} and rho {}",
                power.len(),
                rho.len()
            ),
        });
    }
    if let Some(k) = concentrations.iter().position(|c| c.len() != n) {
        return Err(ResultsError::InconsistentSeries {
            what: format!(
                "concentration group {k} has {} points, time has {n}",
                concentrations[k].len()
            ),
        });
    }

    Ok((0..n)
        .map(|i| TimeseriesRecord {
            time_s: round_significant(time[i], TIME_DIGITS),
            power: round_significant(power[i], STATE_DIGITS),
            rho: round_significant(rho[i], STATE_DIGITS),
            concentrations: concentrations
                .iter()
                .map(|c| round_significant(c[i], STATE_DIGITS))
                .collect(),
        })
        .collect())
}

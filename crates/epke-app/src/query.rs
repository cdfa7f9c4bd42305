//! Query helpers for extracting data from loaded runs.

use epke_results::TimeseriesRecord;

use crate::error::{AppError, AppResult};

/// Summary of a run's time range and data.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub time_range: (f64, f64),
    pub record_count: usize,
    pub precursor_groups: usize,
    pub peak_power: f64,
    pub peak_time_s: f64,
    pub final_power: f64,
    pub final_rho: f64,
}

/// A column of the stored time series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Series {
    Power,
    Rho,
    Concentration(usize),
}

impl std::str::FromStr for Series {
    type Err = AppError;

    /// `power`, `rho`, or `concentration:<group>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "power" => Ok(Series::Power),
            "rho" => Ok(Series::Rho),
            _ => s
                .strip_prefix("concentration:")
                .and_then(|k| k.parse().ok())
                .map(Series::Concentration)
                .ok_or_else(|| AppError::InvalidInput(format!("unknown series '{s}'"))),
        }
    }
}

pub fn get_run_summary(records: &[TimeseriesRecord]) -> AppResult<RunSummary> {
    let (Some(first), Some(last)) = (records.first(), records.last()) else {
        return Err(AppError::InvalidInput("No records in run".to_string()));
    };

    let peak = records
        .iter()
        .fold(first, |best, r| if r.power > best.power { r } else { best });

    Ok(RunSummary {
        time_range: (first.time_s, last.time_s),
        record_count: records.len(),
        precursor_groups: first.concentrations.len(),
        peak_power: peak.power,
        peak_time_s: peak.time_s,
        final_power: last.power,
        final_rho: last.rho,
    })
}

/// `(time, value)` pairs of one column.
pub fn extract_series(records: &[TimeseriesRecord], series: Series) -> AppResult<Vec<(f64, f64)>> {
    records
        .iter()
        .map(|r| {
            let value = match series {
                Series::Power => r.power,
                Series::Rho => r.rho,
                Series::Concentration(k) => *r.concentrations.get(k).ok_or_else(|| {
                    AppError::InvalidInput(format!(
                        "precursor group {k} not in run ({} groups)",
                        r.concentrations.len()
                    ))
                })?,
            };
            Ok((r.time_s, value))
        })
        .collect()
}

//! Immutable per-step kinetics constants on a time grid.

use std::ops::Range;

use epke_core::Real;

use crate::error::{SolverError, SolverResult};

/// Feedback-reactivity constants.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Feedback {
    /// Reactivity per unit of normalized power deposited.
    pub gamma_d: Real,
    /// Reference power fraction removed from the feedback source.
    pub eta: Real,
    /// Decay constant of the feedback channel (1/s).
    pub lambda_h: Real,
}

/// Decay constant and delayed fraction of one precursor group, per time point.
#[derive(Clone, Debug, PartialEq)]
pub struct PrecursorGroup {
    pub decay_constant: Vec<Real>,
    pub delayed_fraction: Vec<Real>,
}

/// Raw tables from which [`Parameters`] are built.
#[derive(Clone, Debug, PartialEq)]
pub struct ParameterTables {
    pub time: Vec<Real>,
    pub groups: Vec<PrecursorGroup>,
    pub gen_time: Vec<Real>,
    pub pow_norm: Vec<Real>,
    pub rho_imp: Vec<Real>,
    /// `None` sums the group delayed fractions at each point.
    pub beta_eff: Option<Vec<Real>>,
    pub theta: Real,
    pub feedback: Feedback,
}

impl ParameterTables {
    /// Time-constant tables: `groups` holds `(decay constant, delayed fraction)`
    /// pairs. Unit power normalization, zero imposed reactivity, fully implicit,
    /// no feedback.
    pub fn constant(time: Vec<Real>, groups: &[(Real, Real)], gen_time: Real) -> Self {
        let n = time.len();
        Self {
            groups: groups
                .iter()
                .map(|&(lambda, beta)| PrecursorGroup {
                    decay_constant: vec![lambda; n],
                    delayed_fraction: vec![beta; n],
                })
                .collect(),
            gen_time: vec![gen_time; n],
            pow_norm: vec![1.0; n],
            rho_imp: vec![0.0; n],
            beta_eff: None,
            theta: 1.0,
            feedback: Feedback::default(),
            time,
        }
    }
}

/// Validated kinetics constants. Never mutated after construction; re-gridding
/// and slicing produce new instances.
#[derive(Clone, Debug, PartialEq)]
pub struct Parameters {
    time: Vec<Real>,
    decay_constant: Vec<Vec<Real>>,
    delayed_fraction: Vec<Vec<Real>>,
    gen_time: Vec<Real>,
    pow_norm: Vec<Real>,
    rho_imp: Vec<Real>,
    beta_eff: Vec<Real>,
    theta: Real,
    feedback: Feedback,
}

impl Parameters {
    pub fn new(tables: ParameterTables) -> SolverResult<Self> {
        let n = tables.time.len();
        if n < 2 {
            return Err(invalid(format!("need at least 2 time points, got {n}")));
        }
        validate_time_grid(&tables.time)?;

        if tables.groups.is_empty() {
            return Err(invalid("need at least one precursor group".to_string()));
        }
        if !(0.0..=1.0).contains(&tables.theta) {
            return Err(invalid(format!("theta = {} outside [0, 1]", tables.theta)));
        }
        let fb = tables.feedback;
        if !(fb.gamma_d.is_finite() && fb.eta.is_finite()) {
            return Err(invalid("feedback constants must be finite".to_string()));
        }
        if !(fb.lambda_h.is_finite() && fb.lambda_h >= 0.0) {
            return Err(invalid(format!("lambda_h = {} must be >= 0", fb.lambda_h)));
        }

        check_series("gen_time", &tables.gen_time, n, |v| v > 0.0)?;
        check_series("pow_norm", &tables.pow_norm, n, |_| true)?;
        check_series("rho_imp", &tables.rho_imp, n, |_| true)?;

        let mut decay_constant = Vec::with_capacity(tables.groups.len());
        let mut delayed_fraction = Vec::with_capacity(tables.groups.len());
        for group in tables.groups {
            check_series("decay_constant", &group.decay_constant, n, |v| v > 0.0)?;
            check_series("delayed_fraction", &group.delayed_fraction, n, |v| v >= 0.0)?;
            decay_constant.push(group.decay_constant);
            delayed_fraction.push(group.delayed_fraction);
        }

        let beta_eff = match tables.beta_eff {
            Some(beta_eff) => beta_eff,
            None => (0..n)
                .map(|i| delayed_fraction.iter().map(|beta| beta[i]).sum())
                .collect(),
        };
        check_series("beta_eff", &beta_eff, n, |v| v >= 0.0)?;

        Ok(Self {
            time: tables.time,
            decay_constant,
            delayed_fraction,
            gen_time: tables.gen_time,
            pow_norm: tables.pow_norm,
            rho_imp: tables.rho_imp,
            beta_eff,
            theta: tables.theta,
            feedback: fb,
        })
    }

    pub fn num_time_steps(&self) -> usize {
        self.time.len()
    }

    pub fn num_precursors(&self) -> usize {
        self.decay_constant.len()
    }

    pub fn times(&self) -> &[Real] {
        &self.time
    }

    pub fn time(&self, n: usize) -> Real {
        self.time[n]
    }

    /// `t(n) - t(n-1)`, checked to be positive.
    pub fn dt(&self, n: usize) -> SolverResult<Real> {
        if n == 0 || n >= self.time.len() {
            return Err(SolverError::IncompleteHistory {
                requested: n,
                filled: self.time.len(),
            });
        }
        let dt = self.time[n] - self.time[n - 1];
        if !(dt > 0.0) {
            return Err(SolverError::NonMonotonicTimeGrid { index: n, dt });
        }
        Ok(dt)
    }

    pub fn decay_constant(&self, k: usize, n: usize) -> Real {
        self.decay_constant[k][n]
    }

    pub fn delayed_fraction(&self, k: usize, n: usize) -> Real {
        self.delayed_fraction[k][n]
    }

    pub fn gen_time(&self, n: usize) -> Real {
        self.gen_time[n]
    }

    pub fn pow_norm(&self, n: usize) -> Real {
        self.pow_norm[n]
    }

    pub fn pow_norms(&self) -> &[Real] {
        &self.pow_norm
    }

    pub fn rho_imp(&self, n: usize) -> Real {
        self.rho_imp[n]
    }

    pub fn beta_eff(&self, n: usize) -> Real {
        self.beta_eff[n]
    }

    pub fn theta(&self) -> Real {
        self.theta
    }

    pub fn feedback(&self) -> Feedback {
        self.feedback
    }

    /// Resample every per-step quantity onto `new_time` by piecewise-linear
    /// interpolation. Points that coincide with the current grid reproduce the
    /// stored values exactly.
    pub fn interpolate(&self, new_time: &[Real]) -> SolverResult<Parameters> {
        if new_time.len() < 2 {
            return Err(invalid(format!(
                "need at least 2 time points, got {}",
                new_time.len()
            )));
        }
        validate_time_grid(new_time)?;

        let start = self.time[0];
        let end = self.time[self.time.len() - 1];
        let slack = 1e-12 * (end - start);
        let stencil = new_time
            .iter()
            .map(|&t| {
                if t < start - slack || t > end + slack {
                    return Err(SolverError::OutOfRange { time: t, start, end });
                }
                Ok(self.locate(t))
            })
            .collect::<SolverResult<Vec<_>>>()?;

        let resample = |values: &[Real]| -> Vec<Real> {
            stencil
                .iter()
                .map(|&(i, w)| {
                    if w == 0.0 {
                        values[i]
                    } else if w == 1.0 {
                        values[i + 1]
                    } else {
                        values[i] + w * (values[i + 1] - values[i])
                    }
                })
                .collect()
        };

        Ok(Parameters {
            time: new_time.to_vec(),
            decay_constant: self.decay_constant.iter().map(|v| resample(v)).collect(),
            delayed_fraction: self.delayed_fraction.iter().map(|v| resample(v)).collect(),
            gen_time: resample(&self.gen_time),
            pow_norm: resample(&self.pow_norm),
            rho_imp: resample(&self.rho_imp),
            beta_eff: resample(&self.beta_eff),
            theta: self.theta,
            feedback: self.feedback,
        })
    }

    /// Narrow to the time points in `range`.
    pub fn slice(&self, range: Range<usize>) -> SolverResult<Parameters> {
        if range.end > self.time.len() || range.len() < 2 {
            return Err(invalid(format!(
                "slice {:?} of a {}-point grid must hold at least 2 points",
                range,
                self.time.len()
            )));
        }
        let cut = |values: &[Real]| values[range.clone()].to_vec();
        Ok(Parameters {
            time: cut(&self.time),
            decay_constant: self.decay_constant.iter().map(|v| cut(v)).collect(),
            delayed_fraction: self.delayed_fraction.iter().map(|v| cut(v)).collect(),
            gen_time: cut(&self.gen_time),
            pow_norm: cut(&self.pow_norm),
            rho_imp: cut(&self.rho_imp),
            beta_eff: cut(&self.beta_eff),
            theta: self.theta,
            feedback: self.feedback,
        })
    }

    /// Segment index and weight of `t`: the value is `(1-w)·y[i] + w·y[i+1]`.
    fn locate(&self, t: Real) -> (usize, Real) {
        let last = self.time.len() - 1;
        let upper = self.time.partition_point(|&x| x <= t);
        let i = upper.saturating_sub(1).min(last - 1);
        if t == self.time[i] {
            return (i, 0.0);
        }
        if t == self.time[i + 1] {
            return (i, 1.0);
        }
        let w = (t - self.time[i]) / (self.time[i + 1] - self.time[i]);
        (i, w.clamp(0.0, 1.0))
    }
}

fn invalid(what: String) -> SolverError {
    SolverError::InvalidParameters { what }
}

/// Every step must be finite and strictly positive.
pub fn validate_time_grid(time: &[Real]) -> SolverResult<()> {
    if let Some(t) = time.iter().find(|t| !t.is_finite()) {
        return Err(invalid(format!("non-finite time point {t}")));
    }
    for (i, pair) in time.windows(2).enumerate() {
        let dt = pair[1] - pair[0];
        if !(dt > 0.0) {
            return Err(SolverError::NonMonotonicTimeGrid { index: i + 1, dt });
        }
    }
    Ok(())
}

fn check_series(
    what: &str,
    values: &[Real],
    n: usize,
    accept: impl Fn(Real) -> bool,
) -> SolverResult<()> {
    if values.len() != n {
        return Err(invalid(format!(
            "{what} has {} entries, expected {n}",
            values.len()
        )));
    }
    if let Some(i) = values.iter().position(|&v| !v.is_finite() || !accept(v)) {
        return Err(invalid(format!("{what}[{i}] = {} out of range", values[i])));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform(n: usize, dt: Real) -> Vec<Real> {
        (0..n).map(|i| i as Real * dt).collect()
    }

    fn ramp_params() -> Parameters {
        let mut tables = ParameterTables::constant(uniform(5, 0.1), &[(0.1, 0.0065)], 2e-5);
        tables.rho_imp = vec![0.0, 0.001, 0.002, 0.003, 0.004];
        Parameters::new(tables).unwrap()
    }

    #[test]
    fn beta_eff_defaults_to_group_sum() {
        let tables = ParameterTables::constant(
            uniform(3, 0.1),
            &[(0.0124, 0.000215), (3.01, 0.000273)],
            2e-5,
        );
        let params = Parameters::new(tables).unwrap();
        assert_eq!(params.num_precursors(), 2);
        assert!((params.beta_eff(1) - 0.000488).abs() < 1e-15);
    }

    #[test]
    fn rejects_short_grid_and_bad_theta() {
        let tables = ParameterTables::constant(vec![0.0], &[(0.1, 0.0065)], 2e-5);
        assert!(matches!(
            Parameters::new(tables),
            Err(SolverError::InvalidParameters { .. })
        ));

        let mut tables = ParameterTables::constant(uniform(3, 0.1), &[(0.1, 0.0065)], 2e-5);
        tables.theta = 1.2;
        assert!(Parameters::new(tables).is_err());
    }

    #[test]
    fn rejects_non_monotonic_grid_with_index() {
        let tables =
            ParameterTables::constant(vec![0.0, 0.1, 0.1, 0.3], &[(0.1, 0.0065)], 2e-5);
        match Parameters::new(tables) {
            Err(SolverError::NonMonotonicTimeGrid { index, dt }) => {
                assert_eq!(index, 2);
                assert_eq!(dt, 0.0);
            }
            other => panic!("expected NonMonotonicTimeGrid, got {other:?}"),
        }
    }

    #[test]
    fn rejects_length_mismatch() {
        let mut tables = ParameterTables::constant(uniform(4, 0.1), &[(0.1, 0.0065)], 2e-5);
        tables.gen_time.pop();
        assert!(Parameters::new(tables).is_err());
    }

    #[test]
    fn interpolate_midpoints_and_exact_nodes() {
        let params = ramp_params();
        let fine = params
            .interpolate(&[0.0, 0.05, 0.1, 0.25, 0.4])
            .unwrap();
        assert_eq!(fine.num_time_steps(), 5);
        assert_eq!(fine.rho_imp(0), 0.0);
        assert!((fine.rho_imp(1) - 0.0005).abs() < 1e-15);
        assert_eq!(fine.rho_imp(2), 0.001);
        assert!((fine.rho_imp(3) - 0.0025).abs() < 1e-15);
        assert_eq!(fine.rho_imp(4), 0.004);
        assert_eq!(fine.decay_constant(0, 3), 0.1);
        assert_eq!(fine.theta(), params.theta());
    }

    #[test]
    fn interpolate_rejects_points_outside_grid() {
        let params = ramp_params();
        assert!(matches!(
            params.interpolate(&[0.0, 0.5]),
            Err(SolverError::OutOfRange { .. })
        ));
        assert!(matches!(
            params.interpolate(&[0.0, 0.2, 0.1]),
            Err(SolverError::NonMonotonicTimeGrid { index: 2, .. })
        ));
    }

    #[test]
    fn slice_narrows_every_series() {
        let params = ramp_params();
        let sub = params.slice(1..4).unwrap();
        assert_eq!(sub.num_time_steps(), 3);
        assert_eq!(sub.times(), &params.times()[1..4]);
        assert_eq!(sub.rho_imp(0), 0.001);
        assert_eq!(sub.beta_eff(2), params.beta_eff(3));
        assert!(params.slice(2..3).is_err());
        assert!(params.slice(3..9).is_err());
    }

    #[test]
    fn dt_reports_index() {
        let params = ramp_params();
        assert!((params.dt(1).unwrap() - 0.1).abs() < 1e-15);
        assert!(params.dt(0).is_err());
        assert!(params.dt(5).is_err());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn interpolate_onto_own_grid_is_identity(
            steps in prop::collection::vec(1e-3_f64..1.0, 1..20),
            rho in -0.01_f64..0.01,
        ) {
            let mut time = vec![0.0];
            for dt in &steps {
                let last = time[time.len() - 1];
                time.push(last + dt);
            }
            let n = time.len();
            let mut tables = ParameterTables::constant(time.clone(), &[(0.08, 0.0065)], 1e-4);
            tables.rho_imp = (0..n).map(|i| rho * i as f64).collect();
            let params = Parameters::new(tables).unwrap();
            let again = params.interpolate(&time).unwrap();
            prop_assert_eq!(params, again);
        }
    }
}

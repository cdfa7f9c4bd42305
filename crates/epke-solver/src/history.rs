//! Power, reactivity and precursor histories.
//!
//! A `History` is both the precomputed prefix handed to a solver and the
//! solver's output. Concentrations are stored scaled by the initial generation
//! time, `ζ_k = Λ(0)·C_k`.

use epke_core::Real;

use crate::error::{SolverError, SolverResult};
use crate::params::Parameters;

#[derive(Clone, Debug, PartialEq)]
pub struct History {
    power: Vec<Real>,
    rho: Vec<Real>,
    concentration: Vec<Vec<Real>>,
}

impl History {
    /// Build from per-index arrays. All arrays must share one length and at
    /// least one precursor group must be present.
    pub fn new(
        power: Vec<Real>,
        rho: Vec<Real>,
        concentration: Vec<Vec<Real>>,
    ) -> SolverResult<Self> {
        let m = power.len();
        if concentration.is_empty() {
            return Err(prefix_err("history needs at least one precursor group".to_string()));
        }
        if rho.len() != m {
            return Err(prefix_err(format!(
                "rho has {} entries, power has {m}",
                rho.len()
            )));
        }
        if let Some(k) = concentration.iter().position(|c| c.len() != m) {
            return Err(prefix_err(format!(
                "concentration[{k}] has {} entries, power has {m}",
                concentration[k].len()
            )));
        }
        let all_finite = power
            .iter()
            .chain(&rho)
            .chain(concentration.iter().flatten())
            .all(|v| v.is_finite());
        if !all_finite {
            return Err(prefix_err("history contains non-finite values".to_string()));
        }
        Ok(Self {
            power,
            rho,
            concentration,
        })
    }

    /// One-point history at steady state: `ρ(0) = ρ_imp(0)` and each group at
    /// its equilibrium level for power `p0`.
    pub fn equilibrium(params: &Parameters, p0: Real) -> SolverResult<Self> {
        if !(p0.is_finite() && p0 > 0.0) {
            return Err(prefix_err(format!("equilibrium power {p0} must be positive")));
        }
        // Λ(0)·β·P0 / (Λ(0)·λ)
        let concentration = (0..params.num_precursors())
            .map(|k| vec![params.delayed_fraction(k, 0) * p0 / params.decay_constant(k, 0)])
            .collect();
        Self::new(vec![p0], vec![params.rho_imp(0)], concentration)
    }

    pub(crate) fn with_capacity(&self, n: usize) -> Self {
        let grow = |v: &[Real]| {
            let mut out = Vec::with_capacity(n);
            out.extend_from_slice(v);
            out
        };
        Self {
            power: grow(&self.power),
            rho: grow(&self.rho),
            concentration: self.concentration.iter().map(|c| grow(c)).collect(),
        }
    }

    /// Number of filled time indices.
    pub fn num_time_steps(&self) -> usize {
        self.power.len()
    }

    pub fn num_precursors(&self) -> usize {
        self.concentration.len()
    }

    pub fn power(&self, n: usize) -> Real {
        self.power[n]
    }

    pub fn rho(&self, n: usize) -> Real {
        self.rho[n]
    }

    pub fn concentration(&self, k: usize, n: usize) -> Real {
        self.concentration[k][n]
    }

    pub fn powers(&self) -> &[Real] {
        &self.power
    }

    pub fn rhos(&self) -> &[Real] {
        &self.rho
    }

    pub fn concentrations(&self, k: usize) -> &[Real] {
        &self.concentration[k]
    }

    /// The first `len` indices, for seeding a solver on a finer grid.
    pub fn truncated(&self, len: usize) -> SolverResult<History> {
        if len == 0 || len > self.power.len() {
            return Err(SolverError::IncompleteHistory {
                requested: len,
                filled: self.power.len(),
            });
        }
        Ok(Self {
            power: self.power[..len].to_vec(),
            rho: self.rho[..len].to_vec(),
            concentration: self
                .concentration
                .iter()
                .map(|c| c[..len].to_vec())
                .collect(),
        })
    }

    /// `f(n)·P(n)` over the filled indices.
    pub fn normalized_power(&self, params: &Parameters) -> Vec<Real> {
        self.power
            .iter()
            .zip(params.pow_norms())
            .map(|(p, f)| f * p)
            .collect()
    }

    pub(crate) fn push(&mut self, power: Real, rho: Real, concentration: &[Real]) {
        self.power.push(power);
        self.rho.push(rho);
        for (column, &c) in self.concentration.iter_mut().zip(concentration) {
            column.push(c);
        }
    }
}

fn prefix_err(what: String) -> SolverError {
    SolverError::InvalidPrefix { what }
}

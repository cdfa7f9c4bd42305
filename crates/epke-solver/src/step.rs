//! Exponential point-kinetics time stepping.
//!
//! Each step integrates the precursor and feedback equations analytically
//! against a quadratic interpolant of the power history, which leaves a scalar
//! quadratic `a·P² + b·P + c = 0` in the unknown power `P = P(n)`. Before the
//! solve an exponential growth rate `α` estimated from the last two accepted
//! powers is factored out of the unknown.

use std::sync::Arc;

use epke_core::{DecayKernel, Real};
use tracing::{debug, info, warn};

use crate::error::{SolverError, SolverResult};
use crate::history::History;
use crate::params::Parameters;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SolverOptions {
    /// Re-solve a step with `α = 0` when the exponential prediction is worse
    /// than plain linear extrapolation.
    pub transformation_acceptance_test: bool,
}

/// Counters accumulated over one solver's lifetime.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StepStats {
    /// Accepted steps taken through the quadratic root.
    pub quadratic_steps: usize,
    /// Accepted steps taken through the linear branch (`a == 0`).
    pub linear_steps: usize,
    /// Steps re-solved without the stiffness transform.
    pub rejected_transformations: usize,
    /// Steps where `α` could not be estimated and fell back to zero.
    pub alpha_fallbacks: usize,
}

impl StepStats {
    pub fn accepted_steps(&self) -> usize {
        self.quadratic_steps + self.linear_steps
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Branch {
    Quadratic,
    Linear,
}

/// Integrals of the quadratic Lagrange basis through `t(n-2), t(n-1), t(n)`
/// against a decay kernel, indexed by the node they multiply.
#[derive(Clone, Copy, Debug)]
struct LagrangeWeights {
    current: Real,
    previous: Real,
    before: Real,
}

impl LagrangeWeights {
    fn new(kernel: &DecayKernel, dt: Real, gamma: Real) -> Self {
        let dt2 = dt * dt;
        Self {
            current: (kernel.k2 + gamma * dt * kernel.k1) / ((1.0 + gamma) * dt2),
            previous: kernel.k0 - (kernel.k2 + (gamma - 1.0) * dt * kernel.k1) / (gamma * dt2),
            before: (kernel.k2 - dt * kernel.k1) / ((1.0 + gamma) * gamma * dt2),
        }
    }
}

/// History-only quantities of one step, independent of the unknown power.
#[derive(Clone, Copy, Debug)]
struct StepTerms {
    n: usize,
    dt: Real,
    gamma: Real,
    /// Index standing in for `n-2`; `n-1` on the first step.
    before: usize,
    tau: Real,
    source_hat: Real,
    source_prev: Real,
    a1: Real,
    b1: Real,
}

/// Advances a [`History`] over the time grid of shared [`Parameters`].
///
/// The precomputed prefix `0..M` is never modified; indices `M..N` are filled
/// once each, in order.
#[derive(Debug)]
pub struct StepSolver {
    params: Arc<Parameters>,
    options: SolverOptions,
    history: History,
    precomputed_len: usize,
    omega: Vec<Real>,
    zeta_hat: Vec<Real>,
    stats: StepStats,
}

impl StepSolver {
    pub fn new(
        params: impl Into<Arc<Parameters>>,
        prefix: History,
        options: SolverOptions,
    ) -> SolverResult<Self> {
        let params = params.into();
        let n = params.num_time_steps();
        let m = prefix.num_time_steps();
        if m == 0 {
            return Err(SolverError::InvalidPrefix {
                what: "precomputed history is empty".to_string(),
            });
        }
        if m > n {
            return Err(SolverError::InvalidPrefix {
                what: format!("precomputed history has {m} points, time grid has {n}"),
            });
        }
        if prefix.num_precursors() != params.num_precursors() {
            return Err(SolverError::InvalidPrefix {
                what: format!(
                    "precomputed history has {} precursor groups, parameters have {}",
                    prefix.num_precursors(),
                    params.num_precursors()
                ),
            });
        }

        let groups = params.num_precursors();
        Ok(Self {
            history: prefix.with_capacity(n),
            precomputed_len: m,
            omega: vec![0.0; groups],
            zeta_hat: vec![0.0; groups],
            stats: StepStats::default(),
            options,
            params,
        })
    }

    /// Start from steady state at power `p0`.
    pub fn from_equilibrium(
        params: impl Into<Arc<Parameters>>,
        p0: Real,
        options: SolverOptions,
    ) -> SolverResult<Self> {
        let params = params.into();
        let prefix = History::equilibrium(&params, p0)?;
        Self::new(params, prefix, options)
    }

    pub fn params(&self) -> &Arc<Parameters> {
        &self.params
    }

    pub fn options(&self) -> SolverOptions {
        self.options
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn into_history(self) -> History {
        self.history
    }

    pub fn stats(&self) -> StepStats {
        self.stats
    }

    pub fn precomputed_len(&self) -> usize {
        self.precomputed_len
    }

    pub fn is_complete(&self) -> bool {
        self.history.num_time_steps() == self.params.num_time_steps()
    }

    /// Fill every remaining index. Calling again on a finished solver returns
    /// the same history without recomputing anything.
    pub fn advance(&mut self) -> SolverResult<&History> {
        if self.is_complete() {
            debug!(
                steps = self.params.num_time_steps(),
                "solver already complete, nothing to advance"
            );
            return Ok(&self.history);
        }

        info!(
            from = self.history.num_time_steps(),
            to = self.params.num_time_steps(),
            groups = self.params.num_precursors(),
            "starting point-kinetics solve"
        );
        while self.step()?.is_some() {}
        info!(
            quadratic = self.stats.quadratic_steps,
            linear = self.stats.linear_steps,
            rejected = self.stats.rejected_transformations,
            final_power = self.history.power(self.history.num_time_steps() - 1),
            "point-kinetics solve finished"
        );
        Ok(&self.history)
    }

    /// Compute the next unfilled index. Returns the index filled, or `None`
    /// once the grid is exhausted.
    pub fn step(&mut self) -> SolverResult<Option<usize>> {
        let n = self.history.num_time_steps();
        if n >= self.params.num_time_steps() {
            return Ok(None);
        }

        let terms = self.prepare(n)?;
        let alpha = self.estimate_alpha(&terms);
        let (mut power, mut branch) = self.solve_power(&terms, alpha)?;

        if self.options.transformation_acceptance_test && n > 1 && alpha != 0.0 {
            let h = &self.history;
            let exponential = (power - (alpha * terms.dt).exp() * h.power(n - 1)).abs();
            let linear = (power
                - h.power(n - 1)
                - (h.power(n - 1) - h.power(terms.before)) / terms.gamma)
                .abs();
            if exponential > linear {
                warn!(
                    index = n,
                    alpha, exponential, linear, "stiffness transform rejected, re-solving with alpha = 0"
                );
                self.stats.rejected_transformations += 1;
                (power, branch) = self.solve_power(&terms, 0.0)?;
            }
        }

        let rho = terms.a1 * power + terms.b1;
        if !rho.is_finite() {
            return Err(SolverError::NonFinite { index: n, what: "reactivity" });
        }
        let concentration: Vec<Real> = self
            .omega
            .iter()
            .zip(&self.zeta_hat)
            .map(|(omega, zeta_hat)| power * omega + zeta_hat)
            .collect();
        if concentration.iter().any(|c| !c.is_finite()) {
            return Err(SolverError::NonFinite {
                index: n,
                what: "precursor concentration",
            });
        }

        match branch {
            Branch::Quadratic => self.stats.quadratic_steps += 1,
            Branch::Linear => self.stats.linear_steps += 1,
        }
        debug!(index = n, time = self.params.time(n), power, rho, ?branch, "step accepted");
        self.history.push(power, rho, &concentration);
        Ok(Some(n))
    }

    /// Kernel weights, precursor scratch and feedback coefficients for step `n`.
    fn prepare(&mut self, n: usize) -> SolverResult<StepTerms> {
        let p = &*self.params;
        let h = &self.history;

        let dt = p.dt(n)?;
        let gamma = if n < 2 { 1.0 } else { p.dt(n - 1)? / dt };
        let before = if n < 2 { n - 1 } else { n - 2 };
        let gen0 = p.gen_time(0);

        let mut tau = 0.0;
        let mut source_hat = 0.0;
        let mut source_prev = 0.0;
        for k in 0..p.num_precursors() {
            let lambda = p.decay_constant(k, n);
            let kernel = DecayKernel::new(lambda, dt)?;
            let w = LagrangeWeights::new(&kernel, dt, gamma);

            let omega = gen0 / p.gen_time(n) * p.delayed_fraction(k, n) * w.current;
            let zeta_hat = kernel.e * h.concentration(k, n - 1)
                + gen0 * h.power(n - 1) * p.delayed_fraction(k, n - 1) / p.gen_time(n - 1)
                    * w.previous
                + gen0 * h.power(before) * p.delayed_fraction(k, before) / p.gen_time(before)
                    * w.before;

            self.omega[k] = omega;
            self.zeta_hat[k] = zeta_hat;
            tau += lambda * omega;
            source_hat += lambda * zeta_hat;
            source_prev += p.decay_constant(k, n - 1) * h.concentration(k, n - 1);
        }

        let fb = p.feedback();
        let kernel = DecayKernel::new(fb.lambda_h, dt)?;
        let w = LagrangeWeights::new(&kernel, dt, gamma);
        let a1 = fb.gamma_d * p.pow_norm(n) * w.current;
        let b1 = p.rho_imp(n) + kernel.e * (h.rho(n - 1) - p.rho_imp(n - 1))
            - h.power(0) * fb.gamma_d * fb.eta * kernel.k0
            + fb.gamma_d
                * (p.pow_norm(n - 1) * h.power(n - 1) * w.previous
                    + p.pow_norm(before) * h.power(before) * w.before);

        Ok(StepTerms {
            n,
            dt,
            gamma,
            before,
            tau,
            source_hat,
            source_prev,
            a1,
            b1,
        })
    }

    /// `ln(P(n-1)/P(n-2)) / Δt(n-1)`, or zero on the first step and whenever
    /// the ratio admits no logarithm.
    fn estimate_alpha(&mut self, terms: &StepTerms) -> Real {
        let n = terms.n;
        if n < 2 {
            return 0.0;
        }
        let h = &self.history;
        let ratio = h.power(n - 1) / h.power(n - 2);
        let alpha = ratio.ln() / (self.params.time(n - 1) - self.params.time(n - 2));
        if ratio > 0.0 && alpha.is_finite() {
            return alpha;
        }
        warn!(index = n, ratio, "cannot estimate growth rate, using alpha = 0");
        self.stats.alpha_fallbacks += 1;
        0.0
    }

    fn solve_power(&self, terms: &StepTerms, alpha: Real) -> SolverResult<(Real, Branch)> {
        let p = &*self.params;
        let h = &self.history;
        let n = terms.n;
        let dt = terms.dt;
        let theta = p.theta();
        let gen0 = p.gen_time(0);

        let a = theta * dt * terms.a1 / p.gen_time(n);
        let b = theta * dt * (((terms.b1 - p.beta_eff(n)) / p.gen_time(n) - alpha) + terms.tau / gen0)
            - 1.0;
        let explicit = (1.0 - theta)
            * dt
            * (((h.rho(n - 1) - p.beta_eff(n - 1)) / p.gen_time(n - 1) - alpha) * h.power(n - 1)
                + terms.source_prev / gen0);
        let c = theta * dt / gen0 * terms.source_hat
            + (alpha * dt).exp() * (explicit + h.power(n - 1));

        let (power, branch) = if a < 0.0 {
            let discriminant = b * b - 4.0 * a * c;
            if !(discriminant >= 0.0) {
                return Err(SolverError::DegenerateRoot {
                    index: n,
                    discriminant,
                });
            }
            ((-b - discriminant.sqrt()) / (2.0 * a), Branch::Quadratic)
        } else if a == 0.0 {
            if b == 0.0 {
                return Err(SolverError::SingularLinearStep { index: n });
            }
            (-c / b, Branch::Linear)
        } else if a > 0.0 {
            return Err(SolverError::InvalidCoefficient { index: n, a });
        } else {
            return Err(SolverError::NonFinite {
                index: n,
                what: "quadratic coefficient",
            });
        };

        if !power.is_finite() {
            return Err(SolverError::NonFinite { index: n, what: "power" });
        }
        Ok((power, branch))
    }
}

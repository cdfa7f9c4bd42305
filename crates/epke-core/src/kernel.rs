//! Analytic decay-kernel moments over one time step.
//!
//! For a decay constant `λ ≥ 0` and a step `Δt > 0` this module evaluates
//!
//! - `E(λ,Δt)  = exp(-λΔt)`
//! - `k_m(λ,Δt) = ∫₀^Δt s^m exp(-λ(Δt - s)) ds` for `m = 0, 1, 2`
//!
//! where `s` runs from the start of the step. These are the weights that turn a
//! quadratic interpolant of a source term into the exact contribution of that
//! source to a first-order decay equation at the end of the step.
//!
//! Writing `x = λΔt` and `k_m = Δt^(m+1) g_m(x)`, the closed forms are
//!
//! - `g0 = (1 - e^-x) / x`
//! - `g1 = (x - (1 - e^-x)) / x²`
//! - `g2 = (x² - 2x + 2(1 - e^-x)) / x³`
//!
//! which cancel catastrophically for small `x`, so below [`SERIES_CUTOFF`] the
//! alternating series `g_m(x) = Σ_j (-x)^j m! / (m+j+1)!` is summed instead.
//! For large `x` every `g_m` decays like `1/x` and `E` underflows smoothly to 0.

use crate::error::{EpkeError, EpkeResult};
use crate::numeric::{Real, ensure_finite};

/// Below this `|λΔt|` the series expansion is used.
pub const SERIES_CUTOFF: Real = 0.5;

const MAX_SERIES_TERMS: usize = 40;

/// All kernel weights for one `(λ, Δt)` pair.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DecayKernel {
    pub e: Real,
    pub k0: Real,
    pub k1: Real,
    pub k2: Real,
}

impl DecayKernel {
    /// Evaluate the kernel for decay constant `lambda` over a step `dt`.
    pub fn new(lambda: Real, dt: Real) -> EpkeResult<Self> {
        let lambda = ensure_finite(lambda, "decay constant")?;
        if !(dt.is_finite() && dt > 0.0) {
            return Err(EpkeError::InvalidArg {
                what: "kernel step size must be finite and positive",
            });
        }

        let x = lambda * dt;
        let (g0, g1, g2) = if x.abs() < SERIES_CUTOFF {
            (series(0, x), series(1, x), series(2, x))
        } else {
            // 1 - e^-x without cancellation
            let one_minus_e = -(-x).exp_m1();
            (
                one_minus_e / x,
                (x - one_minus_e) / (x * x),
                (x * x - 2.0 * x + 2.0 * one_minus_e) / (x * x * x),
            )
        };

        Ok(Self {
            e: (-x).exp(),
            k0: g0 * dt,
            k1: g1 * dt * dt,
            k2: g2 * dt * dt * dt,
        })
    }
}

/// `g_m(x) = Σ_j (-x)^j m! / (m+j+1)!`
fn series(m: u32, x: Real) -> Real {
    // first term: m!/(m+1)! = 1/(m+1)
    let mut term = 1.0 / Real::from(m + 1);
    let mut sum = 0.0;
    for j in 0..MAX_SERIES_TERMS {
        sum += term;
        term *= -x / Real::from(m + j as u32 + 2);
        if term.abs() <= Real::EPSILON * 1e-2 * sum.abs() {
            break;
        }
    }
    sum
}

/// `exp(-λΔt)`
pub fn e(lambda: Real, dt: Real) -> EpkeResult<Real> {
    DecayKernel::new(lambda, dt).map(|k| k.e)
}

pub fn k0(lambda: Real, dt: Real) -> EpkeResult<Real> {
    DecayKernel::new(lambda, dt).map(|k| k.k0)
}

pub fn k1(lambda: Real, dt: Real) -> EpkeResult<Real> {
    DecayKernel::new(lambda, dt).map(|k| k.k1)
}

pub fn k2(lambda: Real, dt: Real) -> EpkeResult<Real> {
    DecayKernel::new(lambda, dt).map(|k| k.k2)
}

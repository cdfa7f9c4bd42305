//! epke-core: stable foundation for the exponential point-kinetics solver.
//!
//! Contains:
//! - numeric (Real + tolerances + float helpers + significant-digit rounding)
//! - kernel (analytic decay-kernel moments k0/k1/k2 and E)
//! - timing (wall-clock phase timers)
//! - error (shared error types)

pub mod error;
pub mod kernel;
pub mod numeric;
pub mod timing;

// Re-exports: nice ergonomics for downstream crates
pub use error::{EpkeError, EpkeResult};
pub use kernel::{DecayKernel, e, k0, k1, k2};
pub use numeric::*;

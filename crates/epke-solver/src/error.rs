//! Error types for solver operations.

use epke_core::EpkeError;
use thiserror::Error;

/// Errors that abort a solve. Numerical failures carry the time index at
/// which they were detected.
#[derive(Error, Debug)]
pub enum SolverError {
    #[error("Invalid parameters: {what}")]
    InvalidParameters { what: String },

    #[error("Non-monotonic time grid at index {index}: dt = {dt}")]
    NonMonotonicTimeGrid { index: usize, dt: f64 },

    #[error("Invalid quadratic coefficient at index {index}: a = {a} (must not be positive)")]
    InvalidCoefficient { index: usize, a: f64 },

    #[error("Degenerate root at index {index}: discriminant = {discriminant}")]
    DegenerateRoot { index: usize, discriminant: f64 },

    #[error("Singular linear step at index {index}: linear coefficient vanished")]
    SingularLinearStep { index: usize },

    #[error("Non-finite {what} at index {index}")]
    NonFinite { index: usize, what: &'static str },

    #[error("Invalid precomputed history: {what}")]
    InvalidPrefix { what: String },

    #[error("Time {time} outside parameter grid [{start}, {end}]")]
    OutOfRange { time: f64, start: f64, end: f64 },

    #[error("History holds {filled} time steps, {requested} requested")]
    IncompleteHistory { requested: usize, filled: usize },

    #[error("Kernel error: {0}")]
    Kernel(#[from] EpkeError),
}

pub type SolverResult<T> = Result<T, SolverError>;

impl SolverError {
    /// Time index at which a numerical failure was detected, if any.
    pub fn index(&self) -> Option<usize> {
        match self {
            SolverError::NonMonotonicTimeGrid { index, .. }
            | SolverError::InvalidCoefficient { index, .. }
            | SolverError::DegenerateRoot { index, .. }
            | SolverError::SingularLinearStep { index }
            | SolverError::NonFinite { index, .. } => Some(*index),
            _ => None,
        }
    }
}

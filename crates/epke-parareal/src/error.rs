//! Error types for solver-tree operations.

use epke_solver::SolverError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TreeError {
    #[error("Coarse index {index} cannot seed a child: {filled} points solved")]
    InvalidCoarseIndex { index: usize, filled: usize },

    #[error("Invalid fine grid: {what}")]
    InvalidFineGrid { what: String },

    #[error("Child seeded at coarse index {coarse_index} failed: {source}")]
    ChildFailed {
        coarse_index: usize,
        #[source]
        source: SolverError,
    },

    #[error("Solver error: {0}")]
    Solver(#[from] SolverError),
}

pub type TreeResult<T> = Result<T, TreeError>;

//! Coarse/fine composition of point-kinetics solvers.
//!
//! A [`SolverTree`] owns a coarse [`epke_solver::StepSolver`] and any number
//! of finer child trees seeded from its solution. Siblings solve in parallel.

pub mod error;
pub mod tree;

pub use error::{TreeError, TreeResult};
pub use tree::{AssembledOutput, ChildStatus, FailurePolicy, SolverTree};

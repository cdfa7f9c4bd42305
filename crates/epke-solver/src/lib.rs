//! Exponential point-kinetics solver.
//!
//! - `params`: immutable per-step kinetics constants, re-gridding and slicing
//! - `history`: power, reactivity and scaled precursor histories
//! - `step`: the time integrator with its stiffness transform

pub mod error;
pub mod history;
pub mod params;
pub mod step;

pub use error::{SolverError, SolverResult};
pub use history::History;
pub use params::{Feedback, ParameterTables, Parameters, PrecursorGroup, validate_time_grid};
pub use step::{SolverOptions, StepSolver, StepStats};

//! Shared application service layer for the point-kinetics solver.
//!
//! Centralizes project loading, compilation of input definitions into solver
//! objects, run execution with caching, and result queries so that frontends
//! stay thin.

pub mod compile;
pub mod error;
pub mod progress;
pub mod project_service;
pub mod query;
pub mod run_service;

pub use compile::{CompiledProject, compile_initial, compile_parameters, compile_project};
pub use error::{AppError, AppResult};
pub use progress::{RunProgressEvent, RunStage};
pub use project_service::{load_project, save_project, validate_project};
pub use query::{RunSummary, Series, extract_series, get_run_summary};
pub use run_service::{RunOptions, RunRequest, RunResponse, ensure_run, list_runs, load_run};

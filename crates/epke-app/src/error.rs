//! Error types for the epke-app service layer.

use std::path::PathBuf;

/// Application error wrapping the backend crates behind one interface.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Project error: {0}")]
    Project(String),

    #[error("Failed to read project file: {path}")]
    ProjectFileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Project validation failed: {0}")]
    Validation(String),

    #[error("Solver error: {0}")]
    Solver(String),

    #[error("Refinement error: {0}")]
    Tree(String),

    #[error("Results error: {0}")]
    Results(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl From<epke_project::ProjectError> for AppError {
    fn from(err: epke_project::ProjectError) -> Self {
        match err {
            epke_project::ProjectError::Validation(e) => AppError::Validation(e.to_string()),
            other => AppError::Project(other.to_string()),
        }
    }
}

impl From<epke_project::ValidationError> for AppError {
    fn from(err: epke_project::ValidationError) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<epke_solver::SolverError> for AppError {
    fn from(err: epke_solver::SolverError) -> Self {
        AppError::Solver(err.to_string())
    }
}

impl From<epke_parareal::TreeError> for AppError {
    fn from(err: epke_parareal::TreeError) -> Self {
        match err {
            epke_parareal::TreeError::Solver(e) => AppError::Solver(e.to_string()),
            other => AppError::Tree(other.to_string()),
        }
    }
}

impl From<epke_results::ResultsError> for AppError {
    fn from(err: epke_results::ResultsError) -> Self {
        AppError::Results(err.to_string())
    }
}

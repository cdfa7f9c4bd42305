//! Project loading, saving and validation.

use std::path::Path;

use epke_project::schema::Project;

use crate::error::{AppError, AppResult};

/// Load a project, choosing YAML or JSON by extension.
pub fn load_project(path: &Path) -> AppResult<Project> {
    if !path.exists() {
        return Err(AppError::ProjectFileRead {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        });
    }
    Ok(epke_project::load(path)?)
}

pub fn save_project(path: &Path, project: &Project) -> AppResult<()> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => epke_project::save_json(path, project)?,
        _ => epke_project::save_yaml(path, project)?,
    }
    Ok(())
}

pub fn validate_project(project: &Project) -> AppResult<()> {
    epke_project::validate_project(project)?;
    Ok(())
}

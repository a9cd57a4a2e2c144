use std::path::PathBuf;

use crate::error::EngineError;
use crate::models::Project;

/// The console's project record store, as consumed by the mapper.
pub trait ProjectStore: Send + Sync {
    fn list_projects(&self) -> Result<Vec<Project>, EngineError>;
}

/// Project records read from the console's flat JSON store.
pub struct JsonProjectStore {
    path: PathBuf,
}

impl JsonProjectStore {
    pub fn new(path: PathBuf) -> Self {
        JsonProjectStore { path }
    }
}

impl ProjectStore for JsonProjectStore {
    fn list_projects(&self) -> Result<Vec<Project>, EngineError> {
        let raw = std::fs::read_to_string(&self.path).map_err(|e| {
            EngineError::Configuration(format!(
                "project store {} unreadable: {e}",
                self.path.display()
            ))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            EngineError::Configuration(format!(
                "project store {} malformed: {e}",
                self.path.display()
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn reads_project_records() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"id": "PRJ-1", "name": "社内システム更改"}}, {{"id": "PRJ-2", "name": "保守契約"}}]"#
        )
        .unwrap();

        let store = JsonProjectStore::new(file.path().to_path_buf());
        let projects = store.list_projects().unwrap();
        assert_eq!(projects.len(), 2);
        assert_eq!(projects[0].id, "PRJ-1");
    }

    #[test]
    fn missing_file_is_a_configuration_error() {
        let store = JsonProjectStore::new(PathBuf::from("/nonexistent/projects.json"));
        let err = store.list_projects().unwrap_err();
        assert!(err.is_configuration());
    }
}

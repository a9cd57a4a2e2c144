use std::path::PathBuf;

use crate::error::EngineError;
use crate::models::TemplateEntry;

/// Source of the recurring invoice template list: an ordered JSON array of
/// `{template_id, note}` pairs maintained by the operators. The order in
/// the file is the processing and report order of a batch run.
pub struct TemplateRegistry {
    path: PathBuf,
}

impl TemplateRegistry {
    pub fn new(path: PathBuf) -> Self {
        TemplateRegistry { path }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    pub fn load(&self) -> Result<Vec<TemplateEntry>, EngineError> {
        let raw = std::fs::read_to_string(&self.path).map_err(|e| {
            EngineError::Configuration(format!(
                "template registry {} unreadable: {e}",
                self.path.display()
            ))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            EngineError::Configuration(format!(
                "template registry {} malformed: {e}",
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
    fn loads_entries_in_file_order() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[
                {{"template_id": "inv-200", "note": "月額保守"}},
                {{"template_id": "inv-100", "note": "ライセンス"}}
            ]"#
        )
        .unwrap();

        let registry = TemplateRegistry::new(file.path().to_path_buf());
        let entries = registry.load().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].template_id, "inv-200");
        assert_eq!(entries[1].template_id, "inv-100");
    }

    #[test]
    fn missing_registry_is_a_configuration_error() {
        let registry = TemplateRegistry::new(PathBuf::from("/nonexistent/templates.json"));
        let err = registry.load().unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn malformed_registry_is_a_configuration_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let registry = TemplateRegistry::new(file.path().to_path_buf());
        let err = registry.load().unwrap_err();
        assert!(err.is_configuration());
    }
}

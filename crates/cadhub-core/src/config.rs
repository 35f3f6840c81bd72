//! Synchronization settings
//!
//! Stored as RON next to the project, like project files.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::connection::CadContext;

/// Settings for a synchronization run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Folder scanned recursively for template artifacts
    pub template_root: PathBuf,
    /// Where new part files go; the active document's directory when unset
    pub project_dir: Option<PathBuf>,
    /// Material library scanned in the background
    pub material_library: Option<PathBuf>,
    /// How long to wait for the material scan before giving up
    pub material_wait_ms: u64,
    /// Tracing filter directives, overridden by `RUST_LOG`
    pub log_filter: Option<String>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            template_root: PathBuf::from("templates"),
            project_dir: None,
            material_library: None,
            material_wait_ms: 2000,
            log_filter: None,
        }
    }
}

impl SyncConfig {
    /// Save the settings to a RON file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let content = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| ConfigError::Serialize(e.to_string()))?;
        std::fs::write(path.as_ref(), content).map_err(|e| ConfigError::Io(e.to_string()))?;
        Ok(())
    }

    /// Load settings from a RON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io(e.to_string()))?;
        let config: SyncConfig =
            ron::from_str(&content).map_err(|e| ConfigError::Deserialize(e.to_string()))?;
        Ok(config)
    }

    /// How long to wait for the material scan
    pub fn material_wait(&self) -> Duration {
        Duration::from_millis(self.material_wait_ms)
    }

    /// Target directory for new parts in `context`
    pub fn project_dir_for(&self, context: &CadContext) -> PathBuf {
        self.project_dir
            .clone()
            .unwrap_or_else(|| context.project_dir.clone())
    }
}

/// Config file errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Serialization error: {0}")]
    Serialize(String),
    #[error("Deserialization error: {0}")]
    Deserialize(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadhub_automation::DocumentHandle;
    use tempfile::tempdir;

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cadhub.ron");
        let config = SyncConfig {
            template_root: dir.path().join("templates"),
            material_library: Some(PathBuf::from("/lib/metals")),
            log_filter: Some("cadhub_core=debug".into()),
            ..Default::default()
        };
        config.save(&path).unwrap();
        assert_eq!(SyncConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let config: SyncConfig = ron::from_str("(template_root: \"/srv/templates\")").unwrap();
        assert_eq!(config.template_root, PathBuf::from("/srv/templates"));
        assert_eq!(config.material_wait(), Duration::from_secs(2));
        assert!(config.project_dir.is_none());
    }

    #[test]
    fn test_load_errors() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            SyncConfig::load(dir.path().join("missing.ron")),
            Err(ConfigError::Io(_))
        ));
        let broken = dir.path().join("broken.ron");
        std::fs::write(&broken, "(template_root: 12").unwrap();
        assert!(matches!(SyncConfig::load(&broken), Err(ConfigError::Deserialize(_))));
    }

    #[test]
    fn test_project_dir_falls_back_to_document() {
        let context = CadContext {
            document: DocumentHandle(1),
            document_name: "Rover.CATProduct".into(),
            project_dir: PathBuf::from("/work/rover"),
        };
        let mut config = SyncConfig::default();
        assert_eq!(config.project_dir_for(&context), PathBuf::from("/work/rover"));
        config.project_dir = Some(PathBuf::from("/out"));
        assert_eq!(config.project_dir_for(&context), PathBuf::from("/out"));
    }
}

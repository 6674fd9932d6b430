// Editor configuration
//
// Stored as RON, e.g.
//
//     (max_history: Some(200), section_propagation: Ancestors)
//
// Missing keys fall back to the defaults.

use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("RON error: {0}")]
    Ron(#[from] ron::error::SpannedError),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] ron::Error),
}

/// How a change on a section travels further up the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SectionPropagation {
    /// Jump straight to the owning document, skipping parent sections
    #[default]
    Document,
    /// Visit every ancestor section on the way to the document
    Ancestors,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Maximum number of commands kept for undo; `None` keeps everything
    pub max_history: Option<usize>,

    pub section_propagation: SectionPropagation,
}

impl EditorConfig {
    pub fn from_ron_str(text: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(text)?)
    }

    pub fn to_ron_string(&self) -> Result<String, ConfigError> {
        Ok(ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?)
    }

    /// Load a config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_ron_str(&text)?;
        tracing::debug!(path = %path.as_ref().display(), ?config, "loaded editor config");
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        std::fs::write(path, self.to_ron_string()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = EditorConfig::default();
        assert_eq!(config.max_history, None);
        assert_eq!(config.section_propagation, SectionPropagation::Document);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = EditorConfig::from_ron_str("(max_history: Some(25))").unwrap();
        assert_eq!(config.max_history, Some(25));
        assert_eq!(config.section_propagation, SectionPropagation::Document);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let result = EditorConfig::from_ron_str("(max_history: \"lots\")");
        assert!(matches!(result, Err(ConfigError::Ron(_))));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("editor.ron");
        let config = EditorConfig {
            max_history: Some(10),
            section_propagation: SectionPropagation::Ancestors,
        };
        config.save(&path).unwrap();

        let loaded = EditorConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = EditorConfig::load(dir.path().join("nope.ron"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}

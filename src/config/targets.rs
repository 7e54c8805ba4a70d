//! Target list loading

use crate::error::{AppError, Result};
use crate::models::{Config, TargetSet};
use std::path::Path;

/// Resolves the target set for a run from the configuration
pub struct TargetLoader;

impl TargetLoader {
    /// The configured file, or the built-in targets when none is set
    pub fn load(config: &Config) -> Result<TargetSet> {
        match config.targets_file.as_deref() {
            Some(path) => Self::load_file(Path::new(path)),
            None => Ok(TargetSet::default()),
        }
    }

    /// Read, clean and validate a JSON target file. A configured file that
    /// cannot be used is a configuration error.
    pub fn load_file(path: &Path) -> Result<TargetSet> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::config(format!("Failed to read targets file {}: {}", path.display(), e)))?;
        Self::parse(&content)
            .map_err(|e| AppError::config(format!("Invalid targets file {}: {}", path.display(), e)))
    }

    pub fn parse(content: &str) -> Result<TargetSet> {
        let mut targets: TargetSet = serde_json::from_str(content)?;
        targets.retain_valid_entries();
        targets.validate()?;
        Ok(targets)
    }

    /// Built-in targets, pretty-printed
    pub fn default_targets_json() -> Result<String> {
        Ok(serde_json::to_string_pretty(&TargetSet::default())?)
    }
}

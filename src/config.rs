// Statement Normalizer - Configuration
// Built-in defaults, optionally overridden by a TOML file

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{NormalizeError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    /// Cardholder names that open a statement section
    pub known_names: Vec<String>,

    /// Placeholder cells allowed next to a name in a name-row
    pub section_labels: Vec<String>,

    /// How much of the file content is sniffed for a bank name
    pub detection_sample_bytes: usize,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            known_names: ["Rahul", "Ritu", "Raj", "Rajat"]
                .into_iter()
                .map(String::from)
                .collect(),
            section_labels: [
                "Domestic Transactions",
                "International Transactions",
                "Domestic Transaction",
                "International Transaction",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            detection_sample_bytes: 1000,
        }
    }
}

impl NormalizerConfig {
    /// Load a TOML config; keys that are absent keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let s = fs::read_to_string(path).map_err(|e| NormalizeError::io(path, e))?;
        Self::from_toml(&s)
    }

    pub fn from_toml(s: &str) -> Result<Self> {
        let cfg: Self = toml::from_str(s)
            .map_err(|e| NormalizeError::Config(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        if self.detection_sample_bytes == 0 {
            return Err(NormalizeError::Config(
                "detection_sample_bytes must be positive".to_string(),
            ));
        }
        if let Some(blank) = self.known_names.iter().find(|n| n.trim().is_empty()) {
            return Err(NormalizeError::Config(format!(
                "known_names contains a blank entry: {blank:?}"
            )));
        }
        Ok(())
    }

    pub(crate) fn is_section_label(&self, cell: &str) -> bool {
        self.section_labels.iter().any(|label| label == cell)
    }

    pub(crate) fn known_name(&self, cell: &str) -> Option<&str> {
        self.known_names
            .iter()
            .find(|name| name.as_str() == cell)
            .map(String::as_str)
    }
}

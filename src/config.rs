//! Harness configuration

use crate::error::HarnessError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// What the property verifier does after the first failing property of a type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureMode {
    /// Verify every property and report each failure
    CollectAll,
    /// Stop verifying a type at its first failing property
    FailFast,
}

impl Default for FailureMode {
    fn default() -> Self {
        FailureMode::CollectAll
    }
}

/// Configuration shared by every verification call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Deepest nesting of constructor arguments the synthesizer will follow
    pub max_depth: usize,

    /// Per-type failure policy; batches always move on to the next type
    pub failure_mode: FailureMode,

    /// Emit a debug record for every passing property and constructor
    pub log_passes: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            max_depth: 8,
            failure_mode: FailureMode::CollectAll,
            log_passes: false,
        }
    }
}

impl HarnessConfig {
    /// Parse a JSON document; absent fields keep their defaults.
    pub fn from_json(document: &str) -> Result<Self, HarnessError> {
        let config: HarnessConfig = serde_json::from_str(document)
            .map_err(|e| HarnessError::InvalidArgument(format!("bad harness config: {}", e)))?;
        if config.max_depth == 0 {
            return Err(HarnessError::InvalidArgument(
                "max_depth must be at least 1".to_string(),
            ));
        }
        Ok(config)
    }

    /// Read and parse a JSON config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, HarnessError> {
        let path = path.as_ref();
        let document = fs::read_to_string(path).map_err(|e| {
            HarnessError::InvalidArgument(format!("cannot read {}: {}", path.display(), e))
        })?;
        log::debug!("loading harness config from {}", path.display());
        Self::from_json(&document)
    }

    pub fn fail_fast(mut self) -> Self {
        self.failure_mode = FailureMode::FailFast;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = HarnessConfig::default();
        assert_eq!(config.max_depth, 8);
        assert_eq!(config.failure_mode, FailureMode::CollectAll);
        assert!(!config.log_passes);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = HarnessConfig::from_json(r#"{ "failure_mode": "fail_fast" }"#).unwrap();
        assert_eq!(config.failure_mode, FailureMode::FailFast);
        assert_eq!(config.max_depth, 8);
    }

    #[test]
    fn test_malformed_json_is_invalid_argument() {
        let err = HarnessConfig::from_json("{ max_depth: ").unwrap_err();
        assert!(matches!(err, HarnessError::InvalidArgument(_)));

        let err = HarnessConfig::from_json(r#"{ "max_depth": 0 }"#).unwrap_err();
        assert!(matches!(err, HarnessError::InvalidArgument(_)));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("harness.json");
        fs::write(&path, r#"{ "max_depth": 3, "log_passes": true }"#).unwrap();

        let config = HarnessConfig::from_file(&path).unwrap();
        assert_eq!(config.max_depth, 3);
        assert!(config.log_passes);

        let missing = HarnessConfig::from_file(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(missing, HarnessError::InvalidArgument(_)));
    }
}

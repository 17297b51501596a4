//! Configuration for drift

use crate::DriftError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Config file name looked up at the repository root
pub const CONFIG_FILE_NAME: &str = ".drift.toml";

/// Default configuration as TOML
pub const DEFAULT_CONFIG: &str = r#"# Drift Configuration

[generated]
# Patterns appended to the built-in generated-file table.
# Trailing "/" matches a path prefix, leading "." matches a suffix,
# anything else matches an exact basename.
extra_patterns = []

[summary]
# Include test-file symbols in summary text output
include_tests = false
# List generated/binary/unsupported files in detailed output
show_skipped = false
"#;

/// Drift configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub generated: GeneratedConfig,
    #[serde(default)]
    pub summary: SummaryConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneratedConfig {
    #[serde(default)]
    pub extra_patterns: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SummaryConfig {
    #[serde(default)]
    pub include_tests: bool,
    #[serde(default)]
    pub show_skipped: bool,
}

impl Config {
    /// Load config from a TOML file
    pub fn load(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse config from TOML string
    pub fn from_toml(content: &str) -> crate::Result<Self> {
        toml::from_str(content).map_err(|e| DriftError::ConfigParse(e.to_string()))
    }

    /// Load `.drift.toml` from a repository root, defaulting when absent.
    pub fn discover(repo_root: &Path) -> crate::Result<Self> {
        let path = repo_root.join(CONFIG_FILE_NAME);
        if path.is_file() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }
}

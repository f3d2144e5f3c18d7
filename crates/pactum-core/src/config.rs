//! Engine configuration
//!
//! Built once per run (file, then environment overrides) and passed into
//! `Feature` construction. Nothing reads process-wide flags after that.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Default ceiling on combinations produced by one `new_based_on` call.
pub const DEFAULT_MAX_COMBINATIONS: usize = 64;

/// Project configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Contract manifest path (YAML or JSON)
    #[serde(default = "default_contract")]
    pub contract: PathBuf,

    /// Base URL of the server under test
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Extra HTTP headers sent with every live request
    #[serde(default)]
    pub headers: HashMap<String, String>,

    /// Expand vanilla variants beyond the examples and enable negative tests
    #[serde(default)]
    pub generative: bool,

    /// In generative mode, keep the expanded positives but skip negatives
    #[serde(default)]
    pub positive_only: bool,

    /// Ceiling on combinations per specialization; the excess is never computed
    #[serde(default = "default_max_combinations")]
    pub max_combinations: usize,

    /// Compatibility worker count (default: available hardware parallelism)
    #[serde(default)]
    pub compat_workers: Option<usize>,

    /// Live request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_contract() -> PathBuf {
    PathBuf::from("contract.yaml")
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

const fn default_max_combinations() -> usize {
    DEFAULT_MAX_COMBINATIONS
}

const fn default_timeout() -> u64 {
    30
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            contract: default_contract(),
            base_url: default_base_url(),
            headers: HashMap::new(),
            generative: false,
            positive_only: false,
            max_combinations: DEFAULT_MAX_COMBINATIONS,
            compat_workers: None,
            timeout_secs: default_timeout(),
        }
    }
}

impl EngineConfig {
    /// Load config from file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or parsed
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e.to_string()))?;

        if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
        } else {
            toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
        }
    }

    /// Load from default location (.pactum.toml)
    pub fn load_default() -> Result<Self, ConfigError> {
        let candidates = [".pactum.toml", ".pactum.json", "pactum.toml"];

        for name in candidates {
            let path = Path::new(name);
            if path.exists() {
                return Self::load(path);
            }
        }

        // No config file, return default
        Ok(Self::default())
    }

    /// Apply `PACTUM_GENERATIVE` / `PACTUM_MAX_COMBINATIONS` from the process
    /// environment.
    pub fn from_env(self) -> Result<Self, ConfigError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply environment-style overrides from an arbitrary lookup.
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(raw) = lookup("PACTUM_GENERATIVE") {
            self.generative = match raw.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => true,
                "false" | "0" | "no" | "" => false,
                other => {
                    return Err(ConfigError::Parse(format!(
                        "PACTUM_GENERATIVE must be true or false, got \"{other}\""
                    )));
                }
            };
        }
        if let Some(raw) = lookup("PACTUM_MAX_COMBINATIONS") {
            self.max_combinations = raw.trim().parse().map_err(|_| {
                ConfigError::Parse(format!(
                    "PACTUM_MAX_COMBINATIONS must be a positive integer, got \"{raw}\""
                ))
            })?;
        }
        Ok(self)
    }

    /// Resolved compatibility worker count, never zero.
    #[must_use]
    pub fn workers(&self) -> usize {
        self.compat_workers
            .unwrap_or_else(|| {
                std::thread::available_parallelism()
                    .map(|p| p.get())
                    .unwrap_or(4)
            })
            .max(1)
    }

    /// Create example config file
    pub fn example() -> &'static str {
        r#"# pactum configuration

# Contract manifest (YAML or JSON)
contract = "contract.yaml"

# Server to test
base_url = "http://localhost:8080"

# Expand vanilla variants and generate negative tests (default: false)
# generative = true
# positive_only = false

# Ceiling on combinations per scenario (default: 64)
# max_combinations = 64

# Compatibility workers (default: available cores)
# compat_workers = 8

# Live request timeout in seconds
# timeout_secs = 30

# HTTP headers sent with every live request
[headers]
# Authorization = "Bearer your-token-here"
"#
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot read {0}: {1}")]
    Io(PathBuf, String),
    #[error("Parse error: {0}")]
    Parse(String),
}

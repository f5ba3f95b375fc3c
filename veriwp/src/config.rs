//! Verifier configuration
//!
//! Read from `veriwp.toml` next to the input file or from an explicit path;
//! command-line flags are applied on top.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, VerifyError};
use crate::translate::{ASSUME, INVARIANT};
use crate::verify::RunMode;

/// File name looked up next to the verified source
pub const CONFIG_FILE: &str = "veriwp.toml";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VerifyConfig {
    /// Z3 executable
    #[serde(default = "default_z3_path")]
    pub z3_path: String,

    /// Per-check timeout; absent leaves Z3's default
    #[serde(default)]
    pub timeout_ms: Option<u64>,

    /// Stop at the first failing function
    #[serde(default = "default_fail_fast")]
    pub fail_fast: bool,

    /// Recognised annotation calls
    #[serde(default = "default_builtins")]
    pub builtins: Vec<String>,

    /// Log every obligation in full
    #[serde(default)]
    pub dump_smt: bool,
}

fn default_z3_path() -> String {
    "z3".to_string()
}

fn default_fail_fast() -> bool {
    true
}

fn default_builtins() -> Vec<String> {
    vec![ASSUME.to_string(), INVARIANT.to_string()]
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            z3_path: default_z3_path(),
            timeout_ms: None,
            fail_fast: default_fail_fast(),
            builtins: default_builtins(),
            dump_smt: false,
        }
    }
}

impl VerifyConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| VerifyError::config_error(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            VerifyError::config_error(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&text)
            .map_err(|e| VerifyError::config_error(format!("{}: {}", path.display(), e.message())))
    }

    /// `veriwp.toml` in the directory of `input`, or the defaults when there is none
    pub fn discover(input: &Path) -> Result<Self> {
        let candidate = config_path_for(input);
        if candidate.is_file() {
            Self::load(&candidate)
        } else {
            Ok(Self::default())
        }
    }

    pub fn run_mode(&self) -> RunMode {
        if self.fail_fast {
            RunMode::FailFast
        } else {
            RunMode::Collect
        }
    }
}

fn config_path_for(input: &Path) -> PathBuf {
    input
        .parent()
        .map(|dir| dir.join(CONFIG_FILE))
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = VerifyConfig::default();
        assert_eq!(config.z3_path, "z3");
        assert_eq!(config.timeout_ms, None);
        assert_eq!(config.run_mode(), RunMode::FailFast);
        assert_eq!(config.builtins, vec!["assume", "invariant"]);
        assert_eq!(VerifyConfig::from_toml_str("").unwrap(), config);
    }

    #[test]
    fn test_partial_file() {
        let config = VerifyConfig::from_toml_str("fail_fast = false\ntimeout_ms = 5000\n").unwrap();
        assert_eq!(config.run_mode(), RunMode::Collect);
        assert_eq!(config.timeout_ms, Some(5000));
        assert_eq!(config.z3_path, "z3");
    }

    #[test]
    fn test_invalid_file() {
        let err = VerifyConfig::from_toml_str("fail_fast = 3").unwrap_err();
        assert!(matches!(err, VerifyError::Config { .. }));
        assert!(VerifyConfig::from_toml_str("colour = true").is_err());
    }

    #[test]
    fn test_discover_falls_back_to_defaults() {
        let config = VerifyConfig::discover(Path::new("/nonexistent/dir/input.py")).unwrap();
        assert_eq!(config, VerifyConfig::default());
        assert_eq!(
            config_path_for(Path::new("demos/loops.py")),
            PathBuf::from("demos/veriwp.toml")
        );
    }
}

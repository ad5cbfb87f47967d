//! Fetch configuration.
//!
//! Defaults point at the `artifacts` and `lkg` tools on `PATH` and at the
//! retry budget used in CI. Override via a YAML file, environment
//! variables, or explicit construction for tests.
//!
//! Precedence, lowest to highest: defaults, YAML file, environment. The
//! CLI applies its own flags last.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Exponential backoff parameters for the transfer retry loop.
///
/// The defaults reach the 10 s ceiling after roughly 12 seconds and give
/// about 2.5 minutes of total slack across 22 attempts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackoffConfig {
    /// Delay before the second attempt, in milliseconds.
    pub initial_delay_ms: u64,
    /// Ceiling for any single delay, in milliseconds.
    pub max_delay_ms: u64,
    /// Growth factor applied after every failed attempt.
    pub multiplier: f64,
    /// Total attempts, including the first.
    pub max_attempts: u32,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 100,
            max_delay_ms: 10_000,
            multiplier: 2.0,
            max_attempts: 22,
        }
    }
}

impl BackoffConfig {
    /// Initial delay as a [`Duration`].
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    /// Delay ceiling as a [`Duration`].
    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    /// Reject parameter combinations the retry loop cannot honor.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::InvalidBackoff(
                "max_attempts must be at least 1".into(),
            ));
        }
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(ConfigError::InvalidBackoff(format!(
                "multiplier must be a finite number >= 1, got {}",
                self.multiplier
            )));
        }
        if self.initial_delay_ms > self.max_delay_ms {
            return Err(ConfigError::InvalidBackoff(format!(
                "initial_delay_ms ({}) exceeds max_delay_ms ({})",
                self.initial_delay_ms, self.max_delay_ms
            )));
        }
        Ok(())
    }
}

/// Top-level configuration for talking to the artifact store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArtifetchConfig {
    /// The `artifacts` tool, used to list and copy build artifacts.
    pub artifacts_tool: PathBuf,
    /// The `lkg` tool, used to look up the latest build id for a builder.
    pub lkg_tool: PathBuf,
    /// Root directory under which builds are materialized.
    pub output_dir: PathBuf,
    /// Retry budget for transfers.
    pub backoff: BackoffConfig,
}

impl Default for ArtifetchConfig {
    fn default() -> Self {
        Self {
            artifacts_tool: PathBuf::from("artifacts"),
            lkg_tool: PathBuf::from("lkg"),
            output_dir: PathBuf::from("out").join("artifacts"),
            backoff: BackoffConfig::default(),
        }
    }
}

impl ArtifetchConfig {
    /// Parse a YAML document. Missing keys fall back to defaults.
    pub fn from_yaml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(s)?;
        config.backoff.validate()?;
        Ok(config)
    }

    /// Read and parse a YAML configuration file.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&raw)
    }

    /// Load configuration: defaults, then `path` if given, then the process
    /// environment.
    ///
    /// Variables:
    /// - `ARTIFETCH_ARTIFACTS_TOOL`
    /// - `ARTIFETCH_LKG_TOOL`
    /// - `ARTIFETCH_OUTPUT_DIR`
    /// - `ARTIFETCH_BACKOFF_INITIAL_MS`
    /// - `ARTIFETCH_BACKOFF_MAX_MS`
    /// - `ARTIFETCH_MAX_ATTEMPTS`
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) => Self::from_path(p)?,
            None => Self::default(),
        };
        config.apply_env(|var| std::env::var(var).ok())?;
        Ok(config)
    }

    /// Apply environment overrides using `lookup` to read variables.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("ARTIFETCH_ARTIFACTS_TOOL") {
            self.artifacts_tool = PathBuf::from(v);
        }
        if let Some(v) = lookup("ARTIFETCH_LKG_TOOL") {
            self.lkg_tool = PathBuf::from(v);
        }
        if let Some(v) = lookup("ARTIFETCH_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(v);
        }
        if let Some(v) = parse_env(&lookup, "ARTIFETCH_BACKOFF_INITIAL_MS")? {
            self.backoff.initial_delay_ms = v;
        }
        if let Some(v) = parse_env(&lookup, "ARTIFETCH_BACKOFF_MAX_MS")? {
            self.backoff.max_delay_ms = v;
        }
        if let Some(v) = parse_env(&lookup, "ARTIFETCH_MAX_ATTEMPTS")? {
            self.backoff.max_attempts = v;
        }
        self.backoff.validate()
    }
}

fn parse_env<F, T>(lookup: &F, var: &str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(var) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv {
                var: var.to_string(),
                value: raw,
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_match_ci_retry_budget() {
        let cfg = BackoffConfig::default();
        assert_eq!(cfg.initial_delay(), Duration::from_millis(100));
        assert_eq!(cfg.max_delay(), Duration::from_secs(10));
        assert_eq!(cfg.multiplier, 2.0);
        assert_eq!(cfg.max_attempts, 22);
        cfg.validate().unwrap();
    }

    #[test]
    fn yaml_partial_document_keeps_defaults() {
        let cfg = ArtifetchConfig::from_yaml_str(
            "artifacts_tool: /opt/tools/artifacts\nbackoff:\n  max_attempts: 5\n",
        )
        .unwrap();
        assert_eq!(cfg.artifacts_tool, PathBuf::from("/opt/tools/artifacts"));
        assert_eq!(cfg.lkg_tool, PathBuf::from("lkg"));
        assert_eq!(cfg.backoff.max_attempts, 5);
        assert_eq!(cfg.backoff.initial_delay_ms, 100);
    }

    #[test]
    fn yaml_rejects_unknown_keys() {
        let result = ArtifetchConfig::from_yaml_str("artifact_tool: typo\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn yaml_rejects_zero_attempts() {
        let result = ArtifetchConfig::from_yaml_str("backoff:\n  max_attempts: 0\n");
        assert!(matches!(result, Err(ConfigError::InvalidBackoff(_))));
    }

    #[test]
    fn validate_rejects_shrinking_multiplier() {
        let cfg = BackoffConfig {
            multiplier: 0.5,
            ..BackoffConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_inverted_bounds() {
        let cfg = BackoffConfig {
            initial_delay_ms: 20_000,
            ..BackoffConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn env_overrides_file_values() {
        let mut cfg = ArtifetchConfig::from_yaml_str("lkg_tool: /from/file\n").unwrap();
        cfg.apply_env(env(&[
            ("ARTIFETCH_LKG_TOOL", "/from/env"),
            ("ARTIFETCH_MAX_ATTEMPTS", "3"),
            ("ARTIFETCH_BACKOFF_INITIAL_MS", " 5 "),
        ]))
        .unwrap();
        assert_eq!(cfg.lkg_tool, PathBuf::from("/from/env"));
        assert_eq!(cfg.backoff.max_attempts, 3);
        assert_eq!(cfg.backoff.initial_delay_ms, 5);
    }

    #[test]
    fn env_rejects_unparseable_numbers() {
        let mut cfg = ArtifetchConfig::default();
        let err = cfg
            .apply_env(env(&[("ARTIFETCH_MAX_ATTEMPTS", "lots")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { .. }));
    }

    #[test]
    fn from_path_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ArtifetchConfig::from_path(&dir.path().join("nope.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn from_path_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("artifetch.yaml");
        std::fs::write(&path, "output_dir: /var/cache/builds\n").unwrap();
        let cfg = ArtifetchConfig::from_path(&path).unwrap();
        assert_eq!(cfg.output_dir, PathBuf::from("/var/cache/builds"));
    }
}

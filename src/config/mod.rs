use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, Result};

/// Top-level configuration from `.ortbridge.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub analyzer: AnalyzerOptions,
    #[serde(default)]
    pub downloader: DownloaderOptions,
}

/// Options forwarded to the ORT analyzer and applied during resolution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzerOptions {
    /// Ignore the versions of third-party tools used by the analyzer.
    #[serde(default)]
    pub ignore_tool_versions: bool,
    /// Allow projects with dynamic dependency versions, e.g. NPM projects
    /// without a lock file.
    #[serde(default)]
    pub allow_dynamic_versions: bool,
    /// Query an external curation service for package metadata.
    #[serde(default)]
    pub use_external_curations: bool,
    /// Keep license findings located in excluded paths.
    #[serde(default)]
    pub keep_excluded_artifacts: bool,
}

/// Options of the source enrichment step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloaderOptions {
    /// Directory receiving the source archives. Created if absent.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Number of concurrent downloads.
    #[serde(default = "default_jobs")]
    pub jobs: usize,
    /// Per-artifact download timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

pub const DEFAULT_OUTPUT_DIR: &str = "ort-downloader-result";

fn default_output_dir() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_DIR)
}

fn default_jobs() -> usize {
    4
}

fn default_timeout_secs() -> u64 {
    600
}

impl Default for DownloaderOptions {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            jobs: default_jobs(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl DownloaderOptions {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn jobs(&self) -> usize {
        self.jobs.max(1)
    }

    pub fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            return Err(BridgeError::Config(
                "downloader.timeout_secs must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

impl Config {
    /// Load config from a TOML file. Returns default if file doesn't exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.downloader.validate()?;
        Ok(config)
    }

    /// Generate a starter config file.
    pub fn starter_toml() -> &'static str {
        r#"# ortbridge configuration

[analyzer]
# Ignore the versions of third-party tools used by the ORT analyzer.
ignore_tool_versions = false

# Allow dynamic dependency versions (e.g. NPM projects without a lock file).
allow_dynamic_versions = false

# Query an external curation service for package metadata.
use_external_curations = false

# Keep license findings located in excluded paths.
keep_excluded_artifacts = false

[downloader]
# Directory receiving the downloaded source archives.
output_dir = "ort-downloader-result"

# Number of concurrent downloads.
jobs = 4

# Per-artifact download timeout in seconds.
timeout_secs = 600
"#
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let config = Config::load(Path::new("does/not/exist.toml")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.downloader.jobs, 4);
        assert!(!config.analyzer.keep_excluded_artifacts);
    }

    #[test]
    fn starter_toml_round_trips_to_defaults() {
        let config: Config = toml::from_str(Config::starter_toml()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".ortbridge.toml");
        std::fs::write(&path, "[analyzer]\nallow_dynamic_versions = true\n").unwrap();
        let config = Config::load(&path).unwrap();
        assert!(config.analyzer.allow_dynamic_versions);
        assert_eq!(config.downloader, DownloaderOptions::default());
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".ortbridge.toml");
        std::fs::write(&path, "[downloader]\ntimeout_secs = 0\n").unwrap();
        assert!(matches!(Config::load(&path), Err(BridgeError::Config(_))));
    }

    #[test]
    fn jobs_are_clamped() {
        let opts = DownloaderOptions {
            jobs: 0,
            ..Default::default()
        };
        assert_eq!(opts.jobs(), 1);
    }
}

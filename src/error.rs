use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, BridgeError>;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Parse error in {file}: {message}")]
    Parse { file: String, message: String },

    #[error("No analyzer run found in ORT result file: {0}")]
    MissingAnalyzer(String),

    #[error("Failed to create directory '{}' for downloaded sources: {source}", path.display())]
    OutputDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Analyzer error: {0}")]
    Analyzer(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl BridgeError {
    pub fn exit_code(&self) -> i32 {
        2
    }
}

/// Failure of a single source download. Never fatal to a batch.
#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("package {0} has neither a VCS URL nor a source artifact URL")]
    NoSourceLocation(String),

    #[error("git execution failed (code={status}): {stderr}")]
    Git { status: ExitStatus, stderr: String },

    #[cfg(feature = "http")]
    #[error("HTTP download failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("download was cancelled")]
    Cancelled,

    #[error("download timed out after {0:?}")]
    TimedOut(Duration),

    #[error("archiving failed: {0}")]
    Archive(#[from] zip::result::ZipError),
}

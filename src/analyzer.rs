//! Running the external ORT analyzer on a project directory.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::{debug, info};

use crate::config::AnalyzerOptions;
use crate::error::{BridgeError, Result};

/// File name ORT writes its analyzer result to.
pub const ANALYZER_RESULT_FILE: &str = "analyzer-result.json";

/// An `ort analyze` command line for one project.
#[derive(Debug, Clone)]
pub struct AnalyzerInvocation {
    program: PathBuf,
    project_dir: PathBuf,
    output_dir: PathBuf,
    options: AnalyzerOptions,
}

impl AnalyzerInvocation {
    pub fn new(project_dir: &Path, output_dir: &Path, options: AnalyzerOptions) -> Self {
        Self {
            program: PathBuf::from("ort"),
            project_dir: project_dir.to_path_buf(),
            output_dir: output_dir.to_path_buf(),
            options,
        }
    }

    /// Use a different `ort` executable than the one on `PATH`.
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    pub fn result_path(&self) -> PathBuf {
        self.output_dir.join(ANALYZER_RESULT_FILE)
    }

    pub fn args(&self) -> Vec<OsString> {
        let property = |key: &str, value: bool| -> [OsString; 2] {
            ["-P".into(), format!("ort.analyzer.{key}={value}").into()]
        };

        let mut args: Vec<OsString> = Vec::new();
        args.extend(property("ignoreToolVersions", self.options.ignore_tool_versions));
        args.extend(property("allowDynamicVersions", self.options.allow_dynamic_versions));
        args.extend(property("skipExcluded", !self.options.keep_excluded_artifacts));
        args.extend(property(
            "useClearlyDefinedCurations",
            self.options.use_external_curations,
        ));
        args.push("analyze".into());
        args.push("-i".into());
        args.push(self.project_dir.clone().into_os_string());
        args.push("-o".into());
        args.push(self.output_dir.clone().into_os_string());
        args.push("-f".into());
        args.push("JSON".into());
        args
    }

    /// Run the analyzer and return the path of the result it wrote.
    pub fn run(&self) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.output_dir).map_err(|source| {
            BridgeError::OutputDirectory {
                path: self.output_dir.clone(),
                source,
            }
        })?;

        let mut cmd = Command::new(&self.program);
        cmd.args(self.args()).stdin(Stdio::null());
        debug!("{cmd:#?}");
        info!(project = %self.project_dir.display(), "running ORT analyzer");

        let output = cmd.output().map_err(|e| {
            BridgeError::Analyzer(format!("failed to start '{}': {e}", self.program.display()))
        })?;
        if !output.status.success() {
            return Err(BridgeError::Analyzer(format!(
                "'{}' exited with {}: {}",
                self.program.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let result = self.result_path();
        if !result.is_file() {
            return Err(BridgeError::Analyzer(format!(
                "analyzer finished but {} was not written",
                result.display()
            )));
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn strings(args: Vec<OsString>) -> Vec<String> {
        args.into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn default_arguments() {
        let inv = AnalyzerInvocation::new(
            Path::new("/work/project"),
            Path::new("/work/out"),
            AnalyzerOptions::default(),
        );
        assert_eq!(
            strings(inv.args()),
            vec![
                "-P",
                "ort.analyzer.ignoreToolVersions=false",
                "-P",
                "ort.analyzer.allowDynamicVersions=false",
                "-P",
                "ort.analyzer.skipExcluded=true",
                "-P",
                "ort.analyzer.useClearlyDefinedCurations=false",
                "analyze",
                "-i",
                "/work/project",
                "-o",
                "/work/out",
                "-f",
                "JSON",
            ]
        );
    }

    #[test]
    fn flags_follow_options() {
        let options = AnalyzerOptions {
            ignore_tool_versions: true,
            allow_dynamic_versions: true,
            use_external_curations: true,
            keep_excluded_artifacts: true,
        };
        let args = strings(
            AnalyzerInvocation::new(Path::new("p"), Path::new("o"), options).args(),
        );
        assert!(args.contains(&"ort.analyzer.ignoreToolVersions=true".to_string()));
        assert!(args.contains(&"ort.analyzer.allowDynamicVersions=true".to_string()));
        assert!(args.contains(&"ort.analyzer.skipExcluded=false".to_string()));
        assert!(args.contains(&"ort.analyzer.useClearlyDefinedCurations=true".to_string()));
    }

    #[test]
    fn missing_program_is_an_analyzer_error() {
        let out = tempfile::tempdir().unwrap();
        let err = AnalyzerInvocation::new(Path::new("."), out.path(), AnalyzerOptions::default())
            .with_program("/nonexistent/ort-binary")
            .run()
            .unwrap_err();
        assert!(matches!(err, BridgeError::Analyzer(_)));
    }

    #[cfg(unix)]
    #[test]
    fn missing_result_is_an_analyzer_error() {
        let out = tempfile::tempdir().unwrap();
        let err = AnalyzerInvocation::new(Path::new("."), out.path(), AnalyzerOptions::default())
            .with_program("true")
            .run()
            .unwrap_err();
        assert!(matches!(err, BridgeError::Analyzer(ref m) if m.contains(ANALYZER_RESULT_FILE)));
    }
}

//! Translation from ORT analyzer results into pipeline artifacts, and back.

pub mod coordinate;
pub mod package;
pub mod reverse;

use crate::config::AnalyzerOptions;
use crate::error::{BridgeError, Result};
use crate::model::{Artifact, OrtResult};

pub use coordinate::map_coordinate;
pub use package::PackageFactResolver;
pub use reverse::artifact_to_package;

/// Resolve every analyzed package of `result` into an artifact.
///
/// Fails if the result has no analyzer run. Analyzer issues and settings
/// that differ from `options` are logged, not treated as errors.
pub fn resolve_result(
    result: &OrtResult,
    source: &str,
    options: &AnalyzerOptions,
) -> Result<Vec<Artifact>> {
    let analyzer = result
        .analyzer
        .as_ref()
        .ok_or_else(|| BridgeError::MissingAnalyzer(source.to_string()))?;

    if !analyzer.result.issues.is_empty() {
        tracing::warn!(
            count = analyzer.result.issues.len(),
            "the ORT analyzer reported issues"
        );
        for (id, issues) in &analyzer.result.issues {
            let messages: Vec<String> = issues.iter().map(ToString::to_string).collect();
            tracing::warn!(package = %id, "{}", messages.join("\n"));
        }
    }

    if analyzer.config.allow_dynamic_versions != options.allow_dynamic_versions {
        tracing::warn!(
            recorded = analyzer.config.allow_dynamic_versions,
            configured = options.allow_dynamic_versions,
            "result was produced with a different allow_dynamic_versions setting"
        );
    }
    if analyzer.config.ignore_tool_versions != options.ignore_tool_versions {
        tracing::warn!(
            recorded = analyzer.config.ignore_tool_versions,
            configured = options.ignore_tool_versions,
            "result was produced with a different ignore_tool_versions setting"
        );
    }

    let resolver = PackageFactResolver::new(result, options.keep_excluded_artifacts);
    tracing::debug!(
        packages_with_findings = resolver.index().len(),
        "indexed license findings"
    );

    let artifacts: Vec<Artifact> = result
        .packages()
        .into_iter()
        .map(|pkg| resolver.resolve(pkg))
        .collect();

    tracing::info!(count = artifacts.len(), source, "resolved artifacts");
    Ok(artifacts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_analyzer_is_fatal() {
        let result = OrtResult::default();
        let err = resolve_result(&result, "empty.yml", &AnalyzerOptions::default()).unwrap_err();
        assert!(matches!(err, BridgeError::MissingAnalyzer(ref s) if s == "empty.yml"));
    }

    #[test]
    fn issues_are_not_fatal() {
        let result: OrtResult = serde_yaml::from_str(
            r#"
analyzer:
  result:
    packages:
      - package:
          id: "Maven:org.example:lib:1.0"
    issues:
      "Maven:org.example:lib:1.0":
        - timestamp: "2023-05-02T10:11:12Z"
          source: "Maven"
          message: "Could not resolve POM"
          severity: "ERROR"
"#,
        )
        .unwrap();
        let artifacts = resolve_result(&result, "r.yml", &AnalyzerOptions::default()).unwrap();
        assert_eq!(artifacts.len(), 1);
    }
}

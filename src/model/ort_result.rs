//! ORT result file: analyzer packages, scanner findings, repository excludes.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::package::{Identifier, Package};
use crate::error::{BridgeError, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrtResult {
    #[serde(default)]
    pub repository: Repository,
    #[serde(default)]
    pub analyzer: Option<AnalyzerRun>,
    #[serde(default)]
    pub scanner: Option<ScannerRun>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Repository {
    #[serde(default)]
    pub config: RepositoryConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepositoryConfig {
    #[serde(default)]
    pub excludes: Excludes,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Excludes {
    #[serde(default)]
    pub paths: Vec<PathExclude>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathExclude {
    pub pattern: String,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalyzerRun {
    #[serde(default)]
    pub config: AnalyzerSettings,
    #[serde(default)]
    pub result: AnalyzerResult,
}

/// Analyzer options recorded in the result file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzerSettings {
    #[serde(default)]
    pub ignore_tool_versions: bool,
    #[serde(default)]
    pub allow_dynamic_versions: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalyzerResult {
    #[serde(default)]
    pub packages: Vec<CuratedPackage>,
    #[serde(default)]
    pub issues: BTreeMap<Identifier, Vec<OrtIssue>>,
}

/// A problem the analyzer ran into for one package.
///
/// ORT writes issues as objects; a bare string is accepted as the message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "IssueRecord")]
pub struct OrtIssue {
    pub timestamp: String,
    pub source: String,
    pub message: String,
    pub severity: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IssueRecord {
    Message(String),
    Full {
        #[serde(default)]
        timestamp: String,
        #[serde(default)]
        source: String,
        message: String,
        #[serde(default)]
        severity: String,
    },
}

impl From<IssueRecord> for OrtIssue {
    fn from(record: IssueRecord) -> Self {
        match record {
            IssueRecord::Message(message) => Self {
                message,
                ..Default::default()
            },
            IssueRecord::Full {
                timestamp,
                source,
                message,
                severity,
            } => Self {
                timestamp,
                source,
                message,
                severity,
            },
        }
    }
}

impl std::fmt::Display for OrtIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.severity.is_empty(), self.source.is_empty()) {
            (true, true) => write!(f, "{}", self.message),
            (true, false) => write!(f, "{}: {}", self.source, self.message),
            (false, true) => write!(f, "[{}] {}", self.severity, self.message),
            (false, false) => write!(f, "[{}] {}: {}", self.severity, self.source, self.message),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CuratedPackage {
    pub package: Package,
    #[serde(default)]
    pub curations: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScannerRun {
    #[serde(default)]
    pub results: ScanRecord,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanRecord {
    #[serde(default)]
    pub scan_results: Vec<ScanResultContainer>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResultContainer {
    pub id: Identifier,
    #[serde(default)]
    pub results: Vec<ScanResult>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanResult {
    #[serde(default)]
    pub summary: ScanSummary,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanSummary {
    #[serde(default)]
    pub license_findings: Vec<LicenseFindingRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LicenseFindingRecord {
    pub license: String,
    #[serde(default)]
    pub location: Option<TextLocation>,
    #[serde(default)]
    pub copyrights: Vec<CopyrightFinding>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextLocation {
    pub path: String,
    #[serde(default)]
    pub start_line: usize,
    #[serde(default)]
    pub end_line: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CopyrightFinding {
    pub statement: String,
}

/// A license found in a package's files with the copyrights next to it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LicenseFinding {
    pub license: String,
    pub copyrights: BTreeSet<String>,
}

/// Immutable mapping from package identifier to its license findings.
///
/// Built once per resolution session; shared read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct LicenseFindingsIndex {
    findings: HashMap<Identifier, BTreeSet<LicenseFinding>>,
}

impl LicenseFindingsIndex {
    pub fn get(&self, id: &Identifier) -> Option<&BTreeSet<LicenseFinding>> {
        self.findings.get(id)
    }

    pub fn len(&self) -> usize {
        self.findings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }
}

impl FromIterator<(Identifier, LicenseFinding)> for LicenseFindingsIndex {
    fn from_iter<T: IntoIterator<Item = (Identifier, LicenseFinding)>>(iter: T) -> Self {
        let mut findings: HashMap<Identifier, BTreeSet<LicenseFinding>> = HashMap::new();
        for (id, finding) in iter {
            findings.entry(id).or_default().insert(finding);
        }
        Self { findings }
    }
}

impl OrtResult {
    /// Load a result file. The format follows the extension: `.json` is
    /// parsed as JSON, everything else as YAML.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        let parsed = if is_json {
            serde_json::from_str(&content).map_err(|e| e.to_string())
        } else {
            serde_yaml::from_str(&content).map_err(|e| e.to_string())
        };
        parsed.map_err(|message| BridgeError::Parse {
            file: path.display().to_string(),
            message,
        })
    }

    /// All analyzed packages, first occurrence of each identifier wins.
    pub fn packages(&self) -> Vec<&Package> {
        let mut seen = BTreeSet::new();
        self.analyzer
            .iter()
            .flat_map(|a| a.result.packages.iter())
            .map(|cp| &cp.package)
            .filter(|p| seen.insert(&p.id))
            .collect()
    }

    /// Collect license findings per package identifier.
    ///
    /// With `omit_excluded`, findings located in a path matching one of the
    /// repository's path excludes are dropped.
    pub fn collect_license_findings(&self, omit_excluded: bool) -> LicenseFindingsIndex {
        let excludes: Vec<glob::Pattern> = if omit_excluded {
            self.repository
                .config
                .excludes
                .paths
                .iter()
                .filter_map(|e| match glob::Pattern::new(&e.pattern) {
                    Ok(p) => Some(p),
                    Err(err) => {
                        tracing::warn!(pattern = %e.pattern, error = %err, "invalid path exclude, ignoring");
                        None
                    }
                })
                .collect()
        } else {
            Vec::new()
        };

        let is_excluded = |record: &LicenseFindingRecord| {
            record
                .location
                .as_ref()
                .is_some_and(|loc| excludes.iter().any(|p| p.matches(&loc.path)))
        };

        self.scanner
            .iter()
            .flat_map(|s| s.results.scan_results.iter())
            .flat_map(|container| {
                container
                    .results
                    .iter()
                    .flat_map(|r| r.summary.license_findings.iter())
                    .map(move |record| (&container.id, record))
            })
            .filter(|&(_, record)| !is_excluded(record))
            .map(|(id, record)| {
                (
                    id.clone(),
                    LicenseFinding {
                        license: record.license.clone(),
                        copyrights: record
                            .copyrights
                            .iter()
                            .map(|c| c.statement.clone())
                            .collect(),
                    },
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESULT: &str = r#"
repository:
  config:
    excludes:
      paths:
        - pattern: "test/**"
          reason: TEST_OF
analyzer:
  config:
    allow_dynamic_versions: true
  result:
    packages:
      - package:
          id: "NPM::abbrev:1.0.9"
          declared_licenses: ["ISC"]
      - package:
          id: "NPM::abbrev:1.0.9"
scanner:
  results:
    scan_results:
      - id: "NPM::abbrev:1.0.9"
        results:
          - summary:
              license_findings:
                - license: ISC
                  location: { path: LICENSE, start_line: 1, end_line: 15 }
                  copyrights:
                    - statement: "Copyright (c) Isaac Z. Schlueter"
                - license: GPL-3.0-only
                  location: { path: test/fixture.js, start_line: 1, end_line: 2 }
"#;

    fn parsed() -> OrtResult {
        serde_yaml::from_str(RESULT).unwrap()
    }

    #[test]
    fn packages_are_deduplicated() {
        let result = parsed();
        assert_eq!(result.packages().len(), 1);
        assert!(result.analyzer.unwrap().config.allow_dynamic_versions);
    }

    #[test]
    fn excluded_findings_are_omitted() {
        let result = parsed();
        let id: Identifier = "NPM::abbrev:1.0.9".parse().unwrap();

        let all = result.collect_license_findings(false);
        assert_eq!(all.get(&id).unwrap().len(), 2);

        let filtered = result.collect_license_findings(true);
        let findings = filtered.get(&id).unwrap();
        assert_eq!(findings.len(), 1);
        let finding = findings.iter().next().unwrap();
        assert_eq!(finding.license, "ISC");
        assert!(finding
            .copyrights
            .contains("Copyright (c) Isaac Z. Schlueter"));
    }

    #[test]
    fn missing_sections_parse() {
        let result: OrtResult = serde_yaml::from_str("repository: {}\n").unwrap();
        assert!(result.analyzer.is_none());
        assert!(result.packages().is_empty());
        assert!(result.collect_license_findings(true).is_empty());
    }

    #[test]
    fn issues_accept_objects_and_strings() {
        let result: OrtResult = serde_yaml::from_str(
            r#"
analyzer:
  result:
    issues:
      "Maven:org.example:lib:1.0":
        - timestamp: "2023-05-02T10:11:12Z"
          source: "Maven"
          message: "Could not resolve POM"
          severity: "ERROR"
        - "plain message"
"#,
        )
        .unwrap();
        let id: Identifier = "Maven:org.example:lib:1.0".parse().unwrap();
        let issues = &result.analyzer.unwrap().result.issues[&id];
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].message, "Could not resolve POM");
        assert_eq!(issues[0].to_string(), "[ERROR] Maven: Could not resolve POM");
        assert_eq!(issues[1].message, "plain message");
        assert_eq!(issues[1].to_string(), "plain message");
    }
}

//! Pipeline-side artifact: an identity plus a bag of typed facts.
//!
//! Facts are a closed set of variants keyed by [`FactKind`]. An artifact
//! never holds an empty fact: [`Artifact::add_fact`] drops empty values, so
//! absence of a kind always means "nothing known".

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::coordinate::Coordinate;
use super::license::LicenseStatement;
use super::package::VcsInfo;

/// Analysis source recorded on every artifact produced from an ORT result.
pub const ORT_ANALYSIS_SOURCE: &str = "OrtResult";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactKind {
    Coordinate,
    MatchState,
    SourceUrl,
    VcsInfo,
    DeclaredLicense,
    ObservedLicense,
    Copyright,
    Filename,
    Homepage,
    SourceFile,
}

impl std::fmt::Display for FactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Coordinate => write!(f, "coordinate"),
            Self::MatchState => write!(f, "match-state"),
            Self::SourceUrl => write!(f, "source-url"),
            Self::VcsInfo => write!(f, "vcs-info"),
            Self::DeclaredLicense => write!(f, "declared-license"),
            Self::ObservedLicense => write!(f, "observed-license"),
            Self::Copyright => write!(f, "copyright"),
            Self::Filename => write!(f, "filename"),
            Self::Homepage => write!(f, "homepage"),
            Self::SourceFile => write!(f, "source-file"),
        }
    }
}

/// How confidently an artifact was matched to its origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchState {
    Exact,
    Similar,
    Unknown,
}

/// Consolidated copyright statements of an artifact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyrightStatement {
    pub statements: BTreeSet<String>,
}

impl CopyrightStatement {
    pub fn new(statement: impl Into<String>) -> Self {
        let statement = statement.into();
        let mut statements = BTreeSet::new();
        if !statement.trim().is_empty() {
            statements.insert(statement);
        }
        Self { statements }
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Set union: associative, commutative, and empty is the identity.
    pub fn merge_with(mut self, other: CopyrightStatement) -> Self {
        self.statements.extend(other.statements);
        self
    }

    pub fn render(&self) -> String {
        self.statements
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// One known file name of an artifact together with its checksum.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FilenameEntry {
    pub filename: String,
    pub hash: String,
    pub hash_algorithm: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactFilename {
    pub entries: BTreeSet<FilenameEntry>,
}

impl ArtifactFilename {
    pub fn new(
        filename: impl Into<String>,
        hash: impl Into<String>,
        hash_algorithm: impl Into<String>,
    ) -> Self {
        let entry = FilenameEntry {
            filename: filename.into(),
            hash: hash.into(),
            hash_algorithm: hash_algorithm.into(),
        };
        let mut entries = BTreeSet::new();
        if !entry.filename.is_empty() {
            entries.insert(entry);
        }
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The longest known file name, which tends to be the most specific one.
    pub fn best_guess(&self) -> Option<&FilenameEntry> {
        self.entries.iter().max_by_key(|e| e.filename.len())
    }

    pub fn merge_with(mut self, other: ArtifactFilename) -> Self {
        self.entries.extend(other.entries);
        self
    }
}

/// A single typed piece of evidence about an artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Fact {
    Coordinate(Coordinate),
    MatchState(MatchState),
    SourceUrl(String),
    VcsInfo(VcsInfo),
    DeclaredLicense(LicenseStatement),
    ObservedLicense(LicenseStatement),
    Copyright(CopyrightStatement),
    Filename(ArtifactFilename),
    Homepage(String),
    SourceFile(PathBuf),
}

impl Fact {
    pub fn kind(&self) -> FactKind {
        match self {
            Self::Coordinate(_) => FactKind::Coordinate,
            Self::MatchState(_) => FactKind::MatchState,
            Self::SourceUrl(_) => FactKind::SourceUrl,
            Self::VcsInfo(_) => FactKind::VcsInfo,
            Self::DeclaredLicense(_) => FactKind::DeclaredLicense,
            Self::ObservedLicense(_) => FactKind::ObservedLicense,
            Self::Copyright(_) => FactKind::Copyright,
            Self::Filename(_) => FactKind::Filename,
            Self::Homepage(_) => FactKind::Homepage,
            Self::SourceFile(_) => FactKind::SourceFile,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            // Coordinates are always attached, even for degenerate identifiers.
            Self::Coordinate(_) | Self::MatchState(_) => false,
            Self::SourceUrl(url) | Self::Homepage(url) => url.is_empty(),
            Self::VcsInfo(vcs) => vcs.is_empty(),
            Self::DeclaredLicense(l) | Self::ObservedLicense(l) => l.is_empty(),
            Self::Copyright(c) => c.is_empty(),
            Self::Filename(f) => f.is_empty(),
            Self::SourceFile(p) => p.as_os_str().is_empty(),
        }
    }

    /// Combine with a newer fact of the same kind. Set-valued facts union,
    /// scalar facts are replaced by `newer`.
    fn merge_with(self, newer: Fact) -> Fact {
        match (self, newer) {
            (Self::Copyright(a), Self::Copyright(b)) => Self::Copyright(a.merge_with(b)),
            (Self::Filename(a), Self::Filename(b)) => Self::Filename(a.merge_with(b)),
            (Self::DeclaredLicense(a), Self::DeclaredLicense(b)) => {
                Self::DeclaredLicense(a.merge_with(b))
            }
            (Self::ObservedLicense(a), Self::ObservedLicense(b)) => {
                Self::ObservedLicense(a.merge_with(b))
            }
            (_, newer) => newer,
        }
    }
}

/// An artifact of the compliance pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub analysis_source: String,
    facts: BTreeMap<FactKind, Fact>,
}

impl Artifact {
    pub fn new(analysis_source: impl Into<String>) -> Self {
        Self {
            analysis_source: analysis_source.into(),
            facts: BTreeMap::new(),
        }
    }

    /// Attach a fact. Empty facts are ignored; a fact of an already present
    /// kind is merged into the existing one.
    pub fn add_fact(&mut self, fact: Fact) -> &mut Self {
        if fact.is_empty() {
            return self;
        }
        let kind = fact.kind();
        let merged = match self.facts.remove(&kind) {
            Some(existing) => existing.merge_with(fact),
            None => fact,
        };
        self.facts.insert(kind, merged);
        self
    }

    /// Builder-style variant of [`Artifact::add_fact`].
    pub fn with_fact(mut self, fact: Fact) -> Self {
        self.add_fact(fact);
        self
    }

    pub fn ask_for(&self, kind: FactKind) -> Option<&Fact> {
        self.facts.get(&kind)
    }

    pub fn has(&self, kind: FactKind) -> bool {
        self.facts.contains_key(&kind)
    }

    pub fn kinds(&self) -> impl Iterator<Item = FactKind> + '_ {
        self.facts.keys().copied()
    }

    pub fn coordinate(&self) -> Option<&Coordinate> {
        match self.ask_for(FactKind::Coordinate) {
            Some(Fact::Coordinate(c)) => Some(c),
            _ => None,
        }
    }

    pub fn match_state(&self) -> Option<MatchState> {
        match self.ask_for(FactKind::MatchState) {
            Some(Fact::MatchState(m)) => Some(*m),
            _ => None,
        }
    }

    pub fn source_url(&self) -> Option<&str> {
        match self.ask_for(FactKind::SourceUrl) {
            Some(Fact::SourceUrl(url)) => Some(url),
            _ => None,
        }
    }

    pub fn vcs_info(&self) -> Option<&VcsInfo> {
        match self.ask_for(FactKind::VcsInfo) {
            Some(Fact::VcsInfo(vcs)) => Some(vcs),
            _ => None,
        }
    }

    pub fn declared_license(&self) -> Option<&LicenseStatement> {
        match self.ask_for(FactKind::DeclaredLicense) {
            Some(Fact::DeclaredLicense(l)) => Some(l),
            _ => None,
        }
    }

    pub fn observed_license(&self) -> Option<&LicenseStatement> {
        match self.ask_for(FactKind::ObservedLicense) {
            Some(Fact::ObservedLicense(l)) => Some(l),
            _ => None,
        }
    }

    pub fn copyright(&self) -> Option<&CopyrightStatement> {
        match self.ask_for(FactKind::Copyright) {
            Some(Fact::Copyright(c)) => Some(c),
            _ => None,
        }
    }

    pub fn filename(&self) -> Option<&ArtifactFilename> {
        match self.ask_for(FactKind::Filename) {
            Some(Fact::Filename(f)) => Some(f),
            _ => None,
        }
    }

    pub fn homepage(&self) -> Option<&str> {
        match self.ask_for(FactKind::Homepage) {
            Some(Fact::Homepage(url)) => Some(url),
            _ => None,
        }
    }

    pub fn source_file(&self) -> Option<&Path> {
        match self.ask_for(FactKind::SourceFile) {
            Some(Fact::SourceFile(p)) => Some(p),
            _ => None,
        }
    }

    /// Name used in diagnostics: canonical coordinate, else the best file
    /// name guess, else `unknown`.
    pub fn display_name(&self) -> String {
        if let Some(c) = self.coordinate() {
            return c.canonical();
        }
        self.filename()
            .and_then(|f| f.best_guess())
            .map(|e| e.filename.clone())
            .unwrap_or_else(|| "unknown".into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::coordinate::CoordinateType;
    use crate::model::license::normalize;

    #[test]
    fn empty_facts_are_not_attached() {
        let mut a = Artifact::new(ORT_ANALYSIS_SOURCE);
        a.add_fact(Fact::SourceUrl(String::new()))
            .add_fact(Fact::Homepage(String::new()))
            .add_fact(Fact::VcsInfo(VcsInfo::default()))
            .add_fact(Fact::Copyright(CopyrightStatement::default()))
            .add_fact(Fact::DeclaredLicense(normalize(Vec::<String>::new())));
        assert_eq!(a.kinds().count(), 0);
    }

    #[test]
    fn copyright_facts_merge() {
        let a = Artifact::new(ORT_ANALYSIS_SOURCE)
            .with_fact(Fact::Copyright(CopyrightStatement::new("(c) B")))
            .with_fact(Fact::Copyright(CopyrightStatement::new("(c) A")));
        assert_eq!(a.copyright().unwrap().render(), "(c) A\n(c) B");
    }

    #[test]
    fn scalar_facts_are_replaced() {
        let a = Artifact::new(ORT_ANALYSIS_SOURCE)
            .with_fact(Fact::Homepage("https://old".into()))
            .with_fact(Fact::Homepage("https://new".into()));
        assert_eq!(a.homepage(), Some("https://new"));
    }

    #[test]
    fn copyright_merge_is_order_independent() {
        let x = CopyrightStatement::new("x");
        let y = CopyrightStatement::new("y");
        let z = CopyrightStatement::new("z");
        let left = x.clone().merge_with(y.clone()).merge_with(z.clone());
        let right = z.merge_with(x.merge_with(y));
        assert_eq!(left, right);
    }

    #[test]
    fn display_name_fallbacks() {
        let unknown = Artifact::new(ORT_ANALYSIS_SOURCE);
        assert_eq!(unknown.display_name(), "unknown");

        let by_file = Artifact::new(ORT_ANALYSIS_SOURCE)
            .with_fact(Fact::Filename(ArtifactFilename::new("a.jar", "", "")))
            .with_fact(Fact::Filename(ArtifactFilename::new("lib-1.0.jar", "", "")));
        assert_eq!(by_file.display_name(), "lib-1.0.jar");

        let by_coordinate = by_file.with_fact(Fact::Coordinate(Coordinate::new(
            CoordinateType::Npm,
            None,
            "abbrev",
            "1.0.9",
        )));
        assert_eq!(by_coordinate.display_name(), "pkg:npm/abbrev@1.0.9");
    }
}

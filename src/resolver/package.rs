use crate::model::license::normalize;
use crate::model::{
    Artifact, ArtifactFilename, CopyrightStatement, Fact, LicenseFindingsIndex, MatchState,
    OrtResult, Package, ORT_ANALYSIS_SOURCE,
};

use super::coordinate::map_coordinate;

/// Builds pipeline artifacts from ORT packages.
///
/// The license findings index is computed once at construction; every
/// [`PackageFactResolver::resolve`] call is a pure lookup against it, so a
/// single resolver can be shared across threads.
#[derive(Debug, Clone, Default)]
pub struct PackageFactResolver {
    findings: LicenseFindingsIndex,
}

impl PackageFactResolver {
    /// Index the scanner findings of `result`. Findings in excluded paths
    /// are dropped unless `keep_excluded` is set.
    pub fn new(result: &OrtResult, keep_excluded: bool) -> Self {
        Self::with_index(result.collect_license_findings(!keep_excluded))
    }

    pub fn with_index(findings: LicenseFindingsIndex) -> Self {
        Self { findings }
    }

    pub fn index(&self) -> &LicenseFindingsIndex {
        &self.findings
    }

    pub fn resolve(&self, pkg: &Package) -> Artifact {
        let mut artifact = Artifact::new(ORT_ANALYSIS_SOURCE);
        artifact
            .add_fact(Fact::MatchState(MatchState::Exact))
            .add_fact(Fact::Coordinate(map_coordinate(&pkg.id)));

        for fact in [
            map_source_url(pkg),
            map_vcs_info(pkg),
            map_declared_license(pkg),
            map_filename(pkg),
            map_homepage(pkg),
            self.map_observed_license(pkg),
            self.map_copyrights(pkg),
        ]
        .into_iter()
        .flatten()
        {
            artifact.add_fact(fact);
        }

        artifact
    }

    fn map_observed_license(&self, pkg: &Package) -> Option<Fact> {
        let findings = self.findings.get(&pkg.id)?;
        let licenses = normalize(findings.iter().map(|f| f.license.as_str()));
        (!licenses.is_empty()).then_some(Fact::ObservedLicense(licenses))
    }

    fn map_copyrights(&self, pkg: &Package) -> Option<Fact> {
        let merged = self
            .findings
            .get(&pkg.id)?
            .iter()
            .flat_map(|f| f.copyrights.iter())
            .map(CopyrightStatement::new)
            .reduce(CopyrightStatement::merge_with)?;
        (!merged.is_empty()).then_some(Fact::Copyright(merged))
    }
}

// Only the source archive URL counts: the pipeline has no notion of VCS clone
// URLs as source locations.
fn map_source_url(pkg: &Package) -> Option<Fact> {
    let url = &pkg.source_artifact.url;
    (!url.is_empty()).then(|| Fact::SourceUrl(url.clone()))
}

fn map_vcs_info(pkg: &Package) -> Option<Fact> {
    let vcs = pkg.effective_vcs();
    (!vcs.is_empty()).then(|| Fact::VcsInfo(vcs.clone()))
}

fn map_declared_license(pkg: &Package) -> Option<Fact> {
    if pkg.declared_licenses.is_empty() {
        return None;
    }
    let licenses = normalize(&pkg.declared_licenses);
    (!licenses.is_empty()).then_some(Fact::DeclaredLicense(licenses))
}

// Filenames refer to binary artifacts only.
fn map_filename(pkg: &Package) -> Option<Fact> {
    let binary = &pkg.binary_artifact;
    if binary.url.is_empty() {
        return None;
    }
    Some(Fact::Filename(ArtifactFilename::new(
        file_name_of(&binary.url),
        &binary.hash.value,
        &binary.hash.algorithm,
    )))
}

fn map_homepage(pkg: &Package) -> Option<Fact> {
    let url = &pkg.homepage_url;
    (!url.is_empty()).then(|| Fact::Homepage(url.clone()))
}

/// Last path segment of a URL, or of a plain path when it doesn't parse.
pub(crate) fn file_name_of(location: &str) -> String {
    if let Ok(parsed) = url::Url::parse(location) {
        if let Some(last) = parsed
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|s| !s.is_empty())
        {
            return last.to_string();
        }
    }
    location
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(location)
        .to_string()
}

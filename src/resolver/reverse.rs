use crate::model::{Artifact, CoordinateType, Hash, Identifier, Package, RemoteArtifact};

/// Package type keys understood by the downloader.
pub const MAVEN_TYPE: &str = "Maven";
pub const NPM_TYPE: &str = "NPM";
pub const NUGET_TYPE: &str = "nuget";
pub const UNMANAGED_TYPE: &str = "Unmanaged";

/// Reconstruct the parts of a package the downloader needs.
///
/// Intentionally lossy: binary artifact, declared licenses, description and
/// homepage are always left empty. Never use the result as pipeline output.
pub fn artifact_to_package(artifact: &Artifact) -> Package {
    let id = artifact
        .coordinate()
        .map(|c| {
            let kind = match c.kind {
                CoordinateType::Maven => MAVEN_TYPE,
                CoordinateType::Npm => NPM_TYPE,
                CoordinateType::NuGet => NUGET_TYPE,
                _ => UNMANAGED_TYPE,
            };
            Identifier::new(
                kind,
                c.namespace.clone().unwrap_or_default(),
                &c.name,
                &c.version,
            )
        })
        .unwrap_or_default();

    let vcs = artifact.vcs_info().cloned().unwrap_or_default();

    let source_artifact = artifact
        .source_url()
        .map(|url| RemoteArtifact {
            url: url.to_string(),
            hash: Hash::default(),
        })
        .unwrap_or_default();

    Package {
        id,
        source_artifact,
        vcs_processed: vcs.clone(),
        vcs,
        ..Default::default()
    }
}

//! Data model shared by the resolver and the enrichment step.
//!
//! The ORT side (`package`, `ort_result`) is a read-only snapshot of what the
//! external analyzer reported. The pipeline side (`artifact`) is a fact bag
//! that grows monotonically as later stages learn more.

pub mod artifact;
pub mod coordinate;
pub mod license;
pub mod ort_result;
pub mod package;

pub use artifact::{
    Artifact, ArtifactFilename, CopyrightStatement, Fact, FactKind, FilenameEntry, MatchState,
    ORT_ANALYSIS_SOURCE,
};
pub use coordinate::{Coordinate, CoordinateType};
pub use license::LicenseStatement;
pub use ort_result::{LicenseFinding, LicenseFindingsIndex, OrtIssue, OrtResult};
pub use package::{Hash, Identifier, Package, RemoteArtifact, VcsInfo};

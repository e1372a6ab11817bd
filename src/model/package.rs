use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// ORT package identifier, `Type:namespace:name:version` in string form.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identifier {
    pub kind: String,
    pub namespace: String,
    pub name: String,
    pub version: String,
}

impl Identifier {
    pub fn new(
        kind: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind.into(),
            namespace: namespace.into(),
            name: name.into(),
            version: version.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.kind.is_empty()
            && self.namespace.is_empty()
            && self.name.is_empty()
            && self.version.is_empty()
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.kind, self.namespace, self.name, self.version
        )
    }
}

impl FromStr for Identifier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Versions may contain colons (e.g. epochs), so only split three times.
        let mut parts = s.splitn(4, ':');
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(kind), Some(namespace), Some(name), Some(version)) => {
                Ok(Self::new(kind, namespace, name, version))
            }
            _ => Err(format!(
                "invalid identifier '{s}', expected 'Type:namespace:name:version'"
            )),
        }
    }
}

impl TryFrom<String> for Identifier {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Identifier> for String {
    fn from(id: Identifier) -> Self {
        id.to_string()
    }
}

/// Hash of a remote artifact. An empty value means "unknown".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hash {
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub algorithm: String,
}

/// A downloadable file (binary or source archive) referenced by a package.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteArtifact {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub hash: Hash,
}

impl RemoteArtifact {
    pub fn is_empty(&self) -> bool {
        self.url.is_empty()
    }
}

/// Version control pointer of a package.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VcsInfo {
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub revision: String,
    #[serde(default)]
    pub path: String,
}

impl VcsInfo {
    /// True when none of type, URL and revision is known.
    pub fn is_empty(&self) -> bool {
        self.kind.is_empty() && self.url.is_empty() && self.revision.is_empty()
    }
}

/// Package metadata as reported by the ORT analyzer. Read-only snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    pub id: Identifier,
    #[serde(default)]
    pub declared_licenses: BTreeSet<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub homepage_url: String,
    #[serde(default)]
    pub binary_artifact: RemoteArtifact,
    #[serde(default)]
    pub source_artifact: RemoteArtifact,
    #[serde(default)]
    pub vcs: VcsInfo,
    #[serde(default)]
    pub vcs_processed: VcsInfo,
}

impl Package {
    /// The effective VCS pointer: the processed one when known, else the raw one.
    pub fn effective_vcs(&self) -> &VcsInfo {
        if self.vcs_processed.is_empty() {
            &self.vcs
        } else {
            &self.vcs_processed
        }
    }
}

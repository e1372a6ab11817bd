use serde::{Deserialize, Serialize};

/// Ecosystem of a normalized coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoordinateType {
    Maven,
    Npm,
    NuGet,
    Pypi,
    Gem,
    Cargo,
    Golang,
    Composer,
    Cocoapods,
    Generic,
}

impl CoordinateType {
    /// Package-URL type segment.
    pub fn purl_type(&self) -> &'static str {
        match self {
            Self::Maven => "maven",
            Self::Npm => "npm",
            Self::NuGet => "nuget",
            Self::Pypi => "pypi",
            Self::Gem => "gem",
            Self::Cargo => "cargo",
            Self::Golang => "golang",
            Self::Composer => "composer",
            Self::Cocoapods => "cocoapods",
            Self::Generic => "generic",
        }
    }
}

impl std::fmt::Display for CoordinateType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Maven => write!(f, "Maven"),
            Self::Npm => write!(f, "npm"),
            Self::NuGet => write!(f, "NuGet"),
            Self::Pypi => write!(f, "PyPI"),
            Self::Gem => write!(f, "RubyGems"),
            Self::Cargo => write!(f, "Cargo"),
            Self::Golang => write!(f, "Go"),
            Self::Composer => write!(f, "Composer"),
            Self::Cocoapods => write!(f, "CocoaPods"),
            Self::Generic => write!(f, "Generic"),
        }
    }
}

/// Normalized, ecosystem-typed package identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coordinate {
    #[serde(rename = "type")]
    pub kind: CoordinateType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub name: String,
    pub version: String,
}

impl Coordinate {
    pub fn new(
        kind: CoordinateType,
        namespace: Option<String>,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            namespace: namespace.filter(|ns| !ns.is_empty()),
            name: name.into(),
            version: version.into(),
        }
    }

    pub fn generic(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self::new(CoordinateType::Generic, None, name, version)
    }

    /// Canonical package-URL style rendering, e.g. `pkg:maven/org.example/lib@1.0`.
    pub fn canonical(&self) -> String {
        match &self.namespace {
            Some(ns) => format!(
                "pkg:{}/{}/{}@{}",
                self.kind.purl_type(),
                ns,
                self.name,
                self.version
            ),
            None => format!("pkg:{}/{}@{}", self.kind.purl_type(), self.name, self.version),
        }
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.canonical())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_with_namespace() {
        let c = Coordinate::new(
            CoordinateType::Maven,
            Some("org.example".into()),
            "lib",
            "1.0",
        );
        assert_eq!(c.canonical(), "pkg:maven/org.example/lib@1.0");
    }

    #[test]
    fn empty_namespace_is_dropped() {
        let c = Coordinate::new(CoordinateType::Npm, Some(String::new()), "abbrev", "1.0.9");
        assert_eq!(c.namespace, None);
        assert_eq!(c.canonical(), "pkg:npm/abbrev@1.0.9");
    }
}

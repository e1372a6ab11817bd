use crate::model::{Coordinate, CoordinateType, Identifier};

/// Map an ORT package identifier onto a normalized coordinate.
///
/// Total: unknown ecosystem types degrade to a generic name/version
/// coordinate instead of failing.
pub fn map_coordinate(id: &Identifier) -> Coordinate {
    let namespace = Some(id.namespace.clone());
    match id.kind.to_lowercase().as_str() {
        "maven" => Coordinate::new(CoordinateType::Maven, namespace, &id.name, &id.version),
        "npm" => Coordinate::new(CoordinateType::Npm, namespace, &id.name, &id.version),
        "nuget" | "dotnet" => Coordinate::new(CoordinateType::NuGet, None, &id.name, &id.version),
        "pypi" | "pip" => Coordinate::new(CoordinateType::Pypi, namespace, &id.name, &id.version),
        "gem" | "bundler" => Coordinate::new(CoordinateType::Gem, namespace, &id.name, &id.version),
        "cargo" | "crate" => {
            Coordinate::new(CoordinateType::Cargo, namespace, &id.name, &id.version)
        }
        "go" | "golang" | "gomod" => {
            Coordinate::new(CoordinateType::Golang, namespace, &id.name, &id.version)
        }
        "composer" => Coordinate::new(CoordinateType::Composer, namespace, &id.name, &id.version),
        "cocoapods" | "pod" => {
            Coordinate::new(CoordinateType::Cocoapods, namespace, &id.name, &id.version)
        }
        _ => Coordinate::generic(&id.name, &id.version),
    }
}

use crate::enrich::EnrichmentSummary;
use crate::model::Artifact;

/// Render artifacts as a plain listing, one block per artifact.
pub fn render(artifacts: &[Artifact], enrichment: Option<&EnrichmentSummary>) -> String {
    let mut output = String::new();

    if artifacts.is_empty() {
        output.push_str("\n  No artifacts resolved.\n\n");
    } else {
        output.push_str(&format!("\n  {} artifact(s) resolved:\n\n", artifacts.len()));
    }

    let mut sorted: Vec<&Artifact> = artifacts.iter().collect();
    sorted.sort_by_key(|a| a.display_name());

    for artifact in sorted {
        output.push_str(&format!("  {}\n", artifact.display_name()));
        let kinds: Vec<String> = artifact.kinds().map(|k| k.to_string()).collect();
        output.push_str(&format!("      facts:    {}\n", kinds.join(", ")));
        if let Some(license) = artifact.declared_license() {
            output.push_str(&format!("      declared: {}\n", license.evaluate()));
        }
        if let Some(license) = artifact.observed_license() {
            output.push_str(&format!("      observed: {}\n", license.evaluate()));
        }
        if let Some(vcs) = artifact.vcs_info() {
            if vcs.revision.is_empty() {
                output.push_str(&format!("      vcs:      {}\n", vcs.url));
            } else {
                output.push_str(&format!("      vcs:      {}@{}\n", vcs.url, vcs.revision));
            }
        }
        if let Some(url) = artifact.source_url() {
            output.push_str(&format!("      sources:  {}\n", url));
        }
        if let Some(path) = artifact.source_file() {
            output.push_str(&format!("      archive:  {}\n", path.display()));
        }
        output.push('\n');
    }

    if let Some(summary) = enrichment {
        output.push_str(&format!(
            "  Sources: {} archived, {} empty, {} failed, {} already present\n",
            summary.enriched.len(),
            summary.empty.len(),
            summary.failures.len(),
            summary.skipped,
        ));
        for failure in &summary.failures {
            output.push_str(&format!("      {}: {}\n", failure.name, failure.reason));
        }
        output.push('\n');
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrich::EnrichmentFailure;
    use crate::model::license::normalize;
    use crate::model::{Coordinate, CoordinateType, Fact, ORT_ANALYSIS_SOURCE};

    #[test]
    fn lists_artifacts_and_failures() {
        let artifact = Artifact::new(ORT_ANALYSIS_SOURCE)
            .with_fact(Fact::Coordinate(Coordinate::new(
                CoordinateType::Npm,
                None,
                "abbrev",
                "1.0.9",
            )))
            .with_fact(Fact::DeclaredLicense(normalize(["ISC"])));
        let summary = EnrichmentSummary {
            failures: vec![EnrichmentFailure {
                name: "pkg:npm/abbrev@1.0.9".into(),
                reason: "download timed out after 1s".into(),
            }],
            ..Default::default()
        };

        let text = render(&[artifact], Some(&summary));
        assert!(text.contains("1 artifact(s) resolved"));
        assert!(text.contains("pkg:npm/abbrev@1.0.9"));
        assert!(text.contains("declared: ISC"));
        assert!(text.contains("facts:    coordinate, declared-license\n"));
        assert!(text.contains("1 failed"));
        assert!(text.contains("timed out"));
    }

    #[test]
    fn empty_listing() {
        assert!(render(&[], None).contains("No artifacts resolved"));
    }
}

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::enrich::EnrichmentSummary;
use crate::error::Result;
use crate::model::Artifact;

#[derive(Serialize)]
struct JsonReport<'a> {
    run_id: String,
    generated_at: DateTime<Utc>,
    artifacts: &'a [Artifact],
    #[serde(skip_serializing_if = "Option::is_none")]
    enrichment: Option<&'a EnrichmentSummary>,
}

/// Render artifacts as a JSON report.
pub fn render(artifacts: &[Artifact], enrichment: Option<&EnrichmentSummary>) -> Result<String> {
    let report = JsonReport {
        run_id: uuid::Uuid::new_v4().to_string(),
        generated_at: Utc::now(),
        artifacts,
        enrichment,
    };
    let json = serde_json::to_string_pretty(&report)?;
    Ok(json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Coordinate, CoordinateType, Fact, ORT_ANALYSIS_SOURCE};

    #[test]
    fn report_shape() {
        let artifact = Artifact::new(ORT_ANALYSIS_SOURCE).with_fact(Fact::Coordinate(
            Coordinate::new(CoordinateType::Maven, Some("org.example".into()), "lib", "1.0"),
        ));
        let json = render(&[artifact], None).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert!(value["run_id"].as_str().is_some_and(|s| s.len() == 36));
        assert!(value["generated_at"].is_string());
        assert!(value.get("enrichment").is_none());
        assert_eq!(value["artifacts"][0]["analysis_source"], "OrtResult");
        assert_eq!(
            value["artifacts"][0]["facts"]["coordinate"]["value"]["name"],
            "lib"
        );
    }

    #[test]
    fn artifacts_survive_a_round_trip() {
        let artifact = Artifact::new(ORT_ANALYSIS_SOURCE)
            .with_fact(Fact::Homepage("https://example.com".into()));
        let json = render(std::slice::from_ref(&artifact), Some(&EnrichmentSummary::default())).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let back: Vec<Artifact> = serde_json::from_value(value["artifacts"].clone()).unwrap();
        assert_eq!(back, vec![artifact]);
        assert_eq!(value["enrichment"]["skipped"], 0);
    }
}

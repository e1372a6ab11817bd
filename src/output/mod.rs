pub mod console;
pub mod json;

use serde::{Deserialize, Serialize};

use crate::enrich::EnrichmentSummary;
use crate::error::Result;
use crate::model::Artifact;

/// Output format selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Console,
    Json,
}

impl OutputFormat {
    pub fn from_str_lenient(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "console" | "text" => Some(Self::Console),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Render resolved artifacts, and the enrichment outcome if there was one.
pub fn render(
    artifacts: &[Artifact],
    enrichment: Option<&EnrichmentSummary>,
    format: OutputFormat,
) -> Result<String> {
    match format {
        OutputFormat::Console => Ok(console::render(artifacts, enrichment)),
        OutputFormat::Json => json::render(artifacts, enrichment),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lenient_format_names() {
        assert_eq!(OutputFormat::from_str_lenient("JSON"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::from_str_lenient("text"), Some(OutputFormat::Console));
        assert_eq!(OutputFormat::from_str_lenient("sarif"), None);
    }
}

//! ortbridge: turns ORT analyzer results into compliance pipeline artifacts.
//!
//! Reads an ORT result file (or runs the ORT analyzer), maps every analyzed
//! package to an [`Artifact`] carrying coordinate, license, copyright, VCS
//! and file name facts, and optionally downloads and archives the sources
//! of each artifact.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::path::Path;
//! use ortbridge::config::Config;
//! use ortbridge::output::OutputFormat;
//!
//! let config = Config::default();
//! let report = ortbridge::resolve_file(Path::new("analyzer-result.yml"), &config).unwrap();
//! println!("{}", ortbridge::render_report(&report, OutputFormat::Console).unwrap());
//! ```

pub mod analyzer;
pub mod config;
pub mod enrich;
pub mod error;
pub mod model;
pub mod output;
pub mod resolver;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use config::Config;
use enrich::{Downloader, EnrichmentSummary, SourceEnricher};
use error::Result;
use model::{Artifact, OrtResult};
use output::OutputFormat;

/// Artifacts resolved from one ORT result, plus the enrichment outcome once
/// sources have been downloaded.
#[derive(Debug, Clone)]
pub struct ResolveReport {
    pub source: PathBuf,
    pub artifacts: Vec<Artifact>,
    pub enrichment: Option<EnrichmentSummary>,
}

/// Load an ORT result file and resolve its analyzed packages.
pub fn resolve_file(path: &Path, config: &Config) -> Result<ResolveReport> {
    let result = OrtResult::load(path)?;
    let source = path.display().to_string();
    let artifacts = resolver::resolve_result(&result, &source, &config.analyzer)?;
    Ok(ResolveReport {
        source: path.to_path_buf(),
        artifacts,
        enrichment: None,
    })
}

/// Run the ORT analyzer on `project_dir`, then resolve the result it wrote
/// to `output_dir`.
pub fn analyze_project(
    project_dir: &Path,
    output_dir: &Path,
    config: &Config,
) -> Result<ResolveReport> {
    let result_path =
        analyzer::AnalyzerInvocation::new(project_dir, output_dir, config.analyzer).run()?;
    resolve_file(&result_path, config)
}

/// Download sources for every artifact of `report` that has none yet.
///
/// Only an unusable output directory is an error; individual download
/// failures end up in [`ResolveReport::enrichment`].
pub fn enrich(
    report: &mut ResolveReport,
    downloader: Arc<dyn Downloader>,
    config: &Config,
) -> Result<()> {
    let enricher = SourceEnricher::new(downloader, &config.downloader)?;
    let summary = enricher.process(&mut report.artifacts);
    report.enrichment = Some(summary);
    Ok(())
}

/// Render a report in the specified format.
pub fn render_report(report: &ResolveReport, format: OutputFormat) -> Result<String> {
    output::render(&report.artifacts, report.enrichment.as_ref(), format)
}

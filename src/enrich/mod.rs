//! Source enrichment: download, archive and attach sources to artifacts.
//!
//! Downloads run on a bounded worker pool. Each download additionally runs
//! on its own thread so a hung network call is abandoned after the
//! configured timeout. A worker does not take its next job until an
//! abandoned download has actually returned, so at most `jobs` downloads
//! are ever in flight. Results are applied to the artifacts on the calling
//! thread, so the artifact collection is never shared between workers.

pub mod archive;
pub mod cancel;
pub mod downloader;
pub mod remediate;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::RecvTimeoutError;
use serde::Serialize;
use tempfile::TempDir;
use tracing::{debug, info, warn};

use crate::config::DownloaderOptions;
use crate::error::{BridgeError, DownloadError, Result};
use crate::model::{Artifact, Fact, FactKind, Package};
use crate::resolver::artifact_to_package;

pub use archive::{encode_or_unknown, StoredArchive};
pub use cancel::CancelFlag;
pub use downloader::{DownloadResult, DownloadSource, Downloader, VcsDownloader};
pub use remediate::remediate_vcs_url;

/// An artifact that received a source archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnrichedArtifact {
    pub name: String,
    pub archive: PathBuf,
    pub sha256: String,
}

/// An artifact whose sources could not be obtained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnrichmentFailure {
    pub name: String,
    pub reason: String,
}

/// Outcome of one [`SourceEnricher::process`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EnrichmentSummary {
    /// Artifacts that already had a source file.
    pub skipped: usize,
    pub enriched: Vec<EnrichedArtifact>,
    /// Downloads that succeeded but produced no files.
    pub empty: Vec<String>,
    pub failures: Vec<EnrichmentFailure>,
}

struct Job {
    index: usize,
    name: String,
    package: Package,
}

type Outcome = std::result::Result<Option<StoredArchive>, DownloadError>;

type Download = std::result::Result<(TempDir, DownloadResult), DownloadError>;

/// A download thread still running after its timeout.
type Straggler = thread::JoinHandle<()>;

/// Attaches source archives to artifacts that lack them.
pub struct SourceEnricher {
    downloader: Arc<dyn Downloader>,
    output_dir: PathBuf,
    jobs: usize,
    timeout: Duration,
}

impl SourceEnricher {
    /// Create an enricher writing archives to `options.output_dir`.
    ///
    /// The output directory is created up front; failing to create it is
    /// the only fatal error of the enrichment stage.
    pub fn new(downloader: Arc<dyn Downloader>, options: &DownloaderOptions) -> Result<Self> {
        options.validate()?;
        std::fs::create_dir_all(&options.output_dir).map_err(|source| {
            BridgeError::OutputDirectory {
                path: options.output_dir.clone(),
                source,
            }
        })?;
        Ok(Self {
            downloader,
            output_dir: options.output_dir.clone(),
            jobs: options.jobs(),
            timeout: options.timeout(),
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Download sources for every artifact without a [`FactKind::SourceFile`]
    /// and attach the resulting archive.
    ///
    /// Never fails: per-artifact problems are logged and reported in the
    /// summary. The number of artifacts is unchanged.
    pub fn process(&self, artifacts: &mut [Artifact]) -> EnrichmentSummary {
        let mut summary = EnrichmentSummary::default();

        let jobs: Vec<Job> = artifacts
            .iter()
            .enumerate()
            .filter(|(_, a)| !a.has(FactKind::SourceFile))
            .map(|(index, a)| Job {
                index,
                name: a.display_name(),
                package: remediate::remediate_package(artifact_to_package(a)),
            })
            .collect();
        summary.skipped = artifacts.len() - jobs.len();

        if jobs.is_empty() {
            info!(skipped = summary.skipped, "no artifacts need source downloads");
            return summary;
        }

        let workers = self.jobs.min(jobs.len());
        info!(
            count = jobs.len(),
            workers,
            output_dir = %self.output_dir.display(),
            "downloading sources"
        );

        let (job_tx, job_rx) = crossbeam_channel::bounded::<Job>(workers);
        let (result_tx, result_rx) = crossbeam_channel::unbounded::<(Job, Outcome)>();

        thread::scope(|scope| {
            for _ in 0..workers {
                let job_rx = job_rx.clone();
                let result_tx = result_tx.clone();
                scope.spawn(move || {
                    for job in job_rx {
                        let (outcome, straggler) = self.fetch(&job);
                        let sent = result_tx.send((job, outcome));
                        // The slot stays taken until the abandoned download stops.
                        if let Some(handle) = straggler {
                            let _ = handle.join();
                        }
                        if sent.is_err() {
                            break;
                        }
                    }
                });
            }
            drop(job_rx);
            drop(result_tx);

            // Feed from a scoped thread so results are drained concurrently.
            scope.spawn(move || {
                for job in jobs {
                    if job_tx.send(job).is_err() {
                        break;
                    }
                }
            });

            for (job, outcome) in result_rx {
                match outcome {
                    Ok(Some(stored)) => {
                        debug!(name = %job.name, archive = %stored.path.display(), "attached source archive");
                        artifacts[job.index].add_fact(Fact::SourceFile(stored.path.clone()));
                        summary.enriched.push(EnrichedArtifact {
                            name: job.name,
                            archive: stored.path,
                            sha256: stored.sha256,
                        });
                    }
                    Ok(None) => {
                        warn!(name = %job.name, "download produced no files");
                        summary.empty.push(job.name);
                    }
                    Err(e) => {
                        warn!(name = %job.name, error = %e, "could not download sources");
                        summary.failures.push(EnrichmentFailure {
                            name: job.name,
                            reason: e.to_string(),
                        });
                    }
                }
            }
        });

        summary.enriched.sort_by(|a, b| a.name.cmp(&b.name));
        summary.empty.sort();
        summary.failures.sort_by(|a, b| a.name.cmp(&b.name));

        info!(
            enriched = summary.enriched.len(),
            empty = summary.empty.len(),
            failed = summary.failures.len(),
            skipped = summary.skipped,
            "source enrichment finished"
        );
        summary
    }

    /// Download into a private temporary directory and archive the result.
    ///
    /// Also returns the download thread when it outlived the timeout; the
    /// caller must join it before starting another download.
    fn fetch(&self, job: &Job) -> (Outcome, Option<Straggler>) {
        debug!(name = %job.name, "downloading sources");
        let (download, straggler) = self.download_with_timeout(job);
        let outcome = download.and_then(|(_scratch, result)| {
            if !is_populated(&result.download_directory) {
                return Ok(None);
            }
            let stored = archive::store_archive(
                &result.download_directory,
                &self.output_dir,
                &archive::archive_base_name(&job.package),
            )?;
            Ok(Some(stored))
        });
        (outcome, straggler)
    }

    /// Run the download on its own thread, which owns the scratch directory.
    ///
    /// On success the directory is handed back for archiving. On timeout the
    /// thread keeps it and drops it once the downloader has returned, so the
    /// directory is never removed while something still writes into it.
    fn download_with_timeout(&self, job: &Job) -> (Download, Option<Straggler>) {
        let scratch = match tempfile::Builder::new().prefix("ort-downloader-").tempdir() {
            Ok(dir) => dir,
            Err(e) => return (Err(e.into()), None),
        };

        let cancel = CancelFlag::new();
        let (tx, rx) = crossbeam_channel::bounded(1);
        let downloader = Arc::clone(&self.downloader);
        let package = job.package.clone();
        let flag = cancel.clone();
        let spawned = thread::Builder::new()
            .name("ort-download".into())
            .spawn(move || {
                let result = downloader.download(&package, scratch.path(), &flag);
                // A failed send means the wait timed out; `scratch` goes with it.
                let _ = tx.send((scratch, result));
            });
        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => return (Err(e.into()), None),
        };

        match rx.recv_timeout(self.timeout) {
            Ok((scratch, result)) => {
                let _ = handle.join();
                (result.map(|r| (scratch, r)), None)
            }
            Err(RecvTimeoutError::Timeout) => {
                cancel.cancel();
                drop(rx);
                (Err(DownloadError::TimedOut(self.timeout)), Some(handle))
            }
            Err(RecvTimeoutError::Disconnected) => {
                let _ = handle.join();
                (Err(DownloadError::Cancelled), None)
            }
        }
    }
}

fn is_populated(dir: &Path) -> bool {
    std::fs::read_dir(dir)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}

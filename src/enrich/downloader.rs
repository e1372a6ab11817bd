//! Source downloaders.
//!
//! [`Downloader`] is the seam between the enrichment processor and the
//! network. [`VcsDownloader`] clones with the system `git` binary and falls
//! back to fetching the package's source artifact over HTTP.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::Duration;

use tracing::{debug, debug_span, warn};

use super::cancel::CancelFlag;
use crate::config::DownloaderOptions;
use crate::error::DownloadError;
use crate::model::{Package, VcsInfo};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Where downloaded sources came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadSource {
    Vcs { url: String, revision: String },
    SourceArtifact { url: String },
}

/// A successful download: the directory holding the sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadResult {
    pub download_directory: PathBuf,
    pub source: DownloadSource,
}

/// Fetches the sources of one package into a directory.
///
/// Implementations must place everything below `target_dir` and should
/// return [`DownloadError::Cancelled`] promptly once `cancel` is set. A
/// timed-out download keeps its worker busy until `download` returns.
pub trait Downloader: Send + Sync {
    fn download(
        &self,
        pkg: &Package,
        target_dir: &Path,
        cancel: &CancelFlag,
    ) -> Result<DownloadResult, DownloadError>;
}

/// Downloads from the package's VCS, else from its source artifact URL.
#[derive(Debug, Default, Clone)]
pub struct VcsDownloader {
    http_timeout: Option<Duration>,
}

impl VcsDownloader {
    pub fn new() -> Self {
        Self::default()
    }

    /// A downloader whose HTTP requests give up after the configured
    /// per-download timeout.
    pub fn from_options(options: &DownloaderOptions) -> Self {
        Self {
            http_timeout: Some(options.timeout()),
        }
    }

    pub fn http_timeout(&self) -> Option<Duration> {
        self.http_timeout
    }

    fn git(&self) -> Command {
        let mut cmd = Command::new("git");
        cmd.env("GIT_CONFIG_GLOBAL", "/dev/null");
        cmd.env("GIT_CONFIG_NOSYSTEM", "1");
        cmd.env("GIT_CONFIG_SYSTEM", "/dev/null");
        cmd.env("GIT_TERMINAL_PROMPT", "0");
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::null());
        cmd.stderr(Stdio::piped());
        cmd
    }

    fn clone_repository(
        &self,
        vcs: &VcsInfo,
        checkout_dir: &Path,
        cancel: &CancelFlag,
    ) -> Result<PathBuf, DownloadError> {
        let _span = debug_span!("git_clone", "{} {}", vcs.url, checkout_dir.display()).entered();

        let mut clone = self.git();
        clone.arg("clone").arg("--quiet");
        if !vcs.revision.is_empty() {
            clone.arg("--no-checkout");
        }
        clone.arg(&vcs.url).arg(checkout_dir);
        run_git(clone, cancel)?;

        if !vcs.revision.is_empty() {
            let mut checkout = self.git();
            checkout
                .arg("-C")
                .arg(checkout_dir)
                .arg("checkout")
                .arg("--quiet")
                .arg(&vcs.revision);
            run_git(checkout, cancel)?;
        }

        let sub_path = vcs.path.trim_matches('/');
        if sub_path.is_empty() {
            Ok(checkout_dir.to_path_buf())
        } else {
            Ok(checkout_dir.join(sub_path))
        }
    }

    #[cfg(feature = "http")]
    fn try_source_artifact(
        &self,
        pkg: &Package,
        target_dir: &Path,
        cancel: &CancelFlag,
    ) -> Option<Result<DownloadResult, DownloadError>> {
        let url = &pkg.source_artifact.url;
        if url.is_empty() {
            return None;
        }
        let artifact_dir = target_dir.join("artifact");
        let fetched = fetch_source_artifact(url, &artifact_dir, self.http_timeout, cancel);
        Some(fetched.map(|()| DownloadResult {
            download_directory: artifact_dir,
            source: DownloadSource::SourceArtifact { url: url.clone() },
        }))
    }

    #[cfg(not(feature = "http"))]
    fn try_source_artifact(
        &self,
        pkg: &Package,
        _target_dir: &Path,
        _cancel: &CancelFlag,
    ) -> Option<Result<DownloadResult, DownloadError>> {
        if !pkg.source_artifact.url.is_empty() {
            debug!(url = %pkg.source_artifact.url, "built without HTTP support, skipping source artifact");
        }
        None
    }
}

impl Downloader for VcsDownloader {
    fn download(
        &self,
        pkg: &Package,
        target_dir: &Path,
        cancel: &CancelFlag,
    ) -> Result<DownloadResult, DownloadError> {
        let vcs = pkg.effective_vcs();
        let mut vcs_error = None;

        if !vcs.url.is_empty() {
            match self.clone_repository(vcs, &target_dir.join("vcs"), cancel) {
                Ok(download_directory) => {
                    return Ok(DownloadResult {
                        download_directory,
                        source: DownloadSource::Vcs {
                            url: vcs.url.clone(),
                            revision: vcs.revision.clone(),
                        },
                    })
                }
                Err(DownloadError::Cancelled) => return Err(DownloadError::Cancelled),
                Err(e) => {
                    warn!(package = %pkg.id, error = %e, "VCS download failed");
                    vcs_error = Some(e);
                }
            }
        }

        if let Some(result) = self.try_source_artifact(pkg, target_dir, cancel) {
            return result;
        }

        Err(vcs_error.unwrap_or_else(|| DownloadError::NoSourceLocation(pkg.id.to_string())))
    }
}

/// Run a git command to completion, killing it if `cancel` is set.
fn run_git(mut cmd: Command, cancel: &CancelFlag) -> Result<(), DownloadError> {
    debug!("{cmd:#?}");
    let mut child = cmd.spawn()?;
    let stderr_reader = drain_stderr(&mut child);

    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if cancel.is_cancelled() {
            let _ = child.kill();
            let _ = child.wait();
            return Err(DownloadError::Cancelled);
        }
        thread::sleep(POLL_INTERVAL);
    };

    let stderr = stderr_reader.join().unwrap_or_default();
    if !status.success() {
        return Err(DownloadError::Git {
            status,
            stderr: String::from_utf8_lossy(&stderr).trim().to_string(),
        });
    }
    Ok(())
}

fn drain_stderr(child: &mut Child) -> thread::JoinHandle<Vec<u8>> {
    let stderr = child.stderr.take();
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut stderr) = stderr {
            let _ = stderr.read_to_end(&mut buf);
        }
        buf
    })
}

#[cfg(feature = "http")]
fn fetch_source_artifact(
    url: &str,
    artifact_dir: &Path,
    timeout: Option<Duration>,
    cancel: &CancelFlag,
) -> Result<(), DownloadError> {
    use std::io::Write;

    let _span = debug_span!("http_fetch", "{url}").entered();
    std::fs::create_dir_all(artifact_dir)?;

    let file_name = crate::resolver::package::file_name_of(url);
    let file_name = if file_name.is_empty() {
        "source-artifact".to_string()
    } else {
        file_name
    };
    let file_path = artifact_dir.join(&file_name);

    let mut builder = reqwest::blocking::Client::builder();
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout).connect_timeout(timeout);
    }
    let client = builder.build()?;
    let mut response = client.get(url).send()?.error_for_status()?;
    let mut file = std::fs::File::create(&file_path)?;
    let mut buf = [0u8; 64 * 1024];
    loop {
        if cancel.is_cancelled() {
            return Err(DownloadError::Cancelled);
        }
        let n = response.read(&mut buf)?;
        if n == 0 {
            break;
        }
        file.write_all(&buf[..n])?;
    }
    file.flush()?;
    drop(file);

    if is_zip_archive(&file_name) {
        debug!(file = %file_path.display(), "unpacking source artifact");
        let mut archive = zip::ZipArchive::new(std::fs::File::open(&file_path)?)?;
        archive.extract(artifact_dir)?;
        std::fs::remove_file(&file_path)?;
    }
    Ok(())
}

#[cfg_attr(not(feature = "http"), allow(dead_code))]
fn is_zip_archive(file_name: &str) -> bool {
    let lower = file_name.to_ascii_lowercase();
    [".zip", ".jar", ".war"].iter().any(|ext| lower.ends_with(ext))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Identifier, RemoteArtifact};

    #[test]
    fn no_location_is_reported() {
        let pkg = Package {
            id: Identifier::new("Maven", "org.example", "lib", "1.0"),
            ..Default::default()
        };
        let dir = tempfile::tempdir().unwrap();
        let err = VcsDownloader::new()
            .download(&pkg, dir.path(), &CancelFlag::new())
            .unwrap_err();
        assert!(matches!(err, DownloadError::NoSourceLocation(ref id) if id == "Maven:org.example:lib:1.0"));
    }

    #[test]
    fn zip_extensions() {
        assert!(is_zip_archive("lib-1.0-sources.JAR"));
        assert!(is_zip_archive("src.zip"));
        assert!(!is_zip_archive("lib-1.0.tar.gz"));
    }

    #[test]
    fn cancelled_git_is_killed() {
        let cancel = CancelFlag::new();
        cancel.cancel();
        let mut cmd = Command::new("sleep");
        cmd.arg("30").stdin(Stdio::null()).stderr(Stdio::piped());
        // Skip quietly where `sleep` is unavailable.
        match run_git(cmd, &cancel) {
            Err(DownloadError::Cancelled) => {}
            Err(DownloadError::Io(_)) => {}
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn failed_clone_keeps_error_without_artifact() {
        let pkg = Package {
            id: Identifier::new("NPM", "", "missing", "0.0.1"),
            vcs_processed: VcsInfo {
                kind: "Git".into(),
                url: "/nonexistent/repository/path.git".into(),
                revision: String::new(),
                path: String::new(),
            },
            source_artifact: RemoteArtifact::default(),
            ..Default::default()
        };
        let dir = tempfile::tempdir().unwrap();
        let err = VcsDownloader::new()
            .download(&pkg, dir.path(), &CancelFlag::new())
            .unwrap_err();
        assert!(matches!(err, DownloadError::Git { .. } | DownloadError::Io(_)));
    }

    #[test]
    fn http_timeout_follows_options() {
        let options = DownloaderOptions {
            timeout_secs: 42,
            ..Default::default()
        };
        assert_eq!(
            VcsDownloader::from_options(&options).http_timeout(),
            Some(Duration::from_secs(42))
        );
        assert_eq!(VcsDownloader::new().http_timeout(), None);
    }
}

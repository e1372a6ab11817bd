//! VCS URL remediation before downloading.
//!
//! `ssh://git@github.com/...` clone URLs make git ask for credentials and
//! the download hangs on the prompt. They are rewritten to HTTPS. No other
//! host or scheme is touched.

use url::Url;

use crate::model::Package;

const GITHUB_HOST: &str = "github.com";

/// Return the HTTPS equivalent of an SSH GitHub clone URL, or `None` when
/// the URL needs no rewrite.
pub fn remediate_vcs_url(raw: &str) -> Option<String> {
    let parsed = Url::parse(raw).ok()?;
    if parsed.scheme() != "ssh"
        || parsed.username() != "git"
        || parsed.host_str() != Some(GITHUB_HOST)
        || parsed.port().is_some()
    {
        return None;
    }

    let mut rewritten = format!("https://{GITHUB_HOST}{}", parsed.path());
    if let Some(query) = parsed.query() {
        rewritten.push('?');
        rewritten.push_str(query);
    }
    Some(rewritten)
}

/// Apply [`remediate_vcs_url`] to both VCS pointers of a package.
pub fn remediate_package(mut pkg: Package) -> Package {
    for vcs in [&mut pkg.vcs, &mut pkg.vcs_processed] {
        if let Some(url) = remediate_vcs_url(&vcs.url) {
            tracing::debug!(from = %vcs.url, to = %url, "rewrote SSH clone URL to HTTPS");
            vcs.url = url;
        }
    }
    pkg
}

//! Packing downloaded sources into zip archives in the output directory.

use std::fs::File;
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::debug;
use walkdir::WalkDir;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::DownloadError;
use crate::model::Package;

/// VCS metadata directories never packed into an archive.
const VCS_DIRECTORIES: &[&str] = &[".git", ".hg", ".svn", "CVS"];

/// Upper bound on `-n` suffixes tried before giving up on a file name.
const MAX_COLLISION_SUFFIX: usize = 10_000;

/// A finished archive and the SHA-256 of its bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredArchive {
    pub path: PathBuf,
    pub sha256: String,
}

/// Form-url-encode `value`, substituting `unknown` for an empty string.
pub fn encode_or_unknown(value: &str) -> String {
    if value.is_empty() {
        return "unknown".to_string();
    }
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

/// `{name}-{version}` with both parts encoded, without the extension.
pub fn archive_base_name(pkg: &Package) -> String {
    format!(
        "{}-{}",
        encode_or_unknown(&pkg.id.name),
        encode_or_unknown(&pkg.id.version)
    )
}

/// Write every file below `src_dir` into a deflated zip on `writer`.
///
/// Entry names are relative to `src_dir` and use `/` separators. VCS
/// metadata directories are skipped. Symbolic links are stored as links to
/// their original target; sockets, fifos and devices are left out.
pub fn pack_zip<W: Write + Seek>(src_dir: &Path, writer: W) -> Result<W, DownloadError> {
    let mut zip = ZipWriter::new(writer);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let walker = WalkDir::new(src_dir)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            !(e.file_type().is_dir()
                && VCS_DIRECTORIES.iter().any(|d| e.file_name() == *d))
        });

    for entry in walker {
        let entry = entry.map_err(io::Error::from)?;
        let relative = entry
            .path()
            .strip_prefix(src_dir)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        let file_type = entry.file_type();
        if file_type.is_dir() {
            zip.add_directory(name, options)?;
        } else if file_type.is_file() {
            zip.start_file(name, options)?;
            let mut file = File::open(entry.path())?;
            io::copy(&mut file, &mut zip)?;
        } else if file_type.is_symlink() {
            // Stored as a link entry; the target is never followed.
            let target = std::fs::read_link(entry.path())?;
            zip.add_symlink(name, target.to_string_lossy(), options)?;
        } else {
            debug!(path = %entry.path().display(), "skipping special file");
        }
    }

    Ok(zip.finish()?)
}

/// Archive `src_dir` as `{base_name}.zip` inside `output_dir`.
///
/// The archive is built in a temporary file next to its destination and
/// only moved into place when complete. An existing archive is never
/// overwritten: `{base_name}-1.zip`, `{base_name}-2.zip`, ... are tried
/// instead.
pub fn store_archive(
    src_dir: &Path,
    output_dir: &Path,
    base_name: &str,
) -> Result<StoredArchive, DownloadError> {
    let mut partial = tempfile::Builder::new()
        .prefix(".partial-")
        .suffix(".zip")
        .tempfile_in(output_dir)?;

    let file = pack_zip(src_dir, partial.as_file_mut())?;
    file.flush()?;
    file.seek(SeekFrom::Start(0))?;
    let mut hasher = Sha256::new();
    io::copy(file, &mut hasher)?;
    let sha256 = hex::encode(hasher.finalize());

    for n in 0..MAX_COLLISION_SUFFIX {
        let file_name = if n == 0 {
            format!("{base_name}.zip")
        } else {
            format!("{base_name}-{n}.zip")
        };
        let path = output_dir.join(file_name);
        match partial.persist_noclobber(&path) {
            Ok(_) => return Ok(StoredArchive { path, sha256 }),
            Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => {
                debug!(path = %path.display(), "archive name taken, trying next suffix");
                partial = e.file;
            }
            Err(e) => return Err(e.error.into()),
        }
    }

    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("no free archive name for '{base_name}' in {}", output_dir.display()),
    )
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Identifier;
    use std::io::Read;

    fn source_tree() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::create_dir_all(dir.path().join(".git/objects")).unwrap();
        std::fs::write(dir.path().join("README.md"), "hello").unwrap();
        std::fs::write(dir.path().join("src/lib.rs"), "pub fn f() {}").unwrap();
        std::fs::write(dir.path().join(".git/HEAD"), "ref: refs/heads/main").unwrap();
        dir
    }

    #[test]
    fn encodes_names() {
        assert_eq!(encode_or_unknown(""), "unknown");
        assert_eq!(encode_or_unknown("commons-lang3"), "commons-lang3");
        assert_eq!(encode_or_unknown("@scope/pkg"), "%40scope%2Fpkg");
        assert_eq!(encode_or_unknown("a b"), "a+b");
    }

    #[test]
    fn base_name_uses_identifier() {
        let pkg = Package {
            id: Identifier::new("NPM", "", "left-pad", ""),
            ..Default::default()
        };
        assert_eq!(archive_base_name(&pkg), "left-pad-unknown");
        assert_eq!(archive_base_name(&Package::default()), "unknown-unknown");
    }

    #[test]
    fn zip_contains_sources_without_vcs_metadata() {
        let src = source_tree();
        let out = tempfile::tempdir().unwrap();
        let stored = store_archive(src.path(), out.path(), "lib-1.0").unwrap();
        assert_eq!(stored.path, out.path().join("lib-1.0.zip"));
        assert_eq!(stored.sha256.len(), 64);

        let mut archive = zip::ZipArchive::new(File::open(&stored.path).unwrap()).unwrap();
        let names: Vec<String> = archive.file_names().map(str::to_string).collect();
        assert!(names.iter().any(|n| n == "README.md"));
        assert!(names.iter().any(|n| n == "src/lib.rs"));
        assert!(!names.iter().any(|n| n.starts_with(".git")));

        let mut content = String::new();
        archive
            .by_name("src/lib.rs")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "pub fn f() {}");
    }

    #[test]
    fn hash_matches_file_bytes() {
        let src = source_tree();
        let out = tempfile::tempdir().unwrap();
        let stored = store_archive(src.path(), out.path(), "lib-1.0").unwrap();
        let bytes = std::fs::read(&stored.path).unwrap();
        assert_eq!(stored.sha256, hex::encode(Sha256::digest(&bytes)));
    }

    #[test]
    fn collisions_get_numeric_suffix() {
        let src = source_tree();
        let out = tempfile::tempdir().unwrap();
        std::fs::write(out.path().join("lib-1.0.zip"), "existing").unwrap();

        let first = store_archive(src.path(), out.path(), "lib-1.0").unwrap();
        let second = store_archive(src.path(), out.path(), "lib-1.0").unwrap();
        assert_eq!(first.path, out.path().join("lib-1.0-1.zip"));
        assert_eq!(second.path, out.path().join("lib-1.0-2.zip"));
        assert_eq!(
            std::fs::read_to_string(out.path().join("lib-1.0.zip")).unwrap(),
            "existing"
        );
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_are_stored_as_links() {
        let src = source_tree();
        std::os::unix::fs::symlink("README.md", src.path().join("LINK.md")).unwrap();
        std::os::unix::fs::symlink("/etc/passwd", src.path().join("outside")).unwrap();
        let out = tempfile::tempdir().unwrap();
        let stored = store_archive(src.path(), out.path(), "lib-1.0").unwrap();

        let mut archive = zip::ZipArchive::new(File::open(&stored.path).unwrap()).unwrap();
        for (name, target) in [("LINK.md", "README.md"), ("outside", "/etc/passwd")] {
            let mut entry = archive.by_name(name).unwrap();
            assert_eq!(entry.unix_mode().unwrap() & 0o170000, 0o120000, "{name}");
            let mut content = String::new();
            entry.read_to_string(&mut content).unwrap();
            assert_eq!(content, target);
        }
    }

    #[test]
    fn no_partial_files_left_behind() {
        let src = source_tree();
        let out = tempfile::tempdir().unwrap();
        store_archive(src.path(), out.path(), "lib-1.0").unwrap();
        let leftovers: Vec<_> = std::fs::read_dir(out.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(".partial-"))
            .collect();
        assert!(leftovers.is_empty());
    }
}

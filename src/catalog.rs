//! Directory scanning and the immutable catalog of candidate image paths.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, instrument};
use walkdir::WalkDir;

use crate::error::Error;

/// Extensions (lowercase, without dot) accepted into the catalog.
///
/// Some of these (the HD Photo family) are catalogued even though the decoder
/// cannot read them; selection skips them like any other undecodable file.
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "bmp", "gif", "webp", "tif", "tiff", "jxr", "hdp", "wdp", "jif", "jifi",
    "jpe", "jfi",
];

/// Return `true` if `path` has an allowed image extension.
#[must_use]
pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| {
            let ext = ext.to_ascii_lowercase();
            SUPPORTED_EXTENSIONS.iter().any(|e| *e == ext)
        })
}

/// Ordered, absolute image paths found under one root directory.
///
/// Cloning is cheap; the path list is shared. A catalog is never edited in
/// place, a rescan produces a new one.
#[derive(Debug, Clone)]
pub struct Catalog {
    root: PathBuf,
    paths: Arc<[PathBuf]>,
}

impl Catalog {
    /// Construct a catalog from a list of paths.
    ///
    /// # Errors
    /// Returns [`Error::EmptyCatalog`] if `paths` is empty.
    pub fn from_vec(root: impl Into<PathBuf>, paths: Vec<PathBuf>) -> Result<Self, Error> {
        if paths.is_empty() {
            return Err(Error::EmptyCatalog);
        }
        Ok(Self {
            root: root.into(),
            paths: paths.into(),
        })
    }

    /// Directory the catalog was built from.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of paths contained.
    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Always `false` for a constructed catalog.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    #[must_use]
    pub fn get(&self, idx: usize) -> Option<&Path> {
        self.paths.get(idx).map(PathBuf::as_path)
    }

    /// Borrow the internal list (read-only).
    #[must_use]
    pub fn as_slice(&self) -> &[PathBuf] {
        &self.paths
    }
}

/// Scan `root` recursively without progress reporting.
///
/// # Errors
/// See [`scan_with_progress`].
pub fn scan(root: &Path) -> Result<Catalog, Error> {
    scan_with_progress(root, |_| {})
}

/// Scan `root` recursively for supported images, reporting percent progress.
///
/// Entries that cannot be read (permission denied, vanished while walking,
/// symlink loops) are skipped and the walk continues with their siblings.
///
/// Progress is computed over the final file count, so it is only reported once
/// the walk is complete. Repeated percentages are not reported twice and the
/// last report is always 100.
///
/// # Errors
/// Returns [`Error::BadDir`] if `root` is missing or not a directory, and
/// [`Error::EmptyCatalog`] if nothing matched.
#[instrument(skip(root, on_progress), fields(root = %root.display()))]
pub fn scan_with_progress(
    root: &Path,
    mut on_progress: impl FnMut(u8),
) -> Result<Catalog, Error> {
    if !root.is_dir() {
        return Err(Error::BadDir(root.to_path_buf()));
    }
    let root = std::path::absolute(root)?;

    let mut found = Vec::new();
    for entry in WalkDir::new(&root).follow_links(true).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                debug!(path = ?err.path(), "scan: skipping unreadable entry: {err}");
                continue;
            }
        };
        if entry.file_type().is_file() && is_supported_image(entry.path()) {
            found.push(entry.into_path());
        }
    }

    let total = found.len();
    let mut last = None;
    for processed in 1..=total {
        let percent = u8::try_from(processed * 100 / total).unwrap_or(100);
        if last != Some(percent) {
            on_progress(percent);
            last = Some(percent);
        }
    }
    if total == 0 {
        on_progress(100);
    }

    info!(discovered = total, "recursive scan complete");
    Catalog::from_vec(root, found)
}

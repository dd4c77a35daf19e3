//! Safe extraction of untrusted package archives.
//!
//! Every entry is checked before anything touches the disk: its name must
//! stay inside the extraction directory, it must not be a symbolic link, and
//! its decompressed size is measured while copying (header sizes are not
//! trusted). Output goes to a fresh [`TempDir`] that is removed when the
//! returned [`ExtractedPackage`] is dropped.

use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{self, Cursor, Read, Seek};
use std::path::{Component, Path, PathBuf};

use tempfile::TempDir;
use thiserror::Error;
use tracing::debug;
use zip::result::ZipError;
use zip::ZipArchive;

use crate::config::ImportConfig;

const S_IFMT: u32 = 0o170_000;
const S_IFLNK: u32 = 0o120_000;

/// Resource-fork directory added by macOS archivers; never part of a package.
const MACOS_METADATA_DIR: &str = "__MACOSX";

/// Size and count limits for one archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionLimits {
    pub max_archive_bytes: u64,
    pub max_entry_bytes: u64,
    pub max_total_bytes: u64,
    pub max_entries: usize,
}

impl From<&ImportConfig> for ExtractionLimits {
    fn from(config: &ImportConfig) -> Self {
        Self {
            max_archive_bytes: config.max_archive_bytes,
            max_entry_bytes: config.max_entry_bytes,
            max_total_bytes: config.max_total_bytes,
            max_entries: config.max_entries,
        }
    }
}

impl Default for ExtractionLimits {
    fn default() -> Self {
        Self::from(&ImportConfig::default())
    }
}

/// Reasons an archive is refused. None of them are retryable.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("archive is {size} bytes, limit is {limit}")]
    ArchiveTooLarge { size: u64, limit: u64 },

    #[error("corrupt archive: {0}")]
    Corrupt(#[from] ZipError),

    #[error("archive has {count} entries, limit is {limit}")]
    TooManyEntries { count: usize, limit: usize },

    #[error("entry '{name}' escapes the extraction directory")]
    UnsafePath { name: String },

    #[error("entry '{name}' is a symbolic link")]
    Symlink { name: String },

    #[error("entry '{name}' is larger than {limit} bytes")]
    EntryTooLarge { name: String, limit: u64 },

    #[error("archive expands to more than {limit} bytes")]
    TotalTooLarge { limit: u64 },

    #[error("archive has no top-level directory")]
    NoRoot,

    #[error("archive has more than one top-level directory: {}", .0.join(", "))]
    MultipleRoots(Vec<String>),

    #[error("failed to write extracted files: {0}")]
    Io(#[from] io::Error),
}

/// Archive contents unpacked into a private temporary directory.
#[derive(Debug)]
pub struct ExtractedPackage {
    dir: TempDir,
    root_name: String,
}

impl ExtractedPackage {
    /// Name of the single top-level directory (the controller id).
    pub fn root_name(&self) -> &str {
        &self.root_name
    }

    /// Path of the top-level directory.
    pub fn root(&self) -> PathBuf {
        self.dir.path().join(&self.root_name)
    }

    /// Path of the temporary directory itself.
    pub fn temp_path(&self) -> &Path {
        self.dir.path()
    }

    /// Hands ownership of the temporary directory to the caller.
    pub fn into_parts(self) -> (TempDir, String) {
        (self.dir, self.root_name)
    }
}

/// Extracts an archive held in memory.
pub fn extract_bytes(
    bytes: &[u8],
    limits: &ExtractionLimits,
) -> Result<ExtractedPackage, ExtractionError> {
    let size = u64::try_from(bytes.len()).unwrap_or(u64::MAX);
    if size > limits.max_archive_bytes {
        return Err(ExtractionError::ArchiveTooLarge {
            size,
            limit: limits.max_archive_bytes,
        });
    }
    extract(Cursor::new(bytes), limits)
}

/// Extracts an archive file, checking its size before reading it.
///
/// The file is read through a shared handle so the caller can reuse it
/// afterwards (e.g. to hash it).
pub fn extract_file(
    file: &File,
    limits: &ExtractionLimits,
) -> Result<ExtractedPackage, ExtractionError> {
    let size = file.metadata()?.len();
    if size > limits.max_archive_bytes {
        return Err(ExtractionError::ArchiveTooLarge {
            size,
            limit: limits.max_archive_bytes,
        });
    }
    extract(file, limits)
}

fn extract<R: Read + Seek>(
    reader: R,
    limits: &ExtractionLimits,
) -> Result<ExtractedPackage, ExtractionError> {
    let mut archive = ZipArchive::new(reader)?;

    if archive.len() > limits.max_entries {
        return Err(ExtractionError::TooManyEntries {
            count: archive.len(),
            limit: limits.max_entries,
        });
    }

    let dir = tempfile::Builder::new()
        .prefix("controller-import-")
        .tempdir()?;

    let mut roots = BTreeSet::new();
    let mut total: u64 = 0;

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        let name = entry.name().to_string();

        let relative = safe_relative_path(&name, entry.enclosed_name())
            .ok_or_else(|| ExtractionError::UnsafePath { name: name.clone() })?;

        if entry
            .unix_mode()
            .is_some_and(|mode| mode & S_IFMT == S_IFLNK)
        {
            return Err(ExtractionError::Symlink { name });
        }

        let mut components = relative.components();
        let Some(Component::Normal(first)) = components.next() else {
            continue;
        };
        let root = first.to_string_lossy().into_owned();
        if root == MACOS_METADATA_DIR {
            continue;
        }

        // Loose files next to the package directory are ignored
        let nested = components.next().is_some();
        if !nested && !entry.is_dir() {
            debug!(entry = %name, "skipping top-level file");
            continue;
        }
        roots.insert(root);

        let destination = dir.path().join(&relative);
        if entry.is_dir() {
            fs::create_dir_all(&destination)?;
            continue;
        }

        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut output = File::create(&destination)?;
        let written = io::copy(
            &mut (&mut entry).take(limits.max_entry_bytes.saturating_add(1)),
            &mut output,
        )?;
        if written > limits.max_entry_bytes {
            return Err(ExtractionError::EntryTooLarge {
                name,
                limit: limits.max_entry_bytes,
            });
        }

        total = total.saturating_add(written);
        if total > limits.max_total_bytes {
            return Err(ExtractionError::TotalTooLarge {
                limit: limits.max_total_bytes,
            });
        }
    }

    let mut roots = roots.into_iter();
    let root_name = match (roots.next(), roots.next()) {
        (None, _) => return Err(ExtractionError::NoRoot),
        (Some(root), None) => root,
        (Some(first), Some(second)) => {
            let mut all = vec![first, second];
            all.extend(roots);
            return Err(ExtractionError::MultipleRoots(all));
        }
    };

    debug!(root = %root_name, bytes = total, "archive extracted");
    Ok(ExtractedPackage { dir, root_name })
}

/// Returns the entry's path relative to the extraction directory, or `None`
/// if it could land anywhere else.
fn safe_relative_path(name: &str, enclosed: Option<PathBuf>) -> Option<PathBuf> {
    let enclosed = enclosed?;

    // Drive prefixes and backslash separators are meaningful on other platforms
    if name.contains('\\') || name.contains(':') || name.starts_with('/') {
        return None;
    }

    let all_normal = enclosed
        .components()
        .all(|component| matches!(component, Component::Normal(_)));
    (all_normal && enclosed.components().next().is_some()).then_some(enclosed)
}

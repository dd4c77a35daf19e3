//! Reads the files of an extracted controller package.
//!
//! A package root looks like:
//!
//! ```text
//! <controllerId>/
//!   version.json         optional RepoVersion
//!   index.json           optional IndexEntry
//!   versions/<N>.json    one or more ControllerLayout manifests
//!   icon.png             optional
//!   screenshots/*.png    optional (.jpg accepted too)
//! ```

use std::cmp::Ordering;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::constants::{ICON_FILE, SCREENSHOTS_DIR, VERSIONS_DIR, VERSION_FILE};
use crate::models::{ControllerLayout, IndexEntry, RepoVersion};

/// Package index file (same name as the catalog index).
const PACKAGE_INDEX_FILE: &str = "index.json";

/// A package file that could not be read or parsed.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("no layout manifest found under {VERSIONS_DIR}/")]
    MissingLayout,

    #[error("cannot choose a layout manifest: {} candidates and none is numbered", .0.len())]
    AmbiguousLayout(Vec<String>),

    #[error("failed to read {file}: {source}")]
    Io {
        file: String,
        #[source]
        source: io::Error,
    },

    #[error("invalid JSON in {file}: {source}")]
    InvalidJson {
        file: String,
        #[source]
        source: serde_json::Error,
    },
}

fn numbered_manifest() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(\d+)\.json$").expect("manifest file pattern is valid"))
}

fn display_name(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

fn read_json<T: DeserializeOwned>(root: &Path, path: &Path) -> Result<T, ManifestError> {
    let file = display_name(root, path);
    let content = fs::read_to_string(path).map_err(|source| ManifestError::Io {
        file: file.clone(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| ManifestError::InvalidJson { file, source })
}

fn read_optional<T: DeserializeOwned>(root: &Path, name: &str) -> Result<Option<T>, ManifestError> {
    let path = root.join(name);
    if !path.is_file() {
        return Ok(None);
    }
    read_json(root, &path).map(Some)
}

/// Reads `version.json`, if present.
pub fn read_version_info(root: &Path) -> Result<Option<RepoVersion>, ManifestError> {
    read_optional(root, VERSION_FILE)
}

/// Reads `index.json`, if present.
pub fn read_index_entry(root: &Path) -> Result<Option<IndexEntry>, ManifestError> {
    read_optional(root, PACKAGE_INDEX_FILE)
}

/// Picks the layout manifest under `versions/`.
///
/// Preference order: `<preferred>.json`, then the highest numbered
/// `<N>.json`, then the only `.json` file.
pub fn select_manifest(root: &Path, preferred: Option<i64>) -> Result<PathBuf, ManifestError> {
    let versions_dir = root.join(VERSIONS_DIR);
    if !versions_dir.is_dir() {
        return Err(ManifestError::MissingLayout);
    }

    let entries = fs::read_dir(&versions_dir).map_err(|source| ManifestError::Io {
        file: VERSIONS_DIR.to_string(),
        source,
    })?;

    let mut candidates: Vec<(String, PathBuf)> = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| ManifestError::Io {
            file: VERSIONS_DIR.to_string(),
            source,
        })?;
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();
        if path.is_file() && name.ends_with(".json") {
            candidates.push((name, path));
        }
    }

    if let Some(code) = preferred {
        let wanted = format!("{code}.json");
        if let Some((_, path)) = candidates.iter().find(|(name, _)| *name == wanted) {
            return Ok(path.clone());
        }
    }

    let highest = candidates
        .iter()
        .filter_map(|(name, path)| {
            let number: u64 = numbered_manifest()
                .captures(name)?
                .get(1)?
                .as_str()
                .parse()
                .ok()?;
            Some((number, path))
        })
        .max_by_key(|(number, _)| *number);
    if let Some((_, path)) = highest {
        return Ok(path.clone());
    }

    match candidates.len() {
        0 => Err(ManifestError::MissingLayout),
        1 => Ok(candidates.remove(0).1),
        _ => Err(ManifestError::AmbiguousLayout(
            candidates.into_iter().map(|(name, _)| name).collect(),
        )),
    }
}

/// Parses a layout manifest.
pub fn parse_layout(root: &Path, path: &Path) -> Result<ControllerLayout, ManifestError> {
    read_json(root, path)
}

/// Returns `icon.png` if the package ships one.
pub fn find_icon(root: &Path) -> Option<PathBuf> {
    let path = root.join(ICON_FILE);
    path.is_file().then_some(path)
}

/// Lists screenshot files ordered by numeric stem, then by name.
pub fn list_screenshots(root: &Path) -> Result<Vec<PathBuf>, ManifestError> {
    let dir = root.join(SCREENSHOTS_DIR);
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let io_error = |source| ManifestError::Io {
        file: SCREENSHOTS_DIR.to_string(),
        source,
    };

    let mut screenshots = Vec::new();
    for entry in fs::read_dir(&dir).map_err(io_error)? {
        let path = entry.map_err(io_error)?.path();
        let is_image = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("png") || ext.eq_ignore_ascii_case("jpg"));
        if path.is_file() && is_image {
            screenshots.push(path);
        }
    }

    screenshots.sort_by(|a, b| compare_screenshots(a, b));
    Ok(screenshots)
}

fn compare_screenshots(a: &Path, b: &Path) -> Ordering {
    let number = |path: &Path| {
        path.file_stem()
            .and_then(|stem| stem.to_str())
            .and_then(|stem| stem.parse::<u64>().ok())
    };

    match (number(a), number(b)) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.file_name().cmp(&b.file_name())),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.file_name().cmp(&b.file_name()),
    }
}

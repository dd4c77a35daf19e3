//! Catalog of installed controllers.
//!
//! The catalog lives on disk under a repository root:
//!
//! ```text
//! index.json                          array of IndexEntry
//! category.json                       array of Category (optional)
//! repo_json/<id>/version.json         RepoVersion
//! repo_json/<id>/versions/<code>.json ControllerLayout per version code
//! repo_json/<id>/icon.png
//! repo_json/<id>/screenshots/*
//! ```
//!
//! [`Catalog`] is a shareable handle. The in-memory index sits behind an
//! `RwLock`; commits take a per-controller mutex first, so commits of
//! different controllers only contend on the final index rewrite.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use anyhow::{Context, Result};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::constants::{
    CATEGORY_FILE, ICON_FILE, INDEX_FILE, REPO_DIR, SCREENSHOTS_DIR, VERSIONS_DIR, VERSION_FILE,
};
use crate::models::{CatalogRecord, Category, ControllerLayout, IndexEntry, RepoVersion, Version};
use crate::services::importer::ParsedPackage;

/// Read access to installed controllers, as needed by the importer.
pub trait CatalogLookup: Send + Sync {
    /// Returns the installed record for `controller_id`, if any.
    fn lookup(&self, controller_id: &str) -> Option<CatalogRecord>;
}

/// Why a commit was refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ConflictReason {
    /// The package was classified against a different installed version
    StaleSnapshot {
        expected: Option<i64>,
        found: Option<i64>,
    },
    /// The incoming version code does not exceed the installed one
    NotNewer { incoming: i64, latest: i64 },
}

impl fmt::Display for ConflictReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |code: &Option<i64>| code.map_or_else(|| "none".to_string(), |c| c.to_string());
        match self {
            Self::StaleSnapshot { expected, found } => write!(
                f,
                "catalog changed since import (expected version {}, found {})",
                show(expected),
                show(found)
            ),
            Self::NotNewer { incoming, latest } => write!(
                f,
                "version {incoming} is not newer than installed version {latest}"
            ),
        }
    }
}

/// Catalog storage and commit failures.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("commit conflict for '{controller_id}': {reason}")]
    CommitConflict {
        controller_id: String,
        reason: ConflictReason,
    },

    #[error("controller '{0}' is not installed")]
    NotInstalled(String),

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid JSON in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize {}: {source}", path.display())]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl CatalogError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Outcome of a successful commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitReceipt {
    pub controller_id: String,
    pub version_code: i64,
    /// Latest version before this commit, if the controller was installed
    pub previous_version_code: Option<i64>,
    /// Ledger as written to `version.json`
    pub version: RepoVersion,
    /// Number of screenshots copied
    pub screenshots_copied: usize,
}

#[derive(Debug, Default)]
struct CatalogState {
    entries: Vec<IndexEntry>,
    versions: HashMap<String, RepoVersion>,
    categories: Vec<Category>,
}

/// Handle to an on-disk controller catalog.
#[derive(Debug)]
pub struct Catalog {
    root: PathBuf,
    state: RwLock<CatalogState>,
    commit_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl Catalog {
    /// Opens an existing catalog.
    pub fn open(root: &Path) -> Result<Self> {
        let index_path = root.join(INDEX_FILE);
        if !index_path.exists() {
            anyhow::bail!(
                "Catalog index not found at {} (create one with `catalog init`)",
                index_path.display()
            );
        }

        let entries: Vec<IndexEntry> = read_json(&index_path)?;

        let category_path = root.join(CATEGORY_FILE);
        let categories: Vec<Category> = if category_path.exists() {
            read_json(&category_path)?
        } else {
            Vec::new()
        };

        let mut versions = HashMap::new();
        for entry in &entries {
            let version_path = controller_dir(root, &entry.id).join(VERSION_FILE);
            if !version_path.exists() {
                warn!(controller_id = %entry.id, "index entry without version ledger");
                continue;
            }
            let version: RepoVersion = read_json(&version_path)?;
            versions.insert(entry.id.clone(), version);
        }

        debug!(
            root = %root.display(),
            controllers = entries.len(),
            categories = categories.len(),
            "catalog opened"
        );

        Ok(Self {
            root: root.to_path_buf(),
            state: RwLock::new(CatalogState {
                entries,
                versions,
                categories,
            }),
            commit_locks: Mutex::new(HashMap::new()),
        })
    }

    /// Creates an empty catalog at `root` (keeping any existing files) and opens it.
    pub fn init(root: &Path) -> Result<Self> {
        let repo_dir = root.join(REPO_DIR);
        fs::create_dir_all(&repo_dir)
            .with_context(|| format!("Failed to create directory: {}", repo_dir.display()))?;

        let index_path = root.join(INDEX_FILE);
        if !index_path.exists() {
            write_json_atomic(&index_path, &Vec::<IndexEntry>::new())?;
            info!(root = %root.display(), "catalog initialized");
        }

        Self::open(root)
    }

    /// Repository root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Installed record for `controller_id`.
    pub fn lookup(&self, controller_id: &str) -> Option<CatalogRecord> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        let version = state.versions.get(controller_id)?;
        let entry = state.entries.iter().find(|e| e.id == controller_id)?;
        Some(CatalogRecord {
            entry: entry.clone(),
            version: version.clone(),
        })
    }

    /// All index entries, in index order.
    pub fn entries(&self) -> Vec<IndexEntry> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .clone()
    }

    /// All categories.
    pub fn categories(&self) -> Vec<Category> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .categories
            .clone()
    }

    /// Loads the latest installed layout of `controller_id`.
    pub fn load_layout(&self, controller_id: &str) -> Result<ControllerLayout, CatalogError> {
        let record = self
            .lookup(controller_id)
            .ok_or_else(|| CatalogError::NotInstalled(controller_id.to_string()))?;

        let path = controller_dir(&self.root, controller_id)
            .join(VERSIONS_DIR)
            .join(format!("{}.json", record.version_code()));
        let content = fs::read_to_string(&path).map_err(|e| CatalogError::io(&path, e))?;
        serde_json::from_str(&content).map_err(|source| CatalogError::Parse { path, source })
    }

    /// Installs a ready package.
    ///
    /// Commits of the same controller are serialized. The package must have
    /// been classified against the current installed version and must be
    /// strictly newer; otherwise [`CatalogError::CommitConflict`] is returned
    /// and nothing is written.
    ///
    /// The new controller directory is staged at `repo_json/.<id>.staging`
    /// and renamed into place; `index.json` is rewritten last and the
    /// in-memory index only changes once it is on disk. On any error the
    /// installed directory, ledger and index are left as they were.
    pub fn commit(&self, package: &ParsedPackage) -> Result<CommitReceipt, CatalogError> {
        let controller_id = package.controller_id.as_str();
        let lock = self.commit_lock(controller_id);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let current = self.lookup(controller_id);
        let found = current.as_ref().map(CatalogRecord::version_code);
        let expected = package
            .current_index
            .as_ref()
            .map(CatalogRecord::version_code);

        if found != expected {
            return Err(conflict(
                package,
                ConflictReason::StaleSnapshot { expected, found },
            ));
        }
        if let Some(latest) = found {
            if package.version_code <= latest {
                return Err(conflict(
                    package,
                    ConflictReason::NotNewer {
                        incoming: package.version_code,
                        latest,
                    },
                ));
            }
        }

        let version = merge_ledger(current.as_ref().map(|r| &r.version), package);

        // Build the complete new controller directory beside the installed one
        let dest = controller_dir(&self.root, controller_id);
        let staging = sibling_dir(&self.root, controller_id, "staging");
        let screenshots_copied = match stage_controller(&staging, &dest, package, &version) {
            Ok(count) => count,
            Err(e) => {
                discard(&staging);
                return Err(e);
            }
        };

        let previous = sibling_dir(&self.root, controller_id, "previous");
        swap_in(&staging, &dest, &previous)?;

        let mut entry = package.index_entry.clone();
        entry.id = controller_id.to_string();
        {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            let mut entries = state.entries.clone();
            match entries.iter_mut().find(|e| e.id == controller_id) {
                Some(existing) => *existing = entry,
                None => entries.push(entry),
            }
            if let Err(e) = write_json_atomic(&self.root.join(INDEX_FILE), &entries) {
                roll_back(&dest, &previous);
                return Err(e);
            }
            state.entries = entries;
            state
                .versions
                .insert(controller_id.to_string(), version.clone());
        }
        discard(&previous);

        info!(
            controller_id,
            version_code = package.version_code,
            previous = ?found,
            import_id = %package.import_id,
            "package committed"
        );

        Ok(CommitReceipt {
            controller_id: controller_id.to_string(),
            version_code: package.version_code,
            previous_version_code: found,
            version,
            screenshots_copied,
        })
    }

    fn commit_lock(&self, controller_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self
            .commit_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(controller_id.to_string()).or_default())
    }
}

impl CatalogLookup for Catalog {
    fn lookup(&self, controller_id: &str) -> Option<CatalogRecord> {
        Catalog::lookup(self, controller_id)
    }
}

fn conflict(package: &ParsedPackage, reason: ConflictReason) -> CatalogError {
    warn!(
        controller_id = %package.controller_id,
        import_id = %package.import_id,
        %reason,
        "commit refused"
    );
    CatalogError::CommitConflict {
        controller_id: package.controller_id.clone(),
        reason,
    }
}

fn controller_dir(root: &Path, controller_id: &str) -> PathBuf {
    root.join(REPO_DIR).join(controller_id)
}

/// Computes the ledger after installing `package` over `existing`.
///
/// The displaced latest and any package-provided history join the existing
/// history; entries are kept in ascending version code, one per code.
fn merge_ledger(existing: Option<&RepoVersion>, package: &ParsedPackage) -> RepoVersion {
    let name = if package.version_info.latest.version_name.is_empty() {
        package.layout.version.clone()
    } else {
        package.version_info.latest.version_name.clone()
    };
    let latest = Version::new(package.version_code, name);

    let mut history: Vec<Version> = Vec::new();
    if let Some(existing) = existing {
        history.extend(existing.history.iter().cloned());
        history.push(existing.latest.clone());
    }
    history.extend(package.version_info.history.iter().cloned());
    history.retain(|v| v.version_code != latest.version_code);
    // Stable sort: for equal codes the catalog's own entry comes first and wins
    history.sort_by_key(|v| v.version_code);
    history.dedup_by_key(|v| v.version_code);

    let shipped = i64::try_from(package.screenshots.len()).unwrap_or(i64::MAX);

    RepoVersion {
        screenshot: shipped.max(package.version_info.screenshot),
        description: package.version_info.description.clone(),
        author: package.version_info.author.clone(),
        latest,
        history,
    }
}

fn sibling_dir(root: &Path, controller_id: &str, purpose: &str) -> PathBuf {
    root.join(REPO_DIR).join(format!(".{controller_id}.{purpose}"))
}

/// Writes the full directory of the new version into `staging`.
///
/// Layouts of earlier versions are carried over from `dest`, as is the
/// installed icon when the package ships none. The screenshot set is
/// replaced by the package's. Nothing under `dest` is modified.
fn stage_controller(
    staging: &Path,
    dest: &Path,
    package: &ParsedPackage,
    version: &RepoVersion,
) -> Result<usize, CatalogError> {
    if staging.exists() {
        fs::remove_dir_all(staging).map_err(|e| CatalogError::io(staging, e))?;
    }

    let versions = staging.join(VERSIONS_DIR);
    fs::create_dir_all(&versions).map_err(|e| CatalogError::io(&versions, e))?;
    let installed_versions = dest.join(VERSIONS_DIR);
    if installed_versions.is_dir() {
        copy_files(&installed_versions, &versions)?;
    }

    let installed_icon = dest.join(ICON_FILE);
    let icon = match &package.icon_path {
        Some(icon) => Some(icon.as_path()),
        None => installed_icon
            .is_file()
            .then_some(installed_icon.as_path()),
    };
    if let Some(source) = icon {
        fs::copy(source, staging.join(ICON_FILE)).map_err(|e| CatalogError::io(source, e))?;
    }

    let screenshots = staging.join(SCREENSHOTS_DIR);
    fs::create_dir_all(&screenshots).map_err(|e| CatalogError::io(&screenshots, e))?;
    for source in &package.screenshots {
        let Some(file_name) = source.file_name() else {
            continue;
        };
        fs::copy(source, screenshots.join(file_name)).map_err(|e| CatalogError::io(source, e))?;
    }

    write_json_atomic(
        &versions.join(format!("{}.json", package.version_code)),
        &package.layout,
    )?;
    write_json_atomic(&staging.join(VERSION_FILE), version)?;

    Ok(package.screenshots.len())
}

fn copy_files(from: &Path, to: &Path) -> Result<(), CatalogError> {
    let entries = fs::read_dir(from).map_err(|e| CatalogError::io(from, e))?;
    for entry in entries {
        let path = entry.map_err(|e| CatalogError::io(from, e))?.path();
        if let (true, Some(name)) = (path.is_file(), path.file_name()) {
            fs::copy(&path, to.join(name)).map_err(|e| CatalogError::io(&path, e))?;
        }
    }
    Ok(())
}

/// Replaces `dest` with `staging`, keeping the old directory at `previous`.
fn swap_in(staging: &Path, dest: &Path, previous: &Path) -> Result<(), CatalogError> {
    if previous.exists() {
        fs::remove_dir_all(previous).map_err(|e| CatalogError::io(previous, e))?;
    }

    let installed = dest.exists();
    if installed {
        if let Err(e) = fs::rename(dest, previous) {
            discard(staging);
            return Err(CatalogError::io(dest, e));
        }
    }

    if let Err(e) = fs::rename(staging, dest) {
        if installed {
            restore(previous, dest);
        }
        discard(staging);
        return Err(CatalogError::io(dest, e));
    }

    Ok(())
}

/// Undoes [`swap_in`] after a later step failed.
fn roll_back(dest: &Path, previous: &Path) {
    discard(dest);
    if previous.exists() {
        restore(previous, dest);
    }
}

fn restore(previous: &Path, dest: &Path) {
    if let Err(e) = fs::rename(previous, dest) {
        warn!(
            error = %e,
            previous = %previous.display(),
            "failed to restore installed controller directory"
        );
    }
}

fn discard(dir: &Path) {
    if !dir.exists() {
        return;
    }
    if let Err(e) = fs::remove_dir_all(dir) {
        warn!(error = %e, dir = %dir.display(), "failed to remove work directory");
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Writes pretty JSON via temp file + rename.
fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), CatalogError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| CatalogError::io(parent, e))?;
    }

    let content = serde_json::to_string_pretty(value).map_err(|source| CatalogError::Serialize {
        path: path.to_path_buf(),
        source,
    })?;

    let temp_path = path.with_extension("json.tmp");
    fs::write(&temp_path, content).map_err(|e| CatalogError::io(&temp_path, e))?;
    fs::rename(&temp_path, path).map_err(|e| CatalogError::io(path, e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn package(id: &str, code: i64, current: Option<CatalogRecord>) -> ParsedPackage {
        let mut package =
            ParsedPackage::detached(ControllerLayout::new(id, "Pad", format!("1.{code}"), code));
        package.is_update = current.is_some();
        package.current_index = current;
        package
    }

    fn fresh_catalog() -> (TempDir, Catalog) {
        let dir = TempDir::new().unwrap();
        let catalog = Catalog::init(dir.path()).unwrap();
        (dir, catalog)
    }

    #[test]
    fn test_open_requires_index() {
        let dir = TempDir::new().unwrap();
        assert!(Catalog::open(dir.path()).is_err());
    }

    #[test]
    fn test_init_is_empty() {
        let (dir, catalog) = fresh_catalog();
        assert!(catalog.entries().is_empty());
        assert!(catalog.categories().is_empty());
        assert!(dir.path().join(INDEX_FILE).is_file());
        assert!(dir.path().join(REPO_DIR).is_dir());
    }

    #[test]
    fn test_commit_new_controller() {
        let (dir, catalog) = fresh_catalog();
        let receipt = catalog.commit(&package("pad", 5, None)).unwrap();

        assert_eq!(receipt.previous_version_code, None);
        assert!(receipt.version.history.is_empty());

        let record = catalog.lookup("pad").unwrap();
        assert_eq!(record.version_code(), 5);
        assert!(dir
            .path()
            .join("repo_json/pad/versions/5.json")
            .is_file());
        assert!(dir.path().join("repo_json/pad/screenshots").is_dir());
        assert_eq!(catalog.load_layout("pad").unwrap().version_code, 5);

        // Reopening sees the same state
        let reopened = Catalog::open(dir.path()).unwrap();
        assert_eq!(reopened.lookup("pad").unwrap(), record);
    }

    #[test]
    fn test_history_is_oldest_first() {
        let (_dir, catalog) = fresh_catalog();
        catalog.commit(&package("pad", 5, None)).unwrap();
        catalog
            .commit(&package("pad", 7, catalog.lookup("pad")))
            .unwrap();
        let receipt = catalog
            .commit(&package("pad", 9, catalog.lookup("pad")))
            .unwrap();

        let codes: Vec<i64> = receipt
            .version
            .history
            .iter()
            .map(|v| v.version_code)
            .collect();
        assert_eq!(codes, vec![5, 7]);
        assert_eq!(receipt.version.latest.version_code, 9);
        assert_eq!(receipt.previous_version_code, Some(7));
    }

    #[test]
    fn test_package_history_is_merged() {
        let (_dir, catalog) = fresh_catalog();
        catalog.commit(&package("pad", 5, None)).unwrap();

        let mut update = package("pad", 8, catalog.lookup("pad"));
        update.version_info.history = vec![
            Version::new(5, "dup"),
            Version::new(6, "1.6"),
            Version::new(8, "self"),
        ];
        let receipt = catalog.commit(&update).unwrap();

        let history = &receipt.version.history;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0], Version::new(5, "1.5"));
        assert_eq!(history[1], Version::new(6, "1.6"));
    }

    #[test]
    fn test_stale_snapshot_rejected() {
        let (_dir, catalog) = fresh_catalog();
        let first = package("pad", 5, None);
        let second = package("pad", 6, None);

        catalog.commit(&first).unwrap();
        match catalog.commit(&second).unwrap_err() {
            CatalogError::CommitConflict { reason, .. } => assert_eq!(
                reason,
                ConflictReason::StaleSnapshot {
                    expected: None,
                    found: Some(5)
                }
            ),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(catalog.lookup("pad").unwrap().version_code(), 5);
    }

    #[test]
    fn test_not_newer_rejected() {
        let (_dir, catalog) = fresh_catalog();
        catalog.commit(&package("pad", 5, None)).unwrap();

        let same = package("pad", 5, catalog.lookup("pad"));
        assert!(matches!(
            catalog.commit(&same).unwrap_err(),
            CatalogError::CommitConflict {
                reason: ConflictReason::NotNewer {
                    incoming: 5,
                    latest: 5
                },
                ..
            }
        ));
    }

    #[test]
    fn test_index_entry_replaced_not_duplicated() {
        let (_dir, catalog) = fresh_catalog();
        catalog.commit(&package("pad", 1, None)).unwrap();
        catalog.commit(&package("stick", 1, None)).unwrap();

        let mut update = package("pad", 2, catalog.lookup("pad"));
        update.index_entry.name = "Renamed".to_string();
        catalog.commit(&update).unwrap();

        let entries = catalog.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, "pad");
        assert_eq!(entries[0].name, "Renamed");
    }

    #[test]
    fn test_categories_loaded() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(INDEX_FILE), "[]").unwrap();
        fs::write(
            dir.path().join(CATEGORY_FILE),
            r#"[{"id": 3, "lang": [{"locale": "en", "text": "Racing"}]}]"#,
        )
        .unwrap();

        let catalog = Catalog::open(dir.path()).unwrap();
        let categories = catalog.categories();
        assert_eq!(categories.len(), 1);
        assert_eq!(categories[0].label("en"), Some("Racing"));
    }

    fn with_assets(mut package: ParsedPackage, assets: &Path, screenshots: &[&str]) -> ParsedPackage {
        let icon = assets.join(ICON_FILE);
        fs::write(&icon, b"icon").unwrap();
        package.icon_path = Some(icon);
        package.screenshots = screenshots
            .iter()
            .map(|name| {
                let path = assets.join(name);
                fs::write(&path, b"shot").unwrap();
                path
            })
            .collect();
        package
    }

    fn assert_installed(dir: &Path, catalog: &Catalog, code: i64) {
        assert_eq!(catalog.lookup("pad").unwrap().version_code(), code);

        let on_disk: RepoVersion = read_json(&dir.join("repo_json/pad/version.json")).unwrap();
        assert_eq!(on_disk.latest.version_code, code);

        let reopened = Catalog::open(dir).unwrap();
        assert_eq!(reopened.lookup("pad").unwrap().version_code(), code);
        assert_eq!(reopened.entries().len(), 1);

        assert!(!dir.join("repo_json/.pad.staging").exists());
    }

    #[test]
    fn test_failed_asset_copy_keeps_installed_version() {
        let (dir, catalog) = fresh_catalog();
        let assets = TempDir::new().unwrap();
        catalog
            .commit(&with_assets(package("pad", 5, None), assets.path(), &["1.png"]))
            .unwrap();

        let mut broken = package("pad", 7, catalog.lookup("pad"));
        broken.screenshots = vec![assets.path().join("missing.png")];
        assert!(matches!(
            catalog.commit(&broken).unwrap_err(),
            CatalogError::Io { .. }
        ));

        assert_installed(dir.path(), &catalog, 5);
        let installed = dir.path().join("repo_json/pad");
        assert!(installed.join("screenshots/1.png").is_file());
        assert!(installed.join(ICON_FILE).is_file());
        assert!(!installed.join("versions/7.json").exists());
    }

    #[test]
    fn test_failed_index_write_rolls_back() {
        let (dir, catalog) = fresh_catalog();
        let assets = TempDir::new().unwrap();
        catalog
            .commit(&with_assets(package("pad", 5, None), assets.path(), &["1.png"]))
            .unwrap();

        // A directory where the index temp file goes makes the index write fail
        let blocker = dir.path().join("index.json.tmp");
        fs::create_dir(&blocker).unwrap();

        let update = package("pad", 7, catalog.lookup("pad"));
        assert!(catalog.commit(&update).is_err());

        assert_installed(dir.path(), &catalog, 5);
        let installed = dir.path().join("repo_json/pad");
        assert!(installed.join("screenshots/1.png").is_file());
        assert!(installed.join("versions/5.json").is_file());
        assert!(!installed.join("versions/7.json").exists());
        assert!(!dir.path().join("repo_json/.pad.previous").exists());

        // The same package commits once the obstacle is gone
        fs::remove_dir(&blocker).unwrap();
        catalog.commit(&update).unwrap();
        assert_eq!(catalog.lookup("pad").unwrap().version_code(), 7);
    }

    #[test]
    fn test_update_keeps_icon_and_earlier_layouts() {
        let (dir, catalog) = fresh_catalog();
        let assets = TempDir::new().unwrap();
        catalog
            .commit(&with_assets(package("pad", 5, None), assets.path(), &["1.png"]))
            .unwrap();
        let receipt = catalog
            .commit(&package("pad", 7, catalog.lookup("pad")))
            .unwrap();
        assert_eq!(receipt.screenshots_copied, 0);

        let installed = dir.path().join("repo_json/pad");
        assert!(installed.join(ICON_FILE).is_file());
        assert!(installed.join("versions/5.json").is_file());
        assert!(installed.join("versions/7.json").is_file());
        assert!(!installed.join("screenshots/1.png").exists());
        assert!(!dir.path().join("repo_json/.pad.previous").exists());
    }

    #[test]
    fn test_load_layout_not_installed() {
        let (_dir, catalog) = fresh_catalog();
        assert!(matches!(
            catalog.load_layout("ghost").unwrap_err(),
            CatalogError::NotInstalled(_)
        ));
    }
}

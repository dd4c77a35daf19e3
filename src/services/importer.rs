//! Package import pipeline.
//!
//! An archive moves through `Received → Extracted → SchemaValidated →
//! Classified → Ready`. Any failure stops the pipeline with a [`Rejection`]
//! naming the stage that could not be reached. A ready [`ParsedPackage`] owns
//! the extracted files; committing it is a separate step (see
//! [`crate::services::catalog::Catalog::commit`]).

use std::fmt;
use std::fs::File;
use std::io::{self, Seek};
use std::path::{Path, PathBuf};

use serde::Serialize;
use sha2::{Digest, Sha256};
use tempfile::TempDir;
use thiserror::Error;
use tracing::{debug, info, info_span, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::models::{CatalogRecord, ControllerLayout, IndexEntry, RepoVersion};
use crate::parser::{self, ManifestError};
use crate::services::archive::{self, ExtractedPackage, ExtractionError, ExtractionLimits};
use crate::services::catalog::CatalogLookup;
use crate::services::geometry::{self, GeometryError};
use crate::services::schema::{self, ValidationReport};

/// Pipeline stages, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportStage {
    Received,
    Extracted,
    SchemaValidated,
    Classified,
    Ready,
}

impl fmt::Display for ImportStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Received => "received",
            Self::Extracted => "extracted",
            Self::SchemaValidated => "schema-validated",
            Self::Classified => "classified",
            Self::Ready => "ready",
        };
        f.write_str(name)
    }
}

/// Why a package was refused.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("failed to read package: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error("schema validation failed:\n{0}")]
    SchemaViolation(ValidationReport),

    #[error("layout id '{layout_id}' does not match package directory '{package_dir}'")]
    IdMismatch {
        layout_id: String,
        package_dir: String,
    },

    #[error("version.json declares version code {declared} but the layout has {layout}")]
    VersionMismatch { declared: i64, layout: i64 },

    #[error("version {incoming} of '{controller_id}' is not newer than installed version {installed}")]
    DuplicateOrOlderVersion {
        controller_id: String,
        incoming: i64,
        installed: i64,
    },
}

/// A failed import: the stage that could not be reached and why.
#[derive(Debug, Error)]
#[error("package rejected before stage '{stage}': {error}")]
pub struct Rejection {
    pub stage: ImportStage,
    #[source]
    pub error: ImportError,
}

impl Rejection {
    fn at(stage: ImportStage, error: impl Into<ImportError>) -> Self {
        let error = error.into();
        warn!(%stage, %error, "package rejected");
        Self { stage, error }
    }
}

/// Non-fatal geometry problem found while dry-resolving a package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeometryIssue {
    /// View group the element belongs to
    pub view_group: String,
    #[serde(flatten)]
    pub error: GeometryError,
}

/// Catalog metadata the operator may change before committing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommitOverrides {
    pub name: Option<String>,
    pub introduction: Option<String>,
    pub categories: Option<Vec<i64>>,
    pub author: Option<String>,
    pub description: Option<String>,
}

impl CommitOverrides {
    /// Returns true if no field is overridden.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.introduction.is_none()
            && self.categories.is_none()
            && self.author.is_none()
            && self.description.is_none()
    }
}

/// A validated, classified package ready to be committed.
///
/// Owns the temporary directory holding the extracted files; it is removed
/// on drop or by [`ParsedPackage::cleanup`]. `icon_path` and `screenshots`
/// point into that directory, so commit before cleaning up.
#[derive(Debug, Serialize)]
pub struct ParsedPackage {
    pub controller_id: String,
    pub version_code: i64,
    pub layout: ControllerLayout,
    pub version_info: RepoVersion,
    pub index_entry: IndexEntry,
    pub icon_path: Option<PathBuf>,
    pub screenshots: Vec<PathBuf>,
    /// True if an older version of the controller is installed
    pub is_update: bool,
    /// Installed record the package was classified against
    pub current_index: Option<CatalogRecord>,
    /// SHA-256 of the archive bytes, lowercase hex
    pub digest: String,
    /// Correlates log lines of one import
    pub import_id: Uuid,
    pub geometry_issues: Vec<GeometryIssue>,
    #[serde(skip)]
    temp_dir: Option<TempDir>,
}

impl ParsedPackage {
    /// Directory the package was extracted to, until cleaned up.
    pub fn work_dir(&self) -> Option<&Path> {
        self.temp_dir.as_ref().map(TempDir::path)
    }

    /// Removes the extracted files now instead of on drop.
    pub fn cleanup(&mut self) -> io::Result<()> {
        match self.temp_dir.take() {
            Some(dir) => dir.close(),
            None => Ok(()),
        }
    }

    /// Replaces catalog metadata with operator-provided values.
    pub fn apply_overrides(&mut self, overrides: &CommitOverrides) {
        if let Some(name) = &overrides.name {
            self.index_entry.name.clone_from(name);
        }
        if let Some(introduction) = &overrides.introduction {
            self.index_entry.introduction.clone_from(introduction);
        }
        if let Some(categories) = &overrides.categories {
            self.index_entry.categories.clone_from(categories);
        }
        if let Some(author) = &overrides.author {
            self.version_info.author.clone_from(author);
        }
        if let Some(description) = &overrides.description {
            self.version_info.description.clone_from(description);
        }
    }

    /// Package without extracted files, for exercising catalog commits.
    #[cfg(test)]
    pub(crate) fn detached(layout: ControllerLayout) -> Self {
        Self {
            controller_id: layout.id.clone(),
            version_code: layout.version_code,
            version_info: RepoVersion::from_layout(&layout, 0),
            index_entry: IndexEntry::from_layout(&layout, "en"),
            layout,
            icon_path: None,
            screenshots: Vec::new(),
            is_update: false,
            current_index: None,
            digest: String::new(),
            import_id: Uuid::new_v4(),
            geometry_issues: Vec::new(),
            temp_dir: None,
        }
    }
}

/// Runs the import pipeline against a catalog.
pub struct PackageImporter<'a> {
    catalog: &'a dyn CatalogLookup,
    limits: ExtractionLimits,
    default_lang: String,
    viewport: (f64, f64),
}

impl<'a> PackageImporter<'a> {
    /// Creates an importer using the limits and preview viewport of `config`.
    pub fn new(catalog: &'a dyn CatalogLookup, config: &Config) -> Self {
        Self {
            catalog,
            limits: ExtractionLimits::from(&config.import),
            default_lang: config.import.default_lang.clone(),
            viewport: (
                f64::from(config.preview.viewport_width),
                f64::from(config.preview.viewport_height),
            ),
        }
    }

    /// Imports an archive file.
    ///
    /// The archive is extracted straight from disk and hashed by streaming,
    /// so it is never held in memory as a whole.
    pub fn import_path(&self, path: &Path) -> Result<ParsedPackage, Rejection> {
        let import_id = Uuid::new_v4();
        let span = info_span!("import", %import_id);
        let _enter = span.enter();

        let file = File::open(path).map_err(|e| Rejection::at(ImportStage::Received, e))?;
        debug!(path = %path.display(), "package received");

        let extracted = archive::extract_file(&file, &self.limits)
            .map_err(|e| Rejection::at(ImportStage::Extracted, e))?;
        let digest = stream_digest(&file).map_err(|e| Rejection::at(ImportStage::Extracted, e))?;

        self.process(import_id, digest, extracted)
    }

    /// Imports an archive held in memory.
    pub fn import_bytes(&self, bytes: &[u8]) -> Result<ParsedPackage, Rejection> {
        let import_id = Uuid::new_v4();
        let span = info_span!("import", %import_id);
        let _enter = span.enter();

        debug!(bytes = bytes.len(), "package received");

        let extracted = archive::extract_bytes(bytes, &self.limits)
            .map_err(|e| Rejection::at(ImportStage::Extracted, e))?;
        let digest = format!("{:x}", Sha256::digest(bytes));

        self.process(import_id, digest, extracted)
    }

    /// Runs the stages after extraction.
    fn process(
        &self,
        import_id: Uuid,
        digest: String,
        extracted: ExtractedPackage,
    ) -> Result<ParsedPackage, Rejection> {
        let root = extracted.root();
        let package_dir = extracted.root_name().to_string();
        debug!(package_dir = %package_dir, %digest, "package extracted");

        // SchemaValidated
        let validated = self
            .read_and_validate(&root, &package_dir)
            .map_err(|e| Rejection::at(ImportStage::SchemaValidated, e))?;
        let (layout, version_info, index_entry) = validated;
        let controller_id = layout.id.clone();
        let version_code = layout.version_code;
        debug!(%controller_id, version_code, "schema validated");

        // Classified
        let current_index = self.classify(&controller_id, version_code)?;
        let is_update = current_index.is_some();
        debug!(%controller_id, is_update, "package classified");

        // Ready
        let icon_path = parser::find_icon(&root);
        let screenshots = parser::list_screenshots(&root)
            .map_err(|e| Rejection::at(ImportStage::Ready, e))?;
        let geometry_issues = self.dry_resolve(&layout);
        if !geometry_issues.is_empty() {
            warn!(
                %controller_id,
                issues = geometry_issues.len(),
                "layout has unresolved geometry"
            );
        }

        info!(
            %controller_id,
            version_code,
            is_update,
            screenshots = screenshots.len(),
            "package ready"
        );

        let (temp_dir, _) = extracted.into_parts();
        Ok(ParsedPackage {
            controller_id,
            version_code,
            layout,
            version_info,
            index_entry,
            icon_path,
            screenshots,
            is_update,
            current_index,
            digest,
            import_id,
            geometry_issues,
            temp_dir: Some(temp_dir),
        })
    }

    fn read_and_validate(
        &self,
        root: &Path,
        package_dir: &str,
    ) -> Result<(ControllerLayout, RepoVersion, IndexEntry), ImportError> {
        let declared = parser::read_version_info(root)?;
        let index_entry = parser::read_index_entry(root)?;

        let manifest = parser::select_manifest(
            root,
            declared.as_ref().map(|v| v.latest.version_code),
        )?;
        let layout = parser::parse_layout(root, &manifest)?;

        let report = schema::validate(&layout);
        if !report.is_valid() {
            return Err(ImportError::SchemaViolation(report));
        }

        if layout.id != package_dir {
            return Err(ImportError::IdMismatch {
                layout_id: layout.id,
                package_dir: package_dir.to_string(),
            });
        }

        if let Some(version) = &declared {
            if version.latest.version_code != layout.version_code {
                return Err(ImportError::VersionMismatch {
                    declared: version.latest.version_code,
                    layout: layout.version_code,
                });
            }
        }

        let screenshot_count = parser::list_screenshots(root)?.len();
        let version_info =
            declared.unwrap_or_else(|| RepoVersion::from_layout(&layout, screenshot_count));
        let mut index_entry =
            index_entry.unwrap_or_else(|| IndexEntry::from_layout(&layout, &self.default_lang));
        index_entry.id.clone_from(&layout.id);

        Ok((layout, version_info, index_entry))
    }

    fn classify(
        &self,
        controller_id: &str,
        version_code: i64,
    ) -> Result<Option<CatalogRecord>, Rejection> {
        match self.catalog.lookup(controller_id) {
            None => Ok(None),
            Some(record) if version_code > record.version_code() => Ok(Some(record)),
            Some(record) => Err(Rejection::at(
                ImportStage::Classified,
                ImportError::DuplicateOrOlderVersion {
                    controller_id: controller_id.to_string(),
                    incoming: version_code,
                    installed: record.version_code(),
                },
            )),
        }
    }

    fn dry_resolve(&self, layout: &ControllerLayout) -> Vec<GeometryIssue> {
        let (width, height) = self.viewport;
        geometry::resolve_layout(layout, width, height)
            .into_iter()
            .flat_map(|group| {
                let view_group = group.group_id;
                group
                    .resolution
                    .errors
                    .into_iter()
                    .map(move |error| GeometryIssue {
                        view_group: view_group.clone(),
                        error,
                    })
            })
            .collect()
    }
}

/// SHA-256 of a file's full contents, lowercase hex.
fn stream_digest(mut file: &File) -> io::Result<String> {
    file.rewind()?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BaseInfo, Button, ButtonStyle, Percentage, Version, ViewGroup};
    use std::collections::HashMap;
    use std::io::{Cursor, Write};
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    #[derive(Default)]
    struct MockCatalog {
        records: HashMap<String, CatalogRecord>,
    }

    impl MockCatalog {
        fn with_version(id: &str, code: i64) -> Self {
            let layout = ControllerLayout::new(id, "Pad", "1.0", code);
            let record = CatalogRecord {
                entry: IndexEntry::from_layout(&layout, "en"),
                version: RepoVersion::from_layout(&layout, 0),
            };
            Self {
                records: HashMap::from([(id.to_string(), record)]),
            }
        }
    }

    impl CatalogLookup for MockCatalog {
        fn lookup(&self, controller_id: &str) -> Option<CatalogRecord> {
            self.records.get(controller_id).cloned()
        }
    }

    fn layout(id: &str, code: i64) -> ControllerLayout {
        let mut layout = ControllerLayout::new(id, "Pad", "1.0", code);
        layout.button_styles.push(ButtonStyle::named("default"));
        let mut group = ViewGroup::new("main", "Main");
        group.view_data.button_list.push(Button::new(
            "a",
            "default",
            BaseInfo::absolute(0, 0, 100.0, 100.0),
        ));
        layout.view_groups.push(group);
        layout
    }

    fn zip_package(root: &str, files: &[(&str, String)]) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in files {
            zip.start_file(format!("{root}/{name}"), SimpleFileOptions::default())
                .unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    fn layout_package(layout: &ControllerLayout) -> Vec<u8> {
        zip_package(
            &layout.id,
            &[(
                &format!("versions/{}.json", layout.version_code),
                serde_json::to_string(layout).unwrap(),
            )],
        )
    }

    #[test]
    fn test_new_package_is_ready() {
        let catalog = MockCatalog::default();
        let importer = PackageImporter::new(&catalog, &Config::new());

        let package = importer.import_bytes(&layout_package(&layout("pad", 5))).unwrap();
        assert_eq!(package.controller_id, "pad");
        assert_eq!(package.version_code, 5);
        assert!(!package.is_update);
        assert!(package.current_index.is_none());
        assert_eq!(package.digest.len(), 64);
        assert_eq!(package.index_entry.lang, "zh_CN");
        assert_eq!(package.version_info.latest, Version::new(5, "1.0"));
        assert!(package.geometry_issues.is_empty());
    }

    #[test]
    fn test_update_is_classified() {
        let catalog = MockCatalog::with_version("pad", 5);
        let importer = PackageImporter::new(&catalog, &Config::new());

        let package = importer.import_bytes(&layout_package(&layout("pad", 7))).unwrap();
        assert!(package.is_update);
        assert_eq!(package.current_index.unwrap().version_code(), 5);
    }

    #[test]
    fn test_same_version_is_rejected() {
        let catalog = MockCatalog::with_version("pad", 5);
        let importer = PackageImporter::new(&catalog, &Config::new());

        let rejection = importer
            .import_bytes(&layout_package(&layout("pad", 5)))
            .unwrap_err();
        assert_eq!(rejection.stage, ImportStage::Classified);
        assert!(matches!(
            rejection.error,
            ImportError::DuplicateOrOlderVersion {
                incoming: 5,
                installed: 5,
                ..
            }
        ));
    }

    #[test]
    fn test_schema_violation_is_rejected() {
        let mut bad = layout("pad", 1);
        bad.view_groups[0].view_data.button_list[0].style = "missing".to_string();

        let catalog = MockCatalog::default();
        let importer = PackageImporter::new(&catalog, &Config::new());
        let rejection = importer.import_bytes(&layout_package(&bad)).unwrap_err();

        assert_eq!(rejection.stage, ImportStage::SchemaValidated);
        match rejection.error {
            ImportError::SchemaViolation(report) => assert_eq!(report.violations.len(), 1),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_malformed_manifest_is_rejected() {
        let bytes = zip_package("pad", &[("versions/1.json", "{ nope".to_string())]);
        let catalog = MockCatalog::default();
        let importer = PackageImporter::new(&catalog, &Config::new());

        let rejection = importer.import_bytes(&bytes).unwrap_err();
        assert_eq!(rejection.stage, ImportStage::SchemaValidated);
        assert!(matches!(rejection.error, ImportError::Manifest(_)));
    }

    #[test]
    fn test_id_and_version_consistency() {
        let catalog = MockCatalog::default();
        let importer = PackageImporter::new(&catalog, &Config::new());

        let mismatched_dir = zip_package(
            "other",
            &[(
                "versions/1.json",
                serde_json::to_string(&layout("pad", 1)).unwrap(),
            )],
        );
        assert!(matches!(
            importer.import_bytes(&mismatched_dir).unwrap_err().error,
            ImportError::IdMismatch { .. }
        ));

        let declared = RepoVersion::from_layout(&layout("pad", 9), 0);
        let mismatched_version = zip_package(
            "pad",
            &[
                ("version.json", serde_json::to_string(&declared).unwrap()),
                (
                    "versions/1.json",
                    serde_json::to_string(&layout("pad", 1)).unwrap(),
                ),
            ],
        );
        assert!(matches!(
            importer.import_bytes(&mismatched_version).unwrap_err().error,
            ImportError::VersionMismatch {
                declared: 9,
                layout: 1
            }
        ));
    }

    #[test]
    fn test_geometry_issues_are_warnings() {
        let mut cyclic = layout("pad", 1);
        cyclic.view_groups[0].view_data.button_list.push(Button::new(
            "b",
            "default",
            BaseInfo::percentage(
                0,
                0,
                Percentage::of_element("b", 1.0),
                Percentage::of_screen_height(0.1),
            ),
        ));

        let catalog = MockCatalog::default();
        let importer = PackageImporter::new(&catalog, &Config::new());
        let package = importer.import_bytes(&layout_package(&cyclic)).unwrap();

        assert_eq!(package.geometry_issues.len(), 1);
        assert_eq!(package.geometry_issues[0].view_group, "main");
        assert_eq!(package.geometry_issues[0].error.element, "b");
    }

    #[test]
    fn test_import_path_streams_digest() {
        let bytes = layout_package(&layout("pad", 3));
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pad.zip");
        std::fs::write(&path, &bytes).unwrap();

        let catalog = MockCatalog::default();
        let importer = PackageImporter::new(&catalog, &Config::new());
        let from_file = importer.import_path(&path).unwrap();
        let from_bytes = importer.import_bytes(&bytes).unwrap();

        assert_eq!(from_file.controller_id, "pad");
        assert_eq!(from_file.version_code, 3);
        assert_eq!(from_file.digest, format!("{:x}", Sha256::digest(&bytes)));
        assert_eq!(from_file.digest, from_bytes.digest);
    }

    #[test]
    fn test_import_path_rejects_oversized_archive() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pad.zip");
        std::fs::write(&path, layout_package(&layout("pad", 3))).unwrap();

        let mut config = Config::new();
        config.import.max_archive_bytes = 16;
        let catalog = MockCatalog::default();
        let rejection = PackageImporter::new(&catalog, &config)
            .import_path(&path)
            .unwrap_err();

        assert_eq!(rejection.stage, ImportStage::Extracted);
        assert!(matches!(
            rejection.error,
            ImportError::Extraction(ExtractionError::ArchiveTooLarge { limit: 16, .. })
        ));
    }

    #[test]
    fn test_import_path_missing_file() {
        let dir = TempDir::new().unwrap();
        let catalog = MockCatalog::default();
        let rejection = PackageImporter::new(&catalog, &Config::new())
            .import_path(&dir.path().join("absent.zip"))
            .unwrap_err();

        assert_eq!(rejection.stage, ImportStage::Received);
        assert!(matches!(rejection.error, ImportError::Io(_)));
    }

    #[test]
    fn test_cleanup_removes_work_dir() {
        let catalog = MockCatalog::default();
        let importer = PackageImporter::new(&catalog, &Config::new());
        let mut package = importer.import_bytes(&layout_package(&layout("pad", 1))).unwrap();

        let dir = package.work_dir().unwrap().to_path_buf();
        assert!(dir.exists());
        package.cleanup().unwrap();
        assert!(!dir.exists());
        assert!(package.work_dir().is_none());
        package.cleanup().unwrap();
    }

    #[test]
    fn test_overrides() {
        let catalog = MockCatalog::default();
        let importer = PackageImporter::new(&catalog, &Config::new());
        let mut package = importer.import_bytes(&layout_package(&layout("pad", 1))).unwrap();

        package.apply_overrides(&CommitOverrides {
            name: Some("Racing Pad".to_string()),
            categories: Some(vec![2, 4]),
            author: Some("someone".to_string()),
            ..CommitOverrides::default()
        });

        assert_eq!(package.index_entry.name, "Racing Pad");
        assert_eq!(package.index_entry.categories, vec![2, 4]);
        assert_eq!(package.version_info.author, "someone");
        assert!(CommitOverrides::default().is_empty());
    }
}

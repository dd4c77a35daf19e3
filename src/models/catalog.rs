//! Catalog records: index entries, categories and version ledgers.

use serde::{Deserialize, Serialize};

use crate::models::layout::ControllerLayout;

/// Localized catalog facade over an installed controller.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexEntry {
    /// Controller id
    pub id: String,
    /// Locale of `name` and `introduction` (e.g. "zh_CN")
    pub lang: String,
    /// Display name
    pub name: String,
    /// Short introduction text
    pub introduction: String,
    /// Supported device codes
    pub device: Vec<i64>,
    /// Category ids (see [`Category`])
    pub categories: Vec<i64>,
}

impl IndexEntry {
    /// Builds an entry from a layout when a package ships no `index.json`.
    pub fn from_layout(layout: &ControllerLayout, lang: &str) -> Self {
        Self {
            id: layout.id.clone(),
            lang: lang.to_string(),
            name: layout.name.clone(),
            introduction: layout.description.clone(),
            device: Vec::new(),
            categories: Vec::new(),
        }
    }
}

/// One translation of a category label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizedText {
    pub locale: String,
    pub text: String,
}

/// Catalog category, labelled per locale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    #[serde(default)]
    pub lang: Vec<LocalizedText>,
}

impl Category {
    /// Label for `locale`, falling back to the first translation.
    pub fn label(&self, locale: &str) -> Option<&str> {
        self.lang
            .iter()
            .find(|text| text.locale == locale)
            .or_else(|| self.lang.first())
            .map(|text| text.text.as_str())
    }
}

/// A released version.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Version {
    pub version_code: i64,
    #[serde(default)]
    pub version_name: String,
}

impl Version {
    /// Creates a version.
    pub fn new(version_code: i64, version_name: impl Into<String>) -> Self {
        Self {
            version_code,
            version_name: version_name.into(),
        }
    }
}

/// Per-controller version ledger (`version.json`).
///
/// `history` is ordered oldest to newest: ascending `versionCode`, with the
/// most recently superseded release last.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RepoVersion {
    /// Number of screenshots shipped
    pub screenshot: i64,
    pub description: String,
    pub author: String,
    pub latest: Version,
    pub history: Vec<Version>,
}

impl RepoVersion {
    /// Builds a ledger from a layout when a package ships no `version.json`.
    pub fn from_layout(layout: &ControllerLayout, screenshots: usize) -> Self {
        Self {
            screenshot: i64::try_from(screenshots).unwrap_or(i64::MAX),
            description: layout.description.clone(),
            author: layout.author.clone(),
            latest: Version::new(layout.version_code, layout.version.clone()),
            history: Vec::new(),
        }
    }
}

/// Installed controller as seen by lookups: index entry plus version ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogRecord {
    pub entry: IndexEntry,
    pub version: RepoVersion,
}

impl CatalogRecord {
    /// Latest installed version code.
    pub const fn version_code(&self) -> i64 {
        self.version.latest.version_code
    }
}

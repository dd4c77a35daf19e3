//! Application-wide constants.
//!
//! This module defines constants used throughout the application,
//! including the application name and the catalog file layout.

/// The display name of the application (human-readable, with proper capitalization).
pub const APP_NAME: &str = "Controller Auditor";

/// The binary name of the application (used in command examples, lowercase with hyphens).
pub const APP_BINARY_NAME: &str = "controller-auditor";

/// Directory name under the platform config directory.
pub const APP_CONFIG_DIR_NAME: &str = "ControllerAuditor";

/// Environment variable that replaces the platform config directory.
pub const CONFIG_DIR_ENV: &str = "CONTROLLER_AUDITOR_CONFIG_DIR";

/// Catalog index file, relative to the repository root.
pub const INDEX_FILE: &str = "index.json";

/// Category list, relative to the repository root.
pub const CATEGORY_FILE: &str = "category.json";

/// Directory holding one subdirectory per installed controller.
pub const REPO_DIR: &str = "repo_json";

/// Version ledger file of a controller (also used inside packages).
pub const VERSION_FILE: &str = "version.json";

/// Directory of per-version layout manifests.
pub const VERSIONS_DIR: &str = "versions";

/// Icon asset file name.
pub const ICON_FILE: &str = "icon.png";

/// Directory of screenshot assets.
pub const SCREENSHOTS_DIR: &str = "screenshots";

//! Parsing for controller package files.
//!
//! This module reads the JSON documents and assets of an extracted package:
//! the version ledger, the index entry, the layout manifest and its images.

pub mod package;

// Re-export commonly used functions
pub use package::{
    find_icon, list_screenshots, parse_layout, read_index_entry, read_version_info,
    select_manifest, ManifestError,
};

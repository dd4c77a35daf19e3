//! Service layer for business logic.
//!
//! Schema validation, geometry resolution, archive extraction, the catalog
//! and the import pipeline that ties them together.

pub mod archive;
pub mod catalog;
pub mod geometry;
pub mod importer;
pub mod schema;

// Re-export commonly used types and functions
pub use catalog::{Catalog, CatalogError, CatalogLookup, CommitReceipt, ConflictReason};
pub use geometry::{resolve, resolve_layout, GeometryError, GeometryErrorKind, Resolution};
pub use importer::{
    CommitOverrides, ImportError, ImportStage, PackageImporter, ParsedPackage, Rejection,
};
pub use schema::{validate, ValidationReport, Violation, ViolationKind};

//! Data models for controller layouts and catalog records.
//!
//! Models mirror the JSON wire format of controller packages and are
//! independent of validation, resolution and storage logic.

pub mod base_info;
pub mod catalog;
pub mod layout;

// Re-export all model types
pub use base_info::{
    BaseInfo, Percentage, Reference, SizeDefect, SizeSpec, VisibilityType, SCREEN_HEIGHT,
    SCREEN_WIDTH,
};
pub use catalog::{CatalogRecord, Category, IndexEntry, LocalizedText, RepoVersion, Version};
pub use layout::{
    Button, ButtonStyle, ControllerLayout, Direction, DirectionStyle, Event, GroupVisibility,
    PressEvent, RockerStyle, ViewData, ViewGroup,
};

//! Shared test fixtures for integration and E2E CLI tests.
#![allow(dead_code)] // Each test binary uses a different subset

use controller_auditor::models::{
    BaseInfo, Button, ButtonStyle, ControllerLayout, Direction, DirectionStyle, Percentage,
    RepoVersion, Version, ViewGroup,
};
use controller_auditor::services::catalog::Catalog;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// Creates a valid layout with one visible view group.
///
/// The group holds an absolute button `a`, a button `b` sized relative to
/// `a`, and a direction pad sized relative to the viewport.
pub fn test_layout(id: &str, version_code: i64) -> ControllerLayout {
    let mut layout = ControllerLayout::new(
        id,
        "Test Pad",
        format!("1.{version_code}"),
        version_code,
    );
    layout.author = "Test Suite".to_string();
    layout.description = "E2E test layout".to_string();
    layout.controller_version = 1;
    layout.button_styles.push(ButtonStyle::named("default"));
    layout.direction_styles.push(DirectionStyle::named("rocker"));

    let mut group = ViewGroup::new("main", "Main");
    group.view_data.button_list.push(Button::new(
        "a",
        "default",
        BaseInfo::absolute(10, 20, 1000.0, 400.0),
    ));
    group.view_data.button_list.push(Button::new(
        "b",
        "default",
        BaseInfo::percentage(
            0,
            0,
            Percentage::of_element("a", 0.5),
            Percentage::of_element("a", 0.25),
        ),
    ));
    group.view_data.direction_list.push(Direction::new(
        "dpad",
        "rocker",
        BaseInfo::percentage(
            0,
            0,
            Percentage::of_screen_width(0.1),
            Percentage::of_screen_height(0.2),
        ),
    ));
    layout.view_groups.push(group);

    layout
}

/// Creates a layout whose button references an undefined style.
pub fn test_layout_with_missing_style(id: &str) -> ControllerLayout {
    let mut layout = test_layout(id, 1);
    layout.view_groups[0].view_data.button_list[0].style = "missing".to_string();
    layout
}

/// Creates a layout whose two buttons size against each other.
pub fn test_layout_with_cycle(id: &str, version_code: i64) -> ControllerLayout {
    let mut layout = test_layout(id, version_code);
    let buttons = &mut layout.view_groups[0].view_data.button_list;
    buttons[0].base_info = BaseInfo::percentage(
        0,
        0,
        Percentage::of_element("b", 1.0),
        Percentage::of_element("b", 1.0),
    );
    layout
}

/// Writes a layout manifest to a temp directory.
///
/// # Returns
/// Tuple of (manifest path, temp dir). Keep the `TempDir` alive for the
/// duration of the test.
pub fn create_temp_manifest(layout: &ControllerLayout) -> (PathBuf, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir
        .path()
        .join(format!("{}.json", layout.version_code));
    let json = serde_json::to_string_pretty(layout).expect("Failed to serialize layout");
    fs::write(&path, json).expect("Failed to write manifest");
    (path, temp_dir)
}

/// Builds a package archive in memory.
///
/// Every file is placed under `<layout.id>/`: the manifest at
/// `versions/<code>.json`, a `version.json` ledger, and `extras` verbatim.
pub fn package_bytes(layout: &ControllerLayout, extras: &[(&str, &[u8])]) -> Vec<u8> {
    let version = RepoVersion {
        screenshot: 0,
        description: layout.description.clone(),
        author: layout.author.clone(),
        latest: Version::new(layout.version_code, layout.version.clone()),
        history: Vec::new(),
    };

    let manifest = serde_json::to_vec(layout).expect("Failed to serialize layout");
    let ledger = serde_json::to_vec(&version).expect("Failed to serialize version");
    let manifest_name = format!("versions/{}.json", layout.version_code);

    let mut files: Vec<(String, &[u8])> = vec![
        (manifest_name, manifest.as_slice()),
        ("version.json".to_string(), ledger.as_slice()),
    ];
    files.extend(extras.iter().map(|(name, data)| ((*name).to_string(), *data)));

    let entries: Vec<(String, &[u8])> = files
        .into_iter()
        .map(|(name, data)| (format!("{}/{name}", layout.id), data))
        .collect();
    raw_zip(&entries)
}

/// Builds an archive with entry names taken as-is (no root prefix).
pub fn raw_zip(entries: &[(String, &[u8])]) -> Vec<u8> {
    let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
    for (name, data) in entries {
        zip.start_file(name.as_str(), SimpleFileOptions::default())
            .expect("Failed to start zip entry");
        zip.write_all(data).expect("Failed to write zip entry");
    }
    zip.finish().expect("Failed to finish zip").into_inner()
}

/// Writes a package archive for `layout` into `dir`.
pub fn write_package_zip(dir: &Path, layout: &ControllerLayout, extras: &[(&str, &[u8])]) -> PathBuf {
    let path = dir.join(format!("{}-{}.zip", layout.id, layout.version_code));
    fs::write(&path, package_bytes(layout, extras)).expect("Failed to write package");
    path
}

/// Creates an empty catalog in a fresh temp directory.
pub fn init_repo() -> (Catalog, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let catalog = Catalog::init(temp_dir.path()).expect("Failed to init catalog");
    (catalog, temp_dir)
}

/// A tiny stand-in for PNG bytes; the importer never decodes images.
pub const FAKE_PNG: &[u8] = b"\x89PNG\r\n\x1a\nfake";

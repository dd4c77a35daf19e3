//! Structural validation of controller layouts.
//!
//! Checks run in a fixed order. The first check that finds anything stops the
//! walk, but reports every violation of its own kind so authors can fix a whole
//! class of defects at once. Validation is pure: the same layout always yields
//! the same report.

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use crate::models::{BaseInfo, ControllerLayout, SizeDefect, SizeSpec, VisibilityType};

/// Ordered validation stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaCheck {
    /// Layout identity and version fields
    Identity,
    /// Style names resolve to presets
    StyleRefs,
    /// Element ids unique within a view data
    UniqueElementIds,
    /// `bindViewGroup` targets exist
    BindTargets,
    /// Sizing and visibility discriminants
    Geometry,
}

impl SchemaCheck {
    /// Every check in execution order.
    pub const ALL: [Self; 5] = [
        Self::Identity,
        Self::StyleRefs,
        Self::UniqueElementIds,
        Self::BindTargets,
        Self::Geometry,
    ];
}

impl fmt::Display for SchemaCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Identity => "identity",
            Self::StyleRefs => "style references",
            Self::UniqueElementIds => "unique element ids",
            Self::BindTargets => "bind targets",
            Self::Geometry => "geometry",
        };
        f.write_str(name)
    }
}

/// Kind of structural defect.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ViolationKind {
    /// A required string field is empty
    EmptyField,
    /// `versionCode` is below zero
    NegativeVersionCode(i64),
    /// Button style not present in `buttonStyles`
    UnknownButtonStyle(String),
    /// Direction style not present in `directionStyles`
    UnknownDirectionStyle(String),
    /// Element id used more than once in the same view data
    DuplicateElementId(String),
    /// `bindViewGroup` names a view group that does not exist
    UnknownViewGroup(String),
    /// `sizeType` is not a recognized value
    UnknownSizeType(String),
    /// Width/height fields required by `sizeType` are absent
    MissingSizeField(String),
    /// A width, height or percentage size is below zero
    NegativeSize(f64),
    /// `visibilityType` is not a recognized value
    UnknownVisibilityType(String),
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyField => write!(f, "must not be empty"),
            Self::NegativeVersionCode(code) => write!(f, "negative versionCode {code}"),
            Self::UnknownButtonStyle(name) => write!(f, "unknown button style '{name}'"),
            Self::UnknownDirectionStyle(name) => write!(f, "unknown direction style '{name}'"),
            Self::DuplicateElementId(id) => write!(f, "duplicate element id '{id}'"),
            Self::UnknownViewGroup(id) => write!(f, "unknown view group '{id}'"),
            Self::UnknownSizeType(raw) if raw.is_empty() => write!(f, "missing sizeType"),
            Self::UnknownSizeType(raw) => write!(f, "unknown sizeType '{raw}'"),
            Self::MissingSizeField(field) => write!(f, "missing {field}"),
            Self::NegativeSize(value) => write!(f, "negative size {value}"),
            Self::UnknownVisibilityType(raw) => write!(f, "unknown visibilityType '{raw}'"),
        }
    }
}

/// One defect at one entity path.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    /// Entity path, e.g. `viewGroups[0].viewData.buttonList[2].style`
    pub path: String,
    /// What is wrong
    #[serde(flatten)]
    pub kind: ViolationKind,
}

impl Violation {
    fn new(path: impl Into<String>, kind: ViolationKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.kind)
    }
}

/// Outcome of validating one layout.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ValidationReport {
    /// The check that produced the violations, if any failed
    pub failed_check: Option<SchemaCheck>,
    /// Every violation found by that check
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    /// Returns true if no check failed.
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    /// Formats the report as a numbered list.
    pub fn format_message(&self) -> String {
        use std::fmt::Write as _;

        let mut message = String::new();
        if self.violations.is_empty() {
            return message;
        }

        let _ = writeln!(message, "{} schema violations:", self.violations.len());
        for (idx, violation) in self.violations.iter().enumerate() {
            let _ = writeln!(message, "  {}. {}", idx + 1, violation);
        }
        message
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.format_message().trim_end())
    }
}

/// Validates `layout`, stopping at the first check that finds violations.
pub fn validate(layout: &ControllerLayout) -> ValidationReport {
    for check in SchemaCheck::ALL {
        let violations = run_check(check, layout);
        if !violations.is_empty() {
            return ValidationReport {
                failed_check: Some(check),
                violations,
            };
        }
    }
    ValidationReport::default()
}

/// Runs a single check and returns all of its violations.
pub fn run_check(check: SchemaCheck, layout: &ControllerLayout) -> Vec<Violation> {
    match check {
        SchemaCheck::Identity => check_identity(layout),
        SchemaCheck::StyleRefs => check_style_refs(layout),
        SchemaCheck::UniqueElementIds => check_unique_ids(layout),
        SchemaCheck::BindTargets => check_bind_targets(layout),
        SchemaCheck::Geometry => check_geometry(layout),
    }
}

fn button_path(group: usize, idx: usize) -> String {
    format!("viewGroups[{group}].viewData.buttonList[{idx}]")
}

fn direction_path(group: usize, idx: usize) -> String {
    format!("viewGroups[{group}].viewData.directionList[{idx}]")
}

fn check_identity(layout: &ControllerLayout) -> Vec<Violation> {
    let mut violations = Vec::new();

    for (field, value) in [
        ("id", &layout.id),
        ("name", &layout.name),
        ("version", &layout.version),
    ] {
        if value.trim().is_empty() {
            violations.push(Violation::new(field, ViolationKind::EmptyField));
        }
    }

    if layout.version_code < 0 {
        violations.push(Violation::new(
            "versionCode",
            ViolationKind::NegativeVersionCode(layout.version_code),
        ));
    }

    violations
}

fn check_style_refs(layout: &ControllerLayout) -> Vec<Violation> {
    let button_styles: HashSet<&str> = layout
        .button_styles
        .iter()
        .map(|s| s.name.as_str())
        .collect();
    let direction_styles: HashSet<&str> = layout
        .direction_styles
        .iter()
        .map(|s| s.name.as_str())
        .collect();

    let mut violations = Vec::new();
    for (g, group) in layout.view_groups.iter().enumerate() {
        for (i, button) in group.view_data.button_list.iter().enumerate() {
            if !button_styles.contains(button.style.as_str()) {
                violations.push(Violation::new(
                    format!("{}.style", button_path(g, i)),
                    ViolationKind::UnknownButtonStyle(button.style.clone()),
                ));
            }
        }
        for (i, direction) in group.view_data.direction_list.iter().enumerate() {
            if !direction_styles.contains(direction.style.as_str()) {
                violations.push(Violation::new(
                    format!("{}.style", direction_path(g, i)),
                    ViolationKind::UnknownDirectionStyle(direction.style.clone()),
                ));
            }
        }
    }
    violations
}

fn check_unique_ids(layout: &ControllerLayout) -> Vec<Violation> {
    let mut violations = Vec::new();

    for (g, group) in layout.view_groups.iter().enumerate() {
        let mut seen = HashSet::new();
        let ids = group
            .view_data
            .button_list
            .iter()
            .enumerate()
            .map(|(i, b)| (button_path(g, i), b.id.as_str()))
            .chain(
                group
                    .view_data
                    .direction_list
                    .iter()
                    .enumerate()
                    .map(|(i, d)| (direction_path(g, i), d.id.as_str())),
            );

        for (path, id) in ids {
            if !seen.insert(id) {
                violations.push(Violation::new(
                    format!("{path}.id"),
                    ViolationKind::DuplicateElementId(id.to_string()),
                ));
            }
        }
    }
    violations
}

fn check_bind_targets(layout: &ControllerLayout) -> Vec<Violation> {
    let group_ids: HashSet<&str> = layout.view_groups.iter().map(|g| g.id.as_str()).collect();

    let mut violations = Vec::new();
    for (g, group) in layout.view_groups.iter().enumerate() {
        for (i, button) in group.view_data.button_list.iter().enumerate() {
            for (b, target) in button.event.press_event.bind_view_group.iter().enumerate() {
                if !group_ids.contains(target.as_str()) {
                    violations.push(Violation::new(
                        format!("{}.event.pressEvent.bindViewGroup[{b}]", button_path(g, i)),
                        ViolationKind::UnknownViewGroup(target.clone()),
                    ));
                }
            }
        }
    }
    violations
}

fn check_geometry(layout: &ControllerLayout) -> Vec<Violation> {
    let mut violations = Vec::new();
    for (g, group) in layout.view_groups.iter().enumerate() {
        for (i, button) in group.view_data.button_list.iter().enumerate() {
            check_base_info(
                &format!("{}.baseInfo", button_path(g, i)),
                &button.base_info,
                &mut violations,
            );
        }
        for (i, direction) in group.view_data.direction_list.iter().enumerate() {
            check_base_info(
                &format!("{}.baseInfo", direction_path(g, i)),
                &direction.base_info,
                &mut violations,
            );
        }
    }
    violations
}

fn check_base_info(path: &str, info: &BaseInfo, violations: &mut Vec<Violation>) {
    if let VisibilityType::Unrecognized(raw) = &info.visibility {
        violations.push(Violation::new(
            format!("{path}.visibilityType"),
            ViolationKind::UnknownVisibilityType(raw.clone()),
        ));
    }

    match &info.size {
        SizeSpec::Absolute { width, height } => {
            for (field, value) in [("absoluteWidth", *width), ("absoluteHeight", *height)] {
                if value < 0.0 {
                    violations.push(Violation::new(
                        format!("{path}.{field}"),
                        ViolationKind::NegativeSize(value),
                    ));
                }
            }
        }
        SizeSpec::Percentage { width, height } => {
            for (field, value) in [
                ("percentageWidth.size", width.size),
                ("percentageHeight.size", height.size),
            ] {
                if value < 0.0 {
                    violations.push(Violation::new(
                        format!("{path}.{field}"),
                        ViolationKind::NegativeSize(value),
                    ));
                }
            }
        }
        SizeSpec::Malformed(SizeDefect::UnknownSizeType(raw)) => {
            violations.push(Violation::new(
                format!("{path}.sizeType"),
                ViolationKind::UnknownSizeType(raw.clone()),
            ));
        }
        SizeSpec::Malformed(SizeDefect::MissingFields(fields)) => {
            for field in fields {
                violations.push(Violation::new(
                    format!("{path}.{field}"),
                    ViolationKind::MissingSizeField((*field).to_string()),
                ));
            }
        }
    }
}

//! Controller layout entity graph.
//!
//! A [`ControllerLayout`] is the root of a package manifest. Cross references
//! (`style`, `bindViewGroup`, percentage references) are plain ids resolved at
//! validation or resolution time, never structural pointers.

use serde::{Deserialize, Serialize};

use crate::models::base_info::BaseInfo;

/// Root entity of a controller package.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControllerLayout {
    /// Controller identity, shared by every version of the same controller
    #[serde(default)]
    pub id: String,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Human readable version (e.g. "1.2.0")
    #[serde(default)]
    pub version: String,
    /// Monotonic version number; must strictly increase between releases
    #[serde(default)]
    pub version_code: i64,
    /// Author name
    #[serde(default)]
    pub author: String,
    /// Free-form description
    #[serde(default)]
    pub description: String,
    /// Schema number of the layout format
    #[serde(default)]
    pub controller_version: i64,
    /// Button presets referenced by `Button::style`
    #[serde(default)]
    pub button_styles: Vec<ButtonStyle>,
    /// Direction presets referenced by `Direction::style`
    #[serde(default)]
    pub direction_styles: Vec<DirectionStyle>,
    /// Independently toggleable layers
    #[serde(default)]
    pub view_groups: Vec<ViewGroup>,
}

impl ControllerLayout {
    /// Creates an empty layout with identity and version set.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
        version_code: i64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            version: version.into(),
            version_code,
            ..Self::default()
        }
    }

    /// Looks up a view group by id.
    pub fn view_group(&self, id: &str) -> Option<&ViewGroup> {
        self.view_groups.iter().find(|group| group.id == id)
    }

    /// Total number of positioned elements across all view groups.
    pub fn element_count(&self) -> usize {
        self.view_groups
            .iter()
            .map(|group| group.view_data.len())
            .sum()
    }
}

/// Visual preset for buttons. Colors are ARGB packed integers.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ButtonStyle {
    pub name: String,
    pub text_color: i64,
    pub text_size: i64,
    pub stroke_color: i64,
    pub stroke_width: i64,
    pub corner_radius: i64,
    pub fill_color: i64,
    pub text_color_pressed: i64,
    pub text_size_pressed: i64,
    pub stroke_color_pressed: i64,
    pub stroke_width_pressed: i64,
    pub corner_radius_pressed: i64,
    pub fill_color_pressed: i64,
}

impl ButtonStyle {
    /// Style with only a name; every metric zeroed.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Visual preset for directional pads.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DirectionStyle {
    pub name: String,
    pub style_type: String,
    pub button_style: ButtonStyle,
    pub rocker_style: RockerStyle,
}

impl DirectionStyle {
    /// Style with only a name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Rocker (joystick-like) drawing parameters of a direction style.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RockerStyle {
    pub rocker_size: i64,
    pub bg_corner_radius: i64,
    pub bg_stroke_width: i64,
    pub bg_stroke_color: i64,
    pub bg_fill_color: i64,
    pub rocker_corner_radius: i64,
    pub rocker_stroke_width: i64,
    pub rocker_stroke_color: i64,
    pub rocker_fill_color: i64,
}

/// Layer visibility of a view group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GroupVisibility {
    /// Shown when the controller loads
    #[default]
    Visible,
    /// Hidden until toggled by a bound button
    Invisible,
}

/// A named, independently toggleable layer of elements.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewGroup {
    /// Group id, target of `bindViewGroup`
    #[serde(default)]
    pub id: String,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Layer visibility
    #[serde(default)]
    pub visibility: GroupVisibility,
    /// Positioned elements of this layer
    #[serde(default)]
    pub view_data: ViewData,
}

impl ViewGroup {
    /// Creates an empty, visible group.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Ordered element lists of a view group.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewData {
    #[serde(default)]
    pub button_list: Vec<Button>,
    #[serde(default)]
    pub direction_list: Vec<Direction>,
}

impl ViewData {
    /// Number of elements.
    pub fn len(&self) -> usize {
        self.button_list.len() + self.direction_list.len()
    }

    /// Returns true if there are no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every element as `(id, geometry)`, buttons first, in declaration order.
    pub fn elements(&self) -> impl Iterator<Item = (&str, &BaseInfo)> {
        self.button_list
            .iter()
            .map(|b| (b.id.as_str(), &b.base_info))
            .chain(
                self.direction_list
                    .iter()
                    .map(|d| (d.id.as_str(), &d.base_info)),
            )
    }
}

/// A pressable element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Button {
    pub id: String,
    #[serde(default)]
    pub text: String,
    /// Name of a `buttonStyles` entry
    #[serde(default)]
    pub style: String,
    pub base_info: BaseInfo,
    #[serde(default)]
    pub event: Event,
}

impl Button {
    /// Creates a button with no text and a default event.
    pub fn new(id: impl Into<String>, style: impl Into<String>, base_info: BaseInfo) -> Self {
        Self {
            id: id.into(),
            text: String::new(),
            style: style.into(),
            base_info,
            event: Event::default(),
        }
    }
}

/// A directional pad element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Direction {
    pub id: String,
    /// Name of a `directionStyles` entry
    #[serde(default)]
    pub style: String,
    pub base_info: BaseInfo,
}

impl Direction {
    /// Creates a direction pad.
    pub fn new(id: impl Into<String>, style: impl Into<String>, base_info: BaseInfo) -> Self {
        Self {
            id: id.into(),
            style: style.into(),
            base_info,
        }
    }
}

/// Input binding behaviour of a button.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Event {
    pub pointer_follow: bool,
    // The upstream format capitalizes this one field
    #[serde(rename = "Movable")]
    pub movable: bool,
    pub press_event: PressEvent,
}

/// What happens when a button is pressed.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PressEvent {
    pub auto_keep: bool,
    pub auto_click: bool,
    pub open_menu: bool,
    pub switch_touch_mode: bool,
    pub input: bool,
    pub quick_input: bool,
    pub output_text: String,
    pub output_keycodes: Vec<i64>,
    /// View group ids toggled by this button
    pub bind_view_group: Vec<String>,
}

//! Geometry specification shared by every positioned element.
//!
//! On the wire `baseInfo` is a flat record with a `sizeType` string that says
//! which width/height fields are authoritative. In memory the discriminants
//! become sum types so that code never branches on raw strings.
//!
//! Unrecognized discriminants and missing authoritative fields are kept as
//! explicit variants ([`VisibilityType::Unrecognized`], [`SizeSpec::Malformed`])
//! instead of failing deserialization, so one bad element never prevents the
//! schema validator from reporting on the rest of a layout.

use serde::{Deserialize, Serialize};

/// Sentinel reference meaning "the viewport width".
pub const SCREEN_WIDTH: &str = "SCREEN_WIDTH";
/// Sentinel reference meaning "the viewport height".
pub const SCREEN_HEIGHT: &str = "SCREEN_HEIGHT";

const SIZE_TYPE_ABSOLUTE: &str = "ABSOLUTE";
const SIZE_TYPE_PERCENTAGE: &str = "PERCENTAGE";

/// Whether an element renders.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum VisibilityType {
    /// Always rendered
    #[default]
    Visible,
    /// Never rendered, but still takes part in geometry resolution
    Hidden,
    /// Rendered depending on runtime state (e.g. in-game only)
    Conditional,
    /// Any other value found in a manifest
    Unrecognized(String),
}

impl VisibilityType {
    /// Wire representation.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Visible => "VISIBLE",
            Self::Hidden => "HIDDEN",
            Self::Conditional => "CONDITIONAL",
            Self::Unrecognized(raw) => raw,
        }
    }

    /// Returns true if an element with this visibility may be drawn.
    pub fn is_renderable(&self) -> bool {
        matches!(self, Self::Visible | Self::Conditional)
    }
}

impl From<String> for VisibilityType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "VISIBLE" => Self::Visible,
            "HIDDEN" => Self::Hidden,
            "CONDITIONAL" => Self::Conditional,
            _ => Self::Unrecognized(value),
        }
    }
}

impl From<VisibilityType> for String {
    fn from(value: VisibilityType) -> Self {
        match value {
            VisibilityType::Unrecognized(raw) => raw,
            other => other.as_str().to_string(),
        }
    }
}

/// Target of a percentage size.
///
/// Element references are weak: they name another element of the same
/// `ViewData` by id and are only looked up at validation or resolution time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Reference {
    /// Viewport width
    ScreenWidth,
    /// Viewport height
    ScreenHeight,
    /// Another element, by id
    Element(String),
}

impl Reference {
    /// Returns the referenced element id, or `None` for viewport sentinels.
    pub fn element_id(&self) -> Option<&str> {
        match self {
            Self::Element(id) => Some(id),
            Self::ScreenWidth | Self::ScreenHeight => None,
        }
    }
}

impl From<String> for Reference {
    fn from(value: String) -> Self {
        match value.as_str() {
            SCREEN_WIDTH => Self::ScreenWidth,
            SCREEN_HEIGHT => Self::ScreenHeight,
            _ => Self::Element(value),
        }
    }
}

impl From<Reference> for String {
    fn from(value: Reference) -> Self {
        match value {
            Reference::ScreenWidth => SCREEN_WIDTH.to_string(),
            Reference::ScreenHeight => SCREEN_HEIGHT.to_string(),
            Reference::Element(id) => id,
        }
    }
}

/// A size expressed as a fraction of another dimension.
///
/// `size` is not clamped: values above 1.0 mean "larger than the reference".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Percentage {
    /// What the fraction is taken of
    pub reference: Reference,
    /// The fraction
    pub size: f64,
}

impl Percentage {
    /// Fraction of the viewport width.
    pub const fn of_screen_width(size: f64) -> Self {
        Self {
            reference: Reference::ScreenWidth,
            size,
        }
    }

    /// Fraction of the viewport height.
    pub const fn of_screen_height(size: f64) -> Self {
        Self {
            reference: Reference::ScreenHeight,
            size,
        }
    }

    /// Fraction of another element's matching dimension.
    pub fn of_element(id: impl Into<String>, size: f64) -> Self {
        Self {
            reference: Reference::Element(id.into()),
            size,
        }
    }
}

/// Why a `baseInfo` could not be turned into a usable size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SizeDefect {
    /// `sizeType` is neither `ABSOLUTE` nor `PERCENTAGE` (empty when absent)
    UnknownSizeType(String),
    /// Authoritative fields for the declared `sizeType` are absent
    MissingFields(Vec<&'static str>),
}

/// Sizing mode of an element.
#[derive(Debug, Clone, PartialEq)]
pub enum SizeSpec {
    /// Literal width and height in device pixels
    Absolute {
        /// Width in pixels
        width: f64,
        /// Height in pixels
        height: f64,
    },
    /// Width and height relative to other dimensions
    Percentage {
        /// Width specification
        width: Percentage,
        /// Height specification
        height: Percentage,
    },
    /// The manifest did not describe a usable size
    Malformed(SizeDefect),
}

impl SizeSpec {
    /// Element ids this size depends on (sentinels excluded), deduplicated.
    pub fn element_references(&self) -> Vec<&str> {
        match self {
            Self::Percentage { width, height } => {
                let mut refs: Vec<&str> = [&width.reference, &height.reference]
                    .into_iter()
                    .filter_map(Reference::element_id)
                    .collect();
                refs.dedup();
                refs
            }
            Self::Absolute { .. } | Self::Malformed(_) => Vec::new(),
        }
    }
}

/// Geometry of one element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawBaseInfo", into = "RawBaseInfo")]
pub struct BaseInfo {
    /// Render visibility
    pub visibility: VisibilityType,
    /// Absolute X offset in device pixels
    pub x_position: i32,
    /// Absolute Y offset in device pixels
    pub y_position: i32,
    /// Sizing mode
    pub size: SizeSpec,
}

impl BaseInfo {
    /// Absolutely sized, visible element.
    pub const fn absolute(x: i32, y: i32, width: f64, height: f64) -> Self {
        Self {
            visibility: VisibilityType::Visible,
            x_position: x,
            y_position: y,
            size: SizeSpec::Absolute { width, height },
        }
    }

    /// Percentage sized, visible element.
    pub const fn percentage(x: i32, y: i32, width: Percentage, height: Percentage) -> Self {
        Self {
            visibility: VisibilityType::Visible,
            x_position: x,
            y_position: y,
            size: SizeSpec::Percentage { width, height },
        }
    }

    /// Sets the visibility.
    pub fn with_visibility(mut self, visibility: VisibilityType) -> Self {
        self.visibility = visibility;
        self
    }
}

/// Flat wire form of [`BaseInfo`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBaseInfo {
    #[serde(default)]
    visibility_type: VisibilityType,
    #[serde(default)]
    x_position: i32,
    #[serde(default)]
    y_position: i32,
    #[serde(default)]
    size_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    absolute_width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    absolute_height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    percentage_width: Option<Percentage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    percentage_height: Option<Percentage>,
}

impl From<RawBaseInfo> for BaseInfo {
    fn from(raw: RawBaseInfo) -> Self {
        let size = match raw.size_type.as_deref() {
            Some(SIZE_TYPE_ABSOLUTE) => match (raw.absolute_width, raw.absolute_height) {
                (Some(width), Some(height)) => SizeSpec::Absolute { width, height },
                (width, height) => SizeSpec::Malformed(SizeDefect::MissingFields(
                    [
                        width.is_none().then_some("absoluteWidth"),
                        height.is_none().then_some("absoluteHeight"),
                    ]
                    .into_iter()
                    .flatten()
                    .collect(),
                )),
            },
            Some(SIZE_TYPE_PERCENTAGE) => match (raw.percentage_width, raw.percentage_height) {
                (Some(width), Some(height)) => SizeSpec::Percentage { width, height },
                (width, height) => SizeSpec::Malformed(SizeDefect::MissingFields(
                    [
                        width.is_none().then_some("percentageWidth"),
                        height.is_none().then_some("percentageHeight"),
                    ]
                    .into_iter()
                    .flatten()
                    .collect(),
                )),
            },
            other => SizeSpec::Malformed(SizeDefect::UnknownSizeType(
                other.unwrap_or_default().to_string(),
            )),
        };

        Self {
            visibility: raw.visibility_type,
            x_position: raw.x_position,
            y_position: raw.y_position,
            size,
        }
    }
}

impl From<BaseInfo> for RawBaseInfo {
    fn from(info: BaseInfo) -> Self {
        let mut raw = Self {
            visibility_type: info.visibility,
            x_position: info.x_position,
            y_position: info.y_position,
            ..Self::default()
        };

        match info.size {
            SizeSpec::Absolute { width, height } => {
                raw.size_type = Some(SIZE_TYPE_ABSOLUTE.to_string());
                raw.absolute_width = Some(width);
                raw.absolute_height = Some(height);
            }
            SizeSpec::Percentage { width, height } => {
                raw.size_type = Some(SIZE_TYPE_PERCENTAGE.to_string());
                raw.percentage_width = Some(width);
                raw.percentage_height = Some(height);
            }
            // Only the discriminant survives; the layout was rejected anyway
            SizeSpec::Malformed(SizeDefect::UnknownSizeType(raw_type)) => {
                raw.size_type = (!raw_type.is_empty()).then_some(raw_type);
            }
            SizeSpec::Malformed(SizeDefect::MissingFields(fields)) => {
                let declared = if fields.iter().any(|f| f.starts_with("absolute")) {
                    SIZE_TYPE_ABSOLUTE
                } else {
                    SIZE_TYPE_PERCENTAGE
                };
                raw.size_type = Some(declared.to_string());
            }
        }

        raw
    }
}

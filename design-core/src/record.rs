//! Drawable records - the serializable description of every paintable element.
//!
//! Every defaultable field is stored as an `Option`. `None` means "omitted,
//! use the canonical default" and `Some` carries an explicit value, so a
//! record can be held either fully populated ([`Canonical::normalize`]) or with
//! every default removed ([`Canonical::strip_defaults`]) without changing what
//! it describes.

use serde::{Deserialize, Deserializer, Serialize};

/// Canonical defaults for every omittable field.
pub mod defaults {
    /// Position, size, radii and line endpoints.
    pub const LENGTH: f64 = 0.0;
    /// Fill color applied when none is recorded.
    pub const FILL_COLOR: &str = "#000000";
    /// Stroke color applied when none is recorded (no stroke).
    pub const STROKE_COLOR: &str = "transparent";
    /// Horizontal and vertical scale.
    pub const SCALE: f64 = 1.0;
    /// Rotation in degrees.
    pub const ROTATION: f64 = 0.0;
    /// Global opacity.
    pub const OPACITY: f64 = 1.0;
    /// Stroke width in pixels.
    pub const STROKE_WIDTH: f64 = 1.0;
    /// Text size in pixels.
    pub const FONT_SIZE: f64 = 40.0;
    /// Text font family.
    pub const FONT_FAMILY: &str = "Times New Roman";
    /// Text font weight.
    pub const FONT_WEIGHT: &str = "normal";
    /// Extra spacing between glyphs in pixels.
    pub const CHAR_SPACING: f64 = 0.0;
    /// Line advance as a multiple of the font size.
    pub const LINE_HEIGHT: f64 = 1.16;
}

/// Number of decimal places kept by a numeric rounding pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Precision(pub i32);

impl Precision {
    /// Positions, sizes, radii and other lengths.
    pub const LENGTH: Self = Self(2);
    /// Scale factors and opacity.
    pub const RATIO: Self = Self(3);
    /// Rotation angles.
    pub const ANGLE: Self = Self(2);

    /// Round a value to this precision. Non-finite values pass through.
    #[must_use]
    pub fn apply(self, value: f64) -> f64 {
        if !value.is_finite() {
            return value;
        }
        let factor = 10f64.powi(self.0);
        (value * factor).round() / factor
    }
}

/// Default-handling passes shared by records and their parts.
pub trait Canonical {
    /// Make every defaultable field explicit.
    fn normalize(&mut self);
    /// Remove every field equal to its canonical default.
    fn strip_defaults(&mut self);
    /// Round numeric fields to their documented precision.
    fn round(&mut self);
}

fn fill<T>(slot: &mut Option<T>, default: T) {
    if slot.is_none() {
        *slot = Some(default);
    }
}

fn strip<T: PartialEq>(slot: &mut Option<T>, default: &T) {
    if slot.as_ref() == Some(default) {
        *slot = None;
    }
}

fn fill_str(slot: &mut Option<String>, default: &str) {
    if slot.is_none() {
        *slot = Some(default.to_string());
    }
}

fn strip_str(slot: &mut Option<String>, default: &str) {
    if slot.as_deref() == Some(default) {
        *slot = None;
    }
}

fn round_opt(slot: &mut Option<f64>, precision: Precision) {
    if let Some(value) = slot.as_mut() {
        *value = precision.apply(*value);
    }
}

fn strip_empty<T>(slot: &mut Option<Vec<T>>) {
    if slot.as_ref().is_some_and(Vec::is_empty) {
        *slot = None;
    }
}

/// Line cap style for strokes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrokeCap {
    /// Flat end at the endpoint.
    #[default]
    Butt,
    /// Semicircular end.
    Round,
    /// Square end extending past the endpoint.
    Square,
}

/// Line join style for strokes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrokeJoin {
    /// Sharp corner.
    #[default]
    Miter,
    /// Rounded corner.
    Round,
    /// Clipped corner.
    Bevel,
}

/// Horizontal alignment of text lines inside the text box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    /// Flush left.
    #[default]
    Left,
    /// Centered.
    Center,
    /// Flush right.
    Right,
}

/// Horizontal anchor of an object's transform origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OriginX {
    /// Left edge.
    #[default]
    Left,
    /// Horizontal center.
    Center,
    /// Right edge.
    Right,
}

impl OriginX {
    /// Anchor position as a fraction of the object width.
    #[must_use]
    pub const fn fraction(self) -> f64 {
        match self {
            Self::Left => 0.0,
            Self::Center => 0.5,
            Self::Right => 1.0,
        }
    }
}

/// Vertical anchor of an object's transform origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OriginY {
    /// Top edge.
    #[default]
    Top,
    /// Vertical center.
    Center,
    /// Bottom edge.
    Bottom,
}

impl OriginY {
    /// Anchor position as a fraction of the object height.
    #[must_use]
    pub const fn fraction(self) -> f64 {
        match self {
            Self::Top => 0.0,
            Self::Center => 0.5,
            Self::Bottom => 1.0,
        }
    }
}

/// Drop shadow painted beneath an object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shadow {
    /// Shadow color.
    pub color: String,
    /// Blur radius in pixels.
    #[serde(default)]
    pub blur: f64,
    /// Horizontal offset in pixels.
    #[serde(default)]
    pub offset_x: f64,
    /// Vertical offset in pixels.
    #[serde(default)]
    pub offset_y: f64,
}

/// A 2D point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// X coordinate.
    pub x: f64,
    /// Y coordinate.
    pub y: f64,
}

/// One step of a vector path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum PathCommand {
    /// Start a new subpath.
    MoveTo {
        /// Target x.
        x: f64,
        /// Target y.
        y: f64,
    },
    /// Straight segment.
    LineTo {
        /// Target x.
        x: f64,
        /// Target y.
        y: f64,
    },
    /// Cubic Bezier segment.
    CubicBezierTo {
        /// First control point x.
        x1: f64,
        /// First control point y.
        y1: f64,
        /// Second control point x.
        x2: f64,
        /// Second control point y.
        y2: f64,
        /// Target x.
        x: f64,
        /// Target y.
        y: f64,
    },
    /// Quadratic Bezier segment.
    QuadraticBezierTo {
        /// Control point x.
        x1: f64,
        /// Control point y.
        y1: f64,
        /// Target x.
        x: f64,
        /// Target y.
        y: f64,
    },
    /// Close the current subpath.
    Close,
}

impl PathCommand {
    fn round(&mut self) {
        let p = Precision::LENGTH;
        match self {
            Self::MoveTo { x, y } | Self::LineTo { x, y } => {
                *x = p.apply(*x);
                *y = p.apply(*y);
            }
            Self::CubicBezierTo {
                x1,
                y1,
                x2,
                y2,
                x,
                y,
            } => {
                for v in [x1, y1, x2, y2, x, y] {
                    *v = p.apply(*v);
                }
            }
            Self::QuadraticBezierTo { x1, y1, x, y } => {
                for v in [x1, y1, x, y] {
                    *v = p.apply(*v);
                }
            }
            Self::Close => {}
        }
    }
}

/// Fields shared by every drawable kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommonProps {
    /// Left edge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    /// Top edge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    /// Box width before scaling.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    /// Box height before scaling.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    /// Fill color.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill_color: Option<String>,
    /// Stroke color.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_color: Option<String>,
    /// Horizontal scale factor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_x: Option<f64>,
    /// Vertical scale factor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_y: Option<f64>,
    /// Clockwise rotation in degrees.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation_degrees: Option<f64>,
    /// Opacity in 0..=1.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    /// Stroke width in pixels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_width: Option<f64>,
    /// Stroke cap style.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_cap: Option<StrokeCap>,
    /// Stroke join style.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_join: Option<StrokeJoin>,
    /// Horizontal transform anchor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_x: Option<OriginX>,
    /// Vertical transform anchor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_y: Option<OriginY>,
    /// Optional drop shadow.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shadow: Option<Shadow>,
    /// Optional stroke dash pattern.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dash_pattern: Option<Vec<f64>>,
    /// Whether this record forms part of the template background.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_background_layer: Option<bool>,
}

impl CommonProps {
    /// Left edge.
    #[must_use]
    pub fn x(&self) -> f64 {
        self.x.unwrap_or(defaults::LENGTH)
    }

    /// Top edge.
    #[must_use]
    pub fn y(&self) -> f64 {
        self.y.unwrap_or(defaults::LENGTH)
    }

    /// Box width.
    #[must_use]
    pub fn width(&self) -> f64 {
        self.width.unwrap_or(defaults::LENGTH)
    }

    /// Box height.
    #[must_use]
    pub fn height(&self) -> f64 {
        self.height.unwrap_or(defaults::LENGTH)
    }

    /// Fill color.
    #[must_use]
    pub fn fill_color(&self) -> &str {
        self.fill_color.as_deref().unwrap_or(defaults::FILL_COLOR)
    }

    /// Stroke color.
    #[must_use]
    pub fn stroke_color(&self) -> &str {
        self.stroke_color
            .as_deref()
            .unwrap_or(defaults::STROKE_COLOR)
    }

    /// Horizontal scale.
    #[must_use]
    pub fn scale_x(&self) -> f64 {
        self.scale_x.unwrap_or(defaults::SCALE)
    }

    /// Vertical scale.
    #[must_use]
    pub fn scale_y(&self) -> f64 {
        self.scale_y.unwrap_or(defaults::SCALE)
    }

    /// Rotation in degrees.
    #[must_use]
    pub fn rotation_degrees(&self) -> f64 {
        self.rotation_degrees.unwrap_or(defaults::ROTATION)
    }

    /// Opacity clamped to 0..=1.
    #[must_use]
    pub fn opacity(&self) -> f64 {
        self.opacity.unwrap_or(defaults::OPACITY).clamp(0.0, 1.0)
    }

    /// Stroke width.
    #[must_use]
    pub fn stroke_width(&self) -> f64 {
        self.stroke_width.unwrap_or(defaults::STROKE_WIDTH)
    }

    /// Stroke cap.
    #[must_use]
    pub fn stroke_cap(&self) -> StrokeCap {
        self.stroke_cap.unwrap_or_default()
    }

    /// Stroke join.
    #[must_use]
    pub fn stroke_join(&self) -> StrokeJoin {
        self.stroke_join.unwrap_or_default()
    }

    /// Horizontal anchor.
    #[must_use]
    pub fn origin_x(&self) -> OriginX {
        self.origin_x.unwrap_or_default()
    }

    /// Vertical anchor.
    #[must_use]
    pub fn origin_y(&self) -> OriginY {
        self.origin_y.unwrap_or_default()
    }

    /// Background-layer flag.
    #[must_use]
    pub fn is_background_layer(&self) -> bool {
        self.is_background_layer.unwrap_or(false)
    }
}

impl Canonical for CommonProps {
    fn normalize(&mut self) {
        fill(&mut self.x, defaults::LENGTH);
        fill(&mut self.y, defaults::LENGTH);
        fill(&mut self.width, defaults::LENGTH);
        fill(&mut self.height, defaults::LENGTH);
        fill_str(&mut self.fill_color, defaults::FILL_COLOR);
        fill_str(&mut self.stroke_color, defaults::STROKE_COLOR);
        fill(&mut self.scale_x, defaults::SCALE);
        fill(&mut self.scale_y, defaults::SCALE);
        fill(&mut self.rotation_degrees, defaults::ROTATION);
        fill(&mut self.opacity, defaults::OPACITY);
        fill(&mut self.stroke_width, defaults::STROKE_WIDTH);
        fill(&mut self.stroke_cap, StrokeCap::default());
        fill(&mut self.stroke_join, StrokeJoin::default());
        fill(&mut self.origin_x, OriginX::default());
        fill(&mut self.origin_y, OriginY::default());
        fill(&mut self.is_background_layer, false);
    }

    fn strip_defaults(&mut self) {
        strip(&mut self.x, &defaults::LENGTH);
        strip(&mut self.y, &defaults::LENGTH);
        strip(&mut self.width, &defaults::LENGTH);
        strip(&mut self.height, &defaults::LENGTH);
        strip_str(&mut self.fill_color, defaults::FILL_COLOR);
        strip_str(&mut self.stroke_color, defaults::STROKE_COLOR);
        strip(&mut self.scale_x, &defaults::SCALE);
        strip(&mut self.scale_y, &defaults::SCALE);
        strip(&mut self.rotation_degrees, &defaults::ROTATION);
        strip(&mut self.opacity, &defaults::OPACITY);
        strip(&mut self.stroke_width, &defaults::STROKE_WIDTH);
        strip(&mut self.stroke_cap, &StrokeCap::default());
        strip(&mut self.stroke_join, &StrokeJoin::default());
        strip(&mut self.origin_x, &OriginX::default());
        strip(&mut self.origin_y, &OriginY::default());
        strip(&mut self.is_background_layer, &false);
    }

    fn round(&mut self) {
        for slot in [
            &mut self.x,
            &mut self.y,
            &mut self.width,
            &mut self.height,
            &mut self.stroke_width,
        ] {
            round_opt(slot, Precision::LENGTH);
        }
        round_opt(&mut self.scale_x, Precision::RATIO);
        round_opt(&mut self.scale_y, Precision::RATIO);
        round_opt(&mut self.opacity, Precision::RATIO);
        round_opt(&mut self.rotation_degrees, Precision::ANGLE);
        if let Some(shadow) = self.shadow.as_mut() {
            shadow.blur = Precision::LENGTH.apply(shadow.blur);
            shadow.offset_x = Precision::LENGTH.apply(shadow.offset_x);
            shadow.offset_y = Precision::LENGTH.apply(shadow.offset_y);
        }
        if let Some(dashes) = self.dash_pattern.as_mut() {
            for dash in dashes {
                *dash = Precision::LENGTH.apply(*dash);
            }
        }
    }
}

/// Text-specific fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextProps {
    /// Font size in pixels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size_px: Option<f64>,
    /// Font family name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    /// Font weight (`normal`, `bold` or a numeric weight).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_weight: Option<String>,
    /// Line alignment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_align: Option<TextAlign>,
    /// Text content; `\n` separates lines.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Extra pixels between glyphs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub char_spacing: Option<f64>,
    /// Line advance as a multiple of the font size.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_height_multiplier: Option<f64>,
}

impl TextProps {
    /// Font size in pixels.
    #[must_use]
    pub fn font_size_px(&self) -> f64 {
        self.font_size_px.unwrap_or(defaults::FONT_SIZE)
    }

    /// Font family.
    #[must_use]
    pub fn font_family(&self) -> &str {
        self.font_family.as_deref().unwrap_or(defaults::FONT_FAMILY)
    }

    /// Font weight.
    #[must_use]
    pub fn font_weight(&self) -> &str {
        self.font_weight.as_deref().unwrap_or(defaults::FONT_WEIGHT)
    }

    /// Whether the weight selects a bold face.
    #[must_use]
    pub fn is_bold(&self) -> bool {
        let weight = self.font_weight();
        weight.eq_ignore_ascii_case("bold")
            || weight.eq_ignore_ascii_case("bolder")
            || weight.parse::<u16>().is_ok_and(|w| w >= 600)
    }

    /// Alignment.
    #[must_use]
    pub fn text_align(&self) -> TextAlign {
        self.text_align.unwrap_or_default()
    }

    /// Content.
    #[must_use]
    pub fn content(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }

    /// Glyph spacing.
    #[must_use]
    pub fn char_spacing(&self) -> f64 {
        self.char_spacing.unwrap_or(defaults::CHAR_SPACING)
    }

    /// Line height multiplier.
    #[must_use]
    pub fn line_height_multiplier(&self) -> f64 {
        self.line_height_multiplier.unwrap_or(defaults::LINE_HEIGHT)
    }

    /// Truncate content to at most `max_chars` Unicode scalar values.
    pub fn truncate_content(&mut self, max_chars: usize) {
        if let Some(content) = self.content.as_mut() {
            if let Some((cut, _)) = content.char_indices().nth(max_chars) {
                content.truncate(cut);
            }
        }
    }
}

impl Canonical for TextProps {
    fn normalize(&mut self) {
        fill(&mut self.font_size_px, defaults::FONT_SIZE);
        fill_str(&mut self.font_family, defaults::FONT_FAMILY);
        fill_str(&mut self.font_weight, defaults::FONT_WEIGHT);
        fill(&mut self.text_align, TextAlign::default());
        fill_str(&mut self.content, "");
        fill(&mut self.char_spacing, defaults::CHAR_SPACING);
        fill(&mut self.line_height_multiplier, defaults::LINE_HEIGHT);
    }

    fn strip_defaults(&mut self) {
        strip(&mut self.font_size_px, &defaults::FONT_SIZE);
        strip_str(&mut self.font_family, defaults::FONT_FAMILY);
        strip_str(&mut self.font_weight, defaults::FONT_WEIGHT);
        strip(&mut self.text_align, &TextAlign::default());
        strip_str(&mut self.content, "");
        strip(&mut self.char_spacing, &defaults::CHAR_SPACING);
        strip(&mut self.line_height_multiplier, &defaults::LINE_HEIGHT);
    }

    fn round(&mut self) {
        round_opt(&mut self.font_size_px, Precision::LENGTH);
        round_opt(&mut self.char_spacing, Precision::LENGTH);
        round_opt(&mut self.line_height_multiplier, Precision::RATIO);
    }
}

/// Image-specific fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageProps {
    /// Image location: network URL, file path or data URI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_uri: Option<String>,
    /// Optional CORS policy recorded by the editor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cross_origin_policy: Option<String>,
}

impl ImageProps {
    /// Image location.
    #[must_use]
    pub fn source_uri(&self) -> &str {
        self.source_uri.as_deref().unwrap_or("")
    }
}

impl Canonical for ImageProps {
    fn normalize(&mut self) {
        fill_str(&mut self.source_uri, "");
    }

    fn strip_defaults(&mut self) {
        strip_str(&mut self.source_uri, "");
    }

    fn round(&mut self) {}
}

/// Corner radii shared by rectangles and ellipses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RadiiProps {
    /// Horizontal radius.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rx: Option<f64>,
    /// Vertical radius.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ry: Option<f64>,
}

impl RadiiProps {
    /// Horizontal radius.
    #[must_use]
    pub fn rx(&self) -> f64 {
        self.rx.unwrap_or(defaults::LENGTH)
    }

    /// Vertical radius.
    #[must_use]
    pub fn ry(&self) -> f64 {
        self.ry.unwrap_or(defaults::LENGTH)
    }
}

impl Canonical for RadiiProps {
    fn normalize(&mut self) {
        fill(&mut self.rx, defaults::LENGTH);
        fill(&mut self.ry, defaults::LENGTH);
    }

    fn strip_defaults(&mut self) {
        strip(&mut self.rx, &defaults::LENGTH);
        strip(&mut self.ry, &defaults::LENGTH);
    }

    fn round(&mut self) {
        round_opt(&mut self.rx, Precision::LENGTH);
        round_opt(&mut self.ry, Precision::LENGTH);
    }
}

/// Circle fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CircleProps {
    /// Radius in pixels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<f64>,
}

impl CircleProps {
    /// Radius.
    #[must_use]
    pub fn radius(&self) -> f64 {
        self.radius.unwrap_or(defaults::LENGTH)
    }
}

impl Canonical for CircleProps {
    fn normalize(&mut self) {
        fill(&mut self.radius, defaults::LENGTH);
    }

    fn strip_defaults(&mut self) {
        strip(&mut self.radius, &defaults::LENGTH);
    }

    fn round(&mut self) {
        round_opt(&mut self.radius, Precision::LENGTH);
    }
}

/// Polygon fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolygonProps {
    /// Ordered vertices.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<Vec<Point>>,
}

impl PolygonProps {
    /// Vertices.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        self.points.as_deref().unwrap_or(&[])
    }
}

impl Canonical for PolygonProps {
    fn normalize(&mut self) {
        fill(&mut self.points, Vec::new());
    }

    fn strip_defaults(&mut self) {
        strip_empty(&mut self.points);
    }

    fn round(&mut self) {
        for point in self.points.iter_mut().flatten() {
            point.x = Precision::LENGTH.apply(point.x);
            point.y = Precision::LENGTH.apply(point.y);
        }
    }
}

/// Path fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathProps {
    /// Drawing commands replayed in order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commands: Option<Vec<PathCommand>>,
}

impl PathProps {
    /// Commands.
    #[must_use]
    pub fn commands(&self) -> &[PathCommand] {
        self.commands.as_deref().unwrap_or(&[])
    }
}

impl Canonical for PathProps {
    fn normalize(&mut self) {
        fill(&mut self.commands, Vec::new());
    }

    fn strip_defaults(&mut self) {
        strip_empty(&mut self.commands);
    }

    fn round(&mut self) {
        for command in self.commands.iter_mut().flatten() {
            command.round();
        }
    }
}

/// Line fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineProps {
    /// Start x.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x1: Option<f64>,
    /// Start y.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y1: Option<f64>,
    /// End x.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x2: Option<f64>,
    /// End y.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y2: Option<f64>,
}

impl LineProps {
    /// Endpoints as `(x1, y1, x2, y2)`.
    #[must_use]
    pub fn endpoints(&self) -> (f64, f64, f64, f64) {
        (
            self.x1.unwrap_or(defaults::LENGTH),
            self.y1.unwrap_or(defaults::LENGTH),
            self.x2.unwrap_or(defaults::LENGTH),
            self.y2.unwrap_or(defaults::LENGTH),
        )
    }

    fn slots(&mut self) -> [&mut Option<f64>; 4] {
        [&mut self.x1, &mut self.y1, &mut self.x2, &mut self.y2]
    }
}

impl Canonical for LineProps {
    fn normalize(&mut self) {
        for slot in self.slots() {
            fill(slot, defaults::LENGTH);
        }
    }

    fn strip_defaults(&mut self) {
        for slot in self.slots() {
            strip(slot, &defaults::LENGTH);
        }
    }

    fn round(&mut self) {
        for slot in self.slots() {
            round_opt(slot, Precision::LENGTH);
        }
    }
}

/// Group fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupProps {
    /// Nested records in local paint order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objects: Option<Vec<DrawableRecord>>,
}

impl GroupProps {
    /// Children.
    #[must_use]
    pub fn objects(&self) -> &[DrawableRecord] {
        self.objects.as_deref().unwrap_or(&[])
    }
}

impl Canonical for GroupProps {
    fn normalize(&mut self) {
        fill(&mut self.objects, Vec::new());
        for child in self.objects.iter_mut().flatten() {
            child.normalize();
        }
    }

    fn strip_defaults(&mut self) {
        for child in self.objects.iter_mut().flatten() {
            child.strip_defaults();
        }
        strip_empty(&mut self.objects);
    }

    fn round(&mut self) {
        for child in self.objects.iter_mut().flatten() {
            child.round();
        }
    }
}

/// Coarse grouping of kinds, used for per-kind storage artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KindFamily {
    /// Text records.
    Text,
    /// Image records.
    Image,
    /// Rectangles, circles, ellipses, triangles, polygons and paths.
    Shape,
    /// Line records.
    Line,
    /// Groups.
    Group,
    /// Unknown kinds.
    Unknown,
}

/// Kind-specific body of a record; the serialized `kind` tag.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum DrawableBody {
    /// Text block.
    Text(TextProps),
    /// Raster image.
    Image(ImageProps),
    /// Rectangle with optional rounded corners.
    Rect(RadiiProps),
    /// Circle.
    Circle(CircleProps),
    /// Ellipse.
    Ellipse(RadiiProps),
    /// Isosceles triangle inscribed in the box.
    Triangle,
    /// Closed polygon.
    Polygon(PolygonProps),
    /// Vector path.
    Path(PathProps),
    /// Line segment.
    Line(LineProps),
    /// Nested records.
    Group(GroupProps),
    /// Base variant for kinds this model does not know. Preserved, never painted.
    Unknown {
        /// Kind tag as it appeared on the source.
        #[serde(
            rename = "sourceKind",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        source_kind: Option<String>,
    },
}

/// Wire mirror of [`DrawableBody`] used for known tags.
#[derive(Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
enum BodyRepr {
    Text(TextProps),
    Image(ImageProps),
    Rect(RadiiProps),
    Circle(CircleProps),
    Ellipse(RadiiProps),
    Triangle,
    Polygon(PolygonProps),
    Path(PathProps),
    Line(LineProps),
    Group(GroupProps),
    Unknown {
        #[serde(rename = "sourceKind", default)]
        source_kind: Option<String>,
    },
}

impl From<BodyRepr> for DrawableBody {
    fn from(repr: BodyRepr) -> Self {
        match repr {
            BodyRepr::Text(p) => Self::Text(p),
            BodyRepr::Image(p) => Self::Image(p),
            BodyRepr::Rect(p) => Self::Rect(p),
            BodyRepr::Circle(p) => Self::Circle(p),
            BodyRepr::Ellipse(p) => Self::Ellipse(p),
            BodyRepr::Triangle => Self::Triangle,
            BodyRepr::Polygon(p) => Self::Polygon(p),
            BodyRepr::Path(p) => Self::Path(p),
            BodyRepr::Line(p) => Self::Line(p),
            BodyRepr::Group(p) => Self::Group(p),
            BodyRepr::Unknown { source_kind } => Self::Unknown { source_kind },
        }
    }
}

/// Every `kind` tag this model understands.
pub const KNOWN_KINDS: [&str; 11] = [
    "text", "image", "rect", "circle", "ellipse", "triangle", "polygon", "path", "line", "group",
    "unknown",
];

impl<'de> Deserialize<'de> for DrawableBody {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        let kind = value
            .get("kind")
            .and_then(serde_json::Value::as_str)
            .map(str::to_string);
        match kind {
            Some(tag) if KNOWN_KINDS.contains(&tag.as_str()) => BodyRepr::deserialize(value)
                .map(Self::from)
                .map_err(serde::de::Error::custom),
            other => Ok(Self::Unknown { source_kind: other }),
        }
    }
}

impl DrawableBody {
    /// Serialized `kind` tag.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Image(_) => "image",
            Self::Rect(_) => "rect",
            Self::Circle(_) => "circle",
            Self::Ellipse(_) => "ellipse",
            Self::Triangle => "triangle",
            Self::Polygon(_) => "polygon",
            Self::Path(_) => "path",
            Self::Line(_) => "line",
            Self::Group(_) => "group",
            Self::Unknown { .. } => "unknown",
        }
    }

    /// Coarse family of this kind.
    #[must_use]
    pub const fn family(&self) -> KindFamily {
        match self {
            Self::Text(_) => KindFamily::Text,
            Self::Image(_) => KindFamily::Image,
            Self::Rect(_)
            | Self::Circle(_)
            | Self::Ellipse(_)
            | Self::Triangle
            | Self::Polygon(_)
            | Self::Path(_) => KindFamily::Shape,
            Self::Line(_) => KindFamily::Line,
            Self::Group(_) => KindFamily::Group,
            Self::Unknown { .. } => KindFamily::Unknown,
        }
    }
}

impl Canonical for DrawableBody {
    fn normalize(&mut self) {
        match self {
            Self::Text(p) => p.normalize(),
            Self::Image(p) => p.normalize(),
            Self::Rect(p) | Self::Ellipse(p) => p.normalize(),
            Self::Circle(p) => p.normalize(),
            Self::Polygon(p) => p.normalize(),
            Self::Path(p) => p.normalize(),
            Self::Line(p) => p.normalize(),
            Self::Group(p) => p.normalize(),
            Self::Triangle | Self::Unknown { .. } => {}
        }
    }

    fn strip_defaults(&mut self) {
        match self {
            Self::Text(p) => p.strip_defaults(),
            Self::Image(p) => p.strip_defaults(),
            Self::Rect(p) | Self::Ellipse(p) => p.strip_defaults(),
            Self::Circle(p) => p.strip_defaults(),
            Self::Polygon(p) => p.strip_defaults(),
            Self::Path(p) => p.strip_defaults(),
            Self::Line(p) => p.strip_defaults(),
            Self::Group(p) => p.strip_defaults(),
            Self::Triangle | Self::Unknown { .. } => {}
        }
    }

    fn round(&mut self) {
        match self {
            Self::Text(p) => p.round(),
            Self::Image(p) => p.round(),
            Self::Rect(p) | Self::Ellipse(p) => p.round(),
            Self::Circle(p) => p.round(),
            Self::Polygon(p) => p.round(),
            Self::Path(p) => p.round(),
            Self::Line(p) => p.round(),
            Self::Group(p) => p.round(),
            Self::Triangle | Self::Unknown { .. } => {}
        }
    }
}

/// One paintable element of a design document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawableRecord {
    /// Opaque identifier.
    pub id: String,
    /// Kind tag and kind-specific fields.
    #[serde(flatten)]
    pub body: DrawableBody,
    /// Fields shared by every kind.
    #[serde(flatten)]
    pub common: CommonProps,
}

impl DrawableRecord {
    /// Create a record with no explicit fields.
    #[must_use]
    pub fn new(id: impl Into<String>, body: DrawableBody) -> Self {
        Self {
            id: id.into(),
            body,
            common: CommonProps::default(),
        }
    }

    /// Set the bounding box.
    #[must_use]
    pub fn with_bounds(mut self, x: f64, y: f64, width: f64, height: f64) -> Self {
        self.common.x = Some(x);
        self.common.y = Some(y);
        self.common.width = Some(width);
        self.common.height = Some(height);
        self
    }

    /// Set the fill color.
    #[must_use]
    pub fn with_fill(mut self, color: impl Into<String>) -> Self {
        self.common.fill_color = Some(color.into());
        self
    }

    /// Set the stroke color and width.
    #[must_use]
    pub fn with_stroke(mut self, color: impl Into<String>, width: f64) -> Self {
        self.common.stroke_color = Some(color.into());
        self.common.stroke_width = Some(width);
        self
    }

    /// Set the rotation and anchor.
    #[must_use]
    pub fn with_rotation(mut self, degrees: f64, origin_x: OriginX, origin_y: OriginY) -> Self {
        self.common.rotation_degrees = Some(degrees);
        self.common.origin_x = Some(origin_x);
        self.common.origin_y = Some(origin_y);
        self
    }

    /// Serialized `kind` tag.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        self.body.kind_name()
    }

    /// Coarse family of this record.
    #[must_use]
    pub const fn family(&self) -> KindFamily {
        self.body.family()
    }

    /// Return a normalized copy.
    #[must_use]
    pub fn normalized(&self) -> Self {
        let mut record = self.clone();
        record.normalize();
        record
    }
}

impl Canonical for DrawableRecord {
    fn normalize(&mut self) {
        self.common.normalize();
        self.body.normalize();
    }

    fn strip_defaults(&mut self) {
        self.common.strip_defaults();
        self.body.strip_defaults();
    }

    fn round(&mut self) {
        self.common.round();
        self.body.round();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(content: &str) -> DrawableRecord {
        DrawableRecord::new(
            "t1",
            DrawableBody::Text(TextProps {
                content: Some(content.to_string()),
                font_size_px: Some(20.0),
                ..TextProps::default()
            }),
        )
        .with_bounds(10.0, 10.0, 180.0, 30.0)
    }

    #[test]
    fn test_kind_tag_serialized_flat() {
        let json = serde_json::to_value(text("Hi")).expect("serialize");
        assert_eq!(json["kind"], "text");
        assert_eq!(json["id"], "t1");
        assert_eq!(json["fontSizePx"], 20.0);
        assert_eq!(json["x"], 10.0);
        assert!(json.get("scaleX").is_none());
    }

    #[test]
    fn test_roundtrip_through_json() {
        let record = text("Hi\nThere").normalized();
        let json = serde_json::to_string(&record).expect("serialize");
        let back: DrawableRecord = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, record);
    }

    #[test]
    fn test_unknown_kind_preserved() {
        let record: DrawableRecord =
            serde_json::from_str(r#"{"id":"s1","kind":"sticker","x":5}"#).expect("deserialize");
        assert_eq!(
            record.body,
            DrawableBody::Unknown {
                source_kind: Some("sticker".to_string())
            }
        );
        assert_eq!(record.common.x, Some(5.0));

        let json = serde_json::to_value(&record).expect("serialize");
        assert_eq!(json["kind"], "unknown");
        assert_eq!(json["sourceKind"], "sticker");

        let again: DrawableRecord = serde_json::from_value(json).expect("deserialize");
        assert_eq!(again, record);
    }

    #[test]
    fn test_missing_kind_is_unknown() {
        let record: DrawableRecord = serde_json::from_str(r#"{"id":"a"}"#).expect("deserialize");
        assert_eq!(record.body, DrawableBody::Unknown { source_kind: None });
    }

    #[test]
    fn test_defaults_strip_to_id_and_kind() {
        let mut record = DrawableRecord::new("r", DrawableBody::Rect(RadiiProps::default()));
        record.normalize();
        assert_eq!(record.common.scale_x, Some(1.0));
        record.strip_defaults();
        let json = serde_json::to_value(&record).expect("serialize");
        assert_eq!(json, serde_json::json!({"id": "r", "kind": "rect"}));
    }

    #[test]
    fn test_group_children_nested() {
        let group = DrawableRecord::new(
            "g",
            DrawableBody::Group(GroupProps {
                objects: Some(vec![text("inner")]),
            }),
        );
        let json = serde_json::to_string(&group).expect("serialize");
        let back: DrawableRecord = serde_json::from_str(&json).expect("deserialize");
        let DrawableBody::Group(props) = back.body else {
            panic!("expected group");
        };
        assert_eq!(props.objects().len(), 1);
        assert_eq!(props.objects()[0].kind_name(), "text");
    }

    #[test]
    fn test_path_commands_tagged() {
        let path = DrawableRecord::new(
            "p",
            DrawableBody::Path(PathProps {
                commands: Some(vec![
                    PathCommand::MoveTo { x: 0.0, y: 0.0 },
                    PathCommand::QuadraticBezierTo {
                        x1: 5.0,
                        y1: 5.0,
                        x: 10.0,
                        y: 0.0,
                    },
                    PathCommand::Close,
                ]),
            }),
        );
        let json = serde_json::to_value(&path).expect("serialize");
        assert_eq!(json["commands"][0]["op"], "moveTo");
        assert_eq!(json["commands"][1]["op"], "quadraticBezierTo");
        assert_eq!(json["commands"][2], serde_json::json!({"op": "close"}));
    }

    #[test]
    fn test_precision_rounding_idempotent() {
        let once = Precision::LENGTH.apply(12.345_678);
        assert!((once - 12.35).abs() < f64::EPSILON);
        assert!((Precision::LENGTH.apply(once) - once).abs() < f64::EPSILON);
        assert!((Precision::RATIO.apply(0.999_96) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_truncate_content_by_code_points() {
        let mut props = TextProps {
            content: Some("héllo wörld".to_string()),
            ..TextProps::default()
        };
        props.truncate_content(4);
        assert_eq!(props.content(), "héll");
    }

    #[test]
    fn test_bold_detection() {
        let mut props = TextProps::default();
        assert!(!props.is_bold());
        props.font_weight = Some("700".to_string());
        assert!(props.is_bold());
        props.font_weight = Some("Bold".to_string());
        assert!(props.is_bold());
    }

    #[test]
    fn test_opacity_clamped() {
        let props = CommonProps {
            opacity: Some(1.7),
            ..CommonProps::default()
        };
        assert!((props.opacity() - 1.0).abs() < f64::EPSILON);
    }
}

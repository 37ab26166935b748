//! Paint state: colors, strokes and opacity resolved for one record.
//!
//! Nothing here is mutated while painting. A [`Frame`] carries the inherited
//! transform and opacity of the enclosing group; [`PaintState::for_record`]
//! derives the immutable state that one record is drawn with.

use design_core::record::{CommonProps, StrokeCap, StrokeJoin};
use tiny_skia::{
    Color, FillRule, LineCap, LineJoin, Paint, Path, Pixmap, Stroke, StrokeDash, Transform,
};

/// Parse a CSS-style color.
///
/// Supports `#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa`, `rgb()`, `rgba()` and a
/// set of common names. `transparent` parses to a fully transparent color.
#[must_use]
pub fn parse_color(input: &str) -> Option<Color> {
    let s = input.trim().to_ascii_lowercase();
    if let Some(hex) = s.strip_prefix('#') {
        return parse_hex(hex);
    }
    if let Some(args) = s
        .strip_prefix("rgba(")
        .or_else(|| s.strip_prefix("rgb("))
        .and_then(|rest| rest.strip_suffix(')'))
    {
        return parse_rgb_function(args);
    }
    named_color(&s).and_then(parse_hex)
}

fn parse_hex(hex: &str) -> Option<Color> {
    let digit = |i: usize| u8::from_str_radix(hex.get(i..=i)?, 16).ok();
    let pair = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    let (r, g, b, a) = match hex.len() {
        3 => (digit(0)? * 17, digit(1)? * 17, digit(2)? * 17, 255),
        4 => (
            digit(0)? * 17,
            digit(1)? * 17,
            digit(2)? * 17,
            digit(3)? * 17,
        ),
        6 => (pair(0)?, pair(2)?, pair(4)?, 255),
        8 => (pair(0)?, pair(2)?, pair(4)?, pair(6)?),
        _ => return None,
    };
    Some(Color::from_rgba8(r, g, b, a))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn parse_rgb_function(args: &str) -> Option<Color> {
    let parts: Vec<&str> = args.split(',').map(str::trim).collect();
    if parts.len() != 3 && parts.len() != 4 {
        return None;
    }
    let channel = |s: &str| -> Option<u8> {
        let value = match s.strip_suffix('%') {
            Some(pct) => pct.parse::<f32>().ok()? * 2.55,
            None => s.parse::<f32>().ok()?,
        };
        Some(value.round().clamp(0.0, 255.0) as u8)
    };
    let alpha = match parts.get(3) {
        Some(a) => a.parse::<f32>().ok()?.clamp(0.0, 1.0),
        None => 1.0,
    };
    let mut color = Color::from_rgba8(channel(parts[0])?, channel(parts[1])?, channel(parts[2])?, 255);
    color.set_alpha(alpha);
    Some(color)
}

fn named_color(name: &str) -> Option<&'static str> {
    Some(match name {
        "transparent" => "00000000",
        "black" => "000000",
        "white" => "ffffff",
        "red" => "ff0000",
        "green" => "008000",
        "lime" => "00ff00",
        "blue" => "0000ff",
        "yellow" => "ffff00",
        "orange" => "ffa500",
        "purple" => "800080",
        "gray" | "grey" => "808080",
        "silver" => "c0c0c0",
        "maroon" => "800000",
        "navy" => "000080",
        "teal" => "008080",
        "olive" => "808000",
        "aqua" | "cyan" => "00ffff",
        "fuchsia" | "magenta" => "ff00ff",
        "pink" => "ffc0cb",
        "brown" => "a52a2a",
        "gold" => "ffd700",
        _ => return None,
    })
}

/// Inherited drawing context of a nesting level.
#[derive(Debug, Clone, Copy)]
pub struct Frame {
    /// Local-to-device transform of the level.
    pub transform: Transform,
    /// Product of every enclosing opacity.
    pub opacity: f32,
    /// Canvas-to-device scale factor.
    pub device_scale: f32,
}

impl Frame {
    /// Top-level frame for a surface rendered at `device_scale`.
    #[must_use]
    pub fn root(device_scale: f32) -> Self {
        Self {
            transform: Transform::from_scale(device_scale, device_scale),
            opacity: 1.0,
            device_scale,
        }
    }

    /// Frame for the children of a group drawn with `state`.
    #[must_use]
    pub fn nested(&self, state: &PaintState) -> Self {
        Self {
            transform: state.transform,
            opacity: state.opacity,
            device_scale: self.device_scale,
        }
    }
}

/// Stroke color and geometry.
#[derive(Debug, Clone)]
pub struct StrokeStyle {
    /// Stroke color with opacity applied.
    pub color: Color,
    /// Width, cap, join and dash.
    pub stroke: Stroke,
}

/// Offset silhouette painted under an object.
#[derive(Debug, Clone, Copy)]
pub struct ShadowStyle {
    /// Shadow color with opacity applied.
    pub color: Color,
    /// Device-space transform used for the silhouette.
    pub transform: Transform,
}

/// Everything one record is painted with.
#[derive(Debug, Clone)]
pub struct PaintState {
    /// Local-to-device transform.
    pub transform: Transform,
    /// Effective opacity.
    pub opacity: f32,
    /// Fill color, or `None` for no fill.
    pub fill: Option<Color>,
    /// Stroke, or `None` for no stroke.
    pub stroke: Option<StrokeStyle>,
    /// Drop shadow, if any.
    pub shadow: Option<ShadowStyle>,
}

/// A color that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidColor {
    /// Field the color came from.
    pub field: &'static str,
    /// Raw value.
    pub value: String,
}

impl PaintState {
    /// Resolve the paint state of a record drawn inside `frame` with the
    /// given local transform.
    ///
    /// Unparseable colors are dropped and returned so the caller can report
    /// them.
    #[allow(clippy::cast_possible_truncation)]
    #[must_use]
    pub fn for_record(
        frame: &Frame,
        common: &CommonProps,
        local: Transform,
    ) -> (Self, Vec<InvalidColor>) {
        let mut invalid = Vec::new();
        let opacity = frame.opacity * common.opacity() as f32;
        let transform = frame.transform.pre_concat(local);

        let mut resolve = |field: &'static str, raw: &str| match parse_color(raw) {
            Some(mut color) if color.alpha() > 0.0 => {
                color.apply_opacity(opacity);
                Some(color)
            }
            Some(_) => None,
            None => {
                invalid.push(InvalidColor {
                    field,
                    value: raw.to_string(),
                });
                None
            }
        };

        let fill = resolve("fillColor", common.fill_color());
        let stroke_width = common.stroke_width() as f32;
        let stroke = resolve("strokeColor", common.stroke_color())
            .filter(|_| stroke_width > 0.0)
            .map(|color| StrokeStyle {
                color,
                stroke: Stroke {
                    width: stroke_width,
                    line_cap: line_cap(common.stroke_cap()),
                    line_join: line_join(common.stroke_join()),
                    dash: common.dash_pattern.as_deref().and_then(dash),
                    ..Stroke::default()
                },
            });
        let shadow = common.shadow.as_ref().and_then(|shadow| {
            let color = resolve("shadow.color", &shadow.color)?;
            Some(ShadowStyle {
                color,
                transform: transform.post_translate(
                    shadow.offset_x as f32 * frame.device_scale,
                    shadow.offset_y as f32 * frame.device_scale,
                ),
            })
        });

        (
            Self {
                transform,
                opacity,
                fill,
                stroke,
                shadow,
            },
            invalid,
        )
    }

    /// Whether nothing this state paints can be visible.
    #[must_use]
    pub fn is_invisible(&self) -> bool {
        self.opacity <= 0.0
    }
}

const fn line_cap(cap: StrokeCap) -> LineCap {
    match cap {
        StrokeCap::Butt => LineCap::Butt,
        StrokeCap::Round => LineCap::Round,
        StrokeCap::Square => LineCap::Square,
    }
}

const fn line_join(join: StrokeJoin) -> LineJoin {
    match join {
        StrokeJoin::Miter => LineJoin::Miter,
        StrokeJoin::Round => LineJoin::Round,
        StrokeJoin::Bevel => LineJoin::Bevel,
    }
}

/// Build a dash pattern. Odd-length patterns repeat once, as on a 2D canvas.
#[allow(clippy::cast_possible_truncation)]
fn dash(pattern: &[f64]) -> Option<StrokeDash> {
    let mut intervals: Vec<f32> = pattern.iter().map(|d| *d as f32).collect();
    if intervals.len() % 2 == 1 {
        intervals.extend_from_within(..);
    }
    StrokeDash::new(intervals, 0.0)
}

pub(crate) fn fill_path(pixmap: &mut Pixmap, path: &Path, color: Color, transform: Transform) {
    let mut paint = Paint::default();
    paint.set_color(color);
    paint.anti_alias = true;
    pixmap.fill_path(path, &paint, FillRule::Winding, transform, None);
}

pub(crate) fn stroke_path(pixmap: &mut Pixmap, path: &Path, style: &StrokeStyle, transform: Transform) {
    let mut paint = Paint::default();
    paint.set_color(style.color);
    paint.anti_alias = true;
    pixmap.stroke_path(path, &paint, &style.stroke, transform, None);
}

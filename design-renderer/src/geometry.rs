//! Object transforms and shape outlines in the object's local frame.
//!
//! The local frame puts `(0, 0)` at the record's top-left corner before any
//! rotation or scaling. Every outline built here is expressed in that frame.

use design_core::record::{CommonProps, DrawableBody, PathCommand, Point};
use tiny_skia::{Path, PathBuilder, Rect, Transform};

/// Circle approximation constant for cubic Bezier arcs.
const KAPPA: f32 = 0.552_284_8;

/// Width and height used for anchoring and layout.
///
/// Circles and ellipses without a declared box fall back to their diameters.
#[must_use]
pub fn box_size(common: &CommonProps, body: &DrawableBody) -> (f64, f64) {
    let (w, h) = (common.width(), common.height());
    match body {
        DrawableBody::Circle(c) if w <= 0.0 && h <= 0.0 => (c.radius() * 2.0, c.radius() * 2.0),
        DrawableBody::Ellipse(e) if w <= 0.0 && h <= 0.0 => (e.rx() * 2.0, e.ry() * 2.0),
        _ => (w, h),
    }
}

/// Local-to-parent transform of a record.
///
/// Applied as: translate to `(x, y)`, translate to the anchor, rotate, scale,
/// translate back from the anchor.
#[allow(clippy::cast_possible_truncation)]
#[must_use]
pub fn local_transform(common: &CommonProps, size: (f64, f64)) -> Transform {
    let anchor_x = (common.origin_x().fraction() * size.0) as f32;
    let anchor_y = (common.origin_y().fraction() * size.1) as f32;
    let (sin, cos) = common.rotation_degrees().to_radians().sin_cos();
    let rotation = Transform::from_row(cos as f32, sin as f32, -sin as f32, cos as f32, 0.0, 0.0);

    Transform::from_translate(common.x() as f32, common.y() as f32)
        .pre_translate(anchor_x, anchor_y)
        .pre_concat(rotation)
        .pre_scale(common.scale_x() as f32, common.scale_y() as f32)
        .pre_translate(-anchor_x, -anchor_y)
}

/// Outline of a shape record, or `None` when it has no area to paint.
#[allow(clippy::cast_possible_truncation)]
#[must_use]
pub fn shape_path(body: &DrawableBody, size: (f64, f64)) -> Option<Path> {
    let (w, h) = (size.0 as f32, size.1 as f32);
    match body {
        DrawableBody::Rect(radii) => {
            if w <= 0.0 || h <= 0.0 {
                return None;
            }
            let rect = Rect::from_xywh(0.0, 0.0, w, h)?;
            let (rx, ry) = (radii.rx() as f32, radii.ry() as f32);
            if rx > 0.0 || ry > 0.0 {
                rounded_rect(rect, rx, ry)
            } else {
                Some(PathBuilder::from_rect(rect))
            }
        }
        DrawableBody::Circle(circle) => {
            let r = circle.radius() as f32;
            ellipse(r, r, r, r)
        }
        DrawableBody::Ellipse(radii) => {
            let (rx, ry) = (radii.rx() as f32, radii.ry() as f32);
            ellipse(rx, ry, rx, ry)
        }
        DrawableBody::Triangle => {
            if w <= 0.0 || h <= 0.0 {
                return None;
            }
            let mut pb = PathBuilder::new();
            pb.move_to(w / 2.0, 0.0);
            pb.line_to(w, h);
            pb.line_to(0.0, h);
            pb.close();
            pb.finish()
        }
        DrawableBody::Polygon(polygon) => polygon_path(polygon.points()),
        DrawableBody::Path(path) => command_path(path.commands()),
        _ => None,
    }
}

/// Segment of a line record.
#[allow(clippy::cast_possible_truncation)]
#[must_use]
pub fn line_path(x1: f64, y1: f64, x2: f64, y2: f64) -> Option<Path> {
    let mut pb = PathBuilder::new();
    pb.move_to(x1 as f32, y1 as f32);
    pb.line_to(x2 as f32, y2 as f32);
    pb.finish()
}

fn ellipse(cx: f32, cy: f32, rx: f32, ry: f32) -> Option<Path> {
    if rx <= 0.0 || ry <= 0.0 {
        return None;
    }
    let (ox, oy) = (rx * KAPPA, ry * KAPPA);
    let mut pb = PathBuilder::new();
    pb.move_to(cx + rx, cy);
    pb.cubic_to(cx + rx, cy + oy, cx + ox, cy + ry, cx, cy + ry);
    pb.cubic_to(cx - ox, cy + ry, cx - rx, cy + oy, cx - rx, cy);
    pb.cubic_to(cx - rx, cy - oy, cx - ox, cy - ry, cx, cy - ry);
    pb.cubic_to(cx + ox, cy - ry, cx + rx, cy - oy, cx + rx, cy);
    pb.close();
    pb.finish()
}

fn rounded_rect(rect: Rect, rx: f32, ry: f32) -> Option<Path> {
    // A single non-zero radius applies to both axes.
    let rx = if rx > 0.0 { rx } else { ry };
    let ry = if ry > 0.0 { ry } else { rx };
    let rx = rx.min(rect.width() / 2.0);
    let ry = ry.min(rect.height() / 2.0);
    let (ox, oy) = (rx * (1.0 - KAPPA), ry * (1.0 - KAPPA));
    let (l, t, r, b) = (rect.left(), rect.top(), rect.right(), rect.bottom());

    let mut pb = PathBuilder::new();
    pb.move_to(l + rx, t);
    pb.line_to(r - rx, t);
    pb.cubic_to(r - ox, t, r, t + oy, r, t + ry);
    pb.line_to(r, b - ry);
    pb.cubic_to(r, b - oy, r - ox, b, r - rx, b);
    pb.line_to(l + rx, b);
    pb.cubic_to(l + ox, b, l, b - oy, l, b - ry);
    pb.line_to(l, t + ry);
    pb.cubic_to(l, t + oy, l + ox, t, l + rx, t);
    pb.close();
    pb.finish()
}

#[allow(clippy::cast_possible_truncation)]
fn polygon_path(points: &[Point]) -> Option<Path> {
    let (first, rest) = points.split_first()?;
    let mut pb = PathBuilder::new();
    pb.move_to(first.x as f32, first.y as f32);
    for point in rest {
        pb.line_to(point.x as f32, point.y as f32);
    }
    pb.close();
    pb.finish()
}

#[allow(clippy::cast_possible_truncation)]
fn command_path(commands: &[PathCommand]) -> Option<Path> {
    let mut pb = PathBuilder::new();
    for command in commands {
        match *command {
            PathCommand::MoveTo { x, y } => pb.move_to(x as f32, y as f32),
            PathCommand::LineTo { x, y } => pb.line_to(x as f32, y as f32),
            PathCommand::CubicBezierTo {
                x1,
                y1,
                x2,
                y2,
                x,
                y,
            } => pb.cubic_to(
                x1 as f32, y1 as f32, x2 as f32, y2 as f32, x as f32, y as f32,
            ),
            PathCommand::QuadraticBezierTo { x1, y1, x, y } => {
                pb.quad_to(x1 as f32, y1 as f32, x as f32, y as f32);
            }
            PathCommand::Close => pb.close(),
        }
    }
    pb.finish()
}

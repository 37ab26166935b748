//! The headless rasterizer.
//!
//! A render flattens the record tree into draw operations, each carrying the
//! immutable [`PaintState`] it is drawn with, and then paints them strictly
//! in order. Image loads are awaited one at a time so network latency can
//! never reorder the output.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use design_core::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
use design_core::document::{CanvasSize, Document};
use design_core::record::{DrawableBody, DrawableRecord, ImageProps};
use serde::{Deserialize, Serialize};
use tiny_skia::{Color, FilterQuality, Path, PathBuilder, Pixmap, PixmapPaint, Rect, Transform};
use tracing::{debug, warn};

use crate::encode::{encode, to_data_uri, OutputFormat, DEFAULT_JPEG_QUALITY};
use crate::error::{RenderError, RenderResult};
use crate::geometry::{box_size, line_path, local_transform, shape_path};
use crate::loader::{DecodedImage, ImageLoader};
use crate::paint::{
    fill_path, parse_color, stroke_path, Frame, InvalidColor, PaintState, StrokeStyle,
};
use crate::text::{paint_text, Font, FontSet, TextRendering};

/// Background used when the document's color cannot be parsed.
const FALLBACK_BACKGROUND: Color = Color::WHITE;

/// Cooperative cancellation flag, checked before each object is painted.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a token that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Every clone observes it.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// How the encoded output is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OutputEncoding {
    /// Raw encoded bytes only.
    #[default]
    Bytes,
    /// Bytes plus a base64 data URI.
    DataUri,
}

/// Render configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderOptions {
    /// Output format.
    pub format: OutputFormat,
    /// JPEG quality, 1-100.
    pub quality: u8,
    /// Output pixels per canvas pixel.
    pub scale_multiplier: f64,
    /// Output encoding.
    pub encoding: OutputEncoding,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            format: OutputFormat::Png,
            quality: DEFAULT_JPEG_QUALITY,
            scale_multiplier: 1.0,
            encoding: OutputEncoding::Bytes,
        }
    }
}

/// Result of a render.
#[derive(Debug, Clone)]
pub struct RenderOutput {
    /// Encoded image.
    pub bytes: Vec<u8>,
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Format of `bytes`.
    pub format: OutputFormat,
    /// Data URI, present when [`OutputEncoding::DataUri`] was requested.
    pub encoded_text: Option<String>,
    /// Degradations encountered while painting.
    pub diagnostics: Diagnostics,
}

impl RenderOutput {
    /// The output as a base64 data URI.
    #[must_use]
    pub fn data_uri(&self) -> String {
        self.encoded_text
            .clone()
            .unwrap_or_else(|| to_data_uri(&self.bytes, self.format))
    }
}

/// Canvas fill painted before any object.
#[derive(Debug, Clone, Copy)]
pub struct Background<'a> {
    /// CSS color.
    pub color: &'a str,
    /// Optional image, cover-fit over the color.
    pub image_uri: Option<&'a str>,
}

impl<'a> Background<'a> {
    /// A solid color background.
    #[must_use]
    pub const fn color(color: &'a str) -> Self {
        Self {
            color,
            image_uri: None,
        }
    }
}

/// One leaf record with its resolved paint state.
struct DrawOp<'a> {
    record: &'a DrawableRecord,
    state: PaintState,
    size: (f64, f64),
}

/// Paints documents onto an in-memory surface.
///
/// Each call to [`Rasterizer::render`] owns its surface, so one rasterizer
/// can serve concurrent renders.
#[derive(Debug)]
pub struct Rasterizer<L> {
    loader: L,
    fonts: FontSet,
}

impl<L: ImageLoader> Rasterizer<L> {
    /// Create a rasterizer using the system fonts that can be found.
    #[must_use]
    pub fn new(loader: L) -> Self {
        Self::with_loader_and_fonts(loader, FontSet::discover())
    }

    /// Use `font` for all text.
    #[must_use]
    pub fn with_font(self, font: Font) -> Self {
        Self::with_loader_and_fonts(self.loader, FontSet::from_font(font))
    }

    /// Replace the font set.
    #[must_use]
    pub fn with_fonts(self, fonts: FontSet) -> Self {
        Self::with_loader_and_fonts(self.loader, fonts)
    }

    fn with_loader_and_fonts(loader: L, fonts: FontSet) -> Self {
        if fonts.is_empty() {
            warn!("no font available; text will be drawn as placeholder blocks");
        }
        Self { loader, fonts }
    }

    /// Render a document.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Cancelled`] if `cancel` fires, and surface or
    /// encoding errors. Unloadable images are diagnostics, not errors.
    pub async fn render(
        &self,
        document: &Document,
        options: &RenderOptions,
        cancel: &CancelToken,
    ) -> RenderResult<RenderOutput> {
        let background = Background {
            color: &document.background_color,
            image_uri: document.background_image_uri.as_deref(),
        };
        self.render_records(&document.objects, document.canvas_size, background, options, cancel)
            .await
    }

    /// Render bare records onto a canvas of the given size.
    ///
    /// # Errors
    ///
    /// See [`Rasterizer::render`].
    pub async fn render_records(
        &self,
        records: &[DrawableRecord],
        canvas: CanvasSize,
        background: Background<'_>,
        options: &RenderOptions,
        cancel: &CancelToken,
    ) -> RenderResult<RenderOutput> {
        let (width, height) = surface_size(canvas, options.scale_multiplier)?;
        let mut pixmap = Pixmap::new(width, height)
            .ok_or_else(|| RenderError::Surface(format!("cannot allocate {width}x{height}")))?;
        let mut diagnostics = Diagnostics::new();
        #[allow(clippy::cast_possible_truncation)]
        let root = Frame::root(options.scale_multiplier as f32);

        debug!(objects = records.len(), width, height, "rendering");

        self.paint_background(&mut pixmap, canvas, background, root, &mut diagnostics)
            .await;

        let mut ops = Vec::with_capacity(records.len());
        flatten(records, root, &mut ops, &mut diagnostics);

        for op in &ops {
            if cancel.is_cancelled() {
                debug!(object_id = %op.record.id, "render cancelled");
                return Err(RenderError::Cancelled);
            }
            self.paint_op(&mut pixmap, op, &mut diagnostics).await;
        }

        let bytes = encode(&pixmap, options.format, options.quality)?;
        let encoded_text = match options.encoding {
            OutputEncoding::Bytes => None,
            OutputEncoding::DataUri => Some(to_data_uri(&bytes, options.format)),
        };

        debug!(bytes = bytes.len(), diagnostics = diagnostics.len(), "render finished");
        Ok(RenderOutput {
            bytes,
            width,
            height,
            format: options.format,
            encoded_text,
            diagnostics,
        })
    }

    async fn paint_background(
        &self,
        pixmap: &mut Pixmap,
        canvas: CanvasSize,
        background: Background<'_>,
        root: Frame,
        diagnostics: &mut Diagnostics,
    ) {
        let color = parse_color(background.color).unwrap_or_else(|| {
            diagnostics.push(Diagnostic::document(
                DiagnosticKind::MalformedInput,
                format!("unparseable background color {:?}", background.color),
            ));
            FALLBACK_BACKGROUND
        });
        pixmap.fill(color);

        let Some(uri) = background.image_uri.filter(|uri| !uri.is_empty()) else {
            return;
        };
        match self.loader.load(uri).await {
            Ok(image) => {
                let size = (canvas.width, canvas.height);
                if let Err(e) = draw_cover(pixmap, &image, size, root.transform, 1.0) {
                    report_unavailable(diagnostics, None, &e);
                }
            }
            Err(e) => report_unavailable(diagnostics, None, &e),
        }
    }

    async fn paint_op(&self, pixmap: &mut Pixmap, op: &DrawOp<'_>, diagnostics: &mut Diagnostics) {
        let state = &op.state;
        match &op.record.body {
            DrawableBody::Text(text) => {
                if let Some(shadow) = &state.shadow {
                    let silhouette = PaintState {
                        transform: shadow.transform,
                        fill: Some(shadow.color),
                        stroke: None,
                        shadow: None,
                        ..state.clone()
                    };
                    paint_text(pixmap, &self.fonts, text, op.size.0, &silhouette);
                }
                if paint_text(pixmap, &self.fonts, text, op.size.0, state)
                    == TextRendering::Placeholder
                {
                    debug!(object_id = %op.record.id, "text drawn as placeholder blocks");
                }
            }
            DrawableBody::Image(image) => {
                self.paint_image(pixmap, op, image, diagnostics).await;
            }
            DrawableBody::Line(line) => {
                let (x1, y1, x2, y2) = line.endpoints();
                if let (Some(path), Some(stroke)) = (line_path(x1, y1, x2, y2), &state.stroke) {
                    if let Some(shadow) = &state.shadow {
                        stroke_path(
                            pixmap,
                            &path,
                            &StrokeStyle {
                                color: shadow.color,
                                stroke: stroke.stroke.clone(),
                            },
                            shadow.transform,
                        );
                    }
                    stroke_path(pixmap, &path, stroke, state.transform);
                }
            }
            body => {
                let Some(path) = shape_path(body, op.size) else {
                    return;
                };
                if let Some(shadow) = &state.shadow {
                    fill_path(pixmap, &path, shadow.color, shadow.transform);
                }
                if let Some(fill) = state.fill {
                    fill_path(pixmap, &path, fill, state.transform);
                }
                if let Some(stroke) = &state.stroke {
                    stroke_path(pixmap, &path, stroke, state.transform);
                }
            }
        }
    }

    async fn paint_image(
        &self,
        pixmap: &mut Pixmap,
        op: &DrawOp<'_>,
        image: &ImageProps,
        diagnostics: &mut Diagnostics,
    ) {
        let id = op.record.id.as_str();
        let decoded = match self.loader.load(image.source_uri()).await {
            Ok(decoded) => decoded,
            Err(e) => return report_unavailable(diagnostics, Some(id), &e),
        };
        let size = match op.size {
            (w, h) if w > 0.0 && h > 0.0 => (w, h),
            _ => (f64::from(decoded.width), f64::from(decoded.height)),
        };
        let state = &op.state;
        let frame = frame_path(size);

        if let (Some(shadow), Some(path)) = (&state.shadow, &frame) {
            fill_path(pixmap, path, shadow.color, shadow.transform);
        }
        if let Err(e) = draw_cover(pixmap, &decoded, size, state.transform, state.opacity) {
            return report_unavailable(diagnostics, Some(id), &e);
        }
        if let (Some(stroke), Some(path)) = (&state.stroke, &frame) {
            stroke_path(pixmap, path, stroke, state.transform);
        }
    }
}

fn report_unavailable(diagnostics: &mut Diagnostics, object_id: Option<&str>, error: &RenderError) {
    warn!(object_id = object_id.unwrap_or("background"), error = %error, "image unavailable");
    let diagnostic = match object_id {
        Some(id) => Diagnostic::for_object(DiagnosticKind::ResourceUnavailable, id, error.to_string()),
        None => Diagnostic::document(DiagnosticKind::ResourceUnavailable, error.to_string()),
    };
    diagnostics.push(diagnostic);
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn surface_size(canvas: CanvasSize, scale: f64) -> RenderResult<(u32, u32)> {
    if !(scale.is_finite() && scale > 0.0) {
        return Err(RenderError::Surface(format!("invalid scale multiplier {scale}")));
    }
    let width = (canvas.width * scale).round();
    let height = (canvas.height * scale).round();
    if !(width >= 1.0 && height >= 1.0 && width <= f64::from(u32::MAX) && height <= f64::from(u32::MAX)) {
        return Err(RenderError::Surface(format!(
            "invalid surface size {}x{} at scale {scale}",
            canvas.width, canvas.height
        )));
    }
    Ok((width as u32, height as u32))
}

/// Resolve every leaf record, depth-first, in paint order.
///
/// Group children inherit the group's transform and opacity.
fn flatten<'a>(
    records: &'a [DrawableRecord],
    frame: Frame,
    ops: &mut Vec<DrawOp<'a>>,
    diagnostics: &mut Diagnostics,
) {
    for record in records {
        if let DrawableBody::Unknown { source_kind } = &record.body {
            let kind = source_kind.as_deref().unwrap_or("<missing>");
            if diagnostics.push_once(Diagnostic::for_object(
                DiagnosticKind::UnknownDrawableKind,
                &record.id,
                format!("kind {kind:?} is not painted"),
            )) {
                warn!(object_id = %record.id, kind, "unknown drawable kind");
            }
            continue;
        }

        let size = box_size(&record.common, &record.body);
        let local = local_transform(&record.common, size);
        let (state, invalid) = PaintState::for_record(&frame, &record.common, local);
        report_invalid_colors(diagnostics, &record.id, invalid);

        if state.is_invisible() {
            continue;
        }
        match &record.body {
            DrawableBody::Group(group) => {
                flatten(group.objects(), frame.nested(&state), ops, diagnostics);
            }
            _ => ops.push(DrawOp {
                record,
                state,
                size,
            }),
        }
    }
}

fn report_invalid_colors(diagnostics: &mut Diagnostics, id: &str, invalid: Vec<InvalidColor>) {
    for InvalidColor { field, value } in invalid {
        debug!(object_id = id, field, value = %value, "unparseable color");
        diagnostics.push(Diagnostic::for_object(
            DiagnosticKind::MalformedInput,
            id,
            format!("unparseable {field} {value:?}"),
        ));
    }
}

#[allow(clippy::cast_possible_truncation)]
fn frame_path(size: (f64, f64)) -> Option<Path> {
    Rect::from_xywh(0.0, 0.0, size.0 as f32, size.1 as f32).map(PathBuilder::from_rect)
}

/// Cover-fit `image` into a `size` box in the local frame of `transform`.
#[allow(clippy::cast_possible_truncation)]
fn draw_cover(
    pixmap: &mut Pixmap,
    image: &DecodedImage,
    size: (f64, f64),
    transform: Transform,
    opacity: f32,
) -> RenderResult<()> {
    let (x, y, crop_w, crop_h) = image.cover_crop(size.0, size.1);
    let source = image.crop(x, y, crop_w, crop_h)?.to_pixmap()?;
    let scale = (
        (size.0 / f64::from(crop_w)) as f32,
        (size.1 / f64::from(crop_h)) as f32,
    );
    let paint = PixmapPaint {
        opacity,
        quality: FilterQuality::Bilinear,
        ..PixmapPaint::default()
    };
    pixmap.draw_pixmap(0, 0, source.as_ref(), &paint, transform.pre_scale(scale.0, scale.1), None);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use design_core::record::{GroupProps, RadiiProps};

    struct NoImages;

    #[async_trait]
    impl ImageLoader for NoImages {
        async fn load(&self, uri: &str) -> RenderResult<DecodedImage> {
            Err(RenderError::Resource(format!("offline: {uri}")))
        }
    }

    fn rect(id: &str, x: f64, y: f64, w: f64, h: f64, fill: &str) -> DrawableRecord {
        DrawableRecord::new(id, DrawableBody::Rect(RadiiProps::default()))
            .with_bounds(x, y, w, h)
            .with_fill(fill)
    }

    #[test]
    fn test_surface_size_scales() {
        let size = surface_size(CanvasSize::new(200.0, 100.0), 1.5).expect("size");
        assert_eq!(size, (300, 150));
        assert!(surface_size(CanvasSize::new(0.0, 100.0), 1.0).is_err());
        assert!(surface_size(CanvasSize::new(10.0, 10.0), 0.0).is_err());
    }

    #[test]
    fn test_flatten_composes_group_frames() {
        let mut group = DrawableRecord::new(
            "g",
            DrawableBody::Group(GroupProps {
                objects: Some(vec![rect("child", 5.0, 5.0, 2.0, 2.0, "#ff0000")]),
            }),
        )
        .with_bounds(10.0, 20.0, 50.0, 50.0);
        group.common.opacity = Some(0.5);

        let mut ops = Vec::new();
        let mut diagnostics = Diagnostics::new();
        let records = [group];
        flatten(&records, Frame::root(1.0), &mut ops, &mut diagnostics);

        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].record.id, "child");
        assert!((ops[0].state.transform.tx - 15.0).abs() < 1e-4);
        assert!((ops[0].state.transform.ty - 25.0).abs() < 1e-4);
        assert!((ops[0].state.opacity - 0.5).abs() < 1e-6);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_flatten_skips_invisible_and_reports_unknown_once() {
        let mut hidden = rect("hidden", 0.0, 0.0, 5.0, 5.0, "#000000");
        hidden.common.opacity = Some(0.0);
        let unknown = |id: &str| {
            DrawableRecord::new(
                id,
                DrawableBody::Unknown {
                    source_kind: Some("sticker".into()),
                },
            )
        };
        let records = [hidden, unknown("u1"), unknown("u2")];

        let mut ops = Vec::new();
        let mut diagnostics = Diagnostics::new();
        flatten(&records, Frame::root(1.0), &mut ops, &mut diagnostics);

        assert!(ops.is_empty());
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics.contains_kind(DiagnosticKind::UnknownDrawableKind));
    }

    #[tokio::test]
    async fn test_cancelled_before_first_object() {
        let rasterizer = Rasterizer::new(NoImages).with_fonts(FontSet::empty());
        let cancel = CancelToken::new();
        cancel.cancel();
        let records = [rect("r", 0.0, 0.0, 5.0, 5.0, "#000000")];
        let result = rasterizer
            .render_records(
                &records,
                CanvasSize::new(10.0, 10.0),
                Background::color("#ffffff"),
                &RenderOptions::default(),
                &cancel,
            )
            .await;
        assert!(matches!(result, Err(RenderError::Cancelled)));
    }

    #[tokio::test]
    async fn test_invalid_background_falls_back_to_white() {
        let rasterizer = Rasterizer::new(NoImages).with_fonts(FontSet::empty());
        let output = rasterizer
            .render_records(
                &[],
                CanvasSize::new(4.0, 4.0),
                Background {
                    color: "ultraviolet",
                    image_uri: Some("https://example.invalid/bg.png"),
                },
                &RenderOptions {
                    encoding: OutputEncoding::DataUri,
                    ..RenderOptions::default()
                },
                &CancelToken::new(),
            )
            .await
            .expect("render");
        assert!(output.diagnostics.contains_kind(DiagnosticKind::MalformedInput));
        assert!(output.diagnostics.contains_kind(DiagnosticKind::ResourceUnavailable));
        assert!(output.data_uri().starts_with("data:image/png;base64,"));
        assert_eq!(output.encoded_text.as_deref(), Some(output.data_uri().as_str()));
    }
}

//! Text painting from TrueType glyph outlines.
//!
//! Every glyph of a record is appended to one path in the record's local
//! frame. The path is filled first and stroked afterwards, so the stroke sits
//! centred on the glyph edges above the fill of every glyph.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use design_core::record::{TextAlign, TextProps};
use tiny_skia::{PathBuilder, Pixmap, Rect};
use tracing::debug;
use ttf_parser::{Face, GlyphId, OutlineBuilder};

use crate::error::{RenderError, RenderResult};
use crate::paint::{fill_path, stroke_path, PaintState};

/// Common system font paths searched for the regular face.
const FONT_SEARCH_PATHS: &[&str] = &[
    // Linux
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/truetype/freefont/FreeSans.ttf",
    "/usr/share/fonts/noto/NotoSans-Regular.ttf",
    // macOS
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "/System/Library/Fonts/Helvetica.ttc",
    // Windows
    "C:\\Windows\\Fonts\\arial.ttf",
    "C:\\Windows\\Fonts\\segoeui.ttf",
];

/// System font paths searched for the bold face.
const FONT_BOLD_SEARCH_PATHS: &[&str] = &[
    // Linux
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/TTF/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
    "/usr/share/fonts/liberation/LiberationSans-Bold.ttf",
    "/usr/share/fonts/truetype/freefont/FreeSansBold.ttf",
    "/usr/share/fonts/noto/NotoSans-Bold.ttf",
    // macOS
    "/System/Library/Fonts/Supplemental/Arial Bold.ttf",
    "/Library/Fonts/Arial Bold.ttf",
    // Windows
    "C:\\Windows\\Fonts\\arialbd.ttf",
];

/// Placeholder block advance as a fraction of the font size.
const PLACEHOLDER_ADVANCE: f32 = 0.6;

/// A parsed TrueType or OpenType font file.
#[derive(Clone)]
pub struct Font {
    data: Arc<[u8]>,
}

impl fmt::Debug for Font {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Font").field("bytes", &self.data.len()).finish()
    }
}

impl Font {
    /// Wrap font file contents.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Resource`] if the data is not a font.
    pub fn from_bytes(data: Vec<u8>) -> RenderResult<Self> {
        Face::parse(&data, 0).map_err(|e| RenderError::Resource(format!("Invalid font: {e}")))?;
        Ok(Self { data: data.into() })
    }

    fn face(&self) -> Option<Face<'_>> {
        Face::parse(&self.data, 0).ok()
    }
}

/// Regular and bold faces used for every text record.
#[derive(Debug, Clone, Default)]
pub struct FontSet {
    regular: Option<Font>,
    bold: Option<Font>,
}

impl FontSet {
    /// A font set with no faces. Text renders as placeholder blocks.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Search the usual system locations for a regular and a bold face.
    #[must_use]
    pub fn discover() -> Self {
        Self {
            regular: load_font_from_paths(FONT_SEARCH_PATHS, "regular"),
            bold: load_font_from_paths(FONT_BOLD_SEARCH_PATHS, "bold"),
        }
    }

    /// A font set that uses `font` for every weight.
    #[must_use]
    pub fn from_font(font: Font) -> Self {
        Self {
            regular: Some(font),
            bold: None,
        }
    }

    /// Replace the bold face.
    #[must_use]
    pub fn with_bold(mut self, font: Font) -> Self {
        self.bold = Some(font);
        self
    }

    /// Load a font file.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Resource`] if the file cannot be read or parsed.
    pub fn load_file(path: &Path) -> RenderResult<Font> {
        let data = std::fs::read(path)
            .map_err(|e| RenderError::Resource(format!("{}: {e}", path.display())))?;
        Font::from_bytes(data)
            .map_err(|e| RenderError::Resource(format!("{}: {e}", path.display())))
    }

    /// The face for the given weight, falling back to the regular face.
    #[must_use]
    pub fn select(&self, bold: bool) -> Option<&Font> {
        if bold {
            self.bold.as_ref().or(self.regular.as_ref())
        } else {
            self.regular.as_ref()
        }
    }

    /// Whether no face is available.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.regular.is_none() && self.bold.is_none()
    }
}

fn load_font_from_paths(paths: &[&str], label: &str) -> Option<Font> {
    for path in paths {
        if let Ok(data) = std::fs::read(path) {
            if let Ok(font) = Font::from_bytes(data) {
                debug!(path, label, "loaded system font");
                return Some(font);
            }
        }
    }
    None
}

/// How a text record ended up on the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextRendering {
    /// Glyph outlines were drawn from a font.
    Glyphs,
    /// No font was available; blocks were drawn in place of glyphs.
    Placeholder,
    /// Nothing visible to draw.
    Skipped,
}

/// Horizontal start of a line inside a box of `box_width`.
#[must_use]
pub fn line_start(align: TextAlign, box_width: f32, line_width: f32) -> f32 {
    match align {
        TextAlign::Left => 0.0,
        TextAlign::Center => (box_width - line_width) / 2.0,
        TextAlign::Right => box_width - line_width,
    }
}

/// Glyph metrics of one record at its font size, in local units.
struct Layout<'a> {
    face: Option<Face<'a>>,
    size: f32,
    /// Local units per font unit.
    scale: f32,
}

impl<'a> Layout<'a> {
    fn new(face: Option<Face<'a>>, size: f32) -> Self {
        let scale = face
            .as_ref()
            .map_or(0.0, |face| size / f32::from(face.units_per_em().max(1)));
        Self { face, size, scale }
    }

    fn glyph(face: &Face<'_>, ch: char) -> GlyphId {
        face.glyph_index(ch).unwrap_or(GlyphId(0))
    }

    fn advance(&self, ch: char) -> f32 {
        match &self.face {
            Some(face) => face
                .glyph_hor_advance(Self::glyph(face, ch))
                .map_or(0.0, |advance| f32::from(advance) * self.scale),
            None => self.size * PLACEHOLDER_ADVANCE,
        }
    }

    fn ascent(&self) -> f32 {
        self.face
            .as_ref()
            .map_or(self.size * 0.8, |face| f32::from(face.ascender()) * self.scale)
    }

    #[allow(clippy::cast_precision_loss)]
    fn line_width(&self, line: &str, spacing: f32) -> f32 {
        let (count, advances) = visible_chars(line)
            .fold((0_usize, 0.0_f32), |(n, width), ch| (n + 1, width + self.advance(ch)));
        advances + spacing * count.saturating_sub(1) as f32
    }

    /// Append the glyph for `ch` with its pen position at `x` and its
    /// baseline at `baseline`.
    fn push_glyph(&self, builder: &mut PathBuilder, ch: char, x: f32, baseline: f32) {
        match &self.face {
            Some(face) => {
                let mut outline = GlyphOutline {
                    builder,
                    x,
                    baseline,
                    scale: self.scale,
                };
                face.outline_glyph(Self::glyph(face, ch), &mut outline);
            }
            None => push_placeholder(builder, ch, self.size, x, baseline - self.ascent()),
        }
    }
}

fn visible_chars(line: &str) -> impl Iterator<Item = char> + '_ {
    line.chars().filter(|ch| !ch.is_control())
}

/// Maps font units (y up from the baseline) into the local frame (y down).
struct GlyphOutline<'a> {
    builder: &'a mut PathBuilder,
    x: f32,
    baseline: f32,
    scale: f32,
}

impl GlyphOutline<'_> {
    fn map(&self, x: f32, y: f32) -> (f32, f32) {
        (self.x + x * self.scale, self.baseline - y * self.scale)
    }
}

impl OutlineBuilder for GlyphOutline<'_> {
    fn move_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.map(x, y);
        self.builder.move_to(x, y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.map(x, y);
        self.builder.line_to(x, y);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        let (x1, y1) = self.map(x1, y1);
        let (x, y) = self.map(x, y);
        self.builder.quad_to(x1, y1, x, y);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        let (x1, y1) = self.map(x1, y1);
        let (x2, y2) = self.map(x2, y2);
        let (x, y) = self.map(x, y);
        self.builder.cubic_to(x1, y1, x2, y2, x, y);
    }

    fn close(&mut self) {
        self.builder.close();
    }
}

fn push_placeholder(builder: &mut PathBuilder, ch: char, size: f32, x: f32, top: f32) {
    if ch.is_whitespace() {
        return;
    }
    if let Some(block) = Rect::from_xywh(
        x + size * 0.05,
        top + size * 0.15,
        size * (PLACEHOLDER_ADVANCE - 0.1),
        size * 0.7,
    ) {
        builder.push_rect(block);
    }
}

/// Paint a text record in its local frame.
///
/// Lines split on `\n`. Line `i` has its top at `i * fontSize * lineHeight`
/// and every glyph advance is widened by `charSpacing` pixels.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub fn paint_text(
    pixmap: &mut Pixmap,
    fonts: &FontSet,
    text: &TextProps,
    box_width: f64,
    state: &PaintState,
) -> TextRendering {
    let content = text.content();
    let size = text.font_size_px() as f32;
    if content.is_empty() || size <= 0.0 || (state.fill.is_none() && state.stroke.is_none()) {
        return TextRendering::Skipped;
    }

    let layout = Layout::new(fonts.select(text.is_bold()).and_then(Font::face), size);
    let rendering = if layout.face.is_some() {
        TextRendering::Glyphs
    } else {
        TextRendering::Placeholder
    };
    let spacing = text.char_spacing() as f32;
    let line_advance = size * text.line_height_multiplier() as f32;
    let ascent = layout.ascent();

    let mut builder = PathBuilder::new();
    for (index, line) in content.split('\n').enumerate() {
        let baseline = index as f32 * line_advance + ascent;
        let mut pen = line_start(
            text.text_align(),
            box_width as f32,
            layout.line_width(line, spacing),
        );
        for ch in visible_chars(line) {
            layout.push_glyph(&mut builder, ch, pen, baseline);
            pen += layout.advance(ch) + spacing;
        }
    }

    let Some(path) = builder.finish() else {
        return rendering;
    };
    if let Some(fill) = state.fill {
        fill_path(pixmap, &path, fill, state.transform);
    }
    if let Some(stroke) = &state.stroke {
        stroke_path(pixmap, &path, stroke, state.transform);
    }
    rendering
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paint::Frame;
    use design_core::record::CommonProps;
    use tiny_skia::Transform;

    fn text(content: &str) -> TextProps {
        TextProps {
            content: Some(content.to_string()),
            font_size_px: Some(20.0),
            ..TextProps::default()
        }
    }

    fn state_for(common: &CommonProps) -> PaintState {
        PaintState::for_record(&Frame::root(1.0), common, Transform::identity()).0
    }

    fn black_state() -> PaintState {
        state_for(&CommonProps::default())
    }

    fn dark_pixels(pixmap: &Pixmap, x0: u32, y0: u32, x1: u32, y1: u32) -> usize {
        let mut count = 0;
        for y in y0..y1 {
            for x in x0..x1 {
                if pixmap.pixel(x, y).is_some_and(|p| p.alpha() > 128) {
                    count += 1;
                }
            }
        }
        count
    }

    #[test]
    fn test_line_start_alignment() {
        assert!((line_start(TextAlign::Left, 100.0, 40.0)).abs() < f32::EPSILON);
        assert!((line_start(TextAlign::Center, 100.0, 40.0) - 30.0).abs() < f32::EPSILON);
        assert!((line_start(TextAlign::Right, 100.0, 40.0) - 60.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_placeholder_blocks_without_font() {
        let mut pixmap = Pixmap::new(100, 60).expect("pixmap");
        let outcome = paint_text(&mut pixmap, &FontSet::empty(), &text("Hi\nThere"), 100.0, &black_state());
        assert_eq!(outcome, TextRendering::Placeholder);
        // First line occupies the top band, second line starts at 20 * 1.16.
        assert!(dark_pixels(&pixmap, 0, 0, 30, 20) > 0);
        assert!(dark_pixels(&pixmap, 0, 24, 60, 45) > 0);
        assert_eq!(dark_pixels(&pixmap, 80, 0, 100, 20), 0);
    }

    #[test]
    fn test_right_alignment_moves_blocks() {
        let mut pixmap = Pixmap::new(100, 30).expect("pixmap");
        let props = TextProps {
            text_align: Some(TextAlign::Right),
            ..text("ab")
        };
        paint_text(&mut pixmap, &FontSet::empty(), &props, 100.0, &black_state());
        assert_eq!(dark_pixels(&pixmap, 0, 0, 70, 30), 0);
        assert!(dark_pixels(&pixmap, 76, 0, 100, 30) > 0);
    }

    #[test]
    fn test_char_spacing_widens_advance() {
        // Blocks are 10px wide at x = 1 and x = 13; 10px spacing moves the
        // second one to x = 23.
        let mut tight = Pixmap::new(60, 20).expect("pixmap");
        paint_text(&mut tight, &FontSet::empty(), &text("ab"), 60.0, &black_state());
        let mut spaced = Pixmap::new(60, 20).expect("pixmap");
        let props = TextProps {
            char_spacing: Some(10.0),
            ..text("ab")
        };
        paint_text(&mut spaced, &FontSet::empty(), &props, 60.0, &black_state());

        assert!(dark_pixels(&tight, 14, 5, 22, 15) > 0);
        assert_eq!(dark_pixels(&tight, 25, 0, 60, 20), 0);
        assert_eq!(dark_pixels(&spaced, 12, 0, 22, 20), 0);
        assert!(dark_pixels(&spaced, 24, 5, 32, 15) > 0);
    }

    #[test]
    fn test_stroke_is_painted_over_the_fill() {
        let common = CommonProps {
            fill_color: Some("#ff0000".into()),
            stroke_color: Some("#0000ff".into()),
            stroke_width: Some(4.0),
            ..CommonProps::default()
        };
        let mut pixmap = Pixmap::new(30, 30).expect("pixmap");
        paint_text(&mut pixmap, &FontSet::empty(), &text("a"), 30.0, &state_for(&common));

        // The block spans x 1..11 and y 3..17. The inner half of the stroke
        // covers x 1..3 inside the block.
        let inner_edge = pixmap.pixel(2, 10).expect("pixel");
        assert!(inner_edge.blue() > 200 && inner_edge.red() < 50);
        let centre = pixmap.pixel(6, 10).expect("pixel");
        assert!(centre.red() > 200 && centre.blue() < 50);
    }

    #[test]
    fn test_empty_content_is_skipped() {
        let mut pixmap = Pixmap::new(10, 10).expect("pixmap");
        let outcome = paint_text(&mut pixmap, &FontSet::empty(), &text(""), 10.0, &black_state());
        assert_eq!(outcome, TextRendering::Skipped);
    }

    #[test]
    fn test_system_font_draws_glyphs_when_available() {
        let fonts = FontSet::discover();
        if fonts.is_empty() {
            return;
        }
        let mut pixmap = Pixmap::new(120, 40).expect("pixmap");
        let outcome = paint_text(&mut pixmap, &fonts, &text("Hi"), 120.0, &black_state());
        assert_eq!(outcome, TextRendering::Glyphs);
        assert!(dark_pixels(&pixmap, 0, 0, 60, 30) > 0);
    }

    #[test]
    fn test_bold_falls_back_to_regular() {
        let fonts = FontSet::empty();
        assert!(fonts.select(true).is_none());
        assert!(fonts.is_empty());
    }

    #[test]
    fn test_invalid_font_bytes_rejected() {
        assert!(matches!(
            Font::from_bytes(b"not a font".to_vec()),
            Err(RenderError::Resource(_))
        ));
    }
}

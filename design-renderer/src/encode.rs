//! Surface encoding to PNG, JPEG and data URIs.

use base64::Engine;
use image::ImageEncoder;
use serde::{Deserialize, Serialize};
use tiny_skia::Pixmap;

use crate::error::{RenderError, RenderResult};

/// Default JPEG quality.
pub const DEFAULT_JPEG_QUALITY: u8 = 85;

/// Raster output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Lossless PNG.
    #[default]
    Png,
    /// Lossy JPEG, composited over white.
    Jpeg,
}

impl OutputFormat {
    /// MIME type of the encoded bytes.
    #[must_use]
    pub const fn mime_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
        }
    }

    /// Conventional file extension.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
        }
    }
}

/// Encode a surface.
///
/// `quality` only applies to JPEG and is clamped to 1-100.
///
/// # Errors
///
/// Returns [`RenderError::Encode`] if the encoder fails.
pub fn encode(pixmap: &Pixmap, format: OutputFormat, quality: u8) -> RenderResult<Vec<u8>> {
    match format {
        OutputFormat::Png => pixmap
            .encode_png()
            .map_err(|e| RenderError::Encode(format!("PNG encoding failed: {e}"))),
        OutputFormat::Jpeg => encode_jpeg(pixmap, quality.clamp(1, 100)),
    }
}

/// Byte length of a packed RGB buffer, computed without `u32` overflow.
fn rgb_len(width: u32, height: u32) -> usize {
    width as usize * height as usize * 3
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn encode_jpeg(pixmap: &Pixmap, quality: u8) -> RenderResult<Vec<u8>> {
    const BACKGROUND: [u8; 3] = [255, 255, 255];

    let (width, height) = (pixmap.width(), pixmap.height());
    let mut rgb_data = Vec::with_capacity(rgb_len(width, height));
    // Pixels are premultiplied, so compositing is `c + bg * (1 - a)`.
    for pixel in pixmap.data().chunks_exact(4) {
        let inv = 1.0 - f32::from(pixel[3]) / 255.0;
        for (channel, bg) in pixel[..3].iter().zip(BACKGROUND) {
            let value = f32::from(bg).mul_add(inv, f32::from(*channel));
            rgb_data.push(value.round().clamp(0.0, 255.0) as u8);
        }
    }

    let mut buf = std::io::Cursor::new(Vec::new());
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, quality);
    encoder
        .write_image(&rgb_data, width, height, image::ExtendedColorType::Rgb8)
        .map_err(|e| RenderError::Encode(format!("JPEG encoding failed: {e}")))?;

    Ok(buf.into_inner())
}

/// Wrap encoded bytes in a base64 data URI.
#[must_use]
pub fn to_data_uri(bytes: &[u8], format: OutputFormat) -> String {
    format!(
        "data:{};base64,{}",
        format.mime_type(),
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}

//! Image loading for image records and background images.
//!
//! Supports data URIs (base64 or percent-encoded), `file://` URLs, bare
//! filesystem paths and `http(s)://` URLs.

use async_trait::async_trait;
use base64::Engine;
use percent_encoding::percent_decode_str;
use tiny_skia::{ColorU8, IntSize, Pixmap};

use crate::error::{RenderError, RenderResult};

/// Decoded image data.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Straight-alpha RGBA pixel data (4 bytes per pixel).
    pub data: Vec<u8>,
    /// Original format of the image.
    pub format: ImageFormat,
}

/// Supported image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    /// PNG with alpha support.
    Png,
    /// JPEG (no alpha).
    Jpeg,
    /// WebP (alpha support).
    WebP,
    /// GIF (first frame).
    Gif,
    /// Unknown/other format.
    Unknown,
}

impl ImageFormat {
    /// Detect format from magic bytes.
    #[must_use]
    pub fn from_magic_bytes(data: &[u8]) -> Self {
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
            Self::Png
        } else if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Self::Jpeg
        } else if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
            Self::WebP
        } else if data.starts_with(b"GIF8") {
            Self::Gif
        } else {
            Self::Unknown
        }
    }
}

impl DecodedImage {
    /// Premultiply into a pixmap for compositing.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Resource`] if the image has no pixels.
    pub fn to_pixmap(&self) -> RenderResult<Pixmap> {
        let size = IntSize::from_wh(self.width, self.height)
            .ok_or_else(|| RenderError::Resource("image has zero size".into()))?;
        let mut pixmap = Pixmap::new(size.width(), size.height())
            .ok_or_else(|| RenderError::Resource("image too large".into()))?;
        for (dst, src) in pixmap.pixels_mut().iter_mut().zip(self.data.chunks_exact(4)) {
            *dst = ColorU8::from_rgba(src[0], src[1], src[2], src[3]).premultiply();
        }
        Ok(pixmap)
    }

    /// Centered crop with the aspect ratio of `width` x `height`.
    ///
    /// Returns the crop as `(x, y, width, height)` in source pixels.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    #[must_use]
    pub fn cover_crop(&self, width: f64, height: f64) -> (u32, u32, u32, u32) {
        let (iw, ih) = (f64::from(self.width), f64::from(self.height));
        let scale = (width / iw).max(height / ih);
        let crop_w = (width / scale).round().clamp(1.0, iw) as u32;
        let crop_h = (height / scale).round().clamp(1.0, ih) as u32;
        let x = (self.width - crop_w) / 2;
        let y = (self.height - crop_h) / 2;
        (x, y, crop_w, crop_h)
    }

    /// Copy out a sub-rectangle.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Resource`] if the rectangle is empty or out of bounds.
    pub fn crop(&self, x: u32, y: u32, width: u32, height: u32) -> RenderResult<Self> {
        let buffer = image::RgbaImage::from_raw(self.width, self.height, self.data.clone())
            .ok_or_else(|| RenderError::Resource("pixel buffer size mismatch".into()))?;
        if width == 0 || height == 0 || x + width > self.width || y + height > self.height {
            return Err(RenderError::Resource("crop outside image".into()));
        }
        let cropped = image::imageops::crop_imm(&buffer, x, y, width, height).to_image();
        Ok(Self {
            width,
            height,
            data: cropped.into_raw(),
            format: self.format,
        })
    }
}

/// Load an image from raw bytes.
///
/// # Errors
///
/// Returns an error if the image cannot be decoded.
pub fn load_image_from_bytes(data: &[u8]) -> RenderResult<DecodedImage> {
    let format = ImageFormat::from_magic_bytes(data);

    let img = image::load_from_memory(data)
        .map_err(|e| RenderError::Resource(format!("Failed to decode image: {e}")))?;

    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();

    Ok(DecodedImage {
        width,
        height,
        data: rgba.into_raw(),
        format,
    })
}

/// Load an image from a data URI.
///
/// Supports formats like: `data:image/png;base64,iVBORw0KGgo...`
///
/// # Errors
///
/// Returns an error if the data URI is malformed or the image cannot be decoded.
pub fn load_image_from_data_uri(uri: &str) -> RenderResult<DecodedImage> {
    let uri_data = uri
        .strip_prefix("data:")
        .ok_or_else(|| RenderError::Resource("Not a data URI".to_string()))?;

    let (metadata, encoded_data) = uri_data
        .split_once(',')
        .ok_or_else(|| RenderError::Resource("Invalid data URI: missing comma".to_string()))?;

    let bytes = if metadata.ends_with(";base64") {
        base64::engine::general_purpose::STANDARD
            .decode(encoded_data.trim())
            .map_err(|e| RenderError::Resource(format!("Failed to decode base64: {e}")))?
    } else {
        percent_decode_str(encoded_data).collect()
    };

    load_image_from_bytes(&bytes)
}

/// Resolves an image reference into decoded pixels.
#[async_trait]
pub trait ImageLoader: Send + Sync {
    /// Fetch and decode the image at `uri`.
    async fn load(&self, uri: &str) -> RenderResult<DecodedImage>;
}

/// Loader for data URIs, local files and HTTP(S) URLs.
#[derive(Debug, Clone, Default)]
pub struct UriImageLoader {
    client: reqwest::Client,
}

impl UriImageLoader {
    /// Create a loader with a default HTTP client.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a loader that shares an existing HTTP client.
    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn fetch(&self, uri: &str) -> RenderResult<Vec<u8>> {
        let response = self
            .client
            .get(uri)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| RenderError::Resource(format!("GET {uri}: {e}")))?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| RenderError::Resource(format!("GET {uri}: {e}")))?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl ImageLoader for UriImageLoader {
    async fn load(&self, uri: &str) -> RenderResult<DecodedImage> {
        if uri.is_empty() {
            return Err(RenderError::Resource("empty image URI".into()));
        }
        if uri.starts_with("data:") {
            return load_image_from_data_uri(uri);
        }
        if uri.starts_with("http://") || uri.starts_with("https://") {
            let bytes = self.fetch(uri).await?;
            return load_image_from_bytes(&bytes);
        }

        let path = if uri.starts_with("file://") {
            url::Url::parse(uri)
                .ok()
                .and_then(|u| u.to_file_path().ok())
                .ok_or_else(|| RenderError::Resource(format!("Invalid file URL: {uri}")))?
        } else {
            std::path::PathBuf::from(uri)
        };
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| RenderError::Resource(format!("{}: {e}", path.display())))?;
        load_image_from_bytes(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_bytes(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba(rgba));
        let mut buf = std::io::Cursor::new(Vec::new());
        img.write_to(&mut buf, image::ImageFormat::Png)
            .expect("encode png");
        buf.into_inner()
    }

    #[test]
    fn test_format_from_magic_bytes() {
        assert_eq!(
            ImageFormat::from_magic_bytes(&png_bytes(1, 1, [0, 0, 0, 255])),
            ImageFormat::Png
        );
        assert_eq!(
            ImageFormat::from_magic_bytes(&[0xFF, 0xD8, 0xFF, 0xE0]),
            ImageFormat::Jpeg
        );
        assert_eq!(ImageFormat::from_magic_bytes(b"GIF89a"), ImageFormat::Gif);
        assert_eq!(ImageFormat::from_magic_bytes(&[1, 2]), ImageFormat::Unknown);
    }

    #[test]
    fn test_base64_data_uri() {
        let encoded = base64::engine::general_purpose::STANDARD.encode(png_bytes(3, 2, [255, 0, 0, 255]));
        let image = load_image_from_data_uri(&format!("data:image/png;base64,{encoded}"))
            .expect("decode");
        assert_eq!((image.width, image.height), (3, 2));
        assert_eq!(&image.data[0..4], &[255, 0, 0, 255]);
    }

    #[test]
    fn test_malformed_data_uri() {
        assert!(load_image_from_data_uri("data:image/png;base64").is_err());
        assert!(load_image_from_data_uri("data:image/png;base64,!!!").is_err());
        assert!(load_image_from_data_uri("https://example.com/a.png").is_err());
    }

    #[test]
    fn test_percent_encoded_svg_is_not_a_raster_image() {
        let err = load_image_from_data_uri("data:image/svg+xml,%3Csvg%20xmlns%3D%22%22%2F%3E")
            .unwrap_err();
        assert!(matches!(err, RenderError::Resource(_)));
    }

    #[test]
    fn test_cover_crop_centers() {
        let image = DecodedImage {
            width: 200,
            height: 100,
            data: vec![0; 200 * 100 * 4],
            format: ImageFormat::Png,
        };
        // Square target: crop the middle 100x100.
        assert_eq!(image.cover_crop(50.0, 50.0), (50, 0, 100, 100));
        // Wide target keeps full width.
        assert_eq!(image.cover_crop(400.0, 100.0), (0, 25, 200, 50));
    }

    #[test]
    fn test_premultiplied_pixmap() {
        let image = DecodedImage {
            width: 1,
            height: 1,
            data: vec![255, 255, 255, 128],
            format: ImageFormat::Png,
        };
        let pixmap = image.to_pixmap().expect("pixmap");
        let px = pixmap.pixels()[0];
        assert_eq!(px.alpha(), 128);
        assert_eq!(px.red(), 128);
    }

    #[tokio::test]
    async fn test_loader_reads_file_url_and_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("pixel.png");
        std::fs::write(&path, png_bytes(2, 2, [0, 0, 255, 255])).expect("write");
        let loader = UriImageLoader::new();

        let by_path = loader.load(path.to_str().expect("utf8 path")).await.expect("path");
        assert_eq!(by_path.width, 2);

        let url = url::Url::from_file_path(&path).expect("file url");
        let by_url = loader.load(url.as_str()).await.expect("url");
        assert_eq!(by_url.height, 2);

        assert!(loader.load("/definitely/missing.png").await.is_err());
    }
}

//! Renderer error types.

use thiserror::Error;

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RenderError>;

/// Errors that can occur during rendering.
///
/// A failed image load is only an error at the [`ImageLoader`](crate::ImageLoader)
/// seam; the rasterizer turns it into a diagnostic and keeps painting.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The raster surface could not be allocated.
    #[error("Surface error: {0}")]
    Surface(String),

    /// Resource loading failed.
    #[error("Failed to load resource: {0}")]
    Resource(String),

    /// Output encoding failed.
    #[error("Encoding failed: {0}")]
    Encode(String),

    /// The render was cancelled between objects.
    #[error("Render cancelled")]
    Cancelled,

    /// A document-level error.
    #[error(transparent)]
    Core(#[from] design_core::CoreError),
}

//! # Design Renderer
//!
//! Headless rasterizer for design documents. Interprets an ordered list of
//! drawable records and paints them onto a CPU surface, with no editor
//! runtime involved.
//!
//! ## Pipeline
//!
//! ```text
//! ┌──────────┐   flatten    ┌──────────┐  paint in order  ┌──────────┐  encode  ┌───────────┐
//! │ Document │ ───────────▶ │ Draw ops │ ───────────────▶ │  Pixmap  │ ───────▶ │ PNG/JPEG  │
//! └──────────┘  PaintState  └──────────┘  await images    └──────────┘          └───────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use design_core::Document;
//! use design_renderer::{CancelToken, Rasterizer, RenderOptions, UriImageLoader};
//!
//! # async fn example(document: Document) -> design_renderer::RenderResult<()> {
//! let rasterizer = Rasterizer::new(UriImageLoader::new());
//! let output = rasterizer
//!     .render(&document, &RenderOptions::default(), &CancelToken::new())
//!     .await?;
//! for diagnostic in output.diagnostics.iter() {
//!     eprintln!("{}", diagnostic.message);
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod encode;
pub mod error;
pub mod geometry;
pub mod loader;
pub mod paint;
pub mod raster;
pub mod text;

pub use encode::{encode, to_data_uri, OutputFormat, DEFAULT_JPEG_QUALITY};
pub use error::{RenderError, RenderResult};
pub use loader::{
    load_image_from_bytes, load_image_from_data_uri, DecodedImage, ImageFormat, ImageLoader,
    UriImageLoader,
};
pub use paint::parse_color;
pub use raster::{
    Background, CancelToken, Rasterizer, RenderOptions, RenderOutput, OutputEncoding,
};
pub use text::{Font, FontSet, TextRendering};

/// Renderer version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! # Design Core
//!
//! Document model for design-template editors (posts, flyers, banners,
//! badges) and the pipeline that feeds the headless rasterizer.
//!
//! ## Data flow
//!
//! ```text
//! LiveScene ──extract──▶ DrawableRecord ──build──▶ Document
//!                                                   │
//!                                   optimize (Full / Minimal / Ultra-minimal)
//!                                                   │
//!                                        ChunkedStorage save ⇄ load
//! ```
//!
//! Non-fatal conditions (malformed fields, unknown kinds, exceeded budgets)
//! are returned as [`Diagnostics`] next to the primary result. Only storage
//! and serialization failures are [`CoreError`]s.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod builder;
pub mod compress;
pub mod diagnostics;
pub mod document;
pub mod error;
pub mod extract;
pub mod record;
pub mod storage;

pub use builder::{current_timestamp_ms, DocumentBuilder, LiveScene};
pub use compress::{expand, optimize, CompressionOptions, OptimizeResult, Tier};
pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
pub use document::{parse_records, CanvasSize, Document, Metadata, FORMAT_VERSION};
pub use error::{CoreError, CoreResult};
pub use extract::{extract_object, extract_objects, to_live_object, Extraction};
pub use record::{
    Canonical, DrawableBody, DrawableRecord, KindFamily, OriginX, OriginY, PathCommand, Point,
    Shadow, StrokeCap, StrokeJoin, TextAlign,
};
pub use storage::{
    ChunkedStorage, DirectoryPersistence, KindFilter, MemoryPersistence, Persistence, SaveReport,
};

/// Design core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

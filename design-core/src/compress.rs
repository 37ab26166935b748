//! Tiered compression of documents against a byte budget.
//!
//! Each tier is a total function `&Document -> Document`. [`optimize`] walks
//! the ladder Full, Minimal, Ultra-minimal and returns the first result that
//! fits. Ultra-minimal is only attempted for budgets at or below
//! [`CompressionOptions::ultra_threshold_bytes`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::document::Document;
use crate::error::CoreResult;
use crate::record::{Canonical, DrawableBody, DrawableRecord};

/// Budgets at or below this size may use the ultra-minimal tier.
pub const DEFAULT_ULTRA_THRESHOLD_BYTES: usize = 100 * 1024;

/// Records kept by the ultra-minimal tier.
pub const DEFAULT_MAX_OBJECTS: usize = 8;

/// Text length (in Unicode scalar values) kept by the ultra-minimal tier.
pub const DEFAULT_MAX_TEXT_CHARS: usize = 50;

/// A point on the fidelity-versus-size ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Tier {
    /// No reduction.
    Full,
    /// Rounded numerics with defaults omitted.
    Minimal,
    /// Minimal plus dropped background image and truncated objects and text.
    UltraMinimal,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => write!(f, "full"),
            Self::Minimal => write!(f, "minimal"),
            Self::UltraMinimal => write!(f, "ultra-minimal"),
        }
    }
}

/// Tunables for the compression ladder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressionOptions {
    /// Largest budget for which ultra-minimal may be applied.
    pub ultra_threshold_bytes: usize,
    /// Top-level records kept by ultra-minimal.
    pub max_objects: usize,
    /// Text length kept by ultra-minimal.
    pub max_text_chars: usize,
    /// The budget is for storage only, so audit timestamps may be dropped.
    pub storage_only: bool,
}

impl Default for CompressionOptions {
    fn default() -> Self {
        Self {
            ultra_threshold_bytes: DEFAULT_ULTRA_THRESHOLD_BYTES,
            max_objects: DEFAULT_MAX_OBJECTS,
            max_text_chars: DEFAULT_MAX_TEXT_CHARS,
            storage_only: false,
        }
    }
}

/// Outcome of [`optimize`].
#[derive(Debug, Clone)]
pub struct OptimizeResult {
    /// The derived document.
    pub result: Document,
    /// Tier that produced `result`.
    pub tier_used: Tier,
    /// Serialized size of the input.
    pub original_size: usize,
    /// Serialized size of `result`.
    pub result_size: usize,
    /// `result` is still larger than the budget.
    pub budget_exceeded: bool,
    /// Budget diagnostics.
    pub diagnostics: Diagnostics,
}

/// Full tier: the identity.
#[must_use]
pub fn full(document: &Document) -> Document {
    document.clone()
}

/// Minimal tier: round numerics and omit every field equal to its default.
#[must_use]
pub fn minimal(document: &Document, options: &CompressionOptions) -> Document {
    let mut reduced = document.clone();
    for record in &mut reduced.objects {
        record.round();
        record.strip_defaults();
    }
    if options.storage_only {
        if let Some(metadata) = reduced.metadata.as_mut() {
            metadata.created_at = None;
            metadata.updated_at = None;
        }
    }
    reduced
}

/// Ultra-minimal tier: minimal, then drop the background image and keep only
/// the first records with truncated text.
#[must_use]
pub fn ultra_minimal(document: &Document, options: &CompressionOptions) -> Document {
    let mut reduced = minimal(document, options);
    reduced.background_image_uri = None;
    reduced.objects.truncate(options.max_objects);
    for record in &mut reduced.objects {
        truncate_text(record, options.max_text_chars);
    }
    reduced
}

fn truncate_text(record: &mut DrawableRecord, max_chars: usize) {
    match &mut record.body {
        DrawableBody::Text(text) => {
            text.truncate_content(max_chars);
            // Truncation can leave an empty string, which is the default.
            text.strip_defaults();
        }
        DrawableBody::Group(group) => {
            for child in group.objects.iter_mut().flatten() {
                truncate_text(child, max_chars);
            }
        }
        _ => {}
    }
}

/// Re-apply every default so each field is explicit again.
#[must_use]
pub fn expand(document: &Document) -> Document {
    document.expanded()
}

/// Reduce `document` to fit `max_bytes`, sacrificing as little as possible.
///
/// # Errors
///
/// Returns an error only if a document cannot be serialized for measuring.
pub fn optimize(
    document: &Document,
    max_bytes: usize,
    options: &CompressionOptions,
) -> CoreResult<OptimizeResult> {
    let original_size = document.serialized_size()?;
    if original_size <= max_bytes {
        return Ok(finish(full(document), Tier::Full, original_size, original_size, max_bytes));
    }

    let reduced = minimal(document, options);
    let minimal_size = reduced.serialized_size()?;
    tracing::debug!(
        document_id = %document.id,
        original_size,
        minimal_size,
        max_bytes,
        "measured minimal tier"
    );
    if minimal_size <= max_bytes || max_bytes > options.ultra_threshold_bytes {
        return Ok(finish(reduced, Tier::Minimal, original_size, minimal_size, max_bytes));
    }

    let reduced = ultra_minimal(document, options);
    let ultra_size = reduced.serialized_size()?;
    Ok(finish(
        reduced,
        Tier::UltraMinimal,
        original_size,
        ultra_size,
        max_bytes,
    ))
}

fn finish(
    result: Document,
    tier_used: Tier,
    original_size: usize,
    result_size: usize,
    max_bytes: usize,
) -> OptimizeResult {
    let budget_exceeded = result_size > max_bytes;
    let mut diagnostics = Diagnostics::new();
    if budget_exceeded {
        tracing::warn!(
            document_id = %result.id,
            tier = %tier_used,
            result_size,
            max_bytes,
            "compression could not meet budget"
        );
        diagnostics.push(Diagnostic::document(
            DiagnosticKind::BudgetExceeded,
            format!("{tier_used} result is {result_size} bytes, budget is {max_bytes}"),
        ));
    } else {
        tracing::debug!(document_id = %result.id, tier = %tier_used, result_size, "compressed");
    }
    OptimizeResult {
        result,
        tier_used,
        original_size,
        result_size,
        budget_exceeded,
        diagnostics,
    }
}

//! Non-fatal conditions collected alongside primary results.

use serde::{Deserialize, Serialize};

/// Category of a non-fatal condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DiagnosticKind {
    /// A field failed type expectations and was replaced by its default.
    MalformedInput,
    /// An image resource could not be fetched or decoded.
    ResourceUnavailable,
    /// Compression could not meet the requested byte budget.
    BudgetExceeded,
    /// A record of unknown kind was preserved but not painted.
    UnknownDrawableKind,
}

/// A single degradation report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    /// What went wrong.
    pub kind: DiagnosticKind,
    /// The record affected, if the condition is tied to one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    /// Human-readable detail.
    pub message: String,
}

impl Diagnostic {
    /// Create a diagnostic bound to an object.
    #[must_use]
    pub fn for_object(
        kind: DiagnosticKind,
        object_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            object_id: Some(object_id.into()),
            message: message.into(),
        }
    }

    /// Create a document-level diagnostic.
    #[must_use]
    pub fn document(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            object_id: None,
            message: message.into(),
        }
    }
}

/// Ordered list of diagnostics produced by one operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Create an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a diagnostic.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.entries.push(diagnostic);
    }

    /// Append a diagnostic unless one of the same kind is already present.
    ///
    /// Returns `true` if the diagnostic was recorded.
    #[must_use = "callers log only the first occurrence"]
    pub fn push_once(&mut self, diagnostic: Diagnostic) -> bool {
        if self.contains_kind(diagnostic.kind) {
            return false;
        }
        self.entries.push(diagnostic);
        true
    }

    /// Move every entry of `other` into this list.
    pub fn extend(&mut self, other: Diagnostics) {
        for diagnostic in other.entries {
            let duplicate = diagnostic.kind == DiagnosticKind::UnknownDrawableKind
                && self.contains_kind(diagnostic.kind);
            if !duplicate {
                self.entries.push(diagnostic);
            }
        }
    }

    /// Whether any entry has the given kind.
    #[must_use]
    pub fn contains_kind(&self, kind: DiagnosticKind) -> bool {
        self.entries.iter().any(|d| d.kind == kind)
    }

    /// Entries of a given kind.
    pub fn of_kind(&self, kind: DiagnosticKind) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(move |d| d.kind == kind)
    }

    /// All entries in emission order.
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Consume into the underlying vector.
    #[must_use]
    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.entries
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

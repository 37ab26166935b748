//! Canonical serialized representation of a design document.

use std::io;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::error::CoreResult;
use crate::record::{Canonical, DrawableBody, DrawableRecord};

/// Format version stamped on every built document.
pub const FORMAT_VERSION: &str = "1.0";

/// Canvas dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanvasSize {
    /// Width in pixels.
    pub width: f64,
    /// Height in pixels.
    pub height: f64,
}

impl CanvasSize {
    /// Create a canvas size.
    #[must_use]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Audit metadata attached by the builder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    /// First build time in Unix milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<u64>,
    /// Latest build time in Unix milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<u64>,
    /// Document format version.
    pub format_version: String,
}

/// A complete design: canvas properties, ordered records and metadata.
///
/// Array order of `objects` is the paint order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Document identifier.
    pub id: String,
    /// Tag of the editor that produced the document (post, flyer, banner, badge...).
    pub editor_kind: String,
    /// Canvas dimensions.
    pub canvas_size: CanvasSize,
    /// Canvas background color.
    pub background_color: String,
    /// Optional background image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_image_uri: Option<String>,
    /// Optional template the design was started from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_key: Option<String>,
    /// Records in paint order.
    #[serde(default)]
    pub objects: Vec<DrawableRecord>,
    /// Optional audit metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl Document {
    /// Create an empty document without metadata.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        editor_kind: impl Into<String>,
        canvas_size: CanvasSize,
        background_color: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            editor_kind: editor_kind.into(),
            canvas_size,
            background_color: background_color.into(),
            background_image_uri: None,
            template_key: None,
            objects: Vec::new(),
            metadata: None,
        }
    }

    /// Number of top-level records.
    #[must_use]
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Byte length of the compact JSON serialization.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be serialized.
    pub fn serialized_size(&self) -> CoreResult<usize> {
        let mut counter = ByteCounter(0);
        serde_json::to_writer(&mut counter, self)?;
        Ok(counter.0)
    }

    /// Serialize to compact JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be serialized.
    pub fn to_json(&self) -> CoreResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse from JSON.
    ///
    /// Records are parsed individually, see [`parse_records`]. Defaulted
    /// fields are logged and otherwise dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not JSON or the document-level fields
    /// are invalid.
    pub fn from_json(json: &str) -> CoreResult<Self> {
        Self::from_json_with_diagnostics(json).map(|(document, _)| document)
    }

    /// Parse from JSON, returning a diagnostic for every record field that
    /// was replaced by its default.
    ///
    /// # Errors
    ///
    /// See [`Document::from_json`].
    pub fn from_json_with_diagnostics(json: &str) -> CoreResult<(Self, Diagnostics)> {
        let stored: StoredDocument = serde_json::from_str(json)?;
        let mut diagnostics = Diagnostics::new();
        let objects = parse_records(&stored.objects, &mut diagnostics);
        let document = Self {
            id: stored.id,
            editor_kind: stored.editor_kind,
            canvas_size: stored.canvas_size,
            background_color: stored.background_color,
            background_image_uri: stored.background_image_uri,
            template_key: stored.template_key,
            objects,
            metadata: stored.metadata,
        };
        Ok((document, diagnostics))
    }

    /// Return a copy with every record normalized.
    #[must_use]
    pub fn expanded(&self) -> Self {
        let mut document = self.clone();
        for record in &mut document.objects {
            record.normalize();
        }
        document
    }
}

/// Document-level fields parsed strictly, records left untyped.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredDocument {
    id: String,
    editor_kind: String,
    canvas_size: CanvasSize,
    background_color: String,
    #[serde(default)]
    background_image_uri: Option<String>,
    #[serde(default)]
    template_key: Option<String>,
    #[serde(default)]
    objects: Vec<Value>,
    #[serde(default)]
    metadata: Option<Metadata>,
}

/// Parse stored records one at a time.
///
/// A record that fails type expectations keeps its id, its kind and every
/// field that parses on its own. Each rejected field falls back to its
/// default and is reported as [`DiagnosticKind::MalformedInput`]. Records
/// without a string id are assigned `obj-<index>`.
pub fn parse_records(values: &[Value], diagnostics: &mut Diagnostics) -> Vec<DrawableRecord> {
    values
        .iter()
        .enumerate()
        .map(|(index, value)| parse_record(value, &format!("obj-{index}"), diagnostics))
        .collect()
}

fn parse_record(value: &Value, fallback_id: &str, diagnostics: &mut Diagnostics) -> DrawableRecord {
    if let Ok(record) = DrawableRecord::deserialize(value) {
        return record;
    }
    let Some(fields) = value.as_object() else {
        report_malformed(diagnostics, fallback_id, "stored record is not an object".into());
        return DrawableRecord::new(fallback_id, DrawableBody::Unknown { source_kind: None });
    };

    let id = if let Some(id) = fields.get("id").and_then(Value::as_str) {
        id.to_string()
    } else {
        report_malformed(diagnostics, fallback_id, "record id is missing or not a string".into());
        fallback_id.to_string()
    };
    let mut kept = Map::new();
    kept.insert("id".into(), Value::String(id.clone()));
    if let Some(kind) = fields.get("kind") {
        kept.insert("kind".into(), kind.clone());
    }
    let is_group = fields.get("kind").and_then(Value::as_str) == Some("group");

    for (key, field) in fields {
        if key == "id" || key == "kind" || (is_group && key == "objects") {
            continue;
        }
        let mut candidate = kept.clone();
        candidate.insert(key.clone(), field.clone());
        if DrawableRecord::deserialize(&Value::Object(candidate)).is_ok() {
            kept.insert(key.clone(), field.clone());
        } else {
            report_malformed(
                diagnostics,
                &id,
                format!("field '{key}' has an unexpected type; using its default"),
            );
        }
    }

    let mut record = DrawableRecord::deserialize(&Value::Object(kept)).unwrap_or_else(|_| {
        DrawableRecord::new(id.clone(), DrawableBody::Unknown { source_kind: None })
    });
    if let DrawableBody::Group(group) = &mut record.body {
        match fields.get("objects") {
            Some(Value::Array(children)) => {
                group.objects = Some(
                    children
                        .iter()
                        .enumerate()
                        .map(|(index, child)| {
                            parse_record(child, &format!("{id}-{index}"), diagnostics)
                        })
                        .collect(),
                );
            }
            Some(_) => report_malformed(diagnostics, &id, "group objects is not a list".into()),
            None => {}
        }
    }
    record
}

fn report_malformed(diagnostics: &mut Diagnostics, id: &str, message: String) {
    tracing::warn!(object_id = id, %message, "malformed stored record");
    diagnostics.push(Diagnostic::for_object(DiagnosticKind::MalformedInput, id, message));
}

/// `io::Write` sink that only counts bytes.
struct ByteCounter(usize);

impl io::Write for ByteCounter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0 += buf.len();
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{DrawableBody, RadiiProps};

    fn sample() -> Document {
        let mut document = Document::new("doc-1", "flyer", CanvasSize::new(200.0, 100.0), "#fff");
        document.objects.push(
            DrawableRecord::new("r1", DrawableBody::Rect(RadiiProps::default()))
                .with_bounds(1.0, 2.0, 3.0, 4.0),
        );
        document
    }

    #[test]
    fn test_serialized_size_matches_json_length() {
        let document = sample();
        let json = document.to_json().expect("json");
        assert_eq!(document.serialized_size().expect("size"), json.len());
    }

    #[test]
    fn test_wire_field_names() {
        let json = serde_json::to_value(sample()).expect("serialize");
        assert_eq!(json["editorKind"], "flyer");
        assert_eq!(json["canvasSize"]["width"], 200.0);
        assert_eq!(json["backgroundColor"], "#fff");
        assert!(json.get("metadata").is_none());
        assert!(json.get("backgroundImageUri").is_none());
    }

    #[test]
    fn test_from_json_roundtrip() {
        let document = sample();
        let json = document.to_json().expect("json");
        assert_eq!(Document::from_json(&json).expect("parse"), document);
    }

    #[test]
    fn test_malformed_record_is_defaulted_not_fatal() {
        let json = r##"{"id":"doc-2","editorKind":"post","canvasSize":{"width":10,"height":10},
            "backgroundColor":"#fff","objects":[
                {"id":"a","kind":"rect"},
                {"id":"b","kind":"rect","opacity":"0.5","x":4,"fillColor":"#f00"}
            ]}"##;
        let (document, diagnostics) = Document::from_json_with_diagnostics(json).expect("parse");

        assert_eq!(document.object_count(), 2);
        let salvaged = &document.objects[1];
        assert_eq!(salvaged.id, "b");
        assert!(matches!(salvaged.body, DrawableBody::Rect(_)));
        assert_eq!(salvaged.common.opacity, None);
        assert_eq!(salvaged.common.x, Some(4.0));
        assert_eq!(salvaged.common.fill_color.as_deref(), Some("#f00"));

        assert_eq!(diagnostics.len(), 1);
        let reported = diagnostics.iter().next().expect("diagnostic");
        assert_eq!(reported.kind, DiagnosticKind::MalformedInput);
        assert_eq!(reported.object_id.as_deref(), Some("b"));
        assert!(Document::from_json(json).is_ok());
    }

    #[test]
    fn test_malformed_group_child_keeps_siblings() {
        let values: Vec<Value> = serde_json::from_str(
            r#"[{"id":"g","kind":"group","objects":[
                {"id":"c1","kind":"circle","radius":"big"},
                {"id":"c2","kind":"rect","x":1}
            ]}, 42]"#,
        )
        .expect("json");
        let mut diagnostics = Diagnostics::new();
        let records = parse_records(&values, &mut diagnostics);

        assert_eq!(records.len(), 2);
        let DrawableBody::Group(group) = &records[0].body else {
            panic!("expected group");
        };
        let children = group.objects.as_deref().expect("children");
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].id, "c1");
        assert_eq!(children[1].common.x, Some(1.0));
        assert_eq!(records[1].id, "obj-1");
        assert_eq!(diagnostics.of_kind(DiagnosticKind::MalformedInput).count(), 2);
    }

    #[test]
    fn test_invalid_document_fields_still_fail() {
        assert!(Document::from_json(r#"{"id":"x","objects":[]}"#).is_err());
    }

    #[test]
    fn test_expanded_fills_defaults() {
        let document = sample().expanded();
        assert_eq!(document.objects[0].common.opacity, Some(1.0));
        assert_eq!(document.objects[0].common.scale_y, Some(1.0));
    }
}

//! Document assembly from a live editor scene.

use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::Value;

use crate::diagnostics::Diagnostics;
use crate::document::{CanvasSize, Document, Metadata, FORMAT_VERSION};
use crate::error::{CoreError, CoreResult};
use crate::extract::extract_objects;
use crate::record::{Canonical, DrawableRecord};

/// Background color used when a scene does not declare one.
pub const DEFAULT_BACKGROUND: &str = "#ffffff";

/// Source of Unix-millisecond timestamps.
pub type Clock = fn() -> u64;

/// The live editor's in-memory scene: canvas properties plus untyped objects.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveScene {
    /// Canvas width in pixels.
    pub width: f64,
    /// Canvas height in pixels.
    pub height: f64,
    /// Canvas background color.
    pub background_color: String,
    /// Optional background image URI.
    pub background_image: Option<String>,
    /// Live objects in the editor's stacking order.
    pub objects: Vec<Value>,
}

impl LiveScene {
    /// Create an empty scene with the default background.
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            background_color: DEFAULT_BACKGROUND.to_string(),
            background_image: None,
            objects: Vec::new(),
        }
    }

    /// Parse an editor canvas export.
    ///
    /// Accepts `{"width", "height", "background", "backgroundImage", "objects"}`
    /// where `backgroundImage` is either a URI string or an object with `src`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidDocument`] if the value is not an object or
    /// lacks a numeric canvas size.
    pub fn from_canvas_json(value: &Value) -> CoreResult<Self> {
        let fields = value
            .as_object()
            .ok_or_else(|| CoreError::InvalidDocument("canvas export is not an object".into()))?;
        let dimension = |key: &str| {
            fields
                .get(key)
                .and_then(Value::as_f64)
                .ok_or_else(|| CoreError::InvalidDocument(format!("canvas '{key}' missing")))
        };

        let background_color = match fields.get("background") {
            Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
            _ => DEFAULT_BACKGROUND.to_string(),
        };
        let background_image = match fields.get("backgroundImage") {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(Value::Object(image)) => image
                .get("src")
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            _ => None,
        };
        let objects = fields
            .get("objects")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        Ok(Self {
            width: dimension("width")?,
            height: dimension("height")?,
            background_color,
            background_image,
            objects,
        })
    }

    /// Objects in paint order.
    ///
    /// When any object carries a numeric `zIndex` the list is stably sorted
    /// by it, with missing values treated as 0. Otherwise array order is kept.
    #[must_use]
    pub fn paint_ordered_objects(&self) -> Vec<Value> {
        let z_index = |object: &Value| object.get("zIndex").and_then(Value::as_f64);
        let mut objects = self.objects.clone();
        if objects.iter().any(|o| z_index(o).is_some()) {
            objects.sort_by(|a, b| {
                z_index(a)
                    .unwrap_or(0.0)
                    .total_cmp(&z_index(b).unwrap_or(0.0))
            });
        }
        objects
    }
}

/// Assembles [`Document`]s and stamps their metadata.
#[derive(Debug, Clone)]
pub struct DocumentBuilder {
    id: String,
    editor_kind: String,
    template_key: Option<String>,
    created_at: Option<u64>,
    clock: Clock,
}

impl DocumentBuilder {
    /// Create a builder for the given document id and editor tag.
    #[must_use]
    pub fn new(id: impl Into<String>, editor_kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            editor_kind: editor_kind.into(),
            template_key: None,
            created_at: None,
            clock: current_timestamp_ms,
        }
    }

    /// Record the template the design was started from.
    #[must_use]
    pub fn template_key(mut self, key: impl Into<String>) -> Self {
        self.template_key = Some(key.into());
        self
    }

    /// Carry `createdAt` forward from the document this build supersedes.
    #[must_use]
    pub fn previous(mut self, document: &Document) -> Self {
        self.created_at = document.metadata.as_ref().and_then(|m| m.created_at);
        self
    }

    /// Replace the timestamp source.
    #[must_use]
    pub fn clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Extract every live object and assemble a document with metadata.
    #[must_use]
    pub fn build(&self, scene: &LiveScene) -> (Document, Diagnostics) {
        let (mut document, diagnostics) = self.build_without_metadata(scene);
        document.metadata = Some(self.metadata());
        (document, diagnostics)
    }

    /// Like [`build`](Self::build) but omits the metadata block.
    #[must_use]
    pub fn build_without_metadata(&self, scene: &LiveScene) -> (Document, Diagnostics) {
        let (records, diagnostics) = extract_objects(&scene.paint_ordered_objects());
        tracing::debug!(
            document_id = %self.id,
            objects = records.len(),
            diagnostics = diagnostics.len(),
            "extracted live scene"
        );
        let mut document = self.assemble(
            CanvasSize::new(scene.width, scene.height),
            &scene.background_color,
            scene.background_image.clone(),
            records,
        );
        document.metadata = None;
        (document, diagnostics)
    }

    /// Assemble a document from already extracted records, in the given order.
    #[must_use]
    pub fn build_from_records(
        &self,
        canvas_size: CanvasSize,
        background_color: &str,
        background_image: Option<String>,
        records: Vec<DrawableRecord>,
    ) -> Document {
        let mut document = self.assemble(canvas_size, background_color, background_image, records);
        document.metadata = Some(self.metadata());
        document
    }

    fn assemble(
        &self,
        canvas_size: CanvasSize,
        background_color: &str,
        background_image: Option<String>,
        mut records: Vec<DrawableRecord>,
    ) -> Document {
        for record in &mut records {
            record.normalize();
        }
        let mut document = Document::new(
            self.id.clone(),
            self.editor_kind.clone(),
            canvas_size,
            background_color,
        );
        document.background_image_uri = background_image;
        document.template_key.clone_from(&self.template_key);
        document.objects = records;
        document
    }

    fn metadata(&self) -> Metadata {
        let now = (self.clock)();
        Metadata {
            created_at: Some(self.created_at.unwrap_or(now)),
            updated_at: Some(now),
            format_version: FORMAT_VERSION.to_string(),
        }
    }
}

/// Get the current Unix timestamp in milliseconds.
#[must_use]
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |d| {
        // Timestamp will not exceed u64 max for millennia
        #[allow(clippy::cast_possible_truncation)]
        {
            d.as_millis() as u64
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fixed_clock() -> u64 {
        1_700_000_000_000
    }

    fn later_clock() -> u64 {
        1_700_000_500_000
    }

    fn scene() -> LiveScene {
        let mut scene = LiveScene::new(400.0, 300.0);
        scene.objects = vec![
            json!({"type": "rect", "id": "a", "width": 10, "height": 10}),
            json!({"type": "circle", "id": "b", "radius": 4}),
        ];
        scene
    }

    #[test]
    fn test_build_stamps_metadata() {
        let (document, diagnostics) = DocumentBuilder::new("d1", "post")
            .template_key("summer-sale")
            .clock(fixed_clock)
            .build(&scene());
        assert!(diagnostics.is_empty());
        assert_eq!(document.object_count(), 2);
        assert_eq!(document.template_key.as_deref(), Some("summer-sale"));
        let metadata = document.metadata.expect("metadata");
        assert_eq!(metadata.created_at, Some(fixed_clock()));
        assert_eq!(metadata.updated_at, Some(fixed_clock()));
        assert_eq!(metadata.format_version, FORMAT_VERSION);
    }

    #[test]
    fn test_rebuild_keeps_created_refreshes_updated() {
        let first = DocumentBuilder::new("d1", "post")
            .clock(fixed_clock)
            .build(&scene())
            .0;
        let second = DocumentBuilder::new("d1", "post")
            .previous(&first)
            .clock(later_clock)
            .build(&scene())
            .0;
        let metadata = second.metadata.expect("metadata");
        assert_eq!(metadata.created_at, Some(fixed_clock()));
        assert_eq!(metadata.updated_at, Some(later_clock()));
    }

    #[test]
    fn test_without_metadata() {
        let (document, _) = DocumentBuilder::new("d1", "banner").build_without_metadata(&scene());
        assert!(document.metadata.is_none());
        let json = serde_json::to_value(&document).expect("serialize");
        assert!(json.get("metadata").is_none());
    }

    #[test]
    fn test_records_are_normalized() {
        let (document, _) = DocumentBuilder::new("d1", "post").build(&scene());
        assert!(document.objects.iter().all(|r| r.common.opacity == Some(1.0)));
    }

    #[test]
    fn test_z_index_stable_sort() {
        let mut scene = LiveScene::new(10.0, 10.0);
        scene.objects = vec![
            json!({"type": "rect", "id": "top", "zIndex": 5}),
            json!({"type": "rect", "id": "first"}),
            json!({"type": "rect", "id": "second", "zIndex": 0}),
        ];
        let ids: Vec<String> = scene
            .paint_ordered_objects()
            .iter()
            .filter_map(|o| o["id"].as_str().map(str::to_string))
            .collect();
        assert_eq!(ids, ["first", "second", "top"]);
    }

    #[test]
    fn test_canvas_json_parsing() {
        let value = json!({
            "width": 1080,
            "height": 1350,
            "background": "#fafafa",
            "backgroundImage": {"type": "image", "src": "https://cdn.example.com/bg.png"},
            "objects": [{"type": "textbox", "text": "Sale"}]
        });
        let scene = LiveScene::from_canvas_json(&value).expect("scene");
        assert!((scene.width - 1080.0).abs() < f64::EPSILON);
        assert_eq!(scene.background_color, "#fafafa");
        assert_eq!(
            scene.background_image.as_deref(),
            Some("https://cdn.example.com/bg.png")
        );
        assert_eq!(scene.objects.len(), 1);
    }

    #[test]
    fn test_canvas_json_requires_size() {
        let err = LiveScene::from_canvas_json(&json!({"objects": []})).unwrap_err();
        assert!(matches!(err, CoreError::InvalidDocument(_)));
    }
}

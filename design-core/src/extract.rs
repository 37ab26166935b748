//! Mapping from live editor objects onto drawable records.
//!
//! A live object is an untyped JSON map using the editor's own field names
//! (`type`, `left`, `top`, `fill`, `angle`, ...). Extraction never fails: a
//! field that is absent or of the wrong type falls back to its canonical
//! default, and the fallback is reported as a [`Diagnostic`].

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::record::{
    defaults, Canonical, CircleProps, CommonProps, DrawableBody, DrawableRecord, GroupProps,
    ImageProps, LineProps, OriginX, OriginY, PathCommand, PathProps, Point, PolygonProps,
    RadiiProps, Shadow, StrokeCap, StrokeJoin, TextAlign, TextProps,
};

/// A record together with the degradations encountered while extracting it.
#[derive(Debug, Clone)]
pub struct Extraction {
    /// The normalized record.
    pub record: DrawableRecord,
    /// Fields that were defaulted, unknown kinds, and similar conditions.
    pub diagnostics: Diagnostics,
}

/// Extract one record from a live editor object.
///
/// `fallback_id` is used when the object carries no usable `id`.
#[must_use]
pub fn extract_object(value: &Value, fallback_id: &str) -> Extraction {
    let mut diagnostics = Diagnostics::new();
    let record = extract_into(value, fallback_id, &mut diagnostics);
    Extraction {
        record,
        diagnostics,
    }
}

/// Extract every object in paint order.
///
/// Objects without an id are assigned `obj-<index>`.
#[must_use]
pub fn extract_objects(values: &[Value]) -> (Vec<DrawableRecord>, Diagnostics) {
    let mut diagnostics = Diagnostics::new();
    let records = values
        .iter()
        .enumerate()
        .map(|(index, value)| extract_into(value, &format!("obj-{index}"), &mut diagnostics))
        .collect();
    (records, diagnostics)
}

fn extract_into(value: &Value, fallback_id: &str, diagnostics: &mut Diagnostics) -> DrawableRecord {
    let Some(fields) = value.as_object() else {
        tracing::debug!(object_id = fallback_id, "live object is not a map");
        diagnostics.push(Diagnostic::for_object(
            DiagnosticKind::MalformedInput,
            fallback_id,
            "live object is not a JSON object",
        ));
        let mut record = DrawableRecord::new(fallback_id, DrawableBody::Unknown { source_kind: None });
        record.normalize();
        return record;
    };

    let id = ["id", "name"]
        .iter()
        .find_map(|key| match fields.get(*key) {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        })
        .unwrap_or_else(|| fallback_id.to_string());

    let mut reader = FieldReader {
        fields,
        id: &id,
        diagnostics,
    };
    let common = reader.common();
    let body = reader.body();

    let mut record = DrawableRecord { id, body, common };
    record.normalize();
    record
}

/// Typed access to a live object's fields, recording every fallback.
struct FieldReader<'a> {
    fields: &'a Map<String, Value>,
    id: &'a str,
    diagnostics: &'a mut Diagnostics,
}

impl<'a> FieldReader<'a> {
    fn get(&self, key: &str) -> Option<&'a Value> {
        self.fields.get(key)
    }

    fn malformed(&mut self, key: &str, found: &Value) {
        tracing::debug!(object_id = self.id, field = key, %found, "defaulting malformed field");
        self.diagnostics.push(Diagnostic::for_object(
            DiagnosticKind::MalformedInput,
            self.id,
            format!("field '{key}' has unexpected value {found}; using default"),
        ));
    }

    fn number(&mut self, key: &str) -> Option<f64> {
        let value = self.get(key)?;
        let parsed = match value {
            Value::Null => return None,
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().trim_end_matches("px").parse::<f64>().ok(),
            _ => None,
        };
        match parsed.filter(|v| v.is_finite()) {
            Some(v) => Some(v),
            None => {
                self.malformed(key, value);
                None
            }
        }
    }

    fn string(&mut self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            other => {
                self.malformed(key, other);
                None
            }
        }
    }

    /// Colors: `null` and `""` mean "no paint"; gradients and patterns are unsupported.
    fn color(&mut self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::Null => Some(defaults::STROKE_COLOR.to_string()),
            Value::String(s) if s.trim().is_empty() => Some(defaults::STROKE_COLOR.to_string()),
            Value::String(s) => Some(s.clone()),
            other => {
                self.malformed(key, other);
                None
            }
        }
    }

    fn boolean(&mut self, key: &str) -> Option<bool> {
        match self.get(key)? {
            Value::Null => None,
            Value::Bool(b) => Some(*b),
            other => {
                self.malformed(key, other);
                None
            }
        }
    }

    /// Lower-cased string parsed as one of the model's keyword enums.
    fn keyword<T: DeserializeOwned>(&mut self, key: &str) -> Option<T> {
        let raw = self.string(key)?;
        let lowered = raw.trim().to_ascii_lowercase();
        match serde_json::from_value(Value::String(lowered)) {
            Ok(value) => Some(value),
            Err(_) => {
                self.malformed(key, &Value::String(raw));
                None
            }
        }
    }

    fn text_align(&mut self) -> Option<TextAlign> {
        let raw = self.string("textAlign")?;
        match raw.trim().to_ascii_lowercase().as_str() {
            "left" | "justify" | "justify-left" => Some(TextAlign::Left),
            "center" | "justify-center" => Some(TextAlign::Center),
            "right" | "justify-right" => Some(TextAlign::Right),
            _ => {
                self.malformed("textAlign", &Value::String(raw));
                None
            }
        }
    }

    fn shadow(&mut self) -> Option<Shadow> {
        match self.get("shadow")? {
            Value::Null => None,
            Value::Object(map) => {
                let number = |k: &str| map.get(k).and_then(Value::as_f64).unwrap_or(0.0);
                Some(Shadow {
                    color: map
                        .get("color")
                        .and_then(Value::as_str)
                        .unwrap_or("rgba(0,0,0,0.5)")
                        .to_string(),
                    blur: number("blur"),
                    offset_x: number("offsetX"),
                    offset_y: number("offsetY"),
                })
            }
            Value::String(s) => {
                let parsed = parse_shadow_shorthand(s);
                if parsed.is_none() {
                    self.malformed("shadow", &Value::String(s.clone()));
                }
                parsed
            }
            other => {
                self.malformed("shadow", other);
                None
            }
        }
    }

    fn number_list(&mut self, key: &str) -> Option<Vec<f64>> {
        match self.get(key)? {
            Value::Null => None,
            Value::Array(items) => {
                let numbers: Option<Vec<f64>> = items.iter().map(Value::as_f64).collect();
                if numbers.is_none() {
                    self.malformed(key, &Value::Array(items.clone()));
                }
                numbers
            }
            other => {
                self.malformed(key, other);
                None
            }
        }
    }

    fn common(&mut self) -> CommonProps {
        CommonProps {
            x: self.number("left"),
            y: self.number("top"),
            width: self.number("width"),
            height: self.number("height"),
            fill_color: self.color("fill"),
            stroke_color: self.color("stroke"),
            scale_x: self.number("scaleX"),
            scale_y: self.number("scaleY"),
            rotation_degrees: self.number("angle"),
            opacity: self.number("opacity"),
            stroke_width: self.number("strokeWidth"),
            stroke_cap: self.keyword::<StrokeCap>("strokeLineCap"),
            stroke_join: self.keyword::<StrokeJoin>("strokeLineJoin"),
            origin_x: self.keyword::<OriginX>("originX"),
            origin_y: self.keyword::<OriginY>("originY"),
            shadow: self.shadow(),
            dash_pattern: self.number_list("strokeDashArray"),
            is_background_layer: self
                .boolean("isBackground")
                .or_else(|| self.boolean("isBackgroundLayer")),
        }
    }

    fn kind(&mut self) -> Option<String> {
        self.string("type").or_else(|| self.string("kind"))
    }

    fn body(&mut self) -> DrawableBody {
        let kind = self.kind();
        match kind.as_deref().map(str::to_ascii_lowercase).as_deref() {
            Some("text" | "i-text" | "itext" | "textbox") => DrawableBody::Text(TextProps {
                font_size_px: self.number("fontSize"),
                font_family: self.string("fontFamily"),
                font_weight: self.string("fontWeight"),
                text_align: self.text_align(),
                content: self.string("text"),
                char_spacing: self.number("charSpacing"),
                line_height_multiplier: self.number("lineHeight"),
            }),
            Some("image") => DrawableBody::Image(ImageProps {
                source_uri: self.string("src"),
                cross_origin_policy: self.string("crossOrigin"),
            }),
            Some("rect" | "rectangle") => DrawableBody::Rect(self.radii()),
            Some("circle") => DrawableBody::Circle(CircleProps {
                radius: self.number("radius"),
            }),
            Some("ellipse") => DrawableBody::Ellipse(self.radii()),
            Some("triangle") => DrawableBody::Triangle,
            Some("polygon" | "polyline") => DrawableBody::Polygon(PolygonProps {
                points: self.points(),
            }),
            Some("path") => DrawableBody::Path(PathProps {
                commands: self.path_commands(),
            }),
            Some("line") => DrawableBody::Line(LineProps {
                x1: self.number("x1"),
                y1: self.number("y1"),
                x2: self.number("x2"),
                y2: self.number("y2"),
            }),
            Some("group" | "activeselection") => DrawableBody::Group(GroupProps {
                objects: Some(self.children()),
            }),
            Some("unknown") => DrawableBody::Unknown {
                source_kind: self.string("sourceKind"),
            },
            Some(_) => {
                let source_kind = kind.unwrap_or_default();
                if self.diagnostics.push_once(Diagnostic::for_object(
                    DiagnosticKind::UnknownDrawableKind,
                    self.id,
                    format!("kind '{source_kind}' is preserved but not painted"),
                )) {
                    tracing::debug!(
                        object_id = self.id,
                        kind = %source_kind,
                        "unknown drawable kind"
                    );
                }
                DrawableBody::Unknown {
                    source_kind: Some(source_kind),
                }
            }
            None => {
                self.diagnostics.push(Diagnostic::for_object(
                    DiagnosticKind::MalformedInput,
                    self.id,
                    "live object has no 'type'",
                ));
                DrawableBody::Unknown { source_kind: None }
            }
        }
    }

    fn radii(&mut self) -> RadiiProps {
        RadiiProps {
            rx: self.number("rx"),
            ry: self.number("ry"),
        }
    }

    fn points(&mut self) -> Option<Vec<Point>> {
        let items = match self.get("points")? {
            Value::Array(items) => items,
            other => {
                self.malformed("points", other);
                return None;
            }
        };
        let mut points = Vec::with_capacity(items.len());
        for item in items {
            let x = item.get("x").and_then(Value::as_f64);
            let y = item.get("y").and_then(Value::as_f64);
            match (x, y) {
                (Some(x), Some(y)) => points.push(Point { x, y }),
                _ => self.malformed("points", item),
            }
        }
        Some(points)
    }

    fn path_commands(&mut self) -> Option<Vec<PathCommand>> {
        let items = match self.get("path")? {
            Value::Array(items) => items,
            Value::Null => return None,
            other => {
                self.malformed("path", other);
                return None;
            }
        };
        let mut cursor = PathCursor::default();
        let mut commands = Vec::with_capacity(items.len());
        for item in items {
            let parsed = match item {
                Value::Array(parts) => cursor.parse(parts),
                Value::Object(_) => serde_json::from_value::<PathCommand>(item.clone())
                    .ok()
                    .inspect(|c| cursor.track(c)),
                _ => None,
            };
            match parsed {
                Some(command) => commands.push(command),
                None => self.malformed("path", item),
            }
        }
        Some(commands)
    }

    fn children(&mut self) -> Vec<DrawableRecord> {
        let Some(value) = self.get("objects") else {
            return Vec::new();
        };
        let Some(items) = value.as_array() else {
            self.malformed("objects", value);
            return Vec::new();
        };
        items
            .iter()
            .enumerate()
            .map(|(index, child)| {
                extract_into(child, &format!("{}-{index}", self.id), self.diagnostics)
            })
            .collect()
    }
}

/// Tracks the current point so relative path commands can be made absolute.
#[derive(Default)]
struct PathCursor {
    x: f64,
    y: f64,
    start_x: f64,
    start_y: f64,
}

impl PathCursor {
    fn parse(&mut self, parts: &[Value]) -> Option<PathCommand> {
        let (op, args) = parts.split_first()?;
        let op = op.as_str()?;
        let args: Vec<f64> = args.iter().map(Value::as_f64).collect::<Option<_>>()?;
        let relative = op.chars().next()?.is_ascii_lowercase();
        let (dx, dy) = if relative { (self.x, self.y) } else { (0.0, 0.0) };

        let command = match (op.to_ascii_uppercase().as_str(), args.as_slice()) {
            ("M", [x, y]) => PathCommand::MoveTo {
                x: x + dx,
                y: y + dy,
            },
            ("L", [x, y]) => PathCommand::LineTo {
                x: x + dx,
                y: y + dy,
            },
            ("H", [x]) => PathCommand::LineTo {
                x: x + dx,
                y: self.y,
            },
            ("V", [y]) => PathCommand::LineTo {
                x: self.x,
                y: y + dy,
            },
            ("C", [x1, y1, x2, y2, x, y]) => PathCommand::CubicBezierTo {
                x1: x1 + dx,
                y1: y1 + dy,
                x2: x2 + dx,
                y2: y2 + dy,
                x: x + dx,
                y: y + dy,
            },
            ("Q", [x1, y1, x, y]) => PathCommand::QuadraticBezierTo {
                x1: x1 + dx,
                y1: y1 + dy,
                x: x + dx,
                y: y + dy,
            },
            ("Z", []) => PathCommand::Close,
            _ => return None,
        };
        self.track(&command);
        Some(command)
    }

    fn track(&mut self, command: &PathCommand) {
        match *command {
            PathCommand::MoveTo { x, y } => {
                self.x = x;
                self.y = y;
                self.start_x = x;
                self.start_y = y;
            }
            PathCommand::LineTo { x, y }
            | PathCommand::CubicBezierTo { x, y, .. }
            | PathCommand::QuadraticBezierTo { x, y, .. } => {
                self.x = x;
                self.y = y;
            }
            PathCommand::Close => {
                self.x = self.start_x;
                self.y = self.start_y;
            }
        }
    }
}

/// Parse `"<color> <offsetX> <offsetY> <blur>"`, with optional `px` units.
fn parse_shadow_shorthand(input: &str) -> Option<Shadow> {
    let tokens: Vec<&str> = input.split_whitespace().collect();
    let numeric: Vec<f64> = tokens
        .iter()
        .rev()
        .map_while(|t| t.trim_end_matches("px").parse::<f64>().ok())
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    let color_tokens = tokens.len().checked_sub(numeric.len())?;
    if color_tokens == 0 || numeric.len() < 2 {
        return None;
    }
    Some(Shadow {
        color: tokens[..color_tokens].join(" "),
        offset_x: numeric[0],
        offset_y: numeric[1],
        blur: numeric.get(2).copied().unwrap_or(0.0),
    })
}

/// Project a record back onto the live editor's object shape.
///
/// Extracting the result yields the normalized record.
#[must_use]
pub fn to_live_object(record: &DrawableRecord) -> Value {
    let c = &record.common;
    let mut map = Map::new();
    let mut put = |key: &str, value: Value| {
        map.insert(key.to_string(), value);
    };

    put("id", Value::from(record.id.clone()));
    put("left", Value::from(c.x()));
    put("top", Value::from(c.y()));
    put("width", Value::from(c.width()));
    put("height", Value::from(c.height()));
    put("fill", Value::from(c.fill_color()));
    put("stroke", Value::from(c.stroke_color()));
    put("scaleX", Value::from(c.scale_x()));
    put("scaleY", Value::from(c.scale_y()));
    put("angle", Value::from(c.rotation_degrees()));
    put("opacity", Value::from(c.opacity.unwrap_or(defaults::OPACITY)));
    put("strokeWidth", Value::from(c.stroke_width()));
    put("strokeLineCap", keyword_value(c.stroke_cap()));
    put("strokeLineJoin", keyword_value(c.stroke_join()));
    put("originX", keyword_value(c.origin_x()));
    put("originY", keyword_value(c.origin_y()));
    put("isBackground", Value::from(c.is_background_layer()));
    if let Some(shadow) = &c.shadow {
        put(
            "shadow",
            serde_json::json!({
                "color": shadow.color,
                "blur": shadow.blur,
                "offsetX": shadow.offset_x,
                "offsetY": shadow.offset_y,
            }),
        );
    }
    if let Some(dashes) = &c.dash_pattern {
        put("strokeDashArray", Value::from(dashes.clone()));
    }

    match &record.body {
        DrawableBody::Text(t) => {
            put("type", Value::from("textbox"));
            put("fontSize", Value::from(t.font_size_px()));
            put("fontFamily", Value::from(t.font_family()));
            put("fontWeight", Value::from(t.font_weight()));
            put("textAlign", keyword_value(t.text_align()));
            put("text", Value::from(t.content()));
            put("charSpacing", Value::from(t.char_spacing()));
            put("lineHeight", Value::from(t.line_height_multiplier()));
        }
        DrawableBody::Image(i) => {
            put("type", Value::from("image"));
            put("src", Value::from(i.source_uri()));
            if let Some(policy) = &i.cross_origin_policy {
                put("crossOrigin", Value::from(policy.clone()));
            }
        }
        DrawableBody::Rect(r) | DrawableBody::Ellipse(r) => {
            put("type", Value::from(record.kind_name()));
            put("rx", Value::from(r.rx()));
            put("ry", Value::from(r.ry()));
        }
        DrawableBody::Circle(circle) => {
            put("type", Value::from("circle"));
            put("radius", Value::from(circle.radius()));
        }
        DrawableBody::Triangle => put("type", Value::from("triangle")),
        DrawableBody::Polygon(p) => {
            put("type", Value::from("polygon"));
            let points = p
                .points()
                .iter()
                .map(|pt| serde_json::json!({"x": pt.x, "y": pt.y}))
                .collect::<Vec<_>>();
            put("points", Value::from(points));
        }
        DrawableBody::Path(p) => {
            put("type", Value::from("path"));
            let commands = p.commands().iter().map(path_array).collect::<Vec<_>>();
            put("path", Value::from(commands));
        }
        DrawableBody::Line(l) => {
            let (x1, y1, x2, y2) = l.endpoints();
            put("type", Value::from("line"));
            put("x1", Value::from(x1));
            put("y1", Value::from(y1));
            put("x2", Value::from(x2));
            put("y2", Value::from(y2));
        }
        DrawableBody::Group(g) => {
            put("type", Value::from("group"));
            let children = g.objects().iter().map(to_live_object).collect::<Vec<_>>();
            put("objects", Value::from(children));
        }
        DrawableBody::Unknown { source_kind } => {
            if let Some(kind) = source_kind {
                put("type", Value::from(kind.clone()));
            }
        }
    }

    Value::Object(map)
}

fn keyword_value<T: serde::Serialize>(keyword: T) -> Value {
    serde_json::to_value(keyword).unwrap_or(Value::Null)
}

fn path_array(command: &PathCommand) -> Value {
    match *command {
        PathCommand::MoveTo { x, y } => serde_json::json!(["M", x, y]),
        PathCommand::LineTo { x, y } => serde_json::json!(["L", x, y]),
        PathCommand::CubicBezierTo {
            x1,
            y1,
            x2,
            y2,
            x,
            y,
        } => serde_json::json!(["C", x1, y1, x2, y2, x, y]),
        PathCommand::QuadraticBezierTo { x1, y1, x, y } => {
            serde_json::json!(["Q", x1, y1, x, y])
        }
        PathCommand::Close => serde_json::json!(["Z"]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extracts_text_with_defaults() {
        let live = json!({
            "type": "textbox",
            "id": "headline",
            "left": 10,
            "top": 12.5,
            "width": 180,
            "height": 30,
            "text": "Hi\nThere",
            "fontSize": 20,
            "textAlign": "center"
        });
        let Extraction {
            record,
            diagnostics,
        } = extract_object(&live, "obj-0");
        assert!(diagnostics.is_empty());
        assert_eq!(record.id, "headline");
        assert_eq!(record.common.scale_x, Some(1.0));
        assert_eq!(record.common.opacity, Some(1.0));
        let DrawableBody::Text(text) = &record.body else {
            panic!("expected text");
        };
        assert_eq!(text.content(), "Hi\nThere");
        assert_eq!(text.text_align, Some(TextAlign::Center));
        assert_eq!(text.line_height_multiplier, Some(1.16));
    }

    #[test]
    fn test_malformed_field_defaults_and_reports() {
        let live = json!({"type": "rect", "id": "r", "left": "abc", "fill": {"type": "linear"}});
        let extraction = extract_object(&live, "obj-0");
        assert_eq!(extraction.record.common.x, Some(0.0));
        assert_eq!(extraction.record.common.fill_color.as_deref(), Some("#000000"));
        assert_eq!(
            extraction
                .diagnostics
                .of_kind(DiagnosticKind::MalformedInput)
                .count(),
            2
        );
    }

    #[test]
    fn test_numeric_strings_accepted() {
        let live = json!({"type": "rect", "left": "42px", "top": " 7 "});
        let record = extract_object(&live, "obj-3").record;
        assert_eq!(record.id, "obj-3");
        assert_eq!(record.common.x, Some(42.0));
        assert_eq!(record.common.y, Some(7.0));
    }

    #[test]
    fn test_null_stroke_means_no_paint() {
        let live = json!({"type": "circle", "radius": 5, "stroke": null});
        let record = extract_object(&live, "c").record;
        assert_eq!(record.common.stroke_color(), "transparent");
    }

    #[test]
    fn test_unknown_kind_reported_once() {
        let values = vec![
            json!({"type": "sticker", "id": "a"}),
            json!({"type": "sticker", "id": "b"}),
            json!({"type": "qr-code", "id": "c"}),
        ];
        let (records, diagnostics) = extract_objects(&values);
        assert_eq!(records.len(), 3);
        assert_eq!(
            records[0].body,
            DrawableBody::Unknown {
                source_kind: Some("sticker".to_string())
            }
        );
        assert_eq!(
            diagnostics
                .of_kind(DiagnosticKind::UnknownDrawableKind)
                .count(),
            1
        );
    }

    #[test]
    fn test_one_malformed_object_does_not_block_others() {
        let values = vec![json!(42), json!({"type": "rect", "id": "ok"})];
        let (records, diagnostics) = extract_objects(&values);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "obj-0");
        assert_eq!(records[1].id, "ok");
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn test_path_relative_commands_made_absolute() {
        let live = json!({
            "type": "path",
            "path": [["M", 10, 10], ["l", 5, 0], ["q", 5, 5, 10, 0], ["z"], ["X", 1]]
        });
        let extraction = extract_object(&live, "p");
        let DrawableBody::Path(path) = &extraction.record.body else {
            panic!("expected path");
        };
        assert_eq!(
            path.commands(),
            &[
                PathCommand::MoveTo { x: 10.0, y: 10.0 },
                PathCommand::LineTo { x: 15.0, y: 10.0 },
                PathCommand::QuadraticBezierTo {
                    x1: 20.0,
                    y1: 15.0,
                    x: 25.0,
                    y: 10.0
                },
                PathCommand::Close,
            ]
        );
        assert_eq!(extraction.diagnostics.len(), 1);
    }

    #[test]
    fn test_group_children_get_nested_ids() {
        let live = json!({
            "type": "group",
            "id": "g",
            "objects": [{"type": "rect"}, {"type": "circle", "id": "dot"}]
        });
        let record = extract_object(&live, "obj-0").record;
        let DrawableBody::Group(group) = &record.body else {
            panic!("expected group");
        };
        assert_eq!(group.objects()[0].id, "g-0");
        assert_eq!(group.objects()[1].id, "dot");
    }

    #[test]
    fn test_shadow_shorthand() {
        let shadow = parse_shadow_shorthand("rgba(0, 0, 0, 0.3) 5px 6px 10px").expect("shadow");
        assert_eq!(shadow.color, "rgba(0, 0, 0, 0.3)");
        assert!((shadow.offset_x - 5.0).abs() < f64::EPSILON);
        assert!((shadow.offset_y - 6.0).abs() < f64::EPSILON);
        assert!((shadow.blur - 10.0).abs() < f64::EPSILON);
        assert!(parse_shadow_shorthand("10px 10px").is_none());
    }

    #[test]
    fn test_live_projection_roundtrip() {
        let live = json!({
            "type": "line", "id": "l", "x1": 1, "y1": 2, "x2": 30, "y2": 4,
            "strokeDashArray": [4, 2], "stroke": "#ff0000", "strokeLineCap": "round"
        });
        let record = extract_object(&live, "l").record;
        let again = extract_object(&to_live_object(&record), "l").record;
        assert_eq!(again, record);
    }
}

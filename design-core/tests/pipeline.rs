//! Pipeline Integration Tests
//!
//! Exercises the document path end to end:
//! - live objects to records and back
//! - compression ladder selection, idempotency and budgets
//! - builder output through chunked storage

use design_core::compress::{minimal, ultra_minimal, DEFAULT_ULTRA_THRESHOLD_BYTES};
use design_core::record::{
    CircleProps, CommonProps, GroupProps, ImageProps, LineProps, PathProps, PolygonProps, RadiiProps,
    TextProps,
};
use design_core::{
    expand, extract_object, optimize, to_live_object, CanvasSize, Canonical, ChunkedStorage,
    CompressionOptions, DirectoryPersistence, Document, DocumentBuilder, DrawableBody,
    DrawableRecord, KindFilter, LiveScene, OriginX, OriginY, PathCommand, Point, Shadow,
    StrokeCap, StrokeJoin, TextAlign, Tier,
};
use proptest::prelude::*;
use serde_json::json;

// ============================================================================
// Strategies
// ============================================================================

fn color() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("#ff0000".to_string()),
        Just("#000000".to_string()),
        Just("rgba(0, 0, 0, 0.5)".to_string()),
        Just("transparent".to_string()),
        Just("teal".to_string()),
    ]
}

prop_compose! {
    fn geometry()(
        x in -500.0f64..1500.0,
        y in -500.0f64..1500.0,
        width in 0.0f64..800.0,
        height in 0.0f64..800.0,
        scale_x in 0.1f64..4.0,
        scale_y in 0.1f64..4.0,
        rotation in -360.0f64..360.0,
        opacity in 0.0f64..=1.0,
    ) -> [f64; 8] {
        [x, y, width, height, scale_x, scale_y, rotation, opacity]
    }
}

prop_compose! {
    fn common_fields()(
        [x, y, width, height, scale_x, scale_y, rotation, opacity] in geometry(),
        (fill, stroke, stroke_width) in (color(), color(), 0.0f64..12.0),
        cap in prop_oneof![Just(StrokeCap::Butt), Just(StrokeCap::Round), Just(StrokeCap::Square)],
        join in prop_oneof![Just(StrokeJoin::Miter), Just(StrokeJoin::Round), Just(StrokeJoin::Bevel)],
        origin_x in prop_oneof![Just(OriginX::Left), Just(OriginX::Center), Just(OriginX::Right)],
        origin_y in prop_oneof![Just(OriginY::Top), Just(OriginY::Center), Just(OriginY::Bottom)],
        shadow in proptest::option::of((color(), 0.0f64..20.0, -10.0f64..10.0, -10.0f64..10.0)),
        dashes in proptest::option::of(proptest::collection::vec(0.5f64..20.0, 0..4)),
        background in any::<bool>(),
    ) -> CommonProps {
        CommonProps {
            x: Some(x),
            y: Some(y),
            width: Some(width),
            height: Some(height),
            fill_color: Some(fill),
            stroke_color: Some(stroke),
            scale_x: Some(scale_x),
            scale_y: Some(scale_y),
            rotation_degrees: Some(rotation),
            opacity: Some(opacity),
            stroke_width: Some(stroke_width),
            stroke_cap: Some(cap),
            stroke_join: Some(join),
            origin_x: Some(origin_x),
            origin_y: Some(origin_y),
            shadow: shadow.map(|(color, blur, offset_x, offset_y)| Shadow {
                color,
                blur,
                offset_x,
                offset_y,
            }),
            dash_pattern: dashes,
            is_background_layer: Some(background),
        }
    }
}

fn point() -> impl Strategy<Value = Point> {
    (-200.0f64..200.0, -200.0f64..200.0).prop_map(|(x, y)| Point { x, y })
}

fn path_command() -> impl Strategy<Value = PathCommand> {
    let c = || -300.0f64..300.0;
    prop_oneof![
        (c(), c()).prop_map(|(x, y)| PathCommand::MoveTo { x, y }),
        (c(), c()).prop_map(|(x, y)| PathCommand::LineTo { x, y }),
        (c(), c(), c(), c(), c(), c()).prop_map(|(x1, y1, x2, y2, x, y)| {
            PathCommand::CubicBezierTo {
                x1,
                y1,
                x2,
                y2,
                x,
                y,
            }
        }),
        (c(), c(), c(), c())
            .prop_map(|(x1, y1, x, y)| PathCommand::QuadraticBezierTo { x1, y1, x, y }),
        Just(PathCommand::Close),
    ]
}

fn leaf_body() -> impl Strategy<Value = DrawableBody> {
    prop_oneof![
        (
            "[a-zA-Z ,.!\n]{0,60}",
            8.0f64..120.0,
            prop_oneof![Just("normal"), Just("bold"), Just("700")],
            prop_oneof![Just(TextAlign::Left), Just(TextAlign::Center), Just(TextAlign::Right)],
            0.0f64..10.0,
            0.8f64..2.0,
        )
            .prop_map(|(content, size, weight, align, spacing, line_height)| {
                DrawableBody::Text(TextProps {
                    font_size_px: Some(size),
                    font_family: Some("Inter".to_string()),
                    font_weight: Some(weight.to_string()),
                    text_align: Some(align),
                    content: Some(content),
                    char_spacing: Some(spacing),
                    line_height_multiplier: Some(line_height),
                })
            }),
        (
            "https://cdn\\.example\\.com/[a-z]{1,8}\\.png",
            proptest::option::of(Just("anonymous".to_string()))
        )
            .prop_map(|(uri, policy)| DrawableBody::Image(ImageProps {
                source_uri: Some(uri),
                cross_origin_policy: policy,
            })),
        (0.0f64..40.0, 0.0f64..40.0).prop_map(|(rx, ry)| DrawableBody::Rect(RadiiProps {
            rx: Some(rx),
            ry: Some(ry),
        })),
        (0.0f64..200.0).prop_map(|r| DrawableBody::Circle(CircleProps { radius: Some(r) })),
        (0.0f64..100.0, 0.0f64..100.0).prop_map(|(rx, ry)| DrawableBody::Ellipse(RadiiProps {
            rx: Some(rx),
            ry: Some(ry),
        })),
        Just(DrawableBody::Triangle),
        proptest::collection::vec(point(), 0..8).prop_map(|points| {
            DrawableBody::Polygon(PolygonProps {
                points: Some(points),
            })
        }),
        proptest::collection::vec(path_command(), 0..8).prop_map(|commands| {
            DrawableBody::Path(PathProps {
                commands: Some(commands),
            })
        }),
        (point(), point()).prop_map(|(a, b)| DrawableBody::Line(LineProps {
            x1: Some(a.x),
            y1: Some(a.y),
            x2: Some(b.x),
            y2: Some(b.y),
        })),
        prop_oneof![Just("sticker"), Just("qr-code")].prop_map(|k| DrawableBody::Unknown {
            source_kind: Some(k.to_string()),
        }),
    ]
}

prop_compose! {
    fn leaf_record()(id in "[a-z]{1,6}-[0-9]{1,3}", body in leaf_body(), common in common_fields())
        -> DrawableRecord {
        DrawableRecord { id, body, common }.normalized()
    }
}

fn record() -> impl Strategy<Value = DrawableRecord> {
    prop_oneof![
        4 => leaf_record(),
        1 => (leaf_record(), proptest::collection::vec(leaf_record(), 0..4)).prop_map(
            |(mut group, children)| {
                group.body = DrawableBody::Group(GroupProps {
                    objects: Some(children),
                });
                group.normalized()
            }
        ),
    ]
}

prop_compose! {
    fn document()(objects in proptest::collection::vec(record(), 0..24), with_bg in any::<bool>())
        -> Document {
        let mut document = DocumentBuilder::new("doc", "post")
            .clock(|| 1_700_000_000_000)
            .build_from_records(CanvasSize::new(1080.0, 1080.0), "#ffffff", None, objects);
        if with_bg {
            document.background_image_uri = Some("https://cdn.example.com/bg.jpg".to_string());
        }
        document
    }
}

prop_compose! {
    /// Documents past the ultra-minimal threshold, built by repeating a few
    /// records alongside long captions.
    fn large_document()(
        base in proptest::collection::vec(leaf_record(), 1..6),
        copies in 150usize..300,
        caption in "[a-z ]{400,800}",
    ) -> Document {
        let objects = (0..copies)
            .flat_map(|copy| {
                let mut records: Vec<DrawableRecord> = base
                    .iter()
                    .enumerate()
                    .map(|(i, record)| DrawableRecord {
                        id: format!("{}-{copy}-{i}", record.id),
                        ..record.clone()
                    })
                    .collect();
                records.push(DrawableRecord::new(
                    format!("caption-{copy}"),
                    DrawableBody::Text(TextProps {
                        content: Some(caption.clone()),
                        ..TextProps::default()
                    }),
                ));
                records
            })
            .collect();
        DocumentBuilder::new("large", "flyer")
            .clock(|| 1_700_000_000_000)
            .build_from_records(CanvasSize::new(1920.0, 1080.0), "#ffffff", None, objects)
    }
}

// ============================================================================
// Round-trip Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_live_projection_roundtrips(record in record()) {
        let live = to_live_object(&record);
        let extraction = extract_object(&live, "fallback");
        prop_assert_eq!(extraction.record, record.normalized());
    }

    #[test]
    fn prop_optimize_is_idempotent(doc in document(), budget in 0usize..400_000) {
        let options = CompressionOptions::default();
        let once = optimize(&doc, budget, &options).expect("optimize");
        let twice = optimize(&once.result, budget, &options).expect("optimize");
        prop_assert_eq!(twice.result, once.result);
    }

    #[test]
    fn prop_optimize_meets_reachable_budgets(doc in document(), budget in 0usize..60_000) {
        let options = CompressionOptions::default();
        let floor = ultra_minimal(&doc, &options).serialized_size().expect("size");
        prop_assume!(budget >= floor);
        let out = optimize(&doc, budget, &options).expect("optimize");
        prop_assert!(out.result_size <= budget);
        prop_assert!(!out.budget_exceeded);
        prop_assert_eq!(out.result_size, out.result.serialized_size().expect("size"));
    }

    #[test]
    fn prop_minimal_expands_back_within_precision(doc in document()) {
        let options = CompressionOptions::default();
        let expanded = expand(&minimal(&doc, &options));
        let mut rounded = doc.clone();
        for record in &mut rounded.objects {
            record.round();
        }
        prop_assert_eq!(expanded, rounded);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_optimize_is_idempotent_above_threshold(
        doc in large_document(),
        budget in (DEFAULT_ULTRA_THRESHOLD_BYTES + 1)..400_000,
    ) {
        let options = CompressionOptions::default();
        let once = optimize(&doc, budget, &options).expect("optimize");
        prop_assert_ne!(once.tier_used, Tier::UltraMinimal);
        if once.budget_exceeded {
            prop_assert_eq!(once.tier_used, Tier::Minimal);
        }
        let twice = optimize(&once.result, budget, &options).expect("optimize");
        prop_assert_eq!(twice.result, once.result);
        prop_assert_eq!(twice.budget_exceeded, once.budget_exceeded);
    }
}

// ============================================================================
// Compression Scenarios
// ============================================================================

#[test]
fn test_two_megabyte_document_takes_minimal_tier() {
    let objects = (0..7_000)
        .map(|i| {
            let i = f64::from(i);
            DrawableRecord::new("", DrawableBody::Rect(RadiiProps::default()))
                .with_bounds(0.0, 0.0, 100.0 + i * 0.001_234_567, 50.0 + i * 0.007_654_321)
        })
        .enumerate()
        .map(|(i, mut record)| {
            record.id = format!("r{i}");
            record
        })
        .collect();
    let document = DocumentBuilder::new("big", "flyer").build_from_records(
        CanvasSize::new(1920.0, 1080.0),
        "#ffffff",
        None,
        objects,
    );

    let out = optimize(&document, 500_000, &CompressionOptions::default()).expect("optimize");
    assert!(out.original_size > 2_000_000, "original {}", out.original_size);
    assert_eq!(out.tier_used, Tier::Minimal);
    assert!(out.result_size <= 500_000, "result {}", out.result_size);
    assert_eq!(out.result.object_count(), 7_000);
    assert!(!out.budget_exceeded);
}

#[test]
fn test_ultra_minimal_only_below_threshold() {
    let objects = (0..40)
        .map(|i| {
            DrawableRecord::new(
                format!("t{i}"),
                DrawableBody::Text(TextProps {
                    content: Some("lorem ipsum dolor sit amet ".repeat(20)),
                    ..TextProps::default()
                }),
            )
            .with_fill("#336699")
        })
        .collect();
    let document = DocumentBuilder::new("d", "banner").build_from_records(
        CanvasSize::new(728.0, 90.0),
        "#ffffff",
        Some("https://cdn.example.com/bg.png".to_string()),
        objects,
    );
    let options = CompressionOptions::default();

    let small = optimize(&document, 8_000, &options).expect("optimize");
    assert_eq!(small.tier_used, Tier::UltraMinimal);
    assert!(small.result.background_image_uri.is_none());

    let large = optimize(&document, DEFAULT_ULTRA_THRESHOLD_BYTES + 1, &options)
        .expect("optimize");
    assert_ne!(large.tier_used, Tier::UltraMinimal);
    assert!(large.result.background_image_uri.is_some());
}

// ============================================================================
// Builder to Storage
// ============================================================================

#[tokio::test]
async fn test_scene_to_storage_and_back() {
    let canvas = json!({
        "width": 500,
        "height": 500,
        "background": "#f0f0f0",
        "objects": [
            {"type": "textbox", "id": "title", "left": 20.25, "top": 30.5, "width": 200,
             "height": 40, "text": "Grand Opening", "fontSize": 32, "fill": "#222222"},
            {"type": "image", "id": "logo", "left": 300, "top": 20, "width": 120,
             "height": 120, "src": "https://cdn.example.com/logo.png"},
            {"type": "rect", "left": 0, "top": 400, "width": 500, "height": 100,
             "fill": "#ffcc00", "isBackground": true},
            {"type": "line", "x1": 0, "y1": 0, "x2": 500, "y2": 0, "stroke": "#000000"}
        ]
    });
    let scene = LiveScene::from_canvas_json(&canvas).expect("scene");
    let (document, diagnostics) = DocumentBuilder::new("opening", "flyer")
        .template_key("retail-01")
        .build(&scene);
    assert!(diagnostics.is_empty(), "{diagnostics:?}");
    assert_eq!(document.objects[2].id, "obj-2");

    let dir = tempfile::tempdir().expect("tempdir");
    let storage = ChunkedStorage::new(DirectoryPersistence::new(dir.path()));
    let compact = optimize(&document, 1_200, &CompressionOptions::default())
        .expect("optimize")
        .result;
    let report = storage.save(&compact).await.expect("save");
    assert_eq!(report.artifacts.len(), 6);

    let loaded = storage.load("opening").await.expect("load");
    assert_eq!(expand(&loaded), document);

    let images = storage
        .load_kind("opening", KindFilter::Image)
        .await
        .expect("images");
    assert_eq!(images.len(), 1);
    assert_eq!(images[0].id, "logo");
}

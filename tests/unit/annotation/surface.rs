use std::cell::Cell;

use super::*;
use crate::artifact::raster::RasterArtifact;
use crate::foundation::clock::ManualClock;

struct SolidRasterizer {
    width: u32,
    height: u32,
    calls: Cell<u32>,
}

impl SolidRasterizer {
    fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            calls: Cell::new(0),
        }
    }
}

impl Rasterizer for SolidRasterizer {
    fn rasterize(&self, _url: &str, _kind: ArtifactKind) -> InkreelResult<RasterArtifact> {
        self.calls.set(self.calls.get() + 1);
        Ok(RasterArtifact {
            image: FrameRGBA::solid(self.width, self.height, Rgba8::WHITE),
            page_count: 1,
        })
    }
}

fn surface_with_clock() -> (AnnotationSurface, ManualClock) {
    let clock = ManualClock::new(0);
    let mut surface = AnnotationSurface::new(Size::new(100.0, 100.0), Rc::new(clock.clone()));
    surface
        .load_background(&SolidRasterizer::new(100, 100), "a.png", ArtifactKind::Image)
        .unwrap();
    (surface, clock)
}

fn drag(surface: &mut AnnotationSurface, from: (f64, f64), to: (f64, f64)) -> Option<Mutation> {
    surface.pointer_down(Point::new(from.0, from.1));
    surface.pointer_move(Point::new((from.0 + to.0) / 2.0, (from.1 + to.1) / 2.0));
    surface.pointer_up(Point::new(to.0, to.1))
}

#[test]
fn tall_documents_fit_to_width() {
    let clock = ManualClock::new(0);
    let mut surface = AnnotationSurface::new(Size::new(800.0, 600.0), Rc::new(clock));
    let geometry = surface
        .load_background(&SolidRasterizer::new(500, 1200), "doc.pdf", ArtifactKind::Pdf)
        .unwrap();
    assert!((geometry.fit_zoom - 800.0 / 500.0).abs() < 1e-9);
    assert_eq!(surface.zoom(), geometry.fit_zoom);
    assert_eq!(surface.container(), Size::new(800.0, 600.0));
}

#[test]
fn documents_are_rejected_and_reloads_are_cached() {
    let clock = ManualClock::new(0);
    let mut surface = AnnotationSurface::new(Size::new(100.0, 100.0), Rc::new(clock));
    let r = SolidRasterizer::new(10, 10);
    assert!(
        surface
            .load_background(&r, "a.docx", ArtifactKind::Document)
            .is_err()
    );
    surface.load_background(&r, "a.png", ArtifactKind::Image).unwrap();
    surface.load_background(&r, "a.png", ArtifactKind::Image).unwrap();
    assert_eq!(r.calls.get(), 1);
    surface.load_background(&r, "b.png", ArtifactKind::Image).unwrap();
    assert_eq!(r.calls.get(), 2);
}

#[test]
fn pen_stroke_commits_one_snapshot_on_release() {
    let (mut surface, clock) = surface_with_clock();
    let m = drag(&mut surface, (10.0, 10.0), (50.0, 10.0));
    assert!(matches!(m, Some(Mutation::StrokeCommitted(_))));
    assert!(surface.snapshot_log().snapshots().is_empty());

    surface.begin_snapshots(1_000);
    clock.set_ms(3_500);
    surface.pointer_down(Point::new(10.0, 20.0));
    for x in 11..40 {
        surface.pointer_move(Point::new(f64::from(x), 20.0));
    }
    assert!(surface.snapshot_log().snapshots().is_empty());
    surface.pointer_up(Point::new(40.0, 20.0));

    let snaps = surface.snapshot_log().snapshots();
    assert_eq!(snaps.len(), 1);
    assert_eq!(snaps[0].timestamp, 2.5);
    let restored = SceneGraph::from_json(&snaps[0].canvas_json).unwrap();
    assert_eq!(restored.len(), 2);
}

#[test]
fn brush_width_is_divided_by_zoom() {
    let (mut surface, _clock) = surface_with_clock();
    surface.zoom_at(Point::new(50.0, 50.0), 2.0);
    let Some(Mutation::StrokeCommitted(id)) = drag(&mut surface, (10.0, 10.0), (20.0, 10.0))
    else {
        panic!("expected a stroke");
    };
    assert_eq!(surface.scene().get(id).unwrap().style.width, 2.5);
}

#[test]
fn shapes_use_drag_geometry() {
    let (mut surface, _clock) = surface_with_clock();
    surface.set_tool(Tool::Circle);
    let Some(Mutation::ShapeCommitted(id)) = drag(&mut surface, (50.0, 50.0), (53.0, 54.0))
    else {
        panic!("expected a circle");
    };
    assert_eq!(
        surface.scene().get(id).unwrap().shape,
        Shape::Circle {
            center: Point::new(50.0, 50.0),
            radius: 5.0
        }
    );

    surface.set_tool(Tool::Rectangle);
    let Some(Mutation::ShapeCommitted(id)) = drag(&mut surface, (80.0, 90.0), (60.0, 70.0))
    else {
        panic!("expected a rectangle");
    };
    assert_eq!(
        surface.scene().get(id).unwrap().shape,
        Shape::Rectangle {
            rect: crate::foundation::core::Rect::new(60.0, 70.0, 80.0, 90.0)
        }
    );

    assert_eq!(drag(&mut surface, (5.0, 5.0), (5.0, 5.0)), None);
    assert_eq!(surface.scene().len(), 2);
}

#[test]
fn switching_tools_finalizes_in_flight_shape() {
    let (mut surface, _clock) = surface_with_clock();
    surface.set_tool(Tool::Rectangle);
    surface.pointer_down(Point::new(10.0, 10.0));
    surface.pointer_move(Point::new(30.0, 30.0));
    let m = surface.set_tool(Tool::Pen);
    assert!(matches!(m, Some(Mutation::ShapeCommitted(_))));
    assert!(!surface.is_gesture_active());
}

#[test]
fn tap_eraser_deletes_topmost_hit_and_snapshots() {
    let (mut surface, _clock) = surface_with_clock();
    drag(&mut surface, (10.0, 10.0), (90.0, 10.0));
    drag(&mut surface, (10.0, 80.0), (90.0, 80.0));
    surface.begin_snapshots(0);

    surface.set_tool(Tool::Eraser);
    assert_eq!(surface.pointer_down(Point::new(50.0, 50.0)), None);
    let m = surface.pointer_down(Point::new(50.0, 11.0));
    assert!(matches!(m, Some(Mutation::Erased(_))));
    assert_eq!(surface.scene().len(), 1);
    assert_eq!(surface.snapshot_log().snapshots().len(), 1);
}

#[test]
fn stroke_eraser_commits_wide_erase_object() {
    let (mut surface, _clock) = surface_with_clock();
    surface.set_tool(Tool::Eraser);
    surface.set_eraser_mode(EraserMode::Stroke);
    let Some(Mutation::EraseCommitted(id)) = drag(&mut surface, (10.0, 10.0), (30.0, 10.0))
    else {
        panic!("expected an erase stroke");
    };
    let obj = surface.scene().get(id).unwrap();
    assert_eq!(obj.style.width, 15.0);
    assert!(matches!(obj.shape, Shape::Erase { .. }));
}

#[test]
fn select_moves_and_resizes_objects() {
    let (mut surface, _clock) = surface_with_clock();
    surface.set_tool(Tool::Rectangle);
    let Some(Mutation::ShapeCommitted(id)) = drag(&mut surface, (20.0, 20.0), (40.0, 40.0))
    else {
        panic!("expected a rectangle");
    };
    surface.set_tool(Tool::Select);
    assert!(surface.hits_object(Point::new(30.0, 30.0)));
    assert!(!surface.hits_object(Point::new(80.0, 80.0)));

    let m = drag(&mut surface, (30.0, 30.0), (40.0, 35.0));
    assert_eq!(m, Some(Mutation::Modified(id)));
    assert_eq!(surface.selection(), Some(id));
    assert_eq!(
        surface.scene().get(id).unwrap().shape,
        Shape::Rectangle {
            rect: crate::foundation::core::Rect::new(30.0, 25.0, 50.0, 45.0)
        }
    );

    // Bounds include half the 5px stroke: bottom-right handle sits at (52.5, 47.5).
    let before = surface.scene().get(id).unwrap().bounds();
    let m = drag(&mut surface, (52.5, 47.5), (77.5, 72.5));
    assert_eq!(m, Some(Mutation::Modified(id)));
    let after = surface.scene().get(id).unwrap().bounds();
    assert!((after.x0 - before.x0).abs() < 1e-9);
    assert!((after.width() - before.width() * 2.0).abs() < 1e-9);

    // A click without movement is not a modification.
    assert_eq!(drag(&mut surface, (40.0, 40.0), (40.0, 40.0)), None);
}

#[test]
fn cancel_rolls_back_moves() {
    let (mut surface, _clock) = surface_with_clock();
    surface.set_tool(Tool::Circle);
    let Some(Mutation::ShapeCommitted(id)) = drag(&mut surface, (50.0, 50.0), (60.0, 50.0))
    else {
        panic!("expected a circle");
    };
    surface.set_tool(Tool::Select);
    let before = surface.scene().get(id).unwrap().shape.clone();
    surface.pointer_down(Point::new(50.0, 50.0));
    surface.pointer_move(Point::new(70.0, 70.0));
    surface.cancel_gesture();
    assert_eq!(surface.scene().get(id).unwrap().shape, before);
}

#[test]
fn disabled_annotation_ignores_input_and_freezes_objects() {
    let (mut surface, _clock) = surface_with_clock();
    drag(&mut surface, (10.0, 10.0), (90.0, 10.0));
    surface.set_tool(Tool::Select);
    assert!(surface.scene().objects()[0].interactive);
    surface.set_annotation_enabled(false);
    assert!(!surface.scene().objects()[0].interactive);
    assert_eq!(surface.pointer_down(Point::new(50.0, 10.0)), None);
    assert!(!surface.is_gesture_active());
}

#[test]
fn layers_show_background_ink_and_preview() {
    let (mut surface, _clock) = surface_with_clock();
    surface.set_color(Rgba8::rgba(0, 0, 255, 255));
    surface.set_brush_size(BrushSize::Large);
    drag(&mut surface, (10.0, 50.0), (90.0, 50.0));
    surface.pointer_down(Point::new(50.0, 10.0));
    surface.pointer_move(Point::new(50.0, 30.0));

    let layers = surface.render_layers().unwrap().unwrap();
    assert_eq!((layers.lower.width, layers.lower.height), (100, 100));
    assert_eq!(layers.lower.pixel(50, 50), Some([0, 0, 255, 255]));
    assert_eq!(layers.lower.pixel(5, 95), Some([255, 255, 255, 255]));
    assert_eq!(layers.upper.pixel(50, 20), Some([0, 0, 255, 255]));
    assert_eq!(layers.upper.pixel(50, 50), Some([0, 0, 0, 0]));
}

#[test]
fn resize_refits_when_at_fit_zoom() {
    let (mut surface, _clock) = surface_with_clock();
    surface.resize(Size::new(50.0, 50.0));
    assert!((surface.zoom() - 0.5).abs() < 1e-9);
    surface.resize(Size::new(0.0, 0.0));
    assert_eq!(surface.container(), Size::new(50.0, 50.0));

    surface.set_zoom_preset(ZoomPreset::Factor(2.0));
    surface.resize(Size::new(200.0, 200.0));
    assert!((surface.zoom() - 2.0).abs() < 1e-9);
    surface.set_zoom_preset(ZoomPreset::Fit);
    assert!((surface.zoom() - 2.0).abs() < 1e-9);
}

#[test]
fn zoom_is_clamped_to_limits() {
    let (mut surface, _clock) = surface_with_clock();
    assert_eq!(surface.zoom_at(Point::new(0.0, 0.0), 100.0), 4.0);
    assert_eq!(surface.zoom_at(Point::new(0.0, 0.0), 0.001), 0.25);
}

#[test]
fn destroy_is_idempotent() {
    let (mut surface, _clock) = surface_with_clock();
    surface.destroy();
    surface.destroy();
    assert!(surface.is_destroyed());
    assert!(surface.render_layers().is_err());
    assert_eq!(surface.pointer_down(Point::new(1.0, 1.0)), None);
}

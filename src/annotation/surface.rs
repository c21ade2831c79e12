//! Layered markup surface over a rasterized artifact.
//!
//! The surface keeps two independent quantities: the logical canvas size (always the container
//! size) and the viewport transform (fit zoom, user zoom, pan). Loading an artifact or zooming
//! only changes the transform; resizing the container only changes the canvas size and then
//! re-derives the transform.

use std::rc::Rc;

use crate::annotation::model::{
    AnnotationObject, Corner, ObjectId, SceneGraph, Shape, Style, normalized_rect,
};
use crate::annotation::snapshot::{AnnotationSnapshot, SnapshotLog};
use crate::annotation::tools::{BrushSize, EraserMode, Tool, ToolState};
use crate::artifact::kind::ArtifactKind;
use crate::artifact::raster::Rasterizer;
use crate::foundation::clock::Clock;
use crate::foundation::core::{FrameRGBA, Point, Rgba8, Size, Vec2};
use crate::foundation::error::{InkreelError, InkreelResult};
use crate::geometry::viewport::{
    self, ArtifactGeometry, ViewportTransform, ZoomLimits, ZoomPreset,
};
use crate::render::composite::over_in_place;
use crate::render::cpu::{CpuImage, CpuLayer};
use crate::render::ink::{object_outline, render_ink_layer};
use crate::render::layers::{LayerSource, SurfaceLayers};

/// Screen-space radius for tap hit-testing and selection handles.
const HIT_SLOP_PX: f64 = 6.0;
const HANDLE_RADIUS_PX: f64 = 8.0;
const MIN_RESIZE_FACTOR: f64 = 0.05;

/// A committed change to the scene graph. Each one captured a snapshot when recording.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mutation {
    /// A pen stroke was committed.
    StrokeCommitted(ObjectId),
    /// A circle or rectangle was committed.
    ShapeCommitted(ObjectId),
    /// An eraser stroke was committed.
    EraseCommitted(ObjectId),
    /// An object was deleted by a tap.
    Erased(ObjectId),
    /// An object was moved or resized.
    Modified(ObjectId),
}

#[derive(Clone, Debug, Default)]
enum Gesture {
    #[default]
    Idle,
    Drawing {
        points: Vec<Point>,
    },
    Erasing {
        points: Vec<Point>,
    },
    Shaping {
        tool: Tool,
        origin: Point,
        current: Point,
    },
    Moving {
        id: ObjectId,
        last: Point,
        total: Vec2,
    },
    Resizing {
        original: Box<AnnotationObject>,
        anchor: Point,
        start_dist: f64,
        factor: f64,
    },
}

struct Background {
    url: String,
    kind: ArtifactKind,
    image: CpuImage,
    page_count: u32,
}

/// The markup surface.
pub struct AnnotationSurface {
    container: Size,
    background: Option<Background>,
    geometry: Option<ArtifactGeometry>,
    viewport: ViewportTransform,
    limits: ZoomLimits,
    tools: ToolState,
    scene: SceneGraph,
    selection: Option<ObjectId>,
    gesture: Gesture,
    log: SnapshotLog,
    clock: Rc<dyn Clock>,
    destroyed: bool,
}

impl AnnotationSurface {
    /// Create an empty surface for a container of the given size.
    pub fn new(container: Size, clock: Rc<dyn Clock>) -> Self {
        Self {
            container,
            background: None,
            geometry: None,
            viewport: ViewportTransform::default(),
            limits: ZoomLimits::default(),
            tools: ToolState::default(),
            scene: SceneGraph::new(),
            selection: None,
            gesture: Gesture::Idle,
            log: SnapshotLog::new(),
            clock,
            destroyed: false,
        }
    }

    /// Override the zoom bounds.
    pub fn with_zoom_limits(mut self, limits: ZoomLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Rasterize the artifact and fit it into the container.
    ///
    /// Reloading the same `(url, kind)` keeps the current raster and viewport. Document
    /// artifacts are rejected: they are download-only.
    #[tracing::instrument(skip(self, rasterizer))]
    pub fn load_background(
        &mut self,
        rasterizer: &dyn Rasterizer,
        url: &str,
        kind: ArtifactKind,
    ) -> InkreelResult<ArtifactGeometry> {
        self.ensure_alive()?;
        if !kind.supports_markup() {
            return Err(InkreelError::validation(
                "markup is not supported for document artifacts",
            ));
        }
        if let (Some(bg), Some(geometry)) = (&self.background, self.geometry)
            && bg.url == url
            && bg.kind == kind
        {
            return Ok(geometry);
        }

        let raster = rasterizer.rasterize(url, kind)?;
        let image = CpuImage::from_frame(&raster.image)?;
        let natural = raster.natural_size();
        let geometry = ArtifactGeometry::fitted(natural, self.container);
        tracing::debug!(
            width = natural.width,
            height = natural.height,
            pages = raster.page_count,
            fit_zoom = geometry.fit_zoom,
            "background loaded"
        );

        self.background = Some(Background {
            url: url.to_string(),
            kind,
            image,
            page_count: raster.page_count,
        });
        self.geometry = Some(geometry);
        self.set_viewport_unclamped(geometry.viewport);
        Ok(geometry)
    }

    /// Page count of the loaded artifact.
    pub fn page_count(&self) -> Option<u32> {
        self.background.as_ref().map(|b| b.page_count)
    }

    /// Current artifact geometry (with the live viewport), if an artifact is loaded.
    pub fn geometry(&self) -> Option<ArtifactGeometry> {
        self.geometry.map(|g| ArtifactGeometry {
            viewport: self.viewport,
            ..g
        })
    }

    /// Logical canvas size.
    pub fn container(&self) -> Size {
        self.container
    }

    /// React to a container resize. Zero-sized containers are ignored.
    pub fn resize(&mut self, container: Size) {
        if self.destroyed || container.is_empty() {
            return;
        }
        self.container = container;
        if let Some(geometry) = self.geometry() {
            let next = viewport::refit_on_resize(geometry, container);
            self.geometry = Some(next);
            self.set_viewport_unclamped(next.viewport);
        }
    }

    // Viewport

    /// Current viewport transform.
    pub fn viewport(&self) -> ViewportTransform {
        self.viewport
    }

    /// Current zoom.
    pub fn zoom(&self) -> f64 {
        self.viewport.zoom
    }

    /// Configured zoom bounds.
    pub fn zoom_limits(&self) -> ZoomLimits {
        self.limits
    }

    fn natural(&self) -> Size {
        self.geometry.map(|g| g.natural).unwrap_or_default()
    }

    fn set_viewport_unclamped(&mut self, vpt: ViewportTransform) {
        self.viewport = vpt;
        self.tools.zoom = vpt.zoom;
    }

    fn set_viewport_clamped(&mut self, vpt: ViewportTransform) {
        let clamped = viewport::clamp_viewport(vpt, self.natural(), self.container);
        self.set_viewport_unclamped(clamped);
    }

    /// Replace the viewport, clamping zoom and position.
    pub fn set_viewport(&mut self, vpt: ViewportTransform) {
        self.set_viewport_clamped(ViewportTransform::new(
            self.limits.clamp(vpt.zoom),
            vpt.offset,
        ));
    }

    /// Pan by a screen-space delta, then clamp position.
    pub fn pan_by(&mut self, delta: Vec2) {
        self.set_viewport_clamped(viewport::relative_pan(self.viewport, delta));
    }

    /// Zoom around a screen point, then clamp. Returns the applied zoom.
    pub fn zoom_at(&mut self, point: Point, zoom: f64) -> f64 {
        let zoom = self.limits.clamp(zoom);
        self.set_viewport_clamped(viewport::zoom_to_point(self.viewport, point, zoom));
        self.viewport.zoom
    }

    /// Jump to a preset zoom, centered.
    pub fn set_zoom_preset(&mut self, preset: ZoomPreset) -> f64 {
        let fit = self.geometry.map(|g| g.fit_zoom).unwrap_or(1.0);
        let zoom = self.limits.clamp(preset.resolve(fit));
        let centered = viewport::centered(self.natural(), self.container, zoom);
        self.set_viewport(centered);
        self.viewport.zoom
    }

    /// Map a canvas point into artifact coordinates.
    pub fn screen_to_scene(&self, p: Point) -> Point {
        self.viewport.screen_to_scene(p)
    }

    // Tools

    /// Tool parameters.
    pub fn tools(&self) -> &ToolState {
        &self.tools
    }

    /// Switch tools. An in-flight gesture is finalized first.
    pub fn set_tool(&mut self, tool: Tool) -> Option<Mutation> {
        let finished = self.finish_gesture();
        self.tools.active_tool = tool;
        if tool != Tool::Select {
            self.selection = None;
        }
        self.refresh_interactivity();
        finished
    }

    /// Takes effect on the next stroke.
    pub fn set_brush_size(&mut self, size: BrushSize) {
        self.tools.brush_size = size;
    }

    /// Takes effect on the next stroke.
    pub fn set_color(&mut self, color: Rgba8) {
        self.tools.color = color;
    }

    /// Takes effect on the next eraser gesture.
    pub fn set_eraser_mode(&mut self, mode: EraserMode) {
        self.tools.eraser_mode = mode;
    }

    /// Enable or disable markup. Disabling cancels any in-flight gesture.
    pub fn set_annotation_enabled(&mut self, enabled: bool) {
        if !enabled {
            self.gesture = Gesture::Idle;
            self.selection = None;
        }
        self.tools.annotation_enabled = enabled;
        self.refresh_interactivity();
    }

    fn refresh_interactivity(&mut self) {
        let interactive = self.tools.objects_interactive();
        self.scene.set_interactive(interactive);
    }

    // Scene

    /// Committed objects.
    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    /// Currently selected object (Select tool only).
    pub fn selection(&self) -> Option<ObjectId> {
        self.selection
    }

    /// Whether a pointer gesture is in flight.
    pub fn is_gesture_active(&self) -> bool {
        !matches!(self.gesture, Gesture::Idle)
    }

    /// Whether a press at `screen` would grab an object or a selection handle.
    pub fn hits_object(&self, screen: Point) -> bool {
        let p = self.screen_to_scene(screen);
        self.handle_at(p).is_some() || self.scene.hit_test(p, self.slop()).is_some()
    }

    fn slop(&self) -> f64 {
        HIT_SLOP_PX / self.viewport.zoom
    }

    fn handle_at(&self, p: Point) -> Option<(ObjectId, Corner)> {
        let id = self.selection?;
        let obj = self.scene.get(id)?;
        let radius = HANDLE_RADIUS_PX / self.viewport.zoom;
        Corner::hit(obj.bounds(), p, radius).map(|c| (id, c))
    }

    // Pointer input (screen coordinates)

    /// Start a tool gesture.
    pub fn pointer_down(&mut self, screen: Point) -> Option<Mutation> {
        if self.destroyed || !self.tools.annotation_enabled {
            return None;
        }
        if self.is_gesture_active() {
            return None;
        }
        let p = self.screen_to_scene(screen);
        match self.tools.active_tool {
            Tool::Pen => {
                self.gesture = Gesture::Drawing { points: vec![p] };
                None
            }
            Tool::Eraser => match self.tools.eraser_mode {
                EraserMode::Tap => {
                    let id = self.scene.hit_test(p, self.slop())?;
                    self.scene.remove(id);
                    self.capture_snapshot();
                    Some(Mutation::Erased(id))
                }
                EraserMode::Stroke => {
                    self.gesture = Gesture::Erasing { points: vec![p] };
                    None
                }
            },
            tool @ (Tool::Circle | Tool::Rectangle) => {
                self.gesture = Gesture::Shaping {
                    tool,
                    origin: p,
                    current: p,
                };
                None
            }
            Tool::Select => {
                if let Some((id, corner)) = self.handle_at(p) {
                    let original = self.scene.get(id)?.clone();
                    let bounds = original.bounds();
                    let anchor = corner.opposite().point(bounds);
                    let start_dist = corner.point(bounds).distance(anchor);
                    if start_dist > f64::EPSILON {
                        self.gesture = Gesture::Resizing {
                            original: Box::new(original),
                            anchor,
                            start_dist,
                            factor: 1.0,
                        };
                    }
                    return None;
                }
                self.selection = self.scene.hit_test(p, self.slop());
                if let Some(id) = self.selection {
                    self.gesture = Gesture::Moving {
                        id,
                        last: p,
                        total: Vec2::ZERO,
                    };
                }
                None
            }
        }
    }

    /// Continue the current gesture.
    pub fn pointer_move(&mut self, screen: Point) {
        if self.destroyed {
            return;
        }
        let p = self.screen_to_scene(screen);
        match &mut self.gesture {
            Gesture::Idle => {}
            Gesture::Drawing { points } | Gesture::Erasing { points } => {
                if points.last() != Some(&p) {
                    points.push(p);
                }
            }
            Gesture::Shaping { current, .. } => *current = p,
            Gesture::Moving { id, last, total } => {
                let delta = p - *last;
                if delta != Vec2::ZERO {
                    if let Some(obj) = self.scene.get_mut(*id) {
                        obj.translate(delta);
                    }
                    *last = p;
                    *total += delta;
                }
            }
            Gesture::Resizing {
                original,
                anchor,
                start_dist,
                factor,
            } => {
                *factor = (p.distance(*anchor) / *start_dist).max(MIN_RESIZE_FACTOR);
                let mut resized = (**original).clone();
                resized.scale_about(*anchor, *factor);
                if let Some(obj) = self.scene.get_mut(resized.id) {
                    *obj = resized;
                }
            }
        }
    }

    /// Finish the current gesture at `screen`.
    pub fn pointer_up(&mut self, screen: Point) -> Option<Mutation> {
        if self.destroyed {
            return None;
        }
        self.pointer_move(screen);
        self.finish_gesture()
    }

    /// Abandon the current gesture. Moves and resizes are rolled back.
    pub fn cancel_gesture(&mut self) {
        match std::mem::take(&mut self.gesture) {
            Gesture::Moving { id, total, .. } => {
                if let Some(obj) = self.scene.get_mut(id) {
                    obj.translate(-total);
                }
            }
            Gesture::Resizing { original, .. } => {
                if let Some(obj) = self.scene.get_mut(original.id) {
                    *obj = *original;
                }
            }
            _ => {}
        }
    }

    fn finish_gesture(&mut self) -> Option<Mutation> {
        let interactive = self.tools.objects_interactive();
        let mutation = match std::mem::take(&mut self.gesture) {
            Gesture::Idle => None,
            Gesture::Drawing { points } => {
                let style = Style {
                    color: self.tools.color,
                    width: self.tools.scene_brush_width(),
                };
                let id = self.scene.push(Shape::Stroke { points }, style, interactive);
                Some(Mutation::StrokeCommitted(id))
            }
            Gesture::Erasing { points } => {
                let style = Style {
                    color: Rgba8::BLACK,
                    width: self.tools.scene_eraser_width(),
                };
                let id = self.scene.push(Shape::Erase { points }, style, false);
                Some(Mutation::EraseCommitted(id))
            }
            Gesture::Shaping {
                tool,
                origin,
                current,
            } => {
                let shape = shape_from_drag(tool, origin, current)?;
                let style = Style {
                    color: self.tools.color,
                    width: self.tools.scene_brush_width(),
                };
                let id = self.scene.push(shape, style, interactive);
                Some(Mutation::ShapeCommitted(id))
            }
            Gesture::Moving { id, total, .. } => {
                (total != Vec2::ZERO).then_some(Mutation::Modified(id))
            }
            Gesture::Resizing {
                original, factor, ..
            } => (factor != 1.0).then_some(Mutation::Modified(original.id)),
        };
        if mutation.is_some() {
            self.capture_snapshot();
        }
        mutation
    }

    // Snapshots

    /// Start timestamping snapshots against a recording that began at `start_ms`.
    pub fn begin_snapshots(&mut self, start_ms: u64) {
        self.log.begin(start_ms);
    }

    /// Snapshot log.
    pub fn snapshot_log(&self) -> &SnapshotLog {
        &self.log
    }

    /// Move out the captured snapshots.
    pub fn take_snapshots(&mut self) -> Vec<AnnotationSnapshot> {
        self.log.take()
    }

    /// Stop capturing and forget snapshots (re-record).
    pub fn reset_snapshots(&mut self) {
        self.log.reset();
    }

    /// Append a snapshot of the current scene. No-op while no recording is active; encode
    /// failures are logged and dropped.
    pub fn capture_snapshot(&mut self) {
        if !self.log.is_active() {
            return;
        }
        match self.scene.to_json() {
            Ok(json) => {
                let now = self.clock.now_ms();
                self.log.capture(now, json);
            }
            Err(err) => tracing::warn!(%err, "annotation snapshot dropped"),
        }
    }

    // Rendering

    /// Render both layers at the logical canvas size.
    pub fn render_layers(&self) -> InkreelResult<Option<SurfaceLayers>> {
        self.ensure_alive()?;
        if self.container.is_empty() {
            return Ok(None);
        }
        let width = self.container.width.round().max(1.0) as u32;
        let height = self.container.height.round().max(1.0) as u32;
        let scene_to_screen = self.viewport.to_affine();

        let mut layer = CpuLayer::new(width, height)?;
        if let Some(bg) = &self.background {
            layer.draw_image(&bg.image, scene_to_screen);
        }
        let mut lower = layer.render();

        let in_flight_erase = match &self.gesture {
            Gesture::Erasing { points } => Some(AnnotationObject {
                id: ObjectId(u64::MAX),
                shape: Shape::Erase {
                    points: points.clone(),
                },
                style: Style {
                    color: Rgba8::BLACK,
                    width: self.tools.scene_eraser_width(),
                },
                interactive: false,
            }),
            _ => None,
        };
        let ink = match in_flight_erase {
            Some(erase) => {
                let mut objects = self.scene.objects().to_vec();
                objects.push(erase);
                render_ink_layer(&objects, scene_to_screen, width, height)?
            }
            None => render_ink_layer(self.scene.objects(), scene_to_screen, width, height)?,
        };
        over_in_place(&mut lower, &ink, 1.0)?;

        if let Some(preview) = self.preview_object() {
            layer.fill_path(&object_outline(&preview), scene_to_screen, preview.style.color);
        }
        let upper = layer.render();

        Ok(Some(SurfaceLayers {
            lower: frame(width, height, lower),
            upper: frame(width, height, upper),
        }))
    }

    fn preview_object(&self) -> Option<AnnotationObject> {
        let style = Style {
            color: self.tools.color,
            width: self.tools.scene_brush_width(),
        };
        let shape = match &self.gesture {
            Gesture::Drawing { points } => Shape::Stroke {
                points: points.clone(),
            },
            Gesture::Shaping {
                tool,
                origin,
                current,
            } => shape_from_drag(*tool, *origin, *current)?,
            _ => return None,
        };
        Some(AnnotationObject {
            id: ObjectId(u64::MAX),
            shape,
            style,
            interactive: false,
        })
    }

    // Teardown

    /// Release the background and ignore further input. Safe to call repeatedly.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        self.gesture = Gesture::Idle;
        self.selection = None;
        self.background = None;
        tracing::debug!("annotation surface destroyed");
    }

    /// Whether [`AnnotationSurface::destroy`] has run.
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    fn ensure_alive(&self) -> InkreelResult<()> {
        if self.destroyed {
            return Err(InkreelError::validation("annotation surface was destroyed"));
        }
        Ok(())
    }
}

impl LayerSource for AnnotationSurface {
    fn layers(&mut self) -> InkreelResult<Option<SurfaceLayers>> {
        self.render_layers()
    }
}

fn shape_from_drag(tool: Tool, origin: Point, current: Point) -> Option<Shape> {
    match tool {
        Tool::Circle => {
            let radius = origin.distance(current);
            (radius > 0.0).then_some(Shape::Circle {
                center: origin,
                radius,
            })
        }
        Tool::Rectangle => {
            let rect = normalized_rect(origin, current);
            (rect.width() > 0.0 && rect.height() > 0.0).then_some(Shape::Rectangle { rect })
        }
        _ => None,
    }
}

fn frame(width: u32, height: u32, data: Vec<u8>) -> FrameRGBA {
    FrameRGBA {
        width,
        height,
        data,
        premultiplied: true,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/annotation/surface.rs"]
mod tests;

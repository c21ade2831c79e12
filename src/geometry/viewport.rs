//! Viewport math: fit, clamp, zoom-to-point.
//!
//! The viewport transform is a uniform scale followed by a translation, mapping artifact
//! (scene) coordinates to canvas (screen) coordinates:
//!
//! `screen = scene * zoom + offset`
//!
//! The canvas backing size is owned elsewhere and never changes with zoom. Keeping "logical
//! drawing resolution" and "fit/zoom transform" as separate quantities is what prevents the
//! double-scaling class of bugs when a container resize arrives.

use crate::foundation::core::{Affine, Point, Size, Vec2};

/// Height/width ratio above which an artifact is treated as a reading-flow document.
pub const TALL_ASPECT_RATIO: f64 = 1.8;

/// How close the zoom must be to the previous fit zoom to count as "still at fit".
pub const REFIT_TOLERANCE: f64 = 0.02;

/// Inclusive zoom bounds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ZoomLimits {
    /// Smallest allowed zoom.
    pub min: f64,
    /// Largest allowed zoom.
    pub max: f64,
}

impl Default for ZoomLimits {
    fn default() -> Self {
        Self { min: 0.25, max: 4.0 }
    }
}

impl ZoomLimits {
    /// Clamp `zoom` into `[min, max]`. Non-finite input clamps to `min`.
    pub fn clamp(self, zoom: f64) -> f64 {
        if !zoom.is_finite() {
            return self.min;
        }
        zoom.clamp(self.min, self.max)
    }
}

/// Uniform-scale viewport transform.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewportTransform {
    /// Scene-to-screen scale factor, always `> 0`.
    pub zoom: f64,
    /// Screen-space translation applied after scaling.
    pub offset: Vec2,
}

impl Default for ViewportTransform {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            offset: Vec2::ZERO,
        }
    }
}

impl ViewportTransform {
    /// Create a transform.
    pub fn new(zoom: f64, offset: Vec2) -> Self {
        Self { zoom, offset }
    }

    /// Equivalent affine (`[zoom, 0, 0, zoom, tx, ty]`).
    pub fn to_affine(self) -> Affine {
        Affine::new([self.zoom, 0.0, 0.0, self.zoom, self.offset.x, self.offset.y])
    }

    /// Map a canvas point into scene coordinates.
    pub fn screen_to_scene(self, p: Point) -> Point {
        Point::new(
            (p.x - self.offset.x) / self.zoom,
            (p.y - self.offset.y) / self.zoom,
        )
    }

    /// Map a scene point into canvas coordinates.
    pub fn scene_to_screen(self, p: Point) -> Point {
        Point::new(
            p.x * self.zoom + self.offset.x,
            p.y * self.zoom + self.offset.y,
        )
    }
}

/// Derived geometry of the currently loaded artifact.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ArtifactGeometry {
    /// Natural artifact size in pixels.
    pub natural: Size,
    /// Zoom at which the artifact fills the container per [`fit_zoom`].
    pub fit_zoom: f64,
    /// Current viewport transform.
    pub viewport: ViewportTransform,
}

impl ArtifactGeometry {
    /// Fit the artifact into `container` and center it.
    pub fn fitted(natural: Size, container: Size) -> Self {
        let fit = fit_zoom(natural, container);
        Self {
            natural,
            fit_zoom: fit,
            viewport: centered(natural, container, fit),
        }
    }
}

/// Zoom at which the artifact fills the container.
///
/// Tall artifacts (height/width > [`TALL_ASPECT_RATIO`]) fit to width regardless of vertical
/// overflow; everything else fits the constrained axis.
pub fn fit_zoom(natural: Size, container: Size) -> f64 {
    if natural.is_empty() || container.is_empty() {
        return 1.0;
    }
    let width_fit = container.width / natural.width;
    if natural.aspect_ratio() > TALL_ASPECT_RATIO {
        width_fit
    } else {
        width_fit.min(container.height / natural.height)
    }
}

/// Transform at `zoom` with the artifact centered in the container.
pub fn centered(natural: Size, container: Size, zoom: f64) -> ViewportTransform {
    ViewportTransform::new(
        zoom,
        Vec2::new(
            (container.width - natural.width * zoom) / 2.0,
            (container.height - natural.height * zoom) / 2.0,
        ),
    )
}

/// Keep the artifact from being dragged out of view.
///
/// Per axis: if the artifact is smaller than the container it is centered, otherwise the offset
/// is clamped so neither edge crosses the container boundary. Idempotent.
pub fn clamp_viewport(vpt: ViewportTransform, natural: Size, container: Size) -> ViewportTransform {
    if natural.is_empty() {
        return vpt;
    }
    let art_w = natural.width * vpt.zoom;
    let art_h = natural.height * vpt.zoom;

    let x = clamp_axis(vpt.offset.x, art_w, container.width);
    let y = clamp_axis(vpt.offset.y, art_h, container.height);
    ViewportTransform::new(vpt.zoom, Vec2::new(x, y))
}

fn clamp_axis(offset: f64, art: f64, container: f64) -> f64 {
    if art <= container {
        (container - art) / 2.0
    } else {
        offset.clamp(container - art, 0.0)
    }
}

/// Change zoom while keeping the scene point under `point` fixed on screen.
pub fn zoom_to_point(vpt: ViewportTransform, point: Point, new_zoom: f64) -> ViewportTransform {
    let anchor = vpt.screen_to_scene(point);
    ViewportTransform::new(
        new_zoom,
        Vec2::new(point.x - anchor.x * new_zoom, point.y - anchor.y * new_zoom),
    )
}

/// Translate the viewport by a screen-space delta.
pub fn relative_pan(vpt: ViewportTransform, delta: Vec2) -> ViewportTransform {
    ViewportTransform::new(vpt.zoom, vpt.offset + delta)
}

/// Recompute geometry after the container changed size.
///
/// If the user was still at the previous fit zoom (within [`REFIT_TOLERANCE`]) the artifact is
/// re-fitted, otherwise the manual zoom is kept. The artifact is re-centered either way.
pub fn refit_on_resize(geometry: ArtifactGeometry, container: Size) -> ArtifactGeometry {
    let new_fit = fit_zoom(geometry.natural, container);
    let was_at_fit = (geometry.viewport.zoom - geometry.fit_zoom).abs() < REFIT_TOLERANCE;
    let zoom = if was_at_fit {
        new_fit
    } else {
        geometry.viewport.zoom
    };
    ArtifactGeometry {
        natural: geometry.natural,
        fit_zoom: new_fit,
        viewport: centered(geometry.natural, container, zoom),
    }
}

/// Discrete zoom choices offered by the zoom indicator.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ZoomPreset {
    /// Whatever [`fit_zoom`] yields for the current container.
    Fit,
    /// An absolute zoom factor (0.5, 1.0, 1.5, 2.0 in the stock menu).
    Factor(f64),
}

impl ZoomPreset {
    /// The stock preset menu.
    pub const MENU: [ZoomPreset; 5] = [
        ZoomPreset::Fit,
        ZoomPreset::Factor(0.5),
        ZoomPreset::Factor(1.0),
        ZoomPreset::Factor(1.5),
        ZoomPreset::Factor(2.0),
    ];

    /// Resolve to a concrete zoom given the current fit zoom.
    pub fn resolve(self, fit: f64) -> f64 {
        match self {
            ZoomPreset::Fit => fit,
            ZoomPreset::Factor(z) => z,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/geometry/viewport.rs"]
mod tests;

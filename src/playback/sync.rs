//! Replays recorded annotation snapshots against video playback time.

use crate::annotation::model::{AnnotationObject, SceneGraph};
use crate::annotation::snapshot::{AnnotationSnapshot, decode_snapshots};
use crate::artifact::kind::ArtifactKind;
use crate::artifact::raster::Rasterizer;
use crate::foundation::core::{FrameRGBA, Size};
use crate::foundation::error::{InkreelError, InkreelResult};
use crate::geometry::viewport::{self, ArtifactGeometry};
use crate::render::composite::over_in_place;
use crate::render::cpu::{CpuImage, CpuLayer};
use crate::render::ink::render_ink_layer;
use crate::render::layers::{LayerSource, SurfaceLayers};

struct LoadedBackground {
    url: String,
    kind: ArtifactKind,
    image: CpuImage,
}

/// Read-only annotation overlay driven by playback time.
pub struct PlaybackSynchronizer<R: Rasterizer> {
    rasterizer: R,
    container: Size,
    background: Option<LoadedBackground>,
    geometry: Option<ArtifactGeometry>,
    snapshots: Vec<AnnotationSnapshot>,
    scene: SceneGraph,
    selected: Option<usize>,
}

impl<R: Rasterizer> std::fmt::Debug for PlaybackSynchronizer<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackSynchronizer")
            .field("container", &self.container)
            .field("geometry", &self.geometry)
            .field("snapshots", &self.snapshots.len())
            .field("selected", &self.selected)
            .finish_non_exhaustive()
    }
}

impl<R: Rasterizer> PlaybackSynchronizer<R> {
    /// Empty synchronizer drawing into a container of the given size.
    pub fn new(rasterizer: R, container: Size) -> Self {
        Self {
            rasterizer,
            container,
            background: None,
            geometry: None,
            snapshots: Vec::new(),
            scene: SceneGraph::new(),
            selected: None,
        }
    }

    /// Rasterize and fit the artifact. Repeated calls with the same `(url, kind)` do nothing.
    #[tracing::instrument(skip(self))]
    pub fn load_background(
        &mut self,
        url: &str,
        kind: ArtifactKind,
    ) -> InkreelResult<ArtifactGeometry> {
        if !kind.supports_markup() {
            return Err(InkreelError::validation(
                "document artifacts have no annotation playback",
            ));
        }
        if let (Some(bg), Some(geometry)) = (&self.background, self.geometry)
            && bg.url == url
            && bg.kind == kind
        {
            return Ok(geometry);
        }
        let raster = self.rasterizer.rasterize(url, kind)?;
        let image = CpuImage::from_frame(&raster.image)?;
        let geometry = ArtifactGeometry::fitted(raster.natural_size(), self.container);
        self.background = Some(LoadedBackground {
            url: url.to_string(),
            kind,
            image,
        });
        self.geometry = Some(geometry);
        Ok(geometry)
    }

    /// Current geometry, once a background is loaded.
    pub fn geometry(&self) -> Option<ArtifactGeometry> {
        self.geometry
    }

    /// Container size.
    pub fn container(&self) -> Size {
        self.container
    }

    /// Follow a container resize. Zero sizes are ignored.
    pub fn resize(&mut self, container: Size) {
        if container.is_empty() {
            return;
        }
        self.container = container;
        if let Some(g) = self.geometry {
            self.geometry = Some(viewport::refit_on_resize(g, container));
        }
    }

    /// Replace the snapshot list, ordering it by timestamp (ties keep their order).
    pub fn set_snapshots(&mut self, mut snapshots: Vec<AnnotationSnapshot>) {
        snapshots.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
        self.snapshots = snapshots;
        self.selected = None;
        self.scene.clear();
    }

    /// Decode a sidecar JSON array and install it.
    pub fn load_snapshots_json(&mut self, json: &str) -> InkreelResult<usize> {
        let snapshots = decode_snapshots(json)?;
        let n = snapshots.len();
        self.set_snapshots(snapshots);
        Ok(n)
    }

    /// Installed snapshots in timestamp order.
    pub fn snapshots(&self) -> &[AnnotationSnapshot] {
        &self.snapshots
    }

    /// Index of the last snapshot at or before `time_secs`.
    pub fn select(&self, time_secs: f64) -> Option<usize> {
        self.snapshots
            .partition_point(|s| s.timestamp <= time_secs)
            .checked_sub(1)
    }

    /// Show the state at `time_secs`. Returns the selected snapshot index.
    ///
    /// Previously shown objects are always cleared first. A snapshot that fails to parse is
    /// logged and shown as empty.
    #[tracing::instrument(skip(self))]
    pub fn render(&mut self, time_secs: f64) -> InkreelResult<Option<usize>> {
        if self.background.is_none() {
            return Err(InkreelError::validation("playback background not loaded"));
        }
        self.scene.clear();
        let selected = self.select(time_secs);
        if let Some(idx) = selected {
            match SceneGraph::from_json(&self.snapshots[idx].canvas_json) {
                Ok(mut scene) => {
                    scene.set_interactive(false);
                    self.scene = scene;
                }
                Err(err) => {
                    tracing::warn!(idx, error = %err, "unreadable annotation snapshot");
                }
            }
        }
        self.selected = selected;
        Ok(selected)
    }

    /// Snapshot index shown by the last [`PlaybackSynchronizer::render`].
    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    /// Objects currently shown.
    pub fn objects(&self) -> &[AnnotationObject] {
        self.scene.objects()
    }

    /// Background plus shown objects at the container size. The upper layer is always empty.
    pub fn render_layers(&self) -> InkreelResult<Option<SurfaceLayers>> {
        let (Some(bg), Some(geometry)) = (&self.background, self.geometry) else {
            return Ok(None);
        };
        if self.container.is_empty() {
            return Ok(None);
        }
        let width = self.container.width.round().max(1.0) as u32;
        let height = self.container.height.round().max(1.0) as u32;
        let scene_to_screen = geometry.viewport.to_affine();

        let mut layer = CpuLayer::new(width, height)?;
        layer.draw_image(&bg.image, scene_to_screen);
        let mut lower = layer.render();
        let ink = render_ink_layer(self.scene.objects(), scene_to_screen, width, height)?;
        over_in_place(&mut lower, &ink, 1.0)?;

        Ok(Some(SurfaceLayers {
            lower: FrameRGBA {
                width,
                height,
                data: lower,
                premultiplied: true,
            },
            upper: FrameRGBA::transparent(width, height),
        }))
    }
}

impl<R: Rasterizer> LayerSource for PlaybackSynchronizer<R> {
    fn layers(&mut self) -> InkreelResult<Option<SurfaceLayers>> {
        self.render_layers()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/playback/sync.rs"]
mod tests;

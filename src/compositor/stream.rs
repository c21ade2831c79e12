//! Fixed-resolution compositing of surface layers and a webcam picture-in-picture.
//!
//! The output resolution locks to the first non-empty source frame. Later source sizes are
//! scaled uniformly and centered into the locked frame so encoders never see a size change.
//! Audio is never synthesized: the output stream shares the device's audio track handles.

use std::ops::ControlFlow;

use kurbo::{Shape as _, Stroke, StrokeOpts};

use crate::compositor::ticker::FrameTicker;
use crate::foundation::core::{Affine, FrameRGBA, Rect, Rgba8, Vec2};
use crate::foundation::error::InkreelResult;
use crate::media::track::{MediaStream, MediaTrack};
use crate::render::cpu::{CpuImage, CpuLayer};
use crate::render::layers::LayerSource;

const PATH_TOLERANCE: f64 = 0.1;

/// Corner the webcam thumbnail is anchored to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PipCorner {
    /// Top left.
    TopLeft,
    /// Top right.
    TopRight,
    /// Bottom left.
    BottomLeft,
    /// Bottom right.
    #[default]
    BottomRight,
}

/// Compositor configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct CompositorOpts {
    /// Frame rate the output track is captured at.
    pub fps: u32,
    /// Thumbnail width as a fraction of the output width.
    pub pip_scale: f64,
    /// Thumbnail height / width.
    pub pip_aspect: f64,
    /// Gap between thumbnail and frame edge, in pixels.
    pub pip_padding: f64,
    /// Thumbnail corner radius.
    pub pip_radius: f64,
    /// Anchor corner.
    pub pip_corner: PipCorner,
    /// Thumbnail border width.
    pub border_width: f64,
    /// Thumbnail border color.
    pub border_color: Rgba8,
}

impl Default for CompositorOpts {
    fn default() -> Self {
        Self {
            fps: 30,
            pip_scale: 0.18,
            pip_aspect: 3.0 / 4.0,
            pip_padding: 12.0,
            pip_radius: 12.0,
            pip_corner: PipCorner::BottomRight,
            border_width: 2.0,
            border_color: Rgba8::rgba(255, 255, 255, 51),
        }
    }
}

/// Where the thumbnail goes in a `width`x`height` frame. `None` if it would be empty.
pub fn pip_rect(opts: &CompositorOpts, width: u32, height: u32) -> Option<Rect> {
    let (fw, fh) = (f64::from(width), f64::from(height));
    let w = (fw * opts.pip_scale).round();
    let h = (w * opts.pip_aspect).round();
    if w <= 0.0 || h <= 0.0 {
        return None;
    }
    let pad = opts.pip_padding;
    let (x, y) = match opts.pip_corner {
        PipCorner::TopLeft => (pad, pad),
        PipCorner::TopRight => (fw - w - pad, pad),
        PipCorner::BottomLeft => (pad, fh - h - pad),
        PipCorner::BottomRight => (fw - w - pad, fh - h - pad),
    };
    Some(Rect::new(x, y, x + w, y + h))
}

/// Uniform scale + centering of a `src` sized frame into `dst`.
pub fn letterbox(src: (u32, u32), dst: (u32, u32)) -> Affine {
    let (sw, sh) = (f64::from(src.0), f64::from(src.1));
    let (dw, dh) = (f64::from(dst.0), f64::from(dst.1));
    if sw <= 0.0 || sh <= 0.0 {
        return Affine::IDENTITY;
    }
    let scale = (dw / sw).min(dh / sh);
    let offset = Vec2::new((dw - sw * scale) / 2.0, (dh - sh * scale) / 2.0);
    Affine::translate(offset) * Affine::scale(scale)
}

/// Per-frame compositor producing a synthesized video track.
#[derive(Debug)]
pub struct StreamCompositor {
    opts: CompositorOpts,
    device: MediaStream,
    video: MediaTrack,
    output: MediaStream,
    locked: Option<(u32, u32)>,
    frames_drawn: u64,
    destroyed: bool,
}

impl StreamCompositor {
    /// Compositor over `device`'s webcam, sharing its audio tracks.
    pub fn new(device: &MediaStream, opts: CompositorOpts) -> Self {
        let video = MediaTrack::video("composite");
        let mut output = MediaStream::new(vec![video.clone()]);
        for audio in device.audio_tracks() {
            output.add_track(audio.clone());
        }
        Self {
            opts,
            device: device.clone(),
            video,
            output,
            locked: None,
            frames_drawn: 0,
            destroyed: false,
        }
    }

    /// Capturable output: synthesized video plus device audio.
    pub fn stream(&self) -> &MediaStream {
        &self.output
    }

    /// Synthesized video track.
    pub fn video_track(&self) -> &MediaTrack {
        &self.video
    }

    /// Options in effect.
    pub fn opts(&self) -> &CompositorOpts {
        &self.opts
    }

    /// Output resolution, once locked.
    pub fn locked_size(&self) -> Option<(u32, u32)> {
        self.locked
    }

    /// Frames produced so far.
    pub fn frames_drawn(&self) -> u64 {
        self.frames_drawn
    }

    /// Whether [`StreamCompositor::destroy`] ran.
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Render one frame from `source` and publish it on the video track.
    ///
    /// `None` while the source has no drawable size yet, and after destroy.
    pub fn draw_frame<S: LayerSource + ?Sized>(
        &mut self,
        source: &mut S,
    ) -> InkreelResult<Option<FrameRGBA>> {
        if self.destroyed {
            return Ok(None);
        }
        let Some(layers) = source.layers()? else {
            return Ok(None);
        };
        let src = (layers.lower.width, layers.lower.height);
        if self.locked.is_none() && src.0 > 0 && src.1 > 0 {
            tracing::debug!(width = src.0, height = src.1, "compositor resolution locked");
            self.locked = Some(src);
        }
        let Some((w, h)) = self.locked else {
            return Ok(None);
        };
        if src.0 == 0 || src.1 == 0 {
            return Ok(None);
        }

        let mut layer = CpuLayer::new(w, h)?;
        let fit = letterbox(src, (w, h));
        layer.draw_image(&CpuImage::from_frame(&layers.lower)?, fit);
        if layers.upper.width > 0 && layers.upper.height > 0 {
            let upper_fit = letterbox((layers.upper.width, layers.upper.height), (w, h));
            layer.draw_image(&CpuImage::from_frame(&layers.upper)?, upper_fit);
        }
        self.draw_pip(&mut layer, w, h)?;

        let frame = FrameRGBA {
            width: w,
            height: h,
            data: layer.render(),
            premultiplied: true,
        };
        self.video.push_frame(frame.clone());
        self.frames_drawn += 1;
        Ok(Some(frame))
    }

    fn draw_pip(&self, layer: &mut CpuLayer, w: u32, h: u32) -> InkreelResult<()> {
        let Some(camera) = self.device.first_live_video() else {
            return Ok(());
        };
        let Some(webcam) = camera.current_frame() else {
            return Ok(());
        };
        if webcam.width == 0 || webcam.height == 0 {
            return Ok(());
        }
        let Some(rect) = pip_rect(&self.opts, w, h) else {
            return Ok(());
        };

        let clip = rect
            .to_rounded_rect(self.opts.pip_radius)
            .to_path(PATH_TOLERANCE);
        // Mirrored horizontally and stretched to the thumbnail box.
        let image_to_device = Affine::translate(Vec2::new(rect.x1, rect.y0))
            * Affine::scale_non_uniform(
                -rect.width() / f64::from(webcam.width),
                rect.height() / f64::from(webcam.height),
            );
        layer.fill_path_with_image(&clip, &CpuImage::from_frame(&webcam)?, image_to_device);

        if self.opts.border_width > 0.0 {
            let border = kurbo::stroke(
                clip.iter(),
                &Stroke::new(self.opts.border_width),
                &StrokeOpts::default(),
                PATH_TOLERANCE,
            );
            layer.fill_path(&border, Affine::IDENTITY, self.opts.border_color);
        }
        Ok(())
    }

    /// Draw frames until the ticker ends, `on_frame` breaks, or the compositor is destroyed.
    ///
    /// Returns the number of frames produced by this call.
    pub fn run<S: LayerSource + ?Sized>(
        &mut self,
        source: &mut S,
        ticker: &mut dyn FrameTicker,
        mut on_frame: impl FnMut(&FrameRGBA) -> ControlFlow<()>,
    ) -> InkreelResult<u64> {
        let mut produced = 0;
        while !self.destroyed && ticker.next_frame() {
            if let Some(frame) = self.draw_frame(source)? {
                produced += 1;
                if on_frame(&frame).is_break() {
                    break;
                }
            }
        }
        Ok(produced)
    }

    /// Stop the loop and the synthesized video track. Device tracks are left running.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        self.video.stop();
        tracing::debug!(frames = self.frames_drawn, "compositor destroyed");
    }
}

#[cfg(test)]
#[path = "../../tests/unit/compositor/stream.rs"]
mod tests;

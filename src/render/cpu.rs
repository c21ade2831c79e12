use std::sync::Arc;

use crate::foundation::core::{Affine, BezPath, FrameRGBA, Point, Rgba8};
use crate::foundation::error::{InkreelError, InkreelResult};

/// One `vello_cpu` drawing pass into a fresh transparent pixmap.
///
/// Paint calls accumulate until [`CpuLayer::render`], which rasterizes them and resets the
/// context for the next batch.
pub(crate) struct CpuLayer {
    width: u16,
    height: u16,
    ctx: vello_cpu::RenderContext,
}

impl CpuLayer {
    pub(crate) fn new(width: u32, height: u32) -> InkreelResult<Self> {
        let (width, height) = dims_u16(width, height)?;
        Ok(Self {
            width,
            height,
            ctx: vello_cpu::RenderContext::new(width, height),
        })
    }

    pub(crate) fn fill_path(&mut self, path: &BezPath, transform: Affine, color: Rgba8) {
        self.ctx
            .set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
        self.ctx.set_transform(affine_to_cpu(transform));
        self.ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
            color.r, color.g, color.b, color.a,
        ));
        self.ctx.fill_path(&bezpath_to_cpu(path));
    }

    /// Draw a whole image with its top-left corner at the transformed origin.
    pub(crate) fn draw_image(&mut self, image: &CpuImage, transform: Affine) {
        self.ctx
            .set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
        self.ctx.set_transform(affine_to_cpu(transform));
        self.ctx.set_paint(image.paint.clone());
        self.ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
            0.0,
            0.0,
            f64::from(image.width),
            f64::from(image.height),
        ));
    }

    /// Fill `path` (device space) with `image`, placed by `image_to_device`.
    pub(crate) fn fill_path_with_image(
        &mut self,
        path: &BezPath,
        image: &CpuImage,
        image_to_device: Affine,
    ) {
        self.ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        self.ctx.set_paint_transform(affine_to_cpu(image_to_device));
        self.ctx.set_paint(image.paint.clone());
        self.ctx.fill_path(&bezpath_to_cpu(path));
    }

    /// Rasterize everything painted since the last call into premultiplied RGBA8 bytes.
    pub(crate) fn render(&mut self) -> Vec<u8> {
        let mut pixmap = vello_cpu::Pixmap::new(self.width, self.height);
        self.ctx.flush();
        self.ctx.render_to_pixmap(&mut pixmap);
        self.ctx.reset();
        pixmap.data_as_u8_slice().to_vec()
    }
}

/// Cached `vello_cpu` image paint built from a frame.
#[derive(Clone)]
pub(crate) struct CpuImage {
    pub(crate) paint: vello_cpu::Image,
    pub(crate) width: u32,
    pub(crate) height: u32,
}

impl CpuImage {
    pub(crate) fn from_frame(frame: &FrameRGBA) -> InkreelResult<Self> {
        frame.validate()?;
        let pixmap = if frame.premultiplied {
            image_premul_bytes_to_pixmap(&frame.data, frame.width, frame.height)?
        } else {
            let mut premul = frame.data.clone();
            crate::foundation::math::premultiply_rgba8_in_place(&mut premul);
            image_premul_bytes_to_pixmap(&premul, frame.width, frame.height)?
        };
        Ok(Self {
            paint: vello_cpu::Image {
                image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
                sampler: vello_cpu::peniko::ImageSampler::default(),
            },
            width: frame.width,
            height: frame.height,
        })
    }
}

fn dims_u16(width: u32, height: u32) -> InkreelResult<(u16, u16)> {
    let w: u16 = width
        .try_into()
        .map_err(|_| InkreelError::render("surface width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| InkreelError::render("surface height exceeds u16"))?;
    if w == 0 || h == 0 {
        return Err(InkreelError::render("surface must be non-empty"));
    }
    Ok((w, h))
}

fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

fn point_to_cpu(p: Point) -> vello_cpu::kurbo::Point {
    vello_cpu::kurbo::Point::new(p.x, p.y)
}

fn bezpath_to_cpu(path: &BezPath) -> vello_cpu::kurbo::BezPath {
    use kurbo::PathEl;

    let mut out = vello_cpu::kurbo::BezPath::new();
    for &el in path.elements() {
        match el {
            PathEl::MoveTo(p) => out.move_to(point_to_cpu(p)),
            PathEl::LineTo(p) => out.line_to(point_to_cpu(p)),
            PathEl::QuadTo(p1, p2) => out.quad_to(point_to_cpu(p1), point_to_cpu(p2)),
            PathEl::CurveTo(p1, p2, p3) => {
                out.curve_to(point_to_cpu(p1), point_to_cpu(p2), point_to_cpu(p3));
            }
            PathEl::ClosePath => out.close_path(),
        }
    }
    out
}

fn image_premul_bytes_to_pixmap(
    rgba8_premul: &[u8],
    width: u32,
    height: u32,
) -> InkreelResult<vello_cpu::Pixmap> {
    let (w, h) = dims_u16(width, height)?;
    if rgba8_premul.len() != width as usize * height as usize * 4 {
        return Err(InkreelError::render("image byte length mismatch"));
    }

    let mut may_have_opacities = false;
    let mut pixels = Vec::with_capacity(width as usize * height as usize);
    for px in rgba8_premul.chunks_exact(4) {
        let a = px[3];
        may_have_opacities |= a != 255;
        pixels.push(vello_cpu::peniko::color::PremulRgba8 {
            r: px[0],
            g: px[1],
            b: px[2],
            a,
        });
    }

    Ok(vello_cpu::Pixmap::from_parts_with_opacity(
        pixels,
        w,
        h,
        may_have_opacities,
    ))
}

#[cfg(test)]
#[path = "../../tests/unit/render/cpu.rs"]
mod tests;

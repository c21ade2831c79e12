use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::artifact::kind::ArtifactKind;
use crate::foundation::core::{FrameRGBA, Rgba8, Size};
use crate::foundation::error::{InkreelError, InkreelResult};
use crate::foundation::math::premultiply_rgba8_in_place;
use crate::render::composite::over_in_place;

/// A rasterized artifact ready to be used as a background.
#[derive(Clone, Debug, PartialEq)]
pub struct RasterArtifact {
    /// Premultiplied pixels. Multi-page documents arrive already stitched.
    pub image: FrameRGBA,
    /// Number of source pages (1 for images).
    pub page_count: u32,
}

impl RasterArtifact {
    /// Natural pixel size.
    pub fn natural_size(&self) -> Size {
        self.image.size()
    }
}

/// Black-box "rasterize document to image" service.
pub trait Rasterizer {
    /// Produce one raster for the artifact at `url`.
    fn rasterize(&self, url: &str, kind: ArtifactKind) -> InkreelResult<RasterArtifact>;
}

impl<R: Rasterizer + ?Sized> Rasterizer for &R {
    fn rasterize(&self, url: &str, kind: ArtifactKind) -> InkreelResult<RasterArtifact> {
        (**self).rasterize(url, kind)
    }
}

/// Layout of stitched multi-page rasters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StitchOpts {
    /// Vertical gap between pages.
    pub page_gap_px: u32,
    /// Fill for gaps and horizontal padding.
    pub background: Rgba8,
}

impl Default for StitchOpts {
    fn default() -> Self {
        Self {
            page_gap_px: 16,
            background: Rgba8::WHITE,
        }
    }
}

/// Stack pages vertically into one tall raster.
///
/// Every page is padded to the widest page (centered) and pages are separated by a fixed gap.
pub fn stitch_pages(pages: &[FrameRGBA], opts: StitchOpts) -> InkreelResult<FrameRGBA> {
    if pages.is_empty() {
        return Err(InkreelError::render("cannot stitch zero pages"));
    }
    for p in pages {
        p.validate()?;
    }
    let width = pages.iter().map(|p| p.width).max().unwrap_or(0);
    let gaps = opts.page_gap_px.saturating_mul(pages.len() as u32 - 1);
    let height = pages
        .iter()
        .try_fold(gaps, |acc, p| acc.checked_add(p.height))
        .ok_or_else(|| InkreelError::render("stitched height overflows"))?;
    if width == 0 || height == 0 {
        return Err(InkreelError::render("stitched pages are empty"));
    }

    let mut out = FrameRGBA::solid(width, height, opts.background);
    let stride = width as usize * 4;
    let mut y = 0usize;
    for page in pages {
        let mut page = page.clone();
        if !page.premultiplied {
            premultiply_rgba8_in_place(&mut page.data);
        }
        let x_off = ((width - page.width) / 2) as usize * 4;
        let row_len = page.width as usize * 4;
        for row in 0..page.height as usize {
            let dst_start = (y + row) * stride + x_off;
            over_in_place(
                &mut out.data[dst_start..dst_start + row_len],
                &page.data[row * row_len..(row + 1) * row_len],
                1.0,
            )?;
        }
        y += page.height as usize + opts.page_gap_px as usize;
    }
    Ok(out)
}

/// Decode an encoded image into premultiplied RGBA8.
pub fn decode_image(bytes: &[u8]) -> InkreelResult<FrameRGBA> {
    let dyn_img = image::load_from_memory(bytes).context("decode image from memory")?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut data = rgba.into_raw();
    premultiply_rgba8_in_place(&mut data);

    Ok(FrameRGBA {
        width,
        height,
        data,
        premultiplied: true,
    })
}

/// Read and decode an image file.
pub fn load_image_file(path: &Path) -> InkreelResult<FrameRGBA> {
    let bytes =
        std::fs::read(path).with_context(|| format!("read image '{}'", path.display()))?;
    decode_image(&bytes)
}

/// Rasterizer over the local filesystem.
///
/// `url` may be a plain path or a `file://` URL, resolved against `root` when relative. Images
/// are decoded directly. A PDF source must be a directory of pre-rendered page images, which
/// are sorted by file name and stitched.
#[derive(Clone, Debug, Default)]
pub struct FsRasterizer {
    root: Option<PathBuf>,
    stitch: StitchOpts,
}

impl FsRasterizer {
    /// Resolve paths relative to the working directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative paths against `root`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
            stitch: StitchOpts::default(),
        }
    }

    /// Override stitch layout.
    pub fn with_stitch_opts(mut self, stitch: StitchOpts) -> Self {
        self.stitch = stitch;
        self
    }

    fn resolve(&self, url: &str) -> PathBuf {
        let raw = Path::new(url.strip_prefix("file://").unwrap_or(url));
        match &self.root {
            Some(root) if raw.is_relative() => root.join(raw),
            _ => raw.to_path_buf(),
        }
    }

    fn page_files(dir: &Path) -> InkreelResult<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir)
            .with_context(|| format!("read page directory '{}'", dir.display()))?
        {
            let path = entry.context("read page directory entry")?.path();
            let is_image = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| ArtifactKind::from_file_name(n).ok())
                == Some(ArtifactKind::Image);
            if path.is_file() && is_image {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

impl Rasterizer for FsRasterizer {
    #[tracing::instrument(skip(self))]
    fn rasterize(&self, url: &str, kind: ArtifactKind) -> InkreelResult<RasterArtifact> {
        let path = self.resolve(url);
        match kind {
            ArtifactKind::Document => Err(InkreelError::validation(
                "documents cannot be rasterized for markup",
            )),
            ArtifactKind::Image => Ok(RasterArtifact {
                image: load_image_file(&path)?,
                page_count: 1,
            }),
            ArtifactKind::Pdf => {
                if !path.is_dir() {
                    return Err(InkreelError::render(format!(
                        "pdf source '{}' must be a directory of page images",
                        path.display()
                    )));
                }
                let files = Self::page_files(&path)?;
                if files.is_empty() {
                    return Err(InkreelError::render(format!(
                        "no page images in '{}'",
                        path.display()
                    )));
                }
                let pages = files
                    .iter()
                    .map(|f| load_image_file(f))
                    .collect::<InkreelResult<Vec<_>>>()?;
                tracing::debug!(pages = pages.len(), "stitching pdf pages");
                Ok(RasterArtifact {
                    image: stitch_pages(&pages, self.stitch)?,
                    page_count: pages.len() as u32,
                })
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/artifact/raster.rs"]
mod tests;

use crate::foundation::core::FrameRGBA;
use crate::foundation::error::InkreelResult;

/// The two visual layers of an annotation surface, both at the logical canvas size.
#[derive(Clone, Debug, PartialEq)]
pub struct SurfaceLayers {
    /// Background artifact plus committed ink.
    pub lower: FrameRGBA,
    /// In-progress stroke or shape preview.
    pub upper: FrameRGBA,
}

/// Anything the compositor can pull layers from once per frame.
pub trait LayerSource {
    /// Current layers, or `None` while the source has no drawable size.
    fn layers(&mut self) -> InkreelResult<Option<SurfaceLayers>>;
}

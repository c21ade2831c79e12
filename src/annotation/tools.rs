use crate::foundation::core::Rgba8;

/// Interaction mode of the annotation surface.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    /// Freehand ink.
    #[default]
    Pen,
    /// Tap-delete or stroke-erase, depending on [`EraserMode`].
    Eraser,
    /// Press-drag circle, radius = drag distance.
    Circle,
    /// Press-drag axis-aligned rectangle.
    Rectangle,
    /// Move and resize existing objects; pans over empty canvas.
    Select,
}

impl Tool {
    /// Whether existing objects respond to hit-testing under this tool.
    pub fn makes_objects_interactive(self) -> bool {
        matches!(self, Tool::Select | Tool::Eraser)
    }

    /// Whether this tool creates a shape through press-drag-release.
    pub fn is_shape(self) -> bool {
        matches!(self, Tool::Circle | Tool::Rectangle)
    }
}

/// Preset brush thickness.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrushSize {
    /// 2px.
    Small,
    /// 5px.
    #[default]
    Medium,
    /// 10px.
    Large,
}

impl BrushSize {
    /// Stroke width in screen pixels (artifact pixels at zoom 1).
    pub fn width(self) -> f64 {
        match self {
            BrushSize::Small => 2.0,
            BrushSize::Medium => 5.0,
            BrushSize::Large => 10.0,
        }
    }
}

/// How the eraser removes ink.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EraserMode {
    /// Delete the topmost object under the pointer.
    #[default]
    Tap,
    /// Paint a destination-out stroke at [`ERASER_WIDTH_FACTOR`] times the brush width.
    Stroke,
}

/// Multiplier applied to the brush width for stroke-mode erasing.
pub const ERASER_WIDTH_FACTOR: f64 = 3.0;

/// Default ink color (`#ef4444`).
pub const DEFAULT_COLOR: Rgba8 = Rgba8::rgba(0xef, 0x44, 0x44, 0xff);

/// Colors offered by the tool palette, in display order.
pub const PALETTE: [Rgba8; 8] = [
    DEFAULT_COLOR,
    Rgba8::rgba(0xf9, 0x73, 0x16, 0xff),
    Rgba8::rgba(0xea, 0xb3, 0x08, 0xff),
    Rgba8::rgba(0x22, 0xc5, 0x5e, 0xff),
    Rgba8::rgba(0x3b, 0x82, 0xf6, 0xff),
    Rgba8::rgba(0x8b, 0x5c, 0xf6, 0xff),
    Rgba8::WHITE,
    Rgba8::BLACK,
];

/// User-controlled tool parameters.
///
/// Single writer: only the surface setters mutate this.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ToolState {
    /// Active interaction mode.
    pub active_tool: Tool,
    /// Brush preset.
    pub brush_size: BrushSize,
    /// Ink color.
    pub color: Rgba8,
    /// Eraser behavior.
    pub eraser_mode: EraserMode,
    /// Global markup toggle. When off, pointer input only pans.
    pub annotation_enabled: bool,
    /// Current viewport zoom, mirrored for brush scaling.
    pub zoom: f64,
}

impl Default for ToolState {
    fn default() -> Self {
        Self {
            active_tool: Tool::Pen,
            brush_size: BrushSize::Medium,
            color: DEFAULT_COLOR,
            eraser_mode: EraserMode::Tap,
            annotation_enabled: true,
            zoom: 1.0,
        }
    }
}

impl ToolState {
    /// Brush width in artifact space, so ink looks equally thick at every zoom.
    pub fn scene_brush_width(&self) -> f64 {
        self.brush_size.width() / self.zoom.max(f64::EPSILON)
    }

    /// Eraser stroke width in artifact space.
    pub fn scene_eraser_width(&self) -> f64 {
        self.scene_brush_width() * ERASER_WIDTH_FACTOR
    }

    /// Whether existing objects are hit-testable right now.
    pub fn objects_interactive(&self) -> bool {
        self.annotation_enabled && self.active_tool.makes_objects_interactive()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/annotation/tools.rs"]
mod tests;

//! Rasterization of annotation objects.

use kurbo::{Cap, Join, Shape as _, Stroke, StrokeOpts};

use crate::annotation::model::{AnnotationObject, Shape};
use crate::foundation::core::{Affine, BezPath, Point, Rgba8};
use crate::foundation::error::InkreelResult;
use crate::render::composite::{dest_out_in_place, over_in_place};
use crate::render::cpu::CpuLayer;

const PATH_TOLERANCE: f64 = 0.1;

/// Fill outline of an object, in scene coordinates.
pub(crate) fn object_outline(obj: &AnnotationObject) -> BezPath {
    let width = obj.style.width.max(0.0);
    match &obj.shape {
        Shape::Stroke { points } | Shape::Erase { points } => polyline_outline(points, width),
        Shape::Circle { center, radius } => {
            let circle = kurbo::Circle::new(*center, *radius);
            kurbo::stroke(
                circle.path_elements(PATH_TOLERANCE),
                &Stroke::new(width),
                &StrokeOpts::default(),
                PATH_TOLERANCE,
            )
        }
        Shape::Rectangle { rect } => kurbo::stroke(
            rect.path_elements(PATH_TOLERANCE),
            &Stroke::new(width).with_join(Join::Miter),
            &StrokeOpts::default(),
            PATH_TOLERANCE,
        ),
    }
}

/// Round-capped polyline. A stroke that never moved becomes a dot.
pub(crate) fn polyline_outline(points: &[Point], width: f64) -> BezPath {
    let Some(first) = points.first() else {
        return BezPath::new();
    };
    if points.iter().all(|p| p.distance(*first) <= f64::EPSILON) {
        return kurbo::Circle::new(*first, width / 2.0).to_path(PATH_TOLERANCE);
    }
    let mut line = BezPath::new();
    line.move_to(*first);
    for p in &points[1..] {
        line.line_to(*p);
    }
    kurbo::stroke(
        line.iter(),
        &Stroke::new(width).with_caps(Cap::Round).with_join(Join::Round),
        &StrokeOpts::default(),
        PATH_TOLERANCE,
    )
}

/// Render objects in paint order into a transparent premultiplied layer.
///
/// Erase objects punch holes (destination-out) into the ink painted before them; they never
/// touch anything outside this layer.
pub(crate) fn render_ink_layer(
    objects: &[AnnotationObject],
    scene_to_screen: Affine,
    width: u32,
    height: u32,
) -> InkreelResult<Vec<u8>> {
    let mut ink = vec![0u8; width as usize * height as usize * 4];
    if objects.is_empty() {
        return Ok(ink);
    }
    let mut layer = CpuLayer::new(width, height)?;
    let mut pending = false;

    for obj in objects {
        let outline = object_outline(obj);
        match obj.shape {
            Shape::Erase { .. } => {
                if pending {
                    over_in_place(&mut ink, &layer.render(), 1.0)?;
                    pending = false;
                }
                layer.fill_path(&outline, scene_to_screen, Rgba8::BLACK);
                dest_out_in_place(&mut ink, &layer.render())?;
            }
            _ => {
                layer.fill_path(&outline, scene_to_screen, obj.style.color);
                pending = true;
            }
        }
    }
    if pending {
        over_in_place(&mut ink, &layer.render(), 1.0)?;
    }
    Ok(ink)
}

#[cfg(test)]
#[path = "../../tests/unit/render/ink.rs"]
mod tests;

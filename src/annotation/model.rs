//! Explicit annotation scene graph.
//!
//! Objects are kept in paint order (first = bottom). Serialization is a direct structural dump:
//!
//! ```json
//! {"version":1,"objects":[{"id":1,"shape":{"type":"stroke","points":[{"x":1.0,"y":2.0}]},
//!   "style":{"color":"#ef4444","width":5.0}}]}
//! ```

use crate::foundation::core::{Point, Rect, Rgba8, Vec2};
use crate::foundation::error::{InkreelError, InkreelResult};

/// Current scene graph format version.
pub const SCENE_FORMAT_VERSION: u32 = 1;

/// Stable identifier of an object within one scene graph.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct ObjectId(pub u64);

/// Geometry of an annotation object, in artifact (scene) coordinates.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Shape {
    /// Freehand polyline.
    Stroke {
        /// Sampled pointer positions.
        points: Vec<Point>,
    },
    /// Circle outline.
    Circle {
        /// Center point.
        center: Point,
        /// Radius, `>= 0`.
        radius: f64,
    },
    /// Rectangle outline with non-negative size.
    Rectangle {
        /// Normalized rectangle (`x0 <= x1`, `y0 <= y1`).
        rect: Rect,
    },
    /// Destination-out stroke removing ink painted below it.
    Erase {
        /// Sampled pointer positions.
        points: Vec<Point>,
    },
}

/// Paint parameters of an object.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Style {
    /// Stroke color.
    pub color: Rgba8,
    /// Stroke width in scene units.
    pub width: f64,
}

/// One committed annotation.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AnnotationObject {
    /// Identifier, unique within the owning [`SceneGraph`].
    pub id: ObjectId,
    /// Geometry.
    pub shape: Shape,
    /// Paint parameters.
    pub style: Style,
    /// Whether the object takes part in hit-testing. Runtime-only, never serialized.
    #[serde(skip)]
    pub interactive: bool,
}

impl AnnotationObject {
    /// Bounds of the painted outline, including half the stroke width.
    pub fn bounds(&self) -> Rect {
        let half = self.style.width / 2.0;
        let geometry = match &self.shape {
            Shape::Stroke { points } | Shape::Erase { points } => points_bounds(points),
            Shape::Circle { center, radius } => Rect::new(
                center.x - radius,
                center.y - radius,
                center.x + radius,
                center.y + radius,
            ),
            Shape::Rectangle { rect } => *rect,
        };
        geometry.inflate(half, half)
    }

    /// Whether `p` hits this object.
    ///
    /// Strokes hit within half their width (plus `tolerance`) of any segment; circles and
    /// rectangles hit anywhere inside their bounds. Erase strokes are never hit.
    pub fn hit_test(&self, p: Point, tolerance: f64) -> bool {
        match &self.shape {
            Shape::Erase { .. } => false,
            Shape::Stroke { points } => {
                let reach = self.style.width / 2.0 + tolerance;
                match points.as_slice() {
                    [] => false,
                    [only] => only.distance(p) <= reach,
                    pts => pts
                        .windows(2)
                        .any(|w| distance_to_segment(p, w[0], w[1]) <= reach),
                }
            }
            Shape::Circle { .. } | Shape::Rectangle { .. } => {
                let b = self.bounds().inflate(tolerance, tolerance);
                p.x >= b.x0 && p.x <= b.x1 && p.y >= b.y0 && p.y <= b.y1
            }
        }
    }

    /// Move by `delta` scene units.
    pub fn translate(&mut self, delta: Vec2) {
        match &mut self.shape {
            Shape::Stroke { points } | Shape::Erase { points } => {
                for p in points.iter_mut() {
                    *p += delta;
                }
            }
            Shape::Circle { center, .. } => *center += delta,
            Shape::Rectangle { rect } => *rect = *rect + delta,
        }
    }

    /// Uniformly scale geometry and stroke width about `anchor`.
    pub fn scale_about(&mut self, anchor: Point, factor: f64) {
        let map = |p: Point| anchor + (p - anchor) * factor;
        match &mut self.shape {
            Shape::Stroke { points } | Shape::Erase { points } => {
                for p in points.iter_mut() {
                    *p = map(*p);
                }
            }
            Shape::Circle { center, radius } => {
                *center = map(*center);
                *radius *= factor;
            }
            Shape::Rectangle { rect } => {
                *rect = normalized_rect(
                    map(Point::new(rect.x0, rect.y0)),
                    map(Point::new(rect.x1, rect.y1)),
                );
            }
        }
        self.style.width *= factor;
    }
}

/// Rectangle spanning two corners, whatever the drag direction.
pub fn normalized_rect(a: Point, b: Point) -> Rect {
    Rect::new(a.x.min(b.x), a.y.min(b.y), a.x.max(b.x), a.y.max(b.y))
}

fn points_bounds(points: &[Point]) -> Rect {
    let Some(first) = points.first() else {
        return Rect::ZERO;
    };
    points.iter().skip(1).fold(
        Rect::from_origin_size(*first, (0.0, 0.0)),
        |acc, p| acc.union_pt(*p),
    )
}

fn distance_to_segment(p: Point, a: Point, b: Point) -> f64 {
    let ab = b - a;
    let len_sq = ab.hypot2();
    if len_sq <= f64::EPSILON {
        return p.distance(a);
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    p.distance(a + ab * t)
}

/// Corner of a selection box.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Corner {
    /// `(x0, y0)`.
    TopLeft,
    /// `(x1, y0)`.
    TopRight,
    /// `(x0, y1)`.
    BottomLeft,
    /// `(x1, y1)`.
    BottomRight,
}

impl Corner {
    const ALL: [Corner; 4] = [
        Corner::TopLeft,
        Corner::TopRight,
        Corner::BottomLeft,
        Corner::BottomRight,
    ];

    /// Position of this corner on `r`.
    pub fn point(self, r: Rect) -> Point {
        match self {
            Corner::TopLeft => Point::new(r.x0, r.y0),
            Corner::TopRight => Point::new(r.x1, r.y0),
            Corner::BottomLeft => Point::new(r.x0, r.y1),
            Corner::BottomRight => Point::new(r.x1, r.y1),
        }
    }

    /// The diagonally opposite corner.
    pub fn opposite(self) -> Corner {
        match self {
            Corner::TopLeft => Corner::BottomRight,
            Corner::TopRight => Corner::BottomLeft,
            Corner::BottomLeft => Corner::TopRight,
            Corner::BottomRight => Corner::TopLeft,
        }
    }

    /// Corner handle of `r` within `radius` of `p`, if any.
    pub fn hit(r: Rect, p: Point, radius: f64) -> Option<Corner> {
        Self::ALL
            .into_iter()
            .find(|c| c.point(r).distance(p) <= radius)
    }
}

/// Ordered list of annotation objects.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SceneGraph {
    objects: Vec<AnnotationObject>,
    next_id: u64,
}

#[derive(serde::Serialize)]
struct SceneDocRef<'a> {
    version: u32,
    objects: &'a [AnnotationObject],
}

#[derive(serde::Deserialize)]
struct SceneDoc {
    version: u32,
    #[serde(default)]
    objects: Vec<AnnotationObject>,
}

impl SceneGraph {
    /// Empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an object on top and return its id.
    pub fn push(&mut self, shape: Shape, style: Style, interactive: bool) -> ObjectId {
        self.next_id += 1;
        let id = ObjectId(self.next_id);
        self.objects.push(AnnotationObject {
            id,
            shape,
            style,
            interactive,
        });
        id
    }

    /// Remove an object. Returns it if it existed.
    pub fn remove(&mut self, id: ObjectId) -> Option<AnnotationObject> {
        let idx = self.objects.iter().position(|o| o.id == id)?;
        Some(self.objects.remove(idx))
    }

    /// Look up an object.
    pub fn get(&self, id: ObjectId) -> Option<&AnnotationObject> {
        self.objects.iter().find(|o| o.id == id)
    }

    /// Look up an object mutably.
    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut AnnotationObject> {
        self.objects.iter_mut().find(|o| o.id == id)
    }

    /// Topmost interactive object hit by `p`.
    pub fn hit_test(&self, p: Point, tolerance: f64) -> Option<ObjectId> {
        self.objects
            .iter()
            .rev()
            .filter(|o| o.interactive)
            .find(|o| o.hit_test(p, tolerance))
            .map(|o| o.id)
    }

    /// Set the interactive flag of every object.
    pub fn set_interactive(&mut self, interactive: bool) {
        for o in &mut self.objects {
            o.interactive = interactive;
        }
    }

    /// Objects in paint order.
    pub fn objects(&self) -> &[AnnotationObject] {
        &self.objects
    }

    /// Number of objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// `true` when there are no objects.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Drop every object.
    pub fn clear(&mut self) {
        self.objects.clear();
    }

    /// Serialize to the versioned JSON format.
    pub fn to_json(&self) -> InkreelResult<String> {
        serde_json::to_string(&SceneDocRef {
            version: SCENE_FORMAT_VERSION,
            objects: &self.objects,
        })
        .map_err(|e| InkreelError::serde(format!("scene graph encode failed: {e}")))
    }

    /// Parse the versioned JSON format. Loaded objects are non-interactive.
    pub fn from_json(json: &str) -> InkreelResult<Self> {
        let doc: SceneDoc = serde_json::from_str(json)
            .map_err(|e| InkreelError::serde(format!("scene graph decode failed: {e}")))?;
        if doc.version != SCENE_FORMAT_VERSION {
            return Err(InkreelError::serde(format!(
                "unsupported scene graph version {}",
                doc.version
            )));
        }
        let next_id = doc.objects.iter().map(|o| o.id.0).max().unwrap_or(0);
        Ok(Self {
            objects: doc.objects,
            next_id,
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/annotation/model.rs"]
mod tests;

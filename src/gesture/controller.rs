//! Pointer, touch and wheel disambiguation.
//!
//! Rules, in priority order:
//! - two touch pointers pan and pinch-zoom, never draw;
//! - a single pointer pans when markup is disabled or when the Select tool presses on empty
//!   canvas, otherwise it is forwarded to the surface as a tool gesture;
//! - Ctrl/Cmd + wheel zooms around the pointer, a plain wheel pans.
//!
//! Every pan or zoom goes through the surface, which re-clamps the viewport.

use std::collections::BTreeMap;

use crate::annotation::surface::{AnnotationSurface, Mutation};
use crate::annotation::tools::Tool;
use crate::foundation::core::{Point, Vec2};

/// Wheel zoom factor per notch when scrolling down (out).
pub const WHEEL_ZOOM_OUT: f64 = 0.95;
/// Wheel zoom factor per notch when scrolling up (in).
pub const WHEEL_ZOOM_IN: f64 = 1.05;
/// Wheel deltas smaller than this are trackpad noise.
pub const WHEEL_NOISE_THRESHOLD: f64 = 0.5;
/// Pinches starting closer than this only pan.
pub const MIN_PINCH_DISTANCE: f64 = 10.0;

/// Input device class of a pointer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PointerKind {
    /// Mouse or trackpad cursor.
    Mouse,
    /// Stylus.
    Pen,
    /// Finger.
    Touch,
}

/// Keyboard modifiers held during a wheel event.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Modifiers {
    /// Control key (also set by trackpad pinch on most platforms).
    pub ctrl: bool,
    /// Command / meta key.
    pub meta: bool,
}

/// Raw input in canvas (screen) coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InputEvent {
    /// A pointer was pressed.
    PointerDown {
        /// Pointer id, stable for the press.
        id: u64,
        /// Device class.
        kind: PointerKind,
        /// Position.
        position: Point,
    },
    /// A pointer moved.
    PointerMove {
        /// Pointer id.
        id: u64,
        /// Device class.
        kind: PointerKind,
        /// Position.
        position: Point,
    },
    /// A pointer was released.
    PointerUp {
        /// Pointer id.
        id: u64,
        /// Device class.
        kind: PointerKind,
        /// Position.
        position: Point,
    },
    /// The platform took the pointer away.
    PointerCancel {
        /// Pointer id.
        id: u64,
    },
    /// Wheel or trackpad scroll.
    Wheel {
        /// Pointer position.
        position: Point,
        /// Scroll delta in pixels.
        delta: Vec2,
        /// Held modifiers.
        modifiers: Modifiers,
    },
}

/// What an input event did.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GestureOutcome {
    /// The viewport moved.
    Panned,
    /// The zoom changed to the given value; refresh zoom indicator and brush width.
    Zoomed(f64),
    /// The event was handed to the surface as a tool gesture.
    Forwarded(Option<Mutation>),
    /// Nothing happened.
    Ignored,
}

#[derive(Clone, Copy, Debug)]
struct PinchState {
    initial_dist: f64,
    initial_zoom: f64,
    last_mid: Point,
}

#[derive(Clone, Copy, Debug)]
enum Drag {
    Pan { id: u64, last: Point },
    Tool { id: u64 },
}

/// Gesture state machine bound to one surface.
#[derive(Debug)]
pub struct GestureController {
    touches: BTreeMap<u64, Point>,
    pinch: Option<PinchState>,
    drag: Option<Drag>,
    attached: bool,
}

impl Default for GestureController {
    fn default() -> Self {
        Self::new()
    }
}

impl GestureController {
    /// Attached controller with no active pointers.
    pub fn new() -> Self {
        Self {
            touches: BTreeMap::new(),
            pinch: None,
            drag: None,
            attached: true,
        }
    }

    /// Release tracked pointers; subsequent input is ignored.
    pub fn detach(&mut self) {
        self.attached = false;
        self.touches.clear();
        self.pinch = None;
        self.drag = None;
    }

    /// Whether [`GestureController::detach`] has not been called.
    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Whether a two-finger gesture is in progress.
    pub fn is_pinching(&self) -> bool {
        self.pinch.is_some()
    }

    /// Route one input event.
    pub fn handle(&mut self, surface: &mut AnnotationSurface, event: InputEvent) -> GestureOutcome {
        if !self.attached || surface.is_destroyed() {
            return GestureOutcome::Ignored;
        }
        match event {
            InputEvent::PointerDown { id, kind, position } => {
                self.pointer_down(surface, id, kind, position)
            }
            InputEvent::PointerMove { id, kind, position } => {
                self.pointer_move(surface, id, kind, position)
            }
            InputEvent::PointerUp { id, kind, position } => {
                self.pointer_up(surface, id, kind, position)
            }
            InputEvent::PointerCancel { id } => {
                self.touches.remove(&id);
                if self.touches.len() < 2 {
                    self.pinch = None;
                }
                match self.drag {
                    Some(Drag::Tool { id: active }) if active == id => {
                        surface.cancel_gesture();
                        self.drag = None;
                    }
                    Some(Drag::Pan { id: active, .. }) if active == id => self.drag = None,
                    _ => {}
                }
                GestureOutcome::Ignored
            }
            InputEvent::Wheel {
                position,
                delta,
                modifiers,
            } => wheel(surface, position, delta, modifiers),
        }
    }

    fn pointer_down(
        &mut self,
        surface: &mut AnnotationSurface,
        id: u64,
        kind: PointerKind,
        position: Point,
    ) -> GestureOutcome {
        if kind == PointerKind::Touch {
            self.touches.insert(id, position);
            if self.touches.len() == 2 {
                if let Some(Drag::Tool { .. }) = self.drag {
                    surface.cancel_gesture();
                }
                self.drag = None;
                let (mid, dist) = self.two_finger_geometry().unwrap_or((position, 0.0));
                self.pinch = Some(PinchState {
                    initial_dist: dist,
                    initial_zoom: surface.zoom(),
                    last_mid: mid,
                });
                return GestureOutcome::Ignored;
            }
            if self.touches.len() > 2 {
                return GestureOutcome::Ignored;
            }
        }
        if self.drag.is_some() {
            return GestureOutcome::Ignored;
        }

        let tools = surface.tools();
        let pans = !tools.annotation_enabled
            || (tools.active_tool == Tool::Select && !surface.hits_object(position));
        if pans {
            self.drag = Some(Drag::Pan { id, last: position });
            GestureOutcome::Ignored
        } else {
            self.drag = Some(Drag::Tool { id });
            GestureOutcome::Forwarded(surface.pointer_down(position))
        }
    }

    fn pointer_move(
        &mut self,
        surface: &mut AnnotationSurface,
        id: u64,
        kind: PointerKind,
        position: Point,
    ) -> GestureOutcome {
        if kind == PointerKind::Touch
            && let Some(tracked) = self.touches.get_mut(&id)
        {
            *tracked = position;
            if let Some(outcome) = self.update_pinch(surface) {
                return outcome;
            }
        }
        match self.drag {
            Some(Drag::Pan { id: active, last }) if active == id => {
                surface.pan_by(position - last);
                self.drag = Some(Drag::Pan {
                    id,
                    last: position,
                });
                GestureOutcome::Panned
            }
            Some(Drag::Tool { id: active }) if active == id => {
                surface.pointer_move(position);
                GestureOutcome::Forwarded(None)
            }
            _ => GestureOutcome::Ignored,
        }
    }

    fn pointer_up(
        &mut self,
        surface: &mut AnnotationSurface,
        id: u64,
        kind: PointerKind,
        position: Point,
    ) -> GestureOutcome {
        if kind == PointerKind::Touch {
            self.touches.remove(&id);
            if self.touches.len() < 2 {
                self.pinch = None;
            }
        }
        match self.drag {
            Some(Drag::Tool { id: active }) if active == id => {
                self.drag = None;
                GestureOutcome::Forwarded(surface.pointer_up(position))
            }
            Some(Drag::Pan { id: active, .. }) if active == id => {
                self.drag = None;
                GestureOutcome::Ignored
            }
            _ => GestureOutcome::Ignored,
        }
    }

    fn two_finger_geometry(&self) -> Option<(Point, f64)> {
        let mut it = self.touches.values();
        let a = *it.next()?;
        let b = *it.next()?;
        Some((a.midpoint(b), a.distance(b)))
    }

    fn update_pinch(&mut self, surface: &mut AnnotationSurface) -> Option<GestureOutcome> {
        let mut pinch = self.pinch?;
        let (mid, dist) = self.two_finger_geometry()?;

        surface.pan_by(mid - pinch.last_mid);
        pinch.last_mid = mid;
        self.pinch = Some(pinch);

        if pinch.initial_dist < MIN_PINCH_DISTANCE {
            return Some(GestureOutcome::Panned);
        }
        let target = pinch.initial_zoom * dist / pinch.initial_dist;
        let zoom = surface.zoom_at(mid, target);
        Some(GestureOutcome::Zoomed(zoom))
    }
}

fn wheel(
    surface: &mut AnnotationSurface,
    position: Point,
    delta: Vec2,
    modifiers: Modifiers,
) -> GestureOutcome {
    if modifiers.ctrl || modifiers.meta {
        if delta.y.abs() < WHEEL_NOISE_THRESHOLD {
            return GestureOutcome::Ignored;
        }
        let factor = if delta.y > 0.0 {
            WHEEL_ZOOM_OUT
        } else {
            WHEEL_ZOOM_IN
        };
        let zoom = surface.zoom_at(position, surface.zoom() * factor);
        return GestureOutcome::Zoomed(zoom);
    }
    surface.pan_by(-delta);
    GestureOutcome::Panned
}

#[cfg(test)]
#[path = "../../tests/unit/gesture/controller.rs"]
mod tests;

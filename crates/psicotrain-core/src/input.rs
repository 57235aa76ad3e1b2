//! Pointer input unification for mouse, pen and touch.
//!
//! Hosts forward raw pointer events; the tracker turns them into drawing and
//! pinch actions. One pointer draws. A second touch while drawing with a
//! touch ends the stroke and starts a pinch instead.

use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Source device of a pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PointerKind {
    Mouse,
    Pen,
    Touch,
}

/// Modifier keys state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    /// Ctrl (or Cmd on macOS) turns the wheel into a zoom gesture.
    pub fn is_zoom_intent(&self) -> bool {
        self.ctrl || self.meta
    }
}

/// Pointer event in client coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PointerEvent {
    Down {
        id: u32,
        kind: PointerKind,
        position: Point,
    },
    Move {
        id: u32,
        position: Point,
    },
    Up {
        id: u32,
        position: Point,
    },
    Cancel {
        id: u32,
    },
}

/// What a pointer event means for the viewer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerAction {
    StrokeBegin(Point),
    StrokeExtend(Point),
    StrokeEnd,
    PinchBegin(Point, Point),
    PinchMove(Point, Point),
    PinchEnd,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Mode {
    Idle,
    Drawing(u32),
    Pinching(u32, u32),
}

#[derive(Debug, Clone, Copy)]
struct ActivePointer {
    id: u32,
    kind: PointerKind,
    position: Point,
}

/// Tracks active pointers and classifies their events.
#[derive(Debug, Clone)]
pub struct PointerTracker {
    active: Vec<ActivePointer>,
    mode: Mode,
}

impl Default for PointerTracker {
    fn default() -> Self {
        Self {
            active: Vec::new(),
            mode: Mode::Idle,
        }
    }
}

impl PointerTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a stroke is in progress.
    pub fn is_drawing(&self) -> bool {
        matches!(self.mode, Mode::Drawing(_))
    }

    /// Whether a pinch is in progress.
    pub fn is_pinching(&self) -> bool {
        matches!(self.mode, Mode::Pinching(..))
    }

    fn position_of(&self, id: u32) -> Option<Point> {
        self.active.iter().find(|p| p.id == id).map(|p| p.position)
    }

    fn kind_of(&self, id: u32) -> Option<PointerKind> {
        self.active.iter().find(|p| p.id == id).map(|p| p.kind)
    }

    /// Process one event, returning the resulting actions in order.
    pub fn handle(&mut self, event: PointerEvent) -> Vec<PointerAction> {
        match event {
            PointerEvent::Down { id, kind, position } => {
                self.active.retain(|p| p.id != id);
                self.active.push(ActivePointer { id, kind, position });
                match self.mode {
                    Mode::Idle => {
                        self.mode = Mode::Drawing(id);
                        vec![PointerAction::StrokeBegin(position)]
                    }
                    Mode::Drawing(first)
                        if kind == PointerKind::Touch
                            && self.kind_of(first) == Some(PointerKind::Touch) =>
                    {
                        let first_position = self.position_of(first).unwrap_or(position);
                        self.mode = Mode::Pinching(first, id);
                        vec![
                            PointerAction::StrokeEnd,
                            PointerAction::PinchBegin(first_position, position),
                        ]
                    }
                    _ => Vec::new(),
                }
            }
            PointerEvent::Move { id, position } => {
                let Some(pointer) = self.active.iter_mut().find(|p| p.id == id) else {
                    return Vec::new();
                };
                pointer.position = position;
                match self.mode {
                    Mode::Drawing(drawing) if drawing == id => {
                        vec![PointerAction::StrokeExtend(position)]
                    }
                    Mode::Pinching(a, b) if a == id || b == id => {
                        match (self.position_of(a), self.position_of(b)) {
                            (Some(pa), Some(pb)) => vec![PointerAction::PinchMove(pa, pb)],
                            _ => Vec::new(),
                        }
                    }
                    _ => Vec::new(),
                }
            }
            PointerEvent::Up { id, .. } | PointerEvent::Cancel { id } => {
                self.active.retain(|p| p.id != id);
                match self.mode {
                    Mode::Drawing(drawing) if drawing == id => {
                        self.mode = Mode::Idle;
                        vec![PointerAction::StrokeEnd]
                    }
                    Mode::Pinching(a, b) if a == id || b == id => {
                        // The remaining finger must lift before drawing resumes
                        self.mode = Mode::Idle;
                        vec![PointerAction::PinchEnd]
                    }
                    _ => Vec::new(),
                }
            }
        }
    }
}

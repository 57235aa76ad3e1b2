//! Time-based gesture recognition: debounced wheel zoom, pinch zoom and fire-once timers.
//!
//! All timing takes an explicit `now` so the host event loop decides when
//! time advances.

use crate::zoom::quantize_zoom;
use kurbo::Point;

#[cfg(target_arch = "wasm32")]
use web_time::{Duration, Instant};
#[cfg(not(target_arch = "wasm32"))]
use std::time::{Duration, Instant};

/// Accumulated wheel delta that must be exceeded before a zoom step fires.
pub const WHEEL_ZOOM_THRESHOLD: f64 = 30.0;
/// Quiet period after the last wheel event before the gesture is evaluated.
pub const WHEEL_QUIET_PERIOD: Duration = Duration::from_millis(50);
/// Delay before re-laying out the toolbar after a layout transition.
/// Matches the CSS transition duration of the sidebar.
pub const TOOLBAR_REFLOW_DELAY: Duration = Duration::from_millis(350);

/// A timer that fires at most once per arming; re-arming pushes the deadline back.
#[derive(Debug, Clone, Copy, Default)]
pub struct FireOnce {
    deadline: Option<Instant>,
}

impl FireOnce {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm (or re-arm) the timer to fire `delay` after `now`.
    pub fn arm(&mut self, now: Instant, delay: Duration) {
        self.deadline = Some(now + delay);
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Returns true exactly once when the deadline has passed.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

/// What the host should do with a wheel event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WheelDisposition {
    /// Ordinary scroll: let the page handle it.
    Scroll,
    /// Consumed as part of a zoom gesture: suppress default scrolling.
    Captured,
}

/// Direction of a single zoom step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomDirection {
    In,
    Out,
}

/// Debounced wheel-to-zoom recognizer.
///
/// Deltas are only collected while the zoom modifier is held. Once input has
/// been quiet for [`WHEEL_QUIET_PERIOD`], a single step fires if the total
/// magnitude exceeds [`WHEEL_ZOOM_THRESHOLD`]; negative deltas (wheel up) zoom in.
#[derive(Debug, Clone, Default)]
pub struct WheelZoom {
    accumulated: f64,
    timer: FireOnce,
}

impl WheelZoom {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_wheel(&mut self, delta_y: f64, zoom_modifier: bool, now: Instant) -> WheelDisposition {
        if !zoom_modifier {
            return WheelDisposition::Scroll;
        }
        self.accumulated += delta_y;
        self.timer.arm(now, WHEEL_QUIET_PERIOD);
        WheelDisposition::Captured
    }

    /// Evaluate the gesture once it has gone quiet.
    pub fn poll(&mut self, now: Instant) -> Option<ZoomDirection> {
        if !self.timer.poll(now) {
            return None;
        }
        let total = std::mem::take(&mut self.accumulated);
        if total.abs() <= WHEEL_ZOOM_THRESHOLD {
            return None;
        }
        Some(if total < 0.0 { ZoomDirection::In } else { ZoomDirection::Out })
    }

    /// Whether a gesture is waiting for its quiet period.
    pub fn is_pending(&self) -> bool {
        self.timer.is_armed()
    }
}

/// Two-finger pinch zoom anchored at the zoom level captured when it began.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pinch {
    initial_distance: f64,
    initial_zoom: f64,
}

impl Pinch {
    /// Start a pinch. Returns `None` if both touches are at the same spot.
    pub fn begin(a: Point, b: Point, zoom: f64) -> Option<Self> {
        let initial_distance = a.distance(b);
        if initial_distance < f64::EPSILON {
            return None;
        }
        Some(Self { initial_distance, initial_zoom: zoom })
    }

    /// Zoom level for the current touch positions, clamped and quantized.
    pub fn zoom_for(&self, a: Point, b: Point) -> f64 {
        quantize_zoom(a.distance(b) / self.initial_distance * self.initial_zoom)
    }
}

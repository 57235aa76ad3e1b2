//! Zoom level and coordinate mapping between the displayed page and its pixels.

use kurbo::{Point, Rect, Size};
use serde::{Deserialize, Serialize};

/// Smallest allowed zoom level.
pub const MIN_ZOOM: f64 = 0.2;
/// Largest allowed zoom level.
pub const MAX_ZOOM: f64 = 4.0;
/// Increment applied by zoom in/out and by each wheel gesture.
pub const ZOOM_STEP: f64 = 0.1;
/// Zoom level on entering an exercise ("100%").
pub const DEFAULT_ZOOM: f64 = 1.0;

/// Clamp a zoom level to the allowed range and round it to one decimal place.
///
/// Rounding keeps repeated relative adjustments from drifting.
pub fn quantize_zoom(level: f64) -> f64 {
    (level.clamp(MIN_ZOOM, MAX_ZOOM) * 10.0).round() / 10.0
}

/// Zoom applied to the page image and its annotation layer as a display transform.
///
/// The stored pixels never change with zoom; only how large they are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Zoom {
    level: f64,
}

impl Default for Zoom {
    fn default() -> Self {
        Self { level: DEFAULT_ZOOM }
    }
}

impl Zoom {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current zoom level.
    pub fn level(&self) -> f64 {
        self.level
    }

    /// Set the zoom level, clamped and quantized. Non-finite input is ignored.
    ///
    /// Returns true if the level changed.
    pub fn set(&mut self, level: f64) -> bool {
        if !level.is_finite() {
            return false;
        }
        let level = quantize_zoom(level);
        if (level - self.level).abs() < f64::EPSILON {
            return false;
        }
        self.level = level;
        true
    }

    pub fn zoom_in(&mut self) -> bool {
        self.set(self.level + ZOOM_STEP)
    }

    pub fn zoom_out(&mut self) -> bool {
        self.set(self.level - ZOOM_STEP)
    }

    /// Back to 100%.
    pub fn reset(&mut self) {
        self.level = DEFAULT_ZOOM;
    }

    /// Percentage shown in the toolbar.
    pub fn percent(&self) -> u32 {
        (self.level * 100.0).round() as u32
    }

    /// Displayed size of content with the given natural size.
    pub fn display_size(&self, natural: Size) -> Size {
        Size::new(natural.width * self.level, natural.height * self.level)
    }
}

/// Zoom level that inscribes `content` in `container` shrunk by `margin` on each axis.
///
/// The binding axis is picked by comparing aspect ratios: content wider than the
/// available area is limited by width, otherwise by height. Returns `None` for
/// degenerate sizes. The result is not quantized; pass it through [`Zoom::set`].
pub fn compute_fit_zoom(container: Size, content: Size, margin: f64) -> Option<f64> {
    let available = Size::new(container.width - margin, container.height - margin);
    if available.width <= 0.0 || available.height <= 0.0 {
        return None;
    }
    if content.width <= 0.0 || content.height <= 0.0 {
        return None;
    }

    let content_aspect = content.width / content.height;
    let available_aspect = available.width / available.height;
    if content_aspect > available_aspect {
        Some(available.width / content.width)
    } else {
        Some(available.height / content.height)
    }
}

/// Map a pointer position in client coordinates to the surface's pixel space.
///
/// `bounds` is the surface's displayed bounding box and `surface` its backing
/// pixel size. The per-axis ratio between them undoes whatever display scale
/// is in effect, so the result does not depend on the zoom level.
pub fn map_pointer_to_content(client: Point, bounds: Rect, surface: Size) -> Point {
    let scale_x = if bounds.width() > 0.0 { surface.width / bounds.width() } else { 1.0 };
    let scale_y = if bounds.height() > 0.0 { surface.height / bounds.height() } else { 1.0 };
    Point::new((client.x - bounds.x0) * scale_x, (client.y - bounds.y0) * scale_y)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_tenth(level: f64) -> bool {
        ((level * 10.0).round() - level * 10.0).abs() < 1e-9
    }

    #[test]
    fn test_default_zoom() {
        let zoom = Zoom::new();
        assert!((zoom.level() - 1.0).abs() < f64::EPSILON);
        assert_eq!(zoom.percent(), 100);
    }

    #[test]
    fn test_set_clamps_and_quantizes() {
        let mut zoom = Zoom::new();
        for requested in [-3.0, 0.0, 0.13, 0.25, 1.04, 1.06, 2.349, 3.99, 4.2, 100.0] {
            zoom.set(requested);
            let level = zoom.level();
            assert!((MIN_ZOOM..=MAX_ZOOM).contains(&level), "{} -> {}", requested, level);
            assert!(is_tenth(level), "{} -> {}", requested, level);
        }
    }

    #[test]
    fn test_set_rejects_non_finite() {
        let mut zoom = Zoom::new();
        assert!(!zoom.set(f64::NAN));
        assert!(!zoom.set(f64::INFINITY));
        assert!((zoom.level() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_steps_do_not_drift() {
        let mut zoom = Zoom::new();
        for _ in 0..7 {
            zoom.zoom_in();
        }
        for _ in 0..7 {
            zoom.zoom_out();
        }
        assert_eq!(zoom.level(), 1.0);
    }

    #[test]
    fn test_steps_stop_at_bounds() {
        let mut zoom = Zoom::new();
        for _ in 0..100 {
            zoom.zoom_in();
        }
        assert_eq!(zoom.level(), MAX_ZOOM);
        assert!(!zoom.zoom_in());

        for _ in 0..100 {
            zoom.zoom_out();
        }
        assert_eq!(zoom.level(), MIN_ZOOM);
        assert!(!zoom.zoom_out());
    }

    #[test]
    fn test_display_size() {
        let mut zoom = Zoom::new();
        zoom.set(1.5);
        let size = zoom.display_size(Size::new(800.0, 600.0));
        assert!((size.width - 1200.0).abs() < 1e-9);
        assert!((size.height - 900.0).abs() < 1e-9);
    }

    #[test]
    fn test_fit_picks_width_for_wide_content() {
        let fit = compute_fit_zoom(Size::new(1000.0, 500.0), Size::new(2000.0, 500.0), 0.0).unwrap();
        assert!((fit - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_fit_picks_height_for_tall_content() {
        let fit = compute_fit_zoom(Size::new(1000.0, 500.0), Size::new(500.0, 2000.0), 0.0).unwrap();
        assert!((fit - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_fit_subtracts_margin() {
        let fit = compute_fit_zoom(Size::new(840.0, 1000.0), Size::new(800.0, 600.0), 40.0).unwrap();
        assert!((fit - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_fit_degenerate() {
        assert!(compute_fit_zoom(Size::new(30.0, 30.0), Size::new(10.0, 10.0), 40.0).is_none());
        assert!(compute_fit_zoom(Size::new(300.0, 300.0), Size::ZERO, 0.0).is_none());
    }

    #[test]
    fn test_pointer_mapping_corners() {
        let bounds = Rect::new(0.0, 0.0, 400.0, 300.0);
        let surface = Size::new(800.0, 600.0);

        let top_left = map_pointer_to_content(Point::new(0.0, 0.0), bounds, surface);
        assert_eq!(top_left, Point::new(0.0, 0.0));

        let bottom_right = map_pointer_to_content(Point::new(400.0, 300.0), bounds, surface);
        assert_eq!(bottom_right, Point::new(800.0, 600.0));
    }

    #[test]
    fn test_pointer_mapping_with_offset_bounds() {
        // Surface scrolled/offset inside the page and shown at 2x
        let bounds = Rect::new(50.0, 20.0, 1650.0, 1220.0);
        let surface = Size::new(800.0, 600.0);
        let point = map_pointer_to_content(Point::new(850.0, 620.0), bounds, surface);
        assert!((point.x - 400.0).abs() < 1e-9);
        assert!((point.y - 300.0).abs() < 1e-9);
    }
}

//! Per-page freehand annotation raster.
//!
//! The raster always has the natural pixel size of the page image underneath
//! it. Zoom is a display transform and never touches these pixels. Pointer
//! positions must be mapped into surface pixels before they reach here (see
//! [`crate::zoom::map_pointer_to_content`]).

use crate::brush::{BrushProfile, Tool};
use base64::{Engine, engine::general_purpose::STANDARD};
use kurbo::Point;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tiny_skia::{
    BlendMode, LineCap, LineJoin, Paint, PathBuilder, Pixmap, PixmapPaint,
    PremultipliedColorU8, Stroke, Transform,
};

/// Opacity of highlighter strokes.
pub const DEFAULT_HIGHLIGHTER_ALPHA: f32 = 0.3;

const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// Annotation surface errors.
#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("Invalid surface size {0}x{1}")]
    InvalidSize(u32, u32),
    #[error("Surface has no pixels yet")]
    Empty,
    #[error("Failed to encode snapshot: {0}")]
    Encode(String),
    #[error("Failed to decode snapshot: {0}")]
    Decode(String),
}

/// Result type for surface operations.
pub type SurfaceResult<T> = Result<T, SurfaceError>;

/// Address of one annotation layer: an exercise page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageKey {
    pub exercise: String,
    pub page: u32,
}

impl PageKey {
    pub fn new(exercise: impl Into<String>, page: u32) -> Self {
        Self {
            exercise: exercise.into(),
            page,
        }
    }
}

impl fmt::Display for PageKey {
    /// Storage form: `<exerciseName>_<page>`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.exercise, self.page)
    }
}

/// Stroke color (RGBA8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InkColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl InkColor {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn black() -> Self {
        Self::new(0, 0, 0, 255)
    }

    fn to_skia(self, alpha: f32) -> tiny_skia::Color {
        let mut color = tiny_skia::Color::from_rgba8(self.r, self.g, self.b, 255);
        color.set_alpha(alpha * f32::from(self.a) / 255.0);
        color
    }
}

impl Default for InkColor {
    fn default() -> Self {
        Self::black()
    }
}

/// Encode PNG bytes as a `data:` URL, the stored form of a snapshot.
pub fn encode_data_url(png: &[u8]) -> String {
    format!("{}{}", PNG_DATA_URL_PREFIX, STANDARD.encode(png))
}

/// Decode the bytes of a base64 `data:` URL.
pub fn decode_data_url(url: &str) -> SurfaceResult<Vec<u8>> {
    let payload = url
        .strip_prefix("data:")
        .and_then(|rest| rest.split_once(";base64,"))
        .map(|(_, payload)| payload)
        .ok_or_else(|| SurfaceError::Decode("not a base64 data URL".to_string()))?;
    STANDARD
        .decode(payload)
        .map_err(|e| SurfaceError::Decode(e.to_string()))
}

/// The freehand drawing raster bound to one page at a time.
pub struct AnnotationSurface {
    key: Option<PageKey>,
    pixmap: Option<Pixmap>,
    /// Bumped on every page load so late restores can be recognised.
    generation: u64,
    /// Last point of the stroke in progress.
    stroke_tail: Option<Point>,
    tool: Tool,
    brushes: BrushProfile,
    color: InkColor,
    highlighter_alpha: f32,
}

impl Default for AnnotationSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl AnnotationSurface {
    pub fn new() -> Self {
        Self {
            key: None,
            pixmap: None,
            generation: 0,
            stroke_tail: None,
            tool: Tool::default(),
            brushes: BrushProfile::default(),
            color: InkColor::default(),
            highlighter_alpha: DEFAULT_HIGHLIGHTER_ALPHA,
        }
    }

    pub fn with_highlighter_alpha(mut self, alpha: f32) -> Self {
        self.highlighter_alpha = alpha.clamp(0.0, 1.0);
        self
    }

    /// Page the surface currently belongs to.
    pub fn key(&self) -> Option<&PageKey> {
        self.key.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Backing pixel size, once known.
    pub fn size(&self) -> Option<(u32, u32)> {
        self.pixmap.as_ref().map(|p| (p.width(), p.height()))
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    /// Switch tools. The tool's remembered width comes along with it.
    pub fn set_tool(&mut self, tool: Tool) {
        self.tool = tool;
    }

    pub fn color(&self) -> InkColor {
        self.color
    }

    pub fn set_color(&mut self, color: InkColor) {
        self.color = color;
    }

    pub fn brushes(&self) -> &BrushProfile {
        &self.brushes
    }

    pub fn set_brushes(&mut self, brushes: BrushProfile) {
        self.brushes = brushes;
    }

    /// Width the active tool will draw with.
    pub fn active_width(&self) -> u32 {
        self.brushes.width(self.tool)
    }

    /// Set the active tool's width. Returns true if it changed.
    pub fn set_active_width(&mut self, width: u32) -> bool {
        self.brushes.set_width(self.tool, width)
    }

    /// Bind the surface to a new page.
    ///
    /// The raster is dropped at once and strokes are refused until
    /// [`resize`](Self::resize) gives it the new page image's size. The stored
    /// snapshot arrives later through [`restore`](Self::restore) with the
    /// returned generation.
    pub fn load_for_page(&mut self, key: PageKey) -> u64 {
        self.stroke_tail = None;
        self.pixmap = None;
        self.key = Some(key);
        self.generation += 1;
        self.generation
    }

    /// Forget the page binding entirely (viewer closed).
    pub fn unbind(&mut self) {
        self.clear();
        self.key = None;
        self.generation += 1;
    }

    /// Erase all pixels and drop any stroke in progress.
    pub fn clear(&mut self) {
        self.stroke_tail = None;
        if let Some(pixmap) = self.pixmap.as_mut() {
            pixmap.fill(tiny_skia::Color::TRANSPARENT);
        }
    }

    /// Whether every pixel is fully transparent.
    pub fn is_blank(&self) -> bool {
        self.pixmap
            .as_ref()
            .is_none_or(|p| p.data().iter().all(|&b| b == 0))
    }

    /// Premultiplied pixel at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<PremultipliedColorU8> {
        self.pixmap.as_ref()?.pixel(x, y)
    }

    /// Change the backing size, keeping existing content anchored top-left.
    ///
    /// Content is never rescaled; a smaller size crops it.
    pub fn resize(&mut self, width: u32, height: u32) -> SurfaceResult<()> {
        if self.size() == Some((width, height)) {
            return Ok(());
        }
        let mut resized = Pixmap::new(width, height).ok_or(SurfaceError::InvalidSize(width, height))?;
        if let Some(old) = self.pixmap.as_ref() {
            resized.draw_pixmap(
                0,
                0,
                old.as_ref(),
                &PixmapPaint::default(),
                Transform::identity(),
                None,
            );
        }
        self.pixmap = Some(resized);
        Ok(())
    }

    /// Draw a stored snapshot if `generation` is still current.
    ///
    /// Returns `Ok(false)` when the surface has moved on to another page
    /// since the restore was requested; the snapshot is then discarded.
    pub fn restore(&mut self, generation: u64, png: &[u8]) -> SurfaceResult<bool> {
        if generation != self.generation {
            return Ok(false);
        }
        let snapshot = Pixmap::decode_png(png).map_err(|e| SurfaceError::Decode(e.to_string()))?;
        if self.pixmap.is_none() {
            self.resize(snapshot.width(), snapshot.height())?;
        }
        let pixmap = self.pixmap.as_mut().ok_or(SurfaceError::Empty)?;
        pixmap.draw_pixmap(
            0,
            0,
            snapshot.as_ref(),
            &PixmapPaint::default(),
            Transform::identity(),
            None,
        );
        Ok(true)
    }

    /// Encode the full raster as PNG.
    pub fn snapshot(&self) -> SurfaceResult<Vec<u8>> {
        let pixmap = self.pixmap.as_ref().ok_or(SurfaceError::Empty)?;
        pixmap.encode_png().map_err(|e| SurfaceError::Encode(e.to_string()))
    }

    pub fn is_stroking(&self) -> bool {
        self.stroke_tail.is_some()
    }

    /// Start a stroke at `point`. Ignored (returns false) until the surface has pixels.
    pub fn begin_stroke(&mut self, point: Point) -> bool {
        if self.pixmap.is_none() || self.key.is_none() {
            return false;
        }
        self.stroke_tail = Some(point);
        true
    }

    /// Draw the segment from the previous point to `point` right away.
    pub fn extend_stroke(&mut self, point: Point) {
        let Some(tail) = self.stroke_tail else {
            return;
        };
        self.stroke_tail = Some(point);
        if tail == point {
            return;
        }

        let paint = self.paint();
        let stroke = Stroke {
            width: self.active_width() as f32,
            line_cap: LineCap::Round,
            line_join: LineJoin::Round,
            ..Stroke::default()
        };

        let mut builder = PathBuilder::new();
        builder.move_to(tail.x as f32, tail.y as f32);
        builder.line_to(point.x as f32, point.y as f32);
        let (Some(path), Some(pixmap)) = (builder.finish(), self.pixmap.as_mut()) else {
            return;
        };
        pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
    }

    /// Finish the stroke. Returns the page whose snapshot must now be persisted.
    pub fn end_stroke(&mut self) -> Option<PageKey> {
        self.stroke_tail.take()?;
        self.key.clone()
    }

    fn paint(&self) -> Paint<'static> {
        let mut paint = Paint::default();
        paint.anti_alias = true;
        match self.tool {
            Tool::Pen => paint.set_color(self.color.to_skia(1.0)),
            Tool::Highlighter => paint.set_color(self.color.to_skia(self.highlighter_alpha)),
            Tool::Eraser => paint.blend_mode = BlendMode::Clear,
        }
        paint
    }
}

//! Drawing tools and their remembered brush widths.

use serde::{Deserialize, Serialize};

/// Drawing tools available on the annotation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    #[default]
    Pen,
    Highlighter,
    Eraser,
}

impl Tool {
    pub const ALL: [Tool; 3] = [Tool::Pen, Tool::Highlighter, Tool::Eraser];

    pub fn name(self) -> &'static str {
        match self {
            Tool::Pen => "pen",
            Tool::Highlighter => "highlighter",
            Tool::Eraser => "eraser",
        }
    }

    /// Width used until the user picks another one.
    pub fn default_width(self) -> u32 {
        match self {
            Tool::Pen => 4,
            Tool::Highlighter => 12,
            Tool::Eraser => 20,
        }
    }
}

/// Stroke width remembered independently for each tool.
///
/// Serialized as `{"pen": 4, "highlighter": 12, "eraser": 20}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrushProfile {
    pen: u32,
    highlighter: u32,
    eraser: u32,
}

impl Default for BrushProfile {
    fn default() -> Self {
        Self {
            pen: Tool::Pen.default_width(),
            highlighter: Tool::Highlighter.default_width(),
            eraser: Tool::Eraser.default_width(),
        }
    }
}

impl BrushProfile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn width(&self, tool: Tool) -> u32 {
        let width = match tool {
            Tool::Pen => self.pen,
            Tool::Highlighter => self.highlighter,
            Tool::Eraser => self.eraser,
        };
        // A zero width in old stored data falls back to the default
        if width == 0 { tool.default_width() } else { width }
    }

    /// Remember a width for `tool`. Zero is rejected.
    ///
    /// Returns true if the stored width changed.
    pub fn set_width(&mut self, tool: Tool, width: u32) -> bool {
        if width == 0 {
            return false;
        }
        let slot = match tool {
            Tool::Pen => &mut self.pen,
            Tool::Highlighter => &mut self.highlighter,
            Tool::Eraser => &mut self.eraser,
        };
        if *slot == width {
            return false;
        }
        *slot = width;
        true
    }
}

//! Viewer tunables.

use crate::answers::{DEFAULT_QUESTION_COUNT, QUESTION_COUNT_STEP};
use crate::source::DEFAULT_PDF_RENDER_SCALE;
use crate::surface::{DEFAULT_HIGHLIGHTER_ALPHA, InkColor};
use serde::{Deserialize, Serialize};

/// Margin left around the page by fit-to-screen, in CSS pixels.
pub const DEFAULT_FIT_MARGIN: f64 = 40.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub fit_margin: f64,
    /// Oversampling applied when rasterizing document pages.
    pub pdf_render_scale: f64,
    pub initial_question_count: u32,
    pub question_count_step: u32,
    pub highlighter_alpha: f32,
    pub default_color: InkColor,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            fit_margin: DEFAULT_FIT_MARGIN,
            pdf_render_scale: DEFAULT_PDF_RENDER_SCALE,
            initial_question_count: DEFAULT_QUESTION_COUNT,
            question_count_step: QUESTION_COUNT_STEP,
            highlighter_alpha: DEFAULT_HIGHLIGHTER_ALPHA,
            default_color: InkColor::black(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: ViewerConfig = serde_json::from_str(r#"{"fit_margin": 16.0}"#).unwrap();
        assert_eq!(config.fit_margin, 16.0);
        assert_eq!(config.pdf_render_scale, 2.0);
        assert_eq!(config.initial_question_count, 10);
    }
}

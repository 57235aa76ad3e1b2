//! Storage keys, one per persisted slice of state.

/// `{exerciseName: {questionNumber: letter}}`
pub const PAGE_ANSWERS: &str = "psicotrain_page_answers";
/// `{exerciseName: {pageNumber: {selected, correct, wasCorrect}}}`
pub const ANSWERED: &str = "psicotrain_answered";
/// `{correct, incorrect}`
pub const STATS: &str = "psicotrain_stats";
/// `{"<exerciseName>_<page>": "data:image/png;base64,..."}`
pub const DRAWINGS: &str = "psicotrain_drawings";
/// `{pen, highlighter, eraser}`
pub const BRUSH_SIZES: &str = "psicotrain_brush_sizes";
pub const SIDEBAR_COLLAPSED: &str = "psicotrain_sidebar_collapsed";
pub const DARK_MODE: &str = "psicotrain_dark_mode";
/// `{categoryOrExerciseKey: text}`
pub const NOTES: &str = "psicotrain_notes";
/// `{width, height, left, top}`
pub const NOTES_PANEL: &str = "psicotrain_notes_panel";

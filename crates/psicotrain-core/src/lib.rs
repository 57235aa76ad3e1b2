//! PsicoTrain Core Library
//!
//! Platform-agnostic state for the PsicoTrain exercise viewer: page navigation,
//! zoom, the annotation layer, answer tracking and persistence.

pub mod answers;
pub mod brush;
pub mod catalog;
pub mod committed;
pub mod config;
pub mod gesture;
pub mod input;
pub mod prefs;
pub mod source;
pub mod stopwatch;
pub mod storage;
pub mod surface;
pub mod view;
pub mod viewer;
pub mod zoom;

pub use answers::{AnswerBook, AnswerPanel, Choice, PanelScore, QuestionState};
pub use brush::{BrushProfile, Tool};
pub use catalog::{AnswerKey, Catalog, CatalogError, CatalogSummary, ExerciseRef, PageRef};
pub use committed::{AnsweredRecord, CommitOutcome, CommittedAnswers, Stats};
pub use config::ViewerConfig;
pub use gesture::{WheelDisposition, ZoomDirection};
pub use input::{Modifiers, PointerEvent, PointerKind};
pub use prefs::{PanelGeometry, Preferences};
pub use source::{DocumentRenderer, ImageLoader, PageImage, SourceError};
pub use stopwatch::Stopwatch;
pub use storage::{Storage, StorageError};
pub use surface::{AnnotationSurface, InkColor, PageKey};
pub use view::{LogBinding, NoticeLevel, ViewBinding, ViewEvent};
pub use viewer::{LoadedPage, PageRequest, ViewerController, ViewerSession};
pub use zoom::Zoom;

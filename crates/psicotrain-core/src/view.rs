//! Change notifications from the viewer to whatever presents it.
//!
//! The state machines never touch presentation directly; they emit
//! [`ViewEvent`]s and the binding decides what to repaint.

use crate::answers::Choice;
use crate::brush::Tool;
use crate::source::PageImage;

/// Severity of a transient notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Something the presentation layer should reflect.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    /// An exercise was opened.
    ExerciseOpened { name: String, total_pages: u32, is_pdf: bool },
    /// The viewer was closed.
    ExerciseClosed,
    PageChanged { page: u32, total_pages: u32 },
    /// The image for the current page finished loading.
    PageImageReady { page: u32, image: PageImage },
    /// The current page could not be shown.
    PageImageFailed { page: u32 },
    ZoomChanged { level: f64 },
    /// A stored drawing was painted onto the current page's layer.
    AnnotationRestored { page: u32 },
    AnnotationCleared { page: u32 },
    ToolChanged { tool: Tool, width: u32 },
    /// Only this question's option row needs repainting.
    AnswerChanged { question: u32, selected: Option<Choice> },
    /// Every question row needs repainting.
    AnswersReloaded,
    QuestionCountChanged { count: u32 },
    AnswerPanelToggled { visible: bool },
    StatsChanged { correct: u32, incorrect: u32 },
    StopwatchTick { display: String },
    ToolbarReflow,
    /// Fire-and-forget toast.
    Notice { level: NoticeLevel, message: String },
}

/// Receives view events.
pub trait ViewBinding {
    fn emit(&self, event: ViewEvent);
}

/// Binding that only logs notices; for headless use.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogBinding;

impl ViewBinding for LogBinding {
    fn emit(&self, event: ViewEvent) {
        match event {
            ViewEvent::Notice { level: NoticeLevel::Error, message } => log::error!("{}", message),
            ViewEvent::Notice { level: NoticeLevel::Warning, message } => log::warn!("{}", message),
            ViewEvent::Notice { message, .. } => log::info!("{}", message),
            other => log::trace!("{:?}", other),
        }
    }
}

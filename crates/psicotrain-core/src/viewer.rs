//! The exercise viewer: ties page navigation, zoom, annotations and answers together.
//!
//! Changing page runs a fixed pipeline: the page index is updated, the image
//! source is asked for the new page, the annotation layer is rebound to the new
//! page key and the answer panel is refreshed. Image and snapshot decoding are
//! asynchronous, so navigation is split in two: [`ViewerController::go_to_page`]
//! performs the synchronous part and hands back a [`PageRequest`], and
//! [`ViewerController::apply_page`] finishes it once the loaded data arrives.
//! A request whose generation no longer matches the annotation layer is dropped.

use crate::answers::{AnswerBook, AnswerPanel, Choice, PanelScore, QuestionState};
use crate::brush::{BrushProfile, Tool};
use crate::catalog::{AnswerKey, ExerciseRef};
use crate::committed::{CommitOutcome, CommittedAnswers, Stats};
use crate::config::ViewerConfig;
use crate::gesture::{FireOnce, Pinch, TOOLBAR_REFLOW_DELAY, WheelDisposition, WheelZoom, ZoomDirection};
use crate::input::{Modifiers, PointerAction, PointerEvent, PointerTracker};
use crate::source::{DocumentRenderer, ImageLoader, PageImage, PageSource, PdfPages, SourceError, SourceResult, StaticPages};
use crate::stopwatch::Stopwatch;
use crate::storage::{self, BoxFuture, Storage, keys};
use crate::surface::{AnnotationSurface, InkColor, PageKey, SurfaceResult, decode_data_url, encode_data_url};
use crate::view::{NoticeLevel, ViewBinding, ViewEvent};
use crate::zoom::{Zoom, compute_fit_zoom, map_pointer_to_content};
use kurbo::{Point, Rect, Size};
use serde::Serialize;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::Arc;

#[cfg(target_arch = "wasm32")]
use web_time::Instant;
#[cfg(not(target_arch = "wasm32"))]
use std::time::Instant;

/// Stored drawings: page key (`"<exercise>_<page>"`) → PNG data URL.
pub type DrawingMap = BTreeMap<String, String>;

/// The exercise currently on screen.
#[derive(Debug, Clone)]
pub struct ViewerSession {
    pub exercise: Arc<ExerciseRef>,
    /// `None` for documents opened outside the catalog.
    pub category: Option<String>,
    pub current_page: u32,
    pub total_pages: u32,
}

/// The synchronous half of a page change, to be completed by [`ViewerController::apply_page`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub key: PageKey,
    /// Annotation layer generation at the time of the request.
    pub generation: u64,
    /// The page change cut a stroke short; the drawing map must be saved.
    pub save_drawings: bool,
}

/// Everything fetched for a page.
#[derive(Debug)]
pub struct LoadedPage {
    pub request: PageRequest,
    pub image: SourceResult<PageImage>,
    /// Decoded stored drawing, if the page has one.
    pub snapshot: Option<SurfaceResult<Vec<u8>>>,
}

pub struct ViewerController<S: Storage> {
    storage: Arc<S>,
    binding: Rc<dyn ViewBinding>,
    config: ViewerConfig,
    answer_key: Arc<AnswerKey>,

    session: Option<ViewerSession>,
    source: Option<PageSource>,
    page_image: Option<PageImage>,

    zoom: Zoom,
    surface: AnnotationSurface,
    drawings: DrawingMap,

    panel: AnswerPanel,
    committed: CommittedAnswers,
    stats: Stats,
    stopwatch: Stopwatch,

    pointer: PointerTracker,
    pinch: Option<Pinch>,
    wheel: WheelZoom,
    reflow: FireOnce,
}

impl<S: Storage> ViewerController<S> {
    pub fn new(storage: Arc<S>, binding: Rc<dyn ViewBinding>, config: ViewerConfig, answer_key: Arc<AnswerKey>) -> Self {
        let mut surface = AnnotationSurface::new().with_highlighter_alpha(config.highlighter_alpha);
        surface.set_color(config.default_color);
        let panel = AnswerPanel::new(config.initial_question_count, config.question_count_step);
        Self {
            storage,
            binding,
            config,
            answer_key,
            session: None,
            source: None,
            page_image: None,
            zoom: Zoom::new(),
            surface,
            drawings: DrawingMap::new(),
            panel,
            committed: CommittedAnswers::new(),
            stats: Stats::default(),
            stopwatch: Stopwatch::new(),
            pointer: PointerTracker::new(),
            pinch: None,
            wheel: WheelZoom::new(),
            reflow: FireOnce::new(),
        }
    }

    /// Load persisted state. Missing or unreadable entries fall back to defaults.
    pub async fn restore(&mut self) {
        if let Some(brushes) = self.load_or_warn::<BrushProfile>(keys::BRUSH_SIZES).await {
            self.surface.set_brushes(brushes);
        }
        if let Some(book) = self.load_or_warn::<AnswerBook>(keys::PAGE_ANSWERS).await {
            self.panel.set_book(book);
        }
        if let Some(committed) = self.load_or_warn::<CommittedAnswers>(keys::ANSWERED).await {
            self.committed = committed;
        }
        if let Some(stats) = self.load_or_warn::<Stats>(keys::STATS).await {
            self.stats = stats;
        }
        if let Some(drawings) = self.load_or_warn::<DrawingMap>(keys::DRAWINGS).await {
            self.drawings = drawings;
        }
        log::info!(
            "Restored state: {} drawings, {} correct / {} incorrect",
            self.drawings.len(),
            self.stats.correct,
            self.stats.incorrect
        );
        self.emit(ViewEvent::StatsChanged {
            correct: self.stats.correct,
            incorrect: self.stats.incorrect,
        });
    }

    async fn load_or_warn<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        match storage::load_json(self.storage.as_ref(), key).await {
            Ok(value) => value,
            Err(e) => {
                log::warn!("Ignoring stored {}: {}", key, e);
                None
            }
        }
    }

    /// Persist a value; on failure the in-memory state stays and the user is told.
    async fn persist<T: Serialize + ?Sized>(&self, key: &str, value: &T, what: &str) -> bool {
        match storage::save_json(self.storage.as_ref(), key, value).await {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Failed to save {}: {}", what, e);
                self.notice(NoticeLevel::Warning, format!("Could not save {}", what));
                false
            }
        }
    }

    fn emit(&self, event: ViewEvent) {
        self.binding.emit(event);
    }

    fn notice(&self, level: NoticeLevel, message: impl Into<String>) {
        self.emit(ViewEvent::Notice {
            level,
            message: message.into(),
        });
    }

    // --- Accessors ---

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn session(&self) -> Option<&ViewerSession> {
        self.session.as_ref()
    }

    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    /// Current 1-based page, 0 when nothing is open.
    pub fn current_page(&self) -> u32 {
        self.session.as_ref().map_or(0, |s| s.current_page)
    }

    pub fn is_pdf(&self) -> bool {
        self.source.as_ref().is_some_and(PageSource::is_pdf)
    }

    pub fn page_image(&self) -> Option<&PageImage> {
        self.page_image.as_ref()
    }

    pub fn zoom(&self) -> &Zoom {
        &self.zoom
    }

    pub fn surface(&self) -> &AnnotationSurface {
        &self.surface
    }

    pub fn drawings(&self) -> &DrawingMap {
        &self.drawings
    }

    pub fn panel(&self) -> &AnswerPanel {
        &self.panel
    }

    pub fn committed(&self) -> &CommittedAnswers {
        &self.committed
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }

    pub fn stopwatch(&self) -> &Stopwatch {
        &self.stopwatch
    }

    // --- Opening and closing ---

    /// Open a catalog exercise made of pre-rendered page images.
    pub fn open_exercise(
        &mut self,
        category: Option<&str>,
        exercise: Arc<ExerciseRef>,
        loader: Rc<dyn ImageLoader>,
    ) -> Option<PageRequest> {
        let source = PageSource::Static(StaticPages::new(exercise.clone(), loader));
        self.enter(category.map(str::to_string), exercise, source)
    }

    /// Open a document rasterized page by page.
    pub fn open_document(&mut self, name: &str, renderer: Rc<dyn DocumentRenderer>) -> Option<PageRequest> {
        let pages = PdfPages::new(renderer, self.config.pdf_render_scale);
        let exercise = Arc::new(ExerciseRef::from_document(name, pages.page_count()));
        self.enter(None, exercise, PageSource::Pdf(pages))
    }

    fn enter(&mut self, category: Option<String>, exercise: Arc<ExerciseRef>, source: PageSource) -> Option<PageRequest> {
        let total_pages = exercise.page_count();
        if total_pages == 0 {
            log::warn!("Exercise '{}' has no pages", exercise.name);
            self.notice(NoticeLevel::Error, format!("'{}' has no pages", exercise.name));
            return None;
        }
        log::info!("Opening '{}' ({} pages)", exercise.name, total_pages);

        self.pointer = PointerTracker::new();
        self.pinch = None;
        self.zoom.reset();
        self.stopwatch.reset();
        self.emit(ViewEvent::ExerciseOpened {
            name: exercise.name.clone(),
            total_pages,
            is_pdf: source.is_pdf(),
        });
        self.emit(ViewEvent::ZoomChanged { level: self.zoom.level() });
        self.emit(ViewEvent::StopwatchTick {
            display: self.stopwatch.display(),
        });

        self.source = Some(source);
        self.session = Some(ViewerSession {
            exercise,
            category,
            current_page: 1,
            total_pages,
        });

        let request = self.change_page(1);
        self.reload_panel();
        Some(request)
    }

    /// Leave the viewer. The annotation layer is detached so nothing is saved afterwards.
    ///
    /// A stroke still in progress is kept in the drawing map and written with the next save.
    pub fn close(&mut self) {
        if self.session.take().is_none() {
            return;
        }
        self.flush_interrupted_stroke();
        self.stopwatch.stop();
        self.source = None;
        self.page_image = None;
        self.pointer = PointerTracker::new();
        self.pinch = None;
        self.surface.unbind();
        self.panel.close();
        self.emit(ViewEvent::ExerciseClosed);
    }

    // --- Navigation ---

    /// Start moving to page `page`. Out-of-range pages are ignored.
    pub fn go_to_page(&mut self, page: u32) -> Option<PageRequest> {
        let session = self.session.as_mut()?;
        if page < 1 || page > session.total_pages {
            log::debug!("Ignoring navigation to page {} of {}", page, session.total_pages);
            return None;
        }
        session.current_page = page;
        Some(self.change_page(page))
    }

    pub fn next_page(&mut self) -> Option<PageRequest> {
        let page = self.current_page().checked_add(1)?;
        self.go_to_page(page)
    }

    pub fn previous_page(&mut self) -> Option<PageRequest> {
        let page = self.current_page().checked_sub(1)?;
        self.go_to_page(page)
    }

    /// Synchronous part of the page pipeline: index, source, annotation layer.
    fn change_page(&mut self, page: u32) -> PageRequest {
        let (name, total_pages) = match &self.session {
            Some(session) => (session.exercise.name.clone(), session.total_pages),
            None => (String::new(), 0),
        };
        self.emit(ViewEvent::PageChanged { page, total_pages });

        let save_drawings = self.flush_interrupted_stroke();
        self.page_image = None;
        self.pointer = PointerTracker::new();
        let key = PageKey::new(name, page);
        let generation = self.surface.load_for_page(key.clone());
        PageRequest {
            key,
            generation,
            save_drawings,
        }
    }

    fn reload_panel(&mut self) {
        let Some(session) = &self.session else {
            return;
        };
        let name = session.exercise.name.clone();
        self.panel.open(&name);
        self.emit(ViewEvent::QuestionCountChanged {
            count: self.panel.question_count(),
        });
        self.emit(ViewEvent::AnswersReloaded);
    }

    /// Fetch the image and stored drawing for a request.
    pub fn load_page(&self, request: PageRequest) -> BoxFuture<'_, LoadedPage> {
        Box::pin(async move {
            if request.save_drawings {
                self.persist(keys::DRAWINGS, &self.drawings, "drawing").await;
            }
            let page = request.key.page;
            let image = match &self.source {
                Some(source) => source.load(page).await,
                None => Err(SourceError::Missing(page)),
            };
            let snapshot = self.drawings.get(&request.key.to_string()).map(|url| decode_data_url(url));
            LoadedPage {
                request,
                image,
                snapshot,
            }
        })
    }

    /// Finish a page change. Returns false if the request was superseded.
    pub fn apply_page(&mut self, loaded: LoadedPage) -> bool {
        let LoadedPage {
            request,
            image,
            snapshot,
        } = loaded;
        if request.generation != self.surface.generation() || self.surface.key() != Some(&request.key) {
            log::debug!("Discarding stale load for {}", request.key);
            return false;
        }
        let page = request.key.page;

        match image {
            Ok(image) => {
                if let Err(e) = self.surface.resize(image.width, image.height) {
                    log::error!("Cannot size annotation layer for {}: {}", request.key, e);
                }
                self.page_image = Some(image.clone());
                self.emit(ViewEvent::PageImageReady { page, image });
            }
            Err(e) => {
                // The page stays empty; its layer has no pixels, so nothing can be drawn on it
                log::error!("Failed to load page {}: {}", request.key, e);
                self.emit(ViewEvent::PageImageFailed { page });
                self.notice(NoticeLevel::Error, format!("Could not load page {}", page));
                return true;
            }
        }

        if let Some(snapshot) = snapshot {
            match snapshot.and_then(|png| self.surface.restore(request.generation, &png)) {
                Ok(true) => self.emit(ViewEvent::AnnotationRestored { page }),
                Ok(false) => {}
                Err(e) => log::warn!("Dropping unreadable drawing for {}: {}", request.key, e),
            }
        }
        true
    }

    /// Warm the page cache around the current page.
    pub fn prefetch_adjacent(&self) -> BoxFuture<'_, ()> {
        match (&self.source, &self.session) {
            (Some(source), Some(session)) => source.prefetch_adjacent(session.current_page),
            _ => Box::pin(async {}),
        }
    }

    /// Load and apply a request, then prefetch the neighbours.
    pub async fn show(&mut self, request: PageRequest) -> bool {
        let loaded = self.load_page(request).await;
        let applied = self.apply_page(loaded);
        if applied {
            self.prefetch_adjacent().await;
        }
        applied
    }

    /// Go to `page` and wait for it to be shown.
    pub async fn navigate(&mut self, page: u32) -> bool {
        match self.go_to_page(page) {
            Some(request) => self.show(request).await,
            None => false,
        }
    }

    // --- Zoom ---

    fn apply_zoom(&mut self, changed: bool) -> bool {
        if changed {
            self.emit(ViewEvent::ZoomChanged { level: self.zoom.level() });
        }
        changed
    }

    pub fn zoom_in(&mut self) -> bool {
        let changed = self.zoom.zoom_in();
        self.apply_zoom(changed)
    }

    pub fn zoom_out(&mut self) -> bool {
        let changed = self.zoom.zoom_out();
        self.apply_zoom(changed)
    }

    pub fn set_zoom(&mut self, level: f64) -> bool {
        let changed = self.zoom.set(level);
        self.apply_zoom(changed)
    }

    /// Fit the current page inside `container`. No-op until the image is known.
    pub fn fit_to_container(&mut self, container: Size) -> bool {
        let Some(image) = &self.page_image else {
            return false;
        };
        match compute_fit_zoom(container, image.natural_size(), self.config.fit_margin) {
            Some(level) => self.set_zoom(level),
            None => false,
        }
    }

    /// Feed a wheel event. The caller must suppress native scrolling when `Captured` is returned.
    pub fn on_wheel(&mut self, delta_y: f64, modifiers: Modifiers, now: Instant) -> WheelDisposition {
        self.wheel.on_wheel(delta_y, modifiers.is_zoom_intent(), now)
    }

    /// A sidebar or panel started a layout transition.
    pub fn on_layout_transition(&mut self, now: Instant) {
        self.reflow.arm(now, TOOLBAR_REFLOW_DELAY);
    }

    /// Fire any timers that are due.
    pub fn poll_timers(&mut self, now: Instant) {
        match self.wheel.poll(now) {
            Some(ZoomDirection::In) => {
                self.zoom_in();
            }
            Some(ZoomDirection::Out) => {
                self.zoom_out();
            }
            None => {}
        }
        if self.reflow.poll(now) {
            self.emit(ViewEvent::ToolbarReflow);
        }
    }

    // --- Drawing ---

    pub fn select_tool(&mut self, tool: Tool) {
        self.surface.set_tool(tool);
        self.emit(ViewEvent::ToolChanged {
            tool,
            width: self.surface.active_width(),
        });
    }

    /// Set the active tool's width and persist all widths.
    pub async fn set_brush_width(&mut self, width: u32) -> bool {
        if !self.surface.set_active_width(width) {
            return false;
        }
        self.emit(ViewEvent::ToolChanged {
            tool: self.surface.tool(),
            width,
        });
        self.persist(keys::BRUSH_SIZES, self.surface.brushes(), "brush sizes").await;
        true
    }

    pub fn set_color(&mut self, color: InkColor) {
        self.surface.set_color(color);
    }

    /// Convert a client-space position to annotation pixels.
    fn to_content(&self, client: Point, bounds: Rect) -> Point {
        match self.surface.size() {
            Some((width, height)) => {
                map_pointer_to_content(client, bounds, Size::new(f64::from(width), f64::from(height)))
            }
            None => client,
        }
    }

    /// Route a pointer event. `bounds` is the annotation layer's on-screen rectangle.
    pub async fn handle_pointer(&mut self, event: PointerEvent, bounds: Rect) {
        for action in self.pointer.handle(event) {
            match action {
                PointerAction::StrokeBegin(position) => {
                    let point = self.to_content(position, bounds);
                    self.begin_stroke(point);
                }
                PointerAction::StrokeExtend(position) => {
                    let point = self.to_content(position, bounds);
                    self.extend_stroke(point);
                }
                PointerAction::StrokeEnd => self.end_stroke().await,
                PointerAction::PinchBegin(a, b) => {
                    self.pinch = Pinch::begin(a, b, self.zoom.level());
                }
                PointerAction::PinchMove(a, b) => {
                    if let Some(pinch) = self.pinch {
                        self.set_zoom(pinch.zoom_for(a, b));
                    }
                }
                PointerAction::PinchEnd => self.pinch = None,
            }
        }
    }

    /// Begin a stroke at a point in annotation pixels.
    pub fn begin_stroke(&mut self, point: Point) -> bool {
        self.surface.begin_stroke(point)
    }

    pub fn extend_stroke(&mut self, point: Point) {
        self.surface.extend_stroke(point);
    }

    /// Finish the stroke and save a snapshot of the page it was drawn on.
    pub async fn end_stroke(&mut self) {
        if let Some(key) = self.surface.end_stroke() {
            self.save_snapshot(key).await;
        }
    }

    async fn save_snapshot(&mut self, key: PageKey) {
        if self.record_snapshot(&key) {
            self.persist(keys::DRAWINGS, &self.drawings, "drawing").await;
        }
    }

    /// Put the layer's current raster into the drawing map under `key`.
    fn record_snapshot(&mut self, key: &PageKey) -> bool {
        match self.surface.snapshot() {
            Ok(png) => {
                self.drawings.insert(key.to_string(), encode_data_url(&png));
                true
            }
            Err(e) => {
                log::error!("Failed to snapshot {}: {}", key, e);
                false
            }
        }
    }

    /// End a stroke that is still open before the layer is rebound.
    /// Returns true if the drawing map changed.
    fn flush_interrupted_stroke(&mut self) -> bool {
        if !self.surface.is_stroking() {
            return false;
        }
        match self.surface.end_stroke() {
            Some(key) => {
                log::debug!("Saving stroke interrupted on {}", key);
                self.record_snapshot(&key)
            }
            None => false,
        }
    }

    /// Wipe the current page's drawing.
    pub async fn clear_annotations(&mut self) -> bool {
        let Some(key) = self.surface.key().cloned() else {
            return false;
        };
        self.surface.clear();
        self.emit(ViewEvent::AnnotationCleared { page: key.page });
        if self.drawings.remove(&key.to_string()).is_some() {
            self.persist(keys::DRAWINGS, &self.drawings, "drawing").await;
        }
        true
    }

    // --- Answer panel ---

    /// Toggle an option for the current exercise and persist.
    pub async fn select_answer(&mut self, question: u32, choice: Choice) -> Option<QuestionState> {
        let state = self.panel.select(question, choice)?;
        self.emit(ViewEvent::AnswerChanged {
            question,
            selected: state.choice(),
        });
        self.persist(keys::PAGE_ANSWERS, self.panel.book(), "answers").await;
        Some(state)
    }

    pub fn grow_question_count(&mut self) -> u32 {
        let count = self.panel.grow_question_count();
        self.emit(ViewEvent::QuestionCountChanged { count });
        count
    }

    /// Clear every answer of the open exercise.
    pub async fn clear_answers(&mut self) -> bool {
        let Some(name) = self.session.as_ref().map(|s| s.exercise.name.clone()) else {
            return false;
        };
        if !self.panel.clear_all(&name) {
            return false;
        }
        self.emit(ViewEvent::AnswersReloaded);
        self.persist(keys::PAGE_ANSWERS, self.panel.book(), "answers").await;
        true
    }

    pub fn toggle_answer_panel(&mut self) -> bool {
        let visible = self.panel.toggle_visible();
        self.emit(ViewEvent::AnswerPanelToggled { visible });
        visible
    }

    /// Score the open exercise's panel against the answer key.
    pub fn panel_score(&self) -> PanelScore {
        let category = self.session.as_ref().and_then(|s| s.category.as_deref());
        self.panel.score(category, &self.answer_key)
    }

    // --- Committed answers and stats ---

    /// Commit a single answer for the current page.
    pub async fn commit_page_answer(&mut self, selected: Choice) -> Option<CommitOutcome> {
        let session = self.session.as_ref()?;
        let outcome = self.committed.commit(
            &self.answer_key,
            session.category.as_deref(),
            &session.exercise.name,
            session.current_page,
            selected,
        );

        match outcome {
            CommitOutcome::AlreadyAnswered(_) => {
                self.notice(NoticeLevel::Info, "This page was already answered");
            }
            CommitOutcome::Recorded(record) => {
                match record.correct {
                    Some(expected) if record.was_correct == Some(true) => {
                        self.notice(NoticeLevel::Success, format!("Correct: {}", expected));
                    }
                    Some(expected) => {
                        self.notice(NoticeLevel::Error, format!("Incorrect, the answer is {}", expected));
                    }
                    None => self.notice(NoticeLevel::Info, "No answer key for this page"),
                }
                self.persist(keys::ANSWERED, &self.committed, "answer").await;
                if self.stats.record(record.was_correct) {
                    self.emit(ViewEvent::StatsChanged {
                        correct: self.stats.correct,
                        incorrect: self.stats.incorrect,
                    });
                    self.persist(keys::STATS, &self.stats, "stats").await;
                }
            }
        }
        Some(outcome)
    }

    /// Zero the stats if `confirm` agrees.
    pub async fn reset_stats(&mut self, confirm: impl FnOnce() -> bool) -> bool {
        if !self.stats.reset(confirm) {
            return false;
        }
        self.emit(ViewEvent::StatsChanged {
            correct: 0,
            incorrect: 0,
        });
        self.persist(keys::STATS, &self.stats, "stats").await;
        true
    }

    // --- Stopwatch ---

    /// Advance the stopwatch by one second.
    pub fn tick(&mut self) {
        if self.stopwatch.tick() {
            self.emit(ViewEvent::StopwatchTick {
                display: self.stopwatch.display(),
            });
        }
    }

    pub fn reset_stopwatch(&mut self) {
        self.stopwatch.reset();
        self.emit(ViewEvent::StopwatchTick {
            display: self.stopwatch.display(),
        });
    }
}

//! Application boot and the top-level session.

use crate::config::AppConfig;
use psicotrain_core::source::ImageLoader;
use psicotrain_core::storage::Storage;
use psicotrain_core::{AnswerKey, Catalog, Preferences, ViewBinding, ViewerController};
use std::rc::Rc;
use std::sync::Arc;

#[cfg(not(target_arch = "wasm32"))]
use psicotrain_core::LogBinding;
#[cfg(not(target_arch = "wasm32"))]
use psicotrain_core::storage::{FileStorage, StorageResult};

/// A booted application: catalog, viewer and preferences over one storage backend.
pub struct App<S: Storage> {
    config: AppConfig,
    catalog: Catalog,
    loader: Rc<dyn ImageLoader>,
    viewer: ViewerController<S>,
    prefs: Preferences<S>,
}

impl<S: Storage> App<S> {
    /// Build the app and restore persisted state.
    ///
    /// `catalog_json` and `answer_key_json` are `None` when they could not be
    /// read; like unparseable documents, they degrade to empty ones.
    pub async fn boot(
        config: AppConfig,
        storage: Arc<S>,
        catalog_json: Option<&str>,
        answer_key_json: Option<&str>,
        loader: Rc<dyn ImageLoader>,
        binding: Rc<dyn ViewBinding>,
    ) -> Self {
        let catalog = catalog_json.map(Catalog::from_json_or_empty).unwrap_or_default();
        let answer_key = answer_key_json.map(AnswerKey::from_json_or_empty).unwrap_or_default();
        if answer_key.is_empty() {
            log::warn!("No answer key loaded; answers will not be scored");
        }

        let mut viewer = ViewerController::new(storage.clone(), binding, config.viewer.clone(), Arc::new(answer_key));
        viewer.restore().await;
        let mut prefs = Preferences::new(storage);
        prefs.restore().await;

        let summary = catalog.summary();
        log::info!(
            "{}: {} categories, {} exercises, {} pages",
            config.title,
            summary.categories,
            summary.exercises,
            summary.pages
        );

        Self {
            config,
            catalog,
            loader,
            viewer,
            prefs,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn viewer(&self) -> &ViewerController<S> {
        &self.viewer
    }

    pub fn viewer_mut(&mut self) -> &mut ViewerController<S> {
        &mut self.viewer
    }

    pub fn prefs(&self) -> &Preferences<S> {
        &self.prefs
    }

    pub fn prefs_mut(&mut self) -> &mut Preferences<S> {
        &mut self.prefs
    }

    /// Open a catalog exercise and show its first page.
    pub async fn open(&mut self, category: &str, name: &str) -> bool {
        let Some(exercise) = self.catalog.exercise(category, name) else {
            log::warn!("No exercise '{}' in '{}'", name, category);
            return false;
        };
        match self.viewer.open_exercise(Some(category), exercise, self.loader.clone()) {
            Some(request) => self.viewer.show(request).await,
            None => false,
        }
    }

    /// Log the catalog contents and overall progress.
    pub fn log_overview(&self) {
        for category in self.catalog.categories() {
            log::info!("  {} ({} exercises)", category, self.catalog.exercises(category).len());
        }
        let stats = self.viewer.stats();
        match stats.accuracy() {
            Some(accuracy) => log::info!(
                "Progress: {} correct, {} incorrect ({:.0}%)",
                stats.correct,
                stats.incorrect,
                accuracy * 100.0
            ),
            None => log::info!("Progress: nothing answered yet"),
        }
    }
}

/// Holder for the running app in hosts that lend it out across awaits.
///
/// Timer ticks that arrive while the app is lent out are counted and
/// replayed when it is put back.
pub struct AppSlot<S: Storage> {
    app: Option<App<S>>,
    missed_ticks: u32,
}

impl<S: Storage> AppSlot<S> {
    pub const fn new() -> Self {
        Self {
            app: None,
            missed_ticks: 0,
        }
    }

    /// Store the app, catching it up on ticks missed while it was out.
    pub fn put(&mut self, mut app: App<S>) {
        if self.missed_ticks > 0 {
            log::debug!("Replaying {} missed ticks", self.missed_ticks);
        }
        for _ in 0..std::mem::take(&mut self.missed_ticks) {
            app.viewer_mut().tick();
        }
        self.app = Some(app);
    }

    pub fn take(&mut self) -> Option<App<S>> {
        self.app.take()
    }

    /// True while the app is lent out.
    pub fn is_busy(&self) -> bool {
        self.app.is_none()
    }

    pub fn tick(&mut self) {
        match self.app.as_mut() {
            Some(app) => app.viewer_mut().tick(),
            None => self.missed_ticks = self.missed_ticks.saturating_add(1),
        }
    }
}

impl<S: Storage> Default for AppSlot<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl App<FileStorage> {
    /// Boot from local files and report what was found.
    pub async fn run(config: AppConfig) -> StorageResult<()> {
        let storage = match &config.storage_dir {
            Some(dir) => FileStorage::new(dir.clone())?,
            None => FileStorage::default_location()?,
        };
        log::info!("State directory: {}", storage.base_path().display());

        let catalog = read_optional(&config.catalog_path);
        let answer_key = read_optional(&config.answer_key_path);
        let loader = Rc::new(crate::fs_loader::FsImageLoader::new(&config.content_root));

        let app = App::boot(
            config,
            Arc::new(storage),
            catalog.as_deref(),
            answer_key.as_deref(),
            loader,
            Rc::new(LogBinding),
        )
        .await;
        app.log_overview();
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn read_optional(path: &str) -> Option<String> {
    match std::fs::read_to_string(path) {
        Ok(text) => Some(text),
        Err(e) => {
            log::warn!("Failed to read {}: {}", path, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use psicotrain_core::source::{PageImage, SourceResult};
    use psicotrain_core::storage::{BoxFuture, MemoryStorage};
    use psicotrain_core::{Choice, LogBinding, QuestionState};

    struct Blank;

    impl ImageLoader for Blank {
        fn load(&self, _path: &str) -> BoxFuture<'_, SourceResult<PageImage>> {
            Box::pin(async { Ok(PageImage::new(80, 60, Vec::new())) })
        }
    }

    const CATALOG: &str = r#"{
        "Abstract": [
            {"name": "Matrices 1", "total_pages": 2, "pages": [{"path": "m1/1.png"}, {"path": "m1/2.png"}]}
        ]
    }"#;

    fn boot(storage: Arc<MemoryStorage>, catalog: Option<&str>) -> App<MemoryStorage> {
        pollster::block_on(App::boot(
            AppConfig::default(),
            storage,
            catalog,
            Some(r#"{"Abstract": {"Matrices 1": {"1": "E"}}}"#),
            Rc::new(Blank),
            Rc::new(LogBinding),
        ))
    }

    #[test]
    fn test_open_exercise_from_catalog() {
        let mut app = boot(Arc::new(MemoryStorage::new()), Some(CATALOG));
        assert!(!pollster::block_on(app.open("Abstract", "Matrices 9")));
        assert!(pollster::block_on(app.open("Abstract", "Matrices 1")));
        assert_eq!(app.viewer().current_page(), 1);
        assert_eq!(app.viewer().surface().size(), Some((80, 60)));
    }

    #[test]
    fn test_broken_catalog_boots_empty() {
        let mut app = boot(Arc::new(MemoryStorage::new()), Some("[1, 2"));
        assert!(app.catalog().is_empty());
        assert!(!pollster::block_on(app.open("Abstract", "Matrices 1")));

        let app = boot(Arc::new(MemoryStorage::new()), None);
        assert!(app.catalog().is_empty());
    }

    #[test]
    fn test_state_restored_on_boot() {
        let storage = Arc::new(MemoryStorage::new());
        {
            let mut app = boot(storage.clone(), Some(CATALOG));
            pollster::block_on(app.open("Abstract", "Matrices 1"));
            pollster::block_on(app.viewer_mut().select_answer(3, Choice::D));
            pollster::block_on(app.prefs_mut().set_dark_mode(true)).unwrap();
        }

        let mut app = boot(storage, Some(CATALOG));
        assert!(app.prefs().dark_mode());
        pollster::block_on(app.open("Abstract", "Matrices 1"));
        assert_eq!(app.viewer().panel().state(3), QuestionState::Selected(Choice::D));
    }

    #[test]
    fn test_slot_replays_ticks_missed_while_busy() {
        let mut app = boot(Arc::new(MemoryStorage::new()), Some(CATALOG));
        assert!(pollster::block_on(app.open("Abstract", "Matrices 1")));

        let mut slot = AppSlot::new();
        slot.put(app);
        slot.tick();

        let app = slot.take().unwrap();
        assert!(slot.is_busy());
        slot.tick();
        slot.tick();
        slot.tick();
        slot.put(app);
        assert!(!slot.is_busy());

        let app = slot.take().unwrap();
        assert_eq!(app.viewer().stopwatch().elapsed_secs(), 4);
    }
}

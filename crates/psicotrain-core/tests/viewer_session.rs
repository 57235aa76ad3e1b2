//! End-to-end viewer sessions over file-backed storage.

use kurbo::Point;
use psicotrain_core::catalog::Catalog;
use psicotrain_core::storage::{self, BoxFuture, FileStorage, keys};
use psicotrain_core::{
    AnswerKey, BrushProfile, Choice, CommitOutcome, ImageLoader, LogBinding, PageImage, QuestionState, SourceError,
    Tool, ViewerConfig, ViewerController,
};
use pollster::block_on;
use std::rc::Rc;
use std::sync::Arc;

/// Produces a blank 300x200 image for any path except the broken ones.
struct Pages;

impl ImageLoader for Pages {
    fn load(&self, path: &str) -> BoxFuture<'_, Result<PageImage, SourceError>> {
        let path = path.to_string();
        Box::pin(async move {
            if path.contains("missing") {
                return Err(SourceError::Decode(path, "not found".to_string()));
            }
            Ok(PageImage::new(300, 200, Vec::new()))
        })
    }
}

const CATALOG: &str = r#"{
    "Numerical": [
        {
            "name": "Sequences A",
            "total_pages": 3,
            "pages": [
                {"number": 1, "path": "images/seq_a/1.png"},
                {"number": 2, "path": "images/seq_a/2.png"},
                {"number": 3, "path": "images/seq_a/missing.png"}
            ]
        }
    ]
}"#;

const ANSWER_KEY: &str = r#"{"Numerical": {"Sequences A": {"1": "c", "2": "A"}}}"#;

fn controller(storage: Arc<FileStorage>) -> ViewerController<FileStorage> {
    let key = Arc::new(AnswerKey::from_json(ANSWER_KEY).unwrap());
    let mut viewer = ViewerController::new(storage, Rc::new(LogBinding), ViewerConfig::default(), key);
    block_on(viewer.restore());
    viewer
}

fn open(viewer: &mut ViewerController<FileStorage>) {
    let catalog = Catalog::from_json(CATALOG).unwrap();
    let exercise = catalog.exercise("Numerical", "Sequences A").unwrap();
    let request = viewer
        .open_exercise(Some("Numerical"), exercise, Rc::new(Pages))
        .unwrap();
    assert!(block_on(viewer.show(request)));
}

#[test]
fn test_session_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(FileStorage::new(dir.path().to_path_buf()).unwrap());

    {
        let mut viewer = controller(storage.clone());
        open(&mut viewer);

        block_on(viewer.set_brush_width(7));
        viewer.select_tool(Tool::Highlighter);
        block_on(viewer.set_brush_width(15));
        viewer.select_tool(Tool::Eraser);
        block_on(viewer.set_brush_width(25));
        viewer.select_tool(Tool::Pen);

        assert!(block_on(viewer.navigate(2)));
        assert!(viewer.begin_stroke(Point::new(20.0, 20.0)));
        viewer.extend_stroke(Point::new(120.0, 80.0));
        block_on(viewer.end_stroke());

        block_on(viewer.select_answer(1, Choice::C));
        block_on(viewer.select_answer(2, Choice::B));
        assert!(matches!(
            block_on(viewer.commit_page_answer(Choice::A)),
            Some(CommitOutcome::Recorded(_))
        ));
        viewer.close();
    }

    let stored: BrushProfile = block_on(storage::load_json(storage.as_ref(), keys::BRUSH_SIZES))
        .unwrap()
        .unwrap();
    assert_eq!(stored.width(Tool::Pen), 7);
    assert_eq!(stored.width(Tool::Highlighter), 15);
    assert_eq!(stored.width(Tool::Eraser), 25);

    let mut viewer = controller(storage);
    assert_eq!(viewer.surface().brushes().width(Tool::Eraser), 25);
    assert_eq!(viewer.stats().correct, 1);
    open(&mut viewer);

    // Page 1 never had a drawing.
    assert!(viewer.surface().is_blank());
    assert!(block_on(viewer.navigate(2)));
    assert!(!viewer.surface().is_blank());

    assert_eq!(viewer.panel().state(1), QuestionState::Selected(Choice::C));
    let score = viewer.panel_score();
    assert_eq!((score.correct, score.incorrect), (1, 1));

    // A page is only ever committed once.
    assert!(matches!(
        block_on(viewer.commit_page_answer(Choice::B)),
        Some(CommitOutcome::AlreadyAnswered(record)) if record.selected == Choice::A
    ));
    assert_eq!(viewer.stats().total(), 1);
}

#[test]
fn test_broken_page_and_bounds() {
    let dir = tempfile::tempdir().unwrap();
    let mut viewer = controller(Arc::new(FileStorage::new(dir.path().to_path_buf()).unwrap()));
    open(&mut viewer);

    assert!(!block_on(viewer.navigate(4)));
    assert_eq!(viewer.current_page(), 1);

    assert!(block_on(viewer.navigate(3)));
    assert!(viewer.page_image().is_none());
    assert!(block_on(viewer.navigate(1)));
    assert_eq!(viewer.page_image().map(|i| (i.width, i.height)), Some((300, 200)));
}

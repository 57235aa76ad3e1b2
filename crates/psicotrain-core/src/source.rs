//! Where page images come from.
//!
//! Exercises are either a list of pre-rendered images ([`StaticPages`]) or a
//! document rasterized on demand ([`PdfPages`]). Decoding is delegated to
//! host-provided [`ImageLoader`] and [`DocumentRenderer`] capabilities.

use crate::catalog::ExerciseRef;
use crate::storage::BoxFuture;
use kurbo::Size;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;
use thiserror::Error;

/// Oversampling factor used when rasterizing document pages.
pub const DEFAULT_PDF_RENDER_SCALE: f64 = 2.0;

/// Page source errors.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Page {0} does not exist")]
    Missing(u32),
    #[error("Failed to decode {0}: {1}")]
    Decode(String, String),
    #[error("Failed to render page {0}: {1}")]
    Render(u32, String),
}

/// Result type for page source operations.
pub type SourceResult<T> = Result<T, SourceError>;

/// A decoded page image ready for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageImage {
    /// Natural width in pixels.
    pub width: u32,
    /// Natural height in pixels.
    pub height: u32,
    /// Encoded image bytes, handed to the view as-is.
    pub data: Arc<[u8]>,
}

impl PageImage {
    pub fn new(width: u32, height: u32, data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            width,
            height,
            data: data.into(),
        }
    }

    pub fn natural_size(&self) -> Size {
        Size::new(f64::from(self.width), f64::from(self.height))
    }
}

/// Loads a pre-rendered page image by path.
pub trait ImageLoader {
    fn load(&self, path: &str) -> BoxFuture<'_, SourceResult<PageImage>>;
}

/// Opaque document rasterizer (a PDF engine on the host side).
pub trait DocumentRenderer {
    fn page_count(&self) -> u32;

    /// Rasterize a 1-based page at `scale` times its nominal size.
    fn render_page(&self, page: u32, scale: f64) -> BoxFuture<'_, SourceResult<PageImage>>;
}

/// Pages backed by image files listed in the catalog.
pub struct StaticPages {
    exercise: Arc<ExerciseRef>,
    loader: Rc<dyn ImageLoader>,
}

impl StaticPages {
    pub fn new(exercise: Arc<ExerciseRef>, loader: Rc<dyn ImageLoader>) -> Self {
        Self { exercise, loader }
    }

    fn load(&self, page: u32) -> BoxFuture<'_, SourceResult<PageImage>> {
        let path = self.exercise.page_path(page).map(str::to_string);
        Box::pin(async move {
            let path = path.ok_or(SourceError::Missing(page))?;
            self.loader.load(&path).await
        })
    }
}

/// Pages rasterized from a document, cached for the document's lifetime.
pub struct PdfPages {
    renderer: Rc<dyn DocumentRenderer>,
    scale: f64,
    cache: RefCell<HashMap<u32, PageImage>>,
}

impl PdfPages {
    pub fn new(renderer: Rc<dyn DocumentRenderer>, scale: f64) -> Self {
        Self {
            renderer,
            scale,
            cache: RefCell::new(HashMap::new()),
        }
    }

    pub fn page_count(&self) -> u32 {
        self.renderer.page_count()
    }

    pub fn is_cached(&self, page: u32) -> bool {
        self.cache.borrow().contains_key(&page)
    }

    fn load(&self, page: u32) -> BoxFuture<'_, SourceResult<PageImage>> {
        Box::pin(async move {
            if page == 0 || page > self.page_count() {
                return Err(SourceError::Missing(page));
            }
            let cached = self.cache.borrow().get(&page).cloned();
            if let Some(image) = cached {
                return Ok(image);
            }
            let image = self.renderer.render_page(page, self.scale).await?;
            self.cache.borrow_mut().insert(page, image.clone());
            log::debug!("Rendered page {} ({}x{})", page, image.width, image.height);
            Ok(image)
        })
    }

    /// Render the pages either side of `page` into the cache.
    fn prefetch_adjacent(&self, page: u32) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            for neighbour in [page.saturating_sub(1), page + 1] {
                if neighbour == 0 || neighbour > self.page_count() || self.is_cached(neighbour) {
                    continue;
                }
                if let Err(e) = self.load(neighbour).await {
                    log::warn!("Prefetch of page {} failed: {}", neighbour, e);
                }
            }
        })
    }
}

/// The image source of the open exercise.
pub enum PageSource {
    Static(StaticPages),
    Pdf(PdfPages),
}

impl PageSource {
    pub fn is_pdf(&self) -> bool {
        matches!(self, PageSource::Pdf(_))
    }

    /// Load the image for a 1-based page.
    pub fn load(&self, page: u32) -> BoxFuture<'_, SourceResult<PageImage>> {
        match self {
            PageSource::Static(pages) => pages.load(page),
            PageSource::Pdf(pages) => pages.load(page),
        }
    }

    /// Warm the cache around `page`. Static pages have nothing to warm.
    pub fn prefetch_adjacent(&self, page: u32) -> BoxFuture<'_, ()> {
        match self {
            PageSource::Static(_) => Box::pin(async {}),
            PageSource::Pdf(pages) => pages.prefetch_adjacent(page),
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::cell::Cell;

    /// Loader that fabricates images and records requested paths.
    #[derive(Default)]
    pub struct FakeLoader {
        pub requests: RefCell<Vec<String>>,
        pub fail: RefCell<Vec<String>>,
        pub size: Cell<(u32, u32)>,
    }

    impl FakeLoader {
        pub fn with_size(width: u32, height: u32) -> Self {
            let loader = Self::default();
            loader.size.set((width, height));
            loader
        }
    }

    impl ImageLoader for FakeLoader {
        fn load(&self, path: &str) -> BoxFuture<'_, SourceResult<PageImage>> {
            let path = path.to_string();
            Box::pin(async move {
                self.requests.borrow_mut().push(path.clone());
                if self.fail.borrow().contains(&path) {
                    return Err(SourceError::Decode(path, "broken image".to_string()));
                }
                let (width, height) = self.size.get();
                Ok(PageImage::new(width, height, path.into_bytes()))
            })
        }
    }

    /// Renderer that counts renders per page.
    pub struct FakeRenderer {
        pub pages: u32,
        pub renders: RefCell<Vec<(u32, f64)>>,
    }

    impl FakeRenderer {
        pub fn new(pages: u32) -> Self {
            Self {
                pages,
                renders: RefCell::new(Vec::new()),
            }
        }

        pub fn render_count(&self, page: u32) -> usize {
            self.renders.borrow().iter().filter(|(p, _)| *p == page).count()
        }
    }

    impl DocumentRenderer for FakeRenderer {
        fn page_count(&self) -> u32 {
            self.pages
        }

        fn render_page(&self, page: u32, scale: f64) -> BoxFuture<'_, SourceResult<PageImage>> {
            Box::pin(async move {
                self.renders.borrow_mut().push((page, scale));
                let side = (100.0 * scale) as u32;
                Ok(PageImage::new(side, side, vec![page as u8]))
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{FakeLoader, FakeRenderer};
    use super::*;
    use crate::catalog::PageRef;
    use crate::storage::block_on;

    fn exercise() -> Arc<ExerciseRef> {
        Arc::new(ExerciseRef {
            name: "Series 1".to_string(),
            total_pages: 2,
            pages: vec![
                PageRef { path: "p1.jpg".to_string(), number: Some(1) },
                PageRef { path: "p2.jpg".to_string(), number: Some(2) },
            ],
            category: None,
        })
    }

    #[test]
    fn test_static_pages_load_by_path() {
        let loader = Rc::new(FakeLoader::with_size(800, 600));
        let source = PageSource::Static(StaticPages::new(exercise(), loader.clone()));

        let image = block_on(source.load(2)).unwrap();
        assert_eq!((image.width, image.height), (800, 600));
        assert_eq!(loader.requests.borrow().as_slice(), ["p2.jpg".to_string()]);
        assert!(matches!(block_on(source.load(3)), Err(SourceError::Missing(3))));
        assert!(!source.is_pdf());
    }

    #[test]
    fn test_pdf_pages_cached() {
        let renderer = Rc::new(FakeRenderer::new(5));
        let source = PageSource::Pdf(PdfPages::new(renderer.clone(), 2.0));

        let first = block_on(source.load(3)).unwrap();
        let again = block_on(source.load(3)).unwrap();
        assert_eq!(first, again);
        assert_eq!(renderer.render_count(3), 1);
        assert_eq!(renderer.renders.borrow()[0], (3, 2.0));
        assert_eq!(first.width, 200);
    }

    #[test]
    fn test_pdf_pages_out_of_range() {
        let source = PdfPages::new(Rc::new(FakeRenderer::new(2)), 2.0);
        assert!(matches!(block_on(source.load(0)), Err(SourceError::Missing(0))));
        assert!(matches!(block_on(source.load(3)), Err(SourceError::Missing(3))));
    }

    #[test]
    fn test_prefetch_adjacent() {
        let renderer = Rc::new(FakeRenderer::new(3));
        let source = PdfPages::new(renderer.clone(), 2.0);

        block_on(source.prefetch_adjacent(1));
        assert!(source.is_cached(2));
        assert!(!source.is_cached(1));

        block_on(source.prefetch_adjacent(3));
        assert_eq!(renderer.render_count(2), 1);
        assert_eq!(renderer.renders.borrow().len(), 1);
    }
}

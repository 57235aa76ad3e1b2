//! Page images read from the local filesystem.

use psicotrain_core::source::{ImageLoader, PageImage, SourceError, SourceResult};
use psicotrain_core::storage::BoxFuture;
use std::io::Cursor;
use std::path::PathBuf;

/// Loads catalog page paths relative to a content root.
pub struct FsImageLoader {
    root: PathBuf,
}

impl FsImageLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn read(&self, path: &str) -> SourceResult<PageImage> {
        let full = self.root.join(path);
        let bytes = std::fs::read(&full).map_err(|e| SourceError::Decode(path.to_string(), e.to_string()))?;
        // Only the header is decoded; the view gets the encoded bytes
        let (width, height) = image::ImageReader::new(Cursor::new(&bytes))
            .with_guessed_format()
            .map_err(|e| SourceError::Decode(path.to_string(), e.to_string()))?
            .into_dimensions()
            .map_err(|e| SourceError::Decode(path.to_string(), e.to_string()))?;
        Ok(PageImage::new(width, height, bytes))
    }
}

impl ImageLoader for FsImageLoader {
    fn load(&self, path: &str) -> BoxFuture<'_, SourceResult<PageImage>> {
        let result = self.read(path);
        Box::pin(async move { result })
    }
}

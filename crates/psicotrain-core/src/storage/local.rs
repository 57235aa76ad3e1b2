//! Browser `localStorage` implementation for WebAssembly.

use super::{BoxFuture, Storage, StorageError, StorageResult};
use web_sys::Storage as WebStorage;

/// `window.localStorage` backed storage.
///
/// The browser API is synchronous; futures resolve on first poll.
pub struct LocalStorage {
    inner: WebStorage,
}

impl LocalStorage {
    /// Open the window's local storage.
    pub fn new() -> StorageResult<Self> {
        let window = web_sys::window()
            .ok_or_else(|| StorageError::Other("No window object".to_string()))?;
        let inner = window
            .local_storage()
            .map_err(|e| StorageError::Other(format!("localStorage error: {:?}", e)))?
            .ok_or_else(|| StorageError::Other("localStorage not available".to_string()))?;
        Ok(Self { inner })
    }
}

impl Storage for LocalStorage {
    fn get(&self, key: &str) -> BoxFuture<'_, StorageResult<Option<String>>> {
        let result = self
            .inner
            .get_item(key)
            .map_err(|e| StorageError::Other(format!("Get error: {:?}", e)));
        Box::pin(async move { result })
    }

    fn set(&self, key: &str, value: &str) -> BoxFuture<'_, StorageResult<()>> {
        // setItem only throws when the quota is exhausted
        let result = self
            .inner
            .set_item(key, value)
            .map_err(|e| StorageError::Quota(format!("{}: {:?}", key, e)));
        Box::pin(async move { result })
    }

    fn remove(&self, key: &str) -> BoxFuture<'_, StorageResult<()>> {
        let result = self
            .inner
            .remove_item(key)
            .map_err(|e| StorageError::Other(format!("Remove error: {:?}", e)));
        Box::pin(async move { result })
    }

    fn keys(&self) -> BoxFuture<'_, StorageResult<Vec<String>>> {
        let result = self
            .inner
            .length()
            .map_err(|e| StorageError::Other(format!("Length error: {:?}", e)))
            .map(|len| {
                (0..len)
                    .filter_map(|i| self.inner.key(i).ok().flatten())
                    .collect::<Vec<_>>()
            });
        Box::pin(async move { result })
    }
}

//! Durable key-value storage.
//!
//! Every component owns a disjoint set of keys (see [`keys`]) and stores a
//! single JSON value (or a bare string) under each of them.

pub mod keys;
mod memory;

#[cfg(not(target_arch = "wasm32"))]
mod file;

#[cfg(target_arch = "wasm32")]
mod local;

pub use memory::MemoryStorage;

#[cfg(not(target_arch = "wasm32"))]
pub use file::FileStorage;

#[cfg(target_arch = "wasm32")]
pub use local::LocalStorage;

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Key not found: {0}")]
    NotFound(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Storage quota exceeded: {0}")]
    Quota(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Storage error: {0}")]
    Other(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Boxed future for async operations (compatible with WASM).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Key-value storage backend.
///
/// On native platforms implementations must be Send + Sync.
#[cfg(not(target_arch = "wasm32"))]
pub trait Storage: Send + Sync {
    /// Read the value stored under `key`, if any.
    fn get(&self, key: &str) -> BoxFuture<'_, StorageResult<Option<String>>>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> BoxFuture<'_, StorageResult<()>>;

    /// Remove `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> BoxFuture<'_, StorageResult<()>>;

    /// List all stored keys.
    fn keys(&self) -> BoxFuture<'_, StorageResult<Vec<String>>>;
}

/// Key-value storage backend (WASM version without Send + Sync).
#[cfg(target_arch = "wasm32")]
pub trait Storage {
    /// Read the value stored under `key`, if any.
    fn get(&self, key: &str) -> BoxFuture<'_, StorageResult<Option<String>>>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> BoxFuture<'_, StorageResult<()>>;

    /// Remove `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> BoxFuture<'_, StorageResult<()>>;

    /// List all stored keys.
    fn keys(&self) -> BoxFuture<'_, StorageResult<Vec<String>>>;
}

/// Load and deserialize a JSON value. Returns `Ok(None)` when the key is absent.
pub async fn load_json<T, S>(storage: &S, key: &str) -> StorageResult<Option<T>>
where
    T: DeserializeOwned,
    S: Storage + ?Sized,
{
    match storage.get(key).await? {
        Some(raw) => serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| StorageError::Serialization(format!("{}: {}", key, e))),
        None => Ok(None),
    }
}

/// Serialize a value as JSON and store it.
pub async fn save_json<T, S>(storage: &S, key: &str, value: &T) -> StorageResult<()>
where
    T: Serialize + ?Sized,
    S: Storage + ?Sized,
{
    let json = serde_json::to_string(value)
        .map_err(|e| StorageError::Serialization(format!("{}: {}", key, e)))?;
    storage.set(key, &json).await
}

/// Read a boolean flag stored as `"true"`/`"false"`.
pub async fn load_flag<S: Storage + ?Sized>(storage: &S, key: &str) -> StorageResult<Option<bool>> {
    Ok(storage.get(key).await?.map(|raw| raw.trim() == "true"))
}

/// Store a boolean flag as `"true"`/`"false"`.
pub async fn save_flag<S: Storage + ?Sized>(storage: &S, key: &str, value: bool) -> StorageResult<()> {
    storage.set(key, if value { "true" } else { "false" }).await
}

/// Simple blocking executor for tests.
#[cfg(test)]
pub(crate) fn block_on<F: std::future::Future>(f: F) -> F::Output {
    use std::task::{Context, Poll, RawWaker, RawWakerVTable, Waker};

    fn dummy_raw_waker() -> RawWaker {
        fn no_op(_: *const ()) {}
        fn clone(_: *const ()) -> RawWaker {
            dummy_raw_waker()
        }
        static VTABLE: RawWakerVTable = RawWakerVTable::new(clone, no_op, no_op, no_op);
        RawWaker::new(std::ptr::null(), &VTABLE)
    }

    let waker = unsafe { Waker::from_raw(dummy_raw_waker()) };
    let mut cx = Context::from_waker(&waker);
    let mut f = std::pin::pin!(f);

    loop {
        match f.as_mut().poll(&mut cx) {
            Poll::Ready(result) => return result,
            Poll::Pending => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_json_roundtrip() {
        let storage = MemoryStorage::new();
        let mut widths = BTreeMap::new();
        widths.insert("pen".to_string(), 7u32);

        block_on(save_json(&storage, "widths", &widths)).unwrap();
        let loaded: Option<BTreeMap<String, u32>> = block_on(load_json(&storage, "widths")).unwrap();
        assert_eq!(loaded, Some(widths));
    }

    #[test]
    fn test_load_json_missing_key() {
        let storage = MemoryStorage::new();
        let loaded: Option<u32> = block_on(load_json(&storage, "nothing")).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_load_json_malformed() {
        let storage = MemoryStorage::new();
        block_on(storage.set("broken", "{not json")).unwrap();
        let result: StorageResult<Option<u32>> = block_on(load_json(&storage, "broken"));
        assert!(matches!(result, Err(StorageError::Serialization(_))));
    }

    #[test]
    fn test_flags_are_stored_as_strings() {
        let storage = MemoryStorage::new();
        block_on(save_flag(&storage, "dark", true)).unwrap();
        assert_eq!(block_on(storage.get("dark")).unwrap().as_deref(), Some("true"));
        assert_eq!(block_on(load_flag(&storage, "dark")).unwrap(), Some(true));

        block_on(save_flag(&storage, "dark", false)).unwrap();
        assert_eq!(block_on(load_flag(&storage, "dark")).unwrap(), Some(false));
    }
}

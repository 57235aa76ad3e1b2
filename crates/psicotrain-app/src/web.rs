//! WebAssembly entry point and platform-specific code.

use crate::app::{App, AppSlot};
use crate::config::AppConfig;
use psicotrain_core::catalog::{CatalogError, CatalogResult};
use psicotrain_core::source::{ImageLoader, PageImage, SourceError, SourceResult};
use psicotrain_core::storage::{BoxFuture, LocalStorage};
use psicotrain_core::LogBinding;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;

thread_local! {
    static APP: RefCell<AppSlot<LocalStorage>> = const { RefCell::new(AppSlot::new()) };
}

fn describe(value: &JsValue) -> String {
    value.as_string().unwrap_or_else(|| format!("{:?}", value))
}

/// GET `url`, failing on non-2xx statuses.
async fn fetch(url: &str) -> Result<web_sys::Response, String> {
    let window = web_sys::window().ok_or_else(|| "No window object".to_string())?;
    let response = JsFuture::from(window.fetch_with_str(url))
        .await
        .map_err(|e| describe(&e))?;
    let response: web_sys::Response = response.dyn_into().map_err(|e| describe(&e))?;
    if !response.ok() {
        return Err(format!("HTTP {}", response.status()));
    }
    Ok(response)
}

async fn fetch_bytes(url: &str) -> Result<Vec<u8>, String> {
    let response = fetch(url).await?;
    let promise = response.array_buffer().map_err(|e| describe(&e))?;
    let buffer = JsFuture::from(promise).await.map_err(|e| describe(&e))?;
    Ok(js_sys::Uint8Array::new(&buffer).to_vec())
}

/// Fetch a JSON document as text.
pub async fn fetch_text(url: &str) -> CatalogResult<String> {
    let fail = |e: String| CatalogError::Fetch(url.to_string(), e);
    let response = fetch(url).await.map_err(fail)?;
    let promise = response.text().map_err(|e| fail(describe(&e)))?;
    let text = JsFuture::from(promise).await.map_err(|e| fail(describe(&e)))?;
    text.as_string().ok_or_else(|| fail("Response is not text".to_string()))
}

async fn fetch_or_warn(url: &str) -> Option<String> {
    match fetch_text(url).await {
        Ok(text) => Some(text),
        Err(e) => {
            log::warn!("{}", e);
            None
        }
    }
}

/// Decode just enough of an image to learn its size.
async fn image_size(bytes: &[u8]) -> Result<(u32, u32), String> {
    let window = web_sys::window().ok_or_else(|| "No window object".to_string())?;
    let parts = js_sys::Array::of1(&js_sys::Uint8Array::from(bytes));
    let blob = web_sys::Blob::new_with_u8_array_sequence(&parts).map_err(|e| describe(&e))?;
    let promise = window.create_image_bitmap_with_blob(&blob).map_err(|e| describe(&e))?;
    let bitmap: web_sys::ImageBitmap = JsFuture::from(promise)
        .await
        .map_err(|e| describe(&e))?
        .dyn_into()
        .map_err(|e| describe(&e))?;
    let size = (bitmap.width(), bitmap.height());
    bitmap.close();
    Ok(size)
}

/// Page images fetched relative to the page's origin.
pub struct HttpImageLoader {
    base: String,
}

impl HttpImageLoader {
    pub fn new(base: impl Into<String>) -> Self {
        Self { base: base.into() }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base.trim_end_matches('/'), path.trim_start_matches('/'))
    }
}

impl ImageLoader for HttpImageLoader {
    fn load(&self, path: &str) -> BoxFuture<'_, SourceResult<PageImage>> {
        let url = self.url(path);
        Box::pin(async move {
            let bytes = fetch_bytes(&url)
                .await
                .map_err(|e| SourceError::Decode(url.clone(), e))?;
            let (width, height) = image_size(&bytes)
                .await
                .map_err(|e| SourceError::Decode(url.clone(), e))?;
            Ok(PageImage::new(width, height, bytes))
        })
    }
}

/// Initialize and run the WASM application.
#[wasm_bindgen(start)]
pub async fn run_wasm() {
    console_error_panic_hook::set_once();
    // Fails only if a logger is already installed
    let _ = console_log::init_with_level(log::Level::Info);

    let config = AppConfig::default();
    log::info!("Starting {} (WASM)", config.title);

    let storage = match LocalStorage::new() {
        Ok(storage) => storage,
        Err(e) => {
            log::error!("Cannot start without storage: {}", e);
            return;
        }
    };
    let catalog = fetch_or_warn(&config.catalog_path).await;
    let answer_key = fetch_or_warn(&config.answer_key_path).await;
    let loader = Rc::new(HttpImageLoader::new(config.content_root.clone()));

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
    APP.with(|cell| cell.borrow_mut().put(app));
}

/// Open an exercise from the catalog. Resolves to false if it does not exist
/// or another open is still loading.
#[wasm_bindgen]
pub async fn open_exercise(category: String, name: String) -> bool {
    // Taken out for the duration of the load so no borrow spans an await
    let Some(mut app) = APP.with(|cell| cell.borrow_mut().take()) else {
        log::warn!("Ignoring open of '{}': still starting or loading", name);
        return false;
    };
    let opened = app.open(&category, &name).await;
    APP.with(|cell| cell.borrow_mut().put(app));
    opened
}

/// Advance the stopwatch; called from a one-second interval.
#[wasm_bindgen]
pub fn tick() {
    APP.with(|cell| cell.borrow_mut().tick());
}

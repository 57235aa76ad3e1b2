//! PsicoTrain Application
//!
//! The application shell: configuration, boot sequence and platform
//! page loaders around the core viewer.

mod app;
mod config;

pub use app::{App, AppSlot};
pub use config::{AppConfig, CONFIG_ENV, ConfigError, ConfigResult};

#[cfg(not(target_arch = "wasm32"))]
mod fs_loader;

#[cfg(not(target_arch = "wasm32"))]
pub use fs_loader::FsImageLoader;

#[cfg(target_arch = "wasm32")]
mod web;

#[cfg(target_arch = "wasm32")]
pub use web::{HttpImageLoader, fetch_text, run_wasm};

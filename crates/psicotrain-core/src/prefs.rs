//! User preferences: layout flags, free-text notes and the floating notes panel.
//!
//! In-memory values are authoritative; every setter updates memory first and
//! then writes through, so a failed write only leaves the durable copy stale.

use crate::storage::{self, Storage, StorageResult, keys};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Smallest size the notes panel can be resized to.
pub const MIN_PANEL_WIDTH: i32 = 200;
pub const MIN_PANEL_HEIGHT: i32 = 150;

/// Position and size of the floating notes panel, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelGeometry {
    pub width: i32,
    pub height: i32,
    pub left: i32,
    pub top: i32,
}

impl Default for PanelGeometry {
    fn default() -> Self {
        Self {
            width: 320,
            height: 400,
            left: 24,
            top: 96,
        }
    }
}

pub struct Preferences<S: Storage> {
    storage: Arc<S>,
    sidebar_collapsed: bool,
    dark_mode: bool,
    notes: BTreeMap<String, String>,
    panel: PanelGeometry,
}

impl<S: Storage> Preferences<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self {
            storage,
            sidebar_collapsed: false,
            dark_mode: false,
            notes: BTreeMap::new(),
            panel: PanelGeometry::default(),
        }
    }

    /// Load every preference. Unreadable values keep their defaults.
    pub async fn restore(&mut self) {
        let storage = self.storage.as_ref();
        match storage::load_flag(storage, keys::SIDEBAR_COLLAPSED).await {
            Ok(value) => self.sidebar_collapsed = value.unwrap_or(false),
            Err(e) => log::warn!("Failed to load sidebar state: {}", e),
        }
        match storage::load_flag(storage, keys::DARK_MODE).await {
            Ok(value) => self.dark_mode = value.unwrap_or(false),
            Err(e) => log::warn!("Failed to load dark mode: {}", e),
        }
        match storage::load_json(storage, keys::NOTES).await {
            Ok(notes) => self.notes = notes.unwrap_or_default(),
            Err(e) => log::warn!("Failed to load notes: {}", e),
        }
        match storage::load_json(storage, keys::NOTES_PANEL).await {
            Ok(panel) => self.panel = panel.unwrap_or_default(),
            Err(e) => log::warn!("Failed to load notes panel geometry: {}", e),
        }
    }

    pub fn sidebar_collapsed(&self) -> bool {
        self.sidebar_collapsed
    }

    pub async fn set_sidebar_collapsed(&mut self, collapsed: bool) -> StorageResult<()> {
        self.sidebar_collapsed = collapsed;
        storage::save_flag(self.storage.as_ref(), keys::SIDEBAR_COLLAPSED, collapsed).await
    }

    pub fn dark_mode(&self) -> bool {
        self.dark_mode
    }

    pub async fn set_dark_mode(&mut self, enabled: bool) -> StorageResult<()> {
        self.dark_mode = enabled;
        storage::save_flag(self.storage.as_ref(), keys::DARK_MODE, enabled).await
    }

    /// Note text for a category or exercise; empty if none was written.
    pub fn note(&self, key: &str) -> &str {
        self.notes.get(key).map(String::as_str).unwrap_or("")
    }

    /// Store a note. Blank text removes the entry.
    pub async fn set_note(&mut self, key: &str, text: &str) -> StorageResult<()> {
        if text.trim().is_empty() {
            self.notes.remove(key);
        } else {
            self.notes.insert(key.to_string(), text.to_string());
        }
        storage::save_json(self.storage.as_ref(), keys::NOTES, &self.notes).await
    }

    pub fn panel_geometry(&self) -> PanelGeometry {
        self.panel
    }

    /// Store the panel geometry, enforcing the minimum size.
    pub async fn set_panel_geometry(&mut self, geometry: PanelGeometry) -> StorageResult<()> {
        self.panel = PanelGeometry {
            width: geometry.width.max(MIN_PANEL_WIDTH),
            height: geometry.height.max(MIN_PANEL_HEIGHT),
            ..geometry
        };
        storage::save_json(self.storage.as_ref(), keys::NOTES_PANEL, &self.panel).await
    }
}

//! Exercise catalog and answer key.
//!
//! Both are static JSON documents produced by the page extractor:
//!
//! ```json
//! { "Verbal": [ { "name": "Sinonimos 1", "total_pages": 2,
//!                 "pages": [ { "number": 1, "path": "images/Verbal/Sinonimos_1/page_001.jpg" } ] } ] }
//! ```
//!
//! The answer key maps category → exercise → page number (as a string) → letter.

use crate::answers::Choice;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

/// Catalog errors.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to parse {0}: {1}")]
    Parse(&'static str, String),
    #[error("Failed to fetch {0}: {1}")]
    Fetch(String, String),
}

/// Result type for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// One pre-rendered page image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRef {
    pub path: String,
    /// 1-based page number, when the extractor recorded it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<u32>,
}

/// A named, paginated unit of study content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExerciseRef {
    /// Unique within its category; also the persistence key.
    pub name: String,
    pub total_pages: u32,
    #[serde(default)]
    pub pages: Vec<PageRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl ExerciseRef {
    /// Exercise whose pages come from a document rather than image files.
    pub fn from_document(name: impl Into<String>, total_pages: u32) -> Self {
        Self {
            name: name.into(),
            total_pages,
            pages: Vec::new(),
            category: None,
        }
    }

    /// Number of pages that can actually be shown.
    ///
    /// Static exercises can't show more pages than they list images for.
    pub fn page_count(&self) -> u32 {
        if self.pages.is_empty() {
            self.total_pages
        } else {
            self.total_pages.min(self.pages.len() as u32)
        }
    }

    /// Image path for a 1-based page number.
    pub fn page_path(&self, page: u32) -> Option<&str> {
        if page == 0 {
            return None;
        }
        self.pages.get(page as usize - 1).map(|p| p.path.as_str())
    }
}

/// Category name → ordered exercises.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    categories: BTreeMap<String, Vec<Arc<ExerciseRef>>>,
}

/// Totals used by the shell for its startup summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CatalogSummary {
    pub categories: usize,
    pub exercises: usize,
    pub pages: u64,
}

impl Catalog {
    /// Parse the catalog JSON document.
    pub fn from_json(json: &str) -> CatalogResult<Self> {
        serde_json::from_str(json).map_err(|e| CatalogError::Parse("exercise catalog", e.to_string()))
    }

    /// Parse the catalog, degrading to an empty one on failure.
    pub fn from_json_or_empty(json: &str) -> Self {
        Self::from_json(json).unwrap_or_else(|e| {
            log::warn!("{}; continuing with an empty catalog", e);
            Self::default()
        })
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Category names in sorted order.
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.categories.keys().map(String::as_str)
    }

    /// Exercises of a category in catalog order.
    pub fn exercises(&self, category: &str) -> &[Arc<ExerciseRef>] {
        self.categories.get(category).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Look up an exercise by category and name.
    pub fn exercise(&self, category: &str, name: &str) -> Option<Arc<ExerciseRef>> {
        self.exercises(category).iter().find(|e| e.name == name).cloned()
    }

    pub fn summary(&self) -> CatalogSummary {
        let exercises = self.categories.values().flatten();
        CatalogSummary {
            categories: self.categories.len(),
            exercises: self.categories.values().map(Vec::len).sum(),
            pages: exercises.map(|e| u64::from(e.page_count())).sum(),
        }
    }
}

/// Category → exercise → page number → expected letter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerKey {
    entries: BTreeMap<String, BTreeMap<String, BTreeMap<String, String>>>,
}

impl AnswerKey {
    /// Parse the answer key JSON document.
    pub fn from_json(json: &str) -> CatalogResult<Self> {
        serde_json::from_str(json).map_err(|e| CatalogError::Parse("answer key", e.to_string()))
    }

    /// Parse the answer key, degrading to an empty one on failure.
    pub fn from_json_or_empty(json: &str) -> Self {
        Self::from_json(json).unwrap_or_else(|e| {
            log::warn!("{}; continuing without an answer key", e);
            Self::default()
        })
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Expected answer for a page, if the key has a usable entry for it.
    ///
    /// Letters compare case-insensitively; blank entries count as unknown.
    pub fn lookup(&self, category: &str, exercise: &str, page: u32) -> Option<Choice> {
        let raw = self
            .entries
            .get(category)?
            .get(exercise)?
            .get(&page.to_string())?;
        Choice::parse(raw)
    }

    /// Look an exercise up in any category, first match wins.
    ///
    /// Used when the exercise was opened without a category (direct document loads).
    pub fn lookup_any(&self, exercise: &str, page: u32) -> Option<Choice> {
        self.entries
            .keys()
            .find_map(|category| self.lookup(category, exercise, page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"{
        "Verbal": [
            {
                "name": "Sinonimos 1",
                "category": "Verbal",
                "total_pages": 3,
                "answers": {},
                "pages": [
                    {"number": 1, "path": "images/Verbal/Sinonimos_1/page_001.jpg"},
                    {"number": 2, "path": "images/Verbal/Sinonimos_1/page_002.jpg"}
                ]
            }
        ],
        "Percepción": []
    }"#;

    #[test]
    fn test_parse_catalog_with_extra_fields() {
        let catalog = Catalog::from_json(CATALOG).unwrap();
        let exercise = catalog.exercise("Verbal", "Sinonimos 1").unwrap();
        assert_eq!(exercise.total_pages, 3);
        assert_eq!(exercise.pages.len(), 2);
        assert_eq!(exercise.pages[0].number, Some(1));
        assert!(catalog.exercises("Percepción").is_empty());
        assert!(catalog.exercises("Unknown").is_empty());
    }

    #[test]
    fn test_page_count_limited_by_images() {
        let catalog = Catalog::from_json(CATALOG).unwrap();
        let exercise = catalog.exercise("Verbal", "Sinonimos 1").unwrap();
        assert_eq!(exercise.page_count(), 2);
        assert_eq!(exercise.page_path(2), Some("images/Verbal/Sinonimos_1/page_002.jpg"));
        assert_eq!(exercise.page_path(0), None);
        assert_eq!(exercise.page_path(3), None);
    }

    #[test]
    fn test_document_exercise_uses_total_pages() {
        let exercise = ExerciseRef::from_document("scan.pdf", 12);
        assert_eq!(exercise.page_count(), 12);
    }

    #[test]
    fn test_summary() {
        let catalog = Catalog::from_json(CATALOG).unwrap();
        let summary = catalog.summary();
        assert_eq!(summary.categories, 2);
        assert_eq!(summary.exercises, 1);
        assert_eq!(summary.pages, 2);
    }

    #[test]
    fn test_malformed_catalog_degrades_to_empty() {
        assert!(Catalog::from_json("[1, 2").is_err());
        assert!(Catalog::from_json_or_empty("[1, 2").is_empty());
    }

    #[test]
    fn test_answer_key_lookup() {
        let key = AnswerKey::from_json(
            r#"{"Verbal": {"Sinonimos 1": {"1": "b", "2": "", "3": "Z"}}}"#,
        )
        .unwrap();
        assert_eq!(key.lookup("Verbal", "Sinonimos 1", 1), Some(Choice::B));
        // Blank and invalid entries are unknown
        assert_eq!(key.lookup("Verbal", "Sinonimos 1", 2), None);
        assert_eq!(key.lookup("Verbal", "Sinonimos 1", 3), None);
        assert_eq!(key.lookup("Verbal", "Other", 1), None);
        assert_eq!(key.lookup_any("Sinonimos 1", 1), Some(Choice::B));
    }
}

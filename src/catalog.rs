//! # Catalog Module
//!
//! Contract of the song catalog the bot browses and edits. The bot only
//! issues intents through [`Catalog`]; the concrete store (see `db`) owns
//! the entries.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dialogue::{Category, FieldValue};

/// One browsable song
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Acts as the primary key
    pub title: String,
    pub lyrics: String,
    pub category: Option<Category>,
    /// Absolute URL, or empty when the song has no image
    pub image_url: String,
}

impl CatalogEntry {
    pub fn new(
        title: impl Into<String>,
        lyrics: impl Into<String>,
        category: Option<Category>,
        image_url: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            lyrics: lyrics.into(),
            category,
            image_url: image_url.into(),
        }
    }

    pub fn has_image(&self) -> bool {
        !self.image_url.trim().is_empty()
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("catalog unavailable: {0}")]
    Unavailable(String),
    #[error("invalid catalog data: {0}")]
    InvalidData(String),
}

/// Outcome of a single-field update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Updated,
    NotFound,
}

#[async_trait]
pub trait Catalog: Send + Sync {
    async fn find_by_title(&self, title: &str) -> Result<Option<CatalogEntry>, CatalogError>;

    /// Titles starting with `prefix`, case-insensitively, in title order
    async fn search_by_prefix(&self, prefix: &str) -> Result<Vec<String>, CatalogError>;

    async fn find_by_category(&self, category: Category) -> Result<Vec<String>, CatalogError>;

    async fn random_one(&self) -> Result<Option<CatalogEntry>, CatalogError>;

    async fn insert(&self, entry: &CatalogEntry) -> Result<(), CatalogError>;

    /// Update one field of the entry identified by `title`
    async fn update_field(
        &self,
        title: &str,
        value: &FieldValue,
    ) -> Result<UpdateOutcome, CatalogError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_image() {
        let entry = CatalogEntry::new("Night Song", "La la la", Some(Category::Choir), "");
        assert!(!entry.has_image());

        let entry = CatalogEntry::new("Night Song", "La la la", None, "https://i.imgur.com/a.png");
        assert!(entry.has_image());
    }
}

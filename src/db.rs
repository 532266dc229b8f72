use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use tracing::{debug, info, warn};

use crate::catalog::{Catalog, CatalogEntry, CatalogError, UpdateOutcome};
use crate::dialogue::{Category, FieldValue};

/// Upper bound on titles returned by list queries (one inline button each)
pub const MAX_LISTED_TITLES: i64 = 50;

/// Connect to Postgres
pub async fn connect(database_url: &str, max_connections: u32) -> Result<PgPool> {
    info!(max_connections, "Connecting to catalog database");
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
        .context("Failed to connect to catalog database")
}

/// Initialize the database schema
pub async fn init_database_schema(pool: &PgPool) -> Result<()> {
    info!("Initializing database schema...");

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS songs (
            title TEXT PRIMARY KEY,
            lyrics TEXT NOT NULL DEFAULT '',
            category TEXT CHECK (category IN ('Choir', 'Non-Choir')),
            image_url TEXT NOT NULL DEFAULT '',
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create songs table")?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS songs_title_prefix_idx
         ON songs (lower(title) text_pattern_ops)",
    )
    .execute(pool)
    .await
    .context("Failed to create title prefix index")?;

    sqlx::query("CREATE INDEX IF NOT EXISTS songs_category_idx ON songs (category)")
        .execute(pool)
        .await
        .context("Failed to create category index")?;

    info!("Database schema initialized successfully");
    Ok(())
}

/// Escape `%`, `_` and `\` so user input matches literally inside LIKE
pub fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn entry_from_row(row: &PgRow) -> Result<CatalogEntry, sqlx::Error> {
    let title: String = row.try_get("title")?;
    let category: Option<String> = row.try_get("category")?;
    let category = category.and_then(|label| {
        let parsed = Category::from_label(&label);
        if parsed.is_none() {
            warn!(title = %title, category = %label, "Ignoring unknown category value");
        }
        parsed
    });

    Ok(CatalogEntry {
        title,
        lyrics: row.try_get("lyrics")?,
        category,
        image_url: row.try_get("image_url")?,
    })
}

/// Postgres-backed song catalog
#[derive(Debug, Clone)]
pub struct PgCatalog {
    pool: PgPool,
}

impl PgCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Catalog for PgCatalog {
    async fn find_by_title(&self, title: &str) -> Result<Option<CatalogEntry>, CatalogError> {
        debug!(title = %title, "Looking up song by title");

        let row = sqlx::query(
            "SELECT title, lyrics, category, image_url FROM songs WHERE title = $1",
        )
        .bind(title)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(entry_from_row).transpose()?)
    }

    async fn search_by_prefix(&self, prefix: &str) -> Result<Vec<String>, CatalogError> {
        let pattern = format!("{}%", escape_like(&prefix.to_lowercase()));

        let rows = sqlx::query(
            "SELECT title FROM songs
             WHERE lower(title) LIKE $1 ESCAPE '\\'
             ORDER BY title
             LIMIT $2",
        )
        .bind(&pattern)
        .bind(MAX_LISTED_TITLES)
        .fetch_all(&self.pool)
        .await?;

        let titles = rows
            .iter()
            .map(|row| row.try_get::<String, _>("title"))
            .collect::<Result<Vec<_>, _>>()?;
        debug!(prefix = %prefix, matches = titles.len(), "Prefix search completed");
        Ok(titles)
    }

    async fn find_by_category(&self, category: Category) -> Result<Vec<String>, CatalogError> {
        let rows = sqlx::query(
            "SELECT title FROM songs WHERE category = $1 ORDER BY title LIMIT $2",
        )
        .bind(category.label())
        .bind(MAX_LISTED_TITLES)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| row.try_get::<String, _>("title"))
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn random_one(&self) -> Result<Option<CatalogEntry>, CatalogError> {
        let row = sqlx::query(
            "SELECT title, lyrics, category, image_url FROM songs ORDER BY random() LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(entry_from_row).transpose()?)
    }

    async fn insert(&self, entry: &CatalogEntry) -> Result<(), CatalogError> {
        if entry.title.trim().is_empty() {
            return Err(CatalogError::InvalidData("title must not be empty".to_string()));
        }

        info!(title = %entry.title, "Inserting song");
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO songs (title, lyrics, category, image_url, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $5)",
        )
        .bind(&entry.title)
        .bind(&entry.lyrics)
        .bind(entry.category.map(Category::label))
        .bind(&entry.image_url)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_field(
        &self,
        title: &str,
        value: &FieldValue,
    ) -> Result<UpdateOutcome, CatalogError> {
        let statement = match value {
            FieldValue::Title(_) => "UPDATE songs SET title = $1, updated_at = $2 WHERE title = $3",
            FieldValue::Lyrics(_) => {
                "UPDATE songs SET lyrics = $1, updated_at = $2 WHERE title = $3"
            }
            FieldValue::Category(_) => {
                "UPDATE songs SET category = $1, updated_at = $2 WHERE title = $3"
            }
            FieldValue::ImageUrl(_) => {
                "UPDATE songs SET image_url = $1, updated_at = $2 WHERE title = $3"
            }
        };

        info!(title = %title, field = %value.field(), "Updating song field");
        let result = sqlx::query(statement)
            .bind(value.as_text())
            .bind(Utc::now())
            .bind(title)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() > 0 {
            Ok(UpdateOutcome::Updated)
        } else {
            info!(title = %title, "No song matched the update");
            Ok(UpdateOutcome::NotFound)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("abc"), "abc");
        assert_eq!(escape_like("100%"), "100\\%");
        assert_eq!(escape_like("a_b"), "a\\_b");
        assert_eq!(escape_like("back\\slash"), "back\\\\slash");
    }
}

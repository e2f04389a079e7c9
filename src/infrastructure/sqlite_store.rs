//! SQLite-backed document store
//!
//! Persistence adapter over `sqlx`. Duplicate natural keys are tolerated by
//! design: saves append, lookups take the first match.

use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};

use crate::domain::document::{DownloadedFile, TextRecord};
use crate::domain::repositories::DocumentStore;

pub struct SqliteDocumentStore {
    pool: SqlitePool,
}

impl SqliteDocumentStore {
    /// Connects to (and if necessary creates) the database, then runs the
    /// schema migration.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let db_path = database_url
            .strip_prefix("sqlite://")
            .or_else(|| database_url.strip_prefix("sqlite:"))
            .unwrap_or(database_url);

        if db_path != ":memory:" {
            if let Some(parent) = Path::new(db_path).parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("creating database directory for {db_path}"))?;
            }
            if !Path::new(db_path).exists() {
                std::fs::File::create(db_path)
                    .with_context(|| format!("creating database file {db_path}"))?;
            }
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .with_context(|| format!("connecting to {database_url}"))?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS text_sources (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                text_type TEXT NOT NULL,
                text_identifier TEXT NOT NULL,
                country TEXT NOT NULL,
                text_content TEXT NOT NULL,
                download_url TEXT,
                collected_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_text_sources_lookup
            ON text_sources (text_type, text_identifier, country)
            "#,
        )
        .execute(&self.pool)
        .await?;
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS downloaded_files (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                filename TEXT NOT NULL,
                url TEXT,
                content BLOB NOT NULL,
                collected_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_downloaded_files_filename
            ON downloaded_files (filename)
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn find_text(
        &self,
        text_type: &str,
        identifier: &str,
        country: &str,
    ) -> Result<Option<TextRecord>> {
        let row = sqlx::query(
            r#"
            SELECT text_type, text_identifier, country, text_content, download_url
            FROM text_sources
            WHERE text_type = ? AND text_identifier = ? AND country = ?
            ORDER BY id
            LIMIT 1
            "#,
        )
        .bind(text_type)
        .bind(identifier)
        .bind(country)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            None => Ok(None),
            Some(row) => Ok(Some(TextRecord {
                text_type: row.try_get("text_type")?,
                text_identifier: row.try_get("text_identifier")?,
                country: row.try_get("country")?,
                content: row.try_get("text_content")?,
                download_url: row
                    .try_get::<Option<String>, _>("download_url")?
                    .unwrap_or_default(),
            })),
        }
    }

    async fn find_file(&self, filename: &str) -> Result<Option<DownloadedFile>> {
        let row = sqlx::query(
            r#"
            SELECT filename, url, content
            FROM downloaded_files
            WHERE filename = ?
            ORDER BY id
            LIMIT 1
            "#,
        )
        .bind(filename)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            None => Ok(None),
            Some(row) => Ok(Some(DownloadedFile {
                filename: row.try_get("filename")?,
                url: row.try_get::<Option<String>, _>("url")?.unwrap_or_default(),
                content: row.try_get("content")?,
            })),
        }
    }

    async fn save_texts(&self, texts: &[TextRecord]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for record in texts {
            sqlx::query(
                r#"
                INSERT INTO text_sources
                (text_type, text_identifier, country, text_content, download_url, collected_at)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&record.text_type)
            .bind(&record.text_identifier)
            .bind(&record.country)
            .bind(&record.content)
            .bind(&record.download_url)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn save_files(&self, files: &[DownloadedFile]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for file in files {
            sqlx::query(
                r#"
                INSERT INTO downloaded_files (filename, url, content, collected_at)
                VALUES (?, ?, ?, ?)
                "#,
            )
            .bind(&file.filename)
            .bind(&file.url)
            .bind(&file.content)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

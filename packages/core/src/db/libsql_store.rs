//! libsql PageStore
//!
//! Local SQLite persistence for pages through libsql. Content is stored as
//! JSON text exactly as the codec produced it.
//!
//! # Schema
//!
//! - `pages` table with `UNIQUE(owner_id, slug)`
//! - `parent_page_id` references `pages(id)` with `ON DELETE CASCADE`, so
//!   deleting a page removes its sub-pages
//! - Timestamps are RFC3339 text with microsecond precision; fixed-width
//!   values sort chronologically, which the listing query relies on
//!
//! # Connections
//!
//! Every operation opens its own connection through
//! [`LibsqlPageStore::connect_with_timeout`], which sets a busy timeout and
//! enables foreign keys (SQLite keeps both per connection).

use crate::db::{
    DatabaseError, PageChange, PageStore, PageSubscription, StoreError,
    PAGE_CHANGE_CHANNEL_CAPACITY,
};
use crate::models::{NewPage, Page, PageIdentifier, PageUpdate};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use libsql::{Builder, Database, Row};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;

const PAGE_COLUMNS: &str =
    "id, owner_id, parent_page_id, title, slug, content, is_favorite, created_at, updated_at";

pub struct LibsqlPageStore {
    db: Arc<Database>,
    db_path: PathBuf,
    event_tx: broadcast::Sender<PageChange>,
}

impl LibsqlPageStore {
    /// Open (or create) the database at `db_path` and ensure the schema
    pub async fn new(db_path: PathBuf) -> Result<Self, DatabaseError> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let db = Builder::new_local(&db_path)
            .build()
            .await
            .map_err(|e| DatabaseError::connection_failed(db_path.clone(), e))?;

        let (event_tx, _) = broadcast::channel(PAGE_CHANGE_CHANNEL_CAPACITY);
        let store = Self {
            db: Arc::new(db),
            db_path,
            event_tx,
        };
        store.initialize_schema().await?;

        tracing::info!("Page store ready at {}", store.db_path.display());
        Ok(store)
    }

    pub fn db_path(&self) -> &PathBuf {
        &self.db_path
    }

    /// PRAGMA statements return rows, so they go through `query()`
    async fn execute_pragma(
        &self,
        conn: &libsql::Connection,
        pragma: &str,
    ) -> Result<(), DatabaseError> {
        let mut stmt = conn.prepare(pragma).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute '{}': {}", pragma, e))
        })?;
        let _ = stmt.query(()).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute '{}': {}", pragma, e))
        })?;
        Ok(())
    }

    /// Connection with busy timeout and foreign keys enabled
    pub async fn connect_with_timeout(&self) -> Result<libsql::Connection, DatabaseError> {
        let conn = self.db.connect().map_err(DatabaseError::LibsqlError)?;
        self.execute_pragma(&conn, "PRAGMA busy_timeout = 5000")
            .await?;
        self.execute_pragma(&conn, "PRAGMA foreign_keys = ON")
            .await?;
        Ok(conn)
    }

    async fn initialize_schema(&self) -> Result<(), DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        self.execute_pragma(&conn, "PRAGMA journal_mode = WAL")
            .await?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS pages (
                id TEXT PRIMARY KEY,
                owner_id TEXT NOT NULL,
                parent_page_id TEXT,
                title TEXT NOT NULL,
                slug TEXT NOT NULL,
                content TEXT NOT NULL,
                is_favorite INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                UNIQUE (owner_id, slug),
                -- Deleting a page removes its sub-pages
                FOREIGN KEY (parent_page_id) REFERENCES pages(id) ON DELETE CASCADE
            )",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::initialization_failed(format!("Failed to create pages table: {}", e))
        })?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_pages_owner_updated ON pages(owner_id, updated_at DESC)",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::initialization_failed(format!("Failed to create pages index: {}", e))
        })?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_pages_slug ON pages(slug)",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::initialization_failed(format!("Failed to create slug index: {}", e))
        })?;

        Ok(())
    }

    /// Ignores errors if no subscribers
    fn emit_event(&self, change: PageChange) {
        let _ = self.event_tx.send(change);
    }

    fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
        timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    /// Accepts RFC3339 and SQLite's `CURRENT_TIMESTAMP` format
    fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, DatabaseError> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(dt.with_timezone(&Utc));
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
            return Ok(naive.and_utc());
        }
        Err(DatabaseError::invalid_row(
            "pages",
            format!("unparseable timestamp '{}'", s),
        ))
    }

    /// Convert a row selected with [`PAGE_COLUMNS`] into a page
    fn row_to_page(row: &Row) -> Result<Page, DatabaseError> {
        let id: String = row.get(0)?;
        let owner_id: String = row.get(1)?;
        let parent_page_id: Option<String> = row.get(2)?;
        let title: String = row.get(3)?;
        let slug: String = row.get(4)?;
        let content_json: String = row.get(5)?;
        let is_favorite: i64 = row.get(6)?;
        let created_at: String = row.get(7)?;
        let updated_at: String = row.get(8)?;

        // Unparseable content reaches the codec as null, which decodes to
        // the empty document
        let content = serde_json::from_str(&content_json).unwrap_or_else(|e| {
            tracing::warn!("Page {} has malformed stored content: {}", id, e);
            serde_json::Value::Null
        });

        Ok(Page {
            id,
            owner_id,
            parent_page_id,
            title,
            slug,
            content,
            is_favorite: is_favorite != 0,
            created_at: Self::parse_timestamp(&created_at)?,
            updated_at: Self::parse_timestamp(&updated_at)?,
        })
    }

    async fn fetch_one(&self, sql: &str, key: &str) -> Result<Option<Page>, DatabaseError> {
        let conn = self.connect_with_timeout().await?;
        let mut stmt = conn.prepare(sql).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to prepare page query: {}", e))
        })?;
        let mut rows = stmt.query([key]).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute page query: {}", e))
        })?;

        match rows
            .next()
            .await
            .map_err(|e| DatabaseError::sql_execution(e.to_string()))?
        {
            Some(row) => Ok(Some(Self::row_to_page(&row)?)),
            None => Ok(None),
        }
    }

    fn write_error(context: &str, error: libsql::Error) -> StoreError {
        let message = error.to_string();
        if message.contains("UNIQUE constraint failed") {
            StoreError::conflict(format!("{}: {}", context, message))
        } else if message.contains("FOREIGN KEY constraint failed") {
            StoreError::not_found(format!("parent page ({})", context))
        } else {
            StoreError::Database(DatabaseError::sql_execution(format!(
                "{}: {}",
                context, message
            )))
        }
    }
}

#[async_trait]
impl PageStore for LibsqlPageStore {
    async fn load_page(&self, identifier: &PageIdentifier) -> Result<Page, StoreError> {
        let found = match identifier {
            PageIdentifier::ById(id) => {
                let sql = format!("SELECT {} FROM pages WHERE id = ?", PAGE_COLUMNS);
                self.fetch_one(&sql, id).await?
            }
            PageIdentifier::BySlug(slug) => {
                let sql = format!(
                    "SELECT {} FROM pages WHERE slug = ? ORDER BY updated_at DESC LIMIT 1",
                    PAGE_COLUMNS
                );
                self.fetch_one(&sql, slug).await?
            }
        };
        found.ok_or_else(|| StoreError::not_found(identifier))
    }

    async fn save_page(&self, id: &str, update: PageUpdate) -> Result<Page, StoreError> {
        let content = update
            .content
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| StoreError::fatal(format!("Failed to serialize content: {}", e)))?;
        let updated_at = Self::format_timestamp(&update.updated_at.unwrap_or_else(Utc::now));

        let conn = self.connect_with_timeout().await?;
        let rows_affected = conn
            .execute(
                "UPDATE pages SET
                    title = COALESCE(?, title),
                    slug = COALESCE(?, slug),
                    content = COALESCE(?, content),
                    is_favorite = COALESCE(?, is_favorite),
                    updated_at = ?
                 WHERE id = ?",
                (
                    update.title.as_deref(),
                    update.slug.as_deref(),
                    content.as_deref(),
                    update.is_favorite.map(i64::from),
                    updated_at.as_str(),
                    id,
                ),
            )
            .await
            .map_err(|e| Self::write_error("Failed to update page", e))?;

        if rows_affected == 0 {
            return Err(StoreError::not_found(id));
        }

        let saved = self.load_page(&PageIdentifier::by_id(id)).await?;
        self.emit_event(PageChange::Updated(saved.clone()));
        Ok(saved)
    }

    async fn create_page(&self, new_page: NewPage) -> Result<Page, StoreError> {
        let page = Page::from_new(new_page);
        let content = serde_json::to_string(&page.content)
            .map_err(|e| StoreError::fatal(format!("Failed to serialize content: {}", e)))?;
        let created_at = Self::format_timestamp(&page.created_at);
        let updated_at = Self::format_timestamp(&page.updated_at);

        let conn = self.connect_with_timeout().await?;
        conn.execute(
            "INSERT INTO pages (id, owner_id, parent_page_id, title, slug, content, is_favorite, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, 0, ?, ?)",
            (
                page.id.as_str(),
                page.owner_id.as_str(),
                page.parent_page_id.as_deref(),
                page.title.as_str(),
                page.slug.as_str(),
                content.as_str(),
                created_at.as_str(),
                updated_at.as_str(),
            ),
        )
        .await
        .map_err(|e| Self::write_error("Failed to insert page", e))?;

        self.emit_event(PageChange::Inserted(page.clone()));
        Ok(page)
    }

    async fn delete_page(&self, id: &str) -> Result<(), StoreError> {
        let conn = self.connect_with_timeout().await?;

        // Gather the subtree first so cascaded rows get delete events too
        let mut stmt = conn
            .prepare(
                "WITH RECURSIVE subtree(id) AS (
                    SELECT id FROM pages WHERE id = ?
                    UNION ALL
                    SELECT pages.id FROM pages JOIN subtree ON pages.parent_page_id = subtree.id
                 )
                 SELECT pages.id, pages.owner_id FROM pages JOIN subtree ON pages.id = subtree.id",
            )
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to prepare subtree query: {}", e))
            })?;
        let mut rows = stmt.query([id]).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute subtree query: {}", e))
        })?;

        let mut doomed: Vec<(String, String)> = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::sql_execution(e.to_string()))?
        {
            let page_id: String = row.get(0).map_err(DatabaseError::LibsqlError)?;
            let owner_id: String = row.get(1).map_err(DatabaseError::LibsqlError)?;
            doomed.push((page_id, owner_id));
        }
        drop(rows);
        drop(stmt);

        let rows_affected = conn
            .execute("DELETE FROM pages WHERE id = ?", [id])
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("Failed to delete page: {}", e)))?;
        if rows_affected == 0 {
            return Err(StoreError::not_found(id));
        }

        for (id, owner_id) in doomed {
            self.emit_event(PageChange::Deleted { id, owner_id });
        }
        Ok(())
    }

    async fn list_pages(&self, owner_id: &str) -> Result<Vec<Page>, StoreError> {
        let conn = self.connect_with_timeout().await?;
        let sql = format!(
            "SELECT {} FROM pages WHERE owner_id = ? ORDER BY updated_at DESC",
            PAGE_COLUMNS
        );
        let mut stmt = conn.prepare(&sql).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to prepare list query: {}", e))
        })?;
        let mut rows = stmt.query([owner_id]).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute list query: {}", e))
        })?;

        let mut pages = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::sql_execution(e.to_string()))?
        {
            pages.push(Self::row_to_page(&row)?);
        }
        Ok(pages)
    }

    fn subscribe_to_changes(&self, owner_id: &str) -> Option<PageSubscription> {
        Some(PageSubscription::new(owner_id, self.event_tx.subscribe()))
    }
}

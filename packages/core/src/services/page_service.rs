//! Page Service
//!
//! One-shot page operations that sit outside an open editing session:
//! creating pages, listing an owner's pages, first-visit bootstrap and
//! opening sessions against the shared store.

use crate::codec;
use crate::config::SessionConfig;
use crate::db::{PageStore, PageSubscription};
use crate::models::{generate_slug, Document, NewPage, Page, PageIdentifier};
use crate::services::{Navigator, PageSession, SessionError};
use chrono::Utc;
use std::sync::Arc;

pub struct PageService {
    store: Arc<dyn PageStore>,
    navigator: Arc<dyn Navigator>,
    config: SessionConfig,
}

impl PageService {
    pub fn new(
        store: Arc<dyn PageStore>,
        navigator: Arc<dyn Navigator>,
        config: SessionConfig,
    ) -> Result<Self, SessionError> {
        config.validate().map_err(SessionError::invalid_config)?;
        Ok(Self {
            store,
            navigator,
            config,
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Create a page holding the empty document
    ///
    /// A blank or missing title falls back to the configured default. The
    /// slug is derived from the title and the current time.
    pub async fn create_page(
        &self,
        owner_id: &str,
        title: Option<&str>,
        parent_page_id: Option<&str>,
    ) -> Result<Page, SessionError> {
        let title = match title.map(str::trim) {
            Some(title) if !title.is_empty() => title.to_string(),
            _ => self.config.default_title.clone(),
        };
        let slug = generate_slug(&title, Utc::now().timestamp_millis());
        let content = codec::encode(&Document::empty())?;

        let mut new_page = NewPage::new(owner_id, title, slug, content);
        if let Some(parent_id) = parent_page_id {
            new_page = new_page.with_parent(parent_id);
        }

        let page = self.store.create_page(new_page).await?;
        tracing::info!("Created page '{}' ({}) for {}", page.title, page.id, owner_id);
        Ok(page)
    }

    /// Most recently updated page of an owner, creating one on first visit
    pub async fn ensure_default_page(&self, owner_id: &str) -> Result<Page, SessionError> {
        let pages = self.store.list_pages(owner_id).await?;
        match pages.into_iter().next() {
            Some(page) => Ok(page),
            None => {
                tracing::debug!("Owner {} has no pages, creating default page", owner_id);
                self.create_page(owner_id, None, None).await
            }
        }
    }

    pub async fn list_pages(&self, owner_id: &str) -> Result<Vec<Page>, SessionError> {
        Ok(self.store.list_pages(owner_id).await?)
    }

    pub async fn delete_page(&self, page_id: &str) -> Result<(), SessionError> {
        self.store.delete_page(page_id).await?;
        Ok(())
    }

    /// Open an editing session sharing this service's store and navigator
    pub fn open_session(&self, identifier: PageIdentifier) -> Result<PageSession, SessionError> {
        PageSession::open(
            self.store.clone(),
            self.navigator.clone(),
            identifier,
            self.config.clone(),
        )
    }

    /// Realtime changes to an owner's pages, if the store pushes them
    pub fn subscribe(&self, owner_id: &str) -> Option<PageSubscription> {
        self.store.subscribe_to_changes(owner_id)
    }
}

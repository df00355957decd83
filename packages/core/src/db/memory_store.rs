//! In-memory PageStore
//!
//! Process-local backend used by tests and by hosts that persist elsewhere.
//! It enforces the same rules as the libsql store: per-owner unique slugs,
//! cascading sub-page deletion and newest-first listings.

use crate::db::{PageChange, PageStore, PageSubscription, StoreError, PAGE_CHANGE_CHANNEL_CAPACITY};
use crate::models::{NewPage, Page, PageIdentifier, PageUpdate};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::{broadcast, RwLock};

pub struct MemoryPageStore {
    pages: RwLock<HashMap<String, Page>>,
    event_tx: broadcast::Sender<PageChange>,
}

impl Default for MemoryPageStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryPageStore {
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(PAGE_CHANGE_CHANNEL_CAPACITY);
        Self {
            pages: RwLock::new(HashMap::new()),
            event_tx,
        }
    }

    /// Seed the store with existing pages without emitting events
    pub async fn with_pages(pages: impl IntoIterator<Item = Page>) -> Self {
        let store = Self::new();
        {
            let mut map = store.pages.write().await;
            for page in pages {
                map.insert(page.id.clone(), page);
            }
        }
        store
    }

    pub async fn page_count(&self) -> usize {
        self.pages.read().await.len()
    }

    /// Ignores errors if no subscribers
    fn emit_event(&self, change: PageChange) {
        let _ = self.event_tx.send(change);
    }

    fn slug_taken(pages: &HashMap<String, Page>, owner_id: &str, slug: &str, except: &str) -> bool {
        pages
            .values()
            .any(|page| page.owner_id == owner_id && page.slug == slug && page.id != except)
    }
}

#[async_trait]
impl PageStore for MemoryPageStore {
    async fn load_page(&self, identifier: &PageIdentifier) -> Result<Page, StoreError> {
        let pages = self.pages.read().await;
        let found = match identifier {
            PageIdentifier::ById(id) => pages.get(id),
            PageIdentifier::BySlug(slug) => pages
                .values()
                .filter(|page| &page.slug == slug)
                .max_by_key(|page| page.updated_at),
        };
        found
            .cloned()
            .ok_or_else(|| StoreError::not_found(identifier))
    }

    async fn save_page(&self, id: &str, update: PageUpdate) -> Result<Page, StoreError> {
        let mut pages = self.pages.write().await;

        let owner_id = pages
            .get(id)
            .map(|page| page.owner_id.clone())
            .ok_or_else(|| StoreError::not_found(id))?;
        if let Some(slug) = &update.slug {
            if Self::slug_taken(&pages, &owner_id, slug, id) {
                return Err(StoreError::conflict(format!(
                    "slug '{}' already used by owner '{}'",
                    slug, owner_id
                )));
            }
        }

        let page = pages.get_mut(id).ok_or_else(|| StoreError::not_found(id))?;
        page.apply_update(&update);
        let saved = page.clone();
        drop(pages);

        self.emit_event(PageChange::Updated(saved.clone()));
        Ok(saved)
    }

    async fn create_page(&self, new_page: NewPage) -> Result<Page, StoreError> {
        let mut pages = self.pages.write().await;

        if let Some(parent_id) = &new_page.parent_page_id {
            if !pages.contains_key(parent_id) {
                return Err(StoreError::not_found(parent_id));
            }
        }
        if Self::slug_taken(&pages, &new_page.owner_id, &new_page.slug, "") {
            return Err(StoreError::conflict(format!(
                "slug '{}' already used by owner '{}'",
                new_page.slug, new_page.owner_id
            )));
        }

        let page = Page::from_new(new_page);
        pages.insert(page.id.clone(), page.clone());
        drop(pages);

        self.emit_event(PageChange::Inserted(page.clone()));
        Ok(page)
    }

    async fn delete_page(&self, id: &str) -> Result<(), StoreError> {
        let mut pages = self.pages.write().await;
        if !pages.contains_key(id) {
            return Err(StoreError::not_found(id));
        }

        // Collect the page and every descendant
        let mut doomed = vec![id.to_string()];
        let mut cursor = 0;
        while cursor < doomed.len() {
            let parent = doomed[cursor].clone();
            doomed.extend(
                pages
                    .values()
                    .filter(|page| page.parent_page_id.as_deref() == Some(parent.as_str()))
                    .map(|page| page.id.clone()),
            );
            cursor += 1;
        }

        let removed: Vec<Page> = doomed.iter().filter_map(|id| pages.remove(id)).collect();
        drop(pages);

        for page in removed {
            self.emit_event(PageChange::Deleted {
                id: page.id,
                owner_id: page.owner_id,
            });
        }
        Ok(())
    }

    async fn list_pages(&self, owner_id: &str) -> Result<Vec<Page>, StoreError> {
        let pages = self.pages.read().await;
        let mut owned: Vec<Page> = pages
            .values()
            .filter(|page| page.owner_id == owner_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(owned)
    }

    fn subscribe_to_changes(&self, owner_id: &str) -> Option<PageSubscription> {
        Some(PageSubscription::new(owner_id, self.event_tx.subscribe()))
    }
}

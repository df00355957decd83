//! Page Change Events
//!
//! Page stores publish a [`PageChange`] for every insert, update and delete
//! on a tokio broadcast channel. Consumers subscribe per owner through
//! [`PageSubscription`], which filters out other owners' changes and can
//! forward the rest to a [`PageChangeHandler`] (the realtime `onInsert` /
//! `onUpdate` / `onDelete` callbacks).
//!
//! # Event Flow
//!
//! 1. A store completes a write (create, save, delete)
//! 2. The change is sent on the store's broadcast channel
//! 3. Each subscription drops changes for other owners
//! 4. The remaining changes reach the handler in commit order

use crate::models::Page;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

/// Buffered changes per store before slow subscribers start lagging
pub const PAGE_CHANGE_CHANNEL_CAPACITY: usize = 128;

/// A committed change to one page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PageChange {
    Inserted(Page),
    Updated(Page),
    #[serde(rename_all = "camelCase")]
    Deleted {
        id: String,
        owner_id: String,
    },
}

impl PageChange {
    pub fn owner_id(&self) -> &str {
        match self {
            Self::Inserted(page) | Self::Updated(page) => &page.owner_id,
            Self::Deleted { owner_id, .. } => owner_id,
        }
    }

    pub fn page_id(&self) -> &str {
        match self {
            Self::Inserted(page) | Self::Updated(page) => &page.id,
            Self::Deleted { id, .. } => id,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Inserted(_) => "page:inserted",
            Self::Updated(_) => "page:updated",
            Self::Deleted { .. } => "page:deleted",
        }
    }
}

/// Realtime callbacks for one owner's pages
pub trait PageChangeHandler: Send + Sync {
    fn on_insert(&self, page: &Page);
    fn on_update(&self, page: &Page);
    fn on_delete(&self, page_id: &str);
}

/// Change feed for a single owner
pub struct PageSubscription {
    owner_id: String,
    receiver: broadcast::Receiver<PageChange>,
}

impl PageSubscription {
    pub fn new(owner_id: impl Into<String>, receiver: broadcast::Receiver<PageChange>) -> Self {
        Self {
            owner_id: owner_id.into(),
            receiver,
        }
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    /// Next change for this owner, `None` once the store is gone
    ///
    /// A lagging subscriber skips the dropped changes and keeps going; the
    /// consumer is expected to refresh its listing when that matters.
    pub async fn recv(&mut self) -> Option<PageChange> {
        loop {
            match self.receiver.recv().await {
                Ok(change) if change.owner_id() == self.owner_id => return Some(change),
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(
                        "Page subscription for owner '{}' lagged, {} change(s) skipped",
                        self.owner_id,
                        skipped
                    );
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Drive `handler` from this subscription on a background task
    pub fn forward_to(mut self, handler: Arc<dyn PageChangeHandler>) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(change) = self.recv().await {
                match &change {
                    PageChange::Inserted(page) => handler.on_insert(page),
                    PageChange::Updated(page) => handler.on_update(page),
                    PageChange::Deleted { id, .. } => handler.on_delete(id),
                }
            }
            tracing::debug!("Page subscription for owner '{}' closed", self.owner_id);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewPage;
    use serde_json::json;

    fn page(owner: &str) -> Page {
        Page::from_new(NewPage {
            owner_id: owner.to_string(),
            title: "Untitled".to_string(),
            slug: "untitled-1".to_string(),
            content: json!({"kind": "doc", "children": []}),
            parent_page_id: None,
        })
    }

    /// Contract test: the tag is merged into the payload, not nested
    #[test]
    fn test_page_change_serialization_contract() {
        let change = PageChange::Inserted(page("owner-1"));
        let parsed = serde_json::to_value(&change).unwrap();
        assert_eq!(parsed.get("type").unwrap(), "inserted");
        assert_eq!(parsed.get("ownerId").unwrap(), "owner-1");
        assert!(parsed.get("inserted").is_none());

        let deleted = PageChange::Deleted {
            id: "p1".to_string(),
            owner_id: "owner-1".to_string(),
        };
        let parsed = serde_json::to_value(&deleted).unwrap();
        assert_eq!(
            parsed,
            json!({"type": "deleted", "id": "p1", "ownerId": "owner-1"})
        );
    }

    #[tokio::test]
    async fn test_subscription_filters_other_owners() {
        let (tx, rx) = broadcast::channel(8);
        let mut subscription = PageSubscription::new("owner-1", rx);

        tx.send(PageChange::Inserted(page("owner-2"))).unwrap();
        tx.send(PageChange::Updated(page("owner-1"))).unwrap();
        drop(tx);

        let change = subscription.recv().await.unwrap();
        assert_eq!(change.event_type(), "page:updated");
        assert_eq!(change.owner_id(), "owner-1");
        assert!(subscription.recv().await.is_none());
    }
}

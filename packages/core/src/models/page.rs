//! Page Records
//!
//! A [`Page`] is the persisted unit a user opens in the editor. Its `content`
//! is kept in JSON form so storage backends never need to understand the
//! document tree; the codec turns it into a [`Document`](crate::models::Document)
//! at the session boundary.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::LazyLock;
use uuid::Uuid;

/// Title given to pages created without one
pub const DEFAULT_PAGE_TITLE: &str = "Untitled";

static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Anything outside letters, digits, `_` and `-`
static SLUG_UNSAFE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\p{Alphabetic}\p{Nd}_-]+").unwrap());

static DASH_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-{2,}").unwrap());

/// Derive a URL slug from a title and a timestamp in milliseconds
///
/// The title is lowercased, whitespace runs become `-` and anything that is
/// not URL-safe is dropped. The timestamp suffix keeps slugs unique per owner
/// even when two pages share a title.
///
/// # Examples
///
/// ```rust
/// use folio_core::models::generate_slug;
///
/// assert_eq!(generate_slug("Meeting Notes", 1700000000000), "meeting-notes-1700000000000");
/// assert_eq!(generate_slug("   ", 42), "untitled-42");
/// ```
pub fn generate_slug(title: &str, timestamp_ms: i64) -> String {
    let lowered = title.trim().to_lowercase();
    let dashed = WHITESPACE_RUN.replace_all(&lowered, "-");
    let safe = SLUG_UNSAFE.replace_all(&dashed, "");
    let collapsed = DASH_RUN.replace_all(&safe, "-");
    let base = collapsed.trim_matches('-');

    if base.is_empty() {
        format!("{}-{}", DEFAULT_PAGE_TITLE.to_lowercase(), timestamp_ms)
    } else {
        format!("{}-{}", base, timestamp_ms)
    }
}

/// Persisted page entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub id: String,

    pub owner_id: String,

    /// Parent page for sub-pages; deleting the parent cascades
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_page_id: Option<String>,

    pub title: String,

    /// URL-stable identifier, unique per owner
    pub slug: String,

    /// Document JSON as persisted (not validated here)
    pub content: Value,

    #[serde(default)]
    pub is_favorite: bool,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Page {
    /// Build a page record from a creation request
    pub fn from_new(new_page: NewPage) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            owner_id: new_page.owner_id,
            parent_page_id: new_page.parent_page_id,
            title: new_page.title,
            slug: new_page.slug,
            content: new_page.content,
            is_favorite: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a partial update; `updated_at` always moves forward
    pub fn apply_update(&mut self, update: &PageUpdate) {
        if let Some(title) = &update.title {
            self.title = title.clone();
        }
        if let Some(slug) = &update.slug {
            self.slug = slug.clone();
        }
        if let Some(content) = &update.content {
            self.content = content.clone();
        }
        if let Some(is_favorite) = update.is_favorite {
            self.is_favorite = is_favorite;
        }
        self.updated_at = update.updated_at.unwrap_or_else(Utc::now);
    }
}

/// Creation request for [`PageStore::create_page`](crate::db::PageStore::create_page)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPage {
    pub owner_id: String,
    pub title: String,
    pub slug: String,
    pub content: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_page_id: Option<String>,
}

impl NewPage {
    pub fn new(
        owner_id: impl Into<String>,
        title: impl Into<String>,
        slug: impl Into<String>,
        content: Value,
    ) -> Self {
        Self {
            owner_id: owner_id.into(),
            title: title.into(),
            slug: slug.into(),
            content,
            parent_page_id: None,
        }
    }

    pub fn with_parent(mut self, parent_page_id: impl Into<String>) -> Self {
        self.parent_page_id = Some(parent_page_id.into());
        self
    }
}

/// Partial page update
///
/// `None` fields are left untouched. `updated_at` defaults to the store's
/// clock when absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_favorite: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl PageUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Payload of a settled content-save window: `{title, content, updatedAt}`
    pub fn content_save(title: impl Into<String>, content: Value) -> Self {
        Self {
            title: Some(title.into()),
            content: Some(content),
            updated_at: Some(Utc::now()),
            ..Self::default()
        }
    }

    /// Payload of a settled slug window: `{slug, title}`
    pub fn slug_change(slug: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            slug: Some(slug.into()),
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn favorite(is_favorite: bool) -> Self {
        Self {
            is_favorite: Some(is_favorite),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.slug.is_none()
            && self.content.is_none()
            && self.is_favorite.is_none()
    }
}

/// How a session addresses the page it opens
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "by", content = "value", rename_all = "camelCase")]
pub enum PageIdentifier {
    ById(String),
    BySlug(String),
}

impl PageIdentifier {
    pub fn by_id(id: impl Into<String>) -> Self {
        Self::ById(id.into())
    }

    pub fn by_slug(slug: impl Into<String>) -> Self {
        Self::BySlug(slug.into())
    }
}

impl fmt::Display for PageIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ById(id) => write!(f, "id:{}", id),
            Self::BySlug(slug) => write!(f, "slug:{}", slug),
        }
    }
}

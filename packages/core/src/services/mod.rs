//! Business Services
//!
//! This module contains the page editing services:
//!
//! - `PageSession` - persistence reconciler for one open page
//! - `PageLoader` - initial fetch with bounded retry on transient errors
//! - `PageService` - page creation, listing and first-visit bootstrap
//! - `Debounce` - cancel-and-restart timer shared by the session windows
//!
//! Services coordinate between the storage layer and the editor, turning
//! store failures into session states instead of errors where they can.

pub mod debounce;
pub mod error;
pub mod page_loader;
pub mod page_service;
pub mod page_session;

pub use debounce::Debounce;
pub use error::SessionError;
pub use page_loader::{PageLoader, RetryPolicy};
pub use page_service::PageService;
pub use page_session::{
    LoadFailure, Navigator, NoopNavigator, PageSession, RedirectReason, SessionEvent,
    SessionSnapshot, SessionState,
};

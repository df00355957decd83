//! Page Session - persistence reconciler for one open page
//!
//! A session owns the in-memory document of a page and keeps the store in
//! step with it. It runs as a background actor (same shape as the embedding
//! processor: one task, one `select!` loop) so that every state change,
//! timer firing and store completion is handled sequentially.
//!
//! # Lifecycle
//!
//! ```text
//! Loading -> Ready -> Dirty -> Saving -> Ready
//!              \        \        \
//!               +--------+--------+-> Error -> Dirty (next edit)
//! Loading -> NotFound (redirect, terminal)
//! Loading -> Error    (retries exhausted, redirect, terminal)
//! any     -> Deleted  (local delete; redirect once confirmed)
//! ```
//!
//! # Timers
//!
//! Two independent [`Debounce`] windows: content edits and renames restart
//! the save window, renames also restart the slug window. A settled window
//! produces exactly one store call built from the state at that moment.
//! A save window that settles while a save is still in flight waits for it,
//! so saves for one page never overlap.
//!
//! Store calls run on spawned tasks and report back over an internal
//! channel. Closing the session cancels both timers; in-flight calls are left
//! to finish and their results are dropped.

use crate::codec;
use crate::config::SessionConfig;
use crate::db::{PageStore, StoreError};
use crate::models::{generate_slug, Document, Page, PageIdentifier, PageUpdate, Selection};
use crate::operations::{handle_line_break, CommandResult, EditorCommand};
use crate::services::{Debounce, PageLoader, SessionError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;

/// Where the reconciler stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionState {
    Loading,
    Ready,
    Dirty,
    Saving,
    Error,
    NotFound,
    Deleted,
    Closed,
}

impl SessionState {
    /// States after which the session stops reacting to edits
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::NotFound | Self::Deleted | Self::Closed)
    }
}

/// Why the session asked to navigate away
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RedirectReason {
    NotFound,
    LoadFailed,
    Deleted,
}

/// Navigation collaborator, implemented by whatever hosts the editor
pub trait Navigator: Send + Sync {
    /// Leave the page for a safe default view
    fn redirect_away(&self, reason: RedirectReason);

    /// Swap the current location to the new slug without a reload
    fn replace_slug(&self, slug: &str);
}

/// Navigator for hosts without routing
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNavigator;

impl Navigator for NoopNavigator {
    fn redirect_away(&self, reason: RedirectReason) {
        tracing::debug!("Redirect requested ({:?}) with no navigator attached", reason);
    }

    fn replace_slug(&self, _slug: &str) {}
}

/// Events broadcast to presentation layers
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SessionEvent {
    StateChanged {
        from: SessionState,
        to: SessionState,
    },
    LoadRetry {
        attempt: u32,
        delay_ms: u64,
    },
    Loaded {
        page_id: String,
    },
    Saved {
        page_id: String,
        saved_at: DateTime<Utc>,
    },
    SaveFailed {
        message: String,
    },
    SlugChanged {
        slug: String,
    },
    FavoriteChanged {
        is_favorite: bool,
    },
    Deleted {
        page_id: String,
    },
    Redirected {
        reason: RedirectReason,
    },
}

/// Load failure kept in snapshots after the session gave up
#[derive(Debug, Clone)]
pub struct LoadFailure {
    pub attempts: u32,
    pub source: Arc<StoreError>,
}

/// Point-in-time view of a session, published on every change
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub page_id: Option<String>,
    pub title: String,
    pub slug: Option<String>,
    pub document: Document,
    pub is_favorite: bool,

    /// Local edits not yet confirmed by the store
    pub dirty: bool,

    pub last_saved_at: Option<DateTime<Utc>>,

    /// A content-save window is armed
    pub save_pending: bool,

    /// A slug window is armed
    pub slug_pending: bool,

    pub load_failure: Option<LoadFailure>,
}

impl SessionSnapshot {
    fn loading() -> Self {
        Self {
            state: SessionState::Loading,
            page_id: None,
            title: String::new(),
            slug: None,
            document: Document::empty(),
            is_favorite: false,
            dirty: false,
            last_saved_at: None,
            save_pending: false,
            slug_pending: false,
            load_failure: None,
        }
    }
}

enum SessionCommand {
    UpdateContent(Document),
    ApplyCommand {
        command: EditorCommand,
        selection: Option<Selection>,
        reply: oneshot::Sender<CommandResult>,
    },
    LineBreak {
        selection: Option<Selection>,
        shift: bool,
        reply: oneshot::Sender<Option<CommandResult>>,
    },
    Rename(String),
    ToggleFavorite,
    Delete,
    Close,
}

/// Store call outcomes reported back to the actor
enum Completion {
    Saved {
        generation: u64,
        result: Result<Page, StoreError>,
    },
    SlugSaved {
        slug: String,
        result: Result<Page, StoreError>,
    },
    Favorite {
        is_favorite: bool,
        result: Result<Page, StoreError>,
    },
    Deleted {
        page_id: String,
        result: Result<(), StoreError>,
    },
}

/// Handle to a running page session
///
/// Dropping the handle closes the session the same way [`PageSession::close`]
/// does, without waiting for the actor to stop.
pub struct PageSession {
    identifier: PageIdentifier,
    command_tx: mpsc::UnboundedSender<SessionCommand>,
    snapshot_rx: watch::Receiver<SessionSnapshot>,
    event_tx: broadcast::Sender<SessionEvent>,
    task: Option<JoinHandle<()>>,
}

impl PageSession {
    /// Start a session and begin loading the page in the background
    pub fn open(
        store: Arc<dyn PageStore>,
        navigator: Arc<dyn Navigator>,
        identifier: PageIdentifier,
        config: SessionConfig,
    ) -> Result<Self, SessionError> {
        config.validate().map_err(SessionError::invalid_config)?;

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(SessionSnapshot::loading());
        let (event_tx, _) = broadcast::channel(config.event_channel_capacity);

        let actor = SessionActor {
            content_debounce: Debounce::new("content", config.save_debounce()),
            slug_debounce: Debounce::new("slug", config.slug_debounce()),
            store,
            navigator,
            config,
            identifier: identifier.clone(),
            command_rx,
            completion_tx,
            completion_rx,
            snapshot_tx,
            event_tx: event_tx.clone(),
            page: None,
            document: Document::empty(),
            title: String::new(),
            slug: None,
            is_favorite: false,
            state: SessionState::Loading,
            dirty: false,
            last_saved_at: None,
            load_failure: None,
            edit_generation: 0,
            save_in_flight: false,
            slug_in_flight: false,
        };
        let task = tokio::spawn(actor.run());

        tracing::debug!("Opened page session for {}", identifier);

        Ok(Self {
            identifier,
            command_tx,
            snapshot_rx,
            event_tx,
            task: Some(task),
        })
    }

    pub fn identifier(&self) -> &PageIdentifier {
        &self.identifier
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    pub fn state(&self) -> SessionState {
        self.snapshot_rx.borrow().state
    }

    /// Receiver that sees every published snapshot
    pub fn watch(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot_rx.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }

    /// Wait for the load to settle
    ///
    /// # Errors
    ///
    /// - `NotFound` when the page does not exist
    /// - `LoadFailed` when every allowed attempt failed
    pub async fn wait_until_loaded(&self) -> Result<SessionSnapshot, SessionError> {
        let mut rx = self.snapshot_rx.clone();
        let snapshot = rx
            .wait_for(|snapshot| snapshot.state != SessionState::Loading)
            .await
            .map_err(|_| SessionError::SessionClosed)?
            .clone();

        if let Some(failure) = &snapshot.load_failure {
            return Err(SessionError::LoadFailed {
                attempts: failure.attempts,
                source: failure.source.clone(),
            });
        }
        if snapshot.state == SessionState::NotFound {
            return Err(SessionError::not_found(&self.identifier));
        }
        Ok(snapshot)
    }

    /// Replace the document with the editor's current tree
    pub fn update_content(&self, document: Document) -> Result<(), SessionError> {
        self.send(SessionCommand::UpdateContent(document))
    }

    /// Replace the document from raw editor JSON, substituting the empty
    /// document when it fails the validity gate
    pub fn update_content_json(&self, content: &Value) -> Result<(), SessionError> {
        self.update_content(codec::decode(content))
    }

    pub async fn apply_command(
        &self,
        command: EditorCommand,
        selection: Option<Selection>,
    ) -> Result<CommandResult, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::ApplyCommand {
            command,
            selection,
            reply,
        })?;
        rx.await.map_err(|_| SessionError::SessionClosed)
    }

    /// Enter handling; `None` means the host should insert a plain break
    pub async fn handle_line_break(
        &self,
        selection: Option<Selection>,
        shift: bool,
    ) -> Result<Option<CommandResult>, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::LineBreak {
            selection,
            shift,
            reply,
        })?;
        rx.await.map_err(|_| SessionError::SessionClosed)
    }

    pub fn rename(&self, title: impl Into<String>) -> Result<(), SessionError> {
        self.send(SessionCommand::Rename(title.into()))
    }

    pub fn toggle_favorite(&self) -> Result<(), SessionError> {
        self.send(SessionCommand::ToggleFavorite)
    }

    pub fn delete(&self) -> Result<(), SessionError> {
        self.send(SessionCommand::Delete)
    }

    /// Stop the session, cancelling pending windows
    pub async fn close(mut self) {
        let _ = self.command_tx.send(SessionCommand::Close);
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::error!("Page session task failed: {}", e);
            }
        }
    }

    fn send(&self, command: SessionCommand) -> Result<(), SessionError> {
        self.command_tx
            .send(command)
            .map_err(|_| SessionError::SessionClosed)
    }
}

impl Drop for PageSession {
    fn drop(&mut self) {
        let _ = self.command_tx.send(SessionCommand::Close);
    }
}

struct SessionActor {
    store: Arc<dyn PageStore>,
    navigator: Arc<dyn Navigator>,
    config: SessionConfig,
    identifier: PageIdentifier,

    command_rx: mpsc::UnboundedReceiver<SessionCommand>,
    completion_tx: mpsc::UnboundedSender<Completion>,
    completion_rx: mpsc::UnboundedReceiver<Completion>,
    snapshot_tx: watch::Sender<SessionSnapshot>,
    event_tx: broadcast::Sender<SessionEvent>,

    content_debounce: Debounce,
    slug_debounce: Debounce,

    /// Last page record confirmed by the store
    page: Option<Page>,
    document: Document,
    title: String,
    slug: Option<String>,
    is_favorite: bool,
    state: SessionState,
    dirty: bool,
    last_saved_at: Option<DateTime<Utc>>,
    load_failure: Option<LoadFailure>,

    /// Bumped on every local edit; a save only clears `dirty` if no edit
    /// landed while it was in flight
    edit_generation: u64,
    save_in_flight: bool,
    slug_in_flight: bool,
}

impl SessionActor {
    async fn run(mut self) {
        let Some(deferred) = self.load().await else {
            return;
        };
        for command in deferred {
            self.handle_command(command);
        }
        self.publish();

        loop {
            tokio::select! {
                biased;

                Some(completion) = self.completion_rx.recv() => {
                    if self.handle_completion(completion) {
                        break;
                    }
                }

                command = self.command_rx.recv() => match command {
                    Some(SessionCommand::Close) | None => break,
                    Some(command) => self.handle_command(command),
                },

                _ = self.content_debounce.elapsed(), if !self.save_in_flight => {
                    self.start_save();
                }

                _ = self.slug_debounce.elapsed(), if !self.slug_in_flight => {
                    self.start_slug_update();
                }
            }

            self.publish();
        }

        self.shutdown();
    }

    /// Load the page while still listening for a close
    ///
    /// Edits that arrive during the load are handed back to run after it.
    /// Returns `None` when the session cannot continue; a session closed or
    /// dropped mid-load abandons the load without redirecting.
    async fn load(&mut self) -> Option<Vec<SessionCommand>> {
        let loader = PageLoader::new(self.store.clone(), self.config.retry_policy());
        let identifier = self.identifier.clone();
        let event_tx = self.event_tx.clone();
        let load = async move {
            loader
                .load_with(&identifier, |attempt, delay| {
                    let _ = event_tx.send(SessionEvent::LoadRetry {
                        attempt,
                        delay_ms: u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    });
                })
                .await
        };
        tokio::pin!(load);

        let mut deferred = Vec::new();
        let result = loop {
            tokio::select! {
                biased;

                command = self.command_rx.recv() => match command {
                    Some(SessionCommand::Close) | None => {
                        tracing::debug!("Page session {} closed while loading", self.identifier);
                        self.shutdown();
                        return None;
                    }
                    Some(command) => deferred.push(command),
                },

                result = &mut load => break result,
            }
        };

        match result {
            Ok(page) => {
                self.adopt(page);
                Some(deferred)
            }
            Err(SessionError::NotFound { identifier }) => {
                tracing::info!("Page {} not found, redirecting", identifier);
                self.set_state(SessionState::NotFound);
                self.redirect(RedirectReason::NotFound);
                self.publish();
                None
            }
            Err(e) => {
                tracing::error!("Giving up on page {}: {}", self.identifier, e);
                if let SessionError::LoadFailed { attempts, source } = e {
                    self.load_failure = Some(LoadFailure { attempts, source });
                }
                self.set_state(SessionState::Error);
                self.redirect(RedirectReason::LoadFailed);
                self.publish();
                None
            }
        }
    }

    fn adopt(&mut self, page: Page) {
        self.document = codec::decode(&page.content);
        self.title = page.title.clone();
        self.slug = Some(page.slug.clone());
        self.is_favorite = page.is_favorite;
        self.last_saved_at = Some(page.updated_at);

        tracing::info!("Loaded page '{}' ({})", page.title, page.id);
        self.emit_event(SessionEvent::Loaded {
            page_id: page.id.clone(),
        });

        self.page = Some(page);
        self.set_state(SessionState::Ready);
        self.publish();
    }

    fn handle_command(&mut self, command: SessionCommand) {
        if self.state == SessionState::Deleted {
            match command {
                SessionCommand::ApplyCommand {
                    command,
                    selection,
                    reply,
                } => {
                    tracing::debug!("Ignoring {} on a deleted page", command);
                    let _ = reply.send(CommandResult {
                        document: self.document.clone(),
                        selection,
                        applied: false,
                    });
                }
                SessionCommand::LineBreak { reply, .. } => {
                    let _ = reply.send(None);
                }
                _ => tracing::debug!("Ignoring edit on a deleted page"),
            }
            return;
        }

        match command {
            SessionCommand::UpdateContent(document) => {
                if document != self.document {
                    self.document = document;
                    self.mark_edited();
                }
            }

            SessionCommand::ApplyCommand {
                command,
                selection,
                reply,
            } => {
                let result = command.apply(&self.document, selection.as_ref());
                if result.applied {
                    self.document = result.document.clone();
                    self.mark_edited();
                }
                let _ = reply.send(result);
            }

            SessionCommand::LineBreak {
                selection,
                shift,
                reply,
            } => {
                let result = handle_line_break(&self.document, selection.as_ref(), shift);
                if let Some(result) = &result {
                    self.document = result.document.clone();
                    self.mark_edited();
                }
                let _ = reply.send(result);
            }

            SessionCommand::Rename(title) => {
                if title != self.title {
                    self.title = title;
                    self.slug_debounce.restart();
                    self.mark_edited();
                }
            }

            SessionCommand::ToggleFavorite => self.toggle_favorite(),

            SessionCommand::Delete => self.delete(),

            // Handled by the run loop
            SessionCommand::Close => {}
        }
    }

    fn mark_edited(&mut self) {
        self.edit_generation += 1;
        self.dirty = true;
        self.content_debounce.restart();
        if self.state != SessionState::Saving {
            self.set_state(SessionState::Dirty);
        }
    }

    fn start_save(&mut self) {
        let Some(page_id) = self.page_id() else {
            return;
        };
        if !self.dirty {
            return;
        }

        let content = match codec::encode(&self.document) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!("Could not encode page {} for saving: {}", page_id, e);
                self.set_state(SessionState::Error);
                return;
            }
        };

        let update = PageUpdate::content_save(self.title.clone(), content);
        let generation = self.edit_generation;
        self.save_in_flight = true;
        self.set_state(SessionState::Saving);

        let store = self.store.clone();
        let completion_tx = self.completion_tx.clone();
        tokio::spawn(async move {
            let result = store.save_page(&page_id, update).await;
            let _ = completion_tx.send(Completion::Saved { generation, result });
        });
    }

    fn start_slug_update(&mut self) {
        let Some(page_id) = self.page_id() else {
            return;
        };

        let slug = generate_slug(&self.title, Utc::now().timestamp_millis());
        let update = PageUpdate::slug_change(slug.clone(), self.title.clone());
        self.slug_in_flight = true;

        let store = self.store.clone();
        let completion_tx = self.completion_tx.clone();
        tokio::spawn(async move {
            let result = store.save_page(&page_id, update).await;
            let _ = completion_tx.send(Completion::SlugSaved { slug, result });
        });
    }

    fn toggle_favorite(&mut self) {
        let Some(page_id) = self.page_id() else {
            return;
        };

        self.is_favorite = !self.is_favorite;
        let is_favorite = self.is_favorite;
        self.emit_event(SessionEvent::FavoriteChanged { is_favorite });

        let store = self.store.clone();
        let completion_tx = self.completion_tx.clone();
        tokio::spawn(async move {
            let result = store
                .save_page(&page_id, PageUpdate::favorite(is_favorite))
                .await;
            let _ = completion_tx.send(Completion::Favorite {
                is_favorite,
                result,
            });
        });
    }

    fn delete(&mut self) {
        let Some(page_id) = self.page_id() else {
            return;
        };

        self.content_debounce.cancel();
        self.slug_debounce.cancel();
        self.set_state(SessionState::Deleted);

        let store = self.store.clone();
        let completion_tx = self.completion_tx.clone();
        tokio::spawn(async move {
            let result = store.delete_page(&page_id).await;
            let _ = completion_tx.send(Completion::Deleted { page_id, result });
        });
    }

    /// Returns true when the session is finished
    fn handle_completion(&mut self, completion: Completion) -> bool {
        match completion {
            Completion::Saved { generation, result } => {
                self.save_in_flight = false;
                self.finish_save(generation, result);
            }

            Completion::SlugSaved { slug, result } => {
                self.slug_in_flight = false;
                match result {
                    Ok(page) => {
                        tracing::debug!("Page {} moved to slug '{}'", page.id, slug);
                        self.slug = Some(slug.clone());
                        self.navigator.replace_slug(&slug);
                        self.emit_event(SessionEvent::SlugChanged { slug });
                        self.page = Some(page);
                    }
                    Err(e) => {
                        tracing::warn!("Slug update to '{}' failed: {}", slug, e);
                    }
                }
            }

            Completion::Favorite {
                is_favorite,
                result,
            } => match result {
                Ok(page) => {
                    tracing::debug!("Page {} favorite set to {}", page.id, is_favorite);
                }
                Err(e) => {
                    tracing::warn!(
                        "Favorite toggle to {} failed, local state not rolled back: {}",
                        is_favorite,
                        e
                    );
                }
            },

            Completion::Deleted { page_id, result } => match result {
                Ok(()) => {
                    tracing::info!("Deleted page {}", page_id);
                    self.emit_event(SessionEvent::Deleted { page_id });
                    self.redirect(RedirectReason::Deleted);
                    return true;
                }
                Err(e) => {
                    tracing::warn!(
                        "Delete of page {} failed, local state not rolled back: {}",
                        page_id,
                        e
                    );
                }
            },
        }
        false
    }

    fn finish_save(&mut self, generation: u64, result: Result<Page, StoreError>) {
        let superseded = generation != self.edit_generation;

        match result {
            Ok(page) => {
                tracing::info!("Saved page {}", page.id);
                self.last_saved_at = Some(page.updated_at);
                self.emit_event(SessionEvent::Saved {
                    page_id: page.id.clone(),
                    saved_at: page.updated_at,
                });
                self.page = Some(page);

                if self.state == SessionState::Deleted {
                    return;
                }
                if superseded {
                    self.set_state(SessionState::Dirty);
                } else {
                    self.dirty = false;
                    self.set_state(SessionState::Ready);
                }
            }
            Err(e) => {
                tracing::warn!("Save of page {} failed: {}", self.identifier, e);
                self.emit_event(SessionEvent::SaveFailed {
                    message: e.to_string(),
                });

                if self.state != SessionState::Deleted {
                    self.set_state(SessionState::Dirty);
                }
            }
        }
    }

    fn shutdown(&mut self) {
        self.content_debounce.cancel();
        self.slug_debounce.cancel();
        if self.dirty {
            tracing::debug!("Closing page session with unsaved edits");
        }
        if self.state != SessionState::Deleted {
            self.set_state(SessionState::Closed);
        }
        self.publish();
    }

    fn page_id(&self) -> Option<String> {
        self.page.as_ref().map(|page| page.id.clone())
    }

    fn redirect(&self, reason: RedirectReason) {
        self.navigator.redirect_away(reason);
        self.emit_event(SessionEvent::Redirected { reason });
    }

    fn set_state(&mut self, state: SessionState) {
        if self.state != state {
            tracing::debug!("Page session {}: {:?} -> {:?}", self.identifier, self.state, state);
            self.emit_event(SessionEvent::StateChanged {
                from: self.state,
                to: state,
            });
            self.state = state;
        }
    }

    /// Ignores errors if no subscribers
    fn emit_event(&self, event: SessionEvent) {
        let _ = self.event_tx.send(event);
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(SessionSnapshot {
            state: self.state,
            page_id: self.page_id(),
            title: self.title.clone(),
            slug: self.slug.clone(),
            document: self.document.clone(),
            is_favorite: self.is_favorite,
            dirty: self.dirty,
            last_saved_at: self.last_saved_at,
            save_pending: self.content_debounce.is_pending(),
            slug_pending: self.slug_debounce.is_pending(),
            load_failure: self.load_failure.clone(),
        });
    }
}

#[cfg(test)]
#[path = "page_session_test.rs"]
mod page_session_test;

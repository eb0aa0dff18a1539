//! The owner task that keeps one document in sync with its text.
//!
//! All state lives in a single tokio task. Edits, timer ticks, highlight
//! results and front-end commands arrive on one channel and are handled one at
//! a time, to completion. Highlight scans run on the rayon pool and come back
//! through the same channel; nothing off the owner task touches the document.
//!
//! Front ends read state through two `watch` channels: document snapshots
//! after every refresh or command, and the newest applied style spans.

use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::config::SyncConfig;
use crate::document::DocumentState;
use crate::error::SyncError;
use crate::highlight::{HighlightResult, Highlighter, StyleSpans};
use crate::path::Path;
use crate::scheduler::{Channel, Debouncer, Tick};
use crate::search::FilterQuery;
use crate::text::{SubscriptionId, TextSource};
use crate::types::{TreeNode, Validity};

pub type Query = Box<dyn FnOnce(&DocumentState) + Send>;

pub enum Command {
    SetFilter(FilterQuery),
    Select(Path),
    SetExpanded(Path, bool),
    ExpandAll,
    CollapseAll,
    /// The collaborator saved (or loaded) this text.
    MarkSaved(String),
    /// Refresh right away instead of waiting for the debounce window.
    Refresh,
    Format(oneshot::Sender<Result<(), SyncError>>),
    Query(Query),
    Shutdown,
}

pub enum SessionEvent {
    TextChanged,
    Tick(Tick),
    Highlighted(HighlightResult),
    Command(Command),
}

impl From<Tick> for SessionEvent {
    fn from(tick: Tick) -> Self {
        SessionEvent::Tick(tick)
    }
}

/// Where the last successful node selection moved the caret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub path: Path,
    pub offset: usize,
}

#[derive(Debug, Clone)]
pub struct DocumentSnapshot {
    pub view: Option<Arc<TreeNode>>,
    pub validity: Validity,
    pub dirty: bool,
    pub refreshes: u64,
    pub filter: String,
    pub last_navigation: Option<Navigation>,
}

impl DocumentSnapshot {
    fn capture(doc: &DocumentState, last_navigation: Option<Navigation>) -> Self {
        Self {
            view: doc.view().cloned(),
            validity: doc.validity().clone(),
            dirty: doc.is_dirty(),
            refreshes: doc.refresh_count(),
            filter: doc.filter().term.clone(),
            last_navigation,
        }
    }

    pub fn status_text(&self) -> String {
        self.validity.status_text()
    }
}

/// Cheap, cloneable way to send commands to a running session.
#[derive(Clone)]
pub struct SessionHandle {
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl SessionHandle {
    fn send(&self, command: Command) -> Result<(), SyncError> {
        self.events
            .send(SessionEvent::Command(command))
            .map_err(|_| SyncError::SessionClosed)
    }

    pub fn set_filter(&self, query: impl Into<FilterQuery>) -> Result<(), SyncError> {
        self.send(Command::SetFilter(query.into()))
    }

    pub fn clear_filter(&self) -> Result<(), SyncError> {
        self.set_filter(FilterQuery::default())
    }

    /// Moves the caret to the node at `path`. Silently does nothing if the
    /// node can't be located in the text.
    pub fn select(&self, path: Path) -> Result<(), SyncError> {
        self.send(Command::Select(path))
    }

    pub fn set_expanded(&self, path: Path, expanded: bool) -> Result<(), SyncError> {
        self.send(Command::SetExpanded(path, expanded))
    }

    pub fn expand_all(&self) -> Result<(), SyncError> {
        self.send(Command::ExpandAll)
    }

    pub fn collapse_all(&self) -> Result<(), SyncError> {
        self.send(Command::CollapseAll)
    }

    pub fn mark_saved(&self, text: impl Into<String>) -> Result<(), SyncError> {
        self.send(Command::MarkSaved(text.into()))
    }

    pub fn refresh(&self) -> Result<(), SyncError> {
        self.send(Command::Refresh)
    }

    /// Pretty-prints the current text in place.
    pub async fn format(&self) -> Result<(), SyncError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Format(tx))?;
        rx.await.map_err(|_| SyncError::SessionClosed)?
    }

    /// Runs `f` against the document on the owner task.
    pub async fn query<R, F>(&self, f: F) -> Result<R, SyncError>
    where
        R: Send + 'static,
        F: FnOnce(&DocumentState) -> R + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Query(Box::new(move |doc| {
            let _ = tx.send(f(doc));
        })))?;
        rx.await.map_err(|_| SyncError::SessionClosed)
    }

    pub fn shutdown(&self) -> Result<(), SyncError> {
        self.send(Command::Shutdown)
    }
}

pub struct Session {
    handle: SessionHandle,
    snapshots: watch::Receiver<DocumentSnapshot>,
    highlights: watch::Receiver<Arc<StyleSpans>>,
    task: JoinHandle<()>,
}

impl Session {
    /// Loads the source's current text and starts the owner task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(source: Arc<dyn TextSource>, config: SyncConfig) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let listener_tx = events_tx.clone();
        let subscription = source.subscribe(Box::new(move || {
            let _ = listener_tx.send(SessionEvent::TextChanged);
        }));

        let doc = DocumentState::load(&source.text());
        let (snapshots_tx, snapshots) = watch::channel(DocumentSnapshot::capture(&doc, None));
        let (highlights_tx, highlights) = watch::channel(Arc::new(StyleSpans::default()));

        let mut owner = Owner {
            refresh: Debouncer::new(Channel::Refresh, config.refresh_debounce(), events_tx.clone()),
            highlight: Debouncer::new(Channel::Highlight, config.highlight_debounce(), events_tx.clone()),
            highlighter: Highlighter::new(),
            events: events_tx.clone(),
            last_navigation: None,
            subscription,
            snapshots: snapshots_tx,
            highlights: highlights_tx,
            source,
            config,
            doc,
        };
        owner.submit_highlight();
        let task = tokio::spawn(owner.run(events_rx));

        Self {
            handle: SessionHandle { events: events_tx },
            snapshots,
            highlights,
            task,
        }
    }

    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    pub fn snapshots(&self) -> watch::Receiver<DocumentSnapshot> {
        self.snapshots.clone()
    }

    pub fn highlights(&self) -> watch::Receiver<Arc<StyleSpans>> {
        self.highlights.clone()
    }

    /// Stops the owner task and waits for it to finish.
    pub async fn shutdown(mut self) {
        let _ = self.handle.shutdown();
        let _ = (&mut self.task).await;
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        // no-op if the owner already stopped
        let _ = self.handle.shutdown();
    }
}

struct Owner {
    source: Arc<dyn TextSource>,
    config: SyncConfig,
    doc: DocumentState,
    refresh: Debouncer<SessionEvent>,
    highlight: Debouncer<SessionEvent>,
    highlighter: Highlighter,
    events: mpsc::UnboundedSender<SessionEvent>,
    last_navigation: Option<Navigation>,
    subscription: SubscriptionId,
    snapshots: watch::Sender<DocumentSnapshot>,
    highlights: watch::Sender<Arc<StyleSpans>>,
}

impl Owner {
    async fn run(mut self, mut events: mpsc::UnboundedReceiver<SessionEvent>) {
        while let Some(event) = events.recv().await {
            match event {
                SessionEvent::TextChanged => {
                    self.refresh.poke();
                    self.highlight.poke();
                }
                SessionEvent::Tick(tick) => self.on_tick(tick),
                SessionEvent::Highlighted(result) => {
                    if self.highlighter.accept(&result) {
                        self.highlights.send_replace(result.spans);
                    }
                }
                SessionEvent::Command(Command::Shutdown) => break,
                SessionEvent::Command(command) => self.on_command(command),
            }
        }
        self.source.unsubscribe(self.subscription);
        self.refresh.cancel();
        self.highlight.cancel();
        tracing::debug!("session stopped");
    }

    fn on_tick(&mut self, tick: Tick) {
        match tick.channel {
            Channel::Refresh if self.refresh.is_current(&tick) => self.refresh_now(),
            Channel::Highlight if self.highlight.is_current(&tick) => self.submit_highlight(),
            _ => tracing::trace!(?tick, "ignoring superseded tick"),
        }
    }

    fn refresh_now(&mut self) {
        let text = self.source.text();
        self.doc.refresh(&text);
        self.publish();
    }

    fn submit_highlight(&mut self) {
        let events = self.events.clone();
        self.highlighter.submit(self.source.text(), move |result| {
            let _ = events.send(SessionEvent::Highlighted(result));
        });
    }

    fn on_command(&mut self, command: Command) {
        match command {
            Command::SetFilter(query) => self.doc.set_filter(query),
            Command::Select(path) => {
                let text = self.source.text();
                let Some(offset) = self.doc.resolve_selection(&text, &path) else {
                    return;
                };
                self.source.move_caret(offset);
                self.last_navigation = Some(Navigation { path, offset });
            }
            Command::SetExpanded(path, expanded) => {
                self.doc.set_expanded(&path, expanded);
            }
            Command::ExpandAll => self.doc.expand_all(),
            Command::CollapseAll => self.doc.collapse_all(),
            Command::MarkSaved(text) => self.doc.set_saved_checksum(&text),
            Command::Refresh => {
                self.refresh.cancel();
                self.doc.refresh(&self.source.text());
            }
            Command::Format(reply) => {
                let result = self
                    .doc
                    .format(&self.source.text(), self.config.indent)
                    .map(|formatted| self.source.replace_text(&formatted));
                let _ = reply.send(result);
                return;
            }
            Command::Query(query) => {
                query(&self.doc);
                return;
            }
            Command::Shutdown => return,
        }
        self.publish();
    }

    fn publish(&self) {
        self.snapshots
            .send_replace(DocumentSnapshot::capture(&self.doc, self.last_navigation.clone()));
    }
}

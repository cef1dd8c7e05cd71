//! Window runtime
//!
//! Each window is a single task that owns its store, filter state and lookup
//! session. Commands from the owner, envelopes from the event channel and
//! engine settlements are processed one at a time, so nothing inside a window
//! needs locking. Windows share nothing but the channel.

pub mod manager;

pub use manager::{OverlayGeometry, OverlayManager, WindowManager};

use crate::channel::{ChannelEvent, Envelope, EventChannel, EventSink, Subscription, WindowLabel};
use crate::error::{Result, TelescopeError};
use crate::filters::{DisplaySelection, FilterCounts, FilterState, GroupSelector};
use crate::intel::{CapabilityTag, PilotIntelRecord, ThreatLevel};
use crate::session::{
    has_names, LookupEngine, LookupEvents, LookupProgress, LookupSession, ProgressOutcome,
    SessionId, SessionStatus,
};
use crate::store::SortedResultStore;
use crate::sync::{ApplyOutcome, ResyncResponder, ResyncScope, SyncedFilters};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

const COMMAND_BUFFER: usize = 64;
const POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowRole {
    /// Runs lookups and answers sync requests
    Primary,
    /// Follows the primary; requests a resync when it starts
    Overlay,
}

#[derive(Debug, Clone)]
pub struct WindowOptions {
    pub label: WindowLabel,
    pub role: WindowRole,
    /// Scope asked for in sync requests
    pub resync_scope: ResyncScope,
    /// Start a lookup when names are pasted
    pub auto_scan: bool,
}

impl WindowOptions {
    pub fn primary(label: impl Into<String>) -> Self {
        Self {
            label: WindowLabel::new(label),
            role: WindowRole::Primary,
            resync_scope: ResyncScope::Full,
            auto_scan: true,
        }
    }

    pub fn overlay(label: impl Into<String>, resync_scope: ResyncScope) -> Self {
        Self {
            label: WindowLabel::new(label),
            role: WindowRole::Overlay,
            resync_scope,
            auto_scan: false,
        }
    }

    pub fn with_auto_scan(mut self, auto_scan: bool) -> Self {
        self.auto_scan = auto_scan;
        self
    }
}

/// Commands accepted by a window task
#[derive(Debug)]
pub enum WindowCommand {
    /// `None` looks up the names currently in the input
    StartLookup {
        names_text: Option<String>,
        reply: oneshot::Sender<Option<SessionId>>,
    },
    /// Names arriving from the clipboard shortcut
    Paste {
        text: String,
        reply: oneshot::Sender<Option<SessionId>>,
    },
    ToggleThreat(ThreatLevel),
    ToggleTag(CapabilityTag),
    ToggleCorporation(GroupSelector),
    ToggleAlliance(GroupSelector),
    ClearFilters,
    RequestSync,
    /// Empty this window's results; the primary also clears the overlay
    ClearDisplay,
    /// Ask the primary to close this overlay
    RequestClose,
    ToggleOverlay(oneshot::Sender<Result<bool>>),
    Snapshot(oneshot::Sender<WindowSnapshot>),
    Shutdown(oneshot::Sender<()>),
}

/// Point-in-time copy of a window's state
#[derive(Debug, Clone, Serialize)]
pub struct WindowSnapshot {
    pub label: WindowLabel,
    pub role: WindowRole,
    pub session: Option<SessionId>,
    pub status: SessionStatus,
    pub loading: bool,
    /// A sync request is still waiting for its reply
    pub syncing: bool,
    pub progress: Option<LookupProgress>,
    pub error: Option<String>,
    pub names_text: String,
    /// Every record, in store order
    pub records: Vec<PilotIntelRecord>,
    /// Records passing the current filters, in store order
    pub visible: Vec<PilotIntelRecord>,
    pub filters: FilterState,
    pub display: DisplaySelection,
    pub counts: FilterCounts,
}

impl WindowSnapshot {
    pub fn ids(&self) -> Vec<i64> {
        self.records.iter().map(|r| r.id()).collect()
    }

    pub fn visible_ids(&self) -> Vec<i64> {
        self.visible.iter().map(|r| r.id()).collect()
    }
}

/// Cloneable handle to a running window
#[derive(Clone)]
pub struct WindowHandle {
    label: WindowLabel,
    role: WindowRole,
    tx: mpsc::Sender<WindowCommand>,
}

impl WindowHandle {
    pub fn label(&self) -> &WindowLabel {
        &self.label
    }

    pub fn role(&self) -> WindowRole {
        self.role
    }

    /// True once the window task has exited
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    pub async fn start_lookup(&self, names_text: impl Into<String>) -> Result<Option<SessionId>> {
        let names_text = Some(names_text.into());
        self.request(|reply| WindowCommand::StartLookup { names_text, reply })
            .await
    }

    /// Look up the names already in the input again
    pub async fn rescan(&self) -> Result<Option<SessionId>> {
        self.request(|reply| WindowCommand::StartLookup {
            names_text: None,
            reply,
        })
        .await
    }

    pub async fn paste(&self, text: impl Into<String>) -> Result<Option<SessionId>> {
        let text = text.into();
        self.request(|reply| WindowCommand::Paste { text, reply })
            .await
    }

    pub async fn toggle_threat(&self, level: ThreatLevel) -> Result<()> {
        self.send(WindowCommand::ToggleThreat(level)).await
    }

    pub async fn toggle_tag(&self, tag: CapabilityTag) -> Result<()> {
        self.send(WindowCommand::ToggleTag(tag)).await
    }

    pub async fn toggle_corporation(&self, selector: GroupSelector) -> Result<()> {
        self.send(WindowCommand::ToggleCorporation(selector)).await
    }

    pub async fn toggle_alliance(&self, selector: GroupSelector) -> Result<()> {
        self.send(WindowCommand::ToggleAlliance(selector)).await
    }

    pub async fn clear_filters(&self) -> Result<()> {
        self.send(WindowCommand::ClearFilters).await
    }

    pub async fn request_sync(&self) -> Result<()> {
        self.send(WindowCommand::RequestSync).await
    }

    pub async fn clear_display(&self) -> Result<()> {
        self.send(WindowCommand::ClearDisplay).await
    }

    pub async fn request_close(&self) -> Result<()> {
        self.send(WindowCommand::RequestClose).await
    }

    /// Open or close the overlay through this window's manager
    pub async fn toggle_overlay(&self) -> Result<bool> {
        self.request(WindowCommand::ToggleOverlay).await?
    }

    pub async fn snapshot(&self) -> Result<WindowSnapshot> {
        self.request(WindowCommand::Snapshot).await
    }

    /// Stop the window task and wait for it to exit
    pub async fn shutdown(&self) -> Result<()> {
        self.request(WindowCommand::Shutdown).await
    }

    /// Poll until `predicate` holds for a snapshot or `timeout` elapses
    pub async fn wait_until<F>(&self, timeout: Duration, predicate: F) -> Result<WindowSnapshot>
    where
        F: Fn(&WindowSnapshot) -> bool,
    {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let snapshot = self.snapshot().await?;
            if predicate(&snapshot) {
                return Ok(snapshot);
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(TelescopeError::Window(format!(
                    "Timed out waiting for window {}",
                    self.label
                )));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Wait for the current lookup to settle
    pub async fn wait_settled(&self, timeout: Duration) -> Result<WindowSnapshot> {
        self.wait_until(timeout, |s| !s.loading).await
    }

    async fn send(&self, command: WindowCommand) -> Result<()> {
        self.tx
            .send(command)
            .await
            .map_err(|_| TelescopeError::Window(format!("Window {} is closed", self.label)))
    }

    async fn request<T, F>(&self, command: F) -> Result<T>
    where
        F: FnOnce(oneshot::Sender<T>) -> WindowCommand,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(command(reply_tx)).await?;
        reply_rx.await.map_err(|_| {
            TelescopeError::Window(format!("Window {} dropped the request", self.label))
        })
    }
}

/// Spawn a window task on the shared channel.
///
/// The window subscribes before this returns, so it sees every message
/// published afterwards. An overlay publishes its sync request on start.
pub fn spawn_window(
    options: WindowOptions,
    channel: &EventChannel,
    engine: Option<Arc<dyn LookupEngine>>,
    manager: Option<Arc<dyn WindowManager>>,
) -> WindowHandle {
    let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
    let subscription = channel.subscribe();
    let handle = WindowHandle {
        label: options.label.clone(),
        role: options.role,
        tx,
    };

    let (settle_tx, settle_rx) = mpsc::unbounded_channel();
    let runtime = WindowRuntime::new(options, Arc::new(channel.clone()), engine, manager, settle_tx);
    tokio::spawn(runtime.run(rx, subscription, settle_rx));

    handle
}

type Settlement = (SessionId, std::result::Result<(), String>);

struct WindowRuntime {
    options: WindowOptions,
    sink: Arc<dyn EventSink>,
    engine: Option<Arc<dyn LookupEngine>>,
    manager: Option<Arc<dyn WindowManager>>,
    store: SortedResultStore,
    filters: SyncedFilters,
    session: LookupSession,
    responder: ResyncResponder,
    names_text: String,
    awaiting_sync: bool,
    /// Results that arrived while a sync reply was outstanding
    pending: Vec<(SessionId, PilotIntelRecord)>,
    settle_tx: mpsc::UnboundedSender<Settlement>,
}

impl WindowRuntime {
    fn new(
        options: WindowOptions,
        sink: Arc<dyn EventSink>,
        engine: Option<Arc<dyn LookupEngine>>,
        manager: Option<Arc<dyn WindowManager>>,
        settle_tx: mpsc::UnboundedSender<Settlement>,
    ) -> Self {
        Self {
            filters: SyncedFilters::new(options.label.clone(), sink.clone()),
            responder: ResyncResponder::new(options.label.clone(), sink.clone()),
            options,
            sink,
            engine,
            manager,
            store: SortedResultStore::new(),
            session: LookupSession::new(),
            names_text: String::new(),
            awaiting_sync: false,
            pending: Vec::new(),
            settle_tx,
        }
    }

    fn label(&self) -> &WindowLabel {
        &self.options.label
    }

    async fn run(
        mut self,
        mut commands: mpsc::Receiver<WindowCommand>,
        mut subscription: Subscription,
        mut settlements: mpsc::UnboundedReceiver<Settlement>,
    ) {
        tracing::debug!("Window {} started ({:?})", self.label(), self.options.role);
        if self.options.role == WindowRole::Overlay {
            self.request_sync();
        }

        loop {
            // Envelopes first: a settlement or snapshot never overtakes
            // results already queued on the channel
            tokio::select! {
                biased;

                Some(envelope) = subscription.recv() => {
                    self.handle_envelope(&envelope).await;
                }

                Some((session, outcome)) = settlements.recv() => {
                    self.handle_settled(session, outcome);
                }

                command = commands.recv() => match command {
                    Some(WindowCommand::Shutdown(reply)) => {
                        let _ = reply.send(());
                        break;
                    }
                    Some(command) => self.handle_command(command).await,
                    None => break,
                },
            }
        }

        tracing::debug!("Window {} stopped", self.label());
    }

    async fn handle_command(&mut self, command: WindowCommand) {
        match command {
            WindowCommand::StartLookup { names_text, reply } => {
                if let Some(text) = names_text {
                    self.names_text = text;
                }
                let session = self.start_lookup();
                let _ = reply.send(session);
            }
            WindowCommand::Paste { text, reply } => {
                self.names_text = text;
                let session = if self.options.auto_scan {
                    self.start_lookup()
                } else {
                    None
                };
                let _ = reply.send(session);
            }
            WindowCommand::ToggleThreat(level) => self.filters.toggle_threat(level),
            WindowCommand::ToggleTag(tag) => self.filters.toggle_tag(tag),
            WindowCommand::ToggleCorporation(selector) => {
                if !self.filters.toggle_corporation(&selector, &self.store) {
                    tracing::debug!("No corporation matches {:?}", selector);
                }
            }
            WindowCommand::ToggleAlliance(selector) => {
                if !self.filters.toggle_alliance(&selector, &self.store) {
                    tracing::debug!("No alliance matches {:?}", selector);
                }
            }
            WindowCommand::ClearFilters => self.filters.clear_all(),
            WindowCommand::RequestSync => self.request_sync(),
            WindowCommand::ClearDisplay => {
                self.store.clear();
                if self.options.role == WindowRole::Primary {
                    self.sink.publish(self.label(), ChannelEvent::OverlayClear);
                }
            }
            WindowCommand::RequestClose => {
                self.sink
                    .publish(self.label(), ChannelEvent::OverlayCloseRequest);
            }
            WindowCommand::ToggleOverlay(reply) => {
                let result = match &self.manager {
                    Some(manager) => manager.toggle_overlay().await,
                    None => Err(TelescopeError::Window(format!(
                        "Window {} has no window manager",
                        self.label()
                    ))),
                };
                let _ = reply.send(result);
            }
            WindowCommand::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
            }
            WindowCommand::Shutdown(reply) => {
                let _ = reply.send(());
            }
        }
    }

    /// Reset and start a new session for the names in the input
    fn start_lookup(&mut self) -> Option<SessionId> {
        if !has_names(&self.names_text) {
            tracing::debug!("Ignoring lookup with no names");
            return None;
        }
        let Some(engine) = self.engine.clone() else {
            tracing::warn!("Window {} has no lookup engine", self.label());
            return None;
        };

        self.store.clear();
        let session = self.session.begin();
        tracing::info!("Starting lookup session {}", session);
        self.sink
            .publish(self.label(), ChannelEvent::LookupStarted { session });

        let events = LookupEvents::new(session, self.label().clone(), self.sink.clone());
        let names_text = self.names_text.clone();
        let settle_tx = self.settle_tx.clone();
        tokio::spawn(async move {
            let outcome = engine
                .lookup_pilots(names_text, events)
                .await
                .map_err(|e| e.to_string());
            if settle_tx.send((session, outcome)).is_err() {
                tracing::debug!("Window closed before session {} settled", session);
            }
        });

        Some(session)
    }

    fn handle_settled(&mut self, session: SessionId, outcome: std::result::Result<(), String>) {
        if let Err(e) = &outcome {
            tracing::error!("Lookup session {} failed: {}", session, e);
        }
        if self.session.settle(session, outcome) {
            tracing::info!(
                "Lookup session {} settled with {} records",
                session,
                self.store.len()
            );
        } else {
            tracing::debug!("Ignoring settlement of replaced session {}", session);
        }
    }

    fn request_sync(&mut self) {
        self.awaiting_sync = true;
        self.pending.clear();
        ResyncResponder::request(self.sink.as_ref(), self.label(), self.options.resync_scope);
    }

    async fn handle_envelope(&mut self, envelope: &Envelope) {
        let own = envelope.is_from(self.label());

        match &envelope.event {
            ChannelEvent::LookupStarted { session } => {
                if !own {
                    self.store.clear();
                    self.session.adopt(*session);
                    // The new session streams in live; an unanswered
                    // request has nothing left to fill in
                    if self.awaiting_sync {
                        self.awaiting_sync = false;
                        self.pending.clear();
                    }
                }
            }
            ChannelEvent::LookupProgress { session, progress } => {
                if !self.session.is_current(*session) {
                    tracing::debug!("Dropping progress from stale session {}", session);
                    return;
                }
                if self.session.record_progress(*session, *progress)
                    == ProgressOutcome::Regressed
                {
                    tracing::debug!(
                        "Dropping regressed progress {}/{}",
                        progress.current,
                        progress.total
                    );
                }
            }
            ChannelEvent::PilotResult { session, record, .. } => {
                if self.awaiting_sync {
                    self.pending.push((*session, record.clone()));
                }
                if self.session.is_current(*session) {
                    self.store.insert(record.clone());
                } else if !self.awaiting_sync {
                    tracing::debug!(
                        "Dropping result for {} from stale session {}",
                        record.name(),
                        session
                    );
                }
            }
            ChannelEvent::FilterStateSync { state, epoch, seq } => {
                if self
                    .filters
                    .apply_remote(&envelope.origin, state.clone(), *epoch, *seq)
                    == ApplyOutcome::Applied
                {
                    tracing::debug!("Applied filter state from {}", envelope.origin);
                }
            }
            ChannelEvent::OverlaySyncRequest { scope } => {
                if !own && self.options.role == WindowRole::Primary {
                    self.responder.respond(
                        *scope,
                        self.session.id(),
                        &self.store,
                        self.filters.state(),
                    );
                    self.filters.rebroadcast();
                }
            }
            ChannelEvent::PilotsSync {
                session, records, ..
            } => {
                if own || !(self.awaiting_sync || self.options.role == WindowRole::Overlay) {
                    return;
                }
                self.awaiting_sync = false;
                let mut count = self.store.replace_all(records.iter().cloned());
                let pending = std::mem::take(&mut self.pending);
                if let Some(session) = session {
                    self.session.adopt(*session);
                }
                if let Some(current) = self.session.id() {
                    for (_, record) in pending.into_iter().filter(|(s, _)| *s == current) {
                        if self.store.insert(record).is_inserted() {
                            count += 1;
                        }
                    }
                }
                tracing::debug!("Synced {} records from {}", count, envelope.origin);
            }
            ChannelEvent::OverlayClear => {
                if !own && self.options.role == WindowRole::Overlay {
                    self.store.clear();
                }
            }
            ChannelEvent::OverlayCloseRequest => {
                if let Some(manager) = &self.manager {
                    if let Err(e) = manager.close_overlay().await {
                        tracing::warn!("Failed to close overlay: {}", e);
                    }
                }
            }
            ChannelEvent::OverlayClosed => {
                tracing::debug!("Overlay {} closed", envelope.origin);
            }
        }
    }

    fn snapshot(&self) -> WindowSnapshot {
        let filters = self.filters.state();
        WindowSnapshot {
            label: self.label().clone(),
            role: self.options.role,
            session: self.session.id(),
            status: self.session.status(),
            loading: self.session.loading(),
            syncing: self.awaiting_sync,
            progress: self.session.progress(),
            error: self.session.error().map(str::to_string),
            names_text: self.names_text.clone(),
            records: self.store.snapshot(),
            visible: filters.filtered(&self.store).into_iter().cloned().collect(),
            filters: filters.clone(),
            display: filters.display_selection(&self.store),
            counts: FilterCounts::from_records(&self.store),
        }
    }
}

//! Lookup session management
//!
//! Tracks the lifecycle of the current lookup in one window: which session is
//! current, whether it is still loading, its progress and its error. Events
//! tagged with any other session id are rejected here.

mod engine;

pub use engine::{LookupEngine, LookupEvents, ReplayEngine};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier stamped on every event of one lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupProgress {
    pub current: u32,
    pub total: u32,
    pub cache_hits: u32,
}

impl LookupProgress {
    pub fn new(current: u32, total: u32, cache_hits: u32) -> Self {
        Self {
            current,
            total,
            cache_hits,
        }
    }
}

/// Session status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// No lookup has run in this window yet
    NotStarted,
    /// Waiting for the engine to settle
    Active,
    /// The engine request finished, successfully or not
    Settled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressOutcome {
    Accepted,
    /// `current` went backwards; the update was dropped
    Regressed,
    /// Not the current session, or it already settled
    Ignored,
}

/// Lookup session state of one window
#[derive(Debug, Clone)]
pub struct LookupSession {
    id: Option<SessionId>,
    status: SessionStatus,
    progress: Option<LookupProgress>,
    error: Option<String>,
    started_at: Option<DateTime<Utc>>,
    settled_at: Option<DateTime<Utc>>,
}

impl Default for LookupSession {
    fn default() -> Self {
        Self::new()
    }
}

impl LookupSession {
    pub fn new() -> Self {
        Self {
            id: None,
            status: SessionStatus::NotStarted,
            progress: None,
            error: None,
            started_at: None,
            settled_at: None,
        }
    }

    /// Start a new session, replacing whatever was current
    pub fn begin(&mut self) -> SessionId {
        let id = SessionId::new();
        if self.status == SessionStatus::Active {
            tracing::info!("Replacing active lookup session {:?}", self.id);
        }
        self.id = Some(id);
        self.status = SessionStatus::Active;
        self.progress = None;
        self.error = None;
        self.started_at = Some(Utc::now());
        self.settled_at = None;
        id
    }

    /// Follow a session started by another window.
    ///
    /// The follower accepts that session's results but is never loading.
    pub fn adopt(&mut self, id: SessionId) {
        if self.id == Some(id) {
            return;
        }
        self.id = Some(id);
        self.status = SessionStatus::Settled;
        self.progress = None;
        self.error = None;
        self.started_at = Some(Utc::now());
        self.settled_at = None;
    }

    pub fn id(&self) -> Option<SessionId> {
        self.id
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn is_current(&self, id: SessionId) -> bool {
        self.id == Some(id)
    }

    pub fn loading(&self) -> bool {
        self.status == SessionStatus::Active
    }

    pub fn progress(&self) -> Option<LookupProgress> {
        self.progress
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// Session duration
    pub fn duration(&self) -> Option<chrono::Duration> {
        let start = self.started_at?;
        let end = self.settled_at.unwrap_or_else(Utc::now);
        Some(end - start)
    }

    /// Record a progress update; `current` never goes backwards within a session
    pub fn record_progress(&mut self, id: SessionId, progress: LookupProgress) -> ProgressOutcome {
        if !self.is_current(id) || !self.loading() {
            return ProgressOutcome::Ignored;
        }
        if let Some(previous) = self.progress {
            if progress.current < previous.current {
                return ProgressOutcome::Regressed;
            }
        }
        self.progress = Some(progress);
        ProgressOutcome::Accepted
    }

    /// Settle the session. Returns `false` when `id` is not the active session.
    pub fn settle(&mut self, id: SessionId, outcome: Result<(), String>) -> bool {
        if !self.is_current(id) || !self.loading() {
            return false;
        }
        self.status = SessionStatus::Settled;
        self.progress = None;
        self.settled_at = Some(Utc::now());
        self.error = outcome.err();
        true
    }
}

/// Names in a paste: non-blank lines
pub fn name_count(names_text: &str) -> usize {
    names_text.lines().filter(|l| !l.trim().is_empty()).count()
}

/// Whether a paste contains anything worth looking up
pub fn has_names(names_text: &str) -> bool {
    !names_text.trim().is_empty()
}

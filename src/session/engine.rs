// Lookup engine seam and the fixture-backed replay engine

use crate::channel::{ChannelEvent, EventSink, WindowLabel};
use crate::error::{Result, TelescopeError};
use crate::intel::PilotIntelRecord;
use crate::session::{LookupProgress, SessionId};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// The external intel engine.
///
/// Results are not returned: the engine streams them through `events` and
/// resolves once the whole request has settled.
#[async_trait]
pub trait LookupEngine: Send + Sync {
    async fn lookup_pilots(&self, names_text: String, events: LookupEvents) -> Result<()>;
}

/// Session-stamped publisher handed to the engine for one request
#[derive(Clone)]
pub struct LookupEvents {
    session: SessionId,
    origin: WindowLabel,
    sink: Arc<dyn EventSink>,
}

impl LookupEvents {
    pub fn new(session: SessionId, origin: WindowLabel, sink: Arc<dyn EventSink>) -> Self {
        Self {
            session,
            origin,
            sink,
        }
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    pub fn progress(&self, current: u32, total: u32, cache_hits: u32) {
        self.sink.publish(
            &self.origin,
            ChannelEvent::LookupProgress {
                session: self.session,
                progress: LookupProgress::new(current, total, cache_hits),
            },
        );
    }

    pub fn result(&self, record: PilotIntelRecord, index: usize) {
        self.sink.publish(
            &self.origin,
            ChannelEvent::PilotResult {
                session: self.session,
                record,
                index,
            },
        );
    }
}

/// Engine that answers from a fixed set of records.
///
/// Names are matched case-insensitively; unknown names produce a failed record
/// with a synthetic negative id so several misses do not collapse into one.
pub struct ReplayEngine {
    records: HashMap<String, PilotIntelRecord>,
    delay: Duration,
    fail_after: Option<(usize, String)>,
}

impl ReplayEngine {
    pub fn new(records: Vec<PilotIntelRecord>) -> Self {
        let records = records
            .into_iter()
            .map(|r| (r.name().to_lowercase(), r))
            .collect();
        Self {
            records,
            delay: Duration::ZERO,
            fail_after: None,
        }
    }

    /// Load a JSON array of records
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| TelescopeError::Io {
            source: e,
            context: format!("Failed to read fixture file: {}", path.display()),
        })?;
        let records: Vec<PilotIntelRecord> =
            serde_json::from_str(&content).map_err(|e| TelescopeError::Json {
                source: e,
                context: format!("Failed to parse fixture file: {}", path.display()),
            })?;
        tracing::info!("Loaded {} fixture records from {}", records.len(), path.display());
        Ok(Self::new(records))
    }

    /// Pause between streamed results
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Fail the whole request after `count` results have been streamed
    pub fn failing_after(mut self, count: usize, message: impl Into<String>) -> Self {
        self.fail_after = Some((count, message.into()));
        self
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl LookupEngine for ReplayEngine {
    async fn lookup_pilots(&self, names_text: String, events: LookupEvents) -> Result<()> {
        let names: Vec<&str> = names_text
            .lines()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();

        if names.is_empty() {
            tracing::info!("No pilot names provided");
            return Ok(());
        }

        tracing::info!("Looking up {} pilots", names.len());
        let total = names.len() as u32;
        let mut hits = 0u32;

        for (index, name) in names.iter().enumerate() {
            if let Some((count, message)) = &self.fail_after {
                if index >= *count {
                    return Err(TelescopeError::Lookup(message.clone()));
                }
            }

            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            let record = match self.records.get(&name.to_lowercase()) {
                Some(record) => {
                    hits += 1;
                    record.clone()
                }
                None => {
                    tracing::warn!("Character not found: {}", name);
                    PilotIntelRecord::failed(-(index as i64 + 1), *name, "Character not found")
                }
            };

            events.result(record, index);
            events.progress(index as u32 + 1, total, hits);
        }

        Ok(())
    }
}

// Full-dataset resync for windows that attach late

use crate::channel::{ChannelEvent, EventSink, WindowLabel};
use crate::filters::FilterState;
use crate::session::SessionId;
use crate::store::SortedResultStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// What a sync reply carries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResyncScope {
    /// Every record in the responder's store
    #[default]
    Full,
    /// Only the records passing the responder's filters
    Filtered,
}

impl ResyncScope {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "full" => Some(ResyncScope::Full),
            "filtered" => Some(ResyncScope::Filtered),
            _ => None,
        }
    }
}

/// Answers `overlay-sync-request` with a `pilots-sync` snapshot
pub struct ResyncResponder {
    origin: WindowLabel,
    sink: Arc<dyn EventSink>,
}

impl ResyncResponder {
    pub fn new(origin: WindowLabel, sink: Arc<dyn EventSink>) -> Self {
        Self { origin, sink }
    }

    /// Publish a snapshot of the store; returns the number of records sent
    pub fn respond(
        &self,
        scope: ResyncScope,
        session: Option<SessionId>,
        store: &SortedResultStore,
        filters: &FilterState,
    ) -> usize {
        let records: Vec<_> = match scope {
            ResyncScope::Full => store.snapshot(),
            ResyncScope::Filtered => filters.filtered(store).into_iter().cloned().collect(),
        };
        let count = records.len();

        tracing::debug!("{} answering sync request with {} records", self.origin, count);
        self.sink.publish(
            &self.origin,
            ChannelEvent::PilotsSync {
                session,
                scope,
                records,
            },
        );
        count
    }

    /// Ask the other windows for their current dataset
    pub fn request(sink: &dyn EventSink, origin: &WindowLabel, scope: ResyncScope) {
        sink.publish(origin, ChannelEvent::OverlaySyncRequest { scope });
    }
}

// Topic names and message payloads exchanged between windows

use crate::filters::FilterState;
use crate::intel::PilotIntelRecord;
use crate::session::{LookupProgress, SessionId};
use crate::sync::ResyncScope;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    LookupStarted,
    LookupProgress,
    PilotResult,
    FilterStateSync,
    OverlaySyncRequest,
    PilotsSync,
    OverlayClear,
    OverlayCloseRequest,
    OverlayClosed,
}

impl Topic {
    /// Wire name of the topic
    pub fn name(self) -> &'static str {
        match self {
            Topic::LookupStarted => "lookup-started",
            Topic::LookupProgress => "lookup-progress",
            Topic::PilotResult => "pilot-result",
            Topic::FilterStateSync => "filter-state-sync",
            Topic::OverlaySyncRequest => "overlay-sync-request",
            Topic::PilotsSync => "pilots-sync",
            Topic::OverlayClear => "overlay-clear",
            Topic::OverlayCloseRequest => "overlay-close-request",
            Topic::OverlayClosed => "overlay-closed",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Message payload, one variant per topic
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "topic", content = "payload", rename_all = "kebab-case")]
pub enum ChannelEvent {
    /// A new lookup session replaced the previous one
    LookupStarted { session: SessionId },
    LookupProgress {
        session: SessionId,
        progress: LookupProgress,
    },
    PilotResult {
        session: SessionId,
        record: PilotIntelRecord,
        index: usize,
    },
    /// Full filter state; `seq` increases within one sender `epoch`
    FilterStateSync {
        state: FilterState,
        epoch: Uuid,
        seq: u64,
    },
    OverlaySyncRequest { scope: ResyncScope },
    /// Full dataset snapshot answering a sync request
    PilotsSync {
        session: Option<SessionId>,
        scope: ResyncScope,
        records: Vec<PilotIntelRecord>,
    },
    OverlayClear,
    OverlayCloseRequest,
    OverlayClosed,
}

impl ChannelEvent {
    pub fn topic(&self) -> Topic {
        match self {
            ChannelEvent::LookupStarted { .. } => Topic::LookupStarted,
            ChannelEvent::LookupProgress { .. } => Topic::LookupProgress,
            ChannelEvent::PilotResult { .. } => Topic::PilotResult,
            ChannelEvent::FilterStateSync { .. } => Topic::FilterStateSync,
            ChannelEvent::OverlaySyncRequest { .. } => Topic::OverlaySyncRequest,
            ChannelEvent::PilotsSync { .. } => Topic::PilotsSync,
            ChannelEvent::OverlayClear => Topic::OverlayClear,
            ChannelEvent::OverlayCloseRequest => Topic::OverlayCloseRequest,
            ChannelEvent::OverlayClosed => Topic::OverlayClosed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_wire_format() {
        let event = ChannelEvent::OverlaySyncRequest {
            scope: ResyncScope::Full,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["topic"], "overlay-sync-request");
        assert_eq!(json["payload"]["scope"], "full");

        let event: ChannelEvent = serde_json::from_str(r#"{"topic":"overlay-clear"}"#).unwrap();
        assert_eq!(event.topic(), Topic::OverlayClear);
        assert_eq!(event.topic().name(), "overlay-clear");
    }
}

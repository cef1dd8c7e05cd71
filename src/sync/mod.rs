//! Filter synchronization between windows
//!
//! Every local filter mutation publishes the complete state together with the
//! window's label, an epoch and a sequence number. The epoch is fixed for the
//! lifetime of one `SyncedFilters`, so a window reopened under the same label
//! starts a fresh sequence. Receivers drop their own echoes and anything not
//! newer than what they already applied from that origin and epoch, then
//! replace their predicates wholesale. Applying never publishes, so two
//! windows cannot ping-pong. Concurrent edits resolve to last message wins.

mod resync;

pub use resync::{ResyncResponder, ResyncScope};

use crate::channel::{ChannelEvent, EventSink, WindowLabel};
use crate::filters::{FilterState, GroupSelector};
use crate::intel::{CapabilityTag, ThreatLevel};
use crate::store::SortedResultStore;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    /// Our own broadcast coming back
    Echo,
    /// Older than, or equal to, the last state applied from that origin and epoch
    Stale,
}

/// Filter state of one window plus its broadcaster and receiver
pub struct SyncedFilters {
    origin: WindowLabel,
    state: FilterState,
    epoch: Uuid,
    seq: u64,
    last_applied: HashMap<WindowLabel, (Uuid, u64)>,
    sink: Arc<dyn EventSink>,
}

impl SyncedFilters {
    pub fn new(origin: WindowLabel, sink: Arc<dyn EventSink>) -> Self {
        Self {
            origin,
            state: FilterState::default(),
            epoch: Uuid::new_v4(),
            seq: 0,
            last_applied: HashMap::new(),
            sink,
        }
    }

    pub fn state(&self) -> &FilterState {
        &self.state
    }

    pub fn origin(&self) -> &WindowLabel {
        &self.origin
    }

    pub fn epoch(&self) -> Uuid {
        self.epoch
    }

    pub fn toggle_threat(&mut self, level: ThreatLevel) {
        self.state.toggle_threat(level);
        self.broadcast();
    }

    pub fn toggle_tag(&mut self, tag: CapabilityTag) {
        self.state.toggle_tag(tag);
        self.broadcast();
    }

    /// Returns `false` (and publishes nothing) when a name cannot be resolved
    pub fn toggle_corporation(
        &mut self,
        selector: &GroupSelector,
        store: &SortedResultStore,
    ) -> bool {
        let changed = self.state.toggle_corporation(selector, store);
        if changed {
            self.broadcast();
        }
        changed
    }

    pub fn toggle_alliance(&mut self, selector: &GroupSelector, store: &SortedResultStore) -> bool {
        let changed = self.state.toggle_alliance(selector, store);
        if changed {
            self.broadcast();
        }
        changed
    }

    /// Reset every predicate in one transition, one broadcast
    pub fn clear_all(&mut self) {
        self.state.clear();
        self.broadcast();
    }

    /// Publish the current state without changing it (late joiner catch-up)
    pub fn rebroadcast(&mut self) {
        self.broadcast();
    }

    /// Apply a state received from the channel.
    ///
    /// Takes no sink: applying a remote state has no way to publish.
    pub fn apply_remote(
        &mut self,
        origin: &WindowLabel,
        state: FilterState,
        epoch: Uuid,
        seq: u64,
    ) -> ApplyOutcome {
        if origin == &self.origin {
            return ApplyOutcome::Echo;
        }

        if let Some(&(last_epoch, last)) = self.last_applied.get(origin) {
            if last_epoch == epoch && seq <= last {
                tracing::debug!(
                    "Dropping stale filter state from {} (seq {} <= {})",
                    origin,
                    seq,
                    last
                );
                return ApplyOutcome::Stale;
            }
        }

        if self
            .last_applied
            .insert(origin.clone(), (epoch, seq))
            .is_some_and(|(last_epoch, _)| last_epoch != epoch)
        {
            tracing::debug!("{} restarted its filter sequence", origin);
        }
        self.state = state;
        ApplyOutcome::Applied
    }

    fn broadcast(&mut self) {
        self.seq += 1;
        self.sink.publish(
            &self.origin,
            ChannelEvent::FilterStateSync {
                state: self.state.clone(),
                epoch: self.epoch,
                seq: self.seq,
            },
        );
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::channel::{ChannelEvent, EventSink, WindowLabel};
    use std::sync::Mutex;

    /// Sink that records instead of delivering
    #[derive(Default)]
    pub struct RecordingSink {
        pub published: Mutex<Vec<(WindowLabel, ChannelEvent)>>,
    }

    impl RecordingSink {
        pub fn count(&self) -> usize {
            self.published.lock().unwrap().len()
        }

        pub fn last(&self) -> Option<(WindowLabel, ChannelEvent)> {
            self.published.lock().unwrap().last().cloned()
        }
    }

    impl EventSink for RecordingSink {
        fn publish(&self, origin: &WindowLabel, event: ChannelEvent) {
            self.published
                .lock()
                .unwrap()
                .push((origin.clone(), event));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::RecordingSink;
    use super::*;

    fn synced(label: &str) -> (SyncedFilters, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        let filters = SyncedFilters::new(WindowLabel::new(label), sink.clone());
        (filters, sink)
    }

    #[test]
    fn test_every_mutation_broadcasts_full_state() {
        let (mut filters, sink) = synced("main");
        filters.toggle_threat(ThreatLevel::High);
        filters.toggle_tag(CapabilityTag::Cyno);

        assert_eq!(sink.count(), 2);
        match sink.last() {
            Some((origin, ChannelEvent::FilterStateSync { state, epoch, seq })) => {
                assert_eq!(origin.as_str(), "main");
                assert_eq!(epoch, filters.epoch());
                assert_eq!(seq, 2);
                assert_eq!(state.threat_filter, Some(ThreatLevel::High));
                assert!(state.selected_tags.contains(&CapabilityTag::Cyno));
            }
            other => panic!("unexpected publish: {:?}", other),
        }
    }

    #[test]
    fn test_clear_all_is_single_broadcast() {
        let (mut filters, sink) = synced("main");
        filters.toggle_threat(ThreatLevel::Low);
        filters.toggle_tag(CapabilityTag::Solo);
        let before = sink.count();

        filters.clear_all();
        assert_eq!(sink.count(), before + 1);
        assert!(filters.state().is_empty());
    }

    #[test]
    fn test_unresolved_name_does_not_broadcast() {
        let (mut filters, sink) = synced("main");
        let store = SortedResultStore::new();
        assert!(!filters.toggle_corporation(&GroupSelector::Name("Ghost Corp".into()), &store));
        assert_eq!(sink.count(), 0);
    }

    #[test]
    fn test_apply_remote_replaces_without_publishing() {
        let (mut filters, sink) = synced("overlay");
        filters.toggle_tag(CapabilityTag::Solo);
        let before = sink.count();

        let mut remote = FilterState::default();
        remote.toggle_threat(ThreatLevel::Extreme);
        let outcome =
            filters.apply_remote(&WindowLabel::new("main"), remote.clone(), Uuid::new_v4(), 1);

        assert_eq!(outcome, ApplyOutcome::Applied);
        assert_eq!(filters.state(), &remote);
        assert_eq!(sink.count(), before);
    }

    #[test]
    fn test_echo_and_stale_are_dropped() {
        let (mut filters, _sink) = synced("overlay");
        let main = WindowLabel::new("main");
        let epoch = Uuid::new_v4();

        let mut newer = FilterState::default();
        newer.toggle_threat(ThreatLevel::High);
        assert_eq!(
            filters.apply_remote(&main, newer.clone(), epoch, 5),
            ApplyOutcome::Applied
        );

        let older = FilterState::default();
        assert_eq!(
            filters.apply_remote(&main, older.clone(), epoch, 4),
            ApplyOutcome::Stale
        );
        assert_eq!(
            filters.apply_remote(&main, older.clone(), epoch, 5),
            ApplyOutcome::Stale
        );
        assert_eq!(filters.state(), &newer);

        let me = WindowLabel::new("overlay");
        assert_eq!(
            filters.apply_remote(&me, older, epoch, 99),
            ApplyOutcome::Echo
        );
        assert_eq!(filters.state(), &newer);
    }

    #[test]
    fn test_new_epoch_restarts_sequence() {
        let (mut filters, _sink) = synced("main");
        let overlay = WindowLabel::new("overlay");

        let mut first = FilterState::default();
        first.toggle_tag(CapabilityTag::Cyno);
        assert_eq!(
            filters.apply_remote(&overlay, first, Uuid::new_v4(), 3),
            ApplyOutcome::Applied
        );

        // Same label, new window instance counting from 1 again
        let reopened = Uuid::new_v4();
        let mut second = FilterState::default();
        second.toggle_threat(ThreatLevel::Extreme);
        assert_eq!(
            filters.apply_remote(&overlay, second.clone(), reopened, 1),
            ApplyOutcome::Applied
        );
        assert_eq!(filters.state(), &second);

        assert_eq!(
            filters.apply_remote(&overlay, FilterState::default(), reopened, 1),
            ApplyOutcome::Stale
        );
    }
}

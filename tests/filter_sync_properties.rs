// Filter synchronization never feeds back into the channel
mod common;

use common::CountingSink;
use proptest::prelude::*;
use std::collections::BTreeSet;
use std::sync::Arc;
use telescope::channel::{ChannelEvent, EventChannel, EventSink, Topic, WindowLabel};
use telescope::filters::FilterState;
use telescope::intel::{CapabilityTag, ThreatLevel};
use telescope::sync::{ApplyOutcome, SyncedFilters};
use uuid::Uuid;

fn filter_state() -> impl Strategy<Value = FilterState> {
    (
        prop::option::of(prop::sample::select(ThreatLevel::KNOWN.to_vec())),
        prop::collection::btree_set(prop::sample::select(CapabilityTag::ALL.to_vec()), 0..4),
        prop::option::of(prop::sample::select(vec!["BSR", "DCM", "LW"])),
        prop::option::of(prop::sample::select(vec!["NC", "CONDI"])),
    )
        .prop_map(|(threat, tags, corp, alliance)| FilterState {
            threat_filter: threat,
            selected_tags: tags,
            corp_filter: corp.map(str::to_string),
            alliance_filter: alliance.map(str::to_string),
        })
}

fn origin() -> impl Strategy<Value = WindowLabel> {
    prop::sample::select(vec!["main", "overlay", "overlay-2"]).prop_map(WindowLabel::new)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn remote_applications_never_publish(
        messages in prop::collection::vec((origin(), filter_state(), 0u64..50, any::<bool>()), 100)
    ) {
        let sink = Arc::new(CountingSink::default());
        let mut filters = SyncedFilters::new(WindowLabel::new("overlay"), sink.clone());
        let epoch = Uuid::new_v4();

        for (origin, state, seq, reopened) in messages {
            let epoch = if reopened { Uuid::new_v4() } else { epoch };
            filters.apply_remote(&origin, state, epoch, seq);
        }

        prop_assert_eq!(sink.count(), 0);
    }

    #[test]
    fn last_applied_state_wins(
        states in prop::collection::vec(filter_state(), 1..20)
    ) {
        let sink = Arc::new(CountingSink::default());
        let mut filters = SyncedFilters::new(WindowLabel::new("overlay"), sink.clone());
        let main = WindowLabel::new("main");
        let epoch = Uuid::new_v4();

        for (seq, state) in states.iter().enumerate() {
            let outcome = filters.apply_remote(&main, state.clone(), epoch, seq as u64 + 1);
            prop_assert_eq!(outcome, ApplyOutcome::Applied);
        }

        prop_assert_eq!(filters.state(), states.last().unwrap());
        prop_assert_eq!(sink.count(), 0);
    }
}

/// Two windows on one channel apply each other's states without re-publishing
#[tokio::test]
async fn test_two_windows_exchange_without_ping_pong() {
    let channel = EventChannel::new(64);
    let mut main_rx = channel.subscribe_topic(Topic::FilterStateSync);
    let mut overlay_rx = channel.subscribe_topic(Topic::FilterStateSync);

    let sink: Arc<dyn EventSink> = Arc::new(channel.clone());
    let mut main = SyncedFilters::new(WindowLabel::new("main"), sink.clone());
    let mut overlay = SyncedFilters::new(WindowLabel::new("overlay"), sink);

    main.toggle_threat(ThreatLevel::High);
    overlay.toggle_tag(CapabilityTag::Cyno);
    main.toggle_tag(CapabilityTag::Solo);
    assert_eq!(channel.published_count(), 3);

    while let Some(envelope) = main_rx.try_recv() {
        if let ChannelEvent::FilterStateSync { state, epoch, seq } = &envelope.event {
            main.apply_remote(&envelope.origin, state.clone(), *epoch, *seq);
        }
    }
    while let Some(envelope) = overlay_rx.try_recv() {
        if let ChannelEvent::FilterStateSync { state, epoch, seq } = &envelope.event {
            overlay.apply_remote(&envelope.origin, state.clone(), *epoch, *seq);
        }
    }

    // Nothing was re-published while applying
    assert_eq!(channel.published_count(), 3);

    // Main took the overlay's edit, the overlay took main's latest
    assert_eq!(main.state().selected_tags, BTreeSet::from([CapabilityTag::Cyno]));
    assert_eq!(overlay.state().threat_filter, Some(ThreatLevel::High));
    assert_eq!(
        overlay.state().selected_tags,
        BTreeSet::from([CapabilityTag::Solo])
    );
}

// Ordering and filtering properties of the result store
mod common;

use common::CountingSink;
use proptest::prelude::*;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use telescope::channel::{ChannelEvent, WindowLabel};
use telescope::filters::FilterState;
use telescope::intel::{CapabilityTag, ThreatLevel};
use telescope::session::SessionId;
use telescope::store::SortedResultStore;
use telescope::sync::{ResyncResponder, ResyncScope};

fn threat() -> impl Strategy<Value = ThreatLevel> {
    prop::sample::select(ThreatLevel::ALL.to_vec())
}

proptest! {
    #[test]
    fn store_stays_ordered_with_stable_ties(
        inserts in prop::collection::vec((0i64..40, threat()), 0..120)
    ) {
        let mut store = SortedResultStore::new();
        let mut arrival = Vec::new();
        let mut seen = HashSet::new();

        for (id, level) in &inserts {
            store.insert(common::pilot(*id, "p", *level));
            if seen.insert(*id) {
                arrival.push(*id);
            }

            let ranks: Vec<u8> = store.iter().map(|r| r.threat_level.rank()).collect();
            prop_assert!(ranks.windows(2).all(|w| w[0] <= w[1]));
        }

        // Same rank keeps arrival order
        for pair in store.records().windows(2) {
            if pair[0].threat_level == pair[1].threat_level {
                let a = arrival.iter().position(|id| *id == pair[0].id());
                let b = arrival.iter().position(|id| *id == pair[1].id());
                prop_assert!(a < b);
            }
        }

        prop_assert_eq!(store.len(), seen.len());
    }

    #[test]
    fn reinserting_known_ids_changes_nothing(
        levels in prop::collection::vec(threat(), 1..30),
        replay in prop::collection::vec((0usize..30, threat()), 0..30)
    ) {
        let mut store = SortedResultStore::new();
        for (id, level) in levels.iter().enumerate() {
            store.insert(common::pilot(id as i64, "p", *level));
        }
        let before = store.clone().snapshot();

        for (index, level) in replay {
            let id = (index % levels.len()) as i64;
            prop_assert!(!store.insert(common::pilot(id, "changed", level)).is_inserted());
        }

        prop_assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn clearing_filters_restores_unfiltered_order(
        levels in prop::collection::vec(threat(), 0..40),
        filter_level in threat(),
    ) {
        let mut store = SortedResultStore::new();
        for (id, level) in levels.iter().enumerate() {
            store.insert(common::pilot(id as i64, "p", *level));
        }
        let all: Vec<i64> = store.ids();

        let mut filters = FilterState::default();
        filters.toggle_threat(filter_level);
        filters.toggle_tag(CapabilityTag::Cyno);
        let filtered: Vec<i64> = filters.filtered(&store).iter().map(|r| r.id()).collect();
        prop_assert!(filtered.is_empty());

        filters.clear();
        let restored: Vec<i64> = filters.filtered(&store).iter().map(|r| r.id()).collect();
        prop_assert_eq!(restored, all);
    }

    #[test]
    fn full_resync_reproduces_the_source_store(
        inserts in prop::collection::vec((0i64..60, threat()), 0..120),
        stale in prop::collection::vec((100i64..120, threat()), 0..10)
    ) {
        let mut source = SortedResultStore::new();
        for (id, level) in &inserts {
            source.insert(common::pilot(*id, "p", *level));
        }

        // Whatever the follower held before is discarded
        let mut follower = SortedResultStore::new();
        for (id, level) in &stale {
            follower.insert(common::pilot(*id, "old", *level));
        }

        let sink = Arc::new(CountingSink::default());
        let responder = ResyncResponder::new(WindowLabel::new("main"), sink.clone());
        let sent = responder.respond(
            ResyncScope::Full,
            Some(SessionId::new()),
            &source,
            &FilterState::default(),
        );
        prop_assert_eq!(sent, source.len());

        let records = match sink.published.lock().unwrap().pop() {
            Some((_, ChannelEvent::PilotsSync { records, .. })) => records,
            other => panic!("expected a pilots-sync reply, got {:?}", other),
        };
        follower.replace_all(records);

        let expected: BTreeSet<i64> = source.ids().into_iter().collect();
        let synced: BTreeSet<i64> = follower.ids().into_iter().collect();
        prop_assert_eq!(synced, expected);
        prop_assert_eq!(follower.ids(), source.ids());
    }
}

/// Strictly most severe first: MODERATE ranks above LOW regardless of arrival
#[test]
fn test_severity_order_example() {
    let mut store = SortedResultStore::new();
    store.insert(common::pilot(1, "a", ThreatLevel::Moderate));
    store.insert(common::pilot(2, "b", ThreatLevel::Extreme));
    store.insert(common::pilot(3, "c", ThreatLevel::Low));
    store.insert(common::pilot(4, "d", ThreatLevel::Extreme));

    let levels: Vec<ThreatLevel> = store.iter().map(|r| r.threat_level).collect();
    assert_eq!(
        levels,
        vec![
            ThreatLevel::Extreme,
            ThreatLevel::Extreme,
            ThreatLevel::Moderate,
            ThreatLevel::Low
        ]
    );
    assert_eq!(store.ids(), vec![2, 4, 1, 3]);
}

#[test]
fn test_filters_compose_across_categories() {
    let mut store = SortedResultStore::new();
    store.replace_all(common::local());

    let mut filters = FilterState::default();
    filters.toggle_threat(ThreatLevel::Extreme);
    let ids: Vec<i64> = filters.filtered(&store).iter().map(|r| r.id()).collect();
    assert_eq!(ids, vec![2, 4]);

    // Tags are OR within the category
    filters.clear();
    filters.toggle_tag(CapabilityTag::Blops);
    filters.toggle_tag(CapabilityTag::Solo);
    let ids: Vec<i64> = filters.filtered(&store).iter().map(|r| r.id()).collect();
    assert_eq!(ids, vec![4, 5, 1]);

    // ... and AND across categories
    filters.toggle_threat(ThreatLevel::High);
    let ids: Vec<i64> = filters.filtered(&store).iter().map(|r| r.id()).collect();
    assert_eq!(ids, vec![5]);
}

//! Sorted result store
//!
//! Holds the records of the current lookup, unique by character id and ordered
//! by ascending threat rank. Records of equal rank keep their arrival order.

pub mod sort;

pub use sort::{sorted_view, SortDirection, SortKey, SortState};

use crate::intel::{Affiliation, CharacterId, PilotIntelRecord};
use std::collections::HashSet;

/// Result of a single insert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// Record stored at the given position
    Inserted { position: usize },
    /// A record with the same id was already present; nothing changed
    Duplicate,
}

impl InsertOutcome {
    pub fn is_inserted(&self) -> bool {
        matches!(self, InsertOutcome::Inserted { .. })
    }
}

#[derive(Debug, Clone, Default)]
pub struct SortedResultStore {
    records: Vec<PilotIntelRecord>,
    ids: HashSet<CharacterId>,
}

impl SortedResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record, first write wins.
    ///
    /// The record lands right before the first record with a strictly greater
    /// rank. Because the vector is kept ordered, that position is found with a
    /// binary search over the rank prefix.
    pub fn insert(&mut self, record: PilotIntelRecord) -> InsertOutcome {
        if !self.ids.insert(record.id()) {
            tracing::trace!("Dropping duplicate record for character {}", record.id());
            return InsertOutcome::Duplicate;
        }

        let rank = record.threat_level.rank();
        let position = self
            .records
            .partition_point(|existing| existing.threat_level.rank() <= rank);
        self.records.insert(position, record);

        InsertOutcome::Inserted { position }
    }

    /// Replace the whole store, e.g. from a resync snapshot.
    ///
    /// Returns the number of records kept after de-duplication.
    pub fn replace_all<I>(&mut self, records: I) -> usize
    where
        I: IntoIterator<Item = PilotIntelRecord>,
    {
        self.clear();
        for record in records {
            self.insert(record);
        }
        self.records.len()
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.ids.clear();
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, id: CharacterId) -> bool {
        self.ids.contains(&id)
    }

    pub fn get(&self, id: CharacterId) -> Option<&PilotIntelRecord> {
        self.records.iter().find(|r| r.id() == id)
    }

    pub fn records(&self) -> &[PilotIntelRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PilotIntelRecord> {
        self.records.iter()
    }

    /// Ids in store order
    pub fn ids(&self) -> Vec<CharacterId> {
        self.records.iter().map(|r| r.id()).collect()
    }

    /// Owned copy of every record, in order
    pub fn snapshot(&self) -> Vec<PilotIntelRecord> {
        self.records.clone()
    }

    /// First corporation with the given display name
    pub fn find_corporation_by_name(&self, name: &str) -> Option<&Affiliation> {
        self.records
            .iter()
            .filter_map(|r| r.corporation())
            .find(|c| c.name == name)
    }

    /// First alliance with the given display name
    pub fn find_alliance_by_name(&self, name: &str) -> Option<&Affiliation> {
        self.records
            .iter()
            .filter_map(|r| r.alliance())
            .find(|a| a.name == name)
    }
}

impl<'a> IntoIterator for &'a SortedResultStore {
    type Item = &'a PilotIntelRecord;
    type IntoIter = std::slice::Iter<'a, PilotIntelRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

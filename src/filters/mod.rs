//! Filter state
//!
//! The canonical filter is a set of predicates keyed by ticker. Multi-choice
//! consumers work with display names instead; those names are derived from the
//! current store on demand so both shapes always describe the same records.

pub mod counts;

pub use counts::{FilterCounts, GroupCount};

use crate::intel::{CapabilityTag, PilotIntelRecord, ThreatLevel};
use crate::store::SortedResultStore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Active predicates, mirrored verbatim between windows
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterState {
    #[serde(default)]
    pub threat_filter: Option<ThreatLevel>,
    #[serde(default)]
    pub selected_tags: BTreeSet<CapabilityTag>,
    /// Corporation ticker
    #[serde(default)]
    pub corp_filter: Option<String>,
    /// Alliance ticker
    #[serde(default)]
    pub alliance_filter: Option<String>,
}

/// How a corporation or alliance toggle names its group
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupSelector {
    Ticker(String),
    Name(String),
}

/// Display names selected by the current tickers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DisplaySelection {
    pub corporations: BTreeSet<String>,
    pub alliances: BTreeSet<String>,
}

fn toggle_option<T: PartialEq>(slot: &mut Option<T>, value: T) {
    if slot.as_ref() == Some(&value) {
        *slot = None;
    } else {
        *slot = Some(value);
    }
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no predicate is active
    pub fn is_empty(&self) -> bool {
        self.threat_filter.is_none()
            && self.selected_tags.is_empty()
            && self.corp_filter.is_none()
            && self.alliance_filter.is_none()
    }

    pub fn toggle_threat(&mut self, level: ThreatLevel) {
        toggle_option(&mut self.threat_filter, level);
    }

    pub fn toggle_tag(&mut self, tag: CapabilityTag) {
        if !self.selected_tags.remove(&tag) {
            self.selected_tags.insert(tag);
        }
    }

    /// Toggle the corporation predicate.
    ///
    /// A name is resolved to the ticker of the first current record in that
    /// corporation. Returns `false` when a name cannot be resolved, in which
    /// case nothing changes.
    pub fn toggle_corporation(
        &mut self,
        selector: &GroupSelector,
        store: &SortedResultStore,
    ) -> bool {
        let ticker = match selector {
            GroupSelector::Ticker(ticker) => ticker.clone(),
            GroupSelector::Name(name) => match store.find_corporation_by_name(name) {
                Some(corp) => corp.ticker.clone(),
                None => {
                    tracing::debug!("No current record in corporation '{}'", name);
                    return false;
                }
            },
        };
        toggle_option(&mut self.corp_filter, ticker);
        true
    }

    /// Toggle the alliance predicate; same resolution rules as corporations
    pub fn toggle_alliance(&mut self, selector: &GroupSelector, store: &SortedResultStore) -> bool {
        let ticker = match selector {
            GroupSelector::Ticker(ticker) => ticker.clone(),
            GroupSelector::Name(name) => match store.find_alliance_by_name(name) {
                Some(alliance) => alliance.ticker.clone(),
                None => {
                    tracing::debug!("No current record in alliance '{}'", name);
                    return false;
                }
            },
        };
        toggle_option(&mut self.alliance_filter, ticker);
        true
    }

    pub fn clear(&mut self) {
        *self = FilterState::default();
    }

    /// AND across categories, OR within the tag set
    pub fn matches(&self, record: &PilotIntelRecord) -> bool {
        if let Some(level) = self.threat_filter {
            if record.threat_level != level {
                return false;
            }
        }

        if !self.selected_tags.is_empty()
            && !self.selected_tags.iter().any(|tag| record.flags.has(*tag))
        {
            return false;
        }

        if let Some(ticker) = &self.corp_filter {
            if record.corporation_ticker() != Some(ticker.as_str()) {
                return false;
            }
        }

        if let Some(ticker) = &self.alliance_filter {
            if record.alliance_ticker() != Some(ticker.as_str()) {
                return false;
            }
        }

        true
    }

    /// Visible records in store order
    pub fn filtered<'a>(&self, store: &'a SortedResultStore) -> Vec<&'a PilotIntelRecord> {
        store.iter().filter(|r| self.matches(r)).collect()
    }

    /// Names of current records whose tickers match the selectors.
    ///
    /// Empty when a selector matches nothing, e.g. right after a store reset;
    /// the selector itself stays in place.
    pub fn display_selection(&self, store: &SortedResultStore) -> DisplaySelection {
        let mut selection = DisplaySelection::default();

        for record in store {
            if let (Some(ticker), Some(corp)) = (&self.corp_filter, record.corporation()) {
                if &corp.ticker == ticker {
                    selection.corporations.insert(corp.name.clone());
                }
            }
            if let (Some(ticker), Some(alliance)) = (&self.alliance_filter, record.alliance()) {
                if &alliance.ticker == ticker {
                    selection.alliances.insert(alliance.name.clone());
                }
            }
        }

        selection
    }
}

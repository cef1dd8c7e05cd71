// Badge counts for the filter bar

use crate::intel::{Affiliation, CapabilityTag, PilotIntelRecord, ThreatLevel};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Pilots per corporation or alliance
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupCount {
    pub ticker: String,
    pub name: String,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterCounts {
    /// Known tiers only; unknown classifications are not counted
    pub threats: BTreeMap<ThreatLevel, usize>,
    pub tags: BTreeMap<CapabilityTag, usize>,
    pub corporations: Vec<GroupCount>,
    pub alliances: Vec<GroupCount>,
}

impl FilterCounts {
    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a PilotIntelRecord>,
    {
        let mut counts = FilterCounts {
            threats: ThreatLevel::KNOWN.into_iter().map(|t| (t, 0)).collect(),
            tags: CapabilityTag::ALL.into_iter().map(|t| (t, 0)).collect(),
            ..FilterCounts::default()
        };
        let mut corporations = GroupTally::default();
        let mut alliances = GroupTally::default();

        for record in records {
            if let Some(count) = counts.threats.get_mut(&record.threat_level) {
                *count += 1;
            }

            let flags = &record.flags;
            // A super pilot is not double counted as capital
            if flags.is_super {
                *counts.tags.entry(CapabilityTag::Super).or_default() += 1;
            } else if flags.is_capital {
                *counts.tags.entry(CapabilityTag::Capital).or_default() += 1;
            }
            for tag in [
                CapabilityTag::Blops,
                CapabilityTag::Recon,
                CapabilityTag::Cyno,
                CapabilityTag::Solo,
            ] {
                if flags.has(tag) {
                    *counts.tags.entry(tag).or_default() += 1;
                }
            }

            if let Some(corp) = record.corporation() {
                corporations.add(corp);
            }
            if let Some(alliance) = record.alliance() {
                alliances.add(alliance);
            }
        }

        counts.corporations = corporations.finish();
        counts.alliances = alliances.finish();
        counts
    }

    pub fn threat(&self, level: ThreatLevel) -> usize {
        self.threats.get(&level).copied().unwrap_or(0)
    }

    pub fn tag(&self, tag: CapabilityTag) -> usize {
        self.tags.get(&tag).copied().unwrap_or(0)
    }
}

#[derive(Default)]
struct GroupTally {
    order: Vec<GroupCount>,
    index: HashMap<String, usize>,
}

impl GroupTally {
    fn add(&mut self, group: &Affiliation) {
        match self.index.get(&group.ticker) {
            Some(&i) => self.order[i].count += 1,
            None => {
                self.index.insert(group.ticker.clone(), self.order.len());
                self.order.push(GroupCount {
                    ticker: group.ticker.clone(),
                    name: group.name.clone(),
                    count: 1,
                });
            }
        }
    }

    /// Largest groups first, ties in first-seen order
    fn finish(mut self) -> Vec<GroupCount> {
        self.order.sort_by(|a, b| b.count.cmp(&a.count));
        self.order
    }
}

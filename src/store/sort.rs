// Column sorting for table views; never reorders the store itself

use crate::intel::{CapabilityTag, PilotIntelRecord};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Threat,
    Pilot,
    Tags,
    Corporation,
    Corp,
    Alliance,
    Ally,
    Kd,
    Isk,
    Ppk,
    Cpk,
    Active,
    Danger,
}

impl SortKey {
    pub const ALL: [SortKey; 13] = [
        SortKey::Threat,
        SortKey::Pilot,
        SortKey::Tags,
        SortKey::Corporation,
        SortKey::Corp,
        SortKey::Alliance,
        SortKey::Ally,
        SortKey::Kd,
        SortKey::Isk,
        SortKey::Ppk,
        SortKey::Cpk,
        SortKey::Active,
        SortKey::Danger,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SortKey::Threat => "threat",
            SortKey::Pilot => "pilot",
            SortKey::Tags => "tags",
            SortKey::Corporation => "corporation",
            SortKey::Corp => "corp",
            SortKey::Alliance => "alliance",
            SortKey::Ally => "ally",
            SortKey::Kd => "kd",
            SortKey::Isk => "isk",
            SortKey::Ppk => "ppk",
            SortKey::Cpk => "cpk",
            SortKey::Active => "active",
            SortKey::Danger => "danger",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        SortKey::ALL
            .into_iter()
            .find(|key| key.as_str().eq_ignore_ascii_case(value.trim()))
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "asc" => Some(SortDirection::Asc),
            "desc" => Some(SortDirection::Desc),
            _ => None,
        }
    }
}

/// Current sort column and direction of a table view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SortState {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl SortState {
    pub fn new(key: SortKey, direction: SortDirection) -> Self {
        Self { key, direction }
    }

    /// Header click: same column flips direction, a new column starts descending
    pub fn handle_sort(&mut self, key: SortKey) {
        if self.key == key {
            self.direction = self.direction.flipped();
        } else {
            self.key = key;
            self.direction = SortDirection::Desc;
        }
    }
}

/// Weighted score so that rarer, heavier capabilities sort first
fn tag_score(record: &PilotIntelRecord) -> u32 {
    let weight = |tag: CapabilityTag| match tag {
        CapabilityTag::Super => 100,
        CapabilityTag::Capital => 50,
        CapabilityTag::Blops => 25,
        CapabilityTag::Recon => 12,
        CapabilityTag::Cyno => 6,
        CapabilityTag::Solo => 3,
    };
    record.flags.tags().into_iter().map(weight).sum()
}

fn stat(record: &PilotIntelRecord, f: impl Fn(&crate::intel::ZkillStats) -> f64) -> f64 {
    record.valid_stats().map(f).unwrap_or(0.0)
}

fn text(value: Option<&str>) -> &str {
    value.unwrap_or("")
}

fn compare(a: &PilotIntelRecord, b: &PilotIntelRecord, key: SortKey) -> Ordering {
    match key {
        SortKey::Threat => a.threat_level.severity().cmp(&b.threat_level.severity()),
        SortKey::Pilot => a.name().to_lowercase().cmp(&b.name().to_lowercase()),
        SortKey::Tags => tag_score(a).cmp(&tag_score(b)),
        SortKey::Corporation => text(a.corporation().map(|c| c.name.as_str()))
            .cmp(text(b.corporation().map(|c| c.name.as_str()))),
        SortKey::Corp => text(a.corporation_ticker()).cmp(text(b.corporation_ticker())),
        SortKey::Alliance => text(a.alliance().map(|c| c.name.as_str()))
            .cmp(text(b.alliance().map(|c| c.name.as_str()))),
        SortKey::Ally => text(a.alliance_ticker()).cmp(text(b.alliance_ticker())),
        SortKey::Kd => stat(a, |s| s.kd_ratio()).total_cmp(&stat(b, |s| s.kd_ratio())),
        SortKey::Isk => stat(a, |s| s.isk_destroyed).total_cmp(&stat(b, |s| s.isk_destroyed)),
        SortKey::Ppk => {
            stat(a, |s| s.points_per_kill()).total_cmp(&stat(b, |s| s.points_per_kill()))
        }
        SortKey::Cpk => stat(a, |s| s.avg_attackers).total_cmp(&stat(b, |s| s.avg_attackers)),
        SortKey::Active => stat(a, |s| s.active_pvp_kills as f64)
            .total_cmp(&stat(b, |s| s.active_pvp_kills as f64)),
        SortKey::Danger => stat(a, |s| s.danger_ratio).total_cmp(&stat(b, |s| s.danger_ratio)),
    }
}

/// Sorted copy of a view. The sort is stable, so ties keep view order.
pub fn sorted_view<'a, I>(records: I, state: SortState) -> Vec<&'a PilotIntelRecord>
where
    I: IntoIterator<Item = &'a PilotIntelRecord>,
{
    let mut view: Vec<&PilotIntelRecord> = records.into_iter().collect();
    view.sort_by(|a, b| {
        let ordering = compare(a, b, state.key);
        match state.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    });
    view
}

// Shared fixtures for integration tests
#![allow(dead_code)]

use std::sync::Mutex;
use telescope::channel::{ChannelEvent, EventSink, WindowLabel};
use telescope::intel::{
    Affiliation, CapabilityTag, CharacterId, CharacterInfo, PilotFlags, PilotIntelRecord,
    ThreatLevel, ZkillStats,
};

pub fn pilot(id: CharacterId, name: &str, threat: ThreatLevel) -> PilotIntelRecord {
    PilotIntelRecord::resolved(
        CharacterInfo {
            id,
            name: name.to_string(),
            corporation: None,
            alliance: None,
        },
        Some(ZkillStats {
            ships_destroyed: id * 3,
            ships_lost: id,
            ..ZkillStats::default()
        }),
        threat,
        PilotFlags::default(),
    )
}

pub fn pilot_in(
    id: CharacterId,
    name: &str,
    threat: ThreatLevel,
    corp: (&str, &str),
    alliance: Option<(&str, &str)>,
    tags: &[CapabilityTag],
) -> PilotIntelRecord {
    let mut record = pilot(id, name, threat);
    record.character.corporation = Some(Affiliation::new(id + 1000, corp.0, corp.1));
    record.character.alliance = alliance.map(|(n, t)| Affiliation::new(id + 2000, n, t));
    record.flags = tags.iter().fold(PilotFlags::default(), |f, t| f.with(*t));
    record
}

/// A small local: two alliances, one unaffiliated corp, a cyno and a blops pilot
pub fn local() -> Vec<PilotIntelRecord> {
    vec![
        pilot_in(
            1,
            "Ava Stormrider",
            ThreatLevel::Moderate,
            ("Deep Core Mining", "DCM"),
            Some(("Northern Coalition", "NC")),
            &[CapabilityTag::Solo],
        ),
        pilot_in(
            2,
            "Brann Kestrel",
            ThreatLevel::Extreme,
            ("Black Sun Raiders", "BSR"),
            Some(("Goonswarm", "CONDI")),
            &[CapabilityTag::Cyno, CapabilityTag::Recon],
        ),
        pilot_in(
            3,
            "Cora Vex",
            ThreatLevel::Low,
            ("Deep Core Mining", "DCM"),
            Some(("Northern Coalition", "NC")),
            &[],
        ),
        pilot_in(
            4,
            "Dax Mourne",
            ThreatLevel::Extreme,
            ("Black Sun Raiders", "BSR"),
            Some(("Goonswarm", "CONDI")),
            &[CapabilityTag::Blops, CapabilityTag::Cyno],
        ),
        pilot_in(
            5,
            "Eko Tan",
            ThreatLevel::High,
            ("Lone Wolves", "LW"),
            None,
            &[CapabilityTag::Solo],
        ),
    ]
}

pub fn names(records: &[PilotIntelRecord]) -> String {
    records
        .iter()
        .map(|r| r.name().to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Sink that only counts publishes
#[derive(Default)]
pub struct CountingSink {
    pub published: Mutex<Vec<(WindowLabel, ChannelEvent)>>,
}

impl CountingSink {
    pub fn count(&self) -> usize {
        self.published.lock().unwrap().len()
    }
}

impl EventSink for CountingSink {
    fn publish(&self, origin: &WindowLabel, event: ChannelEvent) {
        self.published.lock().unwrap().push((origin.clone(), event));
    }
}

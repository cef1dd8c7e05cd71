//! Pilot intel records
//!
//! Records are produced by the lookup engine and treated as immutable values
//! once they reach a window's result store.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque character identifier, the identity key of a record
pub type CharacterId = i64;

/// Threat classification, ordered from most to least severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ThreatLevel {
    Extreme,
    High,
    Moderate,
    Low,
    Minimal,
    /// Fallback for missing or unrecognized classifications
    Unknown,
}

impl ThreatLevel {
    /// Every classification in sort order
    pub const ALL: [ThreatLevel; 6] = [
        ThreatLevel::Extreme,
        ThreatLevel::High,
        ThreatLevel::Moderate,
        ThreatLevel::Low,
        ThreatLevel::Minimal,
        ThreatLevel::Unknown,
    ];

    /// Classifications the engine actually assigns
    pub const KNOWN: [ThreatLevel; 5] = [
        ThreatLevel::Extreme,
        ThreatLevel::High,
        ThreatLevel::Moderate,
        ThreatLevel::Low,
        ThreatLevel::Minimal,
    ];

    /// Sort rank: 0 sorts first, `Unknown` sorts last
    pub fn rank(self) -> u8 {
        match self {
            ThreatLevel::Extreme => 0,
            ThreatLevel::High => 1,
            ThreatLevel::Moderate => 2,
            ThreatLevel::Low => 3,
            ThreatLevel::Minimal => 4,
            ThreatLevel::Unknown => 5,
        }
    }

    /// Severity score where higher is more dangerous (used by column sorting)
    pub fn severity(self) -> u8 {
        5 - self.rank()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ThreatLevel::Extreme => "EXTREME",
            ThreatLevel::High => "HIGH",
            ThreatLevel::Moderate => "MODERATE",
            ThreatLevel::Low => "LOW",
            ThreatLevel::Minimal => "MINIMAL",
            ThreatLevel::Unknown => "UNKNOWN",
        }
    }

    /// Case-insensitive parse; anything unrecognized maps to `Unknown`
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "EXTREME" => ThreatLevel::Extreme,
            "HIGH" => ThreatLevel::High,
            "MODERATE" => ThreatLevel::Moderate,
            "LOW" => ThreatLevel::Low,
            "MINIMAL" => ThreatLevel::Minimal,
            _ => ThreatLevel::Unknown,
        }
    }

    /// True for the tiers the engine logs as high threat
    pub fn is_high_threat(self) -> bool {
        matches!(self, ThreatLevel::Extreme | ThreatLevel::High)
    }
}

impl From<String> for ThreatLevel {
    fn from(value: String) -> Self {
        ThreatLevel::parse(&value)
    }
}

impl From<ThreatLevel> for String {
    fn from(level: ThreatLevel) -> Self {
        level.as_str().to_string()
    }
}

impl fmt::Display for ThreatLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Independent boolean capability tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapabilityTag {
    Super,
    Capital,
    Blops,
    Recon,
    Cyno,
    Solo,
}

impl CapabilityTag {
    pub const ALL: [CapabilityTag; 6] = [
        CapabilityTag::Super,
        CapabilityTag::Capital,
        CapabilityTag::Blops,
        CapabilityTag::Recon,
        CapabilityTag::Cyno,
        CapabilityTag::Solo,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CapabilityTag::Super => "super",
            CapabilityTag::Capital => "capital",
            CapabilityTag::Blops => "blops",
            CapabilityTag::Recon => "recon",
            CapabilityTag::Cyno => "cyno",
            CapabilityTag::Solo => "solo",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        CapabilityTag::ALL
            .into_iter()
            .find(|tag| tag.as_str().eq_ignore_ascii_case(value.trim()))
    }
}

impl fmt::Display for CapabilityTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capability flags computed by the engine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PilotFlags {
    #[serde(default)]
    pub is_cyno: bool,
    #[serde(default)]
    pub is_recon: bool,
    #[serde(default)]
    pub is_blops: bool,
    #[serde(default)]
    pub is_capital: bool,
    #[serde(default)]
    pub is_super: bool,
    #[serde(default)]
    pub is_solo: bool,
}

impl PilotFlags {
    pub fn has(&self, tag: CapabilityTag) -> bool {
        match tag {
            CapabilityTag::Super => self.is_super,
            CapabilityTag::Capital => self.is_capital,
            CapabilityTag::Blops => self.is_blops,
            CapabilityTag::Recon => self.is_recon,
            CapabilityTag::Cyno => self.is_cyno,
            CapabilityTag::Solo => self.is_solo,
        }
    }

    pub fn with(mut self, tag: CapabilityTag) -> Self {
        match tag {
            CapabilityTag::Super => self.is_super = true,
            CapabilityTag::Capital => self.is_capital = true,
            CapabilityTag::Blops => self.is_blops = true,
            CapabilityTag::Recon => self.is_recon = true,
            CapabilityTag::Cyno => self.is_cyno = true,
            CapabilityTag::Solo => self.is_solo = true,
        }
        self
    }

    /// Tags that are set, in display order
    pub fn tags(&self) -> Vec<CapabilityTag> {
        CapabilityTag::ALL
            .into_iter()
            .filter(|tag| self.has(*tag))
            .collect()
    }
}

/// Corporation or alliance membership; id, name and ticker travel together
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Affiliation {
    pub id: i64,
    pub name: String,
    pub ticker: String,
}

impl Affiliation {
    pub fn new(id: i64, name: impl Into<String>, ticker: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            ticker: ticker.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterInfo {
    pub id: CharacterId,
    pub name: String,
    #[serde(default)]
    pub corporation: Option<Affiliation>,
    #[serde(default)]
    pub alliance: Option<Affiliation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipStats {
    pub ship_type_id: i64,
    pub ship_name: String,
    pub group_id: i64,
    pub group_name: String,
    pub kills: i64,
    pub losses: i64,
}

/// 7 days x 24 hours kill activity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityHeatmap {
    pub max: i64,
    pub data: Vec<Vec<i64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemStats {
    pub system_id: i64,
    pub system_name: String,
    pub kills: i64,
}

/// Killboard statistics block, opaque to the sync core
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZkillStats {
    pub ships_destroyed: i64,
    pub ships_lost: i64,
    pub isk_destroyed: f64,
    pub isk_lost: f64,
    pub solo_kills: i64,
    pub solo_losses: i64,
    pub danger_ratio: f64,
    pub gang_ratio: f64,
    pub points_destroyed: i64,
    pub active_pvp_kills: i64,
    pub avg_attackers: f64,
    pub top_ships: Vec<ShipStats>,
    pub activity: Option<ActivityHeatmap>,
    pub top_systems: Vec<SystemStats>,
}

impl ZkillStats {
    pub fn kd_ratio(&self) -> f64 {
        if self.ships_lost > 0 {
            self.ships_destroyed as f64 / self.ships_lost as f64
        } else {
            self.ships_destroyed as f64
        }
    }

    /// Points per kill
    pub fn points_per_kill(&self) -> f64 {
        if self.ships_destroyed == 0 {
            0.0
        } else {
            self.points_destroyed as f64 / self.ships_destroyed as f64
        }
    }
}

/// One resolved (or failed) pilot lookup result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PilotIntelRecord {
    pub character: CharacterInfo,
    #[serde(default, rename = "zkill")]
    pub stats: Option<ZkillStats>,
    pub threat_level: ThreatLevel,
    #[serde(default)]
    pub flags: PilotFlags,
    #[serde(default)]
    pub error: Option<String>,
}

impl PilotIntelRecord {
    /// A successfully resolved pilot
    pub fn resolved(
        character: CharacterInfo,
        stats: Option<ZkillStats>,
        threat_level: ThreatLevel,
        flags: PilotFlags,
    ) -> Self {
        Self {
            character,
            stats,
            threat_level,
            flags,
            error: None,
        }
    }

    /// A name that failed to resolve; keeps whatever identity is known
    pub fn failed(id: CharacterId, name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            character: CharacterInfo {
                id,
                name: name.into(),
                corporation: None,
                alliance: None,
            },
            stats: None,
            threat_level: ThreatLevel::Unknown,
            flags: PilotFlags::default(),
            error: Some(error.into()),
        }
    }

    pub fn id(&self) -> CharacterId {
        self.character.id
    }

    pub fn name(&self) -> &str {
        &self.character.name
    }

    pub fn corporation(&self) -> Option<&Affiliation> {
        self.character.corporation.as_ref()
    }

    pub fn alliance(&self) -> Option<&Affiliation> {
        self.character.alliance.as_ref()
    }

    pub fn corporation_ticker(&self) -> Option<&str> {
        self.corporation().map(|c| c.ticker.as_str())
    }

    pub fn alliance_ticker(&self) -> Option<&str> {
        self.alliance().map(|a| a.ticker.as_str())
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }

    /// Statistics, unless the record carries an error
    pub fn valid_stats(&self) -> Option<&ZkillStats> {
        if self.is_failed() {
            None
        } else {
            self.stats.as_ref()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threat_rank_order() {
        let ranks: Vec<u8> = ThreatLevel::ALL.iter().map(|t| t.rank()).collect();
        assert_eq!(ranks, vec![0, 1, 2, 3, 4, 5]);
        assert!(ThreatLevel::Extreme.severity() > ThreatLevel::Minimal.severity());
    }

    #[test]
    fn test_unknown_threat_fallback() {
        let level: ThreatLevel = serde_json::from_str("\"Unknown\"").unwrap();
        assert_eq!(level, ThreatLevel::Unknown);

        let level: ThreatLevel = serde_json::from_str("\"catastrophic\"").unwrap();
        assert_eq!(level, ThreatLevel::Unknown);

        let level: ThreatLevel = serde_json::from_str("\"high\"").unwrap();
        assert_eq!(level, ThreatLevel::High);
        assert_eq!(serde_json::to_string(&level).unwrap(), "\"HIGH\"");
    }

    #[test]
    fn test_failed_record_has_no_valid_stats() {
        let mut record = PilotIntelRecord::failed(7, "Ghost", "Character not found");
        record.stats = Some(ZkillStats::default());
        assert!(record.is_failed());
        assert!(record.valid_stats().is_none());
        assert_eq!(record.threat_level, ThreatLevel::Unknown);
    }

    #[test]
    fn test_flags_tags() {
        let flags = PilotFlags::default()
            .with(CapabilityTag::Cyno)
            .with(CapabilityTag::Solo);
        assert_eq!(flags.tags(), vec![CapabilityTag::Cyno, CapabilityTag::Solo]);
        assert_eq!(CapabilityTag::parse("BLOPS"), Some(CapabilityTag::Blops));
        assert_eq!(CapabilityTag::parse("titan"), None);
    }
}

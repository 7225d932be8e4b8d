use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// On-pitch position of a player. The upstream API encodes this as
/// `element_type` 1-4.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Position {
    Gk,
    Def,
    Mid,
    Fwd,
}

impl Position {
    pub fn from_element_type(element_type: u8) -> Option<Self> {
        match element_type {
            1 => Some(Position::Gk),
            2 => Some(Position::Def),
            3 => Some(Position::Mid),
            4 => Some(Position::Fwd),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Position::Gk => "GK",
            Position::Def => "DEF",
            Position::Mid => "MID",
            Position::Fwd => "FWD",
        }
    }
}

/// Raw per-player statistics for one gameweek, as reported by the upstream
/// live endpoint. Every field defaults to zero so that schema drift on
/// optional fields never fails deserialization.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct RawPlayerStat {
    #[serde(default)]
    pub minutes: i32,
    #[serde(default)]
    pub goals_scored: i32,
    #[serde(default)]
    pub assists: i32,
    #[serde(default)]
    pub clean_sheets: i32,
    #[serde(default)]
    pub goals_conceded: i32,
    #[serde(default)]
    pub own_goals: i32,
    #[serde(default)]
    pub penalties_saved: i32,
    #[serde(default)]
    pub penalties_missed: i32,
    #[serde(default)]
    pub yellow_cards: i32,
    #[serde(default)]
    pub red_cards: i32,
    #[serde(default)]
    pub saves: i32,
    #[serde(default)]
    pub bonus: i32,
    /// Upstream aggregate including bonus. Absent early in a gameweek.
    #[serde(default)]
    pub total_points: Option<i32>,
}

/// One immutable poll result: every player's raw stats for a gameweek.
/// Replaced wholesale each poll cycle. Player ids are kept in a BTreeMap so
/// serialization (and therefore the content hash) is deterministic.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct LiveStatsSnapshot {
    pub gameweek: u32,
    pub fetched_at: DateTime<Utc>,
    pub content_hash: String,
    pub stats: BTreeMap<i64, RawPlayerStat>,
}

impl LiveStatsSnapshot {
    pub fn stat_for(&self, player_id: i64) -> RawPlayerStat {
        self.stats.get(&player_id).cloned().unwrap_or_default()
    }

    /// Static last-resort dataset served when both the upstream source and
    /// the cache are unavailable: a single default entry.
    pub fn placeholder(gameweek: u32) -> Self {
        let mut stats = BTreeMap::new();
        stats.insert(0, RawPlayerStat::default());
        Self {
            gameweek,
            fetched_at: Utc::now(),
            content_hash: String::from("placeholder"),
            stats,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.content_hash == "placeholder"
    }
}

/// Reference data for one player from the bootstrap endpoint.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PlayerInfo {
    pub id: i64,
    pub web_name: String,
    pub team: i64,
    pub element_type: u8,
}

impl PlayerInfo {
    pub fn position(&self) -> Option<Position> {
        Position::from_element_type(self.element_type)
    }
}

/// The slice of bootstrap data the scoring pipeline needs: player reference
/// info, the currently active gameweek and the total player population
/// (used to clamp rank estimates).
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BootstrapData {
    pub players: BTreeMap<i64, PlayerInfo>,
    pub current_gameweek: u32,
    pub total_players: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_from_element_type_maps_all_four() {
        assert_eq!(Position::from_element_type(1), Some(Position::Gk));
        assert_eq!(Position::from_element_type(4), Some(Position::Fwd));
        assert_eq!(Position::from_element_type(5), None);
    }

    #[test]
    fn raw_stat_tolerates_missing_fields() {
        let stat: RawPlayerStat = serde_json::from_str(r#"{"minutes": 90}"#).unwrap();
        assert_eq!(stat.minutes, 90);
        assert_eq!(stat.goals_scored, 0);
        assert_eq!(stat.total_points, None);
    }

    #[test]
    fn placeholder_snapshot_has_single_default_entry() {
        let snapshot = LiveStatsSnapshot::placeholder(7);
        assert!(snapshot.is_placeholder());
        assert_eq!(snapshot.stats.len(), 1);
        assert_eq!(snapshot.stat_for(0), RawPlayerStat::default());
    }
}

use serde::{Deserialize, Serialize};

use crate::models::player::Position;

/// A one-time rule modifier for a single gameweek.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Chip {
    None,
    Wildcard,
    FreeHit,
    BenchBoost,
    TripleCaptain,
    AssistantManager,
}

impl Chip {
    /// Chip names as the upstream API reports them on a picks response.
    pub fn from_api_name(name: Option<&str>) -> Self {
        match name {
            Some("wildcard") => Chip::Wildcard,
            Some("freehit") => Chip::FreeHit,
            Some("bboost") => Chip::BenchBoost,
            Some("3xc") => Chip::TripleCaptain,
            Some("manager") => Chip::AssistantManager,
            _ => Chip::None,
        }
    }

    pub fn api_name(&self) -> Option<&'static str> {
        match self {
            Chip::None => None,
            Chip::Wildcard => Some("wildcard"),
            Chip::FreeHit => Some("freehit"),
            Chip::BenchBoost => Some("bboost"),
            Chip::TripleCaptain => Some("3xc"),
            Chip::AssistantManager => Some("manager"),
        }
    }

    /// Wildcard and free hit waive transfer penalties for their gameweek.
    pub fn waives_transfer_penalty(&self) -> bool {
        matches!(self, Chip::Wildcard | Chip::FreeHit)
    }
}

/// One of the 15 ordered squad slots.
/// `position` is the slot rank 1-15 (12-15 are the bench, in sub order);
/// `multiplier` is 0 for bench, 1 for starter, 2 for captain, 3 under
/// triple captain.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct PickSlot {
    pub player_id: i64,
    pub position: u8,
    pub multiplier: u8,
    pub is_captain: bool,
    pub is_vice_captain: bool,
    pub player_position: Position,
}

impl PickSlot {
    pub fn is_bench(&self) -> bool {
        self.position > 11
    }
}

/// A manager's full selection for one gameweek, enriched with the transfer
/// counts the scoring engine needs.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SquadSelection {
    pub manager_id: i64,
    pub gameweek: u32,
    pub picks: Vec<PickSlot>,
    pub active_chip: Chip,
    pub transfers_made: u32,
    pub free_transfers: u32,
    /// Team whose own-team performance feeds the assistant-manager chip.
    pub assistant_team: Option<i64>,
}

impl SquadSelection {
    pub fn captain(&self) -> Option<&PickSlot> {
        self.picks.iter().find(|p| p.is_captain)
    }

    pub fn vice_captain(&self) -> Option<&PickSlot> {
        self.picks.iter().find(|p| p.is_vice_captain)
    }

    /// Starting GK-DEF-MID-FWD counts, e.g. "1-4-4-2".
    pub fn formation(&self) -> String {
        let mut counts = [0u8; 4];
        for pick in self.picks.iter().filter(|p| !p.is_bench()) {
            let idx = match pick.player_position {
                Position::Gk => 0,
                Position::Def => 1,
                Position::Mid => 2,
                Position::Fwd => 3,
            };
            counts[idx] += 1;
        }
        format!("{}-{}-{}-{}", counts[0], counts[1], counts[2], counts[3])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chip_api_names_round_trip() {
        for chip in [
            Chip::Wildcard,
            Chip::FreeHit,
            Chip::BenchBoost,
            Chip::TripleCaptain,
            Chip::AssistantManager,
        ] {
            assert_eq!(Chip::from_api_name(chip.api_name()), chip);
        }
        assert_eq!(Chip::from_api_name(None), Chip::None);
        assert_eq!(Chip::from_api_name(Some("unknown")), Chip::None);
    }

    #[test]
    fn transfer_penalty_waiver_only_for_wildcard_and_freehit() {
        assert!(Chip::Wildcard.waives_transfer_penalty());
        assert!(Chip::FreeHit.waives_transfer_penalty());
        assert!(!Chip::BenchBoost.waives_transfer_penalty());
        assert!(!Chip::None.waives_transfer_penalty());
    }
}

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::squad::SquadSelection;

/// Rank bands the sampler builds reference aggregates for.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Top1k,
    Top10k,
    Top100k,
    Top1m,
}

impl Tier {
    pub fn all() -> [Tier; 4] {
        [Tier::Top1k, Tier::Top10k, Tier::Top100k, Tier::Top1m]
    }

    /// Inclusive upper rank bound of the band.
    pub fn rank_bound(&self) -> i64 {
        match self {
            Tier::Top1k => 1_000,
            Tier::Top10k => 10_000,
            Tier::Top100k => 100_000,
            Tier::Top1m => 1_000_000,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Top1k => "top_1k",
            Tier::Top10k => "top_10k",
            Tier::Top100k => "top_100k",
            Tier::Top1m => "top_1m",
        }
    }

    /// Smallest tier whose bound contains the given rank.
    pub fn for_rank(rank: i64) -> Tier {
        Tier::all()
            .into_iter()
            .find(|t| rank <= t.rank_bound())
            .unwrap_or(Tier::Top1m)
    }
}

/// One accepted sample member: a manager whose season rank was validated to
/// fall inside the tier bound, plus their squad for the sampled gameweek.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SampledManager {
    pub manager_id: i64,
    pub season_rank: i64,
    pub live_points: i32,
    pub squad: SquadSelection,
}

/// Aggregate statistics for one tier.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TierStats {
    pub tier: Tier,
    pub sample_size: usize,
    pub average_points: f64,
    /// Formation string ("1-4-4-2") -> count of sampled starting elevens.
    pub formations: HashMap<String, u32>,
    /// Chip api name -> percentage of the sample playing it this gameweek.
    pub chip_usage: HashMap<String, f64>,
    /// Player id -> effective ownership, bounded to [0, 300].
    pub effective_ownership: HashMap<i64, f64>,
}

impl TierStats {
    pub fn eo_for(&self, player_id: i64) -> Option<f64> {
        self.effective_ownership.get(&player_id).copied()
    }
}

/// The full reference sample for a gameweek. Rebuilt once per gameweek under
/// leader election, cached with a multi-hour TTL, served stale while a
/// refresh runs.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ReferenceTierSample {
    pub gameweek: u32,
    pub built_at: DateTime<Utc>,
    pub total_players: i64,
    pub tiers: Vec<TierStats>,
}

impl ReferenceTierSample {
    pub fn tier_stats(&self, tier: Tier) -> Option<&TierStats> {
        self.tiers.iter().find(|t| t.tier == tier)
    }

    /// The tier a manager of the given season rank should be compared to.
    pub fn tier_for_rank(&self, season_rank: i64) -> Option<&TierStats> {
        self.tier_stats(Tier::for_rank(season_rank))
    }
}

/// EO = ownership% + captaincy% + 2 x triple-captaincy%, bounded to [0, 300].
pub fn effective_ownership(
    ownership_pct: f64,
    captaincy_pct: f64,
    triple_captaincy_pct: f64,
) -> f64 {
    (ownership_pct + captaincy_pct + 2.0 * triple_captaincy_pct).clamp(0.0, 300.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_for_rank_picks_smallest_containing_band() {
        assert_eq!(Tier::for_rank(1), Tier::Top1k);
        assert_eq!(Tier::for_rank(1_000), Tier::Top1k);
        assert_eq!(Tier::for_rank(1_001), Tier::Top10k);
        assert_eq!(Tier::for_rank(5_000_000), Tier::Top1m);
    }

    #[test]
    fn effective_ownership_is_bounded() {
        assert_eq!(effective_ownership(0.0, 0.0, 0.0), 0.0);
        assert_eq!(effective_ownership(100.0, 100.0, 100.0), 300.0);
        assert!((effective_ownership(50.0, 20.0, 5.0) - 80.0).abs() < f64::EPSILON);
    }
}

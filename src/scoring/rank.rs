use crate::models::scoring::ScoredPick;
use crate::models::tier::TierStats;

/// Inputs for one rank estimation.
pub struct RankInput<'a> {
    pub live_points: i32,
    pub season_points: i32,
    pub season_rank: i64,
    pub picks: &'a [ScoredPick],
    pub tier: Option<&'a TierStats>,
    pub total_players: i64,
}

/// Strategy interface for the live-rank heuristic, so the formula can be
/// swapped or recalibrated without touching call sites.
pub trait RankModel: Send + Sync {
    fn estimate(&self, input: &RankInput) -> i64;
}

/// The shipped heuristic. Its constants are uncalibrated against real
/// outcomes; treat the result as an approximation, never ground truth.
///
/// Model: performing above the reference tier's average shrinks the season
/// rank multiplicatively, and low-EO picks that score amplify the shift
/// (differential impact). Without per-player EO it degrades to a sigmoid
/// over the point surplus anchored at the tier average.
#[derive(Debug, Clone)]
pub struct HeuristicRankModel {
    /// Weight of live points against season points in the blended total.
    pub live_weight: f64,
    /// Scale of the EO differential contribution, in points.
    pub differential_scale: f64,
    /// Points of surplus that move the rank by a factor of e.
    pub spread: f64,
}

impl Default for HeuristicRankModel {
    fn default() -> Self {
        Self {
            live_weight: 1.0,
            differential_scale: 0.35,
            spread: 18.0,
        }
    }
}

impl RankModel for HeuristicRankModel {
    fn estimate(&self, input: &RankInput) -> i64 {
        let estimated = match input.tier {
            Some(tier) if !tier.effective_ownership.is_empty() => {
                let surplus =
                    self.live_weight * f64::from(input.live_points) - tier.average_points;
                let differential = self.differential_bonus(input.picks);
                let shift = (surplus + self.differential_scale * differential) / self.spread;
                (input.season_rank as f64) * (-shift).exp()
            }
            tier => {
                // Sigmoid fallback: no per-player EO to reason about.
                let anchor = tier.map(|t| t.average_points).unwrap_or(50.0);
                let weighted = self.live_weight * f64::from(input.live_points);
                let x = (weighted - anchor) / self.spread;
                let fraction = 1.0 / (1.0 + x.exp());
                (input.total_players as f64) * fraction
            }
        };
        (estimated.round() as i64).clamp(1, input.total_players.max(1))
    }
}

impl HeuristicRankModel {
    /// Scoring picks below 100% EO move rank favourably; the lower the EO
    /// on a high-scoring pick, the larger the move.
    fn differential_bonus(&self, picks: &[ScoredPick]) -> f64 {
        picks
            .iter()
            .filter(|p| p.points > 0)
            .filter_map(|p| {
                p.effective_ownership
                    .map(|eo| f64::from(p.points) * (100.0 - eo.min(100.0)) / 100.0)
            })
            .sum()
    }
}

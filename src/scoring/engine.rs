use std::collections::HashMap;

use chrono::Utc;

use crate::models::player::{LiveStatsSnapshot, Position};
use crate::models::scoring::{AutoSub, LiveScore, ScoredPick};
use crate::models::squad::{Chip, PickSlot, SquadSelection};
use crate::scoring::rules;

/// Points docked per transfer beyond the free allowance.
const TRANSFER_HIT: i32 = 4;

/// Pure live-scoring engine. Same squad, stats and chip always produce the
/// same picks; callers persist the result.
pub struct ScoreCalculator;

impl ScoreCalculator {
    /// Scores a manager's squad against one raw-stat snapshot.
    ///
    /// `assistant_points` is the secondary contribution of the designated
    /// reference team when the assistant-manager chip is active; ignored
    /// otherwise. `effective_ownership` comes from the tier sample when one
    /// is available.
    pub fn score(
        squad: &SquadSelection,
        snapshot: &LiveStatsSnapshot,
        assistant_points: i32,
        effective_ownership: Option<&HashMap<i64, f64>>,
    ) -> LiveScore {
        let mut slots: Vec<PickSlot> = squad.picks.clone();
        slots.sort_by_key(|p| p.position);

        if squad.active_chip == Chip::TripleCaptain {
            for slot in slots.iter_mut().filter(|s| s.is_captain) {
                slot.multiplier = 3;
            }
        }

        // Captaincy fallback: a benched-in-spirit captain hands the armband
        // to a playing vice. The captain's slot drops to multiplier 1 and
        // contributes nothing.
        let mut zeroed_player: Option<i64> = None;
        let captain_minutes = slots
            .iter()
            .find(|s| s.is_captain)
            .map(|s| snapshot.stat_for(s.player_id).minutes);
        let vice_minutes = slots
            .iter()
            .find(|s| s.is_vice_captain)
            .map(|s| snapshot.stat_for(s.player_id).minutes);
        if captain_minutes == Some(0) && vice_minutes.map(|m| m > 0).unwrap_or(false) {
            let promoted = slots
                .iter()
                .find(|s| s.is_captain)
                .map(|s| s.multiplier)
                .unwrap_or(2);
            for slot in slots.iter_mut() {
                if slot.is_captain {
                    slot.multiplier = 1;
                    zeroed_player = Some(slot.player_id);
                } else if slot.is_vice_captain {
                    slot.multiplier = promoted;
                }
            }
        }

        // Auto-substitution: replace zero-minute starters with the first
        // playing bench player of a compatible kind (keeper for keeper,
        // outfield for outfield), in bench order. Formation legality of the
        // result is not verified; an autosub can in principle leave an
        // illegal starting shape.
        let mut auto_subs = Vec::new();
        if squad.active_chip != Chip::BenchBoost {
            let bench_ids: Vec<i64> = slots
                .iter()
                .filter(|s| s.is_bench())
                .map(|s| s.player_id)
                .collect();
            let mut used_bench: Vec<i64> = Vec::new();

            for starter_idx in 0..slots.len() {
                if slots[starter_idx].is_bench() {
                    continue;
                }
                if snapshot.stat_for(slots[starter_idx].player_id).minutes != 0 {
                    continue;
                }
                if zeroed_player == Some(slots[starter_idx].player_id) {
                    // The demoted captain keeps their slot; the armband
                    // already moved.
                    continue;
                }
                let starter_is_gk = slots[starter_idx].player_position == Position::Gk;
                let replacement = bench_ids.iter().find(|id| {
                    if used_bench.contains(id) {
                        return false;
                    }
                    let bench_slot = slots.iter().find(|s| s.player_id == **id).unwrap();
                    let kind_matches = (bench_slot.player_position == Position::Gk) == starter_is_gk;
                    kind_matches && snapshot.stat_for(**id).minutes > 0
                });
                if let Some(&in_id) = replacement {
                    used_bench.push(in_id);
                    let out_id = slots[starter_idx].player_id;
                    let bench_idx = slots.iter().position(|s| s.player_id == in_id).unwrap();
                    // Swap the players between slots; multipliers stay with
                    // the slots so the replacement's points land in the
                    // vacated position.
                    let in_position = slots[bench_idx].player_position;
                    let out_position = slots[starter_idx].player_position;
                    slots[starter_idx].player_id = in_id;
                    slots[starter_idx].player_position = in_position;
                    slots[bench_idx].player_id = out_id;
                    slots[bench_idx].player_position = out_position;
                    auto_subs.push(AutoSub {
                        out_player_id: out_id,
                        in_player_id: in_id,
                    });
                }
            }
        }

        let bench_counts = squad.active_chip == Chip::BenchBoost;
        let mut picks = Vec::with_capacity(slots.len());
        let mut counted_total = 0;
        for slot in &slots {
            let stat = snapshot.stat_for(slot.player_id);
            let (raw, events) = if zeroed_player == Some(slot.player_id) {
                (0, Vec::new())
            } else {
                (
                    rules::raw_points(slot.player_position, &stat),
                    rules::events_for(slot.player_position, &stat),
                )
            };
            let points = if slot.is_bench() {
                if bench_counts {
                    raw
                } else {
                    0
                }
            } else {
                raw * i32::from(slot.multiplier)
            };
            counted_total += points;
            picks.push(ScoredPick {
                player_id: slot.player_id,
                position: slot.position,
                multiplier: slot.multiplier,
                is_captain: slot.is_captain,
                is_vice_captain: slot.is_vice_captain,
                raw_points: raw,
                points,
                minutes: stat.minutes,
                events,
                effective_ownership: effective_ownership
                    .and_then(|eo| eo.get(&slot.player_id).copied()),
            });
        }

        let transfer_penalty = if squad.active_chip.waives_transfer_penalty() {
            0
        } else {
            let hits = squad.transfers_made.saturating_sub(squad.free_transfers) as i32;
            -TRANSFER_HIT * hits
        };
        let assistant_bonus = if squad.active_chip == Chip::AssistantManager {
            assistant_points
        } else {
            0
        };

        LiveScore {
            manager_id: squad.manager_id,
            gameweek: squad.gameweek,
            picks,
            auto_subs,
            total_points: counted_total + transfer_penalty + assistant_bonus,
            transfer_penalty,
            assistant_bonus,
            computed_at: Utc::now(),
        }
    }
}

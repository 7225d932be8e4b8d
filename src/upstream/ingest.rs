use std::collections::BTreeMap;

use chrono::Utc;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::models::errors::LiveError;
use crate::models::manager::ManagerSnapshot;
use crate::models::player::{BootstrapData, LiveStatsSnapshot, PlayerInfo, Position, RawPlayerStat};
use crate::models::squad::{Chip, PickSlot, SquadSelection};

/// Bootstrap response -> player reference data, active gameweek and total
/// player population. Optional fields fall back to safe defaults.
pub fn bootstrap_data(body: &Value) -> Result<BootstrapData, LiveError> {
    let elements = body
        .get("elements")
        .and_then(Value::as_array)
        .ok_or_else(|| LiveError::UpstreamSchemaInvalid("bootstrap missing elements".into()))?;

    let mut players = BTreeMap::new();
    for element in elements {
        let info: PlayerInfo = serde_json::from_value(element.clone())
            .map_err(|e| LiveError::UpstreamSchemaInvalid(format!("bootstrap element: {}", e)))?;
        players.insert(info.id, info);
    }

    let current_gameweek = body
        .get("events")
        .and_then(Value::as_array)
        .and_then(|events| {
            events
                .iter()
                .find(|e| e.get("is_current").and_then(Value::as_bool).unwrap_or(false))
        })
        .and_then(|e| e.get("id"))
        .and_then(Value::as_u64)
        .unwrap_or(1) as u32;

    let total_players = body
        .get("total_players")
        .and_then(Value::as_i64)
        .unwrap_or(10_000_000);

    Ok(BootstrapData {
        players,
        current_gameweek,
        total_players,
    })
}

/// Live event response -> an immutable per-poll snapshot, content-hashed for
/// deduplication against the previous cycle.
pub fn live_snapshot(gameweek: u32, body: &Value) -> Result<LiveStatsSnapshot, LiveError> {
    let elements = body
        .get("elements")
        .and_then(Value::as_array)
        .ok_or_else(|| LiveError::UpstreamSchemaInvalid("live missing elements".into()))?;

    let mut stats = BTreeMap::new();
    for element in elements {
        let id = element
            .get("id")
            .and_then(Value::as_i64)
            .ok_or_else(|| LiveError::UpstreamSchemaInvalid("live element missing id".into()))?;
        let stat: RawPlayerStat = element
            .get("stats")
            .map(|s| serde_json::from_value(s.clone()))
            .transpose()
            .map_err(|e| LiveError::UpstreamSchemaInvalid(format!("live stats: {}", e)))?
            .unwrap_or_default();
        stats.insert(id, stat);
    }

    Ok(LiveStatsSnapshot {
        gameweek,
        fetched_at: Utc::now(),
        content_hash: content_hash(&stats)?,
        stats,
    })
}

/// Deterministic digest of the stats body, independent of fetch time.
pub fn content_hash(stats: &BTreeMap<i64, RawPlayerStat>) -> Result<String, LiveError> {
    let canonical = serde_json::to_vec(stats)
        .map_err(|e| LiveError::UpstreamSchemaInvalid(format!("hashing stats: {}", e)))?;
    let mut hasher = Sha256::new();
    hasher.update(&canonical);
    Ok(hex::encode(hasher.finalize()))
}

/// Picks response -> a manager's squad selection for the gameweek. Player
/// positions are resolved through bootstrap data; a pick whose player is
/// unknown defaults to midfielder rather than failing the squad.
pub fn squad_from_picks(
    manager_id: i64,
    gameweek: u32,
    body: &Value,
    bootstrap: &BootstrapData,
) -> Result<SquadSelection, LiveError> {
    let raw_picks = body
        .get("picks")
        .and_then(Value::as_array)
        .ok_or_else(|| LiveError::UpstreamSchemaInvalid("picks missing array".into()))?;

    let mut picks = Vec::with_capacity(raw_picks.len());
    for raw in raw_picks {
        let player_id = raw
            .get("element")
            .and_then(Value::as_i64)
            .ok_or_else(|| LiveError::UpstreamSchemaInvalid("pick missing element".into()))?;
        let player_position = bootstrap
            .players
            .get(&player_id)
            .and_then(PlayerInfo::position)
            .unwrap_or(Position::Mid);
        picks.push(PickSlot {
            player_id,
            position: raw.get("position").and_then(Value::as_u64).unwrap_or(0) as u8,
            multiplier: raw.get("multiplier").and_then(Value::as_u64).unwrap_or(1) as u8,
            is_captain: raw
                .get("is_captain")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            is_vice_captain: raw
                .get("is_vice_captain")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            player_position,
        });
    }

    let active_chip = Chip::from_api_name(body.get("active_chip").and_then(Value::as_str));
    let transfers_made = body
        .get("entry_history")
        .and_then(|h| h.get("event_transfers"))
        .and_then(Value::as_u64)
        .unwrap_or(0) as u32;

    let assistant_team = body
        .get("assistant_manager")
        .and_then(|am| am.get("team"))
        .and_then(Value::as_i64);

    Ok(SquadSelection {
        manager_id,
        gameweek,
        picks,
        active_chip,
        transfers_made,
        free_transfers: 1,
        assistant_team,
    })
}

/// Entry response -> season-level manager snapshot.
pub fn manager_snapshot(body: &Value, current_gameweek: u32) -> Result<ManagerSnapshot, LiveError> {
    let manager_id = body
        .get("id")
        .and_then(Value::as_i64)
        .ok_or_else(|| LiveError::UpstreamSchemaInvalid("entry missing id".into()))?;
    let name = format!(
        "{} {}",
        body.get("player_first_name")
            .and_then(Value::as_str)
            .unwrap_or(""),
        body.get("player_last_name")
            .and_then(Value::as_str)
            .unwrap_or("")
    )
    .trim()
    .to_string();

    Ok(ManagerSnapshot {
        manager_id,
        name,
        season_points: body
            .get("summary_overall_points")
            .and_then(Value::as_i64)
            .unwrap_or(0) as i32,
        season_rank: body
            .get("summary_overall_rank")
            .and_then(Value::as_i64)
            .unwrap_or(0),
        current_gameweek: body
            .get("current_event")
            .and_then(Value::as_u64)
            .map(|e| e as u32)
            .unwrap_or(current_gameweek),
        active_chip: Chip::None,
    })
}

/// Standings page -> (manager id, rank) pairs for sample seeding.
pub fn standings_entries(body: &Value) -> Result<Vec<(i64, i64)>, LiveError> {
    let results = body
        .get("standings")
        .and_then(|s| s.get("results"))
        .and_then(Value::as_array)
        .ok_or_else(|| LiveError::UpstreamSchemaInvalid("standings missing results".into()))?;

    Ok(results
        .iter()
        .filter_map(|r| {
            let entry = r.get("entry").and_then(Value::as_i64)?;
            let rank = r.get("rank").and_then(Value::as_i64)?;
            Some((entry, rank))
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bootstrap_fixture() -> BootstrapData {
        let body = json!({
            "elements": [
                {"id": 1, "web_name": "Keeper", "team": 1, "element_type": 1},
                {"id": 2, "web_name": "Back", "team": 1, "element_type": 2},
            ],
            "events": [
                {"id": 1, "is_current": false},
                {"id": 2, "is_current": true},
            ],
            "total_players": 9_500_000
        });
        bootstrap_data(&body).unwrap()
    }

    #[test]
    fn bootstrap_extracts_current_gameweek_and_population() {
        let data = bootstrap_fixture();
        assert_eq!(data.current_gameweek, 2);
        assert_eq!(data.total_players, 9_500_000);
        assert_eq!(data.players[&1].position(), Some(Position::Gk));
    }

    #[test]
    fn identical_live_bodies_hash_identically() {
        let body = json!({"elements": [{"id": 1, "stats": {"minutes": 45, "goals_scored": 1}}]});
        let a = live_snapshot(2, &body).unwrap();
        let b = live_snapshot(2, &body).unwrap();
        assert_eq!(a.content_hash, b.content_hash);

        let changed = json!({"elements": [{"id": 1, "stats": {"minutes": 90, "goals_scored": 1}}]});
        let c = live_snapshot(2, &changed).unwrap();
        assert_ne!(a.content_hash, c.content_hash);
    }

    #[test]
    fn squad_resolves_positions_and_chip() {
        let bootstrap = bootstrap_fixture();
        let body = json!({
            "active_chip": "bboost",
            "entry_history": {"event_transfers": 3},
            "picks": [
                {"element": 1, "position": 1, "multiplier": 1, "is_captain": false, "is_vice_captain": false},
                {"element": 2, "position": 2, "multiplier": 2, "is_captain": true, "is_vice_captain": false},
            ]
        });
        let squad = squad_from_picks(42, 2, &body, &bootstrap).unwrap();
        assert_eq!(squad.active_chip, Chip::BenchBoost);
        assert_eq!(squad.transfers_made, 3);
        assert_eq!(squad.picks[0].player_position, Position::Gk);
        assert!(squad.picks[1].is_captain);
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::squad::Chip;

/// Season-level state for one manager. Refreshed on a longer cadence than
/// live points; season totals come from the upstream entry endpoint.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ManagerSnapshot {
    pub manager_id: i64,
    pub name: String,
    pub season_points: i32,
    pub season_rank: i64,
    pub current_gameweek: u32,
    pub active_chip: Chip,
}

/// A transfer a manager is planning through the UI. Cache-backed with a TTL,
/// never authoritative.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PlannedTransfer {
    pub out_player_id: i64,
    pub in_player_id: i64,
    pub recorded_at: DateTime<Utc>,
}

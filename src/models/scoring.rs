use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The kind of a single scoring contribution.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScoreEventKind {
    Appearance,
    GoalScored,
    Assist,
    CleanSheet,
    Saves,
    GoalsConceded,
    YellowCard,
    RedCard,
    PenaltyMissed,
    PenaltySaved,
    OwnGoal,
    Bonus,
}

/// One scoring event on a pick: what happened, how often, and what it was
/// worth in total (before the slot multiplier).
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ScoreEvent {
    pub kind: ScoreEventKind,
    pub points: i32,
    pub count: i32,
}

/// An automatic bench-for-starter substitution.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct AutoSub {
    pub out_player_id: i64,
    pub in_player_id: i64,
}

/// A squad slot enriched with live scoring output. Derived data: always
/// recomputable from the squad, the raw stats and the active chip.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ScoredPick {
    pub player_id: i64,
    pub position: u8,
    pub multiplier: u8,
    pub is_captain: bool,
    pub is_vice_captain: bool,
    /// Points before the slot multiplier.
    pub raw_points: i32,
    /// Points this slot contributes: raw_points x multiplier.
    pub points: i32,
    pub minutes: i32,
    pub events: Vec<ScoreEvent>,
    pub effective_ownership: Option<f64>,
}

/// Full scoring output for one manager and gameweek.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct LiveScore {
    pub manager_id: i64,
    pub gameweek: u32,
    pub picks: Vec<ScoredPick>,
    pub auto_subs: Vec<AutoSub>,
    /// Sum of counted slot points plus assistant bonus plus transfer penalty.
    pub total_points: i32,
    pub transfer_penalty: i32,
    pub assistant_bonus: i32,
    pub computed_at: DateTime<Utc>,
}

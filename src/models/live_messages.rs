use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::player::LiveStatsSnapshot;
use crate::models::scoring::{AutoSub, ScoredPick};

/// Messages a client may send over the push channel. Unknown types are
/// ignored by the connection actor.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Subscribe {
        manager_id: i64,
        gameweek: u32,
    },
    Unsubscribe {
        manager_id: i64,
        gameweek: u32,
    },
    Ping,
}

/// Messages the server pushes to a connected client.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Sent on connect: the latest known snapshot for the active gameweek,
    /// absent only when no data has ever been fetched.
    Init {
        gameweek: u32,
        snapshot: Option<LiveStatsSnapshot>,
        degraded: bool,
    },
    /// Recomputed live state for a subscribed manager.
    LiveUpdate {
        manager_id: i64,
        gameweek: u32,
        picks: Vec<ScoredPick>,
        auto_subs: Vec<AutoSub>,
        total_points: i32,
        transfer_penalty: i32,
        estimated_rank: i64,
        computed_at: DateTime<Utc>,
    },
    /// The request was invalid; the connection stays open.
    Error { message: String },
    /// Upstream data is unavailable and a stale or placeholder snapshot is
    /// being served.
    Degraded { message: String },
    Pong,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscribe_parses_required_fields() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"subscribe","manager_id":42,"gameweek":3}"#).unwrap();
        assert_eq!(
            msg,
            ClientMessage::Subscribe {
                manager_id: 42,
                gameweek: 3
            }
        );
    }

    #[test]
    fn subscribe_without_manager_id_is_rejected() {
        let parsed = serde_json::from_str::<ClientMessage>(r#"{"type":"subscribe","gameweek":3}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn server_messages_are_tagged() {
        let json = serde_json::to_string(&ServerMessage::Pong).unwrap();
        assert_eq!(json, r#"{"type":"pong"}"#);
    }
}

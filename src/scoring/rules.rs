use crate::models::player::{Position, RawPlayerStat};
use crate::models::scoring::{ScoreEvent, ScoreEventKind};

/// Position-dependent value of a goal.
pub fn goal_points(position: Position) -> i32 {
    match position {
        Position::Gk | Position::Def => 6,
        Position::Mid => 5,
        Position::Fwd => 4,
    }
}

/// Position-dependent value of a clean sheet.
pub fn clean_sheet_points(position: Position) -> i32 {
    match position {
        Position::Gk | Position::Def => 4,
        Position::Mid => 1,
        Position::Fwd => 0,
    }
}

/// Appearance points: 1 for any minutes, 2 from 60 minutes.
pub fn appearance_points(minutes: i32) -> i32 {
    if minutes >= 60 {
        2
    } else if minutes > 0 {
        1
    } else {
        0
    }
}

/// Derives the scoring events for one player. Events that contribute
/// nothing (zero count or zero value at this position) are omitted, so a
/// goalkeeper with two saves produces no saves event at all.
pub fn events_for(position: Position, stat: &RawPlayerStat) -> Vec<ScoreEvent> {
    let mut events = Vec::new();
    let mut push = |kind: ScoreEventKind, count: i32, points: i32| {
        if count > 0 && points != 0 {
            events.push(ScoreEvent {
                kind,
                points,
                count,
            });
        }
    };

    push(
        ScoreEventKind::Appearance,
        i32::from(stat.minutes > 0),
        appearance_points(stat.minutes),
    );
    push(
        ScoreEventKind::GoalScored,
        stat.goals_scored,
        stat.goals_scored * goal_points(position),
    );
    push(ScoreEventKind::Assist, stat.assists, stat.assists * 3);
    push(
        ScoreEventKind::CleanSheet,
        stat.clean_sheets,
        stat.clean_sheets * clean_sheet_points(position),
    );
    if position == Position::Gk {
        push(ScoreEventKind::Saves, stat.saves, stat.saves / 3);
    }
    if matches!(position, Position::Gk | Position::Def) {
        push(
            ScoreEventKind::GoalsConceded,
            stat.goals_conceded,
            -(stat.goals_conceded / 2),
        );
    }
    push(
        ScoreEventKind::YellowCard,
        stat.yellow_cards,
        -stat.yellow_cards,
    );
    push(ScoreEventKind::RedCard, stat.red_cards, -3 * stat.red_cards);
    push(
        ScoreEventKind::PenaltyMissed,
        stat.penalties_missed,
        -2 * stat.penalties_missed,
    );
    push(
        ScoreEventKind::PenaltySaved,
        stat.penalties_saved,
        5 * stat.penalties_saved,
    );
    push(ScoreEventKind::OwnGoal, stat.own_goals, -2 * stat.own_goals);
    push(ScoreEventKind::Bonus, i32::from(stat.bonus > 0), stat.bonus);

    events
}

/// Points one player has earned before any slot multiplier. The upstream
/// aggregate is preferred when present; otherwise the event sum stands in.
pub fn raw_points(position: Position, stat: &RawPlayerStat) -> i32 {
    match stat.total_points {
        Some(total) => total,
        None => events_for(position, stat).iter().map(|e| e.points).sum(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn goalkeeper_with_two_saves_gets_no_saves_event() {
        let stat = RawPlayerStat {
            minutes: 90,
            saves: 2,
            ..Default::default()
        };
        let events = events_for(Position::Gk, &stat);
        assert!(!events.iter().any(|e| e.kind == ScoreEventKind::Saves));
    }

    #[test]
    fn goalkeeper_with_four_saves_gets_one_point() {
        let stat = RawPlayerStat {
            minutes: 90,
            saves: 4,
            ..Default::default()
        };
        let events = events_for(Position::Gk, &stat);
        let saves = events
            .iter()
            .find(|e| e.kind == ScoreEventKind::Saves)
            .unwrap();
        assert_eq!(saves.points, 1);
        assert_eq!(saves.count, 4);
    }

    #[test]
    fn goal_value_varies_by_position() {
        let stat = RawPlayerStat {
            minutes: 90,
            goals_scored: 2,
            ..Default::default()
        };
        for (position, expected) in [
            (Position::Gk, 12),
            (Position::Def, 12),
            (Position::Mid, 10),
            (Position::Fwd, 8),
        ] {
            let events = events_for(position, &stat);
            let goals = events
                .iter()
                .find(|e| e.kind == ScoreEventKind::GoalScored)
                .unwrap();
            assert_eq!(goals.points, expected);
        }
    }

    #[test]
    fn conceded_penalty_applies_to_defence_only() {
        let stat = RawPlayerStat {
            minutes: 90,
            goals_conceded: 3,
            ..Default::default()
        };
        let def_events = events_for(Position::Def, &stat);
        assert!(def_events
            .iter()
            .any(|e| e.kind == ScoreEventKind::GoalsConceded && e.points == -1));
        let mid_events = events_for(Position::Mid, &stat);
        assert!(!mid_events
            .iter()
            .any(|e| e.kind == ScoreEventKind::GoalsConceded));
    }

    #[test]
    fn raw_points_prefers_upstream_total() {
        let stat = RawPlayerStat {
            minutes: 90,
            total_points: Some(10),
            ..Default::default()
        };
        assert_eq!(raw_points(Position::Mid, &stat), 10);
    }

    #[test]
    fn raw_points_falls_back_to_event_sum() {
        let stat = RawPlayerStat {
            minutes: 90,
            goals_scored: 1,
            yellow_cards: 1,
            ..Default::default()
        };
        // 2 appearance + 5 goal - 1 yellow
        assert_eq!(raw_points(Position::Mid, &stat), 6);
    }
}

use liverank_backend::models::player::RawPlayerStat;
use liverank_backend::models::squad::Chip;
use liverank_backend::scoring::ScoreCalculator;

mod common;
use common::utils::{fixture_snapshot, fixture_squad};

#[test]
fn captain_doubles_and_benched_starter_is_replaced() {
    let squad = fixture_squad(42, 7);
    let snapshot = fixture_snapshot(7);

    let score = ScoreCalculator::score(&squad, &snapshot, 0, None);

    // Ten starters on 2, the captain on 9 doubled, the zero-minute
    // defender swapped for the first playing outfield bench player.
    assert_eq!(score.total_points, 38);
    assert_eq!(score.auto_subs.len(), 1);
    assert_eq!(score.auto_subs[0].out_player_id, 3);
    assert_eq!(score.auto_subs[0].in_player_id, 13);

    let captain = score.picks.iter().find(|p| p.is_captain).unwrap();
    assert_eq!(captain.points, 18);
    assert_eq!(captain.raw_points, 9);
}

#[test]
fn armband_falls_back_to_playing_vice() {
    let squad = fixture_squad(42, 7);
    let mut snapshot = fixture_snapshot(7);
    snapshot.stats.insert(
        10,
        RawPlayerStat {
            minutes: 0,
            total_points: Some(0),
            ..Default::default()
        },
    );

    let score = ScoreCalculator::score(&squad, &snapshot, 0, None);

    let vice = score.picks.iter().find(|p| p.is_vice_captain).unwrap();
    assert_eq!(vice.multiplier, 2);
    assert_eq!(vice.points, 4);

    // The demoted captain keeps the slot at multiplier 1 with no points
    // and no substitute.
    let captain = score.picks.iter().find(|p| p.is_captain).unwrap();
    assert_eq!(captain.multiplier, 1);
    assert_eq!(captain.points, 0);
    assert!(score.auto_subs.iter().all(|s| s.out_player_id != 10));

    assert_eq!(score.total_points, 22);
}

#[test]
fn keeper_is_only_replaced_by_the_bench_keeper() {
    let squad = fixture_squad(42, 7);
    let mut snapshot = fixture_snapshot(7);
    snapshot.stats.insert(
        1,
        RawPlayerStat {
            minutes: 0,
            total_points: Some(0),
            ..Default::default()
        },
    );

    let score = ScoreCalculator::score(&squad, &snapshot, 0, None);

    let gk_sub = score
        .auto_subs
        .iter()
        .find(|s| s.out_player_id == 1)
        .expect("keeper should be substituted");
    assert_eq!(gk_sub.in_player_id, 12);
    assert_eq!(score.total_points, 38);
}

#[test]
fn no_substitution_when_the_bench_did_not_play() {
    let squad = fixture_squad(42, 7);
    let mut snapshot = fixture_snapshot(7);
    for bench_id in 12..=15i64 {
        snapshot.stats.insert(
            bench_id,
            RawPlayerStat {
                minutes: 0,
                total_points: Some(0),
                ..Default::default()
            },
        );
    }

    let score = ScoreCalculator::score(&squad, &snapshot, 0, None);

    assert!(score.auto_subs.is_empty());
    // The benched starter simply contributes nothing.
    assert_eq!(score.total_points, 36);
}

#[test]
fn bench_boost_counts_all_fifteen_without_substitutions() {
    let mut squad = fixture_squad(42, 7);
    squad.active_chip = Chip::BenchBoost;
    let snapshot = fixture_snapshot(7);

    let score = ScoreCalculator::score(&squad, &snapshot, 0, None);

    assert!(score.auto_subs.is_empty());
    // 9 playing starters on 2, captain on 18, bench 4 x 2; the
    // zero-minute defender stays and scores nothing.
    assert_eq!(score.total_points, 44);
}

#[test]
fn triple_captain_trebles_the_armband() {
    let mut squad = fixture_squad(42, 7);
    squad.active_chip = Chip::TripleCaptain;
    let snapshot = fixture_snapshot(7);

    let score = ScoreCalculator::score(&squad, &snapshot, 0, None);

    let captain = score.picks.iter().find(|p| p.is_captain).unwrap();
    assert_eq!(captain.multiplier, 3);
    assert_eq!(captain.points, 27);
    assert_eq!(score.total_points, 47);
}

#[test]
fn transfer_hits_are_docked_unless_waived() {
    let mut squad = fixture_squad(42, 7);
    squad.transfers_made = 3;
    squad.free_transfers = 1;
    let snapshot = fixture_snapshot(7);

    let score = ScoreCalculator::score(&squad, &snapshot, 0, None);
    assert_eq!(score.transfer_penalty, -8);
    assert_eq!(score.total_points, 30);

    squad.active_chip = Chip::Wildcard;
    let waived = ScoreCalculator::score(&squad, &snapshot, 0, None);
    assert_eq!(waived.transfer_penalty, 0);
    assert_eq!(waived.total_points, 38);
}

#[test]
fn assistant_bonus_only_counts_with_the_chip() {
    let mut squad = fixture_squad(42, 7);
    let snapshot = fixture_snapshot(7);

    let without = ScoreCalculator::score(&squad, &snapshot, 6, None);
    assert_eq!(without.assistant_bonus, 0);

    squad.active_chip = Chip::AssistantManager;
    let with = ScoreCalculator::score(&squad, &snapshot, 6, None);
    assert_eq!(with.assistant_bonus, 6);
    assert_eq!(with.total_points, without.total_points + 6);
}

#[test]
fn scoring_is_deterministic_for_identical_inputs() {
    let squad = fixture_squad(42, 7);
    let snapshot = fixture_snapshot(7);

    let first = ScoreCalculator::score(&squad, &snapshot, 0, None);
    let second = ScoreCalculator::score(&squad, &snapshot, 0, None);

    assert_eq!(first.total_points, second.total_points);
    assert_eq!(first.auto_subs, second.auto_subs);
    assert_eq!(first.picks, second.picks);
}

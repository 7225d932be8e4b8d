use std::collections::BTreeMap;
use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use once_cell::sync::Lazy;

use liverank_backend::cache::{CacheService, LockService};
use liverank_backend::config::settings::SamplerSettings;
use liverank_backend::config::upstream::UpstreamSettings;
use liverank_backend::models::manager::ManagerSnapshot;
use liverank_backend::models::player::{
    BootstrapData, LiveStatsSnapshot, PlayerInfo, Position, RawPlayerStat,
};
use liverank_backend::models::squad::{Chip, PickSlot, SquadSelection};
use liverank_backend::run;
use liverank_backend::scoring::HeuristicRankModel;
use liverank_backend::services::telemetry::{get_subscriber, init_subscriber};
use liverank_backend::services::{BroadcastService, LiveScoreService, TierSamplerService};
use liverank_backend::upstream::ResilientClient;

// Ensure that the `tracing` stack is only initialised once using `once_cell`
static TRACING: Lazy<()> = Lazy::new(|| {
    let default_filter_level = "info".to_string();
    let subscriber_name = "test".to_string();

    if std::env::var("TEST_LOG").is_ok() {
        let subscriber = get_subscriber(subscriber_name, default_filter_level, std::io::stdout);
        init_subscriber(subscriber);
    } else {
        let subscriber = get_subscriber(subscriber_name, default_filter_level, std::io::sink);
        init_subscriber(subscriber);
    }
});

pub struct TestApp {
    pub address: String,
    pub cache: CacheService,
    pub scores: LiveScoreService,
    pub broadcaster: BroadcastService,
}

/// Upstream settings pointing at a dead endpoint: every fetch fails fast,
/// so tests exercise the cache-backed paths deterministically.
pub fn unreachable_upstream() -> UpstreamSettings {
    UpstreamSettings {
        base_url: "http://127.0.0.1:9/api/".to_string(),
        timeout_seconds: 1,
        max_retries: 0,
        base_backoff_ms: 1,
        rate_limit_backoff_seconds: 1,
        response_cache_ttl_seconds: 1,
    }
}

pub fn test_sampler_settings() -> SamplerSettings {
    SamplerSettings {
        seed_leagues: Vec::new(),
        per_tier_target: 2,
        min_sample_size: 0,
        fetch_concurrency: 2,
        cache_ttl_hours: 1,
        leader_wait_seconds: 1,
    }
}

pub fn build_services() -> (CacheService, LiveScoreService, BroadcastService) {
    let cache = CacheService::in_memory();
    let client = ResilientClient::new(unreachable_upstream(), cache.clone())
        .expect("Failed to build the upstream client");
    let lock = LockService::new(cache.coordination_store(), "test-worker".to_string());
    let sampler = TierSamplerService::new(
        client.clone(),
        cache.clone(),
        lock,
        test_sampler_settings(),
    );
    let scores = LiveScoreService::new(
        client,
        cache.clone(),
        sampler,
        Arc::new(HeuristicRankModel::default()),
    );
    let broadcaster = BroadcastService::new(scores.clone());
    (cache, scores, broadcaster)
}

pub async fn spawn_app() -> TestApp {
    // The first time `initialize` is invoked the code in `TRACING` is executed.
    // All other invocations will instead skip execution.
    Lazy::force(&TRACING);

    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    // Get port assigned by the OS
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    let (cache, scores, broadcaster) = build_services();
    let server = run(
        listener,
        cache.clone(),
        scores.clone(),
        broadcaster.clone(),
        None,
    )
    .expect("Failed to bind address");
    // Launch the server as a background task
    let _ = tokio::spawn(server);

    TestApp {
        address,
        cache,
        scores,
        broadcaster,
    }
}

/// 15 slots in the canonical layout: GK, 4 DEF, 4 MID, 2 FWD starting,
/// then GK/MID/FWD/FWD on the bench. Captain 10, vice 11.
pub fn fixture_squad(manager_id: i64, gameweek: u32) -> SquadSelection {
    let mut picks = Vec::new();
    for player_id in 1..=15i64 {
        let position = player_id as u8;
        let player_position = match position {
            1 | 12 => Position::Gk,
            2..=5 => Position::Def,
            6..=9 | 13 => Position::Mid,
            _ => Position::Fwd,
        };
        picks.push(PickSlot {
            player_id,
            position,
            multiplier: match position {
                10 => 2,
                12..=15 => 0,
                _ => 1,
            },
            is_captain: position == 10,
            is_vice_captain: position == 11,
            player_position,
        });
    }
    SquadSelection {
        manager_id,
        gameweek,
        picks,
        active_chip: Chip::None,
        transfers_made: 0,
        free_transfers: 1,
        assistant_team: None,
    }
}

fn fixture_bootstrap(gameweek: u32) -> BootstrapData {
    let mut players = BTreeMap::new();
    for player_id in 1..=15i64 {
        let element_type = match player_id {
            1 | 12 => 1,
            2..=5 => 2,
            6..=9 | 13 => 3,
            _ => 4,
        };
        players.insert(
            player_id,
            PlayerInfo {
                id: player_id,
                web_name: format!("Player{}", player_id),
                team: ((player_id - 1) % 20) + 1,
                element_type,
            },
        );
    }
    BootstrapData {
        players,
        current_gameweek: gameweek,
        total_players: 9_000_000,
    }
}

/// A snapshot where everyone played 90 minutes for 2 points, except the
/// captain (player 10) on 9 and player 3 on 0 minutes.
pub fn fixture_snapshot(gameweek: u32) -> LiveStatsSnapshot {
    let mut stats = BTreeMap::new();
    for player_id in 1..=15i64 {
        let (minutes, total) = match player_id {
            3 => (0, 0),
            10 => (90, 9),
            _ => (90, 2),
        };
        stats.insert(
            player_id,
            RawPlayerStat {
                minutes,
                total_points: Some(total),
                ..Default::default()
            },
        );
    }
    LiveStatsSnapshot {
        gameweek,
        fetched_at: Utc::now(),
        content_hash: "fixture".to_string(),
        stats,
    }
}

/// Seeds every cache entry the live-score pipeline reads, so requests
/// complete without touching the (unreachable) upstream.
pub async fn seed_live_fixture(cache: &CacheService, manager_id: i64, gameweek: u32) {
    let ttl = Duration::from_secs(600);
    cache.set("bootstrap", &fixture_bootstrap(gameweek), ttl).await;
    cache
        .set(
            &format!("manager:{}", manager_id),
            &ManagerSnapshot {
                manager_id,
                name: "Test Manager".to_string(),
                season_points: 500,
                season_rank: 100_000,
                current_gameweek: gameweek,
                active_chip: Chip::None,
            },
            ttl,
        )
        .await;
    cache
        .set(
            &format!("squad:{}:{}", manager_id, gameweek),
            &fixture_squad(manager_id, gameweek),
            ttl,
        )
        .await;
    cache
        .set(
            &format!("live:snapshot:{}", gameweek),
            &fixture_snapshot(gameweek),
            ttl,
        )
        .await;
}

use std::sync::Arc;
use std::time::Duration;

use crate::cache::CacheService;
use crate::models::errors::LiveError;
use crate::models::manager::ManagerSnapshot;
use crate::models::player::{BootstrapData, LiveStatsSnapshot};
use crate::models::scoring::LiveScore;
use crate::models::squad::{Chip, SquadSelection};
use crate::models::tier::{ReferenceTierSample, SampledManager};
use crate::scoring::{RankInput, RankModel, ScoreCalculator};
use crate::services::sampler::TierSamplerService;
use crate::upstream::{Endpoint, ResilientClient};
use crate::upstream::ingest;

const BOOTSTRAP_TTL: Duration = Duration::from_secs(3600);
const MANAGER_TTL: Duration = Duration::from_secs(600);
const SQUAD_TTL: Duration = Duration::from_secs(600);
/// Scored results kept around for sampler backfill.
const SCORED_POOL_TTL: Duration = Duration::from_secs(6 * 3600);
const SCORED_POOL_LIMIT: usize = 500;

pub fn snapshot_cache_key(gameweek: u32) -> String {
    format!("live:snapshot:{}", gameweek)
}

fn scored_pool_key(gameweek: u32) -> String {
    format!("live:scored_pool:{}", gameweek)
}

/// Composes the fetch client, cache, sampler and rank model into the
/// per-manager live pipeline used by both the broadcaster and the pull
/// surface. Every read degrades: cache first, then upstream with retries,
/// then the last known good value, then a placeholder.
#[derive(Clone)]
pub struct LiveScoreService {
    client: ResilientClient,
    cache: CacheService,
    sampler: TierSamplerService,
    rank_model: Arc<dyn RankModel>,
}

impl LiveScoreService {
    pub fn new(
        client: ResilientClient,
        cache: CacheService,
        sampler: TierSamplerService,
        rank_model: Arc<dyn RankModel>,
    ) -> Self {
        Self {
            client,
            cache,
            sampler,
            rank_model,
        }
    }

    pub async fn bootstrap(&self) -> Result<BootstrapData, LiveError> {
        if let Some(data) = self.cache.get::<BootstrapData>("bootstrap").await {
            return Ok(data);
        }
        let body = self.client.fetch_json(&Endpoint::Bootstrap).await?;
        let data = ingest::bootstrap_data(&body)?;
        self.cache.set("bootstrap", &data, BOOTSTRAP_TTL).await;
        Ok(data)
    }

    pub async fn current_gameweek(&self) -> Result<u32, LiveError> {
        Ok(self.bootstrap().await?.current_gameweek)
    }

    pub async fn manager(&self, manager_id: i64) -> Result<ManagerSnapshot, LiveError> {
        let key = format!("manager:{}", manager_id);
        if let Some(snapshot) = self.cache.get::<ManagerSnapshot>(&key).await {
            return Ok(snapshot);
        }
        let body = self.client.fetch_json(&Endpoint::Entry { manager_id }).await?;
        let current_gameweek = self.current_gameweek().await.unwrap_or(1);
        let snapshot = ingest::manager_snapshot(&body, current_gameweek)?;
        self.cache.set(&key, &snapshot, MANAGER_TTL).await;
        Ok(snapshot)
    }

    pub async fn squad(&self, manager_id: i64, gameweek: u32) -> Result<SquadSelection, LiveError> {
        let key = format!("squad:{}:{}", manager_id, gameweek);
        if let Some(squad) = self.cache.get::<SquadSelection>(&key).await {
            return Ok(squad);
        }
        let bootstrap = self.bootstrap().await?;
        let body = self
            .client
            .fetch_json(&Endpoint::EntryPicks {
                manager_id,
                gameweek,
            })
            .await?;
        let squad = ingest::squad_from_picks(manager_id, gameweek, &body, &bootstrap)?;
        self.cache.set(&key, &squad, SQUAD_TTL).await;
        Ok(squad)
    }

    /// The raw-stat snapshot for a gameweek. Normally the poller keeps this
    /// warm; a cold cache falls through to a direct fetch and, failing
    /// that, the static placeholder so scoring always has an input.
    pub async fn snapshot(&self, gameweek: u32) -> Result<LiveStatsSnapshot, LiveError> {
        if let Some(snapshot) = self
            .cache
            .get::<LiveStatsSnapshot>(&snapshot_cache_key(gameweek))
            .await
        {
            return Ok(snapshot);
        }
        match self.client.fetch_json(&Endpoint::LiveEvent { gameweek }).await {
            Ok(body) => {
                let snapshot = ingest::live_snapshot(gameweek, &body)?;
                self.cache
                    .set(&snapshot_cache_key(gameweek), &snapshot, Duration::from_secs(3600))
                    .await;
                Ok(snapshot)
            }
            Err(e) => {
                tracing::warn!(
                    "Serving placeholder snapshot for gameweek {}: {}",
                    gameweek,
                    e
                );
                Ok(LiveStatsSnapshot::placeholder(gameweek))
            }
        }
    }

    /// Full live computation for one manager: scored picks plus estimated
    /// overall rank. Nothing on this path is fatal.
    pub async fn live_score(
        &self,
        manager_id: i64,
        gameweek: u32,
    ) -> Result<(LiveScore, i64), LiveError> {
        let squad = self.squad(manager_id, gameweek).await?;
        let snapshot = self.snapshot(gameweek).await?;
        let bootstrap = self.bootstrap().await?;
        let manager = self.manager(manager_id).await.unwrap_or(ManagerSnapshot {
            manager_id,
            name: String::new(),
            season_points: 0,
            season_rank: bootstrap.total_players,
            current_gameweek: gameweek,
            active_chip: squad.active_chip,
        });

        let sample = self.sampler.reference_sample(gameweek).await.ok();
        let tier = sample
            .as_ref()
            .and_then(|s| s.tier_for_rank(manager.season_rank));

        let assistant_points = if squad.active_chip == Chip::AssistantManager {
            assistant_points(&squad, &bootstrap, &snapshot)
        } else {
            0
        };

        let score = ScoreCalculator::score(
            &squad,
            &snapshot,
            assistant_points,
            tier.map(|t| &t.effective_ownership),
        );
        let estimated_rank = self.rank_model.estimate(&RankInput {
            live_points: score.total_points,
            season_points: manager.season_points,
            season_rank: manager.season_rank.max(1),
            picks: &score.picks,
            tier,
            total_players: bootstrap.total_players,
        });

        self.record_scored(&score, &squad, estimated_rank).await;
        Ok((score, estimated_rank))
    }

    /// Rank a hypothetical: the manager's current live total plus an
    /// arbitrary extra-points delta.
    pub async fn simulate_rank(
        &self,
        manager_id: i64,
        gameweek: u32,
        extra_points: i32,
    ) -> Result<i64, LiveError> {
        let (score, _) = self.live_score(manager_id, gameweek).await?;
        let manager = self.manager(manager_id).await?;
        let bootstrap = self.bootstrap().await?;
        let sample = self.sampler.reference_sample(gameweek).await.ok();
        let tier = sample
            .as_ref()
            .and_then(|s| s.tier_for_rank(manager.season_rank));
        Ok(self.rank_model.estimate(&RankInput {
            live_points: score.total_points + extra_points,
            season_points: manager.season_points,
            season_rank: manager.season_rank.max(1),
            picks: &score.picks,
            tier,
            total_players: bootstrap.total_players,
        }))
    }

    /// Current-squad captaincy ranking: high live points and low effective
    /// ownership first.
    pub async fn captaincy_suggestions(
        &self,
        manager_id: i64,
        gameweek: u32,
    ) -> Result<Vec<(i64, f64)>, LiveError> {
        let (score, _) = self.live_score(manager_id, gameweek).await?;
        let mut ranked: Vec<(i64, f64)> = score
            .picks
            .iter()
            .filter(|p| p.position <= 11)
            .map(|p| {
                let eo = p.effective_ownership.unwrap_or(100.0);
                let appeal =
                    f64::from(p.raw_points) * (1.0 + (100.0 - eo.min(100.0)) / 100.0);
                (p.player_id, appeal)
            })
            .collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        Ok(ranked)
    }

    pub async fn reference_sample(
        &self,
        gameweek: u32,
    ) -> Result<ReferenceTierSample, LiveError> {
        self.sampler.reference_sample(gameweek).await
    }

    /// Keeps a bounded pool of recently scored managers for the sampler's
    /// backfill path.
    async fn record_scored(&self, score: &LiveScore, squad: &SquadSelection, rank: i64) {
        let key = scored_pool_key(score.gameweek);
        let mut pool: Vec<SampledManager> = self.cache.get(&key).await.unwrap_or_default();
        pool.retain(|m| m.manager_id != score.manager_id);
        pool.push(SampledManager {
            manager_id: score.manager_id,
            season_rank: rank,
            live_points: score.total_points,
            squad: squad.clone(),
        });
        if pool.len() > SCORED_POOL_LIMIT {
            let excess = pool.len() - SCORED_POOL_LIMIT;
            pool.drain(..excess);
        }
        self.cache.set(&key, &pool, SCORED_POOL_TTL).await;
    }
}

/// Secondary contribution of the assistant-manager chip, computed from the
/// designated team's own stats in the snapshot: two points per goal its
/// players scored, plus a clean-sheet bonus when none of them conceded.
fn assistant_points(
    squad: &SquadSelection,
    bootstrap: &BootstrapData,
    snapshot: &LiveStatsSnapshot,
) -> i32 {
    let Some(team) = squad.assistant_team else {
        return 0;
    };
    let mut goals = 0;
    let mut conceded = 0;
    for (player_id, info) in &bootstrap.players {
        if info.team != team {
            continue;
        }
        let stat = snapshot.stat_for(*player_id);
        goals += stat.goals_scored;
        conceded = conceded.max(stat.goals_conceded);
    }
    2 * goals + if conceded == 0 { 2 } else { 0 }
}

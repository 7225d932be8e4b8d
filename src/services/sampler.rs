use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rand::Rng;
use tokio::sync::Semaphore;

use crate::cache::{CacheService, LockService, SharedStore};
use crate::config::settings::SamplerSettings;
use crate::models::errors::LiveError;
use crate::models::player::{BootstrapData, LiveStatsSnapshot};
use crate::models::squad::Chip;
use crate::models::tier::{
    effective_ownership, ReferenceTierSample, SampledManager, Tier, TierStats,
};
use crate::scoring::ScoreCalculator;
use crate::upstream::{Endpoint, ResilientClient};
use crate::upstream::ingest;

const LEADER_LEASE: Duration = Duration::from_secs(180);
/// Stale copies outlive the fresh TTL so an expired sample can be served
/// while a refresh runs.
const STALE_FACTOR: u32 = 4;

fn sample_key(gameweek: u32) -> String {
    format!("tier_sample:{}", gameweek)
}

fn stale_sample_key(gameweek: u32) -> String {
    format!("tier_sample:stale:{}", gameweek)
}

/// Builds and serves the per-gameweek reference-tier sample. The expensive
/// rebuild runs on exactly one worker per gameweek (leader election over
/// the coordination store); everyone else reads the cached result.
#[derive(Clone)]
pub struct TierSamplerService {
    client: ResilientClient,
    cache: CacheService,
    lock: LockService<SharedStore>,
    settings: SamplerSettings,
}

impl TierSamplerService {
    pub fn new(
        client: ResilientClient,
        cache: CacheService,
        lock: LockService<SharedStore>,
        settings: SamplerSettings,
    ) -> Self {
        Self {
            client,
            cache,
            lock,
            settings,
        }
    }

    /// The reference sample for a gameweek: fresh cache copy if present,
    /// stale copy (with a background refresh) otherwise, full leader-elected
    /// build as the last resort.
    pub async fn reference_sample(&self, gameweek: u32) -> Result<ReferenceTierSample, LiveError> {
        if let Some(sample) = self
            .cache
            .get::<ReferenceTierSample>(&sample_key(gameweek))
            .await
        {
            return Ok(sample);
        }

        if let Some(stale) = self
            .cache
            .get::<ReferenceTierSample>(&stale_sample_key(gameweek))
            .await
        {
            tracing::info!(
                "Serving stale tier sample for gameweek {} while refreshing",
                gameweek
            );
            let this = self.clone();
            tokio::spawn(async move {
                if let Err(e) = this.rebuild(gameweek).await {
                    tracing::warn!("Background tier sample refresh failed: {}", e);
                }
            });
            return Ok(stale);
        }

        self.rebuild(gameweek).await?;
        self.cache
            .get::<ReferenceTierSample>(&sample_key(gameweek))
            .await
            .ok_or_else(|| {
                LiveError::CacheUnavailable("tier sample missing after rebuild".into())
            })
    }

    /// Leader-elected rebuild: the lease winner does the sampling and
    /// caches the result; other workers wait for its completion marker.
    async fn rebuild(&self, gameweek: u32) -> Result<(), LiveError> {
        let task = format!("tier_sample:build:{}", gameweek);
        let wait = Duration::from_secs(self.settings.leader_wait_seconds);
        let this = self.clone();
        self.lock
            .run_as_leader(&task, LEADER_LEASE, wait, || async move {
                let sample = this.build_sample(gameweek).await?;
                let ttl = Duration::from_secs(this.settings.cache_ttl_hours * 3600);
                this.cache.set(&sample_key(gameweek), &sample, ttl).await;
                this.cache
                    .set(&stale_sample_key(gameweek), &sample, ttl * STALE_FACTOR)
                    .await;
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn build_sample(&self, gameweek: u32) -> Result<ReferenceTierSample, LiveError> {
        tracing::info!("Building reference tier sample for gameweek {}", gameweek);
        let bootstrap_body = self.client.fetch_json(&Endpoint::Bootstrap).await?;
        let bootstrap = ingest::bootstrap_data(&bootstrap_body)?;
        let snapshot = self.snapshot(gameweek).await;

        let seeds = self.seed_candidates().await;
        let mut tiers = Vec::new();
        for tier in Tier::all() {
            let members = self
                .sample_tier(tier, gameweek, &seeds, &bootstrap, &snapshot)
                .await;
            if members.len() < self.settings.min_sample_size {
                tracing::warn!(
                    "Tier {} sample below minimum ({} < {}); proceeding with partial sample",
                    tier.as_str(),
                    members.len(),
                    self.settings.min_sample_size
                );
            }
            tiers.push(aggregate_tier(tier, &members));
        }

        Ok(ReferenceTierSample {
            gameweek,
            built_at: Utc::now(),
            total_players: bootstrap.total_players,
            tiers,
        })
    }

    async fn snapshot(&self, gameweek: u32) -> LiveStatsSnapshot {
        if let Some(snapshot) = self
            .cache
            .get::<LiveStatsSnapshot>(&super::live_score_service::snapshot_cache_key(gameweek))
            .await
        {
            return snapshot;
        }
        match self.client.fetch_json(&Endpoint::LiveEvent { gameweek }).await {
            Ok(body) => ingest::live_snapshot(gameweek, &body)
                .unwrap_or_else(|_| LiveStatsSnapshot::placeholder(gameweek)),
            Err(_) => LiveStatsSnapshot::placeholder(gameweek),
        }
    }

    /// (manager id, rank) pairs from the configured seed leagues' first
    /// standings pages. Failures here only shrink the candidate pool.
    async fn seed_candidates(&self) -> Vec<(i64, i64)> {
        let mut seeds = Vec::new();
        for league_id in &self.settings.seed_leagues {
            match self
                .client
                .fetch_json(&Endpoint::LeagueStandings {
                    league_id: *league_id,
                    page: 1,
                })
                .await
            {
                Ok(body) => match ingest::standings_entries(&body) {
                    Ok(mut entries) => seeds.append(&mut entries),
                    Err(e) => tracing::warn!("Bad standings for league {}: {}", league_id, e),
                },
                Err(e) => tracing::warn!("Seed league {} fetch failed: {}", league_id, e),
            }
        }
        seeds
    }

    /// Assembles one tier's members: seeds inside the bound, then stratified
    /// random manager ids validated by their fetched season rank, then
    /// backfill from the recently scored pool.
    async fn sample_tier(
        &self,
        tier: Tier,
        gameweek: u32,
        seeds: &[(i64, i64)],
        bootstrap: &BootstrapData,
        snapshot: &LiveStatsSnapshot,
    ) -> Vec<SampledManager> {
        let bound = tier.rank_bound();
        let target = self.settings.per_tier_target;
        let mut candidate_ids: Vec<i64> = seeds
            .iter()
            .filter(|(_, rank)| *rank <= bound)
            .map(|(id, _)| *id)
            .collect();

        // Stratified random ids: any manager id up to the tier bound is a
        // candidate; the fetched season rank decides acceptance.
        let mut rng_ids: Vec<i64> = {
            let mut rng = rand::thread_rng();
            (0..target * 2).map(|_| rng.gen_range(1..=bound)).collect()
        };
        candidate_ids.append(&mut rng_ids);
        dedup_candidates(&mut candidate_ids);

        let semaphore = Arc::new(Semaphore::new(self.settings.fetch_concurrency.max(1)));
        let mut handles = Vec::new();
        for manager_id in candidate_ids.into_iter().take(target * 2) {
            let this = self.clone();
            let semaphore = semaphore.clone();
            let bootstrap = bootstrap.clone();
            let snapshot = snapshot.clone();
            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok()?;
                this.fetch_member(manager_id, gameweek, bound, &bootstrap, &snapshot)
                    .await
            }));
        }

        let mut members = Vec::new();
        let mut remaining = handles.into_iter();
        for handle in remaining.by_ref() {
            if let Ok(Some(member)) = handle.await {
                members.push(member);
            }
            if members.len() >= target {
                break;
            }
        }
        // The target is met; leftover fetches have no consumer.
        for handle in remaining {
            handle.abort();
        }

        if members.len() < target {
            self.backfill(tier, gameweek, &mut members, target).await;
        }
        members
    }

    /// One candidate: validate the season rank against the tier bound, then
    /// score their squad. Any failure drops the candidate quietly.
    async fn fetch_member(
        &self,
        manager_id: i64,
        gameweek: u32,
        rank_bound: i64,
        bootstrap: &BootstrapData,
        snapshot: &LiveStatsSnapshot,
    ) -> Option<SampledManager> {
        let entry = self
            .client
            .fetch_json(&Endpoint::Entry { manager_id })
            .await
            .ok()?;
        let manager = ingest::manager_snapshot(&entry, gameweek).ok()?;
        if manager.season_rank <= 0 || manager.season_rank > rank_bound {
            return None;
        }
        let picks = self
            .client
            .fetch_json(&Endpoint::EntryPicks {
                manager_id,
                gameweek,
            })
            .await
            .ok()?;
        let squad = ingest::squad_from_picks(manager_id, gameweek, &picks, bootstrap).ok()?;
        let score = ScoreCalculator::score(&squad, snapshot, 0, None);
        Some(SampledManager {
            manager_id,
            season_rank: manager.season_rank,
            live_points: score.total_points,
            squad,
        })
    }

    /// Backfill shortfalls from previously scored managers whose recorded
    /// live rank falls inside the tier bound.
    async fn backfill(
        &self,
        tier: Tier,
        gameweek: u32,
        members: &mut Vec<SampledManager>,
        target: usize,
    ) {
        let pool: Vec<SampledManager> = self
            .cache
            .get(&format!("live:scored_pool:{}", gameweek))
            .await
            .unwrap_or_default();
        let present: HashSet<i64> = members.iter().map(|m| m.manager_id).collect();
        for candidate in pool {
            if members.len() >= target {
                break;
            }
            if candidate.season_rank <= tier.rank_bound()
                && !present.contains(&candidate.manager_id)
            {
                members.push(candidate);
            }
        }
    }
}

/// Order-preserving dedup; seed and random ids repeat non-adjacently.
fn dedup_candidates(ids: &mut Vec<i64>) {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.retain(|id| seen.insert(*id));
}

/// Chip-aware aggregates for one tier's members.
fn aggregate_tier(tier: Tier, members: &[SampledManager]) -> TierStats {
    let sample_size = members.len();
    let average_points = if sample_size == 0 {
        0.0
    } else {
        members.iter().map(|m| f64::from(m.live_points)).sum::<f64>() / sample_size as f64
    };

    let mut formations: HashMap<String, u32> = HashMap::new();
    let mut chip_counts: HashMap<String, u32> = HashMap::new();
    let mut ownership: HashMap<i64, u32> = HashMap::new();
    let mut captaincy: HashMap<i64, u32> = HashMap::new();
    let mut triple_captaincy: HashMap<i64, u32> = HashMap::new();

    for member in members {
        *formations.entry(member.squad.formation()).or_default() += 1;
        if let Some(chip) = member.squad.active_chip.api_name() {
            *chip_counts.entry(chip.to_string()).or_default() += 1;
        }
        for pick in &member.squad.picks {
            *ownership.entry(pick.player_id).or_default() += 1;
            if pick.is_captain {
                *captaincy.entry(pick.player_id).or_default() += 1;
                if member.squad.active_chip == Chip::TripleCaptain {
                    *triple_captaincy.entry(pick.player_id).or_default() += 1;
                }
            }
        }
    }

    let pct = |count: u32| {
        if sample_size == 0 {
            0.0
        } else {
            100.0 * f64::from(count) / sample_size as f64
        }
    };
    let chip_usage = chip_counts
        .into_iter()
        .map(|(chip, count)| (chip, pct(count)))
        .collect();
    let effective_ownership_map = ownership
        .iter()
        .map(|(player_id, owned)| {
            let cap = captaincy.get(player_id).copied().unwrap_or(0);
            let triple = triple_captaincy.get(player_id).copied().unwrap_or(0);
            (
                *player_id,
                effective_ownership(pct(*owned), pct(cap), pct(triple)),
            )
        })
        .collect();

    TierStats {
        tier,
        sample_size,
        average_points,
        formations,
        chip_usage,
        effective_ownership: effective_ownership_map,
    }
}

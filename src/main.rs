use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use secrecy::ExposeSecret;

use liverank_backend::cache::{CacheService, LockService, RedisStore};
use liverank_backend::config::settings::{get_config, get_redis_url};
use liverank_backend::run;
use liverank_backend::scoring::HeuristicRankModel;
use liverank_backend::services::telemetry::{get_subscriber, init_subscriber};
use liverank_backend::services::{
    BroadcastService, LivePollerService, LiveScoreService, SchedulerService, TierSamplerService,
};
use liverank_backend::upstream::ResilientClient;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Panic if we can't read the config
    let config = get_config().expect("Failed to read the config.");

    let subscriber = get_subscriber(
        "liverank-backend".into(),
        config.application.log_level.clone(),
        std::io::stdout,
    );
    init_subscriber(subscriber);

    // Redis backs the shared cache tier and cross-worker coordination; the
    // service still runs without it on the in-memory tier alone.
    let redis_client = match redis::Client::open(get_redis_url(&config).expose_secret()) {
        Ok(client) => {
            tracing::info!("Redis client created successfully");
            Some(Arc::new(client))
        }
        Err(e) => {
            tracing::warn!(
                "Failed to create Redis client: {}. Running on the in-memory cache tier only.",
                e
            );
            None
        }
    };

    let cache = CacheService::new(redis_client.clone().map(RedisStore::new));
    let client = ResilientClient::new(config.upstream.clone(), cache.clone())
        .expect("Failed to build the upstream client");

    // Worker identity for lease ownership in leader election
    let worker_id = format!("worker-{}", uuid::Uuid::new_v4());
    let lock = LockService::new(cache.coordination_store(), worker_id);

    let sampler = TierSamplerService::new(
        client.clone(),
        cache.clone(),
        lock,
        config.sampler.clone(),
    );
    let scores = LiveScoreService::new(
        client.clone(),
        cache.clone(),
        sampler,
        Arc::new(HeuristicRankModel::default()),
    );
    let broadcaster = BroadcastService::new(scores.clone());
    if let Some(redis) = &redis_client {
        broadcaster.start_redis_listener(redis.clone());
    }

    let poller = LivePollerService::new(
        client,
        cache.clone(),
        scores.clone(),
        broadcaster.clone(),
        redis_client.clone(),
        config.poller.clone(),
    );

    let address = format!("{}:{}", config.application.host, config.application.port);
    let listener = TcpListener::bind(&address)?;

    let scheduler =
        match SchedulerService::new(poller, Duration::from_secs(config.poller.interval_seconds))
            .await
        {
            Ok(scheduler) => match scheduler.start().await {
                Ok(_) => {
                    tracing::info!("✅ Scheduler service started successfully");
                    scheduler
                }
                Err(e) => {
                    tracing::error!("❌ Failed to start scheduler: {}", e);
                    std::process::exit(1);
                }
            },
            Err(e) => {
                tracing::error!("❌ Failed to create scheduler service: {}", e);
                std::process::exit(1);
            }
        };
    // Keep the scheduler alive for the lifetime of the server
    let _scheduler = scheduler;

    run(listener, cache, scores, broadcaster, redis_client)?.await
}

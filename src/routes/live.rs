use actix_web::{get, post, web, HttpResponse};

use crate::cache::CacheService;
use crate::handlers::live::{manager_handler, rank_handler, tier_handler, transfer_handler};
use crate::models::errors::LiveError;
use crate::services::LiveScoreService;

/// Get a manager's season profile
#[get("/manager/{manager_id}")]
async fn get_manager(
    path: web::Path<i64>,
    scores: web::Data<LiveScoreService>,
) -> Result<HttpResponse, LiveError> {
    let manager_id = path.into_inner();
    manager_handler::get_manager(manager_id, scores).await
}

/// Get a manager's scored picks and rank estimate for a gameweek
#[get("/manager/{manager_id}/picks/{gameweek}")]
async fn get_live_picks(
    path: web::Path<(i64, u32)>,
    scores: web::Data<LiveScoreService>,
) -> Result<HttpResponse, LiveError> {
    let (manager_id, gameweek) = path.into_inner();
    manager_handler::get_live_picks(manager_id, gameweek, scores).await
}

/// Get captaincy suggestions for a manager's current squad
#[get("/manager/{manager_id}/captaincy/{gameweek}")]
async fn get_captaincy_suggestions(
    path: web::Path<(i64, u32)>,
    scores: web::Data<LiveScoreService>,
) -> Result<HttpResponse, LiveError> {
    let (manager_id, gameweek) = path.into_inner();
    manager_handler::get_captaincy_suggestions(manager_id, gameweek, scores).await
}

/// Get reference-tier statistics for a gameweek
#[get("/tiers/{gameweek}")]
async fn get_tier_stats(
    path: web::Path<u32>,
    scores: web::Data<LiveScoreService>,
) -> Result<HttpResponse, LiveError> {
    let gameweek = path.into_inner();
    tier_handler::get_tier_stats(gameweek, scores).await
}

/// Estimate rank for a hypothetical points delta
#[post("/rank/simulate")]
async fn simulate_rank(
    request: web::Json<rank_handler::SimulateRankRequest>,
    scores: web::Data<LiveScoreService>,
) -> Result<HttpResponse, LiveError> {
    rank_handler::simulate_rank(request, scores).await
}

/// Store a manager's planned transfers for a gameweek
#[post("/manager/{manager_id}/transfers/{gameweek}")]
async fn save_planned_transfers(
    path: web::Path<(i64, u32)>,
    request: web::Json<Vec<transfer_handler::PlannedTransferRequest>>,
    cache: web::Data<CacheService>,
) -> Result<HttpResponse, LiveError> {
    let (manager_id, gameweek) = path.into_inner();
    transfer_handler::save_planned_transfers(manager_id, gameweek, request, cache).await
}

/// Get a manager's planned transfers for a gameweek
#[get("/manager/{manager_id}/transfers/{gameweek}")]
async fn get_planned_transfers(
    path: web::Path<(i64, u32)>,
    cache: web::Data<CacheService>,
) -> Result<HttpResponse, LiveError> {
    let (manager_id, gameweek) = path.into_inner();
    transfer_handler::get_planned_transfers(manager_id, gameweek, cache).await
}

use std::time::Duration;

use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use crate::cache::CacheService;
use crate::models::errors::LiveError;
use crate::models::manager::PlannedTransfer;

/// Planned transfers live only as long as a drafting session plausibly does.
const PLANNED_TRANSFER_TTL: Duration = Duration::from_secs(24 * 3600);

fn planned_transfers_key(manager_id: i64, gameweek: u32) -> String {
    format!("transfers:planned:{}:{}", manager_id, gameweek)
}

#[derive(Debug, Deserialize)]
pub struct PlannedTransferRequest {
    pub out_player_id: i64,
    pub in_player_id: i64,
}

/// Replaces the manager's planned-transfer list for the gameweek.
pub async fn save_planned_transfers(
    manager_id: i64,
    gameweek: u32,
    request: web::Json<Vec<PlannedTransferRequest>>,
    cache: web::Data<CacheService>,
) -> Result<HttpResponse, LiveError> {
    if manager_id <= 0 || gameweek == 0 {
        return Err(LiveError::ValidationError(
            "manager_id and gameweek must be positive".into(),
        ));
    }
    if request.len() > 15 {
        return Err(LiveError::ValidationError(
            "a squad holds at most 15 planned transfers".into(),
        ));
    }
    for transfer in request.iter() {
        if transfer.out_player_id <= 0 || transfer.in_player_id <= 0 {
            return Err(LiveError::ValidationError(
                "transfer player ids must be positive".into(),
            ));
        }
    }

    let recorded_at = Utc::now();
    let planned: Vec<PlannedTransfer> = request
        .into_inner()
        .into_iter()
        .map(|t| PlannedTransfer {
            out_player_id: t.out_player_id,
            in_player_id: t.in_player_id,
            recorded_at,
        })
        .collect();
    cache
        .set(
            &planned_transfers_key(manager_id, gameweek),
            &planned,
            PLANNED_TRANSFER_TTL,
        )
        .await;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": planned
    })))
}

/// The manager's currently stored planned transfers, empty when none.
pub async fn get_planned_transfers(
    manager_id: i64,
    gameweek: u32,
    cache: web::Data<CacheService>,
) -> Result<HttpResponse, LiveError> {
    let planned: Vec<PlannedTransfer> = cache
        .get(&planned_transfers_key(manager_id, gameweek))
        .await
        .unwrap_or_default();
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": planned
    })))
}

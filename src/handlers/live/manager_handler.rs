use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::models::errors::LiveError;
use crate::services::LiveScoreService;

/// Season-level manager profile.
pub async fn get_manager(
    manager_id: i64,
    scores: web::Data<LiveScoreService>,
) -> Result<HttpResponse, LiveError> {
    if manager_id <= 0 {
        return Err(LiveError::ValidationError(
            "manager_id must be positive".into(),
        ));
    }
    let manager = scores.manager(manager_id).await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": manager
    })))
}

/// The full live computation for one manager and gameweek: scored picks,
/// auto-subs, totals and the rank estimate.
pub async fn get_live_picks(
    manager_id: i64,
    gameweek: u32,
    scores: web::Data<LiveScoreService>,
) -> Result<HttpResponse, LiveError> {
    validate(manager_id, gameweek)?;
    let (score, estimated_rank) = scores.live_score(manager_id, gameweek).await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": {
            "score": score,
            "estimated_rank": estimated_rank
        }
    })))
}

/// Current-squad captaincy ranking, best pick first.
pub async fn get_captaincy_suggestions(
    manager_id: i64,
    gameweek: u32,
    scores: web::Data<LiveScoreService>,
) -> Result<HttpResponse, LiveError> {
    validate(manager_id, gameweek)?;
    let ranked = scores.captaincy_suggestions(manager_id, gameweek).await?;
    let suggestions: Vec<_> = ranked
        .into_iter()
        .map(|(player_id, appeal)| {
            json!({
                "player_id": player_id,
                "appeal": appeal
            })
        })
        .collect();
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": suggestions
    })))
}

fn validate(manager_id: i64, gameweek: u32) -> Result<(), LiveError> {
    if manager_id <= 0 {
        return Err(LiveError::ValidationError(
            "manager_id must be positive".into(),
        ));
    }
    if gameweek == 0 || gameweek > 38 {
        return Err(LiveError::ValidationError(
            "gameweek must be between 1 and 38".into(),
        ));
    }
    Ok(())
}

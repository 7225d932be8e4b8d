use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::models::errors::LiveError;
use crate::services::LiveScoreService;

/// Aggregated reference-tier statistics for a gameweek: average live
/// points, formation spread, chip usage and effective ownership per tier.
pub async fn get_tier_stats(
    gameweek: u32,
    scores: web::Data<LiveScoreService>,
) -> Result<HttpResponse, LiveError> {
    if gameweek == 0 || gameweek > 38 {
        return Err(LiveError::ValidationError(
            "gameweek must be between 1 and 38".into(),
        ));
    }
    let sample = scores.reference_sample(gameweek).await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": sample
    })))
}

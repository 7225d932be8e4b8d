use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::models::errors::LiveError;
use crate::services::LiveScoreService;

#[derive(Debug, Deserialize)]
pub struct SimulateRankRequest {
    pub manager_id: i64,
    pub gameweek: u32,
    /// Hypothetical points on top of the current live total. Negative
    /// deltas model a haul evaporating (VAR, late bonus changes).
    pub extra_points: i32,
}

/// What-if rank estimate for a points delta against the live total.
pub async fn simulate_rank(
    request: web::Json<SimulateRankRequest>,
    scores: web::Data<LiveScoreService>,
) -> Result<HttpResponse, LiveError> {
    if request.manager_id <= 0 {
        return Err(LiveError::ValidationError(
            "manager_id must be positive".into(),
        ));
    }
    if request.gameweek == 0 || request.gameweek > 38 {
        return Err(LiveError::ValidationError(
            "gameweek must be between 1 and 38".into(),
        ));
    }
    if request.extra_points.abs() > 200 {
        return Err(LiveError::ValidationError(
            "extra_points outside plausible range".into(),
        ));
    }
    let estimated_rank = scores
        .simulate_rank(request.manager_id, request.gameweek, request.extra_points)
        .await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": {
            "manager_id": request.manager_id,
            "gameweek": request.gameweek,
            "extra_points": request.extra_points,
            "estimated_rank": estimated_rank
        }
    })))
}

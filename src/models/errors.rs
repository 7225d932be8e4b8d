use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error as ThisError;

/// Error taxonomy for the live scoring pipeline.
#[derive(Debug, ThisError)]
pub enum LiveError {
    #[error("Upstream source unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Upstream response failed schema validation: {0}")]
    UpstreamSchemaInvalid(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    ValidationError(String),

    #[error("Coordination wait exceeded bound: {0}")]
    CoordinationTimeout(String),

    #[error("Cache store unreachable: {0}")]
    CacheUnavailable(String),
}

impl LiveError {
    /// Short, client-safe summary without upstream detail.
    pub fn safe_summary(&self) -> &'static str {
        match self {
            LiveError::UpstreamUnavailable(_) => "Upstream data source is unavailable",
            LiveError::UpstreamSchemaInvalid(_) => "Upstream data source returned invalid data",
            LiveError::NotFound(_) => "Resource not found",
            LiveError::ValidationError(_) => "Invalid request parameters",
            LiveError::CoordinationTimeout(_) => "Timed out waiting for shared computation",
            LiveError::CacheUnavailable(_) => "Cache store is unavailable",
        }
    }
}

fn is_production() -> bool {
    std::env::var("APP_ENVIRONMENT")
        .map(|env| env.to_lowercase() == "production")
        .unwrap_or(false)
}

impl ResponseError for LiveError {
    fn status_code(&self) -> StatusCode {
        match self {
            LiveError::UpstreamUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            LiveError::UpstreamSchemaInvalid(_) => StatusCode::BAD_GATEWAY,
            LiveError::NotFound(_) => StatusCode::NOT_FOUND,
            LiveError::ValidationError(_) => StatusCode::BAD_REQUEST,
            LiveError::CoordinationTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            LiveError::CacheUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = if is_production() {
            self.safe_summary().to_string()
        } else {
            self.to_string()
        };
        tracing::error!("Request failed: {}", self);
        HttpResponse::build(self.status_code()).json(json!({ "error": message }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_taxonomy() {
        assert_eq!(
            LiveError::NotFound("manager 1".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            LiveError::ValidationError("bad gameweek".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            LiveError::UpstreamUnavailable("429".into()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}

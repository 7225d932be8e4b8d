use serde_json::Value;

use crate::models::errors::LiveError;
use crate::upstream::endpoints::Endpoint;

/// Structural validation at the fetch boundary. The upstream source drifts;
/// a response that fails its endpoint class's shape check is treated as a
/// retryable error so that shape drift never leaks into the pipeline.
pub fn validate(endpoint: &Endpoint, body: &Value) -> Result<(), LiveError> {
    match endpoint {
        Endpoint::Bootstrap => {
            require_array(body, "elements")?;
            require_array(body, "events")?;
            Ok(())
        }
        Endpoint::LiveEvent { .. } => require_array(body, "elements"),
        Endpoint::Entry { .. } => {
            if body.get("id").map(Value::is_number).unwrap_or(false) {
                Ok(())
            } else {
                Err(invalid("entry response missing numeric 'id'"))
            }
        }
        Endpoint::EntryPicks { .. } => require_array(body, "picks"),
        Endpoint::LeagueStandings { .. } => {
            let results = body.get("standings").and_then(|s| s.get("results"));
            match results {
                Some(Value::Array(_)) => Ok(()),
                _ => Err(invalid("standings response missing 'standings.results' array")),
            }
        }
    }
}

fn require_array(body: &Value, field: &str) -> Result<(), LiveError> {
    match body.get(field) {
        Some(Value::Array(_)) => Ok(()),
        _ => Err(invalid(&format!("response missing '{}' array", field))),
    }
}

fn invalid(detail: &str) -> LiveError {
    LiveError::UpstreamSchemaInvalid(detail.to_string())
}

mod connection;

use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;

use crate::services::BroadcastService;

pub use connection::LiveConnection;

/// Live-updates WebSocket route handler. The connection is anonymous:
/// clients pick what they follow through subscribe messages.
pub async fn live_ws_route(
    req: HttpRequest,
    stream: web::Payload,
    broadcaster: web::Data<BroadcastService>,
) -> Result<HttpResponse, Error> {
    tracing::info!("New live WebSocket connection request");

    let resp = ws::start(
        LiveConnection::new(broadcaster.get_ref().clone()),
        &req,
        stream,
    )?;

    tracing::info!("Live WebSocket connection established");
    Ok(resp)
}

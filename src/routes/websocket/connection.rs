use std::time::{Duration, Instant};

use actix::{Actor, ActorContext, AsyncContext, Handler, StreamHandler};
use actix_web_actors::ws;
use uuid::Uuid;

use crate::models::live_messages::{ClientMessage, ServerMessage};
use crate::services::BroadcastService;

// How often heartbeat pings are sent
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);
// How long before lack of client response causes a timeout
const CLIENT_TIMEOUT: Duration = Duration::from_secs(120);

/// Per-connection actor. Registers itself with the broadcaster on start and
/// forwards everything the broadcaster pushes for its subscriptions.
pub struct LiveConnection {
    heartbeat: Instant,
    session_id: Uuid,
    broadcaster: BroadcastService,
}

impl Actor for LiveConnection {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        tracing::info!("🔗 LiveConnection started - session: {}", self.session_id);

        self.heartbeat(ctx);
        self.setup_push_channel(ctx);
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        tracing::info!("❌ LiveConnection stopped - session: {}", self.session_id);
        let broadcaster = self.broadcaster.clone();
        let session_id = self.session_id;
        tokio::spawn(async move {
            broadcaster.disconnect(session_id).await;
        });
    }
}

impl LiveConnection {
    pub fn new(broadcaster: BroadcastService) -> Self {
        Self {
            heartbeat: Instant::now(),
            session_id: Uuid::new_v4(),
            broadcaster,
        }
    }

    fn heartbeat(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(HEARTBEAT_INTERVAL, |act, ctx| {
            if Instant::now().duration_since(act.heartbeat) > CLIENT_TIMEOUT {
                tracing::warn!(
                    "💔 Client heartbeat missed, disconnecting session: {}",
                    act.session_id
                );
                ctx.stop();
                return;
            }
            ctx.ping(b"ping");
        });
    }

    /// Registers with the broadcaster, forwards its push channel into the
    /// actor mailbox, and sends the initial snapshot-state message.
    fn setup_push_channel(&self, ctx: &mut ws::WebsocketContext<Self>) {
        let broadcaster = self.broadcaster.clone();
        let session_id = self.session_id;
        let addr = ctx.address();

        tokio::spawn(async move {
            let mut rx = broadcaster.register(session_id).await;
            addr.do_send(OutboundMessage(broadcaster.init_message().await));
            while let Some(message) = rx.recv().await {
                addr.do_send(OutboundMessage(message));
            }
            tracing::debug!("Push channel closed for session: {}", session_id);
        });
    }

    fn handle_client_message(&self, text: &str, ctx: &mut ws::WebsocketContext<Self>) {
        match serde_json::from_str::<ClientMessage>(text) {
            Ok(ClientMessage::Subscribe {
                manager_id,
                gameweek,
            }) => {
                let broadcaster = self.broadcaster.clone();
                let session_id = self.session_id;
                let addr = ctx.address();
                tokio::spawn(async move {
                    if let Err(e) = broadcaster.subscribe(session_id, manager_id, gameweek).await {
                        addr.do_send(OutboundMessage(ServerMessage::Error {
                            message: e.safe_summary().to_string(),
                        }));
                    }
                });
            }
            Ok(ClientMessage::Unsubscribe {
                manager_id,
                gameweek,
            }) => {
                let broadcaster = self.broadcaster.clone();
                let session_id = self.session_id;
                tokio::spawn(async move {
                    broadcaster.unsubscribe(session_id, manager_id, gameweek).await;
                });
            }
            Ok(ClientMessage::Ping) => {
                self.send_server_message(&ServerMessage::Pong, ctx);
            }
            Err(e) => {
                // A recognizable but malformed command gets an error reply;
                // anything else is ignored so the connection stays usable.
                let kind = serde_json::from_str::<serde_json::Value>(text)
                    .ok()
                    .and_then(|v| v.get("type").and_then(|t| t.as_str()).map(String::from));
                match kind.as_deref() {
                    Some("subscribe") | Some("unsubscribe") => {
                        self.send_server_message(
                            &ServerMessage::Error {
                                message: format!("Malformed message: {}", e),
                            },
                            ctx,
                        );
                    }
                    _ => {
                        tracing::debug!(
                            "❓ Unknown message from session {}: {}",
                            self.session_id,
                            text
                        );
                    }
                }
            }
        }
    }

    fn send_server_message(
        &self,
        message: &ServerMessage,
        ctx: &mut ws::WebsocketContext<Self>,
    ) {
        match serde_json::to_string(message) {
            Ok(text) => ctx.text(text),
            Err(e) => tracing::error!(
                "Failed to serialize server message for session {}: {}",
                self.session_id,
                e
            ),
        }
    }
}

/// Message from the broadcaster's push channel to the WebSocket.
#[derive(actix::Message)]
#[rtype(result = "()")]
pub struct OutboundMessage(pub ServerMessage);

impl Handler<OutboundMessage> for LiveConnection {
    type Result = ();

    fn handle(&mut self, msg: OutboundMessage, ctx: &mut Self::Context) {
        self.send_server_message(&msg.0, ctx);
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for LiveConnection {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => {
                self.heartbeat = Instant::now();
                ctx.pong(&msg);
            }
            Ok(ws::Message::Pong(_)) => {
                self.heartbeat = Instant::now();
            }
            Ok(ws::Message::Text(text)) => {
                self.heartbeat = Instant::now();
                self.handle_client_message(&text, ctx);
            }
            Ok(ws::Message::Binary(_)) => {
                tracing::warn!(
                    "⚠️  Unexpected binary message from session: {}",
                    self.session_id
                );
            }
            Ok(ws::Message::Close(reason)) => {
                tracing::info!(
                    "🔒 WebSocket closing for session {}: {:?}",
                    self.session_id,
                    reason
                );
                ctx.close(reason);
                ctx.stop();
            }
            _ => ctx.stop(),
        }
    }
}

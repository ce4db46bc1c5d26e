use std::time::{Duration, Instant};

use actix::{Actor, ActorContext, AsyncContext, Handler, Message as ActixMessage, StreamHandler};
use actix_web_actors::ws;
use uuid::Uuid;

use super::hub::FeedEvent;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);
const CLIENT_TIMEOUT: Duration = Duration::from_secs(30);

/// Hub event delivered into the session actor's mailbox.
#[derive(ActixMessage)]
#[rtype(result = "()")]
pub struct PushEvent(pub FeedEvent);

/// One connected feed viewer. Forwards every hub event to the client as
/// a JSON text frame and drops the connection on heartbeat timeout.
pub struct FeedSocket {
    user_id: Uuid,
    hb: Instant,
}

impl FeedSocket {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            hb: Instant::now(),
        }
    }

    fn hb(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(HEARTBEAT_INTERVAL, |act, ctx| {
            if Instant::now().duration_since(act.hb) > CLIENT_TIMEOUT {
                tracing::warn!(user_id = %act.user_id, "feed socket heartbeat failed, disconnecting");
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });
    }
}

impl Actor for FeedSocket {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        tracing::info!(user_id = %self.user_id, "feed socket connected");
        self.hb(ctx);
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        tracing::info!(user_id = %self.user_id, "feed socket disconnected");
    }
}

impl Handler<PushEvent> for FeedSocket {
    type Result = ();

    fn handle(&mut self, msg: PushEvent, ctx: &mut Self::Context) {
        let frame = serde_json::json!({
            "event": "posts",
            "data": msg.0,
        });
        match serde_json::to_string(&frame) {
            Ok(text) => ctx.text(text),
            Err(e) => tracing::error!("failed to serialize feed event: {}", e),
        }
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for FeedSocket {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => {
                self.hb = Instant::now();
                ctx.pong(&msg);
            }
            Ok(ws::Message::Pong(_)) => {
                self.hb = Instant::now();
            }
            Ok(ws::Message::Text(_)) => {
                // The feed channel is one-way; inbound text is ignored.
                tracing::debug!(user_id = %self.user_id, "ignoring inbound feed socket message");
            }
            Ok(ws::Message::Binary(_)) => {
                tracing::warn!("binary feed socket messages not supported");
            }
            Ok(ws::Message::Close(reason)) => {
                tracing::debug!("feed socket close received: {:?}", reason);
                ctx.stop();
            }
            _ => {}
        }
    }
}

/// WebSocket upgrade route for the feed change stream
use actix_web::{web, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;

use crate::config::Config;
use crate::error::AppError;
use crate::services::auth;
use crate::ws::{FeedSocket, NotificationHub, PushEvent};

#[derive(Debug, Deserialize)]
pub struct WsParams {
    pub token: Option<String>,
}

/// GET /ws
///
/// Authenticates the caller (query token or Authorization header), then
/// upgrades and bridges hub events into the session actor.
pub async fn feed_updates(
    req: HttpRequest,
    stream: web::Payload,
    config: web::Data<Config>,
    hub: web::Data<NotificationHub>,
    query: web::Query<WsParams>,
) -> actix_web::Result<HttpResponse> {
    let token = query.into_inner().token.or_else(|| {
        req.headers()
            .get(actix_web::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.strip_prefix("Bearer "))
            .map(|s| s.to_string())
    });

    let Some(token) = token else {
        return Err(AppError::Unauthorized("No token provided".to_string()).into());
    };

    let user_id = auth::verify_token(&config.auth.jwt_secret, &token)?;

    let mut rx = hub.subscribe()?;

    let (addr, resp) =
        ws::WsResponseBuilder::new(FeedSocket::new(user_id), &req, stream).start_with_addr()?;

    // Forward hub events into the session until either side goes away.
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    if addr.try_send(PushEvent(event)).is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "feed subscriber lagged, events dropped");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    Ok(resp)
}

/// Status handlers - the caller's profile status line
use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::error::Result;
use crate::middleware::UserId;
use crate::services::FeedService;

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

/// GET /feed/status
pub async fn get_status(service: web::Data<FeedService>, caller: UserId) -> Result<HttpResponse> {
    let status = service.get_status(caller.0).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Success retrieving status",
        "status": status,
    })))
}

/// POST /feed/status
pub async fn update_status(
    service: web::Data<FeedService>,
    caller: UserId,
    req: web::Json<UpdateStatusRequest>,
) -> Result<HttpResponse> {
    service.update_status(caller.0, &req.status).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Status updated",
    })))
}

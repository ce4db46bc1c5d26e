/// Feed handlers - HTTP endpoints for post operations
use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::Result;
use crate::middleware::UserId;
use crate::services::{FeedService, ImageStore};

/// Pagination query parameters
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
}

/// GET /feed/posts
pub async fn get_posts(
    service: web::Data<FeedService>,
    _caller: UserId,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse> {
    let (posts, total_items) = service.list_posts(query.page.unwrap_or(1)).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Retrieving posts success",
        "posts": posts,
        "totalItems": total_items,
    })))
}

/// POST /feed/post
pub async fn create_post(
    service: web::Data<FeedService>,
    storage: web::Data<ImageStore>,
    caller: UserId,
    payload: Multipart,
) -> Result<HttpResponse> {
    let form = storage.collect_form(payload).await?;

    match service.create_post(caller.0, &form).await {
        Ok(created) => Ok(HttpResponse::Created().json(serde_json::json!({
            "message": "Post created successfully",
            "post": created.post,
            "creator": created.creator,
        }))),
        Err(err) => {
            // The upload was already written; don't leak it on failure.
            if let Some(image) = &form.image {
                storage.spawn_remove(&image.url);
            }
            Err(err)
        }
    }
}

/// GET /feed/post/{postId}
pub async fn get_post(
    service: web::Data<FeedService>,
    _caller: UserId,
    post_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let post = service.get_post(*post_id).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Retrieving post success",
        "post": post,
    })))
}

/// PUT /feed/post/{postId}
pub async fn update_post(
    service: web::Data<FeedService>,
    storage: web::Data<ImageStore>,
    caller: UserId,
    post_id: web::Path<Uuid>,
    payload: Multipart,
) -> Result<HttpResponse> {
    let form = storage.collect_form(payload).await?;

    match service.edit_post(caller.0, *post_id, &form).await {
        Ok(post) => Ok(HttpResponse::Ok().json(serde_json::json!({
            "message": "Updated successfully",
            "post": post,
        }))),
        Err(err) => {
            if let Some(image) = &form.image {
                storage.spawn_remove(&image.url);
            }
            Err(err)
        }
    }
}

/// DELETE /feed/post/{postId}
pub async fn delete_post(
    service: web::Data<FeedService>,
    caller: UserId,
    post_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    service.delete_post(caller.0, *post_id).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Successfully deleted",
    })))
}

/// Feed service - post lifecycle orchestration and change fan-out
use std::sync::Arc;

use sqlx::PgPool;
use uuid::Uuid;

use crate::db::{post_repo, user_repo};
use crate::error::{AppError, FieldError, Result};
use crate::models::{Post, PostWithCreator};
use crate::services::storage::{ImageStore, PostForm};
use crate::ws::{FeedEvent, NotificationHub};

/// Minimum trimmed length for post title and content.
const MIN_TEXT_LEN: usize = 5;
/// Status line length bounds (trimmed).
const STATUS_MIN_LEN: usize = 5;
const STATUS_MAX_LEN: usize = 50;

pub struct FeedService {
    pool: PgPool,
    hub: Arc<NotificationHub>,
    storage: ImageStore,
    per_page: i64,
}

impl FeedService {
    pub fn new(pool: PgPool, hub: Arc<NotificationHub>, storage: ImageStore, per_page: i64) -> Self {
        Self {
            pool,
            hub,
            storage,
            per_page,
        }
    }

    /// One page of the feed, newest first, plus the unfiltered total.
    /// Listing is open to any authenticated caller.
    pub async fn list_posts(&self, page: i64) -> Result<(Vec<PostWithCreator>, i64)> {
        post_repo::list_page(&self.pool, page, self.per_page).await
    }

    /// Create a post owned by the caller and broadcast it.
    pub async fn create_post(&self, caller: Uuid, form: &PostForm) -> Result<PostWithCreator> {
        validate_post_text(&form.title, &form.content)?;

        let Some(image) = form.image.as_ref() else {
            return Err(AppError::validation(
                "Validation failed, no image provided",
                Vec::new(),
            ));
        };

        let created = post_repo::create(
            &self.pool,
            post_repo::NewPost {
                title: form.title.trim(),
                content: form.content.trim(),
                image_url: &image.url,
                creator_id: caller,
            },
        )
        .await?;

        self.hub.publish(FeedEvent::Create(created.clone()))?;

        tracing::info!(post_id = %created.post.id, creator = %caller, "post created");
        Ok(created)
    }

    /// Fetch a single post; no ownership check on reads.
    pub async fn get_post(&self, post_id: Uuid) -> Result<Post> {
        post_repo::find_by_id(&self.pool, post_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Post is not found".to_string()))
    }

    /// Update title/content/image of the caller's own post. The image
    /// is either a fresh upload or the carried-forward previous URL; a
    /// replaced image file is removed best-effort.
    pub async fn edit_post(&self, caller: Uuid, post_id: Uuid, form: &PostForm) -> Result<Post> {
        validate_post_text(&form.title, &form.content)?;

        let Some(image_url) = form.effective_image_url() else {
            return Err(AppError::validation(
                "Validation failed, no image provided",
                Vec::new(),
            ));
        };

        let existing = post_repo::find_with_creator(&self.pool, post_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Post is not found".to_string()))?;

        check_post_ownership(caller, &existing.post)?;

        if image_url != existing.post.image_url {
            self.storage.spawn_remove(&existing.post.image_url);
        }

        let mut post = existing.post;
        post.title = form.title.trim().to_string();
        post.content = form.content.trim().to_string();
        post.image_url = image_url.to_string();

        let updated = post_repo::update(&self.pool, &post).await?;

        self.hub.publish(FeedEvent::Update(updated.clone()))?;

        tracing::info!(post_id = %updated.id, "post updated");
        Ok(updated)
    }

    /// Delete the caller's own post, its stored image, and broadcast the
    /// removal.
    pub async fn delete_post(&self, caller: Uuid, post_id: Uuid) -> Result<()> {
        let post = post_repo::find_by_id(&self.pool, post_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Post is not found".to_string()))?;

        check_post_ownership(caller, &post)?;

        self.storage.spawn_remove(&post.image_url);

        if !post_repo::remove(&self.pool, post_id).await? {
            // Lost the fetch/delete race: the record is already gone.
            return Err(AppError::NotFound("Post is not found".to_string()));
        }

        self.hub.publish(FeedEvent::Delete(post_id))?;

        tracing::info!(%post_id, "post deleted");
        Ok(())
    }

    pub async fn get_status(&self, caller: Uuid) -> Result<String> {
        user_repo::get_status(&self.pool, caller)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    pub async fn update_status(&self, caller: Uuid, status: &str) -> Result<()> {
        validate_status(status)?;

        if !user_repo::update_status(&self.pool, caller, status.trim()).await? {
            return Err(AppError::NotFound("User not found".to_string()));
        }

        Ok(())
    }
}

/// Only the creator may modify a post.
fn check_post_ownership(caller: Uuid, post: &Post) -> Result<()> {
    if post.creator_id == caller {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

fn validate_post_text(title: &str, content: &str) -> Result<()> {
    let mut details = Vec::new();

    if title.trim().chars().count() < MIN_TEXT_LEN {
        details.push(FieldError::new(
            "title",
            "must be at least 5 characters long",
        ));
    }
    if content.trim().chars().count() < MIN_TEXT_LEN {
        details.push(FieldError::new(
            "content",
            "must be at least 5 characters long",
        ));
    }

    if details.is_empty() {
        Ok(())
    } else {
        Err(AppError::validation(
            "Validation failed, entered data is incorrect",
            details,
        ))
    }
}

fn validate_status(status: &str) -> Result<()> {
    let len = status.trim().chars().count();
    if (STATUS_MIN_LEN..=STATUS_MAX_LEN).contains(&len) {
        Ok(())
    } else {
        Err(AppError::validation(
            "Validation failed, entered data is incorrect",
            vec![FieldError::new(
                "status",
                "must be between 5 and 50 characters long",
            )],
        ))
    }
}

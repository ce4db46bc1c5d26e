use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A registered account. `posts` keeps the ordered references to the
/// posts this user created, appended on every successful create.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub status: String,
    pub posts: Vec<Uuid>,
}

/// A feed post. `creator_id` is set once at creation and never
/// reassigned; `created_at` is the listing sort key.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub image_url: String,
    pub creator_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Denormalized creator snapshot attached to listings and to `create`
/// change events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatorInfo {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
}

/// A post joined with its creator snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct PostWithCreator {
    #[serde(flatten)]
    pub post: Post,
    pub creator: CreatorInfo,
}

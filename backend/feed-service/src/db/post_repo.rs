use crate::error::{AppError, Result};
use crate::models::{CreatorInfo, Post, PostWithCreator};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

/// Attributes for a new post; id and timestamps are server-assigned.
#[derive(Debug)]
pub struct NewPost<'a> {
    pub title: &'a str,
    pub content: &'a str,
    pub image_url: &'a str,
    pub creator_id: Uuid,
}

fn row_to_post_with_creator(row: &PgRow) -> PostWithCreator {
    let post = Post {
        id: row.get("id"),
        title: row.get("title"),
        content: row.get("content"),
        image_url: row.get("image_url"),
        creator_id: row.get("creator_id"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    };

    PostWithCreator {
        creator: CreatorInfo {
            id: post.creator_id,
            name: row.get("creator_name"),
        },
        post,
    }
}

/// Offset of a 1-based page; pages <= 0 normalize to 1.
fn page_offset(page: i64, per_page: i64) -> i64 {
    (page.max(1) - 1) * per_page
}

/// One page of the feed, newest first, with the unfiltered total count.
/// `page` is 1-based; values <= 0 normalize to 1.
pub async fn list_page(
    pool: &PgPool,
    page: i64,
    per_page: i64,
) -> Result<(Vec<PostWithCreator>, i64)> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts")
        .fetch_one(pool)
        .await?;

    let rows = sqlx::query(
        r#"
        SELECT p.id, p.title, p.content, p.image_url, p.creator_id,
               p.created_at, p.updated_at, u.name AS creator_name
        FROM posts p
        JOIN users u ON u.id = p.creator_id
        ORDER BY p.created_at DESC
        LIMIT $1 OFFSET $2
        "#,
    )
    .bind(per_page)
    .bind(page_offset(page, per_page))
    .fetch_all(pool)
    .await?;

    let items = rows.iter().map(row_to_post_with_creator).collect();
    Ok((items, total))
}

/// Find a post by ID
pub async fn find_by_id(pool: &PgPool, post_id: Uuid) -> Result<Option<Post>> {
    let post = sqlx::query_as::<_, Post>(
        r#"
        SELECT id, title, content, image_url, creator_id, created_at, updated_at
        FROM posts
        WHERE id = $1
        "#,
    )
    .bind(post_id)
    .fetch_optional(pool)
    .await?;

    Ok(post)
}

/// Find a post by ID with its creator snapshot resolved
pub async fn find_with_creator(pool: &PgPool, post_id: Uuid) -> Result<Option<PostWithCreator>> {
    let row = sqlx::query(
        r#"
        SELECT p.id, p.title, p.content, p.image_url, p.creator_id,
               p.created_at, p.updated_at, u.name AS creator_name
        FROM posts p
        JOIN users u ON u.id = p.creator_id
        WHERE p.id = $1
        "#,
    )
    .bind(post_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.as_ref().map(row_to_post_with_creator))
}

/// Persist a new post and append its reference to the creator's post
/// list. Both writes run in one transaction so a crash cannot leave an
/// orphaned post.
pub async fn create(pool: &PgPool, new_post: NewPost<'_>) -> Result<PostWithCreator> {
    let mut tx = pool.begin().await?;

    let post = sqlx::query_as::<_, Post>(
        r#"
        INSERT INTO posts (id, title, content, image_url, creator_id, created_at, updated_at)
        VALUES (gen_random_uuid(), $1, $2, $3, $4, NOW(), NOW())
        RETURNING id, title, content, image_url, creator_id, created_at, updated_at
        "#,
    )
    .bind(new_post.title)
    .bind(new_post.content)
    .bind(new_post.image_url)
    .bind(new_post.creator_id)
    .fetch_one(&mut *tx)
    .await?;

    let creator_name: Option<String> = sqlx::query_scalar(
        r#"
        UPDATE users
        SET posts = array_append(posts, $1)
        WHERE id = $2
        RETURNING name
        "#,
    )
    .bind(post.id)
    .bind(new_post.creator_id)
    .fetch_optional(&mut *tx)
    .await?;

    // Dropping the transaction rolls the insert back.
    let Some(name) = creator_name else {
        return Err(AppError::NotFound("User not found".to_string()));
    };

    tx.commit().await?;

    Ok(PostWithCreator {
        creator: CreatorInfo {
            id: post.creator_id,
            name,
        },
        post,
    })
}

/// Persist mutated fields of an already-fetched post
pub async fn update(pool: &PgPool, post: &Post) -> Result<Post> {
    let updated = sqlx::query_as::<_, Post>(
        r#"
        UPDATE posts
        SET title = $1, content = $2, image_url = $3, updated_at = NOW()
        WHERE id = $4
        RETURNING id, title, content, image_url, creator_id, created_at, updated_at
        "#,
    )
    .bind(&post.title)
    .bind(&post.content)
    .bind(&post.image_url)
    .bind(post.id)
    .fetch_optional(pool)
    .await?;

    updated.ok_or_else(|| AppError::NotFound("Post is not found".to_string()))
}

/// Delete a post record. Returns false when the row was already gone,
/// which callers treat as "already deleted" on the fetch/delete race.
pub async fn remove(pool: &PgPool, post_id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM posts WHERE id = $1")
        .bind(post_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_one_starts_at_zero() {
        assert_eq!(page_offset(1, 2), 0);
        assert_eq!(page_offset(2, 2), 2);
        assert_eq!(page_offset(5, 10), 40);
    }

    #[test]
    fn non_positive_pages_normalize_to_one() {
        assert_eq!(page_offset(0, 2), 0);
        assert_eq!(page_offset(-3, 2), 0);
    }
}

/// Upload boundary: stores the single `image` multipart field under a
/// server-assigned name and owns stored-file removal.
use std::path::{Path, PathBuf};

use actix_multipart::{Field, Multipart};
use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::config::UploadConfig;
use crate::error::{AppError, Result};

/// Stored extension for an accepted upload content type. Anything else
/// is dropped at this boundary, before it reaches the feed service.
fn extension_for(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/png" => Some("png"),
        "image/jpg" | "image/jpeg" => Some("jpg"),
        _ => None,
    }
}

/// An image written to the upload directory, addressed by public URL.
#[derive(Debug, Clone)]
pub struct StoredImage {
    pub url: String,
}

/// Parsed multipart body of a create/update post request.
#[derive(Debug, Default)]
pub struct PostForm {
    pub title: String,
    pub content: String,
    /// Newly uploaded image, if one was sent and passed the type filter.
    pub image: Option<StoredImage>,
    /// `image` text field carrying forward the previous URL on update.
    pub carried_image_url: Option<String>,
}

impl PostForm {
    /// URL the post should end up with: a fresh upload wins over the
    /// carried-forward value.
    pub fn effective_image_url(&self) -> Option<&str> {
        self.image
            .as_ref()
            .map(|img| img.url.as_str())
            .or(self.carried_image_url.as_deref())
    }
}

#[derive(Debug, Clone)]
pub struct ImageStore {
    dir: PathBuf,
    public_prefix: String,
}

impl ImageStore {
    pub fn new(config: &UploadConfig) -> Self {
        Self {
            dir: PathBuf::from(&config.dir),
            public_prefix: config.public_prefix.trim_matches('/').to_string(),
        }
    }

    /// Directory the public `/images` prefix serves from.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Collect the multipart fields of a post form.
    ///
    /// A file part with a disallowed content type is drained and dropped
    /// (logged at WARN), matching the upload filter contract: the feed
    /// service only ever sees "image present" or "image absent".
    pub async fn collect_form(&self, mut payload: Multipart) -> Result<PostForm> {
        let mut form = PostForm::default();

        while let Some(item) = payload.next().await {
            let mut field =
                item.map_err(|e| AppError::Internal(format!("malformed form payload: {e}")))?;

            let name = field.name().unwrap_or("").to_string();
            match name.as_str() {
                "title" => form.title = read_text(&mut field).await?,
                "content" => form.content = read_text(&mut field).await?,
                "image" => {
                    let is_file = field
                        .content_disposition()
                        .and_then(|cd| cd.get_filename())
                        .is_some();
                    if is_file {
                        form.image = self.store_image(&mut field).await?;
                    } else {
                        let value = read_text(&mut field).await?;
                        if !value.is_empty() {
                            form.carried_image_url = Some(value);
                        }
                    }
                }
                other => {
                    tracing::debug!(field = other, "ignoring unknown form field");
                    drain(&mut field).await?;
                }
            }
        }

        Ok(form)
    }

    async fn store_image(&self, field: &mut Field) -> Result<Option<StoredImage>> {
        let content_type = field
            .content_type()
            .map(|m| m.essence_str().to_string())
            .unwrap_or_default();

        let Some(ext) = extension_for(&content_type) else {
            drain(field).await?;
            tracing::warn!(%content_type, "dropping upload with disallowed content type");
            return Ok(None);
        };

        let filename = format!("{}.{}", Uuid::new_v4(), ext);
        let path = self.dir.join(&filename);

        let mut file = tokio::fs::File::create(&path).await?;
        while let Some(chunk) = field.next().await {
            let chunk =
                chunk.map_err(|e| AppError::Internal(format!("upload stream error: {e}")))?;
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        tracing::debug!(file = %path.display(), "stored uploaded image");
        Ok(Some(StoredImage {
            url: format!("{}/{}", self.public_prefix, filename),
        }))
    }

    /// Filesystem path a stored image URL points at. None for anything
    /// that does not name a file directly inside the upload directory.
    fn resolve(&self, url: &str) -> Option<PathBuf> {
        let name = url
            .strip_prefix(&self.public_prefix)
            .map(|rest| rest.trim_start_matches('/'))
            .unwrap_or(url);

        if name.is_empty() || name.contains('/') || name.contains("..") {
            return None;
        }

        Some(self.dir.join(name))
    }

    /// Best-effort removal of a stored image in a detached task: runs
    /// without blocking the caller and without a result channel back.
    /// Unlink failures are logged and swallowed, never surfaced.
    pub fn spawn_remove(&self, url: &str) {
        let Some(path) = self.resolve(url) else {
            tracing::warn!(url, "refusing to remove image outside the upload directory");
            return;
        };

        tokio::spawn(async move {
            if let Err(e) = remove_stored_image(&path).await {
                tracing::warn!(path = %path.display(), "failed to remove stale image: {}", e);
            }
        });
    }
}

async fn remove_stored_image(path: &Path) -> std::io::Result<()> {
    tokio::fs::remove_file(path).await
}

async fn read_text(field: &mut Field) -> Result<String> {
    let mut bytes = Vec::new();
    while let Some(chunk) = field.next().await {
        let chunk = chunk.map_err(|e| AppError::Internal(format!("form field error: {e}")))?;
        bytes.extend_from_slice(&chunk);
    }
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

async fn drain(field: &mut Field) -> Result<()> {
    while let Some(chunk) = field.next().await {
        chunk.map_err(|e| AppError::Internal(format!("form field error: {e}")))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UploadConfig;

    fn store_at(dir: &Path) -> ImageStore {
        ImageStore::new(&UploadConfig {
            dir: dir.to_string_lossy().into_owned(),
            public_prefix: "images".to_string(),
        })
    }

    #[test]
    fn accepted_types_map_to_extensions() {
        assert_eq!(extension_for("image/png"), Some("png"));
        assert_eq!(extension_for("image/jpg"), Some("jpg"));
        assert_eq!(extension_for("image/jpeg"), Some("jpg"));
        assert_eq!(extension_for("image/gif"), None);
        assert_eq!(extension_for("application/pdf"), None);
    }

    #[test]
    fn resolve_maps_url_into_upload_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_at(tmp.path());

        let path = store.resolve("images/abc.png").unwrap();
        assert_eq!(path, tmp.path().join("abc.png"));
    }

    #[test]
    fn resolve_refuses_traversal() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_at(tmp.path());

        assert!(store.resolve("images/../etc/passwd").is_none());
        assert!(store.resolve("images/a/b.png").is_none());
        assert!(store.resolve("").is_none());
    }

    #[tokio::test]
    async fn remove_deletes_stored_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("abc.png");
        tokio::fs::write(&path, b"png").await.unwrap();

        remove_stored_image(&path).await.unwrap();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn remove_missing_file_reports_error_without_panicking() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("gone.png");
        assert!(remove_stored_image(&path).await.is_err());
    }

    #[tokio::test]
    async fn spawn_remove_is_fire_and_forget() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_at(tmp.path());
        let path = tmp.path().join("abc.png");
        tokio::fs::write(&path, b"png").await.unwrap();

        store.spawn_remove("images/abc.png");
        // Also safe for URLs that resolve nowhere.
        store.spawn_remove("images/../nope");

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(!path.exists());
    }

    #[test]
    fn effective_image_url_prefers_fresh_upload() {
        let mut form = PostForm {
            title: "Hello".into(),
            content: "World".into(),
            image: Some(StoredImage {
                url: "images/new.png".into(),
            }),
            carried_image_url: Some("images/old.png".into()),
        };
        assert_eq!(form.effective_image_url(), Some("images/new.png"));

        form.image = None;
        assert_eq!(form.effective_image_url(), Some("images/old.png"));

        form.carried_image_url = None;
        assert_eq!(form.effective_image_url(), None);
    }
}

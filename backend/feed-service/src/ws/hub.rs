use once_cell::sync::OnceCell;
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{Post, PostWithCreator};

/// A post change fanned out to connected clients.
///
/// Wire shape: `{"action": "create" | "update" | "delete", "post": ...}`
/// where `post` is the full post (with creator snapshot on create) or
/// just the id on delete. Never persisted; subscribers that connect
/// later see nothing.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "action", content = "post", rename_all = "lowercase")]
pub enum FeedEvent {
    Create(PostWithCreator),
    Update(Post),
    Delete(Uuid),
}

/// Process-wide broadcast channel for post change events.
///
/// Constructed uninitialized and injected explicitly; `init` is called
/// exactly once at startup, after the HTTP listener is bound. Publishing
/// before that is a programming error and fails fast.
pub struct NotificationHub {
    channel: OnceCell<broadcast::Sender<FeedEvent>>,
}

impl NotificationHub {
    pub fn new() -> Self {
        Self {
            channel: OnceCell::new(),
        }
    }

    /// Bring the hub up. Returns false (and logs) when it was already
    /// initialized; the original channel stays in place.
    pub fn init(&self, capacity: usize) -> bool {
        let (tx, _) = broadcast::channel(capacity);
        match self.channel.set(tx) {
            Ok(()) => {
                tracing::info!(capacity, "notification hub ready");
                true
            }
            Err(_) => {
                tracing::warn!("notification hub already initialized");
                false
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        self.channel.get().is_some()
    }

    /// Fan an event out to every currently-connected subscriber.
    /// Best-effort delivery: no acknowledgment, no replay. Returns the
    /// number of subscribers the event was enqueued for.
    pub fn publish(&self, event: FeedEvent) -> Result<usize> {
        let tx = self.channel.get().ok_or(AppError::Uninitialized)?;

        match tx.send(event) {
            Ok(count) => Ok(count),
            Err(_) => {
                // No subscribers connected, that's okay.
                tracing::debug!("feed event published with no subscribers");
                Ok(0)
            }
        }
    }

    /// Register a subscriber; each WebSocket session holds one receiver.
    pub fn subscribe(&self) -> Result<broadcast::Receiver<FeedEvent>> {
        Ok(self
            .channel
            .get()
            .ok_or(AppError::Uninitialized)?
            .subscribe())
    }
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crate::models::CreatorInfo;

    fn sample_post() -> Post {
        Post {
            id: Uuid::new_v4(),
            title: "Hello!".to_string(),
            content: "World!".to_string(),
            image_url: "images/abc.png".to_string(),
            creator_id: Uuid::new_v4(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn publish_before_init_fails_fast() {
        let hub = NotificationHub::new();
        assert!(!hub.is_ready());
        assert!(matches!(
            hub.publish(FeedEvent::Delete(Uuid::new_v4())),
            Err(AppError::Uninitialized)
        ));
        assert!(matches!(hub.subscribe(), Err(AppError::Uninitialized)));
    }

    #[test]
    fn init_is_once() {
        let hub = NotificationHub::new();
        assert!(hub.init(8));
        assert!(!hub.init(8));
        assert!(hub.is_ready());
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_ok() {
        let hub = NotificationHub::new();
        hub.init(8);
        let delivered = hub.publish(FeedEvent::Delete(Uuid::new_v4())).unwrap();
        assert_eq!(delivered, 0);
    }

    #[tokio::test]
    async fn publish_reaches_every_subscriber() {
        let hub = NotificationHub::new();
        hub.init(8);

        let mut rx1 = hub.subscribe().unwrap();
        let mut rx2 = hub.subscribe().unwrap();

        let post = sample_post();
        let delivered = hub.publish(FeedEvent::Update(post.clone())).unwrap();
        assert_eq!(delivered, 2);

        for rx in [&mut rx1, &mut rx2] {
            match rx.recv().await.unwrap() {
                FeedEvent::Update(received) => assert_eq!(received.id, post.id),
                other => panic!("unexpected event: {:?}", other),
            }
        }
    }

    #[test]
    fn wire_shape_matches_channel_contract() {
        let post = sample_post();
        let create = FeedEvent::Create(PostWithCreator {
            creator: CreatorInfo {
                id: post.creator_id,
                name: "maria".to_string(),
            },
            post: post.clone(),
        });
        let json = serde_json::to_value(&create).unwrap();
        assert_eq!(json.get("action").unwrap(), "create");
        assert_eq!(
            json.pointer("/post/creator/name").unwrap(),
            &serde_json::json!("maria")
        );

        let update = serde_json::to_value(FeedEvent::Update(post.clone())).unwrap();
        assert_eq!(update.get("action").unwrap(), "update");
        assert_eq!(
            update.pointer("/post/title").unwrap(),
            &serde_json::json!("Hello!")
        );

        let delete = serde_json::to_value(FeedEvent::Delete(post.id)).unwrap();
        assert_eq!(delete.get("action").unwrap(), "delete");
        assert_eq!(
            delete.get("post").unwrap(),
            &serde_json::json!(post.id.to_string())
        );
    }
}

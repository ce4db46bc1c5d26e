pub mod hub;
pub mod session;

pub use hub::{FeedEvent, NotificationHub};
pub use session::{FeedSocket, PushEvent};

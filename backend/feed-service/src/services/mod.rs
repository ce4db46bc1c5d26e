pub mod auth;
pub mod feed;
pub mod storage;

pub use auth::AuthService;
pub use feed::FeedService;
pub use storage::{ImageStore, PostForm, StoredImage};

pub mod auth;
pub mod feed;
pub mod status;
pub mod ws;

pub use auth::{login, signup};
pub use feed::{create_post, delete_post, get_post, get_posts, update_post};
pub use status::{get_status, update_status};
pub use ws::feed_updates;

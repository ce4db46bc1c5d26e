/// Feed Service Library
///
/// The Ripple feed backend: JWT-authenticated CRUD over image-bearing
/// posts, paginated listing, and a WebSocket channel broadcasting post
/// changes to every connected client.
///
/// # Modules
///
/// - `handlers`: HTTP request handlers and the WebSocket upgrade route
/// - `models`: Data structures for users, posts and creator snapshots
/// - `services`: Business logic (feed orchestration, auth, upload storage)
/// - `db`: Database access layer and repositories
/// - `ws`: Notification hub and WebSocket session actor
/// - `middleware`: JWT authentication middleware
/// - `security`: Password hashing
/// - `error`: Error types and handling
/// - `config`: Configuration management
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod security;
pub mod services;
pub mod ws;

pub use config::Config;
pub use error::{AppError, Result};

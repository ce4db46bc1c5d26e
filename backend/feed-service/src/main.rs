use actix_cors::Cors;
use actix_files::Files;
use actix_web::{web, App, HttpResponse, HttpServer};
use sqlx::postgres::PgPoolOptions;
use std::io;
use std::sync::Arc;
use tracing_subscriber::{fmt, EnvFilter};

use feed_service::handlers;
use feed_service::middleware::JwtAuthMiddleware;
use feed_service::services::{AuthService, FeedService, ImageStore};
use feed_service::ws::NotificationHub;
use feed_service::Config;

async fn health_summary(pool: web::Data<sqlx::PgPool>) -> HttpResponse {
    match sqlx::query("SELECT 1").fetch_one(pool.get_ref()).await {
        Ok(_) => HttpResponse::Ok().json(serde_json::json!({
            "status": "ok",
            "service": "feed-service",
            "version": env!("CARGO_PKG_VERSION"),
        })),
        Err(e) => HttpResponse::ServiceUnavailable().json(serde_json::json!({
            "status": "unhealthy",
            "error": format!("PostgreSQL connection failed: {}", e),
            "service": "feed-service",
        })),
    }
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn")),
        )
        .with_target(false)
        .init();

    // Load configuration
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!("Configuration loading failed: {}", e);
            eprintln!("ERROR: Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Starting feed-service v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Environment: {}", config.app.env);

    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database.url)
        .await
        .map_err(|e| {
            io::Error::new(
                io::ErrorKind::Other,
                format!("Failed to connect to database: {e}"),
            )
        })?;

    sqlx::migrate!("./migrations").run(&pool).await.map_err(|e| {
        io::Error::new(io::ErrorKind::Other, format!("Migration failed: {e}"))
    })?;

    tracing::info!("Connected to database");

    std::fs::create_dir_all(&config.uploads.dir)?;

    let hub = Arc::new(NotificationHub::new());
    let storage = ImageStore::new(&config.uploads);

    let pool_data = web::Data::new(pool.clone());
    let config_data = web::Data::new(config.clone());
    let storage_data = web::Data::new(storage.clone());
    let hub_data: web::Data<NotificationHub> = web::Data::from(hub.clone());
    let feed_service = web::Data::new(FeedService::new(
        pool.clone(),
        hub.clone(),
        storage.clone(),
        config.feed.per_page,
    ));
    let auth_service = web::Data::new(AuthService::new(pool.clone(), config.auth.clone()));

    let bind_address = format!("{}:{}", config.app.host, config.app.port);
    tracing::info!("Starting HTTP server at {}", bind_address);

    let jwt_secret = config.auth.jwt_secret.clone();
    let allowed_origins = config.cors.allowed_origins.clone();
    let upload_dir = config.uploads.dir.clone();

    let server = HttpServer::new(move || {
        let mut cors = Cors::default();
        for origin in allowed_origins.split(',') {
            let origin = origin.trim();
            if origin == "*" {
                cors = cors.allow_any_origin();
            } else {
                cors = cors.allowed_origin(origin);
            }
        }
        cors = cors.allow_any_method().allow_any_header().max_age(3600);

        App::new()
            .app_data(pool_data.clone())
            .app_data(config_data.clone())
            .app_data(storage_data.clone())
            .app_data(hub_data.clone())
            .app_data(feed_service.clone())
            .app_data(auth_service.clone())
            .wrap(cors)
            .wrap(tracing_actix_web::TracingLogger::default())
            .route("/health", web::get().to(health_summary))
            .service(
                web::scope("/auth")
                    .route("/signup", web::put().to(handlers::signup))
                    .route("/login", web::post().to(handlers::login)),
            )
            .service(
                web::scope("/feed")
                    .wrap(JwtAuthMiddleware::new(&jwt_secret))
                    .route("/posts", web::get().to(handlers::get_posts))
                    .route("/post", web::post().to(handlers::create_post))
                    .service(
                        web::resource("/post/{post_id}")
                            .route(web::get().to(handlers::get_post))
                            .route(web::put().to(handlers::update_post))
                            .route(web::delete().to(handlers::delete_post)),
                    )
                    .route("/status", web::get().to(handlers::get_status))
                    .route("/status", web::post().to(handlers::update_status)),
            )
            .route("/ws", web::get().to(handlers::feed_updates))
            .service(Files::new("/images", upload_dir.clone()))
    })
    .bind(&bind_address)?;

    // The listener is bound; bring the notification hub up before the
    // first request can reach a handler.
    hub.init(config.ws.broadcast_capacity);

    server.run().await
}

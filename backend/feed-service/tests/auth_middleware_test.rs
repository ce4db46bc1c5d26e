/// Integration tests for the JWT authentication middleware
use actix_web::http::StatusCode;
use actix_web::{test, web, App, HttpResponse};
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use uuid::Uuid;

use feed_service::middleware::{JwtAuthMiddleware, UserId};
use feed_service::services::auth::JwtClaims;

const SECRET: &str = "test-secret";

async fn whoami(caller: UserId) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "userId": caller.0 }))
}

async fn setup_app() -> impl actix_web::dev::Service<
    actix_http::Request,
    Response = actix_web::dev::ServiceResponse,
    Error = actix_web::Error,
> {
    test::init_service(
        App::new().service(
            web::scope("/feed")
                .wrap(JwtAuthMiddleware::new(SECRET))
                .route("/whoami", web::get().to(whoami)),
        ),
    )
    .await
}

fn issue_token(user_id: Uuid) -> String {
    let now = Utc::now().timestamp();
    let claims = JwtClaims {
        sub: user_id.to_string(),
        email: "maria@example.com".to_string(),
        iat: now,
        exp: now + 3_600,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

async fn status_of(
    app: &impl actix_web::dev::Service<
        actix_http::Request,
        Response = actix_web::dev::ServiceResponse,
        Error = actix_web::Error,
    >,
    req: actix_http::Request,
) -> StatusCode {
    match test::try_call_service(app, req).await {
        Ok(resp) => resp.status(),
        Err(err) => actix_web::HttpResponse::from_error(err).status(),
    }
}

#[actix_web::test]
async fn missing_token_is_rejected() {
    let app = setup_app().await;

    let req = test::TestRequest::get().uri("/feed/whoami").to_request();
    assert_eq!(status_of(&app, req).await, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn wrong_scheme_is_rejected() {
    let app = setup_app().await;

    let req = test::TestRequest::get()
        .uri("/feed/whoami")
        .insert_header(("Authorization", "Basic abc"))
        .to_request();
    assert_eq!(status_of(&app, req).await, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn tampered_token_is_rejected() {
    let app = setup_app().await;

    let req = test::TestRequest::get()
        .uri("/feed/whoami")
        .insert_header(("Authorization", "Bearer not-a-real-token"))
        .to_request();
    assert_eq!(status_of(&app, req).await, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn valid_token_reaches_the_handler() {
    let app = setup_app().await;
    let user_id = Uuid::new_v4();

    let req = test::TestRequest::get()
        .uri("/feed/whoami")
        .insert_header(("Authorization", format!("Bearer {}", issue_token(user_id))))
        .to_request();

    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["userId"], serde_json::json!(user_id.to_string()));
}

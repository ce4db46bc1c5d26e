/// Auth handlers - signup and login endpoints
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use validator::Validate;

use crate::error::Result;
use crate::services::AuthService;

#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(email(message = "Please, enter a valid email"))]
    pub email: String,

    #[validate(length(min = 1, message = "must not be empty"))]
    pub name: String,

    #[validate(length(min = 5, message = "must be at least 5 characters long"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Please, enter a valid email"))]
    pub email: String,

    #[validate(length(min = 1, message = "must not be empty"))]
    pub password: String,
}

/// PUT /auth/signup
pub async fn signup(
    service: web::Data<AuthService>,
    req: web::Json<SignupRequest>,
) -> Result<HttpResponse> {
    req.validate()?;

    let user = service
        .signup(req.email.trim(), req.name.trim(), req.password.trim())
        .await?;

    Ok(HttpResponse::Created().json(serde_json::json!({
        "message": "User created successfully",
        "userId": user.id,
    })))
}

/// POST /auth/login
pub async fn login(
    service: web::Data<AuthService>,
    req: web::Json<LoginRequest>,
) -> Result<HttpResponse> {
    req.validate()?;

    let (token, user_id) = service.login(req.email.trim(), req.password.trim()).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "token": token,
        "userId": user_id,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signup_request_validation() {
        let valid = SignupRequest {
            email: "maria@example.com".to_string(),
            name: "Maria".to_string(),
            password: "secret".to_string(),
        };
        assert!(valid.validate().is_ok());

        let bad_email = SignupRequest {
            email: "not-an-email".to_string(),
            name: "Maria".to_string(),
            password: "secret".to_string(),
        };
        assert!(bad_email.validate().is_err());

        let short_password = SignupRequest {
            email: "maria@example.com".to_string(),
            name: "Maria".to_string(),
            password: "abcd".to_string(),
        };
        assert!(short_password.validate().is_err());

        let empty_name = SignupRequest {
            email: "maria@example.com".to_string(),
            name: String::new(),
            password: "secret".to_string(),
        };
        assert!(empty_name.validate().is_err());
    }
}

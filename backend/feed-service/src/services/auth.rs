use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::db::user_repo;
use crate::error::{AppError, FieldError, Result};
use crate::models::User;
use crate::security::password;

/// Access token claims
#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

/// Credential verification and token issuance over the users table.
pub struct AuthService {
    pool: PgPool,
    config: AuthConfig,
}

impl AuthService {
    pub fn new(pool: PgPool, config: AuthConfig) -> Self {
        Self { pool, config }
    }

    /// Register a new account
    pub async fn signup(&self, email: &str, name: &str, plain_password: &str) -> Result<User> {
        if user_repo::find_by_email(&self.pool, email).await?.is_some() {
            return Err(AppError::validation(
                "Validation failed, entered data is incorrect",
                vec![FieldError::new("email", "Email is taken")],
            ));
        }

        let password_hash = password::hash_password(plain_password)?;
        let user = user_repo::create_user(&self.pool, email, name, &password_hash).await?;

        tracing::info!("User registered: {}", email);
        Ok(user)
    }

    /// Verify credentials and issue an access token
    pub async fn login(&self, email: &str, plain_password: &str) -> Result<(String, Uuid)> {
        let user = user_repo::find_by_email(&self.pool, email)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Wrong email or password".to_string()))?;

        password::verify_password(plain_password, &user.password_hash)?;

        let token = self.generate_access_token(&user)?;

        tracing::info!("User logged in: {}", email);
        Ok((token, user.id))
    }

    fn generate_access_token(&self, user: &User) -> Result<String> {
        let now = Utc::now();
        let claims = JwtClaims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            iat: now.timestamp(),
            exp: now.timestamp() + self.config.jwt_expiry_secs,
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|_| AppError::Internal("Failed to generate token".to_string()))?;

        Ok(token)
    }
}

/// `verify(token) -> userId` boundary used by the auth middleware and
/// the WebSocket upgrade route.
pub fn verify_token(secret: &str, token: &str) -> Result<Uuid> {
    let data = decode::<JwtClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Unauthorized("Invalid or expired token".to_string()))?;

    Uuid::parse_str(&data.claims.sub)
        .map_err(|_| AppError::Unauthorized("Invalid user ID".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    fn issue(sub: &str, iat: i64, exp: i64) -> String {
        let claims = JwtClaims {
            sub: sub.to_string(),
            email: "maria@example.com".to_string(),
            iat,
            exp,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn verify_roundtrip() {
        let user_id = Uuid::new_v4();
        let now = Utc::now().timestamp();
        let token = issue(&user_id.to_string(), now, now + 3_600);
        assert_eq!(verify_token(SECRET, &token).unwrap(), user_id);
    }

    #[test]
    fn expired_token_rejected() {
        let user_id = Uuid::new_v4();
        let now = Utc::now().timestamp();
        // Outside the default validation leeway.
        let token = issue(&user_id.to_string(), now - 7_200, now - 3_600);
        assert!(matches!(
            verify_token(SECRET, &token),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn wrong_secret_rejected() {
        let user_id = Uuid::new_v4();
        let now = Utc::now().timestamp();
        let token = issue(&user_id.to_string(), now, now + 3_600);
        assert!(verify_token("other-secret", &token).is_err());
    }

    #[test]
    fn garbage_subject_rejected() {
        let now = Utc::now().timestamp();
        let token = issue("not-a-uuid", now, now + 3_600);
        assert!(matches!(
            verify_token(SECRET, &token),
            Err(AppError::Unauthorized(_))
        ));
    }
}

//! Authentication: password hashing, JWT issuance/verification and the
//! request extractors that gate protected endpoints.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    async_trait,
    extract::{FromRequestParts, State},
    http::request::Parts,
    Json,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::error::{ApiError, PERMISSION_DENIED};
use super::response::ApiResponse;
use crate::config::Config;
use crate::db::{self, LoginRequest, LoginResponse, RefreshTokenResponse, User};
use crate::AppState;

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2.hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a password against a hash
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    exp: i64,
}

/// Issue a signed token for a user id with the given lifetime.
pub fn generate_token(
    user_id: i64,
    duration: Duration,
    secret: &str,
) -> Result<String, ApiError> {
    let claims = Claims {
        sub: user_id.to_string(),
        exp: (Utc::now() + duration).timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| {
        tracing::error!("Failed to sign token: {}", e);
        ApiError::internal("Failed to generate token")
    })
}

/// Decode a token and return the subject user id.
pub fn decode_user_id(token: &str, secret: &str) -> Result<i64, ApiError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
            ApiError::unauthorized("Token has expired")
        }
        _ => ApiError::unauthorized("Invalid Token"),
    })?;

    data.claims
        .sub
        .parse::<i64>()
        .map_err(|_| ApiError::unauthorized("Invalid Token"))
}

/// Extract the bearer token from request headers
fn extract_token(headers: &axum::http::HeaderMap) -> Option<String> {
    headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|s| s.to_string())
}

/// Resolve the user behind a bearer token.
pub async fn get_current_user(
    pool: &sqlx::SqlitePool,
    config: &Config,
    token: &str,
) -> Result<User, ApiError> {
    let user_id = decode_user_id(token, &config.auth.jwt_secret)?;

    db::users::get_user(pool, user_id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid token or user does not exist"))
}

/// An authenticated user, without the active-account check.
///
/// Only the reactivation endpoint uses this directly; everything else goes
/// through [`CurrentUser`].
pub struct AuthUser(pub User);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_token(&parts.headers)
            .ok_or_else(|| ApiError::unauthorized("Not authenticated"))?;
        let user = get_current_user(&state.db, &state.config, &token).await?;
        Ok(AuthUser(user))
    }
}

/// An authenticated, active user.
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_active {
            return Err(ApiError::unauthorized("User account is deactivated"));
        }
        Ok(CurrentUser(user))
    }
}

/// An authenticated, active administrator.
pub struct AdminUser(pub User);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        if !user.is_admin {
            return Err(ApiError::unauthorized(PERMISSION_DENIED));
        }
        Ok(AdminUser(user))
    }
}

/// Login endpoint
///
/// POST /auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, ApiError> {
    let user = db::users::find_by_email(&state.db, &request.email).await?;

    // Same error for unknown email and wrong password
    let user = user.ok_or_else(|| ApiError::bad_request("Invalid email or password"))?;
    if !verify_password(&request.password, &user.password_hash) {
        return Err(ApiError::bad_request("Invalid email or password"));
    }

    let auth = &state.config.auth;
    let access_token = generate_token(
        user.id,
        Duration::minutes(auth.access_token_minutes),
        &auth.jwt_secret,
    )?;
    let refresh_token = generate_token(
        user.id,
        Duration::days(auth.refresh_token_days),
        &auth.jwt_secret,
    )?;

    tracing::info!(user_id = user.id, "User logged in");

    Ok(ApiResponse::success(
        "User logged in successfully",
        LoginResponse {
            access_token,
            refresh_token,
            token_type: "bearer",
        },
    ))
}

/// Issue a fresh access token for the bearer of a valid token.
///
/// GET /auth/refresh-token
pub async fn refresh_token(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<ApiResponse<RefreshTokenResponse>>, ApiError> {
    let auth = &state.config.auth;
    let access_token = generate_token(
        user.id,
        Duration::minutes(auth.access_token_minutes),
        &auth.jwt_secret,
    )?;

    Ok(ApiResponse::success(
        "Token generated successfully",
        RefreshTokenResponse { access_token },
    ))
}

//! User store: registration, profile updates and account state changes.

use sqlx::SqlitePool;

use crate::api::auth::{hash_password, verify_password};
use crate::api::error::ApiError;
use crate::db::{CreateUserRequest, UpdateUserRequest, User};

pub async fn get_user(pool: &SqlitePool, id: i64) -> Result<Option<User>, ApiError> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

pub async fn find_by_email(pool: &SqlitePool, email: &str) -> Result<Option<User>, ApiError> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
        .bind(email)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

/// Register a new user. Fails if the email is already taken.
pub async fn create_user(pool: &SqlitePool, request: CreateUserRequest) -> Result<User, ApiError> {
    let existing = find_by_email(pool, &request.email).await?;
    if existing.is_some() {
        return Err(ApiError::bad_request("Email already registered"));
    }

    let password_hash = hash_password(&request.password).map_err(|e| {
        tracing::error!("Failed to hash password: {}", e);
        ApiError::internal("Failed to hash password")
    })?;

    let result = sqlx::query(
        "INSERT INTO users (username, email, password_hash, is_active, is_admin) \
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&request.username)
    .bind(&request.email)
    .bind(&password_hash)
    .bind(request.is_active)
    .bind(request.is_admin)
    .execute(pool)
    .await?;

    let user = get_user(pool, result.last_insert_rowid())
        .await?
        .ok_or_else(|| ApiError::internal("User was not persisted"))?;

    tracing::info!(user_id = user.id, "User registered");
    Ok(user)
}

/// Update username and/or password. Changing the password requires the old
/// password, which must verify against the stored hash.
pub async fn update_user(
    pool: &SqlitePool,
    user: &User,
    request: UpdateUserRequest,
) -> Result<User, ApiError> {
    let username = request
        .username
        .as_deref()
        .filter(|s| !s.is_empty())
        .unwrap_or(&user.username);

    let new_password = request.password.as_deref().filter(|s| !s.is_empty());
    let password_hash = match new_password {
        Some(password) => {
            let old = request.old_password.as_deref().filter(|s| !s.is_empty());
            let old = old.ok_or_else(|| ApiError::bad_request("Old password required"))?;
            if !verify_password(old, &user.password_hash) {
                return Err(ApiError::bad_request("Old password does not match"));
            }
            hash_password(password).map_err(|e| {
                tracing::error!("Failed to hash password: {}", e);
                ApiError::internal("Failed to hash password")
            })?
        }
        None => user.password_hash.clone(),
    };

    sqlx::query(
        "UPDATE users SET username = ?, password_hash = ?, updated_at = datetime('now') \
         WHERE id = ?",
    )
    .bind(username)
    .bind(&password_hash)
    .bind(user.id)
    .execute(pool)
    .await?;

    get_user(pool, user.id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))
}

pub async fn deactivate_user(pool: &SqlitePool, user: &User) -> Result<User, ApiError> {
    if !user.is_active {
        return Err(ApiError::bad_request("User already deactivated"));
    }
    set_active(pool, user.id, false).await
}

pub async fn activate_user(pool: &SqlitePool, user: &User) -> Result<User, ApiError> {
    if user.is_active {
        return Err(ApiError::bad_request("User already activated"));
    }
    set_active(pool, user.id, true).await
}

async fn set_active(pool: &SqlitePool, id: i64, active: bool) -> Result<User, ApiError> {
    sqlx::query("UPDATE users SET is_active = ?, updated_at = datetime('now') WHERE id = ?")
        .bind(active)
        .bind(id)
        .execute(pool)
        .await?;

    get_user(pool, id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))
}

/// All users, insertion order. Admin-only at the API layer.
pub async fn list_users(pool: &SqlitePool) -> Result<Vec<User>, ApiError> {
    let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY id")
        .fetch_all(pool)
        .await?;
    Ok(users)
}

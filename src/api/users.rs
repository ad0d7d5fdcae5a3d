//! User account endpoints.

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::db::{self, CreateUserRequest, UpdateUserRequest, UserFullResponse, UserResponse};
use crate::AppState;

use super::auth::{AdminUser, AuthUser, CurrentUser};
use super::error::{ApiError, ValidationErrorBuilder};
use super::response::ApiResponse;
use super::validation::{validate_email, validate_password, validate_username};

fn validate_create_request(req: &CreateUserRequest) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();

    if let Err(e) = validate_username(&req.username) {
        errors.add("username", e);
    }
    if let Err(e) = validate_email(&req.email) {
        errors.add("email", e);
    }
    if let Err(e) = validate_password(&req.password) {
        errors.add("password", e);
    }

    errors.finish()
}

fn validate_update_request(req: &UpdateUserRequest) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();

    if let Some(username) = req.username.as_deref().filter(|s| !s.is_empty()) {
        if let Err(e) = validate_username(username) {
            errors.add("username", e);
        }
    }
    if let Some(password) = req.password.as_deref().filter(|s| !s.is_empty()) {
        if let Err(e) = validate_password(password) {
            errors.add("password", e);
        }
    }

    errors.finish()
}

/// Register a new user
///
/// POST /user/create
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateUserRequest>,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    validate_create_request(&request)?;

    let user = db::users::create_user(&state.db, request).await?;

    Ok(ApiResponse::success(
        "User created successfully",
        UserResponse::from(user),
    ))
}

/// Update the current user's profile
///
/// PATCH /user/update
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    validate_update_request(&request)?;

    let updated = db::users::update_user(&state.db, &user, request).await?;

    Ok(ApiResponse::success(
        "User updated successfully",
        UserResponse::from(updated),
    ))
}

/// Deactivate the current user's account
///
/// PUT /user/deactivate
pub async fn deactivate_user(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    let updated = db::users::deactivate_user(&state.db, &user).await?;

    Ok(ApiResponse::success(
        "User deactivated successfully",
        UserResponse::from(updated),
    ))
}

/// Reactivate the current user's account. Uses the relaxed extractor so a
/// deactivated owner can get back in.
///
/// PUT /user/activate
pub async fn activate_user(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    let updated = db::users::activate_user(&state.db, &user).await?;

    Ok(ApiResponse::success(
        "User activated successfully",
        UserResponse::from(updated),
    ))
}

/// Get the current user
///
/// GET /user/
pub async fn get_user(
    CurrentUser(user): CurrentUser,
) -> Json<ApiResponse<UserResponse>> {
    ApiResponse::success("User returned successfully", UserResponse::from(user))
}

/// List all users (admin only)
///
/// GET /user/all-users
pub async fn all_users(
    State(state): State<Arc<AppState>>,
    AdminUser(_admin): AdminUser,
) -> Result<Json<ApiResponse<Vec<UserFullResponse>>>, ApiError> {
    let users = db::users::list_users(&state.db).await?;

    Ok(ApiResponse::success(
        "All users returned successfully",
        users.into_iter().map(UserFullResponse::from).collect(),
    ))
}

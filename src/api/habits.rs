//! Habit endpoints: CRUD, daily completion marking and the read projections.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use std::sync::Arc;

use crate::db::{
    self, ConclusionResponse, CreateHabitRequest, HabitResponse, UnmarkResponse,
    UpdateHabitRequest,
};
use crate::schedule::today_utc;
use crate::AppState;

use super::auth::CurrentUser;
use super::error::{ApiError, ValidationErrorBuilder};
use super::response::ApiResponse;
use super::validation::{validate_frequency, validate_habit_description, validate_habit_name};

fn validate_create_request(req: &CreateHabitRequest) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();

    if let Err(e) = validate_habit_name(&req.name) {
        errors.add("name", e);
    }
    if let Err(e) = validate_habit_description(&req.description) {
        errors.add("description", e);
    }
    if let Err(e) = validate_frequency(&req.frequency) {
        errors.add("frequency", e);
    }

    errors.finish()
}

fn validate_update_request(req: &UpdateHabitRequest) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();

    if let Some(name) = req.name.as_deref().filter(|s| !s.is_empty()) {
        if let Err(e) = validate_habit_name(name) {
            errors.add("name", e);
        }
    }
    if let Some(description) = req.description.as_deref() {
        if let Err(e) = validate_habit_description(description) {
            errors.add("description", e);
        }
    }
    // An empty list means "leave the schedule untouched", so only validate ids
    if let Some(frequency) = req.frequency.as_deref().filter(|f| !f.is_empty()) {
        if let Err(e) = validate_frequency(frequency) {
            errors.add("frequency", e);
        }
    }

    errors.finish()
}

/// Create a habit
///
/// POST /habit/create
pub async fn create_habit(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<CreateHabitRequest>,
) -> Result<Json<ApiResponse<HabitResponse>>, ApiError> {
    validate_create_request(&request)?;

    let habit = db::habits::create_habit(&state.db, &user, request).await?;

    Ok(ApiResponse::success("Habit created successfully", habit))
}

/// List the current user's habits
///
/// GET /habit/
pub async fn list_habits(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<ApiResponse<Vec<HabitResponse>>>, ApiError> {
    let habits = db::habits::list_habits(&state.db, &user).await?;

    Ok(ApiResponse::success("All habits for this user", habits))
}

/// Get a habit by id
///
/// GET /habit/:id
pub async fn get_habit(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<HabitResponse>>, ApiError> {
    let habit = db::habits::get_habit(&state.db, id, &user).await?;

    Ok(ApiResponse::success("Habit returned successfully", habit))
}

/// Patch a habit
///
/// PATCH /habit/:id
pub async fn update_habit(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Json(request): Json<UpdateHabitRequest>,
) -> Result<Json<ApiResponse<HabitResponse>>, ApiError> {
    validate_update_request(&request)?;

    let habit = db::habits::update_habit(&state.db, id, &user, request).await?;

    Ok(ApiResponse::success("Habit updated successfully", habit))
}

/// Delete a habit and its completion records
///
/// DELETE /habit/:id
pub async fn delete_habit(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    db::habits::delete_habit(&state.db, id, &user).await?;

    Ok(ApiResponse::message("Habit deleted successfully"))
}

/// Mark a habit done for today (UTC)
///
/// POST /habit/mark-done/:id
pub async fn mark_done(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<ConclusionResponse>>, ApiError> {
    let conclusion = db::habits::mark_done(&state.db, id, &user, today_utc()).await?;

    Ok(ApiResponse::success(
        "Habit marked done successfully",
        conclusion,
    ))
}

/// Remove today's completion record
///
/// DELETE /habit/unmark-done/:id
pub async fn unmark_done(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<UnmarkResponse>>, ApiError> {
    let unmarked = db::habits::unmark_done(&state.db, id, &user, today_utc()).await?;

    Ok(ApiResponse::success(
        "Habit unmarked done successfully",
        unmarked,
    ))
}

#[derive(Debug, Deserialize)]
pub struct CompletedParams {
    pub date: NaiveDate,
}

/// Habits completed on a given date
///
/// GET /habit/completed?date=YYYY-MM-DD
pub async fn completed(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Query(params): Query<CompletedParams>,
) -> Result<Json<ApiResponse<Vec<HabitResponse>>>, ApiError> {
    let habits = db::habits::completed_on(&state.db, &user, params.date).await?;

    Ok(ApiResponse::success(
        format!("Habits completed on {}", params.date),
        habits,
    ))
}

/// Habits due today with no completion yet
///
/// GET /habit/upcoming
pub async fn upcoming(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<ApiResponse<Vec<HabitResponse>>>, ApiError> {
    let habits = db::habits::upcoming(&state.db, &user, today_utc()).await?;

    Ok(ApiResponse::success("Habits upcoming today", habits))
}

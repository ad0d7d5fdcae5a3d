//! Habit and completion models and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Habit {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub description: String,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// A completion record: one per habit per UTC calendar day.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct HabitConclusion {
    pub id: i64,
    pub habit_id: i64,
    pub completed_on: String,
    pub created_at: String,
}

/// Habit projection with the schedule expanded to weekday names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HabitResponse {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub frequency: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateHabitRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub frequency: Vec<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateHabitRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub frequency: Option<Vec<i64>>,
}

#[derive(Debug, Serialize)]
pub struct ConclusionResponse {
    pub id: i64,
    pub created_at: String,
    pub habit: HabitResponse,
}

#[derive(Debug, Serialize)]
pub struct UnmarkResponse {
    pub id: i64,
    pub habit_id: i64,
    pub habit: String,
}

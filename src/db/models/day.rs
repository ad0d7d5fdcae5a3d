//! Weekday catalog model.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A weekday in the fixed 1-7 scheme (1 = Sunday .. 7 = Saturday).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Day {
    pub id: i64,
    pub name: String,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

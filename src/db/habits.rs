//! Habit store and completion ledger.
//!
//! All operations take the acting user and enforce the ownership rule: a
//! habit is visible and mutable only to its owner or an admin. Violations
//! surface as a uniform 401. Completion records are keyed by the UTC
//! calendar day and guarded by a UNIQUE(habit_id, completed_on) index, so
//! the check-then-insert path cannot double-mark under concurrent requests.

use chrono::NaiveDate;
use sqlx::SqlitePool;

use crate::api::error::{ApiError, PERMISSION_DENIED};
use crate::db::{
    ConclusionResponse, CreateHabitRequest, Day, Habit, HabitConclusion, HabitResponse,
    UnmarkResponse, UpdateHabitRequest, User,
};
use crate::schedule::{format_day, scheme_day};

/// Load a habit and check that `actor` may act on it.
async fn load_owned(pool: &SqlitePool, id: i64, actor: &User) -> Result<Habit, ApiError> {
    let habit = sqlx::query_as::<_, Habit>("SELECT * FROM habits WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Habit not found"))?;

    if habit.user_id != actor.id && !actor.is_admin {
        return Err(ApiError::unauthorized(PERMISSION_DENIED));
    }

    Ok(habit)
}

/// Weekday names of a habit's schedule, in day-id order.
async fn frequency_names(pool: &SqlitePool, habit_id: i64) -> Result<Vec<String>, ApiError> {
    let names = sqlx::query_scalar::<_, String>(
        "SELECT d.name FROM days d \
         INNER JOIN habits_days hd ON hd.day_id = d.id \
         WHERE hd.habit_id = ? ORDER BY d.id",
    )
    .bind(habit_id)
    .fetch_all(pool)
    .await?;
    Ok(names)
}

/// Day ids of a habit's schedule.
async fn frequency_ids(pool: &SqlitePool, habit_id: i64) -> Result<Vec<i64>, ApiError> {
    let ids = sqlx::query_scalar::<_, i64>(
        "SELECT day_id FROM habits_days WHERE habit_id = ? ORDER BY day_id",
    )
    .bind(habit_id)
    .fetch_all(pool)
    .await?;
    Ok(ids)
}

async fn to_response(pool: &SqlitePool, habit: Habit) -> Result<HabitResponse, ApiError> {
    let frequency = frequency_names(pool, habit.id).await?;
    Ok(HabitResponse {
        id: habit.id,
        name: habit.name,
        description: habit.description,
        frequency,
    })
}

async fn to_responses(pool: &SqlitePool, habits: Vec<Habit>) -> Result<Vec<HabitResponse>, ApiError> {
    let mut responses = Vec::with_capacity(habits.len());
    for habit in habits {
        responses.push(to_response(pool, habit).await?);
    }
    Ok(responses)
}

/// Resolve day ids against the catalog. Unknown ids are rejected, not
/// silently dropped. Duplicates collapse.
async fn resolve_days(pool: &SqlitePool, day_ids: &[i64]) -> Result<Vec<i64>, ApiError> {
    let mut ids = day_ids.to_vec();
    ids.sort_unstable();
    ids.dedup();

    let catalog = sqlx::query_as::<_, Day>("SELECT * FROM days ORDER BY id")
        .fetch_all(pool)
        .await?;

    for id in &ids {
        if !catalog.iter().any(|day| day.id == *id) {
            return Err(ApiError::bad_request(format!("Unknown day id: {}", id)));
        }
    }

    Ok(ids)
}

/// Create a habit for `actor`. Habit names are unique per owner.
pub async fn create_habit(
    pool: &SqlitePool,
    actor: &User,
    request: CreateHabitRequest,
) -> Result<HabitResponse, ApiError> {
    let existing = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM habits WHERE user_id = ? AND name = ?",
    )
    .bind(actor.id)
    .bind(&request.name)
    .fetch_one(pool)
    .await?;
    if existing > 0 {
        return Err(ApiError::bad_request("A habit with this name already exists"));
    }

    let day_ids = resolve_days(pool, &request.frequency).await?;

    let mut tx = pool.begin().await?;

    let result = sqlx::query("INSERT INTO habits (user_id, name, description) VALUES (?, ?, ?)")
        .bind(actor.id)
        .bind(&request.name)
        .bind(&request.description)
        .execute(&mut *tx)
        .await?;
    let habit_id = result.last_insert_rowid();

    for day_id in &day_ids {
        sqlx::query("INSERT INTO habits_days (habit_id, day_id) VALUES (?, ?)")
            .bind(habit_id)
            .bind(day_id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    tracing::info!(user_id = actor.id, habit_id, "Habit created");

    let habit = sqlx::query_as::<_, Habit>("SELECT * FROM habits WHERE id = ?")
        .bind(habit_id)
        .fetch_one(pool)
        .await?;
    to_response(pool, habit).await
}

/// All habits owned by `actor`, insertion order.
pub async fn list_habits(
    pool: &SqlitePool,
    actor: &User,
) -> Result<Vec<HabitResponse>, ApiError> {
    let habits = sqlx::query_as::<_, Habit>("SELECT * FROM habits WHERE user_id = ? ORDER BY id")
        .bind(actor.id)
        .fetch_all(pool)
        .await?;
    to_responses(pool, habits).await
}

pub async fn get_habit(
    pool: &SqlitePool,
    id: i64,
    actor: &User,
) -> Result<HabitResponse, ApiError> {
    let habit = load_owned(pool, id, actor).await?;
    to_response(pool, habit).await
}

/// Patch a habit. Only provided, non-empty fields overwrite; an absent or
/// empty frequency leaves the schedule untouched.
pub async fn update_habit(
    pool: &SqlitePool,
    id: i64,
    actor: &User,
    request: UpdateHabitRequest,
) -> Result<HabitResponse, ApiError> {
    let habit = load_owned(pool, id, actor).await?;

    let name = request
        .name
        .as_deref()
        .filter(|s| !s.is_empty())
        .unwrap_or(&habit.name);

    if name != habit.name {
        let existing = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM habits WHERE user_id = ? AND name = ? AND id != ?",
        )
        .bind(habit.user_id)
        .bind(name)
        .bind(habit.id)
        .fetch_one(pool)
        .await?;
        if existing > 0 {
            return Err(ApiError::bad_request("A habit with this name already exists"));
        }
    }

    let description = request
        .description
        .as_deref()
        .filter(|s| !s.is_empty())
        .unwrap_or(&habit.description);

    let new_frequency = match request.frequency.as_deref().filter(|f| !f.is_empty()) {
        Some(day_ids) => Some(resolve_days(pool, day_ids).await?),
        None => None,
    };

    let mut tx = pool.begin().await?;

    sqlx::query(
        "UPDATE habits SET name = ?, description = ?, updated_at = datetime('now') WHERE id = ?",
    )
    .bind(name)
    .bind(description)
    .bind(habit.id)
    .execute(&mut *tx)
    .await?;

    if let Some(day_ids) = new_frequency {
        sqlx::query("DELETE FROM habits_days WHERE habit_id = ?")
            .bind(habit.id)
            .execute(&mut *tx)
            .await?;
        for day_id in &day_ids {
            sqlx::query("INSERT INTO habits_days (habit_id, day_id) VALUES (?, ?)")
                .bind(habit.id)
                .bind(day_id)
                .execute(&mut *tx)
                .await?;
        }
    }

    tx.commit().await?;

    let habit = sqlx::query_as::<_, Habit>("SELECT * FROM habits WHERE id = ?")
        .bind(habit.id)
        .fetch_one(pool)
        .await?;
    to_response(pool, habit).await
}

/// Delete a habit. Completion records cascade with it.
pub async fn delete_habit(
    pool: &SqlitePool,
    id: i64,
    actor: &User,
) -> Result<(), ApiError> {
    let habit = load_owned(pool, id, actor).await?;

    sqlx::query("DELETE FROM habits WHERE id = ?")
        .bind(habit.id)
        .execute(pool)
        .await?;

    tracing::info!(user_id = actor.id, habit_id = habit.id, "Habit deleted");
    Ok(())
}

async fn conclusion_for_day(
    pool: &SqlitePool,
    habit_id: i64,
    day: &str,
) -> Result<Option<HabitConclusion>, ApiError> {
    let conclusion = sqlx::query_as::<_, HabitConclusion>(
        "SELECT * FROM habit_conclusions WHERE habit_id = ? AND completed_on = ?",
    )
    .bind(habit_id)
    .bind(day)
    .fetch_optional(pool)
    .await?;
    Ok(conclusion)
}

/// Record a completion for `today`. The habit must be scheduled for today's
/// weekday and not already marked.
pub async fn mark_done(
    pool: &SqlitePool,
    id: i64,
    actor: &User,
    today: NaiveDate,
) -> Result<ConclusionResponse, ApiError> {
    let habit = load_owned(pool, id, actor).await?;

    let week_day = scheme_day(today);
    let scheduled = frequency_ids(pool, habit.id).await?;
    if !scheduled.contains(&week_day) {
        return Err(ApiError::forbidden("This habit is not scheduled for today"));
    }

    let day = format_day(today);
    if conclusion_for_day(pool, habit.id, &day).await?.is_some() {
        return Err(ApiError::forbidden("This habit is already marked done today"));
    }

    let result = sqlx::query("INSERT INTO habit_conclusions (habit_id, completed_on) VALUES (?, ?)")
        .bind(habit.id)
        .bind(&day)
        .execute(pool)
        .await;

    let result = match result {
        Ok(r) => r,
        // Lost the race against a concurrent mark: same outcome as the pre-check
        Err(sqlx::Error::Database(db_err))
            if db_err.message().contains("UNIQUE constraint failed") =>
        {
            return Err(ApiError::forbidden("This habit is already marked done today"));
        }
        Err(e) => return Err(e.into()),
    };

    let conclusion = sqlx::query_as::<_, HabitConclusion>(
        "SELECT * FROM habit_conclusions WHERE id = ?",
    )
    .bind(result.last_insert_rowid())
    .fetch_one(pool)
    .await?;

    tracing::info!(habit_id = habit.id, day = %day, "Habit marked done");

    Ok(ConclusionResponse {
        id: conclusion.id,
        created_at: conclusion.created_at,
        habit: to_response(pool, habit).await?,
    })
}

/// Remove today's completion record, if any.
pub async fn unmark_done(
    pool: &SqlitePool,
    id: i64,
    actor: &User,
    today: NaiveDate,
) -> Result<UnmarkResponse, ApiError> {
    let habit = load_owned(pool, id, actor).await?;

    let day = format_day(today);
    let conclusion = conclusion_for_day(pool, habit.id, &day)
        .await?
        .ok_or_else(|| ApiError::forbidden("This habit is not marked done today"))?;

    sqlx::query("DELETE FROM habit_conclusions WHERE id = ?")
        .bind(conclusion.id)
        .execute(pool)
        .await?;

    tracing::info!(habit_id = habit.id, day = %day, "Habit unmarked");

    Ok(UnmarkResponse {
        id: conclusion.id,
        habit_id: habit.id,
        habit: habit.name,
    })
}

/// Habits of `actor` completed on the given calendar day.
pub async fn completed_on(
    pool: &SqlitePool,
    actor: &User,
    date: NaiveDate,
) -> Result<Vec<HabitResponse>, ApiError> {
    let habits = sqlx::query_as::<_, Habit>(
        "SELECT h.* FROM habits h \
         INNER JOIN habit_conclusions c ON c.habit_id = h.id \
         WHERE h.user_id = ? AND c.completed_on = ? ORDER BY h.id",
    )
    .bind(actor.id)
    .bind(format_day(date))
    .fetch_all(pool)
    .await?;
    to_responses(pool, habits).await
}

/// Habits of `actor` scheduled for `today`'s weekday and not yet marked.
pub async fn upcoming(
    pool: &SqlitePool,
    actor: &User,
    today: NaiveDate,
) -> Result<Vec<HabitResponse>, ApiError> {
    let habits = sqlx::query_as::<_, Habit>(
        "SELECT h.* FROM habits h \
         INNER JOIN habits_days hd ON hd.habit_id = h.id \
         WHERE h.user_id = ? AND hd.day_id = ? \
           AND NOT EXISTS (SELECT 1 FROM habit_conclusions c \
                           WHERE c.habit_id = h.id AND c.completed_on = ?) \
         ORDER BY h.id",
    )
    .bind(actor.id)
    .bind(scheme_day(today))
    .bind(format_day(today))
    .fetch_all(pool)
    .await?;
    to_responses(pool, habits).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::error::ErrorCode;
    use crate::db::{test_pool, User};

    // A Sunday and the Monday after it
    const SUNDAY: (i32, u32, u32) = (2024, 1, 7);
    const MONDAY: (i32, u32, u32) = (2024, 1, 8);

    fn date((y, m, d): (i32, u32, u32)) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    async fn insert_user(pool: &SqlitePool, email: &str, is_admin: bool) -> User {
        let result = sqlx::query(
            "INSERT INTO users (username, email, password_hash, is_admin) VALUES (?, ?, ?, ?)",
        )
        .bind(email.split('@').next().unwrap())
        .bind(email)
        .bind("test-hash")
        .bind(is_admin)
        .execute(pool)
        .await
        .unwrap();

        crate::db::users::get_user(pool, result.last_insert_rowid())
            .await
            .unwrap()
            .unwrap()
    }

    fn create_request(name: &str, frequency: Vec<i64>) -> CreateHabitRequest {
        CreateHabitRequest {
            name: name.to_string(),
            description: String::new(),
            frequency,
        }
    }

    #[tokio::test]
    async fn test_create_habit_expands_frequency_names() {
        let pool = test_pool().await;
        let owner = insert_user(&pool, "alice@example.com", false).await;

        let habit = create_habit(&pool, &owner, create_request("Read", vec![7, 1]))
            .await
            .unwrap();
        assert_eq!(habit.name, "Read");
        // Day-id order, regardless of request order
        assert_eq!(habit.frequency, vec!["Sunday", "Saturday"]);
    }

    #[tokio::test]
    async fn test_duplicate_name_per_owner() {
        let pool = test_pool().await;
        let alice = insert_user(&pool, "alice@example.com", false).await;
        let bob = insert_user(&pool, "bob@example.com", false).await;

        create_habit(&pool, &alice, create_request("Read", vec![1]))
            .await
            .unwrap();

        let err = create_habit(&pool, &alice, create_request("Read", vec![2]))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::BadRequest);
        assert_eq!(err.message(), "A habit with this name already exists");

        // Same name under a different owner is fine
        create_habit(&pool, &bob, create_request("Read", vec![1]))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_unknown_day_id_rejected() {
        let pool = test_pool().await;
        let owner = insert_user(&pool, "alice@example.com", false).await;

        let err = create_habit(&pool, &owner, create_request("Read", vec![1, 9]))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::BadRequest);
        assert!(err.message().contains("Unknown day id"));
    }

    #[tokio::test]
    async fn test_ownership_checks() {
        let pool = test_pool().await;
        let owner = insert_user(&pool, "alice@example.com", false).await;
        let stranger = insert_user(&pool, "mallory@example.com", false).await;
        let admin = insert_user(&pool, "root@example.com", true).await;

        let habit = create_habit(&pool, &owner, create_request("Read", vec![1]))
            .await
            .unwrap();

        let err = get_habit(&pool, habit.id, &stranger).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::Unauthorized);
        assert_eq!(err.message(), PERMISSION_DENIED);

        let err = mark_done(&pool, habit.id, &stranger, date(SUNDAY))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::Unauthorized);

        let err = delete_habit(&pool, habit.id, &stranger).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::Unauthorized);

        // Admin bypasses ownership
        assert_eq!(get_habit(&pool, habit.id, &admin).await.unwrap().id, habit.id);
        delete_habit(&pool, habit.id, &admin).await.unwrap();

        let err = get_habit(&pool, habit.id, &owner).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_update_patch_semantics() {
        let pool = test_pool().await;
        let owner = insert_user(&pool, "alice@example.com", false).await;
        let habit = create_habit(&pool, &owner, create_request("Read", vec![1, 2]))
            .await
            .unwrap();

        // Name only; empty frequency leaves the schedule untouched
        let updated = update_habit(
            &pool,
            habit.id,
            &owner,
            UpdateHabitRequest {
                name: Some("Read more".to_string()),
                description: None,
                frequency: Some(vec![]),
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.name, "Read more");
        assert_eq!(updated.frequency, vec!["Sunday", "Monday"]);

        // Frequency replacement
        let updated = update_habit(
            &pool,
            habit.id,
            &owner,
            UpdateHabitRequest {
                name: None,
                description: Some("every saturday".to_string()),
                frequency: Some(vec![7]),
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.name, "Read more");
        assert_eq!(updated.description, "every saturday");
        assert_eq!(updated.frequency, vec!["Saturday"]);
    }

    #[tokio::test]
    async fn test_update_duplicate_name_rejected() {
        let pool = test_pool().await;
        let owner = insert_user(&pool, "alice@example.com", false).await;
        create_habit(&pool, &owner, create_request("Read", vec![1]))
            .await
            .unwrap();
        let other = create_habit(&pool, &owner, create_request("Run", vec![1]))
            .await
            .unwrap();

        let err = update_habit(
            &pool,
            other.id,
            &owner,
            UpdateHabitRequest {
                name: Some("Read".to_string()),
                description: None,
                frequency: None,
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.message(), "A habit with this name already exists");
    }

    #[tokio::test]
    async fn test_mark_done_scheduling_rules() {
        let pool = test_pool().await;
        let owner = insert_user(&pool, "alice@example.com", false).await;
        let habit = create_habit(&pool, &owner, create_request("Read", vec![1]))
            .await
            .unwrap();

        // Monday: not scheduled
        let err = mark_done(&pool, habit.id, &owner, date(MONDAY))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::Forbidden);
        assert_eq!(err.message(), "This habit is not scheduled for today");

        // Sunday: succeeds exactly once
        let conclusion = mark_done(&pool, habit.id, &owner, date(SUNDAY))
            .await
            .unwrap();
        assert_eq!(conclusion.habit.name, "Read");

        let err = mark_done(&pool, habit.id, &owner, date(SUNDAY))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::Forbidden);
        assert_eq!(err.message(), "This habit is already marked done today");

        // The following Sunday is a fresh calendar day
        mark_done(&pool, habit.id, &owner, date((2024, 1, 14)))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_unmark_done_lifecycle() {
        let pool = test_pool().await;
        let owner = insert_user(&pool, "alice@example.com", false).await;
        let habit = create_habit(&pool, &owner, create_request("Read", vec![1]))
            .await
            .unwrap();

        let err = unmark_done(&pool, habit.id, &owner, date(SUNDAY))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::Forbidden);
        assert_eq!(err.message(), "This habit is not marked done today");

        mark_done(&pool, habit.id, &owner, date(SUNDAY)).await.unwrap();

        let unmarked = unmark_done(&pool, habit.id, &owner, date(SUNDAY))
            .await
            .unwrap();
        assert_eq!(unmarked.habit, "Read");

        let err = unmark_done(&pool, habit.id, &owner, date(SUNDAY))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::Forbidden);
    }

    #[tokio::test]
    async fn test_upcoming_and_completed_projections() {
        let pool = test_pool().await;
        let owner = insert_user(&pool, "alice@example.com", false).await;
        let other = insert_user(&pool, "bob@example.com", false).await;
        let sunday = date(SUNDAY);

        let habit = create_habit(&pool, &owner, create_request("Read", vec![1]))
            .await
            .unwrap();
        // Not scheduled on Sundays, never upcoming that day
        create_habit(&pool, &owner, create_request("Run", vec![2]))
            .await
            .unwrap();
        // Other user's habit never shows up
        create_habit(&pool, &other, create_request("Swim", vec![1]))
            .await
            .unwrap();

        let due = upcoming(&pool, &owner, sunday).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].name, "Read");
        assert!(completed_on(&pool, &owner, sunday).await.unwrap().is_empty());

        mark_done(&pool, habit.id, &owner, sunday).await.unwrap();

        assert!(upcoming(&pool, &owner, sunday).await.unwrap().is_empty());
        let completed = completed_on(&pool, &owner, sunday).await.unwrap();
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].name, "Read");

        // A different day has no completions
        assert!(completed_on(&pool, &owner, date(MONDAY))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_delete_cascades_conclusions() {
        let pool = test_pool().await;
        let owner = insert_user(&pool, "alice@example.com", false).await;
        let habit = create_habit(&pool, &owner, create_request("Read", vec![1]))
            .await
            .unwrap();
        mark_done(&pool, habit.id, &owner, date(SUNDAY)).await.unwrap();

        delete_habit(&pool, habit.id, &owner).await.unwrap();

        let remaining = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM habit_conclusions WHERE habit_id = ?",
        )
        .bind(habit.id)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(remaining, 0);

        let schedule = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM habits_days WHERE habit_id = ?",
        )
        .bind(habit.id)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(schedule, 0);
    }
}

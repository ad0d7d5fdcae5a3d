//! Database seeders for built-in reference data.

use anyhow::Result;
use sqlx::SqlitePool;
use tracing::info;

/// The fixed weekday catalog: 1 = Sunday .. 7 = Saturday.
pub const DAYS: [(i64, &str); 7] = [
    (1, "Sunday"),
    (2, "Monday"),
    (3, "Tuesday"),
    (4, "Wednesday"),
    (5, "Thursday"),
    (6, "Friday"),
    (7, "Saturday"),
];

/// Seed the weekday catalog (runs on every startup, existing rows are kept)
pub async fn seed_days(pool: &SqlitePool) -> Result<()> {
    info!("Seeding weekday catalog...");

    for (id, name) in DAYS {
        sqlx::query("INSERT OR IGNORE INTO days (id, name) VALUES (?, ?)")
            .bind(id)
            .bind(name)
            .execute(pool)
            .await?;
    }

    Ok(())
}

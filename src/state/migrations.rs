use sqlx::SqlitePool;
use tracing::info;

/// Idempotent schema setup, safe to run on every start.
pub(crate) async fn run(pool: &SqlitePool) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            chat_id INTEGER NOT NULL UNIQUE,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS birthdays (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            person TEXT NOT NULL,
            y INTEGER,
            m INTEGER NOT NULL,
            d INTEGER NOT NULL,
            notification_enabled INTEGER NOT NULL DEFAULT 1,
            last_notification_time TEXT,
            user_id INTEGER NOT NULL REFERENCES users(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_birthdays_user ON birthdays(user_id)")
        .execute(pool)
        .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_birthdays_enabled
         ON birthdays(id) WHERE notification_enabled = 1",
    )
    .execute(pool)
    .await?;

    // Lease rows for the reminder job's cross-instance lock.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS dist_locks (
            key TEXT PRIMARY KEY,
            owner TEXT NOT NULL,
            expires_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    info!("Database migrations complete");
    Ok(())
}

mod lock;
mod migrations;

pub use lock::SqliteLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};

use crate::dates::BirthdayDate;
use crate::traits::BirthdayStore;
use crate::types::{Birthday, User};

/// SQLite-backed store for users and birthdays.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(db_path: &str) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        migrations::run(&pool).await?;
        Ok(Self { pool })
    }

    /// Private in-memory database, one connection so it stays alive.
    #[cfg(test)]
    pub async fn connect_in_memory() -> anyhow::Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        migrations::run(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn row_to_birthday(row: &sqlx::sqlite::SqliteRow) -> Birthday {
        let last_notified_at = row
            .get::<Option<String>, _>("last_notification_time")
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| dt.with_timezone(&Utc));
        Birthday {
            id: row.get("id"),
            person: row.get("person"),
            year: row.get::<Option<i64>, _>("y").map(|y| y as i32),
            month: row.get::<i64, _>("m") as u32,
            day: row.get::<i64, _>("d") as u32,
            enabled: row.get::<i64, _>("notification_enabled") != 0,
            last_notified_at,
            owner_id: row.get("user_id"),
        }
    }
}

const BIRTHDAY_COLUMNS: &str =
    "id, person, y, m, d, notification_enabled, last_notification_time, user_id";

#[async_trait]
impl BirthdayStore for SqliteStore {
    async fn insert_birthday(
        &self,
        owner_id: i64,
        person: &str,
        date: &BirthdayDate,
    ) -> anyhow::Result<i64> {
        let result = sqlx::query(
            "INSERT INTO birthdays (person, y, m, d, notification_enabled, last_notification_time, user_id)
             VALUES (?, ?, ?, ?, 1, NULL, ?)",
        )
        .bind(person)
        .bind(date.year)
        .bind(date.month)
        .bind(date.day)
        .bind(owner_id)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    async fn list_enabled_birthdays(&self) -> anyhow::Result<Vec<Birthday>> {
        let rows = sqlx::query(&format!(
            "SELECT {BIRTHDAY_COLUMNS} FROM birthdays WHERE notification_enabled = 1 ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(Self::row_to_birthday).collect())
    }

    async fn list_birthdays(&self, owner_id: i64) -> anyhow::Result<Vec<Birthday>> {
        let rows = sqlx::query(&format!(
            "SELECT {BIRTHDAY_COLUMNS} FROM birthdays WHERE user_id = ? ORDER BY id"
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(Self::row_to_birthday).collect())
    }

    async fn delete_birthday(&self, id: i64) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM birthdays WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn is_birthday_owner(&self, owner_id: i64, birthday_id: i64) -> anyhow::Result<bool> {
        let row = sqlx::query("SELECT 1 FROM birthdays WHERE id = ? AND user_id = ?")
            .bind(birthday_id)
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    async fn update_last_notified(&self, id: i64, at: DateTime<Utc>) -> anyhow::Result<()> {
        sqlx::query("UPDATE birthdays SET last_notification_time = ? WHERE id = ?")
            .bind(at.to_rfc3339())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_user_by_chat(&self, chat_id: i64) -> anyhow::Result<Option<User>> {
        let row = sqlx::query("SELECT id, chat_id FROM users WHERE chat_id = ?")
            .bind(chat_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| User {
            id: r.get("id"),
            chat_id: r.get("chat_id"),
        }))
    }

    async fn register_user(&self, chat_id: i64) -> anyhow::Result<User> {
        // INSERT OR IGNORE keeps repeated registration race-free; the
        // follow-up SELECT works whether we just inserted or not.
        sqlx::query("INSERT OR IGNORE INTO users (chat_id, created_at) VALUES (?, ?)")
            .bind(chat_id)
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await?;

        let row = sqlx::query("SELECT id, chat_id FROM users WHERE chat_id = ?")
            .bind(chat_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(User {
            id: row.get("id"),
            chat_id: row.get("chat_id"),
        })
    }

    async fn delete_user(&self, user_id: i64) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM birthdays WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn chat_for_user(&self, user_id: i64) -> anyhow::Result<Option<i64>> {
        let row = sqlx::query("SELECT chat_id FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get("chat_id")))
    }
}

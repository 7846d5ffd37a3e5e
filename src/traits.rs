use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::callback::Button;
use crate::dates::BirthdayDate;
use crate::types::{Birthday, User};

/// Persistence seam for birthdays and user registrations.
#[async_trait]
pub trait BirthdayStore: Send + Sync {
    /// Insert a new enabled birthday and return its id.
    async fn insert_birthday(
        &self,
        owner_id: i64,
        person: &str,
        date: &BirthdayDate,
    ) -> anyhow::Result<i64>;

    /// All enabled birthdays across all owners, ordered by id.
    async fn list_enabled_birthdays(&self) -> anyhow::Result<Vec<Birthday>>;

    /// All birthdays of one owner, ordered by id.
    async fn list_birthdays(&self, owner_id: i64) -> anyhow::Result<Vec<Birthday>>;

    async fn delete_birthday(&self, id: i64) -> anyhow::Result<()>;

    async fn is_birthday_owner(&self, owner_id: i64, birthday_id: i64) -> anyhow::Result<bool>;

    async fn update_last_notified(&self, id: i64, at: DateTime<Utc>) -> anyhow::Result<()>;

    async fn find_user_by_chat(&self, chat_id: i64) -> anyhow::Result<Option<User>>;

    /// Create (or return the existing) user for a chat address.
    async fn register_user(&self, chat_id: i64) -> anyhow::Result<User>;

    /// Remove a user and every birthday they own.
    async fn delete_user(&self, user_id: i64) -> anyhow::Result<()>;

    async fn chat_for_user(&self, user_id: i64) -> anyhow::Result<Option<i64>>;
}

/// Outbound messaging operations the bot needs from Telegram.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Send a message, optionally with a single-column inline keyboard.
    /// Returns the new message id.
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<&[Button]>,
    ) -> anyhow::Result<i32>;

    async fn edit_message(
        &self,
        chat_id: i64,
        message_id: i32,
        text: &str,
        keyboard: Option<&[Button]>,
    ) -> anyhow::Result<()>;
}

/// A held lease. Dropping it without calling `release` still frees the
/// lock eventually (best-effort delete, or lease expiry).
#[async_trait]
pub trait LockGuard: Send + Sync {
    async fn release(self: Box<Self>) -> anyhow::Result<()>;
}

/// Cross-instance mutual exclusion for the reminder job. Acquisition
/// never blocks: contention means another instance is running and this
/// one skips its turn.
#[async_trait]
pub trait DistributedLock: Send + Sync {
    async fn try_acquire(
        &self,
        key: &str,
        lease: Duration,
    ) -> anyhow::Result<Option<Box<dyn LockGuard>>>;
}

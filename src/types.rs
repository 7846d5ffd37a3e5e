use chrono::{DateTime, Utc};

/// A single tracked birthday, owned by a registered user.
#[derive(Debug, Clone, PartialEq)]
pub struct Birthday {
    pub id: i64,
    pub person: String,
    pub year: Option<i32>,
    pub month: u32,
    pub day: u32,
    /// Disabled birthdays are excluded from both ranking and reminders.
    pub enabled: bool,
    /// Null until the first reminder for this birthday fires.
    pub last_notified_at: Option<DateTime<Utc>>,
    pub owner_id: i64,
}

/// A registered user, addressed by their Telegram chat id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub chat_id: i64,
}

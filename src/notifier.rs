use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::dates;
use crate::traits::{BirthdayStore, DistributedLock, Gateway};
use crate::types::Birthday;

/// Lock key shared by all bot instances.
pub const LOCK_KEY: &str = "birthday-notifier";

/// Due birthdays of one owner, split by whether the occurrence is
/// today or was missed on an earlier run.
#[derive(Debug, Default, PartialEq, Eq, Serialize)]
pub struct DueBirthdays {
    pub celebrate_today: Vec<String>,
    pub forgotten: Vec<String>,
    #[serde(skip)]
    pub ids: Vec<i64>,
}

/// Periodic reminder job. One instance at a time across the whole
/// deployment, guarded by the distributed lock.
pub struct BirthdayNotifier {
    store: Arc<dyn BirthdayStore>,
    gateway: Arc<dyn Gateway>,
    lock: Arc<dyn DistributedLock>,
    timezone: Tz,
    time_of_day: NaiveTime,
    lock_lease: Duration,
    tick_interval: Duration,
}

impl BirthdayNotifier {
    pub fn new(
        store: Arc<dyn BirthdayStore>,
        gateway: Arc<dyn Gateway>,
        lock: Arc<dyn DistributedLock>,
        timezone: Tz,
        time_of_day: NaiveTime,
        lock_lease: Duration,
        tick_interval: Duration,
    ) -> Self {
        Self {
            store,
            gateway,
            lock,
            timezone,
            time_of_day,
            lock_lease,
            tick_interval,
        }
    }

    /// Spawn the tick loop as a background task.
    pub fn spawn(self: Arc<Self>) {
        tokio::spawn(async move {
            loop {
                if let Err(e) = self.run_once(Utc::now()).await {
                    error!("Birthday notifier iteration failed: {}", e);
                }
                tokio::time::sleep(self.tick_interval).await;
            }
        });
        info!("Birthday notifier spawned");
    }

    /// A single reminder pass at `now`.
    pub async fn run_once(&self, now: DateTime<Utc>) -> anyhow::Result<()> {
        let local = now.with_timezone(&self.timezone);
        if local.time() < self.time_of_day {
            debug!("Notification time not reached, skip iteration");
            return Ok(());
        }

        let Some(guard) = self.lock.try_acquire(LOCK_KEY, self.lock_lease).await? else {
            info!("Another notifier instance holds the lock, skip iteration");
            return Ok(());
        };

        // All last-notification writes happen before the release below,
        // so a concurrent acquirer never observes a half-finished run.
        let outcome = self.run_locked(now, local.date_naive()).await;
        guard.release().await?;
        outcome
    }

    async fn run_locked(&self, now: DateTime<Utc>, today: NaiveDate) -> anyhow::Result<()> {
        let records = self.store.list_enabled_birthdays().await?;
        let due = find_birthdays_to_notify(&records, self.timezone, today);
        if due.is_empty() {
            debug!("No birthdays due");
            return Ok(());
        }

        info!(
            digest = %serde_json::to_string(&due).unwrap_or_default(),
            "Birthdays due"
        );

        for (owner_id, birthdays) in &due {
            let Some(chat_id) = self.store.chat_for_user(*owner_id).await? else {
                warn!(owner_id, "Due birthdays for a missing user, skip");
                continue;
            };

            // Sends are fire-and-forget: a transient gateway failure must
            // not replay the same reminder on the next run.
            let text = render_message(birthdays);
            if let Err(e) = self.gateway.send_message(chat_id, &text, None).await {
                warn!(owner_id, "Failed to send birthday reminder: {}", e);
            }

            for id in &birthdays.ids {
                self.store.update_last_notified(*id, now).await?;
            }
        }

        Ok(())
    }
}

/// Classify enabled birthdays against `today` (a local calendar day in
/// `timezone`).
///
/// A birthday is due when its occurrence this year is on or before
/// today and it has not been notified on or after that occurrence day.
/// Feb 29 records fall back to Feb 28 in non-leap years.
pub fn find_birthdays_to_notify(
    records: &[Birthday],
    timezone: Tz,
    today: NaiveDate,
) -> BTreeMap<i64, DueBirthdays> {
    let mut result: BTreeMap<i64, DueBirthdays> = BTreeMap::new();

    for record in records {
        if !record.enabled {
            debug!(id = record.id, "Skip birthday with disabled notification");
            continue;
        }

        let Some(occurrence) = dates::occurrence_in_year(record.month, record.day, today.year())
        else {
            warn!(id = record.id, "Skip birthday with impossible date");
            continue;
        };
        if occurrence > today {
            continue;
        }

        if let Some(last) = record.last_notified_at {
            let last_local_day = last.with_timezone(&timezone).date_naive();
            if last_local_day >= occurrence {
                debug!(id = record.id, "Skip already notified birthday");
                continue;
            }
        }

        let entry = result.entry(record.owner_id).or_default();
        entry.ids.push(record.id);
        if occurrence == today {
            entry.celebrate_today.push(record.person.clone());
        } else {
            entry.forgotten.push(format!(
                "{} on {}",
                record.person,
                dates::format_day_month(record.day, record.month)
            ));
        }
    }

    result
}

/// Reminder text for one owner; either clause is omitted when empty.
pub fn render_message(birthdays: &DueBirthdays) -> String {
    let mut lines = Vec::new();
    if !birthdays.celebrate_today.is_empty() {
        lines.push(format!(
            "Today is birthday of {}",
            birthdays.celebrate_today.join(", ")
        ));
    }
    if !birthdays.forgotten.is_empty() {
        lines.push(format!(
            "You forgot about birthdays: \n{}",
            birthdays.forgotten.join("\n")
        ));
    }
    lines.join("\n")
}

//! SQLite outbox implementation of the notification scheduler.
//!
//! The core cannot post OS notifications itself. Scheduled reminders are
//! written to `notification_requests`; the platform shell reads `pending()`
//! and mirrors them into the OS notification center, and removes the ones
//! that come back cancelled.
//!
//! # Invariants
//! - Scheduling without granted access fails with `PermissionDenied` and
//!   writes nothing.
//! - All triggers of one request are written in one transaction.
//! - Cancelling unknown or already-cancelled ids is a no-op.

use crate::model::habit::{NotificationId, Weekday};
use crate::notify::access::NotificationAccess;
use crate::notify::{NotificationScheduler, ReminderRequest, ReminderTrigger, SchedulerError};
use chrono::Utc;
use log::{info, warn};
use rusqlite::{params, Connection};
use uuid::Uuid;

/// One scheduled, not yet cancelled reminder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingNotification {
    pub id: NotificationId,
    pub title: String,
    pub body: String,
    pub trigger: ReminderTrigger,
}

/// Outbox-backed scheduler bound to one connection.
pub struct SqliteNotificationScheduler<'conn> {
    conn: &'conn Connection,
    access: NotificationAccess,
}

impl<'conn> SqliteNotificationScheduler<'conn> {
    pub fn new(conn: &'conn Connection, access: NotificationAccess) -> Self {
        Self { conn, access }
    }

    pub fn access(&self) -> NotificationAccess {
        self.access
    }

    /// Lists pending reminders in scheduling order.
    pub fn pending(&self) -> Result<Vec<PendingNotification>, SchedulerError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, title, body, weekday, hour, minute, repeats
             FROM notification_requests
             WHERE cancelled_at IS NULL
             ORDER BY created_at ASC, rowid ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut pending = Vec::new();
        while let Some(row) = rows.next()? {
            let weekday_value: u8 = row.get("weekday")?;
            let weekday = Weekday::from_calendar_number(weekday_value).ok_or_else(|| {
                SchedulerError::Backend(format!(
                    "invalid weekday `{weekday_value}` in notification_requests.weekday"
                ))
            })?;
            pending.push(PendingNotification {
                id: row.get("id")?,
                title: row.get("title")?,
                body: row.get("body")?,
                trigger: ReminderTrigger {
                    weekday,
                    hour: row.get("hour")?,
                    minute: row.get("minute")?,
                    repeats: row.get::<_, i64>("repeats")? == 1,
                },
            });
        }
        Ok(pending)
    }
}

impl NotificationScheduler for SqliteNotificationScheduler<'_> {
    async fn schedule(
        &self,
        request: &ReminderRequest,
    ) -> Result<Vec<NotificationId>, SchedulerError> {
        if !self.access.allows_reminders() {
            warn!(
                "event=reminder_schedule module=notify status=error error_code=permission_denied access={}",
                self.access.as_str()
            );
            return Err(SchedulerError::PermissionDenied);
        }
        if request.weekdays.is_empty() {
            return Err(SchedulerError::InvalidRequest(
                "at least one weekday is required".to_string(),
            ));
        }

        let now = Utc::now().timestamp_millis();
        let tx = self.conn.unchecked_transaction()?;
        let mut ids = Vec::with_capacity(request.weekdays.len());
        for trigger in request.triggers() {
            let id = Uuid::new_v4().to_string();
            tx.execute(
                "INSERT INTO notification_requests (
                    id, title, body, weekday, hour, minute, repeats, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
                params![
                    id.as_str(),
                    request.habit_title.as_str(),
                    request.body.as_str(),
                    trigger.weekday.calendar_number(),
                    trigger.hour,
                    trigger.minute,
                    i64::from(trigger.repeats),
                    now,
                ],
            )?;
            ids.push(id);
        }
        tx.commit()?;

        info!(
            "event=reminder_schedule module=notify status=ok count={}",
            ids.len()
        );
        Ok(ids)
    }

    async fn cancel(&self, ids: &[NotificationId]) -> Result<(), SchedulerError> {
        if ids.is_empty() {
            return Ok(());
        }

        let now = Utc::now().timestamp_millis();
        let tx = self.conn.unchecked_transaction()?;
        let mut cancelled = 0;
        for id in ids {
            cancelled += tx.execute(
                "UPDATE notification_requests
                 SET cancelled_at = ?2
                 WHERE id = ?1 AND cancelled_at IS NULL;",
                params![id.as_str(), now],
            )?;
        }
        tx.commit()?;

        info!(
            "event=reminder_cancel module=notify status=ok requested={} cancelled={cancelled}",
            ids.len()
        );
        Ok(())
    }
}

//! Local reminder scheduling contract.
//!
//! # Responsibility
//! - Describe what a habit reminder asks the platform to schedule.
//! - Define the asynchronous scheduler boundary the edit model calls into.
//!
//! # Invariants
//! - One repeating trigger is scheduled per selected weekday.
//! - `schedule` returns ids in calendar order of the weekdays.
//! - `cancel` is best-effort; callers log its failures and carry on.

use crate::model::habit::{NotificationId, Weekday, WeekdaySet};
use chrono::{Datelike, Days, NaiveDateTime, NaiveTime, Timelike};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod access;
pub mod outbox;

/// Reminder schedule derived from a committed habit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderRequest {
    /// Notification title (the habit title).
    pub habit_title: String,
    /// Notification body (the reminder text).
    pub body: String,
    pub weekdays: WeekdaySet,
    pub time: NaiveTime,
}

impl ReminderRequest {
    /// One weekly trigger per selected weekday, calendar order.
    pub fn triggers(&self) -> Vec<ReminderTrigger> {
        self.weekdays
            .iter()
            .map(|weekday| ReminderTrigger {
                weekday,
                hour: self.time.hour(),
                minute: self.time.minute(),
                repeats: true,
            })
            .collect()
    }
}

/// Calendar trigger matching weekday + hour + minute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReminderTrigger {
    pub weekday: Weekday,
    pub hour: u32,
    pub minute: u32,
    pub repeats: bool,
}

impl ReminderTrigger {
    /// First instant strictly after `after` at which this trigger fires.
    ///
    /// `None` when the trigger time is invalid or the next firing lies past
    /// the calendar range.
    pub fn next_fire_after(&self, after: NaiveDateTime) -> Option<NaiveDateTime> {
        let time = NaiveTime::from_hms_opt(self.hour, self.minute, 0)?;
        (0..=7).find_map(|offset| {
            let date = after.date().checked_add_days(Days::new(offset))?;
            let candidate = date.and_time(time);
            (Weekday::from(candidate.weekday()) == self.weekday && candidate > after)
                .then_some(candidate)
        })
    }
}

/// Scheduler failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    /// The platform refused notification access.
    PermissionDenied,
    InvalidRequest(String),
    Backend(String),
}

impl Display for SchedulerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PermissionDenied => write!(f, "notification permission denied"),
            Self::InvalidRequest(message) => write!(f, "invalid reminder request: {message}"),
            Self::Backend(message) => write!(f, "notification backend failure: {message}"),
        }
    }
}

impl Error for SchedulerError {}

impl From<rusqlite::Error> for SchedulerError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Backend(value.to_string())
    }
}

/// Schedules and cancels local reminders.
///
/// Implementations may suspend on platform calls.
#[allow(async_fn_in_trait)]
pub trait NotificationScheduler {
    async fn schedule(
        &self,
        request: &ReminderRequest,
    ) -> Result<Vec<NotificationId>, SchedulerError>;

    async fn cancel(&self, ids: &[NotificationId]) -> Result<(), SchedulerError>;
}

impl<T: NotificationScheduler + ?Sized> NotificationScheduler for &T {
    async fn schedule(
        &self,
        request: &ReminderRequest,
    ) -> Result<Vec<NotificationId>, SchedulerError> {
        (**self).schedule(request).await
    }

    async fn cancel(&self, ids: &[NotificationId]) -> Result<(), SchedulerError> {
        (**self).cancel(ids).await
    }
}

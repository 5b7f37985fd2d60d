//! Core domain logic for the habit tracker.
//! This crate is the single source of truth for habit invariants.

pub mod db;
pub mod logging;
pub mod model;
pub mod notify;
pub mod repo;
pub mod service;

pub use logging::{default_log_level, init_logging, logging_status};
pub use model::edit_state::EditState;
pub use model::habit::{
    reminder_time, Habit, HabitColor, HabitDraft, HabitId, HabitValidationError, NotificationId,
    Weekday, WeekdaySet,
};
pub use notify::access::{parse_notification_access, NotificationAccess};
pub use notify::outbox::{PendingNotification, SqliteNotificationScheduler};
pub use notify::{NotificationScheduler, ReminderRequest, ReminderTrigger, SchedulerError};
pub use repo::completion_repo::{CompletionStore, SqliteCompletionStore};
pub use repo::habit_repo::{HabitStore, SqliteHabitStore, StoreError, StoreResult};
pub use service::habit_editor::{CommitOutcome, EditError, HabitEditor, SchedulerWarning};
pub use service::habit_service::{DayStatus, HabitService, WeekProgress};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

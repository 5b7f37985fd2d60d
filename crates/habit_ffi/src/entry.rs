//! Entry database wiring for FFI calls.
//!
//! # Responsibility
//! - Resolve the habit database path once per process.
//! - Provide store and scheduler collaborators that open the entry database
//!   per call, so an edit session can be parked between FFI calls.
//!
//! # Invariants
//! - No connection outlives the collaborator call that opened it.

use habit_core::db::{open_db, DbResult};
use habit_core::{
    Habit, HabitDraft, HabitId, HabitStore, NotificationAccess, NotificationId,
    NotificationScheduler, ReminderRequest, SchedulerError, SqliteHabitStore,
    SqliteNotificationScheduler, StoreResult,
};
use rusqlite::Connection;
use std::path::PathBuf;
use std::sync::OnceLock;

const DB_FILE_NAME: &str = "habit_tracker.sqlite3";
const DB_PATH_ENV: &str = "HABIT_TRACKER_DB_PATH";
static DB_PATH: OnceLock<PathBuf> = OnceLock::new();

pub(crate) fn open_entry_db() -> DbResult<Connection> {
    open_db(resolve_db_path())
}

pub(crate) fn resolve_db_path() -> PathBuf {
    DB_PATH
        .get_or_init(|| {
            if let Ok(raw) = std::env::var(DB_PATH_ENV) {
                let trimmed = raw.trim();
                if !trimmed.is_empty() {
                    return PathBuf::from(trimmed);
                }
            }
            std::env::temp_dir().join(DB_FILE_NAME)
        })
        .clone()
}

/// Habit store over the entry database.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct EntryHabitStore;

impl HabitStore for EntryHabitStore {
    fn create(&self, draft: &HabitDraft) -> StoreResult<Habit> {
        let conn = open_entry_db()?;
        let store = SqliteHabitStore::new(&conn);
        store.create(draft)
    }

    fn update(&self, id: HabitId, draft: &HabitDraft) -> StoreResult<Habit> {
        let conn = open_entry_db()?;
        let store = SqliteHabitStore::new(&conn);
        store.update(id, draft)
    }

    fn delete(&self, id: HabitId) -> StoreResult<()> {
        let conn = open_entry_db()?;
        let store = SqliteHabitStore::new(&conn);
        store.delete(id)
    }

    fn get(&self, id: HabitId) -> StoreResult<Option<Habit>> {
        let conn = open_entry_db()?;
        let store = SqliteHabitStore::new(&conn);
        store.get(id)
    }

    fn list(&self) -> StoreResult<Vec<Habit>> {
        let conn = open_entry_db()?;
        let store = SqliteHabitStore::new(&conn);
        store.list()
    }
}

/// Notification outbox over the entry database.
///
/// `access` is fixed per instance; commits build one from the editor's
/// current permission state.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct EntryScheduler {
    access: NotificationAccess,
}

impl EntryScheduler {
    pub(crate) fn new(access: NotificationAccess) -> Self {
        Self { access }
    }
}

impl NotificationScheduler for EntryScheduler {
    async fn schedule(
        &self,
        request: &ReminderRequest,
    ) -> Result<Vec<NotificationId>, SchedulerError> {
        let conn = open_entry_db().map_err(|err| SchedulerError::Backend(err.to_string()))?;
        let outbox = SqliteNotificationScheduler::new(&conn, self.access);
        outbox.schedule(request).await
    }

    async fn cancel(&self, ids: &[NotificationId]) -> Result<(), SchedulerError> {
        let conn = open_entry_db().map_err(|err| SchedulerError::Backend(err.to_string()))?;
        let outbox = SqliteNotificationScheduler::new(&conn, self.access);
        outbox.cancel(ids).await
    }
}

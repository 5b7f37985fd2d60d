//! Habit entity store contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide create/update/delete/list APIs over canonical `habits` storage.
//! - Keep weekday and notification-id child rows consistent with the parent.
//!
//! # Invariants
//! - Write paths call `HabitDraft::validate()` before SQL mutations.
//! - Read paths reject invalid persisted state instead of masking it.
//! - Parent and child rows of one habit are written in one transaction.

use crate::db::DbError;
use crate::model::habit::{
    Habit, HabitColor, HabitDraft, HabitId, HabitValidationError, NotificationId, Weekday,
    WeekdaySet,
};
use chrono::{NaiveTime, Timelike, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const HABIT_SELECT_SQL: &str = "SELECT
    uuid,
    title,
    color,
    reminder_enabled,
    reminder_minute,
    reminder_text,
    created_at
FROM habits";

pub type StoreResult<T> = Result<T, StoreError>;

/// Entity store error for habit persistence and query operations.
#[derive(Debug)]
pub enum StoreError {
    Validation(HabitValidationError),
    Db(DbError),
    NotFound(HabitId),
    InvalidData(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "habit not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted habit data: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound(_) | Self::InvalidData(_) => None,
        }
    }
}

impl From<HabitValidationError> for StoreError {
    fn from(value: HabitValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Durable record of habits.
pub trait HabitStore {
    /// Persists a new habit and assigns its id and creation time.
    fn create(&self, draft: &HabitDraft) -> StoreResult<Habit>;
    /// Replaces all editable fields of an existing habit.
    fn update(&self, id: HabitId, draft: &HabitDraft) -> StoreResult<Habit>;
    /// Removes a habit together with its weekday, reminder and completion rows.
    fn delete(&self, id: HabitId) -> StoreResult<()>;
    fn get(&self, id: HabitId) -> StoreResult<Option<Habit>>;
    /// Lists habits by creation order.
    fn list(&self) -> StoreResult<Vec<Habit>>;
}

impl<T: HabitStore + ?Sized> HabitStore for &T {
    fn create(&self, draft: &HabitDraft) -> StoreResult<Habit> {
        (**self).create(draft)
    }

    fn update(&self, id: HabitId, draft: &HabitDraft) -> StoreResult<Habit> {
        (**self).update(id, draft)
    }

    fn delete(&self, id: HabitId) -> StoreResult<()> {
        (**self).delete(id)
    }

    fn get(&self, id: HabitId) -> StoreResult<Option<Habit>> {
        (**self).get(id)
    }

    fn list(&self) -> StoreResult<Vec<Habit>> {
        (**self).list()
    }
}

/// SQLite-backed habit store.
pub struct SqliteHabitStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteHabitStore<'conn> {
    /// Wraps a migrated connection (see `db::open_db`).
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl HabitStore for SqliteHabitStore<'_> {
    fn create(&self, draft: &HabitDraft) -> StoreResult<Habit> {
        draft.validate()?;

        let id = Uuid::new_v4();
        let now = Utc::now().timestamp_millis();
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO habits (
                uuid,
                title,
                color,
                reminder_enabled,
                reminder_minute,
                reminder_text,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7);",
            params![
                id.to_string(),
                draft.title.as_str(),
                draft.color.as_str(),
                bool_to_int(draft.reminder_enabled),
                time_to_minute(draft.reminder_time),
                draft.reminder_text.as_str(),
                now,
            ],
        )?;
        write_children(&tx, id, &draft.weekdays, &draft.notification_ids)?;
        tx.commit()?;

        Ok(Habit::from_draft(id, now, draft.clone()))
    }

    fn update(&self, id: HabitId, draft: &HabitDraft) -> StoreResult<Habit> {
        draft.validate()?;

        let tx = self.conn.unchecked_transaction()?;
        let changed = tx.execute(
            "UPDATE habits
             SET
                title = ?2,
                color = ?3,
                reminder_enabled = ?4,
                reminder_minute = ?5,
                reminder_text = ?6,
                updated_at = ?7
             WHERE uuid = ?1;",
            params![
                id.to_string(),
                draft.title.as_str(),
                draft.color.as_str(),
                bool_to_int(draft.reminder_enabled),
                time_to_minute(draft.reminder_time),
                draft.reminder_text.as_str(),
                Utc::now().timestamp_millis(),
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(id));
        }

        tx.execute(
            "DELETE FROM habit_weekdays WHERE habit_uuid = ?1;",
            [id.to_string()],
        )?;
        tx.execute(
            "DELETE FROM habit_notifications WHERE habit_uuid = ?1;",
            [id.to_string()],
        )?;
        write_children(&tx, id, &draft.weekdays, &draft.notification_ids)?;

        let created_at: i64 = tx.query_row(
            "SELECT created_at FROM habits WHERE uuid = ?1;",
            [id.to_string()],
            |row| row.get(0),
        )?;
        tx.commit()?;

        Ok(Habit::from_draft(id, created_at, draft.clone()))
    }

    fn delete(&self, id: HabitId) -> StoreResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM habits WHERE uuid = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    fn get(&self, id: HabitId) -> StoreResult<Option<Habit>> {
        let row = self
            .conn
            .query_row(
                &format!("{HABIT_SELECT_SQL} WHERE uuid = ?1;"),
                [id.to_string()],
                HabitRow::from_row,
            )
            .optional()?;

        row.map(|row| row.into_habit(self.conn)).transpose()
    }

    fn list(&self) -> StoreResult<Vec<Habit>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{HABIT_SELECT_SQL} ORDER BY created_at ASC, uuid ASC;"))?;
        let rows = stmt
            .query_map([], HabitRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|row| row.into_habit(self.conn))
            .collect()
    }
}

/// Raw `habits` row before child rows are attached.
struct HabitRow {
    uuid: String,
    title: String,
    color: String,
    reminder_enabled: i64,
    reminder_minute: i64,
    reminder_text: String,
    created_at: i64,
}

impl HabitRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            uuid: row.get("uuid")?,
            title: row.get("title")?,
            color: row.get("color")?,
            reminder_enabled: row.get("reminder_enabled")?,
            reminder_minute: row.get("reminder_minute")?,
            reminder_text: row.get("reminder_text")?,
            created_at: row.get("created_at")?,
        })
    }

    fn into_habit(self, conn: &Connection) -> StoreResult<Habit> {
        let id = Uuid::parse_str(&self.uuid).map_err(|_| {
            StoreError::InvalidData(format!("invalid uuid value `{}` in habits.uuid", self.uuid))
        })?;
        let color = HabitColor::parse(&self.color).ok_or_else(|| {
            StoreError::InvalidData(format!("invalid color `{}` in habits.color", self.color))
        })?;
        let reminder_enabled = match self.reminder_enabled {
            0 => false,
            1 => true,
            other => {
                return Err(StoreError::InvalidData(format!(
                    "invalid reminder_enabled value `{other}` in habits.reminder_enabled"
                )));
            }
        };
        let reminder_time = minute_to_time(self.reminder_minute).ok_or_else(|| {
            StoreError::InvalidData(format!(
                "invalid reminder_minute value `{}` in habits.reminder_minute",
                self.reminder_minute
            ))
        })?;

        let habit = Habit {
            id,
            title: self.title,
            color,
            weekdays: load_weekdays(conn, &self.uuid)?,
            reminder_enabled,
            reminder_time,
            reminder_text: self.reminder_text,
            notification_ids: load_notification_ids(conn, &self.uuid)?,
            created_at: self.created_at,
        };
        habit.validate()?;
        Ok(habit)
    }
}

fn write_children(
    tx: &Transaction<'_>,
    id: HabitId,
    weekdays: &WeekdaySet,
    notification_ids: &[NotificationId],
) -> StoreResult<()> {
    let id_text = id.to_string();
    for day in weekdays.iter() {
        tx.execute(
            "INSERT INTO habit_weekdays (habit_uuid, weekday) VALUES (?1, ?2);",
            params![id_text.as_str(), day.calendar_number()],
        )?;
    }
    for (position, notification_id) in notification_ids.iter().enumerate() {
        tx.execute(
            "INSERT OR IGNORE INTO habit_notifications (habit_uuid, notification_id, position)
             VALUES (?1, ?2, ?3);",
            params![id_text.as_str(), notification_id.as_str(), position as i64],
        )?;
    }
    Ok(())
}

fn load_weekdays(conn: &Connection, habit_uuid: &str) -> StoreResult<WeekdaySet> {
    let mut stmt =
        conn.prepare("SELECT weekday FROM habit_weekdays WHERE habit_uuid = ?1 ORDER BY weekday;")?;
    let mut rows = stmt.query([habit_uuid])?;
    let mut weekdays = WeekdaySet::new();
    while let Some(row) = rows.next()? {
        let value: u8 = row.get(0)?;
        let day = Weekday::from_calendar_number(value).ok_or_else(|| {
            StoreError::InvalidData(format!(
                "invalid weekday `{value}` in habit_weekdays.weekday"
            ))
        })?;
        weekdays.insert(day);
    }
    Ok(weekdays)
}

fn load_notification_ids(conn: &Connection, habit_uuid: &str) -> StoreResult<Vec<NotificationId>> {
    let mut stmt = conn.prepare(
        "SELECT notification_id
         FROM habit_notifications
         WHERE habit_uuid = ?1
         ORDER BY position ASC;",
    )?;
    let ids = stmt
        .query_map([habit_uuid], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<NotificationId>>>()?;
    Ok(ids)
}

fn time_to_minute(time: NaiveTime) -> i64 {
    i64::from(time.hour() * 60 + time.minute())
}

fn minute_to_time(value: i64) -> Option<NaiveTime> {
    if !(0..24 * 60).contains(&value) {
        return None;
    }
    NaiveTime::from_hms_opt((value / 60) as u32, (value % 60) as u32, 0)
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

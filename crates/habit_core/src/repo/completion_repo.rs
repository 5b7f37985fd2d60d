//! Per-day habit completion records.
//!
//! # Invariants
//! - At most one completion row per `(habit, day)`.
//! - Days are stored as ISO `YYYY-MM-DD` text so range scans sort correctly;
//!   years outside `0000..=9999` are rejected since their text does not.
//! - Completion rows disappear with their habit (`ON DELETE CASCADE`).

use crate::model::habit::HabitId;
use crate::repo::habit_repo::{StoreError, StoreResult};
use chrono::{Datelike, NaiveDate, Utc};
use rusqlite::{params, Connection};

const DAY_FORMAT: &str = "%Y-%m-%d";
const MIN_YEAR: i32 = 0;
const MAX_YEAR: i32 = 9999;

/// Completion log contract.
pub trait CompletionStore {
    /// Marks or clears completion of `habit` on `day`. Idempotent.
    fn set_completed(&self, habit: HabitId, day: NaiveDate, completed: bool) -> StoreResult<()>;
    fn is_completed(&self, habit: HabitId, day: NaiveDate) -> StoreResult<bool>;
    /// Completed days in the inclusive range `from..=to`, ascending.
    fn completed_days(
        &self,
        habit: HabitId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> StoreResult<Vec<NaiveDate>>;
}

impl<T: CompletionStore + ?Sized> CompletionStore for &T {
    fn set_completed(&self, habit: HabitId, day: NaiveDate, completed: bool) -> StoreResult<()> {
        (**self).set_completed(habit, day, completed)
    }

    fn is_completed(&self, habit: HabitId, day: NaiveDate) -> StoreResult<bool> {
        (**self).is_completed(habit, day)
    }

    fn completed_days(
        &self,
        habit: HabitId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> StoreResult<Vec<NaiveDate>> {
        (**self).completed_days(habit, from, to)
    }
}

/// SQLite-backed completion log.
pub struct SqliteCompletionStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCompletionStore<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn habit_exists(&self, habit: HabitId) -> StoreResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM habits WHERE uuid = ?1);",
            [habit.to_string()],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }
}

impl CompletionStore for SqliteCompletionStore<'_> {
    fn set_completed(&self, habit: HabitId, day: NaiveDate, completed: bool) -> StoreResult<()> {
        if !self.habit_exists(habit)? {
            return Err(StoreError::NotFound(habit));
        }

        let day_text = day_key(day)?;
        if completed {
            self.conn.execute(
                "INSERT OR IGNORE INTO habit_completions (habit_uuid, day, completed_at)
                 VALUES (?1, ?2, ?3);",
                params![habit.to_string(), day_text, Utc::now().timestamp_millis()],
            )?;
        } else {
            self.conn.execute(
                "DELETE FROM habit_completions WHERE habit_uuid = ?1 AND day = ?2;",
                params![habit.to_string(), day_text],
            )?;
        }
        Ok(())
    }

    fn is_completed(&self, habit: HabitId, day: NaiveDate) -> StoreResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(
                SELECT 1 FROM habit_completions WHERE habit_uuid = ?1 AND day = ?2
            );",
            params![habit.to_string(), day_key(day)?],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn completed_days(
        &self,
        habit: HabitId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> StoreResult<Vec<NaiveDate>> {
        let mut stmt = self.conn.prepare(
            "SELECT day
             FROM habit_completions
             WHERE habit_uuid = ?1
               AND day BETWEEN ?2 AND ?3
             ORDER BY day ASC;",
        )?;
        let raw_days = stmt
            .query_map(
                params![habit.to_string(), day_key(from)?, day_key(to)?],
                |row| row.get::<_, String>(0),
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        raw_days
            .into_iter()
            .map(|value| {
                NaiveDate::parse_from_str(&value, DAY_FORMAT).map_err(|_| {
                    StoreError::InvalidData(format!(
                        "invalid day `{value}` in habit_completions.day"
                    ))
                })
            })
            .collect()
    }
}

fn day_key(day: NaiveDate) -> StoreResult<String> {
    if !(MIN_YEAR..=MAX_YEAR).contains(&day.year()) {
        return Err(StoreError::InvalidData(format!(
            "completion day {day} is outside years {MIN_YEAR:04}..={MAX_YEAR}"
        )));
    }
    Ok(day.format(DAY_FORMAT).to_string())
}

//! Habit listing and per-day completion use-cases.
//!
//! # Responsibility
//! - Provide the read path presentation uses to render habit cards.
//! - Toggle and summarize per-day completion.
//!
//! # Invariants
//! - Weeks run Sunday..Saturday, matching the weekday picker order.
//! - Completions can be recorded on unscheduled days; they are reported but
//!   not counted towards `scheduled_count`.
//! - Weeks that fall outside the representable calendar are rejected, never
//!   wrapped or clamped.

use crate::model::habit::{Habit, HabitId, Weekday};
use crate::repo::completion_repo::CompletionStore;
use crate::repo::habit_repo::{HabitStore, StoreError, StoreResult};
use chrono::{Datelike, Days, NaiveDate};

/// Completion state of one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayStatus {
    pub date: NaiveDate,
    pub weekday: Weekday,
    /// Habit recurs on this weekday.
    pub scheduled: bool,
    pub completed: bool,
}

/// One Sunday-to-Saturday week of a habit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeekProgress {
    pub habit_id: HabitId,
    pub days: Vec<DayStatus>,
}

impl WeekProgress {
    pub fn scheduled_count(&self) -> usize {
        self.days.iter().filter(|day| day.scheduled).count()
    }

    /// Completed days among the scheduled ones.
    pub fn completed_count(&self) -> usize {
        self.days
            .iter()
            .filter(|day| day.scheduled && day.completed)
            .count()
    }
}

/// Read/completion facade over store implementations.
pub struct HabitService<S: HabitStore, C: CompletionStore> {
    habits: S,
    completions: C,
}

impl<S: HabitStore, C: CompletionStore> HabitService<S, C> {
    pub fn new(habits: S, completions: C) -> Self {
        Self {
            habits,
            completions,
        }
    }

    /// Lists habits in creation order.
    pub fn list_habits(&self) -> StoreResult<Vec<Habit>> {
        self.habits.list()
    }

    pub fn get_habit(&self, id: HabitId) -> StoreResult<Option<Habit>> {
        self.habits.get(id)
    }

    /// Flips completion of `habit` on `day` and returns the new state.
    pub fn toggle_completion(&self, habit: HabitId, day: NaiveDate) -> StoreResult<bool> {
        let completed = !self.completions.is_completed(habit, day)?;
        self.completions.set_completed(habit, day, completed)?;
        Ok(completed)
    }

    /// Builds the week containing `any_day`.
    ///
    /// # Errors
    /// - `NotFound` for an unknown habit.
    /// - `InvalidData` when the week runs past the calendar range.
    pub fn week_progress(&self, habit: HabitId, any_day: NaiveDate) -> StoreResult<WeekProgress> {
        let record = self.habits.get(habit)?.ok_or(StoreError::NotFound(habit))?;
        let dates = week_dates(any_day).ok_or_else(|| {
            StoreError::InvalidData(format!("week of {any_day} is outside the calendar range"))
        })?;
        let completed = self
            .completions
            .completed_days(habit, dates[0], dates[6])?;

        let days = dates
            .into_iter()
            .map(|date| {
                let weekday = Weekday::from(date.weekday());
                DayStatus {
                    date,
                    weekday,
                    scheduled: record.recurs_on(weekday),
                    completed: completed.contains(&date),
                }
            })
            .collect();

        Ok(WeekProgress {
            habit_id: habit,
            days,
        })
    }
}

/// Sunday on or before `day`; `None` before the first representable Sunday.
pub fn week_start(day: NaiveDate) -> Option<NaiveDate> {
    day.checked_sub_days(Days::new(u64::from(day.weekday().num_days_from_sunday())))
}

/// The seven dates Sunday..Saturday of the week containing `day`.
fn week_dates(day: NaiveDate) -> Option<[NaiveDate; 7]> {
    let start = week_start(day)?;
    let mut dates = [start; 7];
    for (offset, slot) in (0u64..).zip(dates.iter_mut()) {
        *slot = start.checked_add_days(Days::new(offset))?;
    }
    Some(dates)
}

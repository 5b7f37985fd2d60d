//! Transient state of one habit edit session.
//!
//! # Invariants
//! - `EditState` is never persisted.
//! - `editing == None` means the session creates a new habit.
//! - Field mutations never validate; completeness is queried on demand.

use crate::model::habit::{
    default_reminder_time, validate_fields, Habit, HabitColor, HabitDraft, HabitId,
    HabitValidationError, WeekdaySet,
};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

/// In-progress field values plus presentation-only flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditState {
    pub title: String,
    pub color: HabitColor,
    pub weekdays: WeekdaySet,
    pub reminder_enabled: bool,
    pub reminder_time: NaiveTime,
    pub reminder_text: String,
    /// Whether the time-selection overlay is open.
    pub show_time_picker: bool,
    /// Habit being edited, as loaded when the session started.
    pub editing: Option<Habit>,
}

impl Default for EditState {
    fn default() -> Self {
        Self {
            title: String::new(),
            color: HabitColor::default(),
            weekdays: WeekdaySet::new(),
            reminder_enabled: false,
            reminder_time: default_reminder_time(),
            reminder_text: String::new(),
            show_time_picker: false,
            editing: None,
        }
    }
}

impl EditState {
    /// Starts a session that edits `habit` in place.
    pub fn for_habit(habit: Habit) -> Self {
        Self {
            title: habit.title.clone(),
            color: habit.color,
            weekdays: habit.weekdays.clone(),
            reminder_enabled: habit.reminder_enabled,
            reminder_time: habit.reminder_time,
            reminder_text: habit.reminder_text.clone(),
            show_time_picker: false,
            editing: Some(habit),
        }
    }

    pub fn is_editing_existing(&self) -> bool {
        self.editing.is_some()
    }

    pub fn editing_id(&self) -> Option<HabitId> {
        self.editing.as_ref().map(|habit| habit.id)
    }

    /// Notification ids recorded on the habit being edited.
    pub fn previous_notification_ids(&self) -> &[String] {
        self.editing
            .as_ref()
            .map(|habit| habit.notification_ids.as_slice())
            .unwrap_or(&[])
    }

    pub fn validate(&self) -> Result<(), HabitValidationError> {
        validate_fields(
            &self.title,
            &self.weekdays,
            self.reminder_enabled,
            &self.reminder_text,
        )
    }

    /// Builds the store field set carrying `notification_ids`.
    pub fn to_draft(&self, notification_ids: Vec<String>) -> HabitDraft {
        HabitDraft {
            title: self.title.clone(),
            color: self.color,
            weekdays: self.weekdays.clone(),
            reminder_enabled: self.reminder_enabled,
            reminder_time: self.reminder_time,
            reminder_text: self.reminder_text.clone(),
            notification_ids,
        }
    }
}

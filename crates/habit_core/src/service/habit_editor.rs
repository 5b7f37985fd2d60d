//! Habit edit session: field mutations, completeness gate and commit.
//!
//! # Responsibility
//! - Hold one in-progress edit and expose its completeness.
//! - Commit validated state through the entity store and reminder scheduler.
//!
//! # Invariants
//! - Mutations never validate and never touch collaborators.
//! - `save`/`delete` leave the state untouched on failure and reset it to a
//!   fresh session on success.
//! - Nothing is scheduled or written when the state is incomplete.
//! - Scheduler failures never roll back a habit write.
//! - At most one commit runs per session at a time.

use crate::model::edit_state::EditState;
use crate::model::habit::{truncate_to_minute, Habit, HabitColor, NotificationId, Weekday};
use crate::notify::access::NotificationAccess;
use crate::notify::{NotificationScheduler, ReminderRequest, SchedulerError};
use crate::repo::habit_repo::{HabitStore, StoreError};
use chrono::NaiveTime;
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Edit session failures.
#[derive(Debug)]
pub enum EditError {
    /// Completeness gate failed; nothing was attempted.
    Incomplete,
    /// Delete requested while creating a new habit.
    NotEditingExisting,
    /// Weekday identifier outside the calendar symbol set.
    UnknownWeekday(String),
    /// Another save/delete of this session has not finished.
    CommitInFlight,
    /// The entity store rejected the write; the edit state is kept.
    StoreFailure(StoreError),
}

impl Display for EditError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Incomplete => write!(f, "habit is incomplete"),
            Self::NotEditingExisting => write!(f, "no existing habit is being edited"),
            Self::UnknownWeekday(value) => write!(f, "unknown weekday: `{value}`"),
            Self::CommitInFlight => write!(f, "a save or delete is already in progress"),
            Self::StoreFailure(err) => write!(f, "habit store failure: {err}"),
        }
    }
}

impl Error for EditError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::StoreFailure(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for EditError {
    fn from(value: StoreError) -> Self {
        Self::StoreFailure(value)
    }
}

/// Reminder scheduling failed after the habit was committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerWarning(pub SchedulerError);

impl Display for SchedulerWarning {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "habit saved, but its reminder was not scheduled: {}", self.0)
    }
}

impl Error for SchedulerWarning {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.0)
    }
}

/// Result of a successful `save`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitOutcome {
    /// Habit as persisted.
    pub habit: Habit,
    /// Present when reminder scheduling failed.
    pub warning: Option<SchedulerWarning>,
}

/// Edit model over an injected store and scheduler.
pub struct HabitEditor<S: HabitStore, N: NotificationScheduler> {
    store: S,
    scheduler: N,
    state: EditState,
    notification_access: NotificationAccess,
    in_flight: Arc<AtomicBool>,
}

impl<S: HabitStore, N: NotificationScheduler> HabitEditor<S, N> {
    /// Starts an idle session that creates a new habit.
    pub fn new(store: S, scheduler: N) -> Self {
        Self::with_state(store, scheduler, EditState::default())
    }

    /// Resumes a session from previously captured state.
    pub fn with_state(store: S, scheduler: N, state: EditState) -> Self {
        Self {
            store,
            scheduler,
            state,
            notification_access: NotificationAccess::default(),
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Shares the commit-in-flight flag with other editors of the same
    /// session, so a session rebuilt per call still serializes commits.
    pub fn with_commit_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.in_flight = flag;
        self
    }

    pub fn state(&self) -> &EditState {
        &self.state
    }

    /// Releases the session state, e.g. to park it between FFI calls.
    pub fn into_state(self) -> EditState {
        self.state
    }

    /// Loads an existing habit for in-place editing.
    pub fn begin_edit(&mut self, habit: Habit) {
        self.state = EditState::for_habit(habit);
    }

    /// Discards the in-progress edit.
    pub fn reset(&mut self) {
        self.state = EditState::default();
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.state.title = title.into();
    }

    pub fn set_color(&mut self, color: HabitColor) {
        self.state.color = color;
    }

    pub fn toggle_weekday(&mut self, day: Weekday) {
        self.state.weekdays.toggle(day);
    }

    /// Toggles a weekday given by its calendar symbol (`Monday`, ...).
    ///
    /// # Errors
    /// - `UnknownWeekday` when `symbol` is not a calendar weekday symbol; the
    ///   weekday set is left untouched.
    pub fn toggle_weekday_symbol(&mut self, symbol: &str) -> Result<(), EditError> {
        let day =
            Weekday::parse(symbol).ok_or_else(|| EditError::UnknownWeekday(symbol.to_string()))?;
        self.toggle_weekday(day);
        Ok(())
    }

    pub fn set_reminder_enabled(&mut self, enabled: bool) {
        self.state.reminder_enabled = enabled;
    }

    /// Sets the reminder time; seconds are dropped.
    pub fn set_reminder_time(&mut self, time: NaiveTime) {
        self.state.reminder_time = truncate_to_minute(time);
    }

    pub fn set_reminder_text(&mut self, text: impl Into<String>) {
        self.state.reminder_text = text.into();
    }

    pub fn toggle_time_picker(&mut self) {
        self.state.show_time_picker = !self.state.show_time_picker;
    }

    pub fn notification_access(&self) -> NotificationAccess {
        self.notification_access
    }

    /// Records the platform permission state; presentation-only.
    pub fn set_notification_access(&mut self, access: NotificationAccess) {
        self.notification_access = access;
    }

    /// Evaluated against current state on every call.
    pub fn is_complete(&self) -> bool {
        self.state.validate().is_ok()
    }

    pub fn commit_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Whether the save action should be enabled.
    pub fn can_save(&self) -> bool {
        self.is_complete() && !self.commit_in_flight()
    }

    /// Validates and commits the session.
    ///
    /// New reminders are scheduled before the write so the habit row and its
    /// notification ids land in one store call. Reminders of the previous
    /// revision are cancelled only after the write succeeded.
    ///
    /// # Errors
    /// - `Incomplete` without touching the store or scheduler.
    /// - `CommitInFlight` when another commit of this session is running.
    /// - `StoreFailure` when the write fails; freshly scheduled reminders are
    ///   cancelled again and the state is kept for a retry.
    pub async fn save(&mut self) -> Result<CommitOutcome, EditError> {
        if !self.is_complete() {
            return Err(EditError::Incomplete);
        }
        let _guard = InFlightGuard::acquire(&self.in_flight)?;
        let existing = self.state.editing_id();
        let mode = if existing.is_some() { "update" } else { "create" };
        info!(
            "event=habit_save module=editor status=start mode={mode} reminder={}",
            self.state.reminder_enabled
        );

        let mut warning = None;
        let mut new_ids = Vec::new();
        if self.state.reminder_enabled {
            let request = ReminderRequest {
                habit_title: self.state.title.clone(),
                body: self.state.reminder_text.clone(),
                weekdays: self.state.weekdays.clone(),
                time: self.state.reminder_time,
            };
            match self.scheduler.schedule(&request).await {
                Ok(ids) => new_ids = ids,
                Err(err) => {
                    warn!(
                        "event=reminder_schedule module=editor status=error mode={mode} error={err}"
                    );
                    warning = Some(SchedulerWarning(err));
                }
            }
        }

        let draft = self.state.to_draft(new_ids);
        let written = match existing {
            Some(id) => self.store.update(id, &draft),
            None => self.store.create(&draft),
        };
        let habit = match written {
            Ok(habit) => habit,
            Err(err) => {
                error!("event=habit_save module=editor status=error mode={mode} error={err}");
                self.cancel_best_effort(&draft.notification_ids).await;
                return Err(EditError::StoreFailure(err));
            }
        };

        let previous_ids = self.state.previous_notification_ids().to_vec();
        self.cancel_best_effort(&previous_ids).await;

        info!(
            "event=habit_save module=editor status=ok mode={mode} notifications={} warning={}",
            habit.notification_ids.len(),
            warning.is_some()
        );
        self.state = EditState::default();
        Ok(CommitOutcome { habit, warning })
    }

    /// Deletes the habit being edited and withdraws its reminders.
    ///
    /// # Errors
    /// - `NotEditingExisting` when the session creates a new habit; nothing
    ///   is attempted.
    /// - `StoreFailure` when the delete fails; reminders stay scheduled and
    ///   the state is kept.
    pub async fn delete(&mut self) -> Result<(), EditError> {
        let id = self
            .state
            .editing_id()
            .ok_or(EditError::NotEditingExisting)?;
        let _guard = InFlightGuard::acquire(&self.in_flight)?;
        info!("event=habit_delete module=editor status=start");

        if let Err(err) = self.store.delete(id) {
            error!("event=habit_delete module=editor status=error error={err}");
            return Err(EditError::StoreFailure(err));
        }

        let previous_ids = self.state.previous_notification_ids().to_vec();
        self.cancel_best_effort(&previous_ids).await;

        info!(
            "event=habit_delete module=editor status=ok cancelled={}",
            previous_ids.len()
        );
        self.state = EditState::default();
        Ok(())
    }

    async fn cancel_best_effort(&self, ids: &[NotificationId]) {
        if ids.is_empty() {
            return;
        }
        if let Err(err) = self.scheduler.cancel(ids).await {
            warn!(
                "event=reminder_cancel module=editor status=error count={} error={err}",
                ids.len()
            );
        }
    }
}

/// Marks a commit as running until dropped, including when the commit
/// future is dropped before completion.
struct InFlightGuard {
    flag: Arc<AtomicBool>,
}

impl InFlightGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Result<Self, EditError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| EditError::CommitInFlight)?;
        Ok(Self {
            flag: Arc::clone(flag),
        })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

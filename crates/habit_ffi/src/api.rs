//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose habit listing, the habit edit session and completion toggling to
//!   Dart via FRB.
//! - Keep one process-wide `HabitEditor` parked between calls.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Every edit goes through `HabitEditor`; this layer only parses input.
//! - Store failures and reminder warnings are reported in separate fields.
//! - The session lock is not held while a commit runs.

use crate::entry::{open_entry_db, EntryHabitStore, EntryScheduler};
use chrono::{Local, NaiveDate, Timelike};
use habit_core::{
    core_version as core_version_inner, init_logging as init_logging_inner,
    parse_notification_access, ping as ping_inner, reminder_time, CommitOutcome, EditError,
    Habit, HabitColor, HabitEditor, HabitId, HabitService, HabitStore, SqliteCompletionStore,
    SqliteHabitStore, SqliteNotificationScheduler, WeekProgress, Weekday,
};
use log::warn;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

const DAY_FORMAT: &str = "%Y-%m-%d";
const FIRE_AT_FORMAT: &str = "%Y-%m-%dT%H:%M";
static SESSION: OnceLock<Mutex<EditSession>> = OnceLock::new();

type SessionEditor = HabitEditor<EntryHabitStore, EntryScheduler>;

struct EditSession {
    editor: SessionEditor,
    commit_flag: Arc<AtomicBool>,
}

impl EditSession {
    fn new() -> Self {
        let commit_flag = Arc::new(AtomicBool::new(false));
        let editor = HabitEditor::new(EntryHabitStore, EntryScheduler::default())
            .with_commit_flag(Arc::clone(&commit_flag));
        Self {
            editor,
            commit_flag,
        }
    }
}

/// Minimal health-check API for FRB smoke integration.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Habit card data for list rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HabitItem {
    pub habit_id: String,
    pub title: String,
    /// Theme color id (`Card-1`..`Card-7`).
    pub color: String,
    /// Weekday symbols in calendar order.
    pub weekdays: Vec<String>,
    pub reminder_enabled: bool,
    /// `HH:MM`, 24h clock.
    pub reminder_time: String,
    pub reminder_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HabitListResponse {
    pub items: Vec<HabitItem>,
    pub message: String,
}

/// Read model of the edit session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorSnapshot {
    pub title: String,
    pub color: String,
    pub weekdays: Vec<String>,
    pub reminder_enabled: bool,
    pub reminder_hour: u32,
    pub reminder_minute: u32,
    pub reminder_text: String,
    pub show_time_picker: bool,
    /// `Some` when editing an existing habit (shows the delete action).
    pub editing_habit_id: Option<String>,
    /// Whether reminder controls should be shown.
    pub notification_access: bool,
    pub is_complete: bool,
    /// Save action enabled: complete and no commit running.
    pub can_save: bool,
}

/// Response envelope for edit-session calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorResponse {
    /// Whether the call succeeded.
    pub ok: bool,
    /// Committed habit id after a successful save.
    pub habit_id: Option<String>,
    /// Non-fatal reminder problem; the habit was still saved.
    pub warning: Option<String>,
    pub message: String,
    pub snapshot: EditorSnapshot,
}

/// Generic action response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionResponse {
    pub ok: bool,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayStatusItem {
    /// `YYYY-MM-DD`.
    pub date: String,
    pub weekday: String,
    pub scheduled: bool,
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeekProgressResponse {
    pub ok: bool,
    pub days: Vec<DayStatusItem>,
    pub completed_count: u32,
    pub scheduled_count: u32,
    pub message: String,
}

/// Reminder the platform shell should mirror into the OS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingNotificationItem {
    pub notification_id: String,
    pub title: String,
    pub body: String,
    /// 1 = Sunday .. 7 = Saturday.
    pub weekday: u32,
    pub hour: u32,
    pub minute: u32,
    /// Next local firing as `YYYY-MM-DDTHH:MM`, if any.
    pub next_fire_at: Option<String>,
}

/// Lists stored habits in creation order.
#[flutter_rust_bridge::frb(sync)]
pub fn habit_list() -> HabitListResponse {
    let result = EntryHabitStore.list().map_err(|err| err.to_string());
    match result {
        Ok(habits) => HabitListResponse {
            message: format!("Found {} habit(s).", habits.len()),
            items: habits.iter().map(to_habit_item).collect(),
        },
        Err(err) => HabitListResponse {
            items: Vec::new(),
            message: format!("habit_list failed: {err}"),
        },
    }
}

/// Starts a fresh session for a new habit.
#[flutter_rust_bridge::frb(sync)]
pub fn editor_new() -> EditorResponse {
    mutate_session(|editor| {
        editor.reset();
        Ok(())
    })
}

/// Starts a session editing an existing habit.
#[flutter_rust_bridge::frb(sync)]
pub fn editor_load(habit_id: String) -> EditorResponse {
    let loaded = parse_habit_id(&habit_id).and_then(|id| {
        let habit = EntryHabitStore.get(id).map_err(|err| err.to_string())?;
        habit.ok_or_else(|| format!("habit not found: {id}"))
    });
    match loaded {
        Ok(habit) => mutate_session(|editor| {
            editor.begin_edit(habit);
            Ok(())
        }),
        Err(err) => failure_response(format!("editor_load failed: {err}")),
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn editor_state() -> EditorResponse {
    mutate_session(|_| Ok(()))
}

#[flutter_rust_bridge::frb(sync)]
pub fn editor_set_title(title: String) -> EditorResponse {
    mutate_session(|editor| {
        editor.set_title(title);
        Ok(())
    })
}

#[flutter_rust_bridge::frb(sync)]
pub fn editor_set_color(color: String) -> EditorResponse {
    mutate_session(|editor| {
        let color =
            HabitColor::parse(&color).ok_or_else(|| format!("unknown color: `{color}`"))?;
        editor.set_color(color);
        Ok(())
    })
}

/// Toggles a weekday by calendar symbol (`Monday`, ...).
#[flutter_rust_bridge::frb(sync)]
pub fn editor_toggle_weekday(weekday: String) -> EditorResponse {
    mutate_session(|editor| {
        editor
            .toggle_weekday_symbol(&weekday)
            .map_err(|err| err.to_string())
    })
}

#[flutter_rust_bridge::frb(sync)]
pub fn editor_set_reminder_enabled(enabled: bool) -> EditorResponse {
    mutate_session(|editor| {
        editor.set_reminder_enabled(enabled);
        Ok(())
    })
}

#[flutter_rust_bridge::frb(sync)]
pub fn editor_set_reminder_time(hour: u32, minute: u32) -> EditorResponse {
    mutate_session(|editor| {
        let time = reminder_time(hour, minute)
            .ok_or_else(|| format!("invalid reminder time {hour}:{minute}"))?;
        editor.set_reminder_time(time);
        Ok(())
    })
}

#[flutter_rust_bridge::frb(sync)]
pub fn editor_set_reminder_text(text: String) -> EditorResponse {
    mutate_session(|editor| {
        editor.set_reminder_text(text);
        Ok(())
    })
}

#[flutter_rust_bridge::frb(sync)]
pub fn editor_toggle_time_picker() -> EditorResponse {
    mutate_session(|editor| {
        editor.toggle_time_picker();
        Ok(())
    })
}

/// Records the OS notification permission (`granted|denied|not_determined`).
#[flutter_rust_bridge::frb(sync)]
pub fn editor_set_notification_access(access: String) -> EditorResponse {
    mutate_session(|editor| {
        let access = parse_notification_access(&access).map_err(|err| err.to_string())?;
        editor.set_notification_access(access);
        Ok(())
    })
}

/// Commits the session.
///
/// # FFI contract
/// - `ok=false` with the session kept when the habit is incomplete, another
///   commit is running, or the store write fails.
/// - `ok=true` with `warning` set when the habit was saved but its reminder
///   could not be scheduled.
#[flutter_rust_bridge::frb(sync)]
pub fn editor_save() -> EditorResponse {
    match run_commit(Commit::Save) {
        Ok(Some(outcome)) => {
            let mut response = success_response("Habit saved.");
            response.habit_id = Some(outcome.habit.id.to_string());
            response.warning = outcome.warning.map(|warning| warning.to_string());
            response
        }
        Ok(None) => success_response("Habit saved."),
        Err(err) => failure_response(format!("editor_save failed: {err}")),
    }
}

/// Deletes the habit being edited.
#[flutter_rust_bridge::frb(sync)]
pub fn editor_delete() -> EditorResponse {
    match run_commit(Commit::Delete) {
        Ok(_) => success_response("Habit deleted."),
        Err(err) => failure_response(format!("editor_delete failed: {err}")),
    }
}

/// Flips completion of a habit on `date` (`YYYY-MM-DD`).
#[flutter_rust_bridge::frb(sync)]
pub fn habit_toggle_completion(habit_id: String, date: String) -> ActionResponse {
    let result = parse_habit_id(&habit_id).and_then(|id| {
        let day = parse_day(&date)?;
        let conn = open_entry_db().map_err(|err| format!("habit DB open failed: {err}"))?;
        let habits = SqliteHabitStore::new(&conn);
        let completions = SqliteCompletionStore::new(&conn);
        let service = HabitService::new(&habits, &completions);
        service
            .toggle_completion(id, day)
            .map_err(|err| err.to_string())
    });
    match result {
        Ok(true) => ActionResponse {
            ok: true,
            message: "Marked done.".to_string(),
        },
        Ok(false) => ActionResponse {
            ok: true,
            message: "Marked not done.".to_string(),
        },
        Err(err) => ActionResponse {
            ok: false,
            message: format!("habit_toggle_completion failed: {err}"),
        },
    }
}

/// Sunday-to-Saturday completion state of the week containing `date`.
#[flutter_rust_bridge::frb(sync)]
pub fn habit_week_progress(habit_id: String, date: String) -> WeekProgressResponse {
    let result = parse_habit_id(&habit_id).and_then(|id| {
        let day = parse_day(&date)?;
        let conn = open_entry_db().map_err(|err| format!("habit DB open failed: {err}"))?;
        let habits = SqliteHabitStore::new(&conn);
        let completions = SqliteCompletionStore::new(&conn);
        let service = HabitService::new(&habits, &completions);
        service.week_progress(id, day).map_err(|err| err.to_string())
    });
    match result {
        Ok(week) => to_week_response(&week),
        Err(err) => WeekProgressResponse {
            ok: false,
            days: Vec::new(),
            completed_count: 0,
            scheduled_count: 0,
            message: format!("habit_week_progress failed: {err}"),
        },
    }
}

/// Lists reminders the platform shell should have scheduled.
#[flutter_rust_bridge::frb(sync)]
pub fn notifications_pending() -> Vec<PendingNotificationItem> {
    let access = lock_session().editor.notification_access();
    let result = open_entry_db()
        .map_err(|err| err.to_string())
        .and_then(|conn| {
            let outbox = SqliteNotificationScheduler::new(&conn, access);
            outbox.pending().map_err(|err| err.to_string())
        });
    let now = Local::now().naive_local();
    match result {
        Ok(pending) => pending
            .into_iter()
            .map(|item| PendingNotificationItem {
                next_fire_at: item
                    .trigger
                    .next_fire_after(now)
                    .map(|at| at.format(FIRE_AT_FORMAT).to_string()),
                notification_id: item.id,
                title: item.title,
                body: item.body,
                weekday: u32::from(item.trigger.weekday.calendar_number()),
                hour: item.trigger.hour,
                minute: item.trigger.minute,
            })
            .collect(),
        Err(err) => {
            warn!("event=notifications_pending module=ffi status=error error={err}");
            Vec::new()
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Commit {
    Save,
    Delete,
}

/// Runs `save`/`delete` on a copy of the parked editor.
///
/// The session lock is released while the commit runs; the shared commit
/// flag makes a concurrent commit fail with `CommitInFlight`. On success the
/// parked editor restarts fresh unless it was switched to another habit in
/// the meantime; on failure it is left as it was.
fn run_commit(commit: Commit) -> Result<Option<CommitOutcome>, String> {
    let mut editor = {
        let session = lock_session();
        let parked = &session.editor;
        let access = parked.notification_access();
        let mut editor = HabitEditor::with_state(
            EntryHabitStore,
            EntryScheduler::new(access),
            parked.state().clone(),
        )
        .with_commit_flag(Arc::clone(&session.commit_flag));
        editor.set_notification_access(access);
        editor
    };
    let committed_target = editor.state().editing_id();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .map_err(|err| format!("runtime init failed: {err}"))?;
    let result: Result<Option<CommitOutcome>, EditError> = runtime.block_on(async {
        match commit {
            Commit::Save => editor.save().await.map(Some),
            Commit::Delete => editor.delete().await.map(|()| None),
        }
    });
    let value = result.map_err(|err| err.to_string())?;

    reset_if_same_target(&mut lock_session().editor, committed_target);
    Ok(value)
}

/// Resets `editor` unless it now targets a different habit than the commit.
fn reset_if_same_target(editor: &mut SessionEditor, committed_target: Option<HabitId>) {
    if editor.state().editing_id() == committed_target {
        editor.reset();
    }
}

fn mutate_session(f: impl FnOnce(&mut SessionEditor) -> Result<(), String>) -> EditorResponse {
    let mut session = lock_session();
    let result = f(&mut session.editor);
    let snapshot = to_snapshot(&session.editor);
    match result {
        Ok(()) => EditorResponse {
            ok: true,
            habit_id: None,
            warning: None,
            message: String::new(),
            snapshot,
        },
        Err(message) => EditorResponse {
            ok: false,
            habit_id: None,
            warning: None,
            message,
            snapshot,
        },
    }
}

fn success_response(message: &str) -> EditorResponse {
    let mut response = mutate_session(|_| Ok(()));
    response.message = message.to_string();
    response
}

fn failure_response(message: String) -> EditorResponse {
    mutate_session(|_| Err(message))
}

fn lock_session() -> MutexGuard<'static, EditSession> {
    let session = SESSION.get_or_init(|| Mutex::new(EditSession::new()));
    // A poisoned lock still holds a usable edit state.
    session.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn to_snapshot(editor: &SessionEditor) -> EditorSnapshot {
    let state = editor.state();
    EditorSnapshot {
        title: state.title.clone(),
        color: state.color.as_str().to_string(),
        weekdays: weekday_symbols(state.weekdays.iter()),
        reminder_enabled: state.reminder_enabled,
        reminder_hour: state.reminder_time.hour(),
        reminder_minute: state.reminder_time.minute(),
        reminder_text: state.reminder_text.clone(),
        show_time_picker: state.show_time_picker,
        editing_habit_id: state.editing_id().map(|id| id.to_string()),
        notification_access: editor.notification_access().allows_reminders(),
        is_complete: editor.is_complete(),
        can_save: editor.can_save(),
    }
}

fn to_habit_item(habit: &Habit) -> HabitItem {
    HabitItem {
        habit_id: habit.id.to_string(),
        title: habit.title.clone(),
        color: habit.color.as_str().to_string(),
        weekdays: weekday_symbols(habit.weekdays.iter()),
        reminder_enabled: habit.reminder_enabled,
        reminder_time: habit.reminder_time.format("%H:%M").to_string(),
        reminder_text: habit.reminder_text.clone(),
    }
}

fn to_week_response(week: &WeekProgress) -> WeekProgressResponse {
    WeekProgressResponse {
        ok: true,
        days: week
            .days
            .iter()
            .map(|day| DayStatusItem {
                date: day.date.format(DAY_FORMAT).to_string(),
                weekday: day.weekday.symbol().to_string(),
                scheduled: day.scheduled,
                completed: day.completed,
            })
            .collect(),
        completed_count: week.completed_count() as u32,
        scheduled_count: week.scheduled_count() as u32,
        message: String::new(),
    }
}

fn weekday_symbols(days: impl Iterator<Item = Weekday>) -> Vec<String> {
    days.map(|day| day.symbol().to_string()).collect()
}

fn parse_habit_id(value: &str) -> Result<HabitId, String> {
    HabitId::parse_str(value.trim()).map_err(|_| format!("invalid habit id: `{value}`"))
}

fn parse_day(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value.trim(), DAY_FORMAT)
        .map_err(|_| format!("invalid date `{value}`; expected YYYY-MM-DD"))
}

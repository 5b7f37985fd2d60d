use habit_core::db::open_db_in_memory;
use habit_core::{
    reminder_time, EditError, Habit, HabitColor, HabitDraft, HabitEditor, HabitId, HabitStore,
    NotificationAccess, NotificationId, NotificationScheduler, ReminderRequest, SchedulerError,
    SqliteHabitStore, SqliteNotificationScheduler, StoreError, StoreResult, Weekday, WeekdaySet,
};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
enum StoreCall {
    Create,
    Update(HabitId),
    Delete(HabitId),
}

#[derive(Default)]
struct RecordingStore {
    habits: RefCell<BTreeMap<HabitId, Habit>>,
    calls: RefCell<Vec<StoreCall>>,
    fail_writes: Cell<bool>,
}

impl RecordingStore {
    fn seed(&self, draft: HabitDraft) -> Habit {
        let habit = Habit::from_draft(Uuid::new_v4(), 1, draft);
        self.habits.borrow_mut().insert(habit.id, habit.clone());
        habit
    }

    fn calls(&self) -> Vec<StoreCall> {
        self.calls.borrow().clone()
    }

    fn failure(&self) -> StoreError {
        StoreError::InvalidData("simulated write failure".to_string())
    }
}

impl HabitStore for RecordingStore {
    fn create(&self, draft: &HabitDraft) -> StoreResult<Habit> {
        self.calls.borrow_mut().push(StoreCall::Create);
        if self.fail_writes.get() {
            return Err(self.failure());
        }
        draft.validate()?;
        let habit = Habit::from_draft(Uuid::new_v4(), 1, draft.clone());
        self.habits.borrow_mut().insert(habit.id, habit.clone());
        Ok(habit)
    }

    fn update(&self, id: HabitId, draft: &HabitDraft) -> StoreResult<Habit> {
        self.calls.borrow_mut().push(StoreCall::Update(id));
        if self.fail_writes.get() {
            return Err(self.failure());
        }
        draft.validate()?;
        let mut habits = self.habits.borrow_mut();
        let created_at = habits.get(&id).ok_or(StoreError::NotFound(id))?.created_at;
        let habit = Habit::from_draft(id, created_at, draft.clone());
        habits.insert(id, habit.clone());
        Ok(habit)
    }

    fn delete(&self, id: HabitId) -> StoreResult<()> {
        self.calls.borrow_mut().push(StoreCall::Delete(id));
        if self.fail_writes.get() {
            return Err(self.failure());
        }
        self.habits
            .borrow_mut()
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound(id))
    }

    fn get(&self, id: HabitId) -> StoreResult<Option<Habit>> {
        Ok(self.habits.borrow().get(&id).cloned())
    }

    fn list(&self) -> StoreResult<Vec<Habit>> {
        Ok(self.habits.borrow().values().cloned().collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum SchedulerCall {
    Schedule(ReminderRequest),
    Cancel(Vec<NotificationId>),
}

#[derive(Default)]
struct RecordingScheduler {
    calls: RefCell<Vec<SchedulerCall>>,
    fail_schedule: Cell<bool>,
    fail_cancel: Cell<bool>,
    issued: Cell<u32>,
}

impl RecordingScheduler {
    fn calls(&self) -> Vec<SchedulerCall> {
        self.calls.borrow().clone()
    }
}

impl NotificationScheduler for RecordingScheduler {
    async fn schedule(
        &self,
        request: &ReminderRequest,
    ) -> Result<Vec<NotificationId>, SchedulerError> {
        self.calls
            .borrow_mut()
            .push(SchedulerCall::Schedule(request.clone()));
        if self.fail_schedule.get() {
            return Err(SchedulerError::Backend("simulated".to_string()));
        }
        Ok(request
            .weekdays
            .iter()
            .map(|_| {
                let next = self.issued.get() + 1;
                self.issued.set(next);
                format!("notif-{next}")
            })
            .collect())
    }

    async fn cancel(&self, ids: &[NotificationId]) -> Result<(), SchedulerError> {
        self.calls
            .borrow_mut()
            .push(SchedulerCall::Cancel(ids.to_vec()));
        if self.fail_cancel.get() {
            return Err(SchedulerError::Backend("simulated".to_string()));
        }
        Ok(())
    }
}

fn days(values: &[Weekday]) -> WeekdaySet {
    values.iter().copied().collect()
}

fn reminder_draft(title: &str, ids: &[&str]) -> HabitDraft {
    HabitDraft {
        title: title.to_string(),
        weekdays: days(&[Weekday::Monday, Weekday::Thursday]),
        reminder_enabled: true,
        reminder_time: reminder_time(6, 45).unwrap(),
        reminder_text: "Go".to_string(),
        notification_ids: ids.iter().map(|id| id.to_string()).collect(),
        ..HabitDraft::default()
    }
}

#[test]
fn is_complete_matches_rule_for_all_combinations() {
    let store = RecordingStore::default();
    let scheduler = RecordingScheduler::default();

    for mask in 0..16u8 {
        let has_title = mask & 1 != 0;
        let has_days = mask & 2 != 0;
        let reminder = mask & 4 != 0;
        let has_text = mask & 8 != 0;

        let mut editor = HabitEditor::new(&store, &scheduler);
        editor.set_title(if has_title { "Habit" } else { "" });
        if has_days {
            editor.toggle_weekday(Weekday::Monday);
        }
        editor.set_reminder_enabled(reminder);
        editor.set_reminder_text(if has_text { "text" } else { "" });

        let expected = has_title && has_days && (!reminder || has_text);
        assert_eq!(editor.is_complete(), expected, "mask={mask:04b}");
        assert_eq!(editor.can_save(), expected, "mask={mask:04b}");
    }

    assert!(store.calls().is_empty());
    assert!(scheduler.calls().is_empty());
}

#[test]
fn completeness_is_recomputed_after_each_mutation() {
    let store = RecordingStore::default();
    let scheduler = RecordingScheduler::default();
    let mut editor = HabitEditor::new(&store, &scheduler);

    editor.set_title("Run");
    editor.toggle_weekday(Weekday::Tuesday);
    assert!(editor.is_complete());

    editor.set_reminder_enabled(true);
    assert!(!editor.is_complete());

    editor.set_reminder_text("Shoes on");
    assert!(editor.is_complete());

    editor.toggle_weekday(Weekday::Tuesday);
    assert!(!editor.is_complete());
}

#[test]
fn toggling_a_weekday_twice_restores_the_set() {
    let store = RecordingStore::default();
    let scheduler = RecordingScheduler::default();
    let mut editor = HabitEditor::new(&store, &scheduler);
    editor.toggle_weekday(Weekday::Monday);
    editor.toggle_weekday(Weekday::Saturday);
    let before = editor.state().weekdays.clone();

    for day in Weekday::ALL {
        editor.toggle_weekday(day);
        editor.toggle_weekday(day);
        assert_eq!(editor.state().weekdays, before, "day={day}");
    }
}

#[test]
fn unknown_weekday_symbol_is_rejected_without_change() {
    let store = RecordingStore::default();
    let scheduler = RecordingScheduler::default();
    let mut editor = HabitEditor::new(&store, &scheduler);

    editor.toggle_weekday_symbol("Friday").unwrap();
    let err = editor.toggle_weekday_symbol("Fri").unwrap_err();
    assert!(matches!(err, EditError::UnknownWeekday(value) if value == "Fri"));
    assert_eq!(editor.state().weekdays.symbols(), vec!["Friday"]);
}

#[test]
fn time_picker_flag_and_access_state_are_presentation_only() {
    let store = RecordingStore::default();
    let scheduler = RecordingScheduler::default();
    let mut editor = HabitEditor::new(&store, &scheduler);

    editor.toggle_time_picker();
    assert!(editor.state().show_time_picker);
    editor.toggle_time_picker();
    assert!(!editor.state().show_time_picker);

    assert_eq!(editor.notification_access(), NotificationAccess::NotDetermined);
    editor.set_notification_access(NotificationAccess::Denied);
    assert_eq!(editor.notification_access(), NotificationAccess::Denied);

    editor.set_reminder_time(reminder_time(8, 5).unwrap());
    assert_eq!(editor.state().reminder_time, reminder_time(8, 5).unwrap());
}

#[tokio::test]
async fn save_on_incomplete_state_has_no_side_effects() {
    let store = RecordingStore::default();
    let scheduler = RecordingScheduler::default();
    let mut editor = HabitEditor::new(&store, &scheduler);
    editor.set_title("");
    editor.toggle_weekday(Weekday::Monday);
    assert!(!editor.is_complete());

    let err = editor.save().await.unwrap_err();
    assert!(matches!(err, EditError::Incomplete));
    assert!(store.calls().is_empty());
    assert!(scheduler.calls().is_empty());
    assert_eq!(editor.state().weekdays.symbols(), vec!["Monday"]);
}

#[tokio::test]
async fn enabled_reminder_with_empty_text_blocks_save() {
    let store = RecordingStore::default();
    let scheduler = RecordingScheduler::default();
    let mut editor = HabitEditor::new(&store, &scheduler);
    editor.set_title("Water plants");
    editor.set_color(HabitColor::Card6);
    editor.toggle_weekday(Weekday::Sunday);
    editor.set_reminder_enabled(true);
    editor.set_reminder_text("");

    assert!(!editor.is_complete());
    assert!(matches!(editor.save().await, Err(EditError::Incomplete)));
    assert!(store.calls().is_empty());
    assert!(scheduler.calls().is_empty());
}

#[tokio::test]
async fn delete_without_existing_habit_fails_without_calls() {
    let store = RecordingStore::default();
    let scheduler = RecordingScheduler::default();
    let mut editor = HabitEditor::new(&store, &scheduler);
    editor.set_title("Unsaved");

    let err = editor.delete().await.unwrap_err();
    assert!(matches!(err, EditError::NotEditingExisting));
    assert!(store.calls().is_empty());
    assert!(scheduler.calls().is_empty());
    assert_eq!(editor.state().title, "Unsaved");
}

#[tokio::test]
async fn saving_new_habit_without_reminder_creates_it() {
    let store = RecordingStore::default();
    let scheduler = RecordingScheduler::default();
    let mut editor = HabitEditor::new(&store, &scheduler);
    editor.set_title("Drink Water");
    editor.set_color(HabitColor::parse("Card-3").unwrap());
    for day in ["Monday", "Wednesday", "Friday"] {
        editor.toggle_weekday_symbol(day).unwrap();
    }
    editor.set_reminder_enabled(false);
    assert!(editor.is_complete());

    let outcome = editor.save().await.unwrap();
    let habit = outcome.habit;
    assert!(outcome.warning.is_none());
    assert_eq!(habit.title, "Drink Water");
    assert_eq!(habit.color, HabitColor::Card3);
    assert_eq!(
        habit.weekdays.symbols(),
        vec!["Monday", "Wednesday", "Friday"]
    );
    assert!(!habit.reminder_enabled);
    assert!(habit.notification_ids.is_empty());

    assert_eq!(store.calls(), vec![StoreCall::Create]);
    assert!(scheduler.calls().is_empty());
    assert_eq!(store.get(habit.id).unwrap(), Some(habit));
    assert!(!editor.state().is_editing_existing());
    assert!(editor.state().title.is_empty());
}

#[tokio::test]
async fn saving_new_habit_with_reminder_stores_notification_ids() {
    let store = RecordingStore::default();
    let scheduler = RecordingScheduler::default();
    let mut editor = HabitEditor::new(&store, &scheduler);
    editor.set_title("Stretch");
    editor.toggle_weekday(Weekday::Friday);
    editor.toggle_weekday(Weekday::Tuesday);
    editor.set_reminder_enabled(true);
    editor.set_reminder_time(reminder_time(18, 30).unwrap());
    editor.set_reminder_text("Time to stretch");

    let outcome = editor.save().await.unwrap();
    assert!(outcome.warning.is_none());
    assert_eq!(
        outcome.habit.notification_ids,
        vec!["notif-1".to_string(), "notif-2".to_string()]
    );

    assert_eq!(
        scheduler.calls(),
        vec![SchedulerCall::Schedule(ReminderRequest {
            habit_title: "Stretch".to_string(),
            body: "Time to stretch".to_string(),
            weekdays: days(&[Weekday::Tuesday, Weekday::Friday]),
            time: reminder_time(18, 30).unwrap(),
        })]
    );
}

#[tokio::test]
async fn turning_reminder_off_cancels_previous_notifications() {
    let store = RecordingStore::default();
    let scheduler = RecordingScheduler::default();
    let existing = store.seed(reminder_draft("Pushups", &["old-1", "old-2"]));

    let mut editor = HabitEditor::new(&store, &scheduler);
    editor.begin_edit(existing.clone());
    editor.set_reminder_enabled(false);

    let outcome = editor.save().await.unwrap();
    assert_eq!(outcome.habit.id, existing.id);
    assert!(!outcome.habit.reminder_enabled);
    assert!(outcome.habit.notification_ids.is_empty());

    assert_eq!(store.calls(), vec![StoreCall::Update(existing.id)]);
    assert_eq!(
        scheduler.calls(),
        vec![SchedulerCall::Cancel(vec![
            "old-1".to_string(),
            "old-2".to_string()
        ])]
    );
    let stored = store.get(existing.id).unwrap().unwrap();
    assert!(stored.notification_ids.is_empty());
}

#[tokio::test]
async fn editing_with_reminder_reschedules_and_cancels_old_ids() {
    let store = RecordingStore::default();
    let scheduler = RecordingScheduler::default();
    let existing = store.seed(reminder_draft("Pushups", &["old-1", "old-2"]));

    let mut editor = HabitEditor::new(&store, &scheduler);
    editor.begin_edit(existing.clone());
    editor.toggle_weekday(Weekday::Saturday);

    let outcome = editor.save().await.unwrap();
    assert_eq!(outcome.habit.notification_ids.len(), 3);

    let calls = scheduler.calls();
    assert_eq!(calls.len(), 2);
    assert!(matches!(&calls[0], SchedulerCall::Schedule(request) if request.weekdays.len() == 3));
    assert_eq!(
        calls[1],
        SchedulerCall::Cancel(vec!["old-1".to_string(), "old-2".to_string()])
    );
}

#[tokio::test]
async fn scheduler_failure_is_a_warning_and_habit_still_saves() {
    let store = RecordingStore::default();
    let scheduler = RecordingScheduler::default();
    scheduler.fail_schedule.set(true);

    let mut editor = HabitEditor::new(&store, &scheduler);
    editor.set_title("Floss");
    editor.toggle_weekday(Weekday::Monday);
    editor.set_reminder_enabled(true);
    editor.set_reminder_text("Floss tonight");

    let outcome = editor.save().await.unwrap();
    let warning = outcome.warning.expect("scheduling failure should be reported");
    assert_eq!(warning.0, SchedulerError::Backend("simulated".to_string()));
    assert!(outcome.habit.reminder_enabled);
    assert_eq!(outcome.habit.reminder_text, "Floss tonight");
    assert!(outcome.habit.notification_ids.is_empty());
    assert_eq!(store.calls(), vec![StoreCall::Create]);
}

#[tokio::test]
async fn store_failure_keeps_state_and_withdraws_new_reminders() {
    let store = RecordingStore::default();
    let scheduler = RecordingScheduler::default();
    let existing = store.seed(reminder_draft("Journal", &["old-1"]));
    store.fail_writes.set(true);

    let mut editor = HabitEditor::new(&store, &scheduler);
    editor.begin_edit(existing.clone());
    editor.set_title("Journal daily");
    let before = editor.state().clone();

    let err = editor.save().await.unwrap_err();
    assert!(matches!(err, EditError::StoreFailure(_)));
    assert_eq!(editor.state(), &before);
    assert!(!editor.commit_in_flight());

    let calls = scheduler.calls();
    assert_eq!(calls.len(), 2);
    assert!(matches!(&calls[0], SchedulerCall::Schedule(_)));
    assert_eq!(
        calls[1],
        SchedulerCall::Cancel(vec!["notif-1".to_string(), "notif-2".to_string()])
    );

    store.fail_writes.set(false);
    let outcome = editor.save().await.unwrap();
    assert_eq!(outcome.habit.title, "Journal daily");
}

#[tokio::test]
async fn cancel_failure_does_not_fail_the_save() {
    let store = RecordingStore::default();
    let scheduler = RecordingScheduler::default();
    scheduler.fail_cancel.set(true);
    let existing = store.seed(reminder_draft("Walk", &["old-1"]));

    let mut editor = HabitEditor::new(&store, &scheduler);
    editor.begin_edit(existing);
    editor.set_reminder_enabled(false);

    let outcome = editor.save().await.unwrap();
    assert!(outcome.warning.is_none());
    assert!(outcome.habit.notification_ids.is_empty());
}

#[tokio::test]
async fn delete_removes_habit_then_cancels_reminders() {
    let store = RecordingStore::default();
    let scheduler = RecordingScheduler::default();
    let existing = store.seed(reminder_draft("Yoga", &["old-1", "old-2"]));

    let mut editor = HabitEditor::new(&store, &scheduler);
    editor.begin_edit(existing.clone());
    editor.delete().await.unwrap();

    assert_eq!(store.calls(), vec![StoreCall::Delete(existing.id)]);
    assert_eq!(
        scheduler.calls(),
        vec![SchedulerCall::Cancel(vec![
            "old-1".to_string(),
            "old-2".to_string()
        ])]
    );
    assert!(store.get(existing.id).unwrap().is_none());
    assert!(!editor.state().is_editing_existing());
}

#[tokio::test]
async fn delete_store_failure_is_surfaced_and_keeps_reminders() {
    let store = RecordingStore::default();
    let scheduler = RecordingScheduler::default();
    let existing = store.seed(reminder_draft("Yoga", &["old-1"]));
    store.fail_writes.set(true);

    let mut editor = HabitEditor::new(&store, &scheduler);
    editor.begin_edit(existing.clone());

    let err = editor.delete().await.unwrap_err();
    assert!(matches!(err, EditError::StoreFailure(_)));
    assert!(scheduler.calls().is_empty());
    assert_eq!(editor.state().editing_id(), Some(existing.id));
}

#[tokio::test]
async fn commit_in_flight_rejects_save_and_delete() {
    let store = RecordingStore::default();
    let scheduler = RecordingScheduler::default();
    let existing = store.seed(reminder_draft("Cook", &[]));
    let flag = Arc::new(AtomicBool::new(true));

    let mut editor =
        HabitEditor::new(&store, &scheduler).with_commit_flag(Arc::clone(&flag));
    editor.begin_edit(existing);
    assert!(editor.is_complete());
    assert!(!editor.can_save());

    assert!(matches!(editor.save().await, Err(EditError::CommitInFlight)));
    assert!(matches!(editor.delete().await, Err(EditError::CommitInFlight)));
    assert!(store.calls().is_empty());
    assert!(scheduler.calls().is_empty());

    flag.store(false, Ordering::Release);
    assert!(editor.can_save());
    editor.save().await.unwrap();
    assert!(!flag.load(Ordering::Acquire));
}

#[tokio::test]
async fn denied_access_still_saves_reminder_data_with_warning() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteHabitStore::new(&conn);
    let scheduler = SqliteNotificationScheduler::new(&conn, NotificationAccess::Denied);

    let mut editor = HabitEditor::new(&store, &scheduler);
    editor.set_notification_access(NotificationAccess::Denied);
    editor.set_title("Vitamins");
    editor.toggle_weekday(Weekday::Monday);
    editor.set_reminder_enabled(true);
    editor.set_reminder_text("Take vitamins");

    let outcome = editor.save().await.unwrap();
    let warning = outcome.warning.expect("permission failure should warn");
    assert_eq!(warning.0, SchedulerError::PermissionDenied);

    let stored = store.get(outcome.habit.id).unwrap().unwrap();
    assert!(stored.reminder_enabled);
    assert_eq!(stored.reminder_text, "Take vitamins");
    assert!(stored.notification_ids.is_empty());
    assert!(scheduler.pending().unwrap().is_empty());
}

#[tokio::test]
async fn sqlite_roundtrip_create_edit_delete() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteHabitStore::new(&conn);
    let scheduler = SqliteNotificationScheduler::new(&conn, NotificationAccess::Granted);
    let mut editor = HabitEditor::new(&store, &scheduler);

    editor.set_title("Read");
    editor.toggle_weekday(Weekday::Monday);
    editor.toggle_weekday(Weekday::Wednesday);
    editor.set_reminder_enabled(true);
    editor.set_reminder_text("Read a chapter");
    let created = editor.save().await.unwrap().habit;
    assert_eq!(created.notification_ids.len(), 2);
    assert_eq!(scheduler.pending().unwrap().len(), 2);

    editor.begin_edit(store.get(created.id).unwrap().unwrap());
    editor.set_reminder_enabled(false);
    let updated = editor.save().await.unwrap().habit;
    assert!(updated.notification_ids.is_empty());
    assert!(scheduler.pending().unwrap().is_empty());

    editor.begin_edit(updated);
    editor.delete().await.unwrap();
    assert!(store.list().unwrap().is_empty());
}

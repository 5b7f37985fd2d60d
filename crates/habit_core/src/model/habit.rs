//! Habit domain model.
//!
//! # Responsibility
//! - Define the canonical habit record owned by the entity store.
//! - Define the closed value sets used by habits (colors, weekdays).
//! - Provide the single validation rule shared by store and edit model.
//!
//! # Invariants
//! - `id` is stable and never reused for another habit.
//! - A persisted habit has a non-empty `title` and a non-empty `weekdays` set.
//! - `reminder_enabled == true` implies a non-empty `reminder_text`.
//! - `notification_ids` are only meaningful while `reminder_enabled` is set.

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for a habit.
pub type HabitId = Uuid;

/// Opaque identifier handed out by a notification scheduler.
pub type NotificationId = String;

/// Theme color assigned to a habit card.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HabitColor {
    #[default]
    #[serde(rename = "Card-1")]
    Card1,
    #[serde(rename = "Card-2")]
    Card2,
    #[serde(rename = "Card-3")]
    Card3,
    #[serde(rename = "Card-4")]
    Card4,
    #[serde(rename = "Card-5")]
    Card5,
    #[serde(rename = "Card-6")]
    Card6,
    #[serde(rename = "Card-7")]
    Card7,
}

impl HabitColor {
    /// All colors in picker order.
    pub const ALL: [HabitColor; 7] = [
        Self::Card1,
        Self::Card2,
        Self::Card3,
        Self::Card4,
        Self::Card5,
        Self::Card6,
        Self::Card7,
    ];

    /// Stable string id, also used as the theme asset name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Card1 => "Card-1",
            Self::Card2 => "Card-2",
            Self::Card3 => "Card-3",
            Self::Card4 => "Card-4",
            Self::Card5 => "Card-5",
            Self::Card6 => "Card-6",
            Self::Card7 => "Card-7",
        }
    }

    /// Parses a stable color id such as `Card-3`.
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|color| color.as_str() == value)
    }
}

impl Display for HabitColor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Calendar weekday symbol.
///
/// Declaration order is calendar order (Sunday first), so `Ord` and every
/// ordered collection of weekdays follow the presentation sequence.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Weekday {
    Sunday,
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
}

impl Weekday {
    /// Fixed calendar sequence used for presentation.
    pub const ALL: [Weekday; 7] = [
        Self::Sunday,
        Self::Monday,
        Self::Tuesday,
        Self::Wednesday,
        Self::Thursday,
        Self::Friday,
        Self::Saturday,
    ];

    /// Full weekday symbol, e.g. `Monday`.
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Sunday => "Sunday",
            Self::Monday => "Monday",
            Self::Tuesday => "Tuesday",
            Self::Wednesday => "Wednesday",
            Self::Thursday => "Thursday",
            Self::Friday => "Friday",
            Self::Saturday => "Saturday",
        }
    }

    /// Two-letter label shown on the frequency picker.
    pub fn short_label(self) -> &'static str {
        &self.symbol()[..2]
    }

    /// Parses a full weekday symbol. Unknown identifiers return `None`.
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|day| day.symbol() == value)
    }

    /// 1-based calendar number, Sunday = 1 .. Saturday = 7.
    pub fn calendar_number(self) -> u8 {
        self as u8 + 1
    }

    pub fn from_calendar_number(value: u8) -> Option<Self> {
        match value {
            1..=7 => Some(Self::ALL[usize::from(value - 1)]),
            _ => None,
        }
    }
}

impl From<chrono::Weekday> for Weekday {
    fn from(value: chrono::Weekday) -> Self {
        Self::ALL[value.num_days_from_sunday() as usize]
    }
}

impl From<Weekday> for chrono::Weekday {
    fn from(value: Weekday) -> Self {
        match value {
            Weekday::Sunday => chrono::Weekday::Sun,
            Weekday::Monday => chrono::Weekday::Mon,
            Weekday::Tuesday => chrono::Weekday::Tue,
            Weekday::Wednesday => chrono::Weekday::Wed,
            Weekday::Thursday => chrono::Weekday::Thu,
            Weekday::Friday => chrono::Weekday::Fri,
            Weekday::Saturday => chrono::Weekday::Sat,
        }
    }
}

impl Display for Weekday {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Set of weekdays a habit recurs on.
///
/// Membership carries no order; iteration always yields calendar order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeekdaySet(BTreeSet<Weekday>);

impl WeekdaySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, day: Weekday) -> bool {
        self.0.contains(&day)
    }

    pub fn insert(&mut self, day: Weekday) -> bool {
        self.0.insert(day)
    }

    pub fn remove(&mut self, day: Weekday) -> bool {
        self.0.remove(&day)
    }

    /// Removes `day` when present, adds it otherwise.
    ///
    /// Returns whether the day is selected after the toggle.
    pub fn toggle(&mut self, day: Weekday) -> bool {
        if self.0.remove(&day) {
            false
        } else {
            self.0.insert(day);
            true
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates selected days in calendar order.
    pub fn iter(&self) -> impl Iterator<Item = Weekday> + '_ {
        self.0.iter().copied()
    }

    pub fn symbols(&self) -> Vec<&'static str> {
        self.iter().map(Weekday::symbol).collect()
    }
}

impl FromIterator<Weekday> for WeekdaySet {
    fn from_iter<T: IntoIterator<Item = Weekday>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Default reminder time for new habits.
pub fn default_reminder_time() -> NaiveTime {
    NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN)
}

/// Builds a minute-precision reminder time. Out-of-range values return `None`.
pub fn reminder_time(hour: u32, minute: u32) -> Option<NaiveTime> {
    NaiveTime::from_hms_opt(hour, minute, 0)
}

/// Drops seconds and sub-second precision from a reminder time.
pub fn truncate_to_minute(time: NaiveTime) -> NaiveTime {
    reminder_time(time.hour(), time.minute()).unwrap_or(time)
}

/// Validation errors for habit field sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HabitValidationError {
    EmptyTitle,
    NoWeekdays,
    EmptyReminderText,
}

impl Display for HabitValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "habit title must not be empty"),
            Self::NoWeekdays => write!(f, "habit must recur on at least one weekday"),
            Self::EmptyReminderText => {
                write!(f, "reminder text must not be empty when reminders are enabled")
            }
        }
    }
}

impl Error for HabitValidationError {}

/// Field set written by entity store `create`/`update`.
///
/// Identity and creation time are owned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HabitDraft {
    pub title: String,
    pub color: HabitColor,
    pub weekdays: WeekdaySet,
    pub reminder_enabled: bool,
    pub reminder_time: NaiveTime,
    pub reminder_text: String,
    /// Ids of the reminders currently scheduled for this habit.
    pub notification_ids: Vec<NotificationId>,
}

impl Default for HabitDraft {
    fn default() -> Self {
        Self {
            title: String::new(),
            color: HabitColor::default(),
            weekdays: WeekdaySet::new(),
            reminder_enabled: false,
            reminder_time: default_reminder_time(),
            reminder_text: String::new(),
            notification_ids: Vec::new(),
        }
    }
}

impl HabitDraft {
    /// Checks the persisted-habit invariants.
    ///
    /// The first failing rule is reported, in field order.
    pub fn validate(&self) -> Result<(), HabitValidationError> {
        validate_fields(
            &self.title,
            &self.weekdays,
            self.reminder_enabled,
            &self.reminder_text,
        )
    }
}

/// Canonical habit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Habit {
    pub id: HabitId,
    pub title: String,
    pub color: HabitColor,
    pub weekdays: WeekdaySet,
    pub reminder_enabled: bool,
    pub reminder_time: NaiveTime,
    pub reminder_text: String,
    pub notification_ids: Vec<NotificationId>,
    /// Unix epoch milliseconds.
    pub created_at: i64,
}

impl Habit {
    /// Materializes a habit from a draft with store-assigned identity.
    pub fn from_draft(id: HabitId, created_at: i64, draft: HabitDraft) -> Self {
        Self {
            id,
            title: draft.title,
            color: draft.color,
            weekdays: draft.weekdays,
            reminder_enabled: draft.reminder_enabled,
            reminder_time: draft.reminder_time,
            reminder_text: draft.reminder_text,
            notification_ids: draft.notification_ids,
            created_at,
        }
    }

    /// Copies the editable fields back into a draft.
    pub fn to_draft(&self) -> HabitDraft {
        HabitDraft {
            title: self.title.clone(),
            color: self.color,
            weekdays: self.weekdays.clone(),
            reminder_enabled: self.reminder_enabled,
            reminder_time: self.reminder_time,
            reminder_text: self.reminder_text.clone(),
            notification_ids: self.notification_ids.clone(),
        }
    }

    pub fn validate(&self) -> Result<(), HabitValidationError> {
        validate_fields(
            &self.title,
            &self.weekdays,
            self.reminder_enabled,
            &self.reminder_text,
        )
    }

    /// Whether the habit is scheduled on `day`.
    pub fn recurs_on(&self, day: Weekday) -> bool {
        self.weekdays.contains(day)
    }
}

/// Shared completeness rule for drafts, habits and edit state.
pub(crate) fn validate_fields(
    title: &str,
    weekdays: &WeekdaySet,
    reminder_enabled: bool,
    reminder_text: &str,
) -> Result<(), HabitValidationError> {
    if title.is_empty() {
        return Err(HabitValidationError::EmptyTitle);
    }
    if weekdays.is_empty() {
        return Err(HabitValidationError::NoWeekdays);
    }
    if reminder_enabled && reminder_text.is_empty() {
        return Err(HabitValidationError::EmptyReminderText);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{HabitColor, HabitDraft, HabitValidationError, Weekday, WeekdaySet};

    #[test]
    fn color_ids_roundtrip_and_reject_unknown() {
        for color in HabitColor::ALL {
            assert_eq!(HabitColor::parse(color.as_str()), Some(color));
        }
        assert_eq!(HabitColor::parse("Card-8"), None);
        assert_eq!(HabitColor::parse("card-1"), None);
    }

    #[test]
    fn weekday_parse_rejects_unknown_symbols() {
        assert_eq!(Weekday::parse("Wednesday"), Some(Weekday::Wednesday));
        assert_eq!(Weekday::parse("Wed"), None);
        assert_eq!(Weekday::parse("Funday"), None);
    }

    #[test]
    fn weekday_calendar_numbers_start_at_sunday() {
        assert_eq!(Weekday::Sunday.calendar_number(), 1);
        assert_eq!(Weekday::Saturday.calendar_number(), 7);
        assert_eq!(Weekday::from_calendar_number(2), Some(Weekday::Monday));
        assert_eq!(Weekday::from_calendar_number(0), None);
        assert_eq!(Weekday::from_calendar_number(8), None);
        assert_eq!(Weekday::from(chrono::Weekday::Sun), Weekday::Sunday);
        assert_eq!(chrono::Weekday::from(Weekday::Friday), chrono::Weekday::Fri);
    }

    #[test]
    fn weekday_set_iterates_in_calendar_order() {
        let set: WeekdaySet = [Weekday::Friday, Weekday::Sunday, Weekday::Wednesday]
            .into_iter()
            .collect();
        assert_eq!(set.symbols(), vec!["Sunday", "Wednesday", "Friday"]);
        assert_eq!(Weekday::Thursday.short_label(), "Th");
    }

    #[test]
    fn validate_reports_first_broken_rule() {
        let mut draft = HabitDraft::default();
        assert_eq!(draft.validate(), Err(HabitValidationError::EmptyTitle));

        draft.title = "Read".to_string();
        assert_eq!(draft.validate(), Err(HabitValidationError::NoWeekdays));

        draft.weekdays.insert(Weekday::Monday);
        assert_eq!(draft.validate(), Ok(()));

        draft.reminder_enabled = true;
        assert_eq!(
            draft.validate(),
            Err(HabitValidationError::EmptyReminderText)
        );

        draft.reminder_text = "Time to read".to_string();
        assert_eq!(draft.validate(), Ok(()));
    }
}

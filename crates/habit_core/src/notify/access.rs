//! Notification permission state reported by the host platform.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Whether the platform lets the app post local notifications.
///
/// Presentation consults this to decide whether reminder controls are shown.
/// It never gates committing a habit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum NotificationAccess {
    Granted,
    Denied,
    /// The user has not answered the permission prompt yet.
    #[default]
    NotDetermined,
}

/// String value for granted access.
pub const NOTIFICATION_ACCESS_GRANTED: &str = "granted";
/// String value for denied access.
pub const NOTIFICATION_ACCESS_DENIED: &str = "denied";
/// String value for an unanswered permission prompt.
pub const NOTIFICATION_ACCESS_NOT_DETERMINED: &str = "not_determined";

impl NotificationAccess {
    /// Stable string id exchanged with the platform shell.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Granted => NOTIFICATION_ACCESS_GRANTED,
            Self::Denied => NOTIFICATION_ACCESS_DENIED,
            Self::NotDetermined => NOTIFICATION_ACCESS_NOT_DETERMINED,
        }
    }

    /// Reminder controls are exposed only with granted access.
    pub fn allows_reminders(self) -> bool {
        matches!(self, Self::Granted)
    }

    pub fn from_granted(granted: bool) -> Self {
        if granted {
            Self::Granted
        } else {
            Self::Denied
        }
    }
}

/// Parses one access value as reported by the platform shell.
pub fn parse_notification_access(
    value: &str,
) -> Result<NotificationAccess, NotificationAccessError> {
    let normalized = value.trim();
    if normalized.is_empty() {
        return Err(NotificationAccessError::Empty);
    }

    match normalized {
        NOTIFICATION_ACCESS_GRANTED => Ok(NotificationAccess::Granted),
        NOTIFICATION_ACCESS_DENIED => Ok(NotificationAccess::Denied),
        NOTIFICATION_ACCESS_NOT_DETERMINED => Ok(NotificationAccess::NotDetermined),
        other => Err(NotificationAccessError::Unsupported(other.to_string())),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationAccessError {
    Empty,
    Unsupported(String),
}

impl Display for NotificationAccessError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "notification access value must not be empty"),
            Self::Unsupported(value) => {
                write!(f, "notification access value is unsupported: {value}")
            }
        }
    }
}

impl Error for NotificationAccessError {}

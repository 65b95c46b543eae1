use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A per-user inbox entry.
///
/// Notifications are written by the database layer as a side effect of
/// ticket assignment and comments on assigned tickets. They are read-only
/// apart from the read flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: NotificationKind,
    pub message: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// What triggered a notification.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// A ticket was assigned to the user.
    Assignment,
    /// Someone commented on a ticket assigned to the user.
    Comment,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Assignment => "assignment",
            Self::Comment => "comment",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "assignment" => Some(Self::Assignment),
            "comment" => Some(Self::Comment),
            _ => None,
        }
    }
}

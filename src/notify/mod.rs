pub mod queue;

pub use queue::NotificationQueue;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: u64,
    pub message: String,
    pub level: NotificationLevel,
    /// Zero means the toast stays until dismissed.
    pub duration_ms: u64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Notification {
    pub fn is_expired(&self, now: chrono::DateTime<chrono::Utc>) -> bool {
        self.duration_ms > 0
            && now - self.created_at >= chrono::Duration::milliseconds(self.duration_ms as i64)
    }
}

/// Dispatches transient user-facing messages (toasts).
pub trait Notifier: Send + Sync {
    /// `duration_ms = None` uses the dispatcher's default duration.
    fn notify(&self, message: &str, level: NotificationLevel, duration_ms: Option<u64>);
}

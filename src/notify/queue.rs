use std::collections::VecDeque;
use std::sync::Mutex;

use crate::config::NotificationsConfig;
use crate::notify::{Notification, NotificationLevel, Notifier};

struct QueueState {
    next_id: u64,
    items: VecDeque<Notification>,
}

/// In-memory toast queue. Keeps the newest `max_visible` notifications and
/// mirrors every one of them to the log.
pub struct NotificationQueue {
    state: Mutex<QueueState>,
    default_duration_ms: u64,
    max_visible: usize,
}

impl NotificationQueue {
    pub fn new(config: &NotificationsConfig) -> Self {
        Self {
            state: Mutex::new(QueueState {
                next_id: 1,
                items: VecDeque::new(),
            }),
            default_duration_ms: config.default_duration_ms,
            max_visible: config.max_visible.max(1),
        }
    }

    /// Currently visible notifications, oldest first.
    pub fn visible(&self) -> Vec<Notification> {
        let now = chrono::Utc::now();
        self.lock()
            .items
            .iter()
            .filter(|n| !n.is_expired(now))
            .cloned()
            .collect()
    }

    /// Drop expired notifications. Returns how many were removed.
    pub fn prune(&self, now: chrono::DateTime<chrono::Utc>) -> usize {
        let mut state = self.lock();
        let before = state.items.len();
        state.items.retain(|n| !n.is_expired(now));
        before - state.items.len()
    }

    pub fn dismiss(&self, id: u64) -> bool {
        let mut state = self.lock();
        let before = state.items.len();
        state.items.retain(|n| n.id != id);
        state.items.len() != before
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Notifier for NotificationQueue {
    fn notify(&self, message: &str, level: NotificationLevel, duration_ms: Option<u64>) {
        match level {
            NotificationLevel::Info | NotificationLevel::Success => {
                tracing::info!(?level, "{message}")
            }
            NotificationLevel::Warning => tracing::warn!("{message}"),
            NotificationLevel::Error => tracing::error!("{message}"),
        }

        let mut state = self.lock();
        let id = state.next_id;
        state.next_id += 1;
        state.items.push_back(Notification {
            id,
            message: message.to_string(),
            level,
            duration_ms: duration_ms.unwrap_or(self.default_duration_ms),
            created_at: chrono::Utc::now(),
        });
        while state.items.len() > self.max_visible {
            state.items.pop_front();
        }
    }
}

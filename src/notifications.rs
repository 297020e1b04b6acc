use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use uuid::Uuid;

const DEFAULT_CAPACITY: usize = 50;

pub type NotificationId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Pending,
    Success,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub id: NotificationId,
    pub kind: NotificationKind,
    pub message: String,
    pub updated_at: DateTime<Utc>,
}

/// Transient, non-blocking user notifications. A pending notification is
/// later replaced in place by its outcome under the same id.
pub trait Notifier: Send + Sync {
    fn pending(&self, message: &str) -> NotificationId;
    fn success(&self, id: Option<NotificationId>, message: &str) -> NotificationId;
    fn error(&self, id: Option<NotificationId>, message: &str) -> NotificationId;
}

/// Bounded in-memory notification feed, newest last.
pub struct NotificationCenter {
    entries: Mutex<VecDeque<Notification>>,
    capacity: usize,
}

impl Default for NotificationCenter {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl NotificationCenter {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity: capacity.max(1),
        }
    }

    pub fn recent(&self) -> Vec<Notification> {
        self.entries.lock().iter().cloned().collect()
    }

    fn upsert(&self, id: Option<NotificationId>, kind: NotificationKind, message: &str) -> NotificationId {
        let mut entries = self.entries.lock();
        let now = Utc::now();

        if let Some(existing) = id.and_then(|id| entries.iter_mut().find(|n| n.id == id)) {
            existing.kind = kind;
            existing.message = message.to_string();
            existing.updated_at = now;
            return existing.id;
        }

        let notification = Notification {
            id: id.unwrap_or_else(Uuid::new_v4),
            kind,
            message: message.to_string(),
            updated_at: now,
        };
        let new_id = notification.id;
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(notification);
        new_id
    }
}

impl Notifier for NotificationCenter {
    fn pending(&self, message: &str) -> NotificationId {
        self.upsert(None, NotificationKind::Pending, message)
    }

    fn success(&self, id: Option<NotificationId>, message: &str) -> NotificationId {
        self.upsert(id, NotificationKind::Success, message)
    }

    fn error(&self, id: Option<NotificationId>, message: &str) -> NotificationId {
        self.upsert(id, NotificationKind::Error, message)
    }
}

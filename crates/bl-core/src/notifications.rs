use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Info,
    Success,
    Warning,
    Error,
}

/// A transient, toast-style message. Unlike chat messages these are not
/// part of the conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub read: bool,
}

impl Notification {
    pub fn new(kind: NotificationKind, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            title: title.into(),
            message: message.into(),
            timestamp: Utc::now(),
            read: false,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NotificationKind::Error, "Error", message)
    }
}

/// Bounded notification history; the oldest entries are evicted first.
#[derive(Debug, Clone)]
pub struct NotificationStore {
    notifications: Vec<Notification>,
    max_notifications: usize,
}

impl NotificationStore {
    pub fn new(max: usize) -> Self {
        Self {
            notifications: Vec::new(),
            max_notifications: max.max(1),
        }
    }

    pub fn push(&mut self, n: Notification) {
        self.notifications.push(n);
        if self.notifications.len() > self.max_notifications {
            let excess = self.notifications.len() - self.max_notifications;
            self.notifications.drain(..excess);
        }
    }

    pub fn list_all(&self) -> &[Notification] {
        &self.notifications
    }

    pub fn unread(&self) -> Vec<&Notification> {
        self.notifications.iter().filter(|n| !n.read).collect()
    }

    pub fn count_unread(&self) -> usize {
        self.notifications.iter().filter(|n| !n.read).count()
    }

    pub fn mark_all_read(&mut self) {
        for n in &mut self.notifications {
            n.read = true;
        }
    }

    pub fn latest(&self) -> Option<&Notification> {
        self.notifications.last()
    }
}
